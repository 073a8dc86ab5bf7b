//! Post-movement death evaluation.
//!
//! All checks run against a single snapshot of where every snake ended up,
//! so two snakes colliding on the same turn both die on that turn. Causes
//! are checked in a fixed order per snake and the first match wins:
//!
//! | order | cause | condition |
//! |-------|-------|-----------|
//! | 1 | `Starvation` | health hit zero |
//! | 2 | `WallCollision` | head left the board |
//! | 3 | `HeadToHeadCollision` | head meets another head and the snake is not strictly longer |
//! | 4 | `SnakeCollision` | head landed on another alive snake's body segment |

use arena_types::{DeathCause, Snake, SnakeId};

/// Verdicts for every snake that died this turn, against the snapshot in
/// `snakes`. Already-dead snakes are skipped.
pub(crate) fn evaluate_deaths(
    width: u32,
    height: u32,
    snakes: &[Snake],
) -> Vec<(SnakeId, DeathCause)> {
    snakes
        .iter()
        .filter(|snake| snake.is_alive())
        .filter_map(|snake| judge(width, height, snake, snakes).map(|cause| (snake.id.clone(), cause)))
        .collect()
}

fn judge(width: u32, height: u32, snake: &Snake, all: &[Snake]) -> Option<DeathCause> {
    if snake.health() == 0 {
        return Some(DeathCause::Starvation);
    }
    let head = snake.head()?;
    if !head.in_bounds(width, height) {
        return Some(DeathCause::WallCollision);
    }
    for other in all.iter().filter(|o| o.is_alive() && o.id != snake.id) {
        if other.head() == Some(head) && snake.len() <= other.len() {
            return Some(DeathCause::HeadToHeadCollision);
        }
    }
    for other in all.iter().filter(|o| o.is_alive() && o.id != snake.id) {
        // Heads are covered above; only trailing segments count here.
        if other.body().iter().skip(1).any(|segment| *segment == head) {
            return Some(DeathCause::SnakeCollision);
        }
    }
    None
}
