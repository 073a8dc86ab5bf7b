//! One simulation step.
//!
//! [`next_tick`] is a pure function of the previous tick, the collected
//! moves, and the injected random source, in that order:
//!
//! 1. every alive snake steps one cell (requested move, or its current
//!    heading when no move arrived) and pays one health,
//! 2. snakes whose head lands on food eat: health back to full, tail kept,
//! 3. deaths are judged on the post-movement snapshot and applied together,
//! 4. eaten food is replaced on random free cells.
//!
//! Dead snakes are carried forward untouched; their frozen bodies no longer
//! block anything.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use arena_types::{
    Direction, Game, GameMode, MAX_HEALTH, Point, Snake, SnakeId, SnakeState, Tick, heading,
};

use crate::error::EngineError;
use crate::placement::random_cell;

/// How many random draws to spend per replacement food before giving up.
const FOOD_PLACEMENT_ATTEMPTS: u32 = 1_024;

/// Advances `last` by one turn.
///
/// `moves` holds the direction each snake asked for this turn; snakes with
/// no entry continue along their current heading (a stacked spawn body
/// heads up). Already-dead snakes are copied through unchanged.
///
/// # Errors
///
/// Returns [`EngineError::EmptyBody`] if an alive snake has no body cells
/// and [`EngineError::TurnOverflow`] if the turn counter would wrap. Both
/// are unrecoverable for the game.
pub fn next_tick<R: Rng>(
    game: &Game,
    last: &Tick,
    moves: &BTreeMap<SnakeId, Direction>,
    rng: &mut R,
) -> Result<Tick, EngineError> {
    let turn = last
        .turn
        .checked_add(1)
        .ok_or(EngineError::TurnOverflow { turn: last.turn })?;

    // Phase 1: movement. Eating is judged against the food on the board at
    // the start of the turn, so two snakes can eat the same food at once
    // and it only disappears once.
    let mut snakes = Vec::with_capacity(last.snakes.len());
    let mut eaten: BTreeSet<Point> = BTreeSet::new();
    for snake in &last.snakes {
        let SnakeState::Alive { body, health } = &snake.state else {
            snakes.push(snake.clone());
            continue;
        };
        let Some(head) = body.first().copied() else {
            return Err(EngineError::EmptyBody {
                snake_id: snake.id.clone(),
            });
        };
        let direction = moves.get(&snake.id).copied().unwrap_or_else(|| heading(body));
        let new_head = head.step(direction);
        let ate = last.food.contains(&new_head);

        let mut new_body = Vec::with_capacity(body.len().saturating_add(1));
        new_body.push(new_head);
        if ate {
            eaten.insert(new_head);
            new_body.extend_from_slice(body);
        } else {
            let keep = body.len().saturating_sub(1);
            new_body.extend_from_slice(body.get(..keep).unwrap_or_default());
        }
        let new_health = if ate { MAX_HEALTH } else { health.saturating_sub(1) };

        snakes.push(Snake {
            state: SnakeState::Alive {
                body: new_body,
                health: new_health,
            },
            ..snake.clone()
        });
    }

    // Phase 2: deaths, judged simultaneously on the moved snapshot.
    let verdicts = crate::death::evaluate_deaths(game.width, game.height, &snakes);
    for (snake_id, cause) in verdicts {
        let Some(snake) = snakes.iter_mut().find(|s| s.id == snake_id) else {
            continue;
        };
        if let SnakeState::Alive { body, health } = &snake.state {
            tracing::debug!(game_id = %game.id, snake_id = %snake_id, %cause, turn, "snake died");
            snake.state = SnakeState::Dead {
                body: body.clone(),
                health: *health,
                cause,
                turn,
            };
        }
    }

    // Phase 3: food. Each eaten piece is replaced on a free cell; on a
    // board with no room the replacement is skipped rather than forced.
    let mut food: Vec<Point> = last
        .food
        .iter()
        .filter(|f| !eaten.contains(f))
        .copied()
        .collect();
    // Corpses do not block movement, but their frozen segments still
    // count as occupied for placement.
    let mut occupied: BTreeSet<Point> = food.iter().copied().collect();
    for snake in &snakes {
        occupied.extend(snake.body().iter().copied());
    }
    for _ in 0..eaten.len() {
        match place_food(game.width, game.height, &occupied, rng) {
            Some(cell) => {
                occupied.insert(cell);
                food.push(cell);
            }
            None => {
                tracing::debug!(game_id = %game.id, turn, "no free cell for replacement food");
            }
        }
    }

    Ok(Tick { turn, snakes, food })
}

/// Whether `tick` ends the game under `mode`.
pub fn game_over(mode: GameMode, tick: &Tick) -> bool {
    match mode {
        GameMode::SinglePlayer => tick.alive_count() == 0,
        GameMode::MultiPlayer => tick.alive_count() <= 1,
    }
}

fn place_food<R: Rng>(
    width: u32,
    height: u32,
    occupied: &BTreeSet<Point>,
    rng: &mut R,
) -> Option<Point> {
    let cells = u64::from(width).saturating_mul(u64::from(height));
    if u64::try_from(occupied.len()).unwrap_or(u64::MAX) >= cells {
        return None;
    }
    for _ in 0..FOOD_PLACEMENT_ATTEMPTS {
        let cell = random_cell(width, height, rng);
        if !occupied.contains(&cell) {
            return Some(cell);
        }
    }
    None
}
