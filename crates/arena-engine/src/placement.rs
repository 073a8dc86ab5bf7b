//! Initial board construction.
//!
//! Turn zero places every snake on its own random free cell as a stack of
//! three identical points, then scatters the requested food over whatever
//! cells remain. All randomness flows through the caller-supplied [`Rng`],
//! so the same seed always produces the same opening board.

use std::collections::BTreeSet;

use rand::Rng;

use arena_types::{MAX_HEALTH, Point, Snake, SnakeId, SnakeState, Tick};

use crate::error::EngineError;

/// Spawn length, expressed as stacked copies of the spawn cell.
const SPAWN_BODY_LEN: usize = 3;

/// Everything needed to place one snake on the opening board.
#[derive(Debug, Clone)]
pub struct SnakeSeed {
    /// Identifier assigned by the caller.
    pub id: SnakeId,
    /// Display name.
    pub name: String,
    /// Move endpoint base URL.
    pub url: String,
    /// Display color, already resolved by the caller.
    pub color: String,
}

/// Builds the turn-zero tick for a fresh game.
///
/// # Errors
///
/// Returns [`EngineError::InvalidBoard`] for a zero-area board,
/// [`EngineError::NoSnakes`] when `seeds` is empty, and
/// [`EngineError::BoardFull`] when the board cannot hold every snake plus
/// the requested food.
pub fn initial_tick<R: Rng>(
    width: u32,
    height: u32,
    food_count: u32,
    seeds: &[SnakeSeed],
    rng: &mut R,
) -> Result<Tick, EngineError> {
    if width == 0 || height == 0 {
        return Err(EngineError::InvalidBoard { width, height });
    }
    if seeds.is_empty() {
        return Err(EngineError::NoSnakes);
    }
    let cells = u64::from(width).saturating_mul(u64::from(height));
    let needed = u64::try_from(seeds.len())
        .unwrap_or(u64::MAX)
        .saturating_add(u64::from(food_count));
    if needed > cells {
        return Err(EngineError::BoardFull {
            width,
            height,
            snakes: seeds.len(),
            food: food_count,
        });
    }

    let mut occupied: BTreeSet<(i32, i32)> = BTreeSet::new();
    let mut snakes = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let spawn = free_cell(width, height, &occupied, rng);
        occupied.insert((spawn.x, spawn.y));
        snakes.push(Snake {
            id: seed.id.clone(),
            name: seed.name.clone(),
            url: seed.url.clone(),
            color: seed.color.clone(),
            state: SnakeState::Alive {
                body: vec![spawn; SPAWN_BODY_LEN],
                health: MAX_HEALTH,
            },
        });
    }

    let mut food = Vec::with_capacity(food_count as usize);
    for _ in 0..food_count {
        let cell = free_cell(width, height, &occupied, rng);
        occupied.insert((cell.x, cell.y));
        food.push(cell);
    }

    Ok(Tick {
        turn: 0,
        snakes,
        food,
    })
}

/// Samples an unoccupied cell by rejection, falling back to a linear scan
/// once the random draws keep missing on a crowded board.
pub(crate) fn free_cell<R: Rng>(
    width: u32,
    height: u32,
    occupied: &BTreeSet<(i32, i32)>,
    rng: &mut R,
) -> Point {
    let attempts = u64::from(width)
        .saturating_mul(u64::from(height))
        .min(1_024);
    for _ in 0..attempts {
        let point = random_cell(width, height, rng);
        if !occupied.contains(&(point.x, point.y)) {
            return point;
        }
    }
    // Crowded board: deterministic sweep for the first open cell. Callers
    // verified capacity up front, so this always finds one.
    for y in 0..height {
        for x in 0..width {
            #[allow(clippy::cast_possible_wrap)]
            let candidate = (x as i32, y as i32);
            if !occupied.contains(&candidate) {
                return Point {
                    x: candidate.0,
                    y: candidate.1,
                };
            }
        }
    }
    random_cell(width, height, rng)
}

/// Uniform draw over the whole board.
pub(crate) fn random_cell<R: Rng>(width: u32, height: u32, rng: &mut R) -> Point {
    #[allow(clippy::cast_possible_wrap)]
    let x = rng.random_range(0..width.max(1)) as i32;
    #[allow(clippy::cast_possible_wrap)]
    let y = rng.random_range(0..height.max(1)) as i32;
    Point { x, y }
}
