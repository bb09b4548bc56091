//! Greedy pursuit for the chasing enemy.
//!
//! The enemy moves in whole-cell steps gated by a time accumulator rather
//! than integrating `dt` directly. Leftover time past a step threshold is
//! dropped, so effective speed dips slightly when the tick rate does not
//! divide the step interval.

use crate::agent::{Enemy, GridPos};
use crate::maze::Grid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyTick {
    /// Frozen by a power orb; the accumulator is untouched.
    Frozen,
    /// Not enough time accumulated for a step.
    Waiting,
    /// A step was due and the enemy moved onto the returned cell.
    Stepped(GridPos),
    /// A step was due but every greedy option was blocked.
    Blocked,
}

impl EnemyTick {
    pub fn triggered(self) -> bool {
        matches!(self, EnemyTick::Stepped(_) | EnemyTick::Blocked)
    }
}

/// Advances the enemy's step timer and takes at most one step toward `target`.
pub fn update_enemy(
    enemy: &mut Enemy,
    grid: &Grid,
    target: GridPos,
    now: f64,
    dt: f64,
    cell_size: f64,
) -> EnemyTick {
    if enemy.is_frozen(now) {
        return EnemyTick::Frozen;
    }

    enemy.move_accumulator += dt;
    if enemy.move_accumulator < 1.0 / enemy.speed {
        return EnemyTick::Waiting;
    }
    enemy.move_accumulator = 0.0;

    match choose_step(grid, enemy.cell, target) {
        Some(next) => {
            enemy.place(next, cell_size);
            EnemyTick::Stepped(next)
        }
        None => EnemyTick::Blocked,
    }
}

/// Diagonal first, then row-only, then column-only.
pub fn choose_step(grid: &Grid, from: GridPos, target: GridPos) -> Option<GridPos> {
    let dr = (target.row as isize - from.row as isize).signum();
    let dc = (target.col as isize - from.col as isize).signum();
    let (r, c) = (from.row as isize, from.col as isize);
    let open = |row: isize, col: isize| {
        grid.in_bounds(row, col) && grid.is_walkable(row as usize, col as usize)
    };

    let options = [
        (true, r + dr, c + dc),
        (dr != 0, r + dr, c),
        (dc != 0, r, c + dc),
    ];
    options
        .into_iter()
        .find(|&(allowed, row, col)| allowed && open(row, col))
        .map(|(_, row, col)| GridPos::new(row as usize, col as usize))
}
