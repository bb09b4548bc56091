use serde::{Deserialize, Serialize};

pub use crate::maze::GridPos;
use crate::maze::Grid;

/// Player speed is expressed per tick at this reference rate.
pub const REFERENCE_TICK_RATE: f64 = 60.0;

/// Keeps a clamped position strictly inside the last cell.
const EDGE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Intent {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
}

impl Intent {
    /// Resolves simultaneously held directions with priority
    /// Up > Down > Left > Right.
    pub fn from_held(up: bool, down: bool, left: bool, right: bool) -> Self {
        if up {
            Intent::Up
        } else if down {
            Intent::Down
        } else if left {
            Intent::Left
        } else if right {
            Intent::Right
        } else {
            Intent::None
        }
    }

    /// Unit vector in (x, y) screen space, y growing downward.
    pub fn vector(self) -> (f64, f64) {
        match self {
            Intent::None => (0.0, 0.0),
            Intent::Up => (0.0, -1.0),
            Intent::Down => (0.0, 1.0),
            Intent::Left => (-1.0, 0.0),
            Intent::Right => (1.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub x: f64,
    pub y: f64,
    pub cell: GridPos,
    /// Last non-idle intent, kept for the driver's facing sprite.
    pub facing: Intent,
}

impl Player {
    pub fn spawn_at(cell: GridPos, cell_size: f64) -> Self {
        Self {
            x: cell.col as f64 * cell_size,
            y: cell.row as f64 * cell_size,
            cell,
            facing: Intent::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub x: f64,
    pub y: f64,
    pub cell: GridPos,
    /// Cells per second.
    pub speed: f64,
    /// Seconds since the last step.
    pub move_accumulator: f64,
    /// Simulation time before which the enemy stays put.
    pub freeze_until: f64,
}

impl Enemy {
    pub fn spawn_at(cell: GridPos, cell_size: f64, speed: f64) -> Self {
        Self {
            x: cell.col as f64 * cell_size,
            y: cell.row as f64 * cell_size,
            cell,
            speed,
            move_accumulator: 0.0,
            freeze_until: 0.0,
        }
    }

    pub fn is_frozen(&self, now: f64) -> bool {
        now < self.freeze_until
    }

    pub fn freeze(&mut self, now: f64, duration: f64) {
        self.freeze_until = now + duration;
    }

    /// Snaps the enemy onto `cell`.
    pub fn place(&mut self, cell: GridPos, cell_size: f64) {
        self.cell = cell;
        self.x = cell.col as f64 * cell_size;
        self.y = cell.row as f64 * cell_size;
    }
}

fn to_cell(units: f64, cell_size: f64, len: usize) -> usize {
    ((units / cell_size).floor().max(0.0) as usize).min(len.saturating_sub(1))
}

fn clamp_units(units: f64, cell_size: f64, len: usize) -> f64 {
    let extent = len as f64 * cell_size;
    units.clamp(0.0, extent - EDGE_EPSILON)
}

/// Moves the player one tick along `intent`, snapping collision to the grid.
///
/// The whole candidate cell is committed when it is walkable, even if that
/// skips diagonally past a corner. Otherwise each axis is tried on its own
/// so the player slides along walls.
pub fn move_player(
    player: &mut Player,
    grid: &Grid,
    intent: Intent,
    speed: f64,
    cell_size: f64,
    dt: f64,
) {
    if intent == Intent::None {
        return;
    }
    player.facing = intent;

    let (dx, dy) = intent.vector();
    let step = speed * dt * REFERENCE_TICK_RATE;
    let new_x = clamp_units(player.x + dx * step, cell_size, grid.cols());
    let new_y = clamp_units(player.y + dy * step, cell_size, grid.rows());
    let new_col = to_cell(new_x, cell_size, grid.cols());
    let new_row = to_cell(new_y, cell_size, grid.rows());

    if grid.is_walkable(new_row, new_col) {
        player.x = new_x;
        player.y = new_y;
        player.cell = GridPos::new(new_row, new_col);
        return;
    }

    if grid.is_walkable(player.cell.row, new_col) {
        player.x = new_x;
        player.cell.col = new_col;
    }
    if grid.is_walkable(new_row, player.cell.col) {
        player.y = new_y;
        player.cell.row = new_row;
    }
}
