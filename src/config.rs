use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_ROWS: usize = 15;
pub const DEFAULT_COLS: usize = 19;
pub const CELL_SIZE: f64 = 28.0;
pub const PLAYER_SPEED: f64 = 4.0;
pub const ENEMY_BASE_SPEED: f64 = 0.5;
pub const ENEMY_SPEED_INCREMENT: f64 = 0.1;
pub const POWER_FREEZE_SECS: f64 = 8.0;
pub const COMBO_WINDOW_SECS: f64 = 2.0;
pub const NEAR_DISTANCE: usize = 4;
pub const INITIAL_LIVES: u32 = 3;
pub const LEVEL_TIMES: [f64; 3] = [120.0, 90.0, 60.0];
pub const MAX_LEVEL: u32 = 3;
pub const RESTART_DELAY_SECS: f64 = 1.0;
pub const ADVANCE_DELAY_SECS: f64 = 1.0;
pub const NEW_GAME_DELAY_SECS: f64 = 3.0;

/// Smallest grid that still fits the spawn block plus a margin on every side.
pub const MIN_GRID_SIDE: usize = 9;

/// Tunables for one game session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub rows: usize,
    pub cols: usize,
    /// Sub-cell units per grid cell.
    pub cell_size: f64,
    /// Player speed in units per tick at the 60 Hz reference rate.
    pub player_speed: f64,
    /// Enemy cells per second on level 1.
    pub enemy_base_speed: f64,
    pub enemy_speed_increment: f64,
    /// Level timers in seconds; levels past the end reuse the last entry.
    pub level_times: Vec<f64>,
    pub freeze_secs: f64,
    pub combo_window_secs: f64,
    pub near_distance: usize,
    pub initial_lives: u32,
    pub restart_delay_secs: f64,
    pub advance_delay_secs: f64,
    pub new_game_delay_secs: f64,
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            cell_size: CELL_SIZE,
            player_speed: PLAYER_SPEED,
            enemy_base_speed: ENEMY_BASE_SPEED,
            enemy_speed_increment: ENEMY_SPEED_INCREMENT,
            level_times: LEVEL_TIMES.to_vec(),
            freeze_secs: POWER_FREEZE_SECS,
            combo_window_secs: COMBO_WINDOW_SECS,
            near_distance: NEAR_DISTANCE,
            initial_lives: INITIAL_LIVES,
            restart_delay_secs: RESTART_DELAY_SECS,
            advance_delay_secs: ADVANCE_DELAY_SECS,
            new_game_delay_secs: NEW_GAME_DELAY_SECS,
            seed: 0,
        }
    }
}

impl GameConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows < MIN_GRID_SIDE || self.cols < MIN_GRID_SIDE {
            return Err(ConfigError::GridTooSmall {
                rows: self.rows,
                cols: self.cols,
                min: MIN_GRID_SIDE,
            });
        }
        for (name, value) in [
            ("cell_size", self.cell_size),
            ("player_speed", self.player_speed),
            ("enemy_base_speed", self.enemy_base_speed),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if self.enemy_speed_increment < 0.0 {
            return Err(ConfigError::NonPositive {
                name: "enemy_speed_increment",
                value: self.enemy_speed_increment,
            });
        }
        if self.level_times.is_empty() {
            return Err(ConfigError::NoLevelTimes);
        }
        if self.initial_lives == 0 {
            return Err(ConfigError::NoLives);
        }
        Ok(())
    }

    /// Seconds on the clock at the start of `level` (1-based).
    pub fn level_time(&self, level: u32) -> f64 {
        let idx = (level.max(1) as usize - 1).min(self.level_times.len().saturating_sub(1));
        self.level_times.get(idx).copied().unwrap_or(0.0)
    }

    pub fn enemy_speed(&self, level: u32) -> f64 {
        self.enemy_base_speed + level.saturating_sub(1) as f64 * self.enemy_speed_increment
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    GridTooSmall { rows: usize, cols: usize, min: usize },
    NonPositive { name: &'static str, value: f64 },
    NoLevelTimes,
    NoLives,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GridTooSmall { rows, cols, min } => {
                write!(f, "grid {rows}x{cols} is too small (minimum {min}x{min})")
            }
            Self::NonPositive { name, value } => write!(f, "{name} must be positive, got {value}"),
            Self::NoLevelTimes => write!(f, "at least one level time is required"),
            Self::NoLives => write!(f, "initial lives must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}
