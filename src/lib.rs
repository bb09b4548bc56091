//! Maze Escape simulation core.
//!
//! A procedurally generated maze, a player moving continuously over a
//! discrete grid, a greedy pursuing enemy and the level/score state machine.
//! Rendering, input capture and frame scheduling belong to the driver; the
//! core only exposes `GameState::update`.

pub mod agent;
pub mod config;
pub mod enemy;
pub mod game;
pub mod maze;

pub use agent::{Enemy, GridPos, Intent, Player};
pub use config::{ConfigError, GameConfig};
pub use game::{
    GameEvent, GameState, LevelSnapshot, LifeLossReason, PendingTransition, Phase, TickResult,
    TransitionKind,
};
pub use maze::{Cell, GeneratedMaze, Grid};
