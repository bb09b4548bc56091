//! Level, lives and scoring state machine.
//!
//! `GameState` owns the grid and both agents. The driver feeds it one
//! `update` per frame and reads the returned events; delayed transitions
//! (restart after a lost life, the next level, a fresh game after game over)
//! are kept as a `PendingTransition` that the driver fires through
//! `poll_transition`.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agent::{move_player, Enemy, GridPos, Intent, Player};
use crate::config::{ConfigError, GameConfig, MAX_LEVEL};
use crate::enemy::update_enemy;
use crate::maze::{self, center_of, Cell, Grid};

pub const NORMAL_ORB_SCORE: u32 = 10;
pub const COMBO_STEP_SCORE: u32 = 5;
pub const POWER_ORB_SCORE: u32 = 50;
pub const ESCAPE_BONUS: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting on the start screen.
    NotStarted,
    Running,
    Paused,
    /// A life was lost; a restart of the same level is pending.
    LifeLost,
    /// The exit was reached; the next level is pending.
    LevelComplete,
    GameOver,
    /// The last level's exit was reached.
    Victory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifeLossReason {
    TimeUp,
    Caught,
}

impl fmt::Display for LifeLossReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeUp => write!(f, "time's up"),
            Self::Caught => write!(f, "caught"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    OrbCollected { points: u32, combo: u32 },
    AllOrbsCollected,
    PowerCollected,
    /// Stepped onto an exit while orbs remain.
    CollectOrbsFirst,
    LifeLost(LifeLossReason),
    LevelComplete { level: u32 },
    GameOver { score: u32 },
    VictoryAll { score: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickResult {
    pub events: Vec<GameEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionKind {
    RestartLevel,
    /// Set up `level`, which was already advanced when the exit was reached.
    NextLevel,
    NewGame,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingTransition {
    pub kind: TransitionKind,
    /// Simulation time at which the transition should fire.
    pub due_at: f64,
}

impl PendingTransition {
    pub fn is_due(&self, now: f64) -> bool {
        now >= self.due_at
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    pub level: u32,
    pub grid: Grid,
    pub player: Player,
    pub enemy: Enemy,
    pub real_exit: Option<GridPos>,
    pub orbs_left: usize,
    pub timer: f64,
}

pub struct GameState {
    config: GameConfig,
    rng: Pcg32,
    level: u32,
    score: u32,
    lives: u32,
    orbs_left: usize,
    timer: f64,
    combo: u32,
    phase: Phase,
    grid: Grid,
    player: Player,
    enemy: Enemy,
    real_exit: Option<GridPos>,
    enemy_near: bool,
    /// Seconds of unpaused simulation since the state was created.
    clock: f64,
    last_orb_at: Option<f64>,
    pending: Option<PendingTransition>,
}

impl GameState {
    /// Builds a game on the start screen with level 1 generated.
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = Pcg32::seed_from_u64(config.seed);
        let grid = Grid::new(config.rows, config.cols, Cell::Empty);
        let spawn = center_of(&grid);
        let mut state = Self {
            player: Player::spawn_at(spawn, config.cell_size),
            enemy: Enemy::spawn_at(spawn, config.cell_size, config.enemy_speed(1)),
            lives: config.initial_lives,
            config,
            rng,
            level: 1,
            score: 0,
            orbs_left: 0,
            timer: 0.0,
            combo: 0,
            phase: Phase::NotStarted,
            grid,
            real_exit: None,
            enemy_near: false,
            clock: 0.0,
            last_orb_at: None,
            pending: None,
        };
        state.setup_level(1);
        Ok(state)
    }

    /// Generates a fresh maze for `level` and resets the per-level state.
    /// Level, score and lives carry over. A pending restart or level change
    /// is superseded and play resumes; other phases are left to the caller.
    pub fn setup_level(&mut self, level: u32) -> LevelSnapshot {
        self.pending = self.pending.filter(|p| p.kind == TransitionKind::NewGame);
        if matches!(self.phase, Phase::LifeLost | Phase::LevelComplete) {
            self.phase = Phase::Running;
        }
        self.level = level.clamp(1, MAX_LEVEL);
        let generated = maze::generate(
            &mut self.rng,
            self.config.rows,
            self.config.cols,
            self.level,
        );
        self.load_level(generated.grid);
        log::info!(
            "level {} ready: {} orbs, {} exit(s) from {} candidates, {:.0}s on the clock",
            self.level,
            self.orbs_left,
            generated.exits.len(),
            generated.exit_candidates.len(),
            self.timer
        );
        self.snapshot()
    }

    /// Installs `grid` as the current level layout and respawns both agents.
    pub fn load_level(&mut self, grid: Grid) {
        let cell_size = self.config.cell_size;
        self.timer = self.config.level_time(self.level);
        self.combo = 0;
        self.last_orb_at = None;
        self.enemy_near = false;
        self.orbs_left = grid.count_orbs();
        self.real_exit = grid.cells_of(Cell::Exit).choose(&mut self.rng).copied();
        self.player = Player::spawn_at(player_spawn(&grid), cell_size);
        self.enemy = Enemy::spawn_at(
            enemy_spawn(&grid),
            cell_size,
            self.config.enemy_speed(self.level),
        );
        self.grid = grid;
    }

    /// Advances the simulation by `dt` seconds.
    pub fn update(&mut self, dt: f64, intent: Intent) -> TickResult {
        let dt = dt.max(0.0);
        let mut events = Vec::new();
        match self.phase {
            Phase::NotStarted | Phase::Paused => return TickResult { events },
            Phase::Running => {}
            _ => {
                self.clock += dt;
                return TickResult { events };
            }
        }
        self.clock += dt;

        self.timer -= dt;
        if self.timer <= 0.0 {
            self.timer = 0.0;
            self.lose_life(LifeLossReason::TimeUp, &mut events);
            return TickResult { events };
        }

        let previous_cell = self.player.cell;
        move_player(
            &mut self.player,
            &self.grid,
            intent,
            self.config.player_speed,
            self.config.cell_size,
            dt,
        );
        let enemy_tick = update_enemy(
            &mut self.enemy,
            &self.grid,
            self.player.cell,
            self.clock,
            dt,
            self.config.cell_size,
        );
        if enemy_tick.triggered() {
            self.enemy_near =
                self.enemy.cell.manhattan(self.player.cell) <= self.config.near_distance;
        }

        self.resolve_cell(previous_cell != self.player.cell, &mut events);
        if self.phase != Phase::Running {
            return TickResult { events };
        }

        if self.enemy.cell == self.player.cell {
            self.lose_life(LifeLossReason::Caught, &mut events);
            return TickResult { events };
        }

        let combo_expired = self
            .last_orb_at
            .map_or(true, |at| self.clock - at > self.config.combo_window_secs);
        if combo_expired {
            self.combo = 0;
        }

        TickResult { events }
    }

    fn resolve_cell(&mut self, arrived: bool, events: &mut Vec<GameEvent>) {
        let GridPos { row, col } = self.player.cell;
        match self.grid.cell_at(row, col) {
            Cell::NormalOrb => {
                self.grid.consume(row, col);
                self.orbs_left = self.orbs_left.saturating_sub(1);
                self.combo += 1;
                let points = NORMAL_ORB_SCORE + (self.combo - 1) * COMBO_STEP_SCORE;
                self.score += points;
                self.last_orb_at = Some(self.clock);
                events.push(GameEvent::OrbCollected {
                    points,
                    combo: self.combo,
                });
                if self.orbs_left == 0 {
                    events.push(GameEvent::AllOrbsCollected);
                }
            }
            Cell::PowerOrb => {
                self.grid.consume(row, col);
                self.orbs_left = self.orbs_left.saturating_sub(1);
                self.score += POWER_ORB_SCORE;
                self.enemy.freeze(self.clock, self.config.freeze_secs);
                self.combo = 0;
                events.push(GameEvent::PowerCollected);
                if self.orbs_left == 0 {
                    events.push(GameEvent::AllOrbsCollected);
                }
            }
            Cell::Exit => {
                if self.orbs_left == 0 && self.real_exit == Some(self.player.cell) {
                    self.complete_level(events);
                } else if self.orbs_left > 0 && arrived {
                    events.push(GameEvent::CollectOrbsFirst);
                }
            }
            Cell::Empty | Cell::Wall => {}
        }
    }

    fn complete_level(&mut self, events: &mut Vec<GameEvent>) {
        self.score += ESCAPE_BONUS;
        if self.level < MAX_LEVEL {
            log::info!("level {} complete, score {}", self.level, self.score);
            events.push(GameEvent::LevelComplete { level: self.level });
            self.level += 1;
            self.phase = Phase::LevelComplete;
            self.schedule(TransitionKind::NextLevel, self.config.advance_delay_secs);
        } else {
            log::info!("all levels complete, final score {}", self.score);
            events.push(GameEvent::VictoryAll { score: self.score });
            self.phase = Phase::Victory;
            self.pending = None;
        }
    }

    fn lose_life(&mut self, reason: LifeLossReason, events: &mut Vec<GameEvent>) {
        self.lives = self.lives.saturating_sub(1);
        self.combo = 0;
        events.push(GameEvent::LifeLost(reason));
        log::info!("life lost ({reason}), {} remaining", self.lives);
        if self.lives == 0 {
            log::info!("game over, final score {}", self.score);
            events.push(GameEvent::GameOver { score: self.score });
            self.phase = Phase::GameOver;
            self.schedule(TransitionKind::NewGame, self.config.new_game_delay_secs);
        } else {
            self.phase = Phase::LifeLost;
            self.schedule(TransitionKind::RestartLevel, self.config.restart_delay_secs);
        }
    }

    fn schedule(&mut self, kind: TransitionKind, delay: f64) {
        self.pending = Some(PendingTransition {
            kind,
            due_at: self.clock + delay,
        });
    }

    /// Fires the pending transition once it is due and reports which one ran.
    pub fn poll_transition(&mut self) -> Option<TransitionKind> {
        let pending = self.pending.filter(|p| p.is_due(self.clock))?;
        log::debug!("firing {:?} at t={:.2}", pending.kind, self.clock);
        match pending.kind {
            TransitionKind::RestartLevel | TransitionKind::NextLevel => {
                self.enter_level(self.level)
            }
            TransitionKind::NewGame => self.new_game(),
        }
        Some(pending.kind)
    }

    fn enter_level(&mut self, level: u32) {
        self.pending = None;
        self.setup_level(level);
        self.phase = Phase::Running;
    }

    /// Leaves the start screen.
    pub fn start(&mut self) -> bool {
        if self.phase != Phase::NotStarted {
            return false;
        }
        self.phase = Phase::Running;
        true
    }

    pub fn toggle_pause(&mut self) -> Phase {
        self.phase = match self.phase {
            Phase::Running => Phase::Paused,
            Phase::Paused => Phase::Running,
            other => other,
        };
        log::debug!("pause toggled, now {:?}", self.phase);
        self.phase
    }

    /// Regenerates the current level and resumes play. Ignored once the game
    /// has ended; on the start screen the new layout still waits for `start`.
    pub fn restart_level(&mut self) -> bool {
        match self.phase {
            Phase::GameOver | Phase::Victory => return false,
            Phase::NotStarted => {
                self.pending = None;
                self.setup_level(self.level);
            }
            _ => self.enter_level(self.level),
        }
        true
    }

    /// Moves on to the next level. Skipping past the last level counts as
    /// finishing the run and starts a new game instead.
    pub fn advance_level(&mut self) -> Option<TransitionKind> {
        match self.phase {
            Phase::GameOver | Phase::Victory => None,
            // The level number already moved on when the exit was reached.
            Phase::LevelComplete => {
                self.enter_level(self.level);
                Some(TransitionKind::NextLevel)
            }
            _ if self.level >= MAX_LEVEL => {
                log::info!("skipped past the last level, final score {}", self.score);
                self.new_game();
                Some(TransitionKind::NewGame)
            }
            _ => {
                self.enter_level(self.level + 1);
                Some(TransitionKind::NextLevel)
            }
        }
    }

    /// Resets level, score and lives and returns to the start screen.
    pub fn new_game(&mut self) {
        self.pending = None;
        self.score = 0;
        self.lives = self.config.initial_lives;
        self.setup_level(1);
        self.phase = Phase::NotStarted;
    }

    pub fn snapshot(&self) -> LevelSnapshot {
        LevelSnapshot {
            level: self.level,
            grid: self.grid.clone(),
            player: self.player,
            enemy: self.enemy,
            real_exit: self.real_exit,
            orbs_left: self.orbs_left,
            timer: self.timer,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn orbs_left(&self) -> usize {
        self.orbs_left
    }

    pub fn timer(&self) -> f64 {
        self.timer
    }

    /// Remaining time as a fraction of the level's full timer.
    pub fn timer_fraction(&self) -> f64 {
        let total = self.config.level_time(self.level);
        if total > 0.0 {
            (self.timer / total).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Cell {
        self.grid.cell_at(row, col)
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_position(&self) -> (f64, f64) {
        (self.player.x, self.player.y)
    }

    pub fn player_cell(&self) -> GridPos {
        self.player.cell
    }

    pub fn enemy(&self) -> &Enemy {
        &self.enemy
    }

    pub fn enemy_position(&self) -> (f64, f64) {
        (self.enemy.x, self.enemy.y)
    }

    pub fn enemy_cell(&self) -> GridPos {
        self.enemy.cell
    }

    pub fn enemy_frozen(&self) -> bool {
        self.enemy.is_frozen(self.clock)
    }

    pub fn enemy_near(&self) -> bool {
        self.enemy_near
    }

    pub fn real_exit(&self) -> Option<GridPos> {
        self.real_exit
    }

    pub fn now(&self) -> f64 {
        self.clock
    }

    pub fn pending_transition(&self) -> Option<PendingTransition> {
        self.pending
    }
}

/// Starts at the center and walks diagonally until an empty cell turns up,
/// wrapping back to just above-left of center at the far edges.
fn player_spawn(grid: &Grid) -> GridPos {
    let center = center_of(grid);
    let (mut row, mut col) = (center.row, center.col);
    for _ in 0..grid.rows() * grid.cols() {
        if grid.cell_at(row, col) == Cell::Empty {
            return GridPos::new(row, col);
        }
        row += 1;
        col += 1;
        if row >= grid.rows() {
            row = center.row.saturating_sub(1);
        }
        if col >= grid.cols() {
            col = center.col.saturating_sub(1);
        }
    }
    center
}

/// First empty cell scanning row-major from (1, 1).
fn enemy_spawn(grid: &Grid) -> GridPos {
    let last_col = grid.cols().saturating_sub(1).max(2);
    let (mut row, mut col) = (1, 1);
    while row < grid.rows() {
        if grid.cell_at(row, col) == Cell::Empty {
            return GridPos::new(row, col);
        }
        col += 1;
        if col >= last_col {
            col = 1;
            row += 1;
        }
    }
    let (row, col) = grid.clamp(1, 1);
    GridPos::new(row, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 60.0;

    /// A running game on a hand-built layout with the enemy parked in a
    /// corner and frozen for the whole test.
    fn scripted(layout: &str) -> GameState {
        let mut state = GameState::new(GameConfig::with_seed(3)).unwrap();
        state.load_level(Grid::parse(layout).unwrap());
        state.start();
        park_enemy(&mut state, GridPos::new(0, 0));
        state
    }

    fn park_enemy(state: &mut GameState, cell: GridPos) {
        let size = state.config.cell_size;
        state.enemy.place(cell, size);
        state.enemy.freeze_until = f64::MAX;
    }

    fn put_player(state: &mut GameState, row: usize, col: usize) {
        state.player = Player::spawn_at(GridPos::new(row, col), state.config.cell_size);
    }

    const ORB_ROW: &str = "
        .......
        .ooo...
        .......
        .......
    ";

    #[test]
    fn new_game_waits_for_start() {
        let mut state = GameState::new(GameConfig::with_seed(1)).unwrap();
        assert_eq!(state.phase(), Phase::NotStarted);
        let timer = state.timer();
        let result = state.update(1.0, Intent::Right);
        assert!(result.events.is_empty());
        assert_eq!(state.timer(), timer);
        assert_eq!(state.now(), 0.0);
        assert!(state.start());
        assert_eq!(state.phase(), Phase::Running);
        assert!(!state.start());
    }

    #[test]
    fn setup_counts_orbs_and_picks_real_exit() {
        for seed in 0..25 {
            let mut state = GameState::new(GameConfig::with_seed(seed)).unwrap();
            for level in 1..=3 {
                let snapshot = state.setup_level(level);
                assert_eq!(snapshot.orbs_left, snapshot.grid.count_orbs());
                let exits = snapshot.grid.cells_of(Cell::Exit);
                match snapshot.real_exit {
                    Some(real) => assert!(exits.contains(&real)),
                    None => assert!(exits.is_empty()),
                }
                let spawn = snapshot.player.cell;
                assert_eq!(snapshot.grid.cell_at(spawn.row, spawn.col), Cell::Empty);
                assert!((snapshot.enemy.speed - state.config().enemy_speed(level)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn idle_player_stays_put() {
        let mut state = scripted(ORB_ROW);
        put_player(&mut state, 3, 3);
        let before = *state.player();
        for _ in 0..30 {
            state.update(DT, Intent::None);
        }
        assert_eq!(*state.player(), before);
    }

    #[test]
    fn combo_within_window_scores_more() {
        let mut state = scripted(ORB_ROW);
        for col in 1..=3 {
            put_player(&mut state, 1, col);
            state.update(0.1, Intent::None);
        }
        assert_eq!(state.score(), 10 + 15 + 20);
        assert_eq!(state.combo(), 3);
        assert_eq!(state.orbs_left(), 0);
    }

    #[test]
    fn spaced_pickups_score_flat() {
        let mut state = scripted(ORB_ROW);
        for col in 1..=3 {
            put_player(&mut state, 1, col);
            let result = state.update(0.1, Intent::None);
            assert!(result.events.contains(&GameEvent::OrbCollected { points: 10, combo: 1 }));
            put_player(&mut state, 3, 3);
            state.update(2.5, Intent::None);
            assert_eq!(state.combo(), 0);
        }
        assert_eq!(state.score(), 30);
    }

    #[test]
    fn last_orb_announces_the_exit_hunt() {
        let mut state = scripted(
            "
            .....
            ..o..
            .....
            ",
        );
        put_player(&mut state, 1, 2);
        let result = state.update(DT, Intent::None);
        assert_eq!(
            result.events,
            vec![
                GameEvent::OrbCollected { points: 10, combo: 1 },
                GameEvent::AllOrbsCollected
            ]
        );
    }

    #[test]
    fn power_orb_freezes_enemy_and_resets_combo() {
        let mut state = scripted(
            "
            ........
            .oo*....
            ........
            ........
            ",
        );
        // A fast, unfrozen enemy that would otherwise step every tick.
        state.enemy.place(GridPos::new(3, 7), state.config.cell_size);
        state.enemy.freeze_until = 0.0;
        state.enemy.speed = 1000.0;

        put_player(&mut state, 1, 1);
        state.update(DT, Intent::None);
        put_player(&mut state, 1, 2);
        state.update(DT, Intent::None);
        assert_eq!(state.combo(), 2);
        let enemy_cell = state.enemy_cell();

        put_player(&mut state, 1, 3);
        let result = state.update(DT, Intent::None);
        assert!(result.events.contains(&GameEvent::PowerCollected));
        assert_eq!(state.combo(), 0);
        assert_eq!(state.score(), 10 + 15 + 50);
        assert!(state.enemy_frozen());

        let frozen_at = state.enemy_cell();
        assert_ne!(frozen_at, enemy_cell);
        put_player(&mut state, 3, 0);
        for _ in 0..60 {
            state.update(0.1, Intent::None);
            assert_eq!(state.enemy_cell(), frozen_at);
        }
        assert!(state.enemy_frozen());
        for _ in 0..30 {
            state.update(0.1, Intent::None);
        }
        assert!(!state.enemy_frozen());
    }

    #[test]
    fn real_exit_completes_level_one() {
        let mut state = scripted(
            "
            .....
            ..E..
            .....
            ",
        );
        assert_eq!(state.real_exit(), Some(GridPos::new(1, 2)));
        assert_eq!(state.orbs_left(), 0);
        put_player(&mut state, 2, 2);

        let result = state.update(DT, Intent::Up);
        assert_eq!(result.events, vec![GameEvent::LevelComplete { level: 1 }]);
        assert_eq!(state.score(), ESCAPE_BONUS);
        assert_eq!(state.level(), 2);
        assert_eq!(state.phase(), Phase::LevelComplete);

        let pending = state.pending_transition().unwrap();
        assert_eq!(pending.kind, TransitionKind::NextLevel);
        assert_eq!(state.poll_transition(), None);

        state.update(1.0, Intent::None);
        assert_eq!(state.poll_transition(), Some(TransitionKind::NextLevel));
        assert_eq!(state.phase(), Phase::Running);
        assert_eq!(state.level(), 2);
        assert_eq!(state.grid().rows(), state.config().rows);
        assert_eq!(state.timer(), 90.0);
        assert_eq!(state.score(), ESCAPE_BONUS);
    }

    #[test]
    fn exit_with_orbs_left_only_warns() {
        let mut state = scripted(
            "
            .....
            ..E..
            .....
            o....
            ",
        );
        put_player(&mut state, 2, 2);
        let result = state.update(DT, Intent::Up);
        assert_eq!(result.events, vec![GameEvent::CollectOrbsFirst]);
        assert_eq!(state.score(), 0);
        assert_eq!(state.phase(), Phase::Running);
        assert_eq!(state.pending_transition(), None);

        // Standing still on the exit does not repeat the warning.
        let result = state.update(DT, Intent::None);
        assert!(result.events.is_empty());
    }

    #[test]
    fn decoy_exit_does_nothing() {
        let mut state = scripted(
            "
            E...E
            .....
            .....
            ",
        );
        park_enemy(&mut state, GridPos::new(2, 2));
        let real = state.real_exit().unwrap();
        let decoy = if real.col == 0 { 4 } else { 0 };
        put_player(&mut state, 0, decoy);
        let result = state.update(DT, Intent::None);
        assert!(result.events.is_empty());
        assert_eq!(state.phase(), Phase::Running);
    }

    #[test]
    fn final_level_exit_is_victory() {
        let mut state = scripted(
            "
            .....
            ..E..
            .....
            ",
        );
        state.level = 3;
        put_player(&mut state, 1, 2);
        let result = state.update(DT, Intent::None);
        assert_eq!(result.events, vec![GameEvent::VictoryAll { score: ESCAPE_BONUS }]);
        assert_eq!(state.phase(), Phase::Victory);
        assert_eq!(state.pending_transition(), None);
        assert_eq!(state.advance_level(), None);
    }

    #[test]
    fn caught_on_last_life_is_game_over() {
        let mut state = scripted(ORB_ROW);
        state.lives = 1;
        put_player(&mut state, 3, 3);
        park_enemy(&mut state, GridPos::new(3, 3));

        let result = state.update(DT, Intent::None);
        assert_eq!(
            result.events,
            vec![
                GameEvent::LifeLost(LifeLossReason::Caught),
                GameEvent::GameOver { score: 0 }
            ]
        );
        assert_eq!(state.lives(), 0);
        assert_eq!(state.phase(), Phase::GameOver);
        assert!(!state.restart_level());

        for _ in 0..2 {
            state.update(1.0, Intent::None);
            assert_eq!(state.poll_transition(), None);
        }
        state.update(1.5, Intent::None);
        assert_eq!(state.poll_transition(), Some(TransitionKind::NewGame));
        assert_eq!(state.phase(), Phase::NotStarted);
        assert_eq!(state.lives(), 3);
        assert_eq!(state.level(), 1);
    }

    #[test]
    fn timer_expiry_costs_a_life_and_resets_level() {
        let mut state = GameState::new(GameConfig::with_seed(11)).unwrap();
        state.start();
        state.lives = 2;
        state.timer = 0.5;
        let old_grid = state.grid().clone();

        let result = state.update(1.0, Intent::None);
        assert_eq!(result.events, vec![GameEvent::LifeLost(LifeLossReason::TimeUp)]);
        assert_eq!(state.lives(), 1);
        assert_eq!(state.timer(), 0.0);
        assert_eq!(state.phase(), Phase::LifeLost);

        // Nothing simulates while the restart is pending.
        let result = state.update(1.0, Intent::None);
        assert!(result.events.is_empty());
        assert_eq!(state.poll_transition(), Some(TransitionKind::RestartLevel));

        assert_eq!(state.phase(), Phase::Running);
        assert_eq!(state.level(), 1);
        assert_eq!(state.timer(), 120.0);
        assert_eq!(state.orbs_left(), state.grid().count_orbs());
        assert_ne!(*state.grid(), old_grid);
    }

    #[test]
    fn life_loss_resets_combo() {
        let mut state = scripted(ORB_ROW);
        put_player(&mut state, 1, 1);
        state.update(0.1, Intent::None);
        assert_eq!(state.combo(), 1);
        park_enemy(&mut state, GridPos::new(1, 1));
        state.update(0.1, Intent::None);
        assert_eq!(state.combo(), 0);
        assert_eq!(state.lives(), 2);
    }

    #[test]
    fn explicit_transition_cancels_stale_pending() {
        let mut state = scripted(ORB_ROW);
        put_player(&mut state, 3, 3);
        park_enemy(&mut state, GridPos::new(3, 3));
        state.update(DT, Intent::None);
        assert_eq!(state.phase(), Phase::LifeLost);
        assert!(state.pending_transition().is_some());

        state.new_game();
        assert_eq!(state.pending_transition(), None);
        state.start();
        state.update(2.0, Intent::None);
        assert_eq!(state.poll_transition(), None);
    }

    #[test]
    fn pause_stops_the_clock() {
        let mut state = scripted(ORB_ROW);
        let timer = state.timer();
        assert_eq!(state.toggle_pause(), Phase::Paused);
        state.update(5.0, Intent::Right);
        assert_eq!(state.timer(), timer);
        assert_eq!(state.now(), 0.0);
        assert_eq!(state.toggle_pause(), Phase::Running);
        state.update(1.0, Intent::None);
        assert_eq!(state.timer(), timer - 1.0);
    }

    #[test]
    fn enemy_near_tracks_distance_on_steps() {
        let mut state = scripted(
            "
            ..........
            ..........
            ",
        );
        put_player(&mut state, 0, 0);
        state.enemy.place(GridPos::new(0, 9), state.config.cell_size);
        state.enemy.freeze_until = 0.0;
        state.enemy.speed = 1.0;

        state.update(0.5, Intent::None);
        assert!(!state.enemy_near());
        for _ in 0..5 {
            state.update(1.0, Intent::None);
        }
        assert_eq!(state.enemy_cell(), GridPos::new(0, 4));
        assert!(state.enemy_near());
    }

    #[test]
    fn advance_steps_through_levels() {
        let mut state = GameState::new(GameConfig::with_seed(5)).unwrap();
        state.start();
        assert_eq!(state.advance_level(), Some(TransitionKind::NextLevel));
        assert_eq!(state.level(), 2);
        assert_eq!(state.phase(), Phase::Running);
        assert_eq!(state.timer(), 90.0);
    }

    #[test]
    fn advancing_past_last_level_starts_a_new_game() {
        let mut state = GameState::new(GameConfig::with_seed(5)).unwrap();
        state.start();
        assert_eq!(state.advance_level(), Some(TransitionKind::NextLevel));
        assert_eq!(state.advance_level(), Some(TransitionKind::NextLevel));
        assert_eq!(state.level(), 3);
        state.score = 140;
        state.lives = 1;

        assert_eq!(state.advance_level(), Some(TransitionKind::NewGame));
        assert_eq!(state.level(), 1);
        assert_eq!(state.score(), 0);
        assert_eq!(state.lives(), 3);
        assert_eq!(state.phase(), Phase::NotStarted);
        assert_eq!(state.pending_transition(), None);
    }

    #[test]
    fn level_complete_advances_to_the_announced_level() {
        let mut state = scripted(
            "
            .....
            ..E..
            .....
            ",
        );
        put_player(&mut state, 1, 2);
        state.update(DT, Intent::None);
        assert_eq!(state.phase(), Phase::LevelComplete);
        assert_eq!(state.advance_level(), Some(TransitionKind::NextLevel));
        assert_eq!(state.level(), 2);
        assert_eq!(state.phase(), Phase::Running);
        assert_eq!(state.pending_transition(), None);
    }

    #[test]
    fn restart_on_start_screen_keeps_waiting() {
        let mut state = GameState::new(GameConfig::with_seed(8)).unwrap();
        let old_grid = state.grid().clone();
        assert!(state.restart_level());
        assert_eq!(state.phase(), Phase::NotStarted);
        assert_ne!(*state.grid(), old_grid);
        let timer = state.timer();
        state.update(1.0, Intent::Right);
        assert_eq!(state.timer(), timer);
    }

    #[test]
    fn direct_setup_supersedes_pending_restart() {
        let mut state = scripted(ORB_ROW);
        put_player(&mut state, 3, 3);
        park_enemy(&mut state, GridPos::new(3, 3));
        state.update(DT, Intent::None);
        assert_eq!(state.phase(), Phase::LifeLost);

        state.setup_level(2);
        assert_eq!(state.pending_transition(), None);
        assert_eq!(state.phase(), Phase::Running);
        state.update(2.0, Intent::None);
        assert_eq!(state.poll_transition(), None);
        assert_eq!(state.level(), 2);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = GameConfig {
            rows: 3,
            ..GameConfig::with_seed(1)
        };
        assert!(matches!(
            GameState::new(config),
            Err(ConfigError::GridTooSmall { rows: 3, .. })
        ));
        let config = GameConfig {
            cell_size: 0.0,
            ..GameConfig::with_seed(1)
        };
        assert!(GameState::new(config).is_err());
    }

    #[test]
    fn spawn_search_skips_occupied_center() {
        let grid = Grid::parse(
            "
            .......
            .......
            .......
            ...o...
            .......
            .......
            .......
            ",
        )
        .unwrap();
        assert_eq!(player_spawn(&grid), GridPos::new(4, 4));

        let grid = Grid::parse(
            "
            .....
            ##o..
            .....
            ",
        )
        .unwrap();
        assert_eq!(enemy_spawn(&grid), GridPos::new(1, 3));
    }
}
