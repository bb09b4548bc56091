use clap::Parser;
use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use rand::Rng;
use std::io::{self, Stdout};
use std::thread;
use std::time::{Duration, Instant};

use maze_escape::config::{DEFAULT_COLS, DEFAULT_ROWS};
use maze_escape::{GameConfig, GameEvent, GameState, Intent, Phase, TransitionKind};

mod render;

use render::Renderer;

const DEFAULT_TICK_MS: u64 = 16;
const DEFAULT_RENDER_FPS: u64 = 60;
const INPUT_HOLD_MS: u64 = 160;
const MESSAGE_MS: u64 = 3000;
/// Longest frame delta handed to the simulation after a stall.
const MAX_FRAME_SECS: f64 = 0.25;

#[derive(Parser, Debug)]
#[command(
    name = "maze-escape",
    about = "Collect every orb, then find the real exit before the enemy catches you"
)]
struct Args {
    /// Seed for maze generation; random when omitted
    #[arg(long, env = "MAZE_ESCAPE_SEED")]
    seed: Option<u64>,
    /// Simulation tick interval in milliseconds
    #[arg(long, env = "MAZE_ESCAPE_TICK_MS", default_value_t = DEFAULT_TICK_MS)]
    tick_ms: u64,
    /// Render rate cap
    #[arg(long, env = "MAZE_ESCAPE_FPS", default_value_t = DEFAULT_RENDER_FPS)]
    fps: u64,
    #[arg(long, default_value_t = DEFAULT_ROWS)]
    rows: usize,
    #[arg(long, default_value_t = DEFAULT_COLS)]
    cols: usize,
    /// Print the generated layout for LEVEL as JSON and exit
    #[arg(long, value_name = "LEVEL")]
    dump_level: Option<u32>,
}

impl Args {
    fn config(&self) -> GameConfig {
        GameConfig {
            rows: self.rows,
            cols: self.cols,
            seed: self.seed.unwrap_or_else(|| rand::thread_rng().gen()),
            ..GameConfig::default()
        }
    }
}

/// Terminals only report presses and repeats, so a direction counts as held
/// for a short window after its last event.
#[derive(Default)]
struct HeldKeys {
    last_seen: [Option<Instant>; 4],
}

impl HeldKeys {
    fn press(&mut self, code: KeyCode) {
        let idx = match code {
            KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('k') => 0,
            KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('j') => 1,
            KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('h') => 2,
            KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('l') => 3,
            _ => return,
        };
        self.last_seen[idx] = Some(Instant::now());
    }

    fn intent(&self) -> Intent {
        let now = Instant::now();
        let held = |idx: usize| {
            self.last_seen[idx]
                .is_some_and(|t| now.duration_since(t) <= Duration::from_millis(INPUT_HOLD_MS))
        };
        Intent::from_held(held(0), held(1), held(2), held(3))
    }
}

struct Message {
    text: String,
    shown_at: Instant,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = args.config();
    let rows = config.rows;
    let cols = config.cols;
    let mut game = GameState::new(config)?;
    log::info!("starting with seed {}", game.config().seed);

    if let Some(level) = args.dump_level {
        let snapshot = game.setup_level(level);
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(Hide)?;

    let result = run(&mut stdout, &args, Renderer::new(rows, cols), game);

    stdout.execute(Show)?;
    stdout.execute(LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    result
}

fn run(
    stdout: &mut Stdout,
    args: &Args,
    mut renderer: Renderer,
    mut game: GameState,
) -> anyhow::Result<()> {
    let mut held = HeldKeys::default();
    let mut message: Option<Message> = None;
    let tick = Duration::from_millis(args.tick_ms.max(1));
    let frame_time = Duration::from_micros(1_000_000 / args.fps.max(1));
    let mut last_tick = Instant::now();

    loop {
        let frame_start = Instant::now();
        while event::poll(Duration::from_millis(0))? {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                continue;
            }
            let note = match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char(' ') => handle_space(&mut game),
                KeyCode::Char('r') => game
                    .restart_level()
                    .then(|| format!("Level {} restarted", game.level())),
                KeyCode::Char('n') => handle_next(&mut game),
                code => {
                    held.press(code);
                    None
                }
            };
            if let Some(text) = note {
                message = Some(Message {
                    text,
                    shown_at: Instant::now(),
                });
            }
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= tick {
            last_tick = Instant::now();
            let dt = elapsed.as_secs_f64().min(MAX_FRAME_SECS);
            let result = game.update(dt, held.intent());
            for event in &result.events {
                log::debug!("{event:?}");
                if let Some(text) = describe(event, &game) {
                    message = Some(Message {
                        text,
                        shown_at: Instant::now(),
                    });
                }
            }
            if let Some(kind) = game.poll_transition() {
                if kind != TransitionKind::NewGame {
                    message = Some(Message {
                        text: format!("Level {} - Collect all orbs!", game.level()),
                        shown_at: Instant::now(),
                    });
                }
            }
        }

        if message
            .as_ref()
            .is_some_and(|m| m.shown_at.elapsed() >= Duration::from_millis(MESSAGE_MS))
        {
            message = None;
        }
        renderer.draw(stdout, &game, message.as_ref().map(|m| m.text.as_str()))?;

        let elapsed = frame_start.elapsed();
        if elapsed < frame_time {
            thread::sleep(frame_time - elapsed);
        }
    }
}

fn handle_space(game: &mut GameState) -> Option<String> {
    if game.start() {
        return Some(format!("Level {} - Collect all orbs!", game.level()));
    }
    match game.toggle_pause() {
        Phase::Paused => Some("Game paused! Press SPACE to continue.".to_string()),
        Phase::Running => Some("Game resumed!".to_string()),
        _ => None,
    }
}

fn handle_next(game: &mut GameState) -> Option<String> {
    if matches!(game.phase(), Phase::GameOver | Phase::Victory) {
        game.new_game();
        return Some("New game - press SPACE to start".to_string());
    }
    match game.advance_level()? {
        TransitionKind::NewGame => Some(
            "Congratulations! You completed all levels! New game - press SPACE to start"
                .to_string(),
        ),
        _ => Some(format!("Level {} - Collect all orbs!", game.level())),
    }
}

fn describe(event: &GameEvent, game: &GameState) -> Option<String> {
    match event {
        GameEvent::OrbCollected { combo, .. } if *combo > 1 => Some(format!("Combo x{combo}!")),
        GameEvent::OrbCollected { .. } => None,
        GameEvent::AllOrbsCollected => Some("All orbs collected! Find the exit!".to_string()),
        GameEvent::PowerCollected => Some(format!(
            "Enemy frozen for {} seconds!",
            game.config().freeze_secs as u32
        )),
        GameEvent::CollectOrbsFirst => Some("Collect all orbs first!".to_string()),
        GameEvent::LifeLost(reason) => Some(format!(
            "Life lost: {reason}! Lives remaining: {}",
            game.lives()
        )),
        GameEvent::LevelComplete { level } => Some(format!(
            "Level {level} completed! +{} points!",
            maze_escape::game::ESCAPE_BONUS
        )),
        GameEvent::GameOver { score } => Some(format!("Game Over! Final Score: {score}")),
        GameEvent::VictoryAll { .. } => {
            Some("Congratulations! You completed all levels!".to_string())
        }
    }
}
