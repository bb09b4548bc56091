use crossterm::cursor::MoveTo;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::QueueableCommand;
use std::io::{self, Stdout, Write};
use unicode_width::UnicodeWidthStr;

use maze_escape::{Cell as Tile, GameState, GridPos, Intent, Phase};

const CELL_W: usize = 2;
const HEART: &str = "♥";
const EMPTY_HEART: &str = "♡";

#[derive(Clone, Copy, PartialEq)]
enum Glyph {
    Player(Intent),
    Enemy,
    Frozen,
    Wall,
    Empty,
    Orb,
    Power,
    Exit,
}

#[derive(Clone, Copy, PartialEq)]
struct Cell {
    glyph: Glyph,
    color: Color,
}

pub struct Renderer {
    rows: usize,
    cols: usize,
    last: Vec<Cell>,
    last_hud: Vec<(String, Color)>,
    last_status: String,
    needs_full: bool,
    origin_x: u16,
    origin_y: u16,
}

impl Renderer {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            last: vec![
                Cell {
                    glyph: Glyph::Empty,
                    color: Color::Reset,
                };
                rows * cols
            ],
            last_hud: Vec::new(),
            last_status: String::new(),
            needs_full: true,
            origin_x: 0,
            origin_y: 1,
        }
    }

    pub fn draw(
        &mut self,
        stdout: &mut Stdout,
        game: &GameState,
        message: Option<&str>,
    ) -> io::Result<()> {
        let needed_h = (self.rows + 2) as u16;
        let needed_w = (self.cols * CELL_W) as u16;

        let (term_w, term_h) = terminal::size()?;
        if term_w < needed_w || term_h < needed_h {
            stdout.queue(MoveTo(0, 0))?;
            stdout.queue(Clear(ClearType::All))?;
            stdout.queue(Print(format!(
                "Terminal too small. Need at least {}x{} (cols x rows). Current: {}x{}.",
                needed_w, needed_h, term_w, term_h
            )))?;
            stdout.flush()?;
            self.needs_full = true;
            return Ok(());
        }

        let origin_x = (term_w - needed_w) / 2;
        let origin_y = (term_h - needed_h) / 2 + 1;
        if self.needs_full || origin_x != self.origin_x || origin_y != self.origin_y {
            self.origin_x = origin_x;
            self.origin_y = origin_y;
            self.needs_full = true;
            stdout.queue(Clear(ClearType::All))?;
        }

        let hud = hud_segments(game);
        if self.needs_full || hud != self.last_hud {
            self.print_segments(stdout, self.origin_y - 1, &hud)?;
            self.last_hud = hud;
        }

        for row in 0..self.rows {
            for col in 0..self.cols {
                let cell = cell_for(game, GridPos::new(row, col));
                let idx = row * self.cols + col;
                if self.needs_full || cell != self.last[idx] {
                    self.last[idx] = cell;
                    self.draw_cell(stdout, row, col, cell)?;
                }
            }
        }

        let status = status_line(game, message);
        if self.needs_full || status != self.last_status {
            let y = self.origin_y + self.rows as u16;
            self.print_line(stdout, y, &status, Color::Yellow)?;
            self.last_status = status;
        }
        self.needs_full = false;

        stdout.flush()
    }

    fn print_line(&self, stdout: &mut Stdout, y: u16, text: &str, color: Color) -> io::Result<()> {
        stdout.queue(MoveTo(self.origin_x, y))?;
        stdout.queue(Clear(ClearType::CurrentLine))?;
        stdout.queue(SetForegroundColor(color))?;
        stdout.queue(Print(text))?;
        stdout.queue(ResetColor)?;
        Ok(())
    }

    fn print_segments(
        &self,
        stdout: &mut Stdout,
        y: u16,
        parts: &[(String, Color)],
    ) -> io::Result<()> {
        stdout.queue(MoveTo(self.origin_x, y))?;
        stdout.queue(Clear(ClearType::CurrentLine))?;
        for (text, color) in parts {
            stdout.queue(SetForegroundColor(*color))?;
            stdout.queue(Print(text))?;
        }
        stdout.queue(ResetColor)?;
        Ok(())
    }

    fn draw_cell(&self, stdout: &mut Stdout, row: usize, col: usize, cell: Cell) -> io::Result<()> {
        let text = match cell.glyph {
            Glyph::Player(Intent::Up) => "▲",
            Glyph::Player(Intent::Down) => "▼",
            Glyph::Player(Intent::Left) => "◀",
            Glyph::Player(_) => "▶",
            Glyph::Enemy => "👻",
            Glyph::Frozen => "🥶",
            Glyph::Wall => "██",
            Glyph::Empty => "  ",
            Glyph::Orb => "· ",
            Glyph::Power => "● ",
            Glyph::Exit => "[]",
        };
        let x_pos = self.origin_x + (col * CELL_W) as u16;
        let y_pos = self.origin_y + row as u16;
        stdout.queue(MoveTo(x_pos, y_pos))?;
        stdout.queue(SetForegroundColor(cell.color))?;
        stdout.queue(Print(text))?;
        let w = UnicodeWidthStr::width(text);
        for _ in w..CELL_W {
            stdout.queue(Print(' '))?;
        }
        stdout.queue(ResetColor)?;
        Ok(())
    }
}

fn cell_for(game: &GameState, pos: GridPos) -> Cell {
    if pos == game.player_cell() {
        return Cell {
            glyph: Glyph::Player(game.player().facing),
            color: Color::Cyan,
        };
    }
    if pos == game.enemy_cell() {
        return if game.enemy_frozen() {
            Cell {
                glyph: Glyph::Frozen,
                color: Color::Blue,
            }
        } else if game.enemy_near() {
            Cell {
                glyph: Glyph::Enemy,
                color: Color::Red,
            }
        } else {
            Cell {
                glyph: Glyph::Enemy,
                color: Color::DarkYellow,
            }
        };
    }
    match game.cell_at(pos.row, pos.col) {
        Tile::Wall => Cell {
            glyph: Glyph::Wall,
            color: Color::Blue,
        },
        Tile::Empty => Cell {
            glyph: Glyph::Empty,
            color: Color::Reset,
        },
        Tile::NormalOrb => Cell {
            glyph: Glyph::Orb,
            color: Color::Yellow,
        },
        Tile::PowerOrb => Cell {
            glyph: Glyph::Power,
            color: Color::Magenta,
        },
        Tile::Exit => Cell {
            glyph: Glyph::Exit,
            color: Color::Cyan,
        },
    }
}

/// Green above half the level time, yellow above a quarter, red below.
fn time_color(fraction: f64) -> Color {
    if fraction > 0.5 {
        Color::Green
    } else if fraction > 0.25 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn hud_segments(game: &GameState) -> Vec<(String, Color)> {
    let initial = game.config().initial_lives;
    let hearts: String = (0..initial)
        .map(|i| if i < game.lives() { HEART } else { EMPTY_HEART })
        .collect();
    let fraction = game.timer_fraction();
    vec![
        (
            format!("Score: {}  Level: {}  ", game.score(), game.level()),
            Color::White,
        ),
        (
            format!("Time: {}s ({:.0}%)", game.timer() as u32, fraction * 100.0),
            time_color(fraction),
        ),
        (
            format!(
                "  Orbs: {}  Lives: {}  Combo: x{}",
                game.orbs_left(),
                hearts,
                game.combo().max(1)
            ),
            Color::White,
        ),
    ]
}

fn status_line(game: &GameState, message: Option<&str>) -> String {
    if let Some(message) = message {
        return message.to_string();
    }
    match game.phase() {
        Phase::NotStarted => "Press SPACE to start (q to quit)".to_string(),
        Phase::Paused => "Paused - press SPACE to continue".to_string(),
        Phase::GameOver => format!("GAME OVER - Final Score: {}", game.score()),
        Phase::Victory => format!("YOU ESCAPED - Final Score: {} (n for a new run)", game.score()),
        _ if game.enemy_near() && !game.enemy_frozen() => "The enemy is close!".to_string(),
        _ => "space pause  r restart  n next  q quit".to_string(),
    }
}
