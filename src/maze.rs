use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

const LATTICE_MARGIN: usize = 2;
const CORRIDOR_SKIP: f64 = 0.1;
const OPEN_THRESHOLD: f64 = 0.4;
const OBSTACLE_THRESHOLD: f64 = 0.6;
const SPAWN_RADIUS: usize = 2;
const MIN_NORMAL_ORBS: usize = 25;
const MIN_POWER_ORBS: usize = 3;
const NORMAL_ORB_THRESHOLD: f64 = 0.5;
const POWER_ORB_THRESHOLD: f64 = 0.8;
const PLACEMENT_ATTEMPTS: usize = 100;
const EXIT_STRIDE: usize = 3;
const DECOY_LEVEL: u32 = 2;
const DECOY_DOORS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Wall,
    NormalOrb,
    PowerOrb,
    Exit,
}

impl Cell {
    pub fn is_orb(self) -> bool {
        matches!(self, Cell::NormalOrb | Cell::PowerOrb)
    }

    fn from_char(ch: char) -> Option<Self> {
        match ch {
            '.' | ' ' => Some(Cell::Empty),
            '#' => Some(Cell::Wall),
            'o' => Some(Cell::NormalOrb),
            '*' => Some(Cell::PowerOrb),
            'E' => Some(Cell::Exit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub row: usize,
    pub col: usize,
}

impl GridPos {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn manhattan(self, other: GridPos) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

/// The cell layout of one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize, fill: Cell) -> Self {
        Self {
            rows,
            cols,
            cells: vec![vec![fill; cols]; rows],
        }
    }

    /// Builds a grid from text rows: `#` wall, `.` empty, `o` orb, `*` power
    /// orb, `E` exit. Returns `None` on ragged rows or unknown characters.
    pub fn parse(text: &str) -> Option<Self> {
        let cells: Vec<Vec<Cell>> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.chars().map(Cell::from_char).collect::<Option<Vec<_>>>())
            .collect::<Option<_>>()?;
        let rows = cells.len();
        let cols = cells.first()?.len();
        if cols == 0 || cells.iter().any(|row| row.len() != cols) {
            return None;
        }
        Some(Self { rows, cols, cells })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn clamp(&self, row: usize, col: usize) -> (usize, usize) {
        (
            row.min(self.rows.saturating_sub(1)),
            col.min(self.cols.saturating_sub(1)),
        )
    }

    pub fn in_bounds(&self, row: isize, col: isize) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Cell {
        let (row, col) = self.clamp(row, col);
        self.cells[row][col]
    }

    pub fn is_walkable(&self, row: usize, col: usize) -> bool {
        self.cell_at(row, col) != Cell::Wall
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        let (row, col) = self.clamp(row, col);
        self.cells[row][col] = cell;
    }

    /// Clears the cell and hands back what was there.
    pub fn consume(&mut self, row: usize, col: usize) -> Cell {
        let (row, col) = self.clamp(row, col);
        std::mem::replace(&mut self.cells[row][col], Cell::Empty)
    }

    pub fn count_orbs(&self) -> usize {
        self.cells
            .iter()
            .flat_map(|row| row.iter())
            .filter(|cell| cell.is_orb())
            .count()
    }

    pub fn cells_of(&self, kind: Cell) -> Vec<GridPos> {
        let mut found = Vec::new();
        for (row, line) in self.cells.iter().enumerate() {
            for (col, cell) in line.iter().enumerate() {
                if *cell == kind {
                    found.push(GridPos { row, col });
                }
            }
        }
        found
    }

    fn is_border(&self, row: usize, col: usize) -> bool {
        row == 0 || col == 0 || row == self.rows - 1 || col == self.cols - 1
    }
}

pub struct GeneratedMaze {
    pub grid: Grid,
    /// Inner-ring cells that were open when exits were placed.
    pub exit_candidates: Vec<GridPos>,
    /// Candidates that were marked as `Exit`.
    pub exits: Vec<GridPos>,
}

/// Generates a deliberately open maze. Orb counts are upper bounds and no
/// connectivity is guaranteed; a level without exits is accepted.
pub fn generate(rng: &mut impl Rng, rows: usize, cols: usize, level: u32) -> GeneratedMaze {
    let mut grid = Grid::new(rows, cols, Cell::Wall);
    for row in 0..rows {
        for col in 0..cols {
            if grid.is_border(row, col) {
                grid.cells[row][col] = Cell::Empty;
            }
        }
    }

    carve_lattice(&mut grid, rng);
    open_interior(&mut grid, rng);
    clear_spawn_block(&mut grid);
    place_obstacles(&mut grid, rng, level);
    place_orbs(&mut grid, rng);
    let (exit_candidates, exits) = place_exits(&mut grid, rng, level);

    GeneratedMaze {
        grid,
        exit_candidates,
        exits,
    }
}

fn carve_lattice(grid: &mut Grid, rng: &mut impl Rng) {
    let (rows, cols) = (grid.rows, grid.cols);
    for r in (LATTICE_MARGIN..rows - LATTICE_MARGIN).step_by(2) {
        for c in (LATTICE_MARGIN..cols - LATTICE_MARGIN).step_by(2) {
            grid.cells[r][c] = Cell::Empty;
            if c < cols - 3 && rng.gen::<f64>() > CORRIDOR_SKIP {
                grid.cells[r][c + 1] = Cell::Empty;
            }
            if r < rows - 3 && rng.gen::<f64>() > CORRIDOR_SKIP {
                grid.cells[r + 1][c] = Cell::Empty;
            }
        }
    }
}

fn open_interior(grid: &mut Grid, rng: &mut impl Rng) {
    for r in 1..grid.rows - 1 {
        for c in 1..grid.cols - 1 {
            if rng.gen::<f64>() > OPEN_THRESHOLD {
                grid.cells[r][c] = Cell::Empty;
            }
        }
    }
}

fn clear_spawn_block(grid: &mut Grid) {
    let center = center_of(grid);
    for r in center.row - SPAWN_RADIUS..=center.row + SPAWN_RADIUS {
        for c in center.col - SPAWN_RADIUS..=center.col + SPAWN_RADIUS {
            grid.set(r, c, Cell::Empty);
        }
    }
}

fn place_obstacles(grid: &mut Grid, rng: &mut impl Rng, level: u32) {
    let center = center_of(grid);
    for _ in 0..level * 2 {
        let r = rng.gen_range(2..grid.rows - 2);
        let c = rng.gen_range(2..grid.cols - 2);
        if rng.gen::<f64>() > OBSTACLE_THRESHOLD && !is_near_spawn(center, r, c) {
            grid.cells[r][c] = Cell::Wall;
        }
    }
}

fn place_orbs(grid: &mut Grid, rng: &mut impl Rng) {
    let normal = MIN_NORMAL_ORBS.max(grid.rows * grid.cols / 6);
    let power = MIN_POWER_ORBS.max(normal / 10);
    for _ in 0..normal {
        try_place(grid, rng, Cell::NormalOrb, NORMAL_ORB_THRESHOLD);
    }
    for _ in 0..power {
        try_place(grid, rng, Cell::PowerOrb, POWER_ORB_THRESHOLD);
    }
}

fn try_place(grid: &mut Grid, rng: &mut impl Rng, orb: Cell, threshold: f64) -> bool {
    for _ in 0..PLACEMENT_ATTEMPTS {
        let r = rng.gen_range(1..grid.rows - 1);
        let c = rng.gen_range(1..grid.cols - 1);
        if grid.cells[r][c] == Cell::Empty && rng.gen::<f64>() > threshold {
            grid.cells[r][c] = orb;
            return true;
        }
    }
    false
}

fn place_exits(grid: &mut Grid, rng: &mut impl Rng, level: u32) -> (Vec<GridPos>, Vec<GridPos>) {
    let (rows, cols) = (grid.rows, grid.cols);
    let mut candidates = Vec::new();
    for c in (2..cols - 2).step_by(EXIT_STRIDE) {
        for r in [1, rows - 2] {
            if grid.cells[r][c] == Cell::Empty {
                candidates.push(GridPos::new(r, c));
            }
        }
    }
    for r in (2..rows - 2).step_by(EXIT_STRIDE) {
        for c in [1, cols - 2] {
            if grid.cells[r][c] == Cell::Empty {
                candidates.push(GridPos::new(r, c));
            }
        }
    }

    candidates.shuffle(rng);
    let doors = if level == DECOY_LEVEL { DECOY_DOORS } else { 1 };
    let exits: Vec<GridPos> = candidates.iter().copied().take(doors).collect();
    for pos in &exits {
        grid.cells[pos.row][pos.col] = Cell::Exit;
    }
    (candidates, exits)
}

pub fn center_of(grid: &Grid) -> GridPos {
    GridPos::new(grid.rows / 2, grid.cols / 2)
}

fn is_near_spawn(center: GridPos, row: usize, col: usize) -> bool {
    row.abs_diff(center.row) <= SPAWN_RADIUS && col.abs_diff(center.col) <= SPAWN_RADIUS
}
