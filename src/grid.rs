//! Grid state: typed cells, bounds checks and rejection-sampled placement.

use rand::Rng;
use std::fmt;
use thiserror::Error;

/// Cells per grid edge. The grid is always square.
pub const MAP_EDGE: usize = 10;

/// Placement gives up after this many samples without finding an empty cell.
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 10_000;

/// 1-based player id (1..=3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// Zero-based index into the registry and colour tables.
    #[inline]
    pub fn index(self) -> usize {
        usize::from(self.0).saturating_sub(1)
    }
}

/// Travel direction of a rock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RockDir {
    Down,
    Right,
}

impl RockDir {
    /// Row/column delta applied once per tick.
    #[inline]
    pub fn delta(self) -> (isize, isize) {
        match self {
            Self::Down => (1, 0),
            Self::Right => (0, 1),
        }
    }
}

/// Single cell: empty, a player, or a rock travelling in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Player(PlayerId),
    Rock(RockDir),
}

impl Cell {
    /// Integer encoding: 0 empty, k player id, -1 down rock, -2 right rock.
    pub fn value(self) -> i8 {
        match self {
            Self::Empty => 0,
            Self::Player(id) => id.0 as i8,
            Self::Rock(RockDir::Down) => -1,
            Self::Rock(RockDir::Right) => -2,
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("no empty cell found in {height}x{width} area at ({row}, {col}) after {attempts} attempts")]
    PlacementExhausted {
        row: usize,
        col: usize,
        height: usize,
        width: usize,
        attempts: u32,
    },
    #[error("placement area {height}x{width} at ({row}, {col}) does not fit the grid")]
    AreaOutOfBounds {
        row: usize,
        col: usize,
        height: usize,
        width: usize,
    },
}

/// Square grid, row-major. `(0, 0)` is the top-left cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new() -> Self {
        Self {
            cells: vec![Cell::Empty; MAP_EDGE * MAP_EDGE],
        }
    }

    #[inline]
    pub fn in_bounds(row: isize, col: isize) -> bool {
        row >= 0 && col >= 0 && (row as usize) < MAP_EDGE && (col as usize) < MAP_EDGE
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        if row >= MAP_EDGE || col >= MAP_EDGE {
            return None;
        }
        self.cells.get(row * MAP_EDGE + col).copied()
    }

    /// Writes are ignored outside the grid.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        if row < MAP_EDGE && col < MAP_EDGE {
            self.cells[row * MAP_EDGE + col] = cell;
        }
    }

    /// True if `(row, col)` is inside the grid and empty.
    pub fn is_cell_empty(&self, row: isize, col: isize) -> bool {
        Self::in_bounds(row, col) && self.get(row as usize, col as usize) == Some(Cell::Empty)
    }

    /// Iterate `(row, col, cell)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, &c)| (i / MAP_EDGE, i % MAP_EDGE, c))
    }

    /// Number of cells holding `cell`.
    #[cfg(test)]
    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|&&c| c == cell).count()
    }

    /// Uniformly sample an empty cell in `[row, row + height) x [col, col + width)`.
    /// Re-samples until an empty cell turns up, up to `MAX_PLACEMENT_ATTEMPTS`.
    pub fn random_empty_in_range<R: Rng>(
        &self,
        rng: &mut R,
        row: usize,
        col: usize,
        height: usize,
        width: usize,
    ) -> Result<(usize, usize), GridError> {
        if height == 0 || width == 0 || row + height > MAP_EDGE || col + width > MAP_EDGE {
            return Err(GridError::AreaOutOfBounds {
                row,
                col,
                height,
                width,
            });
        }
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let r = row + rng.random_range(0..height);
            let c = col + rng.random_range(0..width);
            if self.get(r, c) == Some(Cell::Empty) {
                return Ok((r, c));
            }
        }
        Err(GridError::PlacementExhausted {
            row,
            col,
            height,
            width,
            attempts: MAX_PLACEMENT_ATTEMPTS,
        })
    }
}

/// One line per row of integer cell values, for logs.
impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(MAP_EDGE) {
            let line: Vec<String> = row.iter().map(|c| format!("{:>2}", c.value())).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_cell_values() {
        assert_eq!(Cell::Empty.value(), 0);
        assert_eq!(Cell::Player(PlayerId(3)).value(), 3);
        assert_eq!(Cell::Rock(RockDir::Down).value(), -1);
        assert_eq!(Cell::Rock(RockDir::Right).value(), -2);
    }

    #[test]
    fn test_display_rows() {
        let mut grid = Grid::new();
        grid.set(0, 0, Cell::Rock(RockDir::Right));
        grid.set(0, 1, Cell::Player(PlayerId(2)));
        let text = grid.to_string();
        assert_eq!(text.lines().count(), MAP_EDGE);
        assert!(text.starts_with("-2  2  0"));
    }

    #[test]
    fn test_is_cell_empty_bounds() {
        let mut grid = Grid::new();
        assert!(grid.is_cell_empty(0, 0));
        assert!(!grid.is_cell_empty(-1, 0));
        assert!(!grid.is_cell_empty(0, MAP_EDGE as isize));
        grid.set(2, 3, Cell::Rock(RockDir::Down));
        assert!(!grid.is_cell_empty(2, 3));
    }

    #[test]
    fn test_set_out_of_bounds_is_ignored() {
        let mut grid = Grid::new();
        grid.set(MAP_EDGE, 0, Cell::Rock(RockDir::Down));
        grid.set(0, MAP_EDGE, Cell::Rock(RockDir::Right));
        assert_eq!(grid, Grid::new());
    }

    #[test]
    fn test_random_empty_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let grid = Grid::new();
        for _ in 0..500 {
            let (r, c) = grid.random_empty_in_range(&mut rng, 1, 1, 8, 8).unwrap();
            assert!((1..9).contains(&r));
            assert!((1..9).contains(&c));
        }
    }

    #[test]
    fn test_random_empty_finds_last_free_cell() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut grid = Grid::new();
        for r in 0..2 {
            for c in 0..2 {
                grid.set(r, c, Cell::Rock(RockDir::Right));
            }
        }
        grid.set(1, 1, Cell::Empty);
        assert_eq!(grid.random_empty_in_range(&mut rng, 0, 0, 2, 2), Ok((1, 1)));
    }

    #[test]
    fn test_random_empty_fails_fast_when_full() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut grid = Grid::new();
        grid.set(4, 4, Cell::Player(PlayerId(1)));
        let err = grid.random_empty_in_range(&mut rng, 4, 4, 1, 1).unwrap_err();
        assert!(matches!(err, GridError::PlacementExhausted { .. }));
    }

    #[test]
    fn test_random_empty_rejects_oversized_area() {
        let mut rng = StdRng::seed_from_u64(1);
        let grid = Grid::new();
        let err = grid
            .random_empty_in_range(&mut rng, 5, 5, MAP_EDGE, 2)
            .unwrap_err();
        assert!(matches!(err, GridError::AreaOutOfBounds { .. }));
    }
}
