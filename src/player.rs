//! Player registry: positions, fixed control schemes, derived liveness.

use crate::grid::{Cell, Grid, PlayerId};
use crossterm::event::KeyCode;

/// Number of local players and fixed control schemes.
pub const PLAYER_COUNT: usize = 3;

/// Movement direction on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Order in which pressed directions are tried; the first valid one wins.
    pub const PRIORITY: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// (row delta, col delta).
    #[inline]
    pub fn delta(self) -> (isize, isize) {
        match self {
            Self::Up => (-1, 0),
            Self::Down => (1, 0),
            Self::Left => (0, -1),
            Self::Right => (0, 1),
        }
    }
}

/// Keys bound to the four directions for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlScheme {
    pub name: &'static str,
    pub up: KeyCode,
    pub down: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
}

impl ControlScheme {
    pub const WASD: Self = Self {
        name: "WASD",
        up: KeyCode::Char('w'),
        down: KeyCode::Char('s'),
        left: KeyCode::Char('a'),
        right: KeyCode::Char('d'),
    };

    pub const ARROWS: Self = Self {
        name: "Arrows",
        up: KeyCode::Up,
        down: KeyCode::Down,
        left: KeyCode::Left,
        right: KeyCode::Right,
    };

    pub const IJKL: Self = Self {
        name: "IJKL",
        up: KeyCode::Char('i'),
        down: KeyCode::Char('k'),
        left: KeyCode::Char('j'),
        right: KeyCode::Char('l'),
    };

    /// Scheme for player index 0..PLAYER_COUNT.
    pub const ALL: [Self; PLAYER_COUNT] = [Self::WASD, Self::ARROWS, Self::IJKL];

    #[inline]
    pub fn key(&self, dir: Direction) -> KeyCode {
        match dir {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }
}

/// Whether a player is still on the board, read back from the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive { row: usize, col: usize },
    Eliminated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub row: usize,
    pub col: usize,
    pub controls: ControlScheme,
}

impl Player {
    /// Alive iff the recorded cell still holds this player's id.
    pub fn liveness(&self, grid: &Grid) -> Liveness {
        if grid.get(self.row, self.col) == Some(Cell::Player(self.id)) {
            Liveness::Alive {
                row: self.row,
                col: self.col,
            }
        } else {
            Liveness::Eliminated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::RockDir;

    fn player_at(row: usize, col: usize) -> Player {
        Player {
            id: PlayerId(2),
            row,
            col,
            controls: ControlScheme::ARROWS,
        }
    }

    #[test]
    fn test_liveness_reads_grid() {
        let mut grid = Grid::new();
        let p = player_at(3, 4);
        assert_eq!(p.liveness(&grid), Liveness::Eliminated);
        grid.set(3, 4, Cell::Player(PlayerId(2)));
        assert_eq!(p.liveness(&grid), Liveness::Alive { row: 3, col: 4 });
        grid.set(3, 4, Cell::Rock(RockDir::Down));
        assert_eq!(p.liveness(&grid), Liveness::Eliminated);
    }

    #[test]
    fn test_schemes_do_not_share_keys() {
        for (i, a) in ControlScheme::ALL.iter().enumerate() {
            for b in &ControlScheme::ALL[i + 1..] {
                for da in Direction::PRIORITY {
                    for db in Direction::PRIORITY {
                        assert_ne!(a.key(da), b.key(db), "{} and {} share a key", a.name, b.name);
                    }
                }
            }
        }
    }

    #[test]
    fn test_direction_deltas() {
        assert_eq!(Direction::Up.delta(), (-1, 0));
        assert_eq!(Direction::Down.delta(), (1, 0));
        assert_eq!(Direction::Left.delta(), (0, -1));
        assert_eq!(Direction::Right.delta(), (0, 1));
    }
}
