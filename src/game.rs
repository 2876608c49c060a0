//! Game state and the tick simulation: movement, rocks, spawning, tick gating.

use crate::grid::{Cell, Grid, GridError, MAP_EDGE, PlayerId, RockDir};
use crate::input::KeyState;
use crate::player::{ControlScheme, Direction, Liveness, PLAYER_COUNT, Player};
use log::{info, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Chance per edge cell per tick of a new rock.
pub const SPAWN_CHANCE: f64 = 0.04;

/// Time between simulation ticks.
pub const TICK_PERIOD: Duration = Duration::from_millis(200);

/// Players start inside the border ring, away from the spawn edges.
const INSET: usize = 1;

/// Tracks when the last tick ran. `None` means a tick is due now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickClock {
    pub period: Duration,
    last_tick: Option<Duration>,
}

impl TickClock {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_tick: None,
        }
    }

    /// Time since the last tick, or `None` before the first one.
    pub fn elapsed(&self, now: Duration) -> Option<Duration> {
        self.last_tick.map(|t| now.saturating_sub(t))
    }

    /// True once strictly more than one period has passed.
    pub fn is_due(&self, now: Duration) -> bool {
        self.elapsed(now).is_none_or(|e| e > self.period)
    }

    /// Fraction of the period elapsed, clamped to 0.0..=1.0.
    pub fn progress(&self, now: Duration) -> f64 {
        match self.elapsed(now) {
            None => 1.0,
            Some(_) if self.period.is_zero() => 1.0,
            Some(e) => (e.as_secs_f64() / self.period.as_secs_f64()).clamp(0.0, 1.0),
        }
    }

    /// Restart the period at `now` (after a tick or on resume from pause).
    pub fn reset(&mut self, now: Duration) {
        self.last_tick = Some(now);
    }
}

/// What a call to [`GameState::step`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// A full tick ran.
    Ticked(TickReport),
    /// Not due yet; nothing changed. Carries the elapsed fraction of the period.
    Waiting(f64),
}

/// Per-tick summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub moved: Vec<PlayerId>,
    pub eliminated: Vec<PlayerId>,
    pub rocks_spawned: usize,
}

/// Game state: grid, players, RNG and tick clock.
#[derive(Debug)]
pub struct GameState {
    pub grid: Grid,
    pub players: Vec<Player>,
    pub clock: TickClock,
    pub ticks: u64,
    rng: StdRng,
}

impl GameState {
    /// New round with `player_count` players, seeded from `seed` or OS entropy.
    pub fn new(player_count: usize, seed: Option<u64>) -> Result<Self, GridError> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(player_count, rng)
    }

    pub fn with_rng(player_count: usize, rng: StdRng) -> Result<Self, GridError> {
        let mut state = Self {
            grid: Grid::new(),
            players: Vec::with_capacity(PLAYER_COUNT),
            clock: TickClock::new(TICK_PERIOD),
            ticks: 0,
            rng,
        };
        state.place_players(player_count.clamp(1, PLAYER_COUNT))?;
        info!("round started with {} players", state.players.len());
        Ok(state)
    }

    fn place_players(&mut self, count: usize) -> Result<(), GridError> {
        let span = MAP_EDGE - 2 * INSET;
        for (k, controls) in ControlScheme::ALL.iter().take(count).enumerate() {
            let (row, col) = self
                .grid
                .random_empty_in_range(&mut self.rng, INSET, INSET, span, span)?;
            let id = PlayerId(k as u8 + 1);
            self.grid.set(row, col, Cell::Player(id));
            self.players.push(Player {
                id,
                row,
                col,
                controls: *controls,
            });
        }
        Ok(())
    }

    /// Liveness of every player, in registry order.
    pub fn liveness(&self) -> Vec<Liveness> {
        self.players.iter().map(|p| p.liveness(&self.grid)).collect()
    }

    pub fn alive_count(&self) -> usize {
        self.liveness()
            .iter()
            .filter(|l| matches!(l, Liveness::Alive { .. }))
            .count()
    }

    /// Round is over once nobody is left.
    pub fn all_eliminated(&self) -> bool {
        self.alive_count() == 0
    }

    /// Called once per frame. Runs a full tick if the period has elapsed, then
    /// tells `keys` the tick consumed them.
    pub fn step<K: KeyState>(&mut self, keys: &mut K, now: Duration) -> StepOutcome {
        if !self.clock.is_due(now) {
            return StepOutcome::Waiting(self.clock.progress(now));
        }
        self.clock.reset(now);
        let report = self.tick(&*keys);
        keys.end_tick();
        StepOutcome::Ticked(report)
    }

    /// Movement, then rocks, then spawning.
    pub fn tick<K: KeyState>(&mut self, keys: &K) -> TickReport {
        let before = self.liveness();
        let moved = self.movement_phase(keys, &before);
        self.rock_phase();
        let rocks_spawned = self.spawn_phase();
        self.ticks += 1;

        let eliminated: Vec<PlayerId> = self
            .players
            .iter()
            .zip(&before)
            .filter(|(p, was)| {
                matches!(was, Liveness::Alive { .. })
                    && p.liveness(&self.grid) == Liveness::Eliminated
            })
            .map(|(p, _)| p.id)
            .collect();
        for id in &eliminated {
            info!("player {} eliminated on tick {}", id.0, self.ticks);
        }
        trace!(
            "tick {}: moved {:?}, spawned {} rocks\n{}",
            self.ticks, moved, rocks_spawned, self.grid
        );
        TickReport {
            moved,
            eliminated,
            rocks_spawned,
        }
    }

    /// Each live player takes the first pressed direction (by priority) that leads to an
    /// empty in-bounds cell. At most one move per player.
    fn movement_phase<K: KeyState>(&mut self, keys: &K, liveness: &[Liveness]) -> Vec<PlayerId> {
        let mut moved = Vec::new();
        for (player, state) in self.players.iter_mut().zip(liveness) {
            let Liveness::Alive { row, col } = *state else {
                continue;
            };
            let target = Direction::PRIORITY.iter().find_map(|&dir| {
                let (dr, dc) = dir.delta();
                let (r, c) = (row as isize + dr, col as isize + dc);
                (keys.is_pressed(player.controls.key(dir)) && self.grid.is_cell_empty(r, c))
                    .then_some((r as usize, c as usize))
            });
            if let Some((r, c)) = target {
                self.grid.set(row, col, Cell::Empty);
                self.grid.set(r, c, Cell::Player(player.id));
                player.row = r;
                player.col = c;
                moved.push(player.id);
            }
        }
        moved
    }

    /// Advance every rock one cell. Rows bottom-up, columns right-to-left, so a rock
    /// that just moved is never visited again this tick. Rocks leaving the grid vanish.
    fn rock_phase(&mut self) {
        for row in (0..MAP_EDGE).rev() {
            for col in (0..MAP_EDGE).rev() {
                let Some(Cell::Rock(dir)) = self.grid.get(row, col) else {
                    continue;
                };
                self.grid.set(row, col, Cell::Empty);
                let (dr, dc) = dir.delta();
                let (r, c) = (row as isize + dr, col as isize + dc);
                if Grid::in_bounds(r, c) {
                    self.grid.set(r as usize, c as usize, Cell::Rock(dir));
                }
            }
        }
    }

    /// Reseed the left column with right-moving rocks, then the top row with
    /// down-moving rocks. Both passes overwrite whatever was there.
    fn spawn_phase(&mut self) -> usize {
        let mut spawned = 0;
        for row in 0..MAP_EDGE {
            let cell = if self.rng.random_bool(SPAWN_CHANCE) {
                Cell::Rock(RockDir::Right)
            } else {
                Cell::Empty
            };
            self.grid.set(row, 0, cell);
        }
        for col in 0..MAP_EDGE {
            let cell = if self.rng.random_bool(SPAWN_CHANCE) {
                Cell::Rock(RockDir::Down)
            } else {
                Cell::Empty
            };
            self.grid.set(0, col, cell);
        }
        for i in 0..MAP_EDGE {
            if matches!(self.grid.get(i, 0), Some(Cell::Rock(_))) {
                spawned += 1;
            }
            if i > 0 && matches!(self.grid.get(0, i), Some(Cell::Rock(_))) {
                spawned += 1;
            }
        }
        spawned
    }
}
