//! Keyboard state: which keys are held right now, plus meta key bindings.
//!
//! The simulation only asks "is this key pressed?" through [`KeyState`].
//! [`InputState`] answers it from crossterm key events. Terminals with the
//! keyboard enhancement protocol report releases; on the rest a key counts
//! as held until `HOLD_TIMEOUT` passes without a press or repeat.
//!
//! Each Press or Repeat also latches the key for the next tick only, so a tap
//! shorter than a tick still moves once and never moves twice.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Fallback release detection when the terminal never sends Release.
const HOLD_TIMEOUT: Duration = Duration::from_millis(220);

/// Query against the current keyboard state.
pub trait KeyState {
    fn is_pressed(&self, code: KeyCode) -> bool;

    /// Called after a tick has read the keys.
    fn end_tick(&mut self) {}
}

impl KeyState for HashSet<KeyCode> {
    fn is_pressed(&self, code: KeyCode) -> bool {
        self.contains(&normalize(code))
    }
}

/// Letters match regardless of shift / caps lock.
fn normalize(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

/// Held keys tracked from terminal events.
#[derive(Debug, Default)]
pub struct InputState {
    /// Last Press/Repeat time per key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys pressed or repeated since the last tick.
    fresh: HashSet<KeyCode>,
    /// Honor Release events; only set once the terminal confirmed enhancement support.
    pub honor_release: bool,
}

impl InputState {
    pub fn new(honor_release: bool) -> Self {
        Self {
            last_active: HashMap::with_capacity(16),
            fresh: HashSet::with_capacity(16),
            honor_release,
        }
    }

    /// Update held keys from one key event.
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        let code = normalize(key.code);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&code);
            }
            KeyEventKind::Release => {}
            _ => {
                self.last_active.insert(code, now);
                self.fresh.insert(code);
            }
        }
    }

    /// Drop keys whose hold timed out. No-op when releases are honored.
    pub fn expire(&mut self, now: Instant) {
        if self.honor_release {
            return;
        }
        self.last_active
            .retain(|_, t| now.saturating_duration_since(*t) < HOLD_TIMEOUT);
        self.fresh.retain(|code| self.last_active.contains_key(code));
    }

    /// Forget everything (focus lost, round restart).
    pub fn clear(&mut self) {
        self.last_active.clear();
        self.fresh.clear();
    }

    fn is_held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active
            .get(&normalize(code))
            .is_some_and(|t| self.honor_release || now.saturating_duration_since(*t) < HOLD_TIMEOUT)
    }

    /// Pressed for the purpose of one tick. With releases, a held key or a tap
    /// since the last tick. Without them, only a press or repeat since the last
    /// tick, so the hold timeout alone never moves a player.
    fn is_pressed_at(&self, code: KeyCode, now: Instant) -> bool {
        let code = normalize(code);
        if self.honor_release {
            self.fresh.contains(&code) || self.last_active.contains_key(&code)
        } else {
            self.fresh.contains(&code) && self.is_held_at(code, now)
        }
    }
}

impl KeyState for InputState {
    fn is_pressed(&self, code: KeyCode) -> bool {
        self.is_pressed_at(code, Instant::now())
    }

    fn end_tick(&mut self) {
        self.fresh.clear();
    }
}

/// App-level action from a key press (movement keys are read as held state instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Pause,
    Restart,
    Quit,
    None,
}

/// Map a key press to a meta action. Ctrl-C always quits.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') | KeyCode::Char('C') => Action::Quit,
            _ => Action::None,
        };
    }
    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') | KeyCode::Char('P') => Action::Pause,
        KeyCode::Char('r') | KeyCode::Char('R') => Action::Restart,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::ControlScheme;
    use crossterm::event::KeyEventState;

    fn event(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_release_clears_when_honored() {
        let mut input = InputState::new(true);
        let now = Instant::now();
        input.handle_key(event(KeyCode::Up, KeyEventKind::Press), now);
        assert!(input.is_held_at(KeyCode::Up, now + Duration::from_secs(5)));
        input.handle_key(event(KeyCode::Up, KeyEventKind::Release), now);
        assert!(!input.is_held_at(KeyCode::Up, now));
    }

    #[test]
    fn test_hold_times_out_without_release() {
        let mut input = InputState::new(false);
        let now = Instant::now();
        input.handle_key(event(KeyCode::Char('w'), KeyEventKind::Press), now);
        input.handle_key(event(KeyCode::Char('w'), KeyEventKind::Release), now);
        assert!(input.is_held_at(KeyCode::Char('w'), now + Duration::from_millis(100)));
        assert!(!input.is_held_at(KeyCode::Char('w'), now + HOLD_TIMEOUT));

        input.handle_key(
            event(KeyCode::Char('w'), KeyEventKind::Repeat),
            now + Duration::from_millis(200),
        );
        assert!(input.is_held_at(KeyCode::Char('w'), now + Duration::from_millis(300)));
        input.expire(now + Duration::from_secs(1));
        assert!(input.last_active.is_empty());
    }

    #[test]
    fn test_tap_counts_for_one_tick_without_release() {
        let mut input = InputState::new(false);
        let now = Instant::now();
        input.handle_key(event(KeyCode::Char('d'), KeyEventKind::Press), now);
        assert!(input.is_pressed_at(KeyCode::Char('d'), now + Duration::from_millis(5)));
        input.end_tick();
        // Still inside the hold window, but no new press or repeat arrived.
        assert!(input.is_held_at(KeyCode::Char('d'), now + Duration::from_millis(208)));
        assert!(!input.is_pressed_at(KeyCode::Char('d'), now + Duration::from_millis(208)));

        input.handle_key(
            event(KeyCode::Char('d'), KeyEventKind::Repeat),
            now + Duration::from_millis(210),
        );
        assert!(input.is_pressed_at(KeyCode::Char('d'), now + Duration::from_millis(215)));
        input.expire(now + Duration::from_secs(1));
        assert!(!input.is_pressed_at(KeyCode::Char('d'), now + Duration::from_secs(1)));
    }

    #[test]
    fn test_tap_between_ticks_seen_when_honored() {
        let mut input = InputState::new(true);
        let now = Instant::now();
        input.handle_key(event(KeyCode::Left, KeyEventKind::Press), now);
        input.handle_key(event(KeyCode::Left, KeyEventKind::Release), now);
        assert!(input.is_pressed_at(KeyCode::Left, now));
        input.end_tick();
        assert!(!input.is_pressed_at(KeyCode::Left, now));

        input.handle_key(event(KeyCode::Down, KeyEventKind::Press), now);
        input.end_tick();
        assert!(input.is_pressed_at(KeyCode::Down, now + Duration::from_secs(5)));
    }

    #[test]
    fn test_letters_ignore_case() {
        let mut input = InputState::new(true);
        let now = Instant::now();
        input.handle_key(event(KeyCode::Char('I'), KeyEventKind::Press), now);
        assert!(input.is_held_at(ControlScheme::IJKL.up, now));
        assert!(input.is_pressed_at(ControlScheme::IJKL.up, now));

        let keys: HashSet<KeyCode> = [KeyCode::Char('a')].into_iter().collect();
        assert!(keys.is_pressed(KeyCode::Char('A')));
    }

    #[test]
    fn test_meta_actions() {
        assert_eq!(key_to_action(event(KeyCode::Esc, KeyEventKind::Press)), Action::Quit);
        assert_eq!(key_to_action(event(KeyCode::Char('p'), KeyEventKind::Press)), Action::Pause);
        assert_eq!(key_to_action(event(KeyCode::Char('R'), KeyEventKind::Press)), Action::Restart);
        assert_eq!(key_to_action(event(KeyCode::Char('w'), KeyEventKind::Press)), Action::None);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl_c), Action::Quit);
    }
}
