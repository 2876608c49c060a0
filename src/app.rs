//! App: terminal init, frame loop, input and round lifecycle.

use crate::Args;
use crate::game::{GameState, StepOutcome};
use crate::input::{Action, InputState, key_to_action};
use crate::theme::Theme;
use crate::ui::{FadeState, Progress};
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use log::{debug, info};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
}

pub struct App {
    args: Args,
    theme: Theme,
    state: GameState,
    screen: Screen,
    paused: bool,
    input: InputState,
    /// Start of the app; step times are measured from here.
    start: Instant,
    progress: Progress,
    fade: FadeState,
    /// Rounds played so far, mixed into `--seed` so restarts differ but replay.
    round: u64,
}

impl App {
    pub fn new(args: Args, theme: Theme) -> Result<Self> {
        let state = GameState::new(usize::from(args.players), args.seed).context("failed to place players")?;
        Ok(Self {
            args,
            theme,
            state,
            screen: Screen::Playing,
            paused: false,
            input: InputState::new(false),
            start: Instant::now(),
            progress: Progress::Partial(0.0),
            fade: FadeState::default(),
            round: 0,
        })
    }

    fn reset_game(&mut self) -> Result<()> {
        self.round += 1;
        let seed = self.args.seed.map(|s| s.wrapping_add(self.round));
        self.state = GameState::new(usize::from(self.args.players), seed).context("failed to place players")?;
        self.screen = Screen::Playing;
        self.paused = false;
        self.progress = Progress::Partial(0.0);
        self.fade.reset();
        self.input.clear();
        Ok(())
    }

    /// Pause or resume a running round. Resuming restarts the tick period at
    /// `now`, so time spent paused never produces a catch-up tick.
    fn toggle_pause(&mut self, now: Duration) {
        if self.screen != Screen::Playing {
            return;
        }
        self.paused = !self.paused;
        self.input.clear();
        if !self.paused {
            self.state.clock.reset(now);
        }
        debug!("paused: {}", self.paused);
    }

    /// Time since app start, the clock the simulation runs on.
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
                supports_keyboard_enhancement,
            },
        };

        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;

        // Release events are what make "is this key held" exact.
        let enhanced = supports_keyboard_enhancement().unwrap_or(false)
            && execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )
            .is_ok();
        self.input.honor_release = enhanced;
        info!("keyboard enhancement: {}", if enhanced { "on" } else { "off, using hold timeout" });

        let result = ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))
            .context("failed to create terminal")
            .and_then(|mut terminal| {
                terminal.clear()?;
                self.run_loop(&mut terminal)
            });

        // Restore
        if enhanced {
            let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        }
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.args.frame_rate.max(1.0));
        loop {
            let frame_start = Instant::now();

            if self.screen == Screen::Playing && !self.paused {
                let now = self.now();
                let outcome = self.state.step(&mut self.input, now);
                self.progress = Progress::from(&outcome);
                if let StepOutcome::Ticked(report) = &outcome {
                    debug!(
                        "tick {}: {} moved, {} eliminated, {} rocks spawned",
                        self.state.ticks,
                        report.moved.len(),
                        report.eliminated.len(),
                        report.rocks_spawned
                    );
                    if self.state.all_eliminated() {
                        info!("round over after {} ticks", self.state.ticks);
                        self.screen = Screen::GameOver;
                    }
                }
            }

            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.state,
                    &self.theme,
                    self.progress,
                    self.paused,
                    &mut self.fade,
                    Instant::now(),
                    self.args.no_animation,
                )
            })?;

            let timeout = frame_duration.saturating_sub(frame_start.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let Event::Key(key) = event::read()? else {
                        continue;
                    };
                    self.input.handle_key(key, Instant::now());
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match key_to_action(key) {
                        Action::Quit => return Ok(()),
                        Action::Pause => {
                            let now = self.now();
                            self.toggle_pause(now);
                        }
                        Action::Restart => {
                            info!("round restarted");
                            self.reset_game()?;
                        }
                        Action::None => {}
                    }
                }
            }
            self.input.expire(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::TICK_PERIOD;
    use clap::Parser;

    fn app() -> App {
        let args = Args::parse_from(["rockfall", "--players", "1", "--seed", "7"]);
        App::new(args, Theme::classic()).unwrap()
    }

    #[test]
    fn test_resume_does_not_tick_immediately() {
        let mut app = app();
        let t0 = Duration::from_secs(1);
        assert!(matches!(app.state.step(&mut app.input, t0), StepOutcome::Ticked(_)));

        app.toggle_pause(t0 + Duration::from_millis(50));
        assert!(app.paused);
        let resumed = t0 + Duration::from_secs(30);
        app.toggle_pause(resumed);
        assert!(!app.paused);

        assert!(matches!(
            app.state.step(&mut app.input, resumed + Duration::from_millis(1)),
            StepOutcome::Waiting(_)
        ));
        assert_eq!(app.state.ticks, 1);
        assert!(matches!(
            app.state.step(&mut app.input, resumed + TICK_PERIOD + Duration::from_millis(1)),
            StepOutcome::Ticked(_)
        ));
    }

    #[test]
    fn test_pause_ignored_after_game_over() {
        let mut app = app();
        app.screen = Screen::GameOver;
        app.toggle_pause(Duration::from_secs(1));
        assert!(!app.paused);
    }
}
