//! Layout and drawing: board, tick progress bar, player sidebar, pause and game over.

use crate::app::Screen;
use crate::game::{GameState, StepOutcome};
use crate::grid::{Grid, MAP_EDGE};
use crate::player::Liveness;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

const SIDEBAR_WIDTH: u16 = 26;

/// Opacity of empty cells; occupied cells are opaque.
const EMPTY_OPACITY: f32 = 0.9;

/// Duration of the game over fade in ms.
const GAME_OVER_FADE_MS: u32 = 900;

/// One "fill this cell with colour at opacity" command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillRect {
    pub row: usize,
    pub col: usize,
    pub color: Color,
    pub opacity: f32,
}

/// Tick progress indicator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    /// A tick just ran.
    Full,
    /// Fraction of the tick period elapsed.
    Partial(f64),
}

impl From<&StepOutcome> for Progress {
    fn from(outcome: &StepOutcome) -> Self {
        match outcome {
            StepOutcome::Ticked(_) => Self::Full,
            StepOutcome::Waiting(f) => Self::Partial(*f),
        }
    }
}

impl Progress {
    /// Filled width of a bar `width` cells wide.
    pub fn filled(self, width: u16) -> u16 {
        match self {
            Self::Full => width,
            Self::Partial(f) => ((f.clamp(0.0, 1.0) * f64::from(width)).round() as u16).min(width),
        }
    }
}

/// Paint commands for every visible cell, row-major.
pub fn paint_commands<'a>(grid: &'a Grid, theme: &'a Theme) -> impl Iterator<Item = FillRect> + 'a {
    grid.iter().map(|(row, col, cell)| FillRect {
        row,
        col,
        color: theme.cell_color(cell),
        opacity: if cell.is_empty() { EMPTY_OPACITY } else { 1.0 },
    })
}

/// Composite `fg` over `bg` at `alpha`. Non-RGB colours are returned as-is.
pub fn blend(fg: Color, bg: Color, alpha: f32) -> Color {
    match (fg, bg) {
        (Color::Rgb(fr, fg_, fb), Color::Rgb(br, bg_, bb)) => {
            let mix = |f: u8, b: u8| (f32::from(f) * alpha + f32::from(b) * (1.0 - alpha)).round() as u8;
            Color::Rgb(mix(fr, br), mix(fg_, bg_), mix(fb, bb))
        }
        _ => fg,
    }
}

/// Cell edge in terminal rows that fits `area` (board + border + progress row + sidebar).
/// A cell is `2 * edge` columns wide so it looks square.
pub fn cell_edge_for_area(area: Rect) -> u16 {
    let n = MAP_EDGE as u16;
    let by_width = area.width.saturating_sub(2 + SIDEBAR_WIDTH) / (2 * n);
    let by_height = area.height.saturating_sub(3) / n;
    by_width.min(by_height).max(1)
}

/// Outer board rect (with border) centred in `area` next to the sidebar.
fn board_outer_rect(area: Rect, edge: u16) -> Rect {
    let n = MAP_EDGE as u16;
    let w = 2 * edge * n + 2;
    let h = edge * n + 3;
    let total_w = w + SIDEBAR_WIDTH;
    Rect {
        x: area.x + area.width.saturating_sub(total_w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

/// Grid plus the progress bar above it.
pub struct BoardWidget<'a> {
    pub grid: &'a Grid,
    pub theme: &'a Theme,
    pub progress: Progress,
    pub edge: u16,
}

impl Widget for BoardWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bar_color = match self.progress {
            Progress::Full => self.theme.tick_flash,
            Progress::Partial(_) => self.theme.tick_progress,
        };
        let filled = self.progress.filled(area.width);
        for x in area.x..area.x + area.width {
            if let Some(c) = buf.cell_mut((x, area.y)) {
                c.set_symbol(" ");
                c.set_bg(if x - area.x < filled { bar_color } else { self.theme.bg });
            }
        }

        let cell_w = 2 * self.edge;
        let top = area.y + 1;
        for cmd in paint_commands(self.grid, self.theme) {
            let color = blend(cmd.color, self.theme.bg, cmd.opacity);
            let x0 = area.x + cmd.col as u16 * cell_w;
            let y0 = top + cmd.row as u16 * self.edge;
            for y in y0..(y0 + self.edge).min(area.y + area.height) {
                for x in x0..(x0 + cell_w).min(area.x + area.width) {
                    if let Some(c) = buf.cell_mut((x, y)) {
                        c.set_symbol(" ");
                        c.set_bg(color);
                    }
                }
            }
        }
    }
}

/// Game over fade effect and the instant it was last advanced.
#[derive(Default)]
pub struct FadeState {
    effect: Option<Effect>,
    last_processed: Option<Instant>,
}

impl FadeState {
    pub fn reset(&mut self) {
        self.effect = None;
        self.last_processed = None;
    }
}

/// Draw the current screen.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    state: &GameState,
    theme: &Theme,
    progress: Progress,
    paused: bool,
    fade: &mut FadeState,
    now: Instant,
    no_animation: bool,
) {
    let area = frame.area();
    let edge = cell_edge_for_area(area);
    let outer = board_outer_rect(area, edge);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line))
        .title(Span::styled(" Rockfall ", Style::default().fg(theme.title).bold()));
    let inner = block.inner(outer);
    frame.render_widget(block, outer);
    frame.render_widget(
        BoardWidget {
            grid: &state.grid,
            theme,
            progress,
            edge,
        },
        inner,
    );
    draw_sidebar(frame, state, theme, area, outer);

    match screen {
        Screen::Playing => {
            if paused {
                draw_overlay(frame, theme, outer, " Paused ", &["p  resume", "q  quit"]);
            }
        }
        Screen::GameOver => {
            if !no_animation {
                apply_game_over_fade(frame, theme, inner, fade, now);
            }
            let survived = format!("survived {} ticks", state.ticks);
            draw_overlay(
                frame,
                theme,
                outer,
                " All players eliminated ",
                &[survived.as_str(), "", "r  restart", "q  quit"],
            );
        }
    }
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect, board: Rect) {
    let x = board.x + board.width + 1;
    let rect = Rect {
        x,
        y: board.y,
        width: SIDEBAR_WIDTH.saturating_sub(1).min((area.x + area.width).saturating_sub(x)),
        height: board.height,
    };
    if rect.width == 0 {
        return;
    }

    let label = Style::default().fg(theme.main_fg);
    let dim = Style::default().fg(theme.inactive_fg);
    let mut lines = vec![
        Line::from(Span::styled("Players", Style::default().fg(theme.title).bold())),
        Line::from(""),
    ];
    for (player, live) in state.players.iter().zip(state.liveness()) {
        let (status, style) = match live {
            Liveness::Alive { .. } => ("alive", label),
            Liveness::Eliminated => ("out", dim),
        };
        lines.push(Line::from(vec![
            Span::styled("██ ", Style::default().fg(theme.player_color(player.id.index()))),
            Span::styled(format!("P{} {:<7}", player.id.0, player.controls.name), label),
            Span::styled(status, style),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(format!("Tick {}", state.ticks), label)));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("p pause  r restart", dim)));
    lines.push(Line::from(Span::styled("q quit", dim)));
    frame.render_widget(Paragraph::new(lines), rect);
}

fn draw_overlay(frame: &mut Frame, theme: &Theme, board: Rect, title: &str, body: &[&str]) {
    let w = (title.chars().count() as u16 + 4)
        .max(body.iter().map(|l| l.chars().count() as u16 + 4).max().unwrap_or(0))
        .min(board.width);
    let h = (body.len() as u16 + 2).min(board.height);
    let rect = Rect {
        x: board.x + board.width.saturating_sub(w) / 2,
        y: board.y + board.height.saturating_sub(h) / 2,
        width: w,
        height: h,
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(Span::styled(title.to_string(), Style::default().fg(theme.title).bold()))
        .style(Style::default().bg(theme.bg));
    let lines: Vec<Line> = body
        .iter()
        .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(theme.main_fg))))
        .collect();
    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(lines).block(block).alignment(Alignment::Center),
        rect,
    );
}

/// Fade the grid (not the progress row) to the background once the round is over.
fn apply_game_over_fade(
    frame: &mut Frame,
    theme: &Theme,
    board: Rect,
    fade: &mut FadeState,
    now: Instant,
) {
    let delta = fade
        .last_processed
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    fade.last_processed = Some(now);

    if fade.effect.is_none() {
        let bar_y = board.y;
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| pos.y != bar_y));
        let bg = theme.bg;
        let effect = fx::fade_to(bg, bg, (GAME_OVER_FADE_MS, Interpolation::QuadOut))
            .with_filter(filter)
            .with_area(board);
        fade.effect = Some(effect);
    }

    if let Some(effect) = fade.effect.as_mut() {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, PlayerId, RockDir};

    #[test]
    fn test_paint_commands_cover_grid_with_opacity() {
        let mut grid = Grid::new();
        grid.set(2, 3, Cell::Rock(RockDir::Down));
        grid.set(4, 4, Cell::Player(PlayerId(2)));
        let theme = Theme::classic();
        let cmds: Vec<FillRect> = paint_commands(&grid, &theme).collect();
        assert_eq!(cmds.len(), MAP_EDGE * MAP_EDGE);
        let rock = cmds[2 * MAP_EDGE + 3];
        assert_eq!((rock.row, rock.col), (2, 3));
        assert_eq!(rock.color, theme.rock_down);
        assert_eq!(rock.opacity, 1.0);
        assert_eq!(cmds[4 * MAP_EDGE + 4].color, theme.players[1]);
        assert_eq!(cmds[0].color, theme.empty);
        assert_eq!(cmds[0].opacity, EMPTY_OPACITY);
    }

    #[test]
    fn test_blend() {
        let white = Color::Rgb(255, 255, 255);
        let black = Color::Rgb(0, 0, 0);
        assert_eq!(blend(white, black, 1.0), white);
        assert_eq!(blend(white, black, 0.0), black);
        assert_eq!(blend(Color::Rgb(200, 100, 0), black, 0.5), Color::Rgb(100, 50, 0));
        assert_eq!(blend(Color::Red, black, 0.5), Color::Red);
    }

    #[test]
    fn test_progress_width() {
        assert_eq!(Progress::Full.filled(40), 40);
        assert_eq!(Progress::Partial(0.0).filled(40), 0);
        assert_eq!(Progress::Partial(0.25).filled(40), 10);
        assert_eq!(Progress::Partial(3.0).filled(40), 40);
    }

    #[test]
    fn test_cell_edge_fits_area() {
        assert_eq!(cell_edge_for_area(Rect::new(0, 0, 80, 24)), 2);
        assert_eq!(cell_edge_for_area(Rect::new(0, 0, 200, 60)), 5);
        assert_eq!(cell_edge_for_area(Rect::new(0, 0, 10, 5)), 1);
    }

    #[test]
    fn test_board_widget_paints_cells_and_bar() {
        let mut grid = Grid::new();
        grid.set(0, 1, Cell::Player(PlayerId(1)));
        let theme = Theme::classic();
        let area = Rect::new(0, 0, 2 * MAP_EDGE as u16, MAP_EDGE as u16 + 1);
        let mut buf = Buffer::empty(area);
        BoardWidget {
            grid: &grid,
            theme: &theme,
            progress: Progress::Partial(0.5),
            edge: 1,
        }
        .render(area, &mut buf);

        let bg_at = |x: u16, y: u16| buf.cell((x, y)).map(|c| c.bg);
        assert_eq!(bg_at(0, 0), Some(theme.tick_progress));
        assert_eq!(bg_at(9, 0), Some(theme.tick_progress));
        assert_eq!(bg_at(10, 0), Some(theme.bg));
        assert_eq!(bg_at(2, 1), Some(theme.players[0]));
        assert_eq!(bg_at(3, 1), Some(theme.players[0]));
        assert_eq!(bg_at(0, 1), Some(blend(theme.empty, theme.bg, EMPTY_OPACITY)));
    }
}
