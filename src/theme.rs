//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::grid::{Cell, RockDir};
use crate::player::PLAYER_COUNT;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Cell and UI colours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub empty: Color,
    pub rock_down: Color,
    pub rock_right: Color,
    /// Player colours, indexed by player id - 1.
    pub players: [Color; PLAYER_COUNT],
    /// Background behind the board; translucent cells blend towards it.
    pub bg: Color,
    pub div_line: Color,
    pub main_fg: Color,
    pub title: Color,
    pub inactive_fg: Color,
    /// Progress bar right after a tick.
    pub tick_flash: Color,
    /// Progress bar while waiting for the next tick.
    pub tick_progress: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}

impl Theme {
    /// Light gray board, brown and gray rocks, red / green / blue players.
    pub const fn classic() -> Self {
        Self {
            empty: rgb(0xCCCCCC),
            rock_down: rgb(0x805B32),
            rock_right: rgb(0x555555),
            players: [rgb(0xFF0000), rgb(0x00FF00), rgb(0x0000FF)],
            bg: rgb(0x000000),
            div_line: rgb(0x3F444F),
            main_fg: rgb(0xABB2BF),
            title: rgb(0xE5C07B),
            inactive_fg: rgb(0x5C6370),
            tick_flash: rgb(0xFFFFFF),
            tick_progress: rgb(0x0000FF),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to the classic colours if path is None or the file is missing.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map)?;
        theme.apply_palette(palette);
        Ok(theme)
    }

    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::classic();
        t.apply_palette(palette);
        t
    }

    /// Override player colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.players = [rgb(0xFF2020), rgb(0x20FF20), rgb(0x20C0FF)];
                self.rock_down = rgb(0xFFAA00);
                self.rock_right = rgb(0x202020);
            }
            crate::Palette::Colorblind => {
                // Okabe-Ito: vermillion, bluish green, blue
                self.players = [rgb(0xD55E00), rgb(0x009E73), rgb(0x0072B2)];
            }
        }
    }

    /// Unknown keys are ignored; a present but malformed colour is an error.
    fn from_map(map: &HashMap<String, String>) -> Result<Self, ThemeError> {
        let mut t = Self::classic();
        let [p1, p2, p3] = &mut t.players;
        let slots: [(&str, &mut Color); 13] = [
            ("empty", &mut t.empty),
            ("rock_down", &mut t.rock_down),
            ("rock_right", &mut t.rock_right),
            ("player1", p1),
            ("player2", p2),
            ("player3", p3),
            ("main_bg", &mut t.bg),
            ("div_line", &mut t.div_line),
            ("main_fg", &mut t.main_fg),
            ("title", &mut t.title),
            ("inactive_fg", &mut t.inactive_fg),
            ("tick_flash", &mut t.tick_flash),
            ("tick_progress", &mut t.tick_progress),
        ];
        for (key, slot) in slots {
            if let Some(v) = map.get(key) {
                *slot = parse_hex(v)?;
            }
        }
        Ok(t)
    }

    /// Display colour for a grid cell.
    pub fn cell_color(&self, cell: Cell) -> Color {
        match cell {
            Cell::Empty => self.empty,
            Cell::Rock(RockDir::Down) => self.rock_down,
            Cell::Rock(RockDir::Right) => self.rock_right,
            Cell::Player(id) => self.player_color(id.index()),
        }
    }

    #[inline]
    pub fn player_color(&self, index: usize) -> Color {
        self.players[index % PLAYER_COUNT]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let digits = s.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ThemeError::InvalidHex(digits.to_string()));
    }
    let v = u32::from_str_radix(digits, 16).map_err(|_| ThemeError::InvalidHex(digits.to_string()))?;
    let [_, r, g, b] = v.to_be_bytes();
    Ok(Color::Rgb(r, g, b))
}
