use std::fmt::Display;

use crossterm::style::{Color, Stylize};

// Catppuccin Mocha palette
pub const RED: Color = Color::Rgb { r: 243, g: 139, b: 168 };
pub const GREEN: Color = Color::Rgb { r: 166, g: 227, b: 161 };
pub const YELLOW: Color = Color::Rgb { r: 249, g: 226, b: 175 };
pub const BLUE: Color = Color::Rgb { r: 137, g: 180, b: 250 };
pub const TEAL: Color = Color::Rgb { r: 148, g: 226, b: 213 };
pub const OVERLAY0: Color = Color::Rgb { r: 108, g: 112, b: 134 };

/// Styling switch threaded through rendering. With colour off every method
/// returns the text unchanged, so structure never depends on the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    color: bool,
}

impl Theme {
    pub const fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn paint(&self, text: impl Display, color: Color) -> String {
        if self.color {
            text.to_string().with(color).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn bold(&self, text: impl Display) -> String {
        if self.color {
            text.to_string().bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn paint_bold(&self, text: impl Display, color: Color) -> String {
        if self.color {
            text.to_string().with(color).bold().to_string()
        } else {
            text.to_string()
        }
    }
}
