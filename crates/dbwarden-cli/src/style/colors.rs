//! Terminal palette.
//!
//! Every helper falls back to plain text when colors are disabled.

use dbwarden::Effect;
use owo_colors::{OwoColorize, Style};

fn paint(value: &dyn std::fmt::Display, style: Style) -> String {
    if super::no_color() {
        value.to_string()
    } else {
        value.style(style).to_string()
    }
}

/// Extension trait applying the CLI's semantic styles.
pub trait SemanticStyle {
    /// Green bold.
    fn success(&self) -> String;
    /// Red bold.
    fn error(&self) -> String;
    fn warning(&self) -> String;
    fn muted(&self) -> String;
    fn header(&self) -> String;
    /// Paths, commands and identifiers.
    fn code(&self) -> String;
}

impl<T: std::fmt::Display> SemanticStyle for T {
    fn success(&self) -> String {
        paint(self, Style::new().green().bold())
    }

    fn error(&self) -> String {
        paint(self, Style::new().red().bold())
    }

    fn warning(&self) -> String {
        paint(self, Style::new().yellow())
    }

    fn muted(&self) -> String {
        paint(self, Style::new().dimmed())
    }

    fn header(&self) -> String {
        paint(self, Style::new().bold())
    }

    fn code(&self) -> String {
        paint(self, Style::new().blue())
    }
}

/// Renders an effect as `allow`/`deny`, green or red.
pub fn effect(effect: Effect) -> String {
    match effect {
        Effect::Allow => "allow".success(),
        Effect::Deny => "deny".error(),
    }
}
