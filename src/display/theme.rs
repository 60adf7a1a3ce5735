//! Terminal display styles.
//!
//! All styles use only named ANSI colors (Black, Red, Green, Yellow, Blue,
//! Magenta, Cyan, White) so that colors adapt to the user's terminal theme.
//! Avoid `Color::Rgb`, `Color::AnsiValue`, and bright variants.

use crossterm::style::{Attribute, Attributes, Color, ContentStyle};

pub fn dim() -> ContentStyle {
    ContentStyle {
        attributes: Attribute::Dim.into(),
        ..Default::default()
    }
}

pub fn dim_italic() -> ContentStyle {
    ContentStyle {
        attributes: Attributes::from(Attribute::Dim) | Attribute::Italic,
        ..Default::default()
    }
}

pub fn iteration_header() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Magenta),
        attributes: Attribute::Bold.into(),
        ..Default::default()
    }
}

pub fn stage() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Yellow),
        ..Default::default()
    }
}

pub fn idea_title() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Cyan),
        attributes: Attribute::Bold.into(),
        ..Default::default()
    }
}

pub fn error() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Red),
        ..Default::default()
    }
}

pub fn result_line() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Green),
        attributes: Attribute::Bold.into(),
        ..Default::default()
    }
}

/// Colour for a critique score: green from 8, yellow from 5, red below.
pub fn score(score: u32) -> ContentStyle {
    let color = match score {
        8.. => Color::Green,
        5..=7 => Color::Yellow,
        _ => Color::Red,
    };
    ContentStyle {
        foreground_color: Some(color),
        attributes: Attribute::Bold.into(),
        ..Default::default()
    }
}
