//! Color values and the CSS-style color string parser.
//!
//! Element fills keep their color as the original string so documents
//! round-trip byte-for-byte; renderers call [`parse_color`] to get RGBA.
//! Supported forms: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`,
//! `rgb(r, g, b)`, `rgba(r, g, b, a)`, and a handful of named colors.

use serde::{Deserialize, Serialize};
use winnow::ascii::{float, space0};
use winnow::combinator::{alt, delimited, opt, preceded, separated};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::take_while;

/// RGBA color. Stored as 4 × f32 in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Parse a single hex digit.
pub fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Parse `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`. The `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();

        match bytes.len() {
            3 | 4 => {
                let mut channels = [15u8; 4];
                for (slot, &b) in channels.iter_mut().zip(bytes) {
                    *slot = hex_val(b)?;
                }
                Some(Self::rgba8(
                    channels[0] * 17,
                    channels[1] * 17,
                    channels[2] * 17,
                    channels[3] * 17,
                ))
            }
            6 | 8 => {
                let mut channels = [255u8; 4];
                for (slot, pair) in channels.iter_mut().zip(bytes.chunks(2)) {
                    *slot = hex_val(pair[0])? << 4 | hex_val(pair[1])?;
                }
                Some(Self::rgba8(channels[0], channels[1], channels[2], channels[3]))
            }
            _ => None,
        }
    }

    /// Emit as the shortest valid hex string (`#RRGGBB` or `#RRGGBBAA`).
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Multiply alpha by `factor` (clamped to `[0, 1]`).
    pub fn with_alpha_factor(self, factor: f32) -> Self {
        Self {
            a: (self.a * factor.clamp(0.0, 1.0)).clamp(0.0, 1.0),
            ..self
        }
    }

    /// CSS `rgba(...)` form, used by the Canvas2D backend.
    pub fn to_css(&self) -> String {
        let [r, g, b, _] = self.to_rgba8();
        format!("rgba({r}, {g}, {b}, {:.3})", self.a.clamp(0.0, 1.0))
    }
}

/// Parse a color string in any supported form. Returns `None` for
/// unrecognized input so callers can fall back to a default.
pub fn parse_color(input: &str) -> Option<Color> {
    let mut rest = input.trim();
    let color = color_value.parse_next(&mut rest).ok()?;
    rest.trim().is_empty().then_some(color)
}

fn color_value(input: &mut &str) -> ModalResult<Color> {
    alt((hex_color, functional_color, named_color)).parse_next(input)
}

fn hex_color(input: &mut &str) -> ModalResult<Color> {
    let digits: &str =
        preceded('#', take_while(3..=8, |c: char| c.is_ascii_hexdigit())).parse_next(input)?;
    Color::from_hex(digits).ok_or_else(|| winnow::error::ErrMode::Backtrack(ContextError::new()))
}

/// `rgb(255, 0, 0)` / `rgba(255, 0, 0, 0.5)`; channels may be percentages.
fn functional_color(input: &mut &str) -> ModalResult<Color> {
    let _ = alt(("rgba", "rgb")).parse_next(input)?;
    let channels: Vec<f64> = delimited(
        ('(', space0),
        separated(3..=4, channel, (space0, alt((',', ' ')), space0)),
        (space0, ')'),
    )
    .parse_next(input)?;

    let byte = |v: f64| (v.clamp(0.0, 255.0) / 255.0) as f32;
    let alpha = channels.get(3).copied().unwrap_or(1.0).clamp(0.0, 1.0) as f32;
    Ok(Color::rgba(
        byte(channels[0]),
        byte(channels[1]),
        byte(channels[2]),
        alpha,
    ))
}

fn channel(input: &mut &str) -> ModalResult<f64> {
    let value: f64 = float.parse_next(input)?;
    let percent = opt('%').parse_next(input)?;
    Ok(match percent {
        Some(_) => value * 2.55,
        None => value,
    })
}

fn named_color(input: &mut &str) -> ModalResult<Color> {
    let name: &str = take_while(1.., |c: char| c.is_ascii_alphabetic()).parse_next(input)?;
    let color = match name.to_ascii_lowercase().as_str() {
        "transparent" => Color::TRANSPARENT,
        "black" => Color::BLACK,
        "white" => Color::WHITE,
        "red" => Color::rgba8(255, 0, 0, 255),
        "green" => Color::rgba8(0, 128, 0, 255),
        "blue" => Color::rgba8(0, 0, 255, 255),
        "gray" | "grey" => Color::rgba8(128, 128, 128, 255),
        "orange" => Color::rgba8(255, 165, 0, 255),
        "yellow" => Color::rgba8(255, 255, 0, 255),
        "purple" => Color::rgba8(128, 0, 128, 255),
        _ => return Err(winnow::error::ErrMode::Backtrack(ContextError::new())),
    };
    Ok(color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let c = Color::from_hex("#6C5CE7").unwrap();
        assert_eq!(c.to_hex(), "#6C5CE7");

        let c2 = Color::from_hex("#FF000080").unwrap();
        assert!((c2.a - 128.0 / 255.0).abs() < 0.01);
        assert_eq!(c2.to_hex().len(), 9);
    }

    #[test]
    fn short_hex_expands() {
        let c = parse_color("#f00").unwrap();
        assert_eq!(c.to_hex(), "#FF0000");
    }

    #[test]
    fn functional_forms() {
        let c = parse_color("rgba(255, 128, 0, 0.5)").unwrap();
        assert_eq!(c.to_rgba8()[0], 255);
        assert!((c.a - 0.5).abs() < 1e-6);

        let c = parse_color("rgb(0,0,255)").unwrap();
        assert_eq!(c.to_hex(), "#0000FF");
    }

    #[test]
    fn named_and_invalid() {
        assert_eq!(parse_color("transparent"), Some(Color::TRANSPARENT));
        assert_eq!(parse_color("White"), Some(Color::WHITE));
        assert_eq!(parse_color("not-a-color"), None);
        assert_eq!(parse_color("#12"), None);
        assert_eq!(parse_color("rgb(1, 2)"), None);
    }
}
