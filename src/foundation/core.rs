use crate::foundation::error::{PlaceError, PlaceResult};

/// Rank assigned to the chronologically first shard of every epoch.
///
/// Ranks start at 100 so ranked names never collide with raw source numbering.
pub const FIRST_RANK: u32 = 100;

/// Straight (non-premultiplied) RGB8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgb8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb8 {
    /// Default canvas color.
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
    };

    /// Build a color from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Decode `#RRGGBB` (case-insensitive). Any other shape is a malformed record.
    pub fn from_hex(s: &str) -> PlaceResult<Self> {
        let digits = s
            .strip_prefix('#')
            .ok_or_else(|| PlaceError::malformed(format!("color \"{s}\" must start with '#'")))?;
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(PlaceError::malformed(format!(
                "color \"{s}\" must be #RRGGBB"
            )));
        }

        fn hex_byte(pair: &str) -> PlaceResult<u8> {
            u8::from_str_radix(pair, 16)
                .map_err(|_| PlaceError::malformed(format!("invalid hex byte \"{pair}\"")))
        }

        Ok(Self {
            r: hex_byte(&digits[0..2])?,
            g: hex_byte(&digits[2..4])?,
            b: hex_byte(&digits[4..6])?,
        })
    }

    /// Encode as uppercase `#RRGGBB`.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Pixel position in canonical canvas coordinates.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Position {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Position {
    /// Build a position.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned canvas rectangle, `x0..x1` by `y0..y1` (end-exclusive).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CanvasRect {
    /// Left edge (inclusive).
    pub x0: u32,
    /// Top edge (inclusive).
    pub y0: u32,
    /// Right edge (exclusive).
    pub x1: u32,
    /// Bottom edge (exclusive).
    pub y1: u32,
}

impl CanvasRect {
    /// Build a rectangle; edges must be ordered.
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> PlaceResult<Self> {
        let r = Self { x0, y0, x1, y1 };
        r.validate()?;
        Ok(r)
    }

    /// Rectangle starting at the origin.
    pub const fn sized(width: u32, height: u32) -> Self {
        Self {
            x0: 0,
            y0: 0,
            x1: width,
            y1: height,
        }
    }

    pub(crate) fn validate(self) -> PlaceResult<()> {
        if self.x0 >= self.x1 || self.y0 >= self.y1 {
            return Err(PlaceError::validation(format!(
                "canvas rect {self:?} must have x0 < x1 and y0 < y1"
            )));
        }
        Ok(())
    }

    /// Width in pixels.
    pub fn width(self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    /// Height in pixels.
    pub fn height(self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    /// Whether the `width`×`height` block at (`x`, `y`) lies entirely inside this rectangle.
    pub fn contains_block(self, x: u32, y: u32, width: u32, height: u32) -> bool {
        let (Some(x_end), Some(y_end)) = (x.checked_add(width), y.checked_add(height)) else {
            return false;
        };
        x >= self.x0 && y >= self.y0 && x_end <= self.x1 && y_end <= self.y1
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn contains_rect(self, other: CanvasRect) -> bool {
        self.contains_block(other.x0, other.y0, other.width(), other.height())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
