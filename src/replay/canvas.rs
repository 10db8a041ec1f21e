use crate::foundation::core::Rgb8;
use crate::foundation::error::{PlaceError, PlaceResult};

const CHANNELS: usize = 3;

/// Mutable RGB8 canvas buffer, row-major, tightly packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanvasBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl CanvasBuffer {
    /// Blank (white) canvas.
    pub fn new(width: u32, height: u32) -> PlaceResult<Self> {
        Self::filled(width, height, Rgb8::WHITE)
    }

    /// Canvas with every pixel set to `color`.
    pub fn filled(width: u32, height: u32, color: Rgb8) -> PlaceResult<Self> {
        let len = byte_len(width, height)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| {
            PlaceError::validation(format!("cannot allocate a {width}x{height} canvas"))
        })?;
        for _ in 0..(len / CHANNELS) {
            data.extend_from_slice(&[color.r, color.g, color.b]);
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Adopt packed RGB8 bytes, e.g. a cropped snapshot.
    pub fn from_rgb8(width: u32, height: u32, data: Vec<u8>) -> PlaceResult<Self> {
        let len = byte_len(width, height)?;
        if data.len() != len {
            return Err(PlaceError::validation(format!(
                "canvas data is {} bytes, expected {len} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel at local `(x, y)`, `None` outside the buffer.
    pub fn get(&self, x: u32, y: u32) -> Option<Rgb8> {
        let i = self.offset(x, y)?;
        Some(Rgb8::new(self.data[i], self.data[i + 1], self.data[i + 2]))
    }

    /// Overwrite local `(x, y)`. Returns `false` (and does nothing) outside the buffer.
    pub fn set(&mut self, x: u32, y: u32, color: Rgb8) -> bool {
        match self.offset(x, y) {
            Some(i) => {
                self.data[i..i + CHANNELS].copy_from_slice(&[color.r, color.g, color.b]);
                true
            }
            None => false,
        }
    }

    /// Row-major RGB8 bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Copy the current contents into an immutable frame.
    pub fn snapshot(&self) -> Frame {
        Frame {
            width: self.width,
            height: self.height,
            data: self.data.clone(),
        }
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * CHANNELS)
    }
}

fn byte_len(width: u32, height: u32) -> PlaceResult<usize> {
    if width == 0 || height == 0 {
        return Err(PlaceError::validation("canvas width/height must be non-zero"));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(CHANNELS))
        .ok_or_else(|| PlaceError::validation("canvas size overflows usize"))
}

/// Immutable RGB8 snapshot handed to sinks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGB8 bytes.
    pub data: Vec<u8>,
}

impl Frame {
    /// Pixel at `(x, y)`, `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some(Rgb8::new(self.data[i], self.data[i + 1], self.data[i + 2]))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/replay/canvas.rs"]
mod tests;
