use rand::Rng;

use crate::config::dataset::{EpochConfig, GrowthStage};
use crate::foundation::core::Position;
use crate::foundation::error::{PlaceError, PlaceResult};

/// Display magnification: one canvas pixel covers `scale` display pixels per axis.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct DisplayScale(f64);

impl DisplayScale {
    /// Scale used when the random draw lands on zero twice.
    pub const FALLBACK: Self = Self(0.5);

    /// Build a scale; must be finite and positive.
    pub fn new(value: f64) -> PlaceResult<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(PlaceError::validation(format!(
                "display scale must be finite and > 0, got {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Draw an integer scale in `[0, max_scale)`; a zero is redrawn once, then replaced by
    /// [`DisplayScale::FALLBACK`].
    pub fn pick<R: Rng + ?Sized>(rng: &mut R, max_scale: u32) -> Self {
        let mut draw = || {
            if max_scale == 0 {
                0
            } else {
                rng.gen_range(0..max_scale)
            }
        };
        let mut n = draw();
        if n == 0 {
            n = draw();
        }
        if n == 0 { Self::FALLBACK } else { Self(n as f64) }
    }

    /// Display pixels per canvas pixel.
    pub fn get(self) -> f64 {
        self.0
    }
}

/// Viewport dimensions in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewportSize {
    /// Columns.
    pub width: u32,
    /// Rows.
    pub height: u32,
}

impl ViewportSize {
    /// `round(display / scale)` per axis, at least one pixel.
    pub fn for_display(display_width: u32, display_height: u32, scale: DisplayScale) -> Self {
        let axis = |d: u32| ((d as f64 / scale.get()).round() as u32).max(1);
        Self {
            width: axis(display_width),
            height: axis(display_height),
        }
    }

    /// Shrink to fit the epoch canvas.
    pub fn clamp_to(self, epoch: &EpochConfig) -> Self {
        Self {
            width: self.width.min(epoch.canvas_width),
            height: self.height.min(epoch.canvas_height),
        }
    }
}

/// Bounded sub-rectangle of one epoch's canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Epoch id.
    pub epoch: String,
    /// Left edge in canonical coordinates.
    pub origin_x: u32,
    /// Top edge in canonical coordinates.
    pub origin_y: u32,
    /// Width in canvas pixels.
    pub width: u32,
    /// Height in canvas pixels.
    pub height: u32,
    /// Display scale the size was derived from.
    pub scale: DisplayScale,
}

impl Viewport {
    /// Build a viewport; it must be non-empty and lie inside the epoch canvas.
    pub fn new(
        epoch: &EpochConfig,
        origin_x: u32,
        origin_y: u32,
        size: ViewportSize,
        scale: DisplayScale,
    ) -> PlaceResult<Self> {
        if size.width == 0 || size.height == 0 {
            return Err(PlaceError::validation("viewport width/height must be non-zero"));
        }
        if !epoch
            .canvas_rect()
            .contains_block(origin_x, origin_y, size.width, size.height)
        {
            return Err(PlaceError::validation(format!(
                "viewport {}x{} at ({origin_x},{origin_y}) exceeds the {}x{} canvas of epoch '{}'",
                size.width, size.height, epoch.canvas_width, epoch.canvas_height, epoch.id
            )));
        }
        Ok(Self {
            epoch: epoch.id.clone(),
            origin_x,
            origin_y,
            width: size.width,
            height: size.height,
            scale,
        })
    }

    /// Width and height as a [`ViewportSize`].
    pub fn size(&self) -> ViewportSize {
        ViewportSize {
            width: self.width,
            height: self.height,
        }
    }

    /// Local coordinates of a canonical position, `None` when outside the viewport.
    pub fn local(&self, p: Position) -> Option<(u32, u32)> {
        let lx = i64::from(p.x) - i64::from(self.origin_x);
        let ly = i64::from(p.y) - i64::from(self.origin_y);
        if lx < 0 || ly < 0 || lx >= i64::from(self.width) || ly >= i64::from(self.height) {
            return None;
        }
        Some((lx as u32, ly as u32))
    }
}

/// How the replay canvas starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Seed {
    /// White canvas.
    Blank,
    /// Region of a base snapshot captured when `rank` begins.
    Snapshot {
        /// Snapshot file name inside the snapshot directory.
        file: String,
        /// Rank replay resumes from.
        rank: u32,
    },
}

/// A resolved viewport plus where replay should start.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewportPlan {
    /// Resolved viewport.
    pub viewport: Viewport,
    /// First rank to replay.
    pub start_rank: u32,
    /// Epoch's first rank, used when seeding falls back to a blank canvas.
    pub first_rank: u32,
    /// Initial canvas content.
    pub seed: Seed,
}

/// Snap an origin coordinate to the canvas edge when it lies within `tolerance` of it.
///
/// The result always satisfies `result + size <= extent` for `size <= extent`.
pub fn clamp_axis(raw: u32, size: u32, extent: u32, tolerance: u32) -> u32 {
    let far = i64::from(extent) - (i64::from(tolerance) + i64::from(size));
    if raw < tolerance {
        0
    } else if i64::from(raw) > far {
        extent.saturating_sub(size)
    } else {
        raw
    }
}

/// First growth stage whose region fully contains the viewport.
pub fn classify(
    epoch: &EpochConfig,
    origin_x: u32,
    origin_y: u32,
    size: ViewportSize,
) -> Option<&GrowthStage> {
    epoch
        .growth
        .iter()
        .find(|s| s.region.contains_block(origin_x, origin_y, size.width, size.height))
}

/// Resolve the start rank and seed for a viewport at a fixed origin.
///
/// An unclassifiable viewport falls back to a blank canvas from the first rank.
pub fn plan_viewport(
    epoch: &EpochConfig,
    origin_x: u32,
    origin_y: u32,
    size: ViewportSize,
    scale: DisplayScale,
) -> PlaceResult<ViewportPlan> {
    let viewport = Viewport::new(epoch, origin_x, origin_y, size, scale)?;
    let first_rank = epoch.first_rank();
    let (start_rank, seed) = match classify(epoch, origin_x, origin_y, size) {
        Some(GrowthStage {
            rank,
            snapshot: Some(file),
            ..
        }) => (
            *rank,
            Seed::Snapshot {
                file: file.clone(),
                rank: *rank,
            },
        ),
        Some(_) => (first_rank, Seed::Blank),
        None => {
            let err = PlaceError::viewport_unresolvable(format!(
                "{}x{} at ({origin_x},{origin_y}) in epoch '{}'",
                size.width, size.height, epoch.id
            ));
            tracing::warn!(%err, "replaying from the first rank on a blank canvas");
            (first_rank, Seed::Blank)
        }
    };
    tracing::debug!(
        epoch = %epoch.id,
        origin_x,
        origin_y,
        width = size.width,
        height = size.height,
        start_rank,
        ?seed,
        "viewport planned"
    );
    Ok(ViewportPlan {
        viewport,
        start_rank,
        first_rank,
        seed,
    })
}

/// Draw a uniformly random origin for `size`, clamp it to the canvas edges and plan it.
pub fn select_viewport<R: Rng + ?Sized>(
    epoch: &EpochConfig,
    size: ViewportSize,
    scale: DisplayScale,
    rng: &mut R,
) -> PlaceResult<ViewportPlan> {
    epoch.validate()?;
    let size = size.clamp_to(epoch);
    let raw_x = rng.gen_range(0..epoch.canvas_width);
    let raw_y = rng.gen_range(0..epoch.canvas_height);
    let x = clamp_axis(raw_x, size.width, epoch.canvas_width, epoch.tolerance);
    let y = clamp_axis(raw_y, size.height, epoch.canvas_height, epoch.tolerance);
    plan_viewport(epoch, x, y, size, scale)
}

#[cfg(test)]
#[path = "../../tests/unit/viewport/select.rs"]
mod tests;
