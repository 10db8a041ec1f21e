use std::path::Path;

use anyhow::Context;

use crate::foundation::core::CanvasRect;
use crate::foundation::error::{PlaceError, PlaceResult};
use crate::replay::canvas::{CanvasBuffer, Frame};
use crate::viewport::select::{Seed, ViewportPlan};

/// Load `rect` (canonical canvas coordinates) out of a base-snapshot image.
pub fn load_region(path: &Path, rect: CanvasRect) -> PlaceResult<CanvasBuffer> {
    rect.validate()?;
    let img = image::open(path)
        .with_context(|| format!("open base snapshot '{}'", path.display()))?
        .to_rgb8();
    let (w, h) = img.dimensions();
    if !CanvasRect::sized(w, h).contains_rect(rect) {
        return Err(PlaceError::validation(format!(
            "base snapshot '{}' is {w}x{h}, too small for region {rect:?}",
            path.display()
        )));
    }
    let region = image::imageops::crop_imm(&img, rect.x0, rect.y0, rect.width(), rect.height())
        .to_image();
    CanvasBuffer::from_rgb8(rect.width(), rect.height(), region.into_raw())
}

/// Build the initial canvas for a plan and the rank replay must start from.
///
/// A snapshot that cannot be loaded degrades to a white canvas from the epoch's first rank, so the
/// viewport still shows the full history.
pub fn seed_canvas(plan: &ViewportPlan, snapshot_dir: &Path) -> PlaceResult<(CanvasBuffer, u32)> {
    let v = &plan.viewport;
    let Seed::Snapshot { file, rank } = &plan.seed else {
        return Ok((CanvasBuffer::new(v.width, v.height)?, plan.start_rank));
    };
    let path = snapshot_dir.join(file);
    let rect = CanvasRect {
        x0: v.origin_x,
        y0: v.origin_y,
        x1: v.origin_x + v.width,
        y1: v.origin_y + v.height,
    };
    match load_region(&path, rect) {
        Ok(canvas) => {
            tracing::info!(snapshot = %path.display(), rank, "canvas seeded from base snapshot");
            Ok((canvas, *rank))
        }
        Err(err) => {
            tracing::warn!(
                snapshot = %path.display(),
                %err,
                first_rank = plan.first_rank,
                "base snapshot unavailable; replaying from the first rank"
            );
            Ok((CanvasBuffer::new(v.width, v.height)?, plan.first_rank))
        }
    }
}

/// Write a frame as an RGB8 PNG, creating parent directories.
pub fn save_frame_png(frame: &Frame, path: &Path) -> PlaceResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        path,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgb8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/viewport/snapshot.rs"]
mod tests;
