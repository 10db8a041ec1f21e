use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::encode::sink::{FrameMeta, FrameSink, SinkConfig};
use crate::foundation::error::{PlaceError, PlaceResult};
use crate::replay::canvas::Frame;

/// Writes every frame as `frame_{index:06}.png`, magnified by the display scale.
#[derive(Debug)]
pub struct PngSequenceSink {
    out_dir: PathBuf,
    max_frames: Option<u64>,
    out_size: Option<(u32, u32)>,
    written: u64,
}

impl PngSequenceSink {
    /// Sink writing into `out_dir`, stopping after `max_frames` when set.
    pub fn new(out_dir: impl Into<PathBuf>, max_frames: Option<u64>) -> Self {
        Self {
            out_dir: out_dir.into(),
            max_frames,
            out_size: None,
            written: 0,
        }
    }

    /// Directory frames are written to.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Frames written since the last `begin`.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Path of frame `index`: `frame_NNNNNN.png`.
    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.out_dir.join(format!("frame_{index:06}.png"))
    }
}

fn scaled_size(cfg: &SinkConfig) -> PlaceResult<(u32, u32)> {
    let axis = |n: u32| (f64::from(n) * cfg.scale.get()).round().max(1.0);
    let (w, h) = (axis(cfg.width), axis(cfg.height));
    if w > f64::from(u32::MAX) || h > f64::from(u32::MAX) {
        return Err(PlaceError::validation("scaled frame size overflows u32"));
    }
    Ok((w as u32, h as u32))
}

impl FrameSink for PngSequenceSink {
    fn begin(&mut self, cfg: SinkConfig) -> PlaceResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(PlaceError::validation("png sink width/height must be non-zero"));
        }
        if self.max_frames == Some(0) {
            return Err(PlaceError::validation("png sink frame limit must be >= 1 when set"));
        }
        std::fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("create output dir '{}'", self.out_dir.display()))?;
        self.out_size = Some(scaled_size(&cfg)?);
        self.written = 0;
        Ok(())
    }

    fn push_frame(&mut self, meta: FrameMeta, frame: Frame) -> PlaceResult<()> {
        let Some((out_w, out_h)) = self.out_size else {
            return Err(PlaceError::validation("png sink used before begin"));
        };
        if !self.wants_more() {
            return Ok(());
        }
        let img = image::RgbImage::from_raw(frame.width, frame.height, frame.data)
            .ok_or_else(|| PlaceError::validation("frame buffer does not match its size"))?;
        let img = if (out_w, out_h) == img.dimensions() {
            img
        } else {
            image::imageops::resize(&img, out_w, out_h, image::imageops::FilterType::Nearest)
        };
        let path = self.frame_path(meta.index);
        img.save(&path)
            .with_context(|| format!("write png '{}'", path.display()))?;
        self.written += 1;
        Ok(())
    }

    fn end(&mut self) -> PlaceResult<()> {
        tracing::info!(
            out_dir = %self.out_dir.display(),
            frames = self.written,
            "png sequence written"
        );
        Ok(())
    }

    fn wants_more(&self) -> bool {
        self.max_frames.is_none_or(|max| self.written < max)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/png.rs"]
mod tests;
