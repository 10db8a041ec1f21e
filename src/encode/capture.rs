use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::encode::sink::{FrameMeta, FrameSink, SinkConfig};
use crate::foundation::error::PlaceResult;
use crate::replay::canvas::Frame;
use crate::viewport::snapshot::save_frame_png;

/// Saves the first frame emitted while each requested rank streams.
///
/// Driven by a full-canvas replay, this produces the base snapshots that later sessions seed from.
#[derive(Debug)]
pub struct SnapshotCaptureSink {
    out_dir: PathBuf,
    pending: BTreeMap<u32, String>,
    /// Snapshots written, ascending by rank.
    pub captured: Vec<(u32, PathBuf)>,
}

impl SnapshotCaptureSink {
    /// Capture each `(rank, file name)` target into `out_dir`.
    pub fn new(
        out_dir: impl Into<PathBuf>,
        targets: impl IntoIterator<Item = (u32, String)>,
    ) -> Self {
        Self {
            out_dir: out_dir.into(),
            pending: targets.into_iter().collect(),
            captured: Vec::new(),
        }
    }

    /// Capture `ranks` as `<prefix><rank>.png`.
    pub fn with_prefix(
        out_dir: impl Into<PathBuf>,
        prefix: &str,
        ranks: impl IntoIterator<Item = u32>,
    ) -> Self {
        Self::new(
            out_dir,
            ranks.into_iter().map(|r| (r, format!("{prefix}{r}.png"))),
        )
    }

    /// Ranks not yet captured.
    pub fn pending(&self) -> impl Iterator<Item = u32> + '_ {
        self.pending.keys().copied()
    }
}

impl FrameSink for SnapshotCaptureSink {
    fn begin(&mut self, _cfg: SinkConfig) -> PlaceResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, meta: FrameMeta, frame: Frame) -> PlaceResult<()> {
        let Some(rank) = meta.rank else {
            return Ok(());
        };
        let Some(file) = self.pending.remove(&rank) else {
            return Ok(());
        };
        let path = self.out_dir.join(file);
        save_frame_png(&frame, &path)?;
        tracing::info!(rank, path = %path.display(), "base snapshot captured");
        self.captured.push((rank, path));
        Ok(())
    }

    fn end(&mut self) -> PlaceResult<()> {
        if !self.pending.is_empty() {
            tracing::warn!(missing = ?self.pending.keys().collect::<Vec<_>>(), "some ranks produced no frame to capture");
        }
        Ok(())
    }

    fn wants_more(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/capture.rs"]
mod tests;
