use std::path::{Path, PathBuf};

use rand::Rng;

use crate::config::dataset::{DatasetConfig, DisplayConfig, EpochConfig};
use crate::encode::capture::SnapshotCaptureSink;
use crate::encode::sink::FrameSink;
use crate::foundation::error::{PlaceError, PlaceResult};
use crate::reorder::layout::ShardLayout;
use crate::replay::engine::{ReplayEngine, ReplayStats};
use crate::viewport::select::{
    DisplayScale, Seed, Viewport, ViewportPlan, ViewportSize, plan_viewport, select_viewport,
};
use crate::viewport::snapshot::seed_canvas;

/// Session-oriented replay over one epoch's ordered shards.
///
/// A session resolves the epoch once; each [`PlaybackSession::play`] seeds a fresh canvas and
/// replays from the plan's start rank to the epoch's last rank.
#[derive(Clone, Debug)]
pub struct PlaybackSession {
    epoch: EpochConfig,
    display: DisplayConfig,
    layout: ShardLayout,
    snapshot_dir: PathBuf,
}

impl PlaybackSession {
    /// Session for `epoch_id`, reading ordered shards from `data_dir` and base snapshots from
    /// `snapshot_dir`.
    pub fn new(
        config: &DatasetConfig,
        epoch_id: &str,
        data_dir: impl Into<PathBuf>,
        snapshot_dir: impl Into<PathBuf>,
    ) -> PlaceResult<Self> {
        config.validate()?;
        let epoch = config.epoch(epoch_id)?.clone();
        let layout = ShardLayout::for_epoch(data_dir, &epoch);
        Ok(Self {
            epoch,
            display: config.display,
            layout,
            snapshot_dir: snapshot_dir.into(),
        })
    }

    /// Pick one of the configured epochs uniformly.
    pub fn random_epoch<'a, R: Rng + ?Sized>(
        config: &'a DatasetConfig,
        rng: &mut R,
    ) -> PlaceResult<&'a EpochConfig> {
        if config.epochs.is_empty() {
            return Err(PlaceError::validation("dataset config has no epochs"));
        }
        Ok(&config.epochs[rng.gen_range(0..config.epochs.len())])
    }

    /// Epoch being played.
    pub fn epoch(&self) -> &EpochConfig {
        &self.epoch
    }

    /// Where the epoch's ordered shards live.
    pub fn layout(&self) -> &ShardLayout {
        &self.layout
    }

    /// Display settings the session was built with.
    pub fn display(&self) -> DisplayConfig {
        self.display
    }

    /// Random scale, then a random clamped viewport sized for `display`.
    pub fn plan_random<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        display: &DisplayConfig,
    ) -> PlaceResult<ViewportPlan> {
        let scale = DisplayScale::pick(rng, display.max_scale);
        let size = ViewportSize::for_display(display.width, display.height, scale);
        select_viewport(&self.epoch, size, scale, rng)
    }

    /// Viewport at a fixed origin, sized for the session display at `scale`.
    pub fn plan_at(
        &self,
        origin_x: u32,
        origin_y: u32,
        scale: DisplayScale,
    ) -> PlaceResult<ViewportPlan> {
        let size = ViewportSize::for_display(self.display.width, self.display.height, scale)
            .clamp_to(&self.epoch);
        plan_viewport(&self.epoch, origin_x, origin_y, size, scale)
    }

    /// Whole canvas at scale 1 from the first rank, never seeded.
    pub fn plan_full_canvas(&self) -> PlaceResult<ViewportPlan> {
        let size = ViewportSize {
            width: self.epoch.canvas_width,
            height: self.epoch.canvas_height,
        };
        let viewport = Viewport::new(&self.epoch, 0, 0, size, DisplayScale::new(1.0)?)?;
        Ok(ViewportPlan {
            viewport,
            start_rank: self.epoch.first_rank(),
            first_rank: self.epoch.first_rank(),
            seed: Seed::Blank,
        })
    }

    /// Seed the canvas for `plan` and replay through the epoch's last rank.
    #[tracing::instrument(skip_all, fields(epoch = %self.epoch.id, start_rank = plan.start_rank))]
    pub fn play(&self, plan: &ViewportPlan, sink: &mut dyn FrameSink) -> PlaceResult<ReplayStats> {
        if plan.viewport.epoch != self.epoch.id {
            return Err(PlaceError::validation(format!(
                "plan is for epoch '{}' but the session replays '{}'",
                plan.viewport.epoch, self.epoch.id
            )));
        }
        let (canvas, start_rank) = seed_canvas(plan, &self.snapshot_dir)?;
        let mut engine = ReplayEngine::new(plan.viewport.clone(), canvas)?;
        engine.run(
            &self.epoch.schema,
            &self.layout,
            start_rank..self.epoch.end_rank(),
            sink,
        )
    }

    /// Replay the full canvas and save a base snapshot at each rank in `ranks`.
    ///
    /// A rank that opens a growth stage is saved under that stage's snapshot name, so the output
    /// directory can serve directly as a snapshot directory. Other ranks are saved as
    /// `<epoch id>_<rank>.png`.
    pub fn capture_snapshots(
        &self,
        ranks: impl IntoIterator<Item = u32>,
        out_dir: &Path,
    ) -> PlaceResult<Vec<(u32, PathBuf)>> {
        let targets = ranks.into_iter().map(|rank| {
            let stage_file = self
                .epoch
                .growth
                .iter()
                .find(|s| s.rank == rank)
                .and_then(|s| s.snapshot.clone());
            let file = stage_file.unwrap_or_else(|| format!("{}_{rank}.png", self.epoch.id));
            (rank, file)
        });
        let mut sink = SnapshotCaptureSink::new(out_dir, targets);
        if !sink.wants_more() {
            return Ok(Vec::new());
        }
        let plan = self.plan_full_canvas()?;
        self.play(&plan, &mut sink)?;
        Ok(sink.captured)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/playback.rs"]
mod tests;
