use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::Range;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::encode::sink::{FrameMeta, FrameSink, SinkConfig};
use crate::foundation::error::{PlaceError, PlaceResult};
use crate::record::normalize::{CanonicalEvent, LineStats, normalize};
use crate::record::schema::RecordSchema;
use crate::reorder::layout::ShardLayout;
use crate::replay::canvas::CanvasBuffer;
use crate::viewport::select::Viewport;

/// Engine lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayState {
    /// Constructed, nothing streamed yet.
    Idle,
    /// Applying events.
    Streaming,
    /// Handing a frame to the sink.
    Emitting,
    /// Rank range exhausted (or the sink stopped); no further input accepted.
    Drained,
}

/// Counters for one streamed shard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShardStats {
    /// Rank of the shard.
    pub rank: u32,
    /// Line outcomes.
    pub lines: LineStats,
    /// Events written to the canvas.
    pub applied: u64,
    /// Valid events outside the viewport.
    pub outside: u64,
    /// Frames emitted while this shard streamed.
    pub frames: u64,
    /// Wall time spent streaming the shard.
    pub elapsed: Duration,
}

/// Counters for a whole replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Ordered shards streamed.
    pub shards_read: u32,
    /// Ranks in range with no ordered shard file.
    pub shards_missing: u32,
    /// Line outcomes across every shard.
    pub lines: LineStats,
    /// Events written to the canvas.
    pub applied: u64,
    /// Valid events outside the viewport.
    pub outside: u64,
    /// Frames handed to the sink.
    pub frames: u64,
    /// The sink asked to stop before the rank range was exhausted.
    pub stopped_early: bool,
    /// Total wall time spent streaming shards.
    pub elapsed: Duration,
    /// Quickest single shard.
    pub fastest_shard: Duration,
    /// Slowest single shard.
    pub slowest_shard: Duration,
}

impl ReplayStats {
    /// Mean wall time per streamed shard.
    pub fn mean_shard_time(&self) -> Duration {
        match self.shards_read {
            0 => Duration::ZERO,
            n => self.elapsed / n,
        }
    }

    fn absorb(&mut self, shard: &ShardStats) {
        self.fastest_shard = if self.shards_read == 0 {
            shard.elapsed
        } else {
            self.fastest_shard.min(shard.elapsed)
        };
        self.slowest_shard = self.slowest_shard.max(shard.elapsed);
        self.elapsed += shard.elapsed;
        self.shards_read += 1;
        self.lines.merge(&shard.lines);
        self.applied += shard.applied;
        self.outside += shard.outside;
    }
}

/// Streams ordered events onto a viewport canvas and emits one frame per elapsed second.
///
/// A frame is a copy of the canvas taken when the first event of a new whole second arrives, so it
/// shows every event of the previous second. The canvas is never reset between shards.
#[derive(Debug)]
pub struct ReplayEngine {
    viewport: Viewport,
    canvas: CanvasBuffer,
    state: ReplayState,
    tracked_second: Option<i64>,
    pending: bool,
    current_rank: Option<u32>,
    stats: ReplayStats,
}

impl ReplayEngine {
    /// Engine over `canvas`, which must already have the viewport's size.
    pub fn new(viewport: Viewport, canvas: CanvasBuffer) -> PlaceResult<Self> {
        if (canvas.width(), canvas.height()) != (viewport.width, viewport.height) {
            return Err(PlaceError::validation(format!(
                "canvas is {}x{} but viewport is {}x{}",
                canvas.width(),
                canvas.height(),
                viewport.width,
                viewport.height
            )));
        }
        Ok(Self {
            viewport,
            canvas,
            state: ReplayState::Idle,
            tracked_second: None,
            pending: false,
            current_rank: None,
            stats: ReplayStats::default(),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ReplayState {
        self.state
    }

    /// Viewport being replayed.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Canvas as of the last applied event.
    pub fn canvas(&self) -> &CanvasBuffer {
        &self.canvas
    }

    /// Counters so far.
    pub fn stats(&self) -> ReplayStats {
        self.stats
    }

    /// Give the canvas back to the caller.
    pub fn into_canvas(self) -> CanvasBuffer {
        self.canvas
    }

    /// Apply one event. Returns whether it landed inside the viewport.
    ///
    /// Crossing into a new whole second first emits a frame for the tracked second.
    pub fn accept(&mut self, event: &CanonicalEvent, sink: &mut dyn FrameSink) -> PlaceResult<bool> {
        if self.state == ReplayState::Drained {
            return Err(PlaceError::validation("replay engine is drained"));
        }
        self.state = ReplayState::Streaming;

        let Some((lx, ly)) = self.viewport.local(event.position) else {
            self.stats.outside += 1;
            return Ok(false);
        };
        let second = event.timestamp.whole_second();
        if let Some(tracked) = self.tracked_second
            && tracked != second
        {
            self.emit(tracked, sink)?;
        }
        self.tracked_second = Some(second);
        self.canvas.set(lx, ly, event.color);
        self.pending = true;
        self.stats.applied += 1;
        Ok(true)
    }

    fn emit(&mut self, second: i64, sink: &mut dyn FrameSink) -> PlaceResult<()> {
        self.state = ReplayState::Emitting;
        let meta = FrameMeta {
            index: self.stats.frames,
            second,
            rank: self.current_rank,
        };
        sink.push_frame(meta, self.canvas.snapshot())?;
        self.stats.frames += 1;
        self.pending = false;
        self.state = ReplayState::Streaming;
        Ok(())
    }

    /// Stream every line of `reader` as shard `rank`; bad lines are counted and skipped.
    pub fn stream_reader<R: BufRead>(
        &mut self,
        schema: &RecordSchema,
        rank: u32,
        mut reader: R,
        sink: &mut dyn FrameSink,
    ) -> PlaceResult<ShardStats> {
        let started = Instant::now();
        self.current_rank = Some(rank);
        let frames_before = self.stats.frames;
        let applied_before = self.stats.applied;
        let outside_before = self.stats.outside;
        let mut lines = LineStats::default();
        let mut buf = Vec::new();

        while sink.wants_more() {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .with_context(|| format!("read ordered shard at rank {rank}"))?;
            if n == 0 {
                break;
            }
            let parsed = std::str::from_utf8(&buf)
                .map_err(|e| PlaceError::malformed(format!("invalid utf-8: {e}")))
                .and_then(|line| normalize(schema, line));
            match parsed {
                Ok(event) => {
                    lines.accept();
                    self.accept(&event, sink)?;
                }
                Err(err) if err.is_line_local() => {
                    tracing::debug!(rank, %err, "skipping line");
                    lines.reject(&err);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(ShardStats {
            rank,
            lines,
            applied: self.stats.applied - applied_before,
            outside: self.stats.outside - outside_before,
            frames: self.stats.frames - frames_before,
            elapsed: started.elapsed(),
        })
    }

    /// Stream one ordered shard file.
    #[tracing::instrument(skip_all, fields(rank = rank, path = %path.display()))]
    pub fn stream_shard(
        &mut self,
        schema: &RecordSchema,
        rank: u32,
        path: &Path,
        sink: &mut dyn FrameSink,
    ) -> PlaceResult<ShardStats> {
        let f = File::open(path)
            .with_context(|| format!("open ordered shard '{}'", path.display()))?;
        let shard = self.stream_reader(schema, rank, BufReader::new(f), sink)?;
        self.stats.absorb(&shard);
        tracing::info!(
            lines = shard.lines.total,
            applied = shard.applied,
            rejected = shard.lines.rejected(),
            frames = shard.frames,
            elapsed_ms = shard.elapsed.as_secs_f64() * 1000.0,
            "shard replayed"
        );
        Ok(shard)
    }

    /// Replay every ordered shard in `ranks`, ascending, then flush the last pending second.
    ///
    /// Ranks without a shard file are skipped. Fails with [`PlaceError::NoShards`] when none of
    /// them exist.
    pub fn run(
        &mut self,
        schema: &RecordSchema,
        layout: &ShardLayout,
        ranks: Range<u32>,
        sink: &mut dyn FrameSink,
    ) -> PlaceResult<ReplayStats> {
        if self.state != ReplayState::Idle {
            return Err(PlaceError::validation("replay engine can only run once"));
        }
        sink.begin(SinkConfig {
            width: self.viewport.width,
            height: self.viewport.height,
            scale: self.viewport.scale,
        })?;

        for rank in ranks.clone() {
            if !sink.wants_more() {
                self.stats.stopped_early = true;
                break;
            }
            let path = layout.ordered_path(rank);
            if !path.is_file() {
                let err = PlaceError::MissingShard { rank };
                tracing::warn!(%err, path = %path.display(), "skipping rank");
                self.stats.shards_missing += 1;
                continue;
            }
            self.stream_shard(schema, rank, &path, sink)?;
        }

        if self.stats.shards_read == 0 {
            self.state = ReplayState::Drained;
            return Err(PlaceError::no_shards(format!(
                "no ordered shard in ranks {}..{} under '{}'",
                ranks.start,
                ranks.end,
                layout.dir().display()
            )));
        }

        if self.pending
            && let Some(second) = self.tracked_second
        {
            if sink.wants_more() {
                self.emit(second, sink)?;
            } else {
                self.stats.stopped_early = true;
            }
        }
        sink.end()?;
        self.state = ReplayState::Drained;
        tracing::info!(
            shards = self.stats.shards_read,
            missing = self.stats.shards_missing,
            frames = self.stats.frames,
            applied = self.stats.applied,
            elapsed_s = self.stats.elapsed.as_secs_f64(),
            fastest_ms = self.stats.fastest_shard.as_secs_f64() * 1000.0,
            slowest_ms = self.stats.slowest_shard.as_secs_f64() * 1000.0,
            mean_ms = self.stats.mean_shard_time().as_secs_f64() * 1000.0,
            "replay drained"
        );
        Ok(self.stats)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/replay/engine.rs"]
mod tests;
