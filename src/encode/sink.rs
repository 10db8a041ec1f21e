use crate::foundation::error::PlaceResult;
use crate::replay::canvas::Frame;
use crate::viewport::select::DisplayScale;

/// Configuration provided to a [`FrameSink`] at the start of a replay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkConfig {
    /// Frame width in canvas pixels.
    pub width: u32,
    /// Frame height in canvas pixels.
    pub height: u32,
    /// Magnification the presentation layer should apply.
    pub scale: DisplayScale,
}

/// Position of a frame in the replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMeta {
    /// Zero-based, strictly increasing frame counter.
    pub index: u64,
    /// Whole unix second the frame closes.
    pub second: i64,
    /// Rank of the shard being streamed when the frame was emitted.
    pub rank: Option<u32>,
}

/// Sink contract for consuming replay frames in chronological order.
///
/// Ordering contract: `push_frame` is called with strictly increasing `FrameMeta::index`, between
/// one `begin` and one `end`.
pub trait FrameSink {
    /// Called once before the first frame.
    fn begin(&mut self, cfg: SinkConfig) -> PlaceResult<()>;
    /// Consume one frame.
    fn push_frame(&mut self, meta: FrameMeta, frame: Frame) -> PlaceResult<()>;
    /// Called once after the last frame.
    fn end(&mut self) -> PlaceResult<()>;

    /// `false` asks the producer to stop early; `end` is still called.
    fn wants_more(&self) -> bool {
        true
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    ended: bool,
    /// Frames in replay order.
    pub frames: Vec<(FrameMeta, Frame)>,
}

impl InMemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Config received by the last `begin`.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Whether `end` has been called since the last `begin`.
    pub fn ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> PlaceResult<()> {
        self.cfg = Some(cfg);
        self.ended = false;
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, meta: FrameMeta, frame: Frame) -> PlaceResult<()> {
        self.frames.push((meta, frame));
        Ok(())
    }

    fn end(&mut self) -> PlaceResult<()> {
        self.ended = true;
        Ok(())
    }
}
