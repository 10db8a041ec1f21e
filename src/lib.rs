//! placeplay replays the r/place canvas-history event log as a chronological animation.
//!
//! The dataset is a set of unordered CSV shards. Processing happens in two phases:
//!
//! - Offline, once per dataset: [`prepare_epoch`] ranks raw shards by their first event and sorts
//!   each one internally, producing ordered shards.
//! - Per session: a [`PlaybackSession`] picks a [`Viewport`], seeds its canvas (from a base
//!   snapshot when one covers the viewport) and streams ordered shards into a [`FrameSink`],
//!   one [`Frame`] per elapsed second.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod encode;
mod foundation;
mod record;
mod reorder;
mod replay;
mod session;
mod viewport;

pub use crate::foundation::core::{CanvasRect, FIRST_RANK, Position, Rgb8};
pub use crate::foundation::error::{PlaceError, PlaceResult};

pub use crate::config::dataset::{
    DatasetConfig, DisplayConfig, EpochConfig, GrowthStage, ShardNaming, ShardOrdering,
};
pub use crate::record::normalize::{CanonicalEvent, LineStats, normalize};
pub use crate::record::schema::{RawFields, RecordSchema};
pub use crate::record::timestamp::Timestamp;

pub use crate::reorder::extent::{ShardExtent, shard_extent};
pub use crate::reorder::layout::{DirRawShards, RawShard, RawShardSource, ShardLayout};
pub use crate::reorder::prepare::{PrepareReport, ReorderOpts, prepare_epoch};
pub use crate::reorder::rank::{
    RankAssignment, RankCollision, RankReport, first_event_key, plan_ranks, rank_shards,
};
pub use crate::reorder::sort::{SortReport, sort_bytes, sort_lines, sort_shard};

pub use crate::replay::canvas::{CanvasBuffer, Frame};
pub use crate::replay::engine::{ReplayEngine, ReplayState, ReplayStats, ShardStats};

pub use crate::viewport::select::{
    DisplayScale, Seed, Viewport, ViewportPlan, ViewportSize, clamp_axis, classify, plan_viewport,
    select_viewport,
};
pub use crate::viewport::snapshot::{load_region, save_frame_png, seed_canvas};

pub use crate::encode::capture::SnapshotCaptureSink;
pub use crate::encode::png::PngSequenceSink;
pub use crate::encode::sink::{FrameMeta, FrameSink, InMemorySink, SinkConfig};

pub use crate::session::playback::PlaybackSession;
