/// Convenience result type used across placeplay.
pub type PlaceResult<T> = Result<T, PlaceError>;

/// Top-level error taxonomy used by ingestion, reordering and replay APIs.
///
/// Line-level variants (`MalformedRecord`, `AmbiguousTimestamp`) are counted and skipped by the
/// shard loops; only structural failures are surfaced to callers as fatal.
#[derive(thiserror::Error, Debug)]
pub enum PlaceError {
    /// A raw line had the wrong shape or an unparseable field.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// A timestamp could not be parsed at any accepted precision.
    #[error("ambiguous timestamp: {0}")]
    AmbiguousTimestamp(String),

    /// No shard file exists at the expected rank.
    #[error("missing shard at rank {rank}")]
    MissingShard {
        /// Rank that had no shard file.
        rank: u32,
    },

    /// Two raw shards started within the same second; one mapping was overwritten.
    #[error("shard rank collision at key {key}: '{kept}' replaced '{dropped}'")]
    ShardRankCollision {
        /// Whole-second key both shards mapped to.
        key: i64,
        /// Shard that kept the mapping.
        kept: String,
        /// Shard whose mapping was dropped.
        dropped: String,
    },

    /// No growth stage of the epoch contains the requested viewport.
    #[error("viewport unresolvable: {0}")]
    ViewportUnresolvable(String),

    /// No shard in the requested rank range could be opened.
    #[error("no readable shards: {0}")]
    NoShards(String),

    /// Invalid configuration or caller-provided parameters.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PlaceError {
    /// Build a [`PlaceError::MalformedRecord`] value.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    /// Build a [`PlaceError::AmbiguousTimestamp`] value.
    pub fn ambiguous_timestamp(msg: impl Into<String>) -> Self {
        Self::AmbiguousTimestamp(msg.into())
    }

    /// Build a [`PlaceError::ViewportUnresolvable`] value.
    pub fn viewport_unresolvable(msg: impl Into<String>) -> Self {
        Self::ViewportUnresolvable(msg.into())
    }

    /// Build a [`PlaceError::NoShards`] value.
    pub fn no_shards(msg: impl Into<String>) -> Self {
        Self::NoShards(msg.into())
    }

    /// Build a [`PlaceError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether this error only affects a single line and should be counted, not propagated.
    pub fn is_line_local(&self) -> bool {
        matches!(self, Self::MalformedRecord(_) | Self::AmbiguousTimestamp(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
