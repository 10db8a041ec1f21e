//! Record normalization: raw shard lines to [`CanonicalEvent`](normalize::CanonicalEvent)s.

pub(crate) mod normalize;
pub(crate) mod schema;
pub(crate) mod timestamp;
