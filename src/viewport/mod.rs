//! Viewport selection and base-snapshot seeding.
//!
//! A viewport is a sub-rectangle of one epoch's canvas. When it fits inside a later growth stage
//! whose full canvas was captured as a snapshot, replay starts at that stage's rank with the
//! snapshot region as its initial canvas instead of replaying history from the first shard.

pub(crate) mod select;
pub(crate) mod snapshot;
