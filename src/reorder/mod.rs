//! Offline chronological reordering.
//!
//! Stage 1 ranks raw shards by first appearance, Stage 2 sorts each ranked shard internally.
//! Both run once per dataset; replay only ever reads the ordered output.

pub(crate) mod extent;
pub(crate) mod layout;
pub(crate) mod prepare;
pub(crate) mod rank;
pub(crate) mod sort;
