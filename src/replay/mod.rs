//! Chronological replay over a bounded viewport.
//!
//! The engine consumes ordered shards in rank order, paints in-viewport events onto a canvas
//! buffer, and emits a frame to a [`crate::FrameSink`] at every second boundary.

pub(crate) mod canvas;
pub(crate) mod engine;
