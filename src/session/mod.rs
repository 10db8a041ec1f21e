//! Playback sessions: one epoch, one viewport, one replay.

pub(crate) mod playback;
