//! Dataset and epoch configuration.
//!
//! Growth-stage boundaries and coordinate offsets are empirical values measured against the real
//! dataset, so they live here as data rather than in code.

pub(crate) mod dataset;
