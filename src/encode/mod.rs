//! Frame sinks: where replay output goes.

pub(crate) mod capture;
pub(crate) mod png;
pub(crate) mod sink;
