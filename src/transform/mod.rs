//! Local transform construction and world-transform composition.

pub(crate) mod local;
