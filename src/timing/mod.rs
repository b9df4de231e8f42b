//! Time-range gating of subtrees.

pub(crate) mod time_range;
