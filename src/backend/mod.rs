//! Backends the engine drives: the command trait plus a recording and a software implementation.

pub(crate) mod cpu;
pub(crate) mod gpu;
pub(crate) mod recording;
