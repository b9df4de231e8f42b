//! Frame evaluation: the engine session and the per-frame traversal it drives.

pub(crate) mod frame;
pub(crate) mod session;
pub(crate) mod traversal;
