//! Fixed-function draw state and its nested scoping.

pub(crate) mod draw_state;
pub(crate) mod stack;
