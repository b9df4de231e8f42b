//! Scene graph: node kinds, the refcounted arena, validation, and (de)serialization.

pub(crate) mod arena;
pub(crate) mod builder;
pub(crate) mod ids;
pub(crate) mod node;
pub(crate) mod serialize;
pub(crate) mod validate;
