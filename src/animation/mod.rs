//! Animated parameters: easing curves, typed payloads, and the keyframe evaluator.

pub(crate) mod ease;
pub(crate) mod keyframes;
pub(crate) mod value;
