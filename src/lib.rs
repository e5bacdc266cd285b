//! Thread-safe multi-pass image film for offline renderers.
//!
//! The film accumulates filtered sub-pixel samples into a set of weighted
//! pass images, drives progressive refinement through an adaptive
//! anti-aliasing mask, derives edge/toon passes, and checkpoints itself so
//! long renders can be resumed and combined across nodes.

pub mod core;
pub mod filters;
