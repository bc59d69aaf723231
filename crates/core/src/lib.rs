//! Drain: multi-channel biquad equalizer
//!
//! Cascaded second-order IIR sections applied per channel to interleaved
//! audio, in floating point or saturating fixed point.

pub mod domain;

pub use domain::*;
