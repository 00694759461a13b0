//! # Builder Configuration Module
//!
//! Centralizes the numeric configuration of the encoder. Scattered constants
//! across format, index, and assembly code led to mismatch bugs in earlier
//! revisions; interdependent values now live in one place with their
//! relationships documented and enforced through compile-time assertions.
//!
//! - [`constants`]: all numeric configuration values with dependency notes

pub mod constants;
pub use constants::*;
