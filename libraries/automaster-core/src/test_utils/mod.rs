//! Test utilities for mastering DSP tests
//!
//! Provides deterministic test signals and simple measurements shared by the
//! unit, integration and property tests of the Automaster crates.

pub mod analysis;
pub mod signals;

pub use analysis::*;
pub use signals::*;
