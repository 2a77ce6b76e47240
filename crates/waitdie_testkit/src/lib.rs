//! # Wait-Die Testkit
//!
//! Test utilities for the Wait-Die lock manager.
//!
//! This crate provides:
//! - Deterministic lock manager fixtures
//! - Property-based test generators using proptest
//! - Multi-threaded stress helpers that check mutual exclusion and liveness
//!
//! ## Usage
//!
//! ```rust,ignore
//! use waitdie_testkit::prelude::*;
//!
//! let fx = Fixture::two_resources();
//! let mut old = fx.begin_at(2);
//! let mut young = fx.begin_at(10);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
