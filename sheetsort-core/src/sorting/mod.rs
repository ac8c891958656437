//! Sort executor for sheet rows
//!
//! This module provides:
//! - Per-row sort keys with per-column direction
//! - A fallible, cancellable, stable reorder of the row sequence
//! - Background execution with progress reporting

pub mod executor;
pub mod keys;
pub mod utils;

pub use executor::*;
pub use keys::*;
