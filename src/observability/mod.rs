//! Logging infrastructure.
//!
//! Provides structured tracing output for the relay and its tests.

pub mod tracing;
