//! Pure utility functions.
//!
//! Process bootstrap (tracing, shutdown signal) and retry backoffs.

pub mod bootstrap;
pub mod retry;
