//! Structured logging with run context.
//!
//! Provides logging macros and utilities that include the run_id and,
//! where relevant, the measurement id in every log message.

pub mod structured;

pub use structured::*;
