//! Validation run pipeline.
//!
//! Coordinates one validation request:
//! - Window parsing and run context
//! - Follow-up job scheduling for multi-day requests
//! - Record streaming, scoring and summary accumulation
//! - Persistence of summaries and entries
//! - Report and notification presentation

pub mod context;
pub mod queue;
pub mod report;
pub mod request;
pub mod run;

pub use context::*;
pub use queue::*;
pub use report::*;
pub use request::*;
pub use run::*;
