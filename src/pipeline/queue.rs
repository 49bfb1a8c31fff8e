//! Follow-up validation jobs.
//!
//! Multi-day validation is split into single-day jobs handed to an external
//! task queue, so each invocation stays bounded to one window and a failed
//! day can be retried on its own.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::context::RunWindow;

/// Name of the queue validation jobs are submitted to.
pub const VALIDATION_QUEUE: &str = "validation";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue {queue} rejected job: {reason}")]
    Rejected { queue: String, reason: String },

    #[error("queue unavailable: {0}")]
    Unavailable(String),
}

/// One deferred validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationJob {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Iterations the job itself should perform; fanned-out jobs carry 1.
    pub remaining_iterations: u32,
}

impl ValidationJob {
    pub fn for_window(window: RunWindow) -> Self {
        Self {
            window_start: window.start,
            window_end: window.end,
            remaining_iterations: 1,
        }
    }

    pub fn window(&self) -> RunWindow {
        RunWindow {
            start: self.window_start,
            end: self.window_end,
        }
    }
}

/// Fire-and-forget scheduling of follow-up runs.
pub trait TaskQueue {
    fn enqueue(&self, job: ValidationJob) -> Result<(), QueueError>;
}

/// Queue that keeps submitted jobs in memory until drained.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    jobs: Mutex<Vec<ValidationJob>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Remove and return every queued job, oldest first.
    pub fn drain(&self) -> Vec<ValidationJob> {
        std::mem::take(&mut *self.jobs.lock())
    }
}

impl TaskQueue for MemoryQueue {
    fn enqueue(&self, job: ValidationJob) -> Result<(), QueueError> {
        log::debug!(
            "JOB_ENQUEUED queue={} start={} end={}",
            VALIDATION_QUEUE,
            job.window_start,
            job.window_end
        );
        self.jobs.lock().push(job);
        Ok(())
    }
}
