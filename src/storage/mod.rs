//! Storage module.
//!
//! Validation result models and the measurement-store boundary.
//! Note: The production datastore lives with the server host. This module
//! defines the interface the validation run needs and an in-memory
//! implementation used by the CLI, the bindings and the tests.

pub mod memory;
pub mod models;
pub mod store;

pub use memory::*;
pub use models::*;
pub use store::*;
