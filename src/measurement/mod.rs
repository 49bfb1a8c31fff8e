//! Measurement records as reported by devices.
//!
//! - `record` - the stored measurement shape and its type tag
//! - `fields` - typed access to the string-keyed parameter/value maps

pub mod fields;
pub mod record;

pub use fields::*;
pub use record::*;
