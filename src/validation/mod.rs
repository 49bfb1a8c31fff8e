//! Per-type measurement validation.
//!
//! Each validator wraps one measurement's parameter and value maps and
//! reports a pass/fail outcome plus error-category tags:
//! - `ping`, `dns`, `traceroute`, `http`, `udp_burst` - type-specific rules
//! - `factory` - dispatch from a record's type tag to its validator
//! - `outcome` - the outcome type and the shared tag vocabulary

pub mod dns;
pub mod factory;
pub mod http;
pub mod outcome;
pub mod ping;
pub mod traceroute;
pub mod udp_burst;

pub use factory::*;
pub use outcome::*;

use std::collections::BTreeMap;

/// Upper bound for any round-trip time, in milliseconds.
pub const MAX_RTT_MS: f64 = 3000.0;

/// Render a value map as sorted `key: value` lines.
pub(crate) fn render_sorted(values: &BTreeMap<String, String>) -> String {
    let mut output = String::new();
    for (key, value) in values {
        output.push_str(key);
        output.push_str(": ");
        output.push_str(value);
        output.push('\n');
    }
    output
}
