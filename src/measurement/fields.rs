//! Typed field access over measurement value maps.
//!
//! Devices report every value as a string, and some clients wrap strings
//! in double quotes. Accessors strip that quoting before parsing and report
//! a missing key separately from a value that does not parse.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// Why a field could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError<'a> {
    Missing(&'a str),
    Malformed(&'a str),
}

impl<'a> FieldError<'a> {
    pub fn field(&self) -> &'a str {
        match self {
            FieldError::Missing(name) | FieldError::Malformed(name) => name,
        }
    }
}

impl fmt::Display for FieldError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Missing(name) => write!(f, "missing field {}", name),
            FieldError::Malformed(name) => write!(f, "malformed field {}", name),
        }
    }
}

/// Read-only view over a string-keyed value map.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'m> {
    values: &'m BTreeMap<String, String>,
}

impl<'m> Fields<'m> {
    pub fn new(values: &'m BTreeMap<String, String>) -> Self {
        Self { values }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Raw value, quoting preserved.
    pub fn text<'n>(&self, name: &'n str) -> Result<&'m str, FieldError<'n>> {
        self.values
            .get(name)
            .map(|v| v.as_str())
            .ok_or(FieldError::Missing(name))
    }

    /// Numeric value, parsed as `f64` after stripping quotes and whitespace.
    pub fn number<'n>(&self, name: &'n str) -> Result<f64, FieldError<'n>> {
        let raw = self.text(name)?;
        parse_number(raw).ok_or(FieldError::Malformed(name))
    }

    /// IPv4 or IPv6 literal.
    pub fn ip<'n>(&self, name: &'n str) -> Result<IpAddr, FieldError<'n>> {
        let raw = self.text(name)?;
        parse_ip(raw).ok_or(FieldError::Malformed(name))
    }
}

/// Strip surrounding whitespace and one level of double quotes.
pub fn unquote(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
}

pub fn parse_number(raw: &str) -> Option<f64> {
    unquote(raw).parse::<f64>().ok().filter(|v| !v.is_nan())
}

pub fn parse_ip(raw: &str) -> Option<IpAddr> {
    unquote(raw).parse().ok()
}
