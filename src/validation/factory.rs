//! Validator dispatch.

use crate::error::{Result, ValidationError};
use crate::logging::structured::LogContext;
use crate::measurement::{MeasurementRecord, MeasurementType};

use super::dns::DnsLookup;
use super::http::Http;
use super::outcome::ValidationOutcome;
use super::ping::Ping;
use super::traceroute::Traceroute;
use super::udp_burst::UdpBurst;

/// Capability shared by every per-type validator.
pub trait MeasurementValidator {
    /// Run every rule for this measurement type.
    fn validate(&self, ctx: &LogContext) -> ValidationOutcome;

    /// Deterministic, key-sorted rendering of the working values.
    fn render_detail(&self) -> String;
}

/// A validator for one measurement, selected by type tag.
#[derive(Debug, Clone)]
pub enum Validator {
    Ping(Ping),
    DnsLookup(DnsLookup),
    Traceroute(Traceroute),
    Http(Http),
    UdpBurst(UdpBurst),
}

impl Validator {
    fn inner(&self) -> &dyn MeasurementValidator {
        match self {
            Validator::Ping(v) => v,
            Validator::DnsLookup(v) => v,
            Validator::Traceroute(v) => v,
            Validator::Http(v) => v,
            Validator::UdpBurst(v) => v,
        }
    }

    pub fn measurement_type(&self) -> MeasurementType {
        match self {
            Validator::Ping(_) => MeasurementType::Ping,
            Validator::DnsLookup(_) => MeasurementType::DnsLookup,
            Validator::Traceroute(_) => MeasurementType::Traceroute,
            Validator::Http(_) => MeasurementType::Http,
            Validator::UdpBurst(_) => MeasurementType::UdpBurst,
        }
    }
}

impl MeasurementValidator for Validator {
    fn validate(&self, ctx: &LogContext) -> ValidationOutcome {
        self.inner().validate(ctx)
    }

    fn render_detail(&self) -> String {
        self.inner().render_detail()
    }
}

/// Build the validator for a record's type.
///
/// # Errors
/// `UnsupportedMeasurementType` for types without rules (`tcpthroughput`,
/// `rrc` and unregistered tags).
pub fn create_validator(record: &MeasurementRecord) -> Result<Validator> {
    let params = &record.parameters;
    let values = &record.values;

    match &record.measurement_type {
        MeasurementType::Ping => Ok(Validator::Ping(Ping::new(params, values))),
        MeasurementType::DnsLookup => Ok(Validator::DnsLookup(DnsLookup::new(params, values))),
        MeasurementType::Traceroute => {
            Ok(Validator::Traceroute(Traceroute::new(params, values)))
        }
        MeasurementType::Http => Ok(Validator::Http(Http::new(params, values))),
        MeasurementType::UdpBurst => Ok(Validator::UdpBurst(UdpBurst::new(params, values))),
        unsupported @ (MeasurementType::TcpThroughput
        | MeasurementType::Rrc
        | MeasurementType::Other(_)) => Err(ValidationError::UnsupportedMeasurementType(
            unsupported.to_string(),
        )),
    }
}
