//! Ping validation.

use std::collections::BTreeMap;

use crate::logging::structured::LogContext;
use crate::measurement::{FieldError, Fields};

use super::factory::MeasurementValidator;
use super::outcome::*;
use super::{render_sorted, MAX_RTT_MS};

const REQUIRED_FIELDS: &[&str] = &[
    "mean_rtt_ms",
    "min_rtt_ms",
    "max_rtt_ms",
    "packet_loss",
    "stddev_rtt_ms",
    "packets_sent",
    "target_ip",
];

/// Ping result: RTT statistics towards one target.
#[derive(Debug, Clone)]
pub struct Ping {
    values: BTreeMap<String, String>,
}

impl Ping {
    pub fn new(_parameters: &BTreeMap<String, String>, values: &BTreeMap<String, String>) -> Self {
        Self {
            values: values.clone(),
        }
    }

    fn rtt_ordered(fields: &Fields<'_>) -> Result<bool, FieldError<'static>> {
        let min = fields.number("min_rtt_ms")?;
        let mean = fields.number("mean_rtt_ms")?;
        let max = fields.number("max_rtt_ms")?;
        Ok(min <= mean && mean <= max)
    }
}

impl MeasurementValidator for Ping {
    fn validate(&self, ctx: &LogContext) -> ValidationOutcome {
        let fields = Fields::new(&self.values);
        let mut outcome = ValidationOutcome::new();

        outcome.require(&fields, REQUIRED_FIELDS);

        outcome.check(
            ADDRESS_NOT_VALID,
            fields.ip("target_ip").map(|_| true),
            ctx,
        );
        outcome.check(
            MEAN_RTT_VALUE_INVALID,
            fields
                .number("mean_rtt_ms")
                .map(|mean| (0.0..=MAX_RTT_MS).contains(&mean)),
            ctx,
        );
        outcome.check(RTT_RANGE_INVALID, Self::rtt_ordered(&fields), ctx);
        outcome.check(
            PKT_LOSS_INVALID,
            fields
                .number("packet_loss")
                .map(|loss| (0.0..=1.0).contains(&loss)),
            ctx,
        );
        outcome.check(
            STDDEV_RTT_INVALID,
            fields.number("stddev_rtt_ms").map(|stddev| stddev >= 0.0),
            ctx,
        );
        outcome.check(
            MAX_RTT_TOO_LARGE,
            fields.number("max_rtt_ms").map(|max| max <= MAX_RTT_MS),
            ctx,
        );
        outcome.check(
            PACKETS_SENT_INVALID,
            fields.number("packets_sent").map(|sent| sent > 0.0),
            ctx,
        );

        outcome
    }

    fn render_detail(&self) -> String {
        render_sorted(&self.values)
    }
}
