//! UDP burst validation.

use std::collections::BTreeMap;

use crate::logging::structured::LogContext;

use super::factory::MeasurementValidator;
use super::outcome::ValidationOutcome;
use super::render_sorted;

/// UDP burst result.
#[derive(Debug, Clone)]
pub struct UdpBurst {
    values: BTreeMap<String, String>,
}

impl UdpBurst {
    pub fn new(_parameters: &BTreeMap<String, String>, values: &BTreeMap<String, String>) -> Self {
        Self {
            values: values.clone(),
        }
    }
}

impl MeasurementValidator for UdpBurst {
    // TODO: no rules exist for udp_burst yet; every record passes until the
    // burst value set is agreed with the device team.
    fn validate(&self, _ctx: &LogContext) -> ValidationOutcome {
        ValidationOutcome::new()
    }

    fn render_detail(&self) -> String {
        render_sorted(&self.values)
    }
}
