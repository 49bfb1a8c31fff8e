//! Drill-down for one measurement.

use serde::Serialize;

use crate::error::{Result, ValidationError};
use crate::logging::structured::LogContext;
use crate::measurement::{MeasurementId, MeasurementType};
use crate::storage::{MeasurementStore, StoreError};
use crate::validation::{create_validator, MeasurementValidator, ValidationOutcome};

/// Fresh validation of a stored measurement, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDetail {
    /// Measurement day as `YYYYMMDD`.
    pub hash: String,
    #[serde(rename = "type")]
    pub measurement_type: MeasurementType,
    pub success: bool,
    pub validation_results: ValidationOutcome,
    pub details: String,
}

/// Re-validate one measurement and render its values.
///
/// # Errors
/// `Query` when the measurement does not exist or the store fails, and
/// `UnsupportedMeasurementType` when the type has no validator.
pub fn error_detail(store: &dyn MeasurementStore, id: &MeasurementId) -> Result<ErrorDetail> {
    let record = store
        .measurement(id)
        .map_err(ValidationError::Query)?
        .ok_or_else(|| ValidationError::Query(StoreError::NotFound(id.to_string())))?;

    let validator = create_validator(&record)?;
    let ctx = LogContext::new("dashboard").with_measurement(id.as_str());

    Ok(ErrorDetail {
        hash: record.timestamp.format("%Y%m%d").to_string(),
        measurement_type: record.measurement_type,
        success: record.success,
        validation_results: validator.validate(&ctx),
        details: validator.render_detail(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::{DeviceId, MeasurementRecord};
    use crate::storage::MemoryStore;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn store_with(kind: MeasurementType, values: &[(&str, &str)]) -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_measurement(MeasurementRecord {
            id: MeasurementId::from("m-1"),
            measurement_type: kind,
            timestamp: Utc.with_ymd_and_hms(2012, 3, 21, 17, 5, 0).unwrap(),
            success: false,
            parameters: BTreeMap::new(),
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            device: DeviceId::from("dev-1"),
            task: None,
        });
        store
    }

    #[test]
    fn test_error_detail() {
        let store = store_with(
            MeasurementType::DnsLookup,
            &[("address", "10.0.0.1"), ("real_hostname", "x"), ("time_ms", "-1")],
        );
        let detail = error_detail(&store, &MeasurementId::from("m-1")).unwrap();
        assert_eq!(detail.hash, "20120321");
        assert!(!detail.success);
        assert_eq!(detail.validation_results.error_types(), ["lookup_duration_invalid"]);
        assert_eq!(detail.details, "address: 10.0.0.1\nreal_hostname: x\ntime_ms: -1\n");

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["type"], "dns_lookup");
        assert_eq!(json["validation_results"]["valid"], false);
    }

    #[test]
    fn test_error_detail_failures() {
        let store = store_with(MeasurementType::Rrc, &[]);
        assert!(matches!(
            error_detail(&store, &MeasurementId::from("m-1")),
            Err(ValidationError::UnsupportedMeasurementType(_))
        ));
        assert!(matches!(
            error_detail(&store, &MeasurementId::from("m-9")),
            Err(ValidationError::Query(StoreError::NotFound(_)))
        ));
    }
}
