//! Measurement record model.
//!
//! A record is created by a device posting a measurement and is immutable
//! afterwards, apart from clearing a task reference that no longer resolves.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Measurement type tag.
///
/// `Other` carries tags outside the known vocabulary so that records with
/// unregistered types can still be counted instead of rejected at load time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MeasurementType {
    Ping,
    DnsLookup,
    Traceroute,
    Http,
    TcpThroughput,
    Rrc,
    UdpBurst,
    Other(String),
}

impl MeasurementType {
    /// Types that have a validator, in display order.
    pub const VALIDATED: [MeasurementType; 5] = [
        MeasurementType::Ping,
        MeasurementType::DnsLookup,
        MeasurementType::Traceroute,
        MeasurementType::Http,
        MeasurementType::UdpBurst,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            MeasurementType::Ping => "ping",
            MeasurementType::DnsLookup => "dns_lookup",
            MeasurementType::Traceroute => "traceroute",
            MeasurementType::Http => "http",
            MeasurementType::TcpThroughput => "tcpthroughput",
            MeasurementType::Rrc => "rrc",
            MeasurementType::UdpBurst => "udp_burst",
            MeasurementType::Other(tag) => tag,
        }
    }

    pub fn is_validated(&self) -> bool {
        Self::VALIDATED.contains(self)
    }
}

impl From<&str> for MeasurementType {
    fn from(tag: &str) -> Self {
        match tag {
            "ping" => MeasurementType::Ping,
            "dns_lookup" => MeasurementType::DnsLookup,
            "traceroute" => MeasurementType::Traceroute,
            "http" => MeasurementType::Http,
            "tcpthroughput" => MeasurementType::TcpThroughput,
            "rrc" => MeasurementType::Rrc,
            "udp_burst" => MeasurementType::UdpBurst,
            other => MeasurementType::Other(other.to_string()),
        }
    }
}

impl From<String> for MeasurementType {
    fn from(tag: String) -> Self {
        MeasurementType::from(tag.as_str())
    }
}

impl From<MeasurementType> for String {
    fn from(kind: MeasurementType) -> Self {
        match kind {
            MeasurementType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for MeasurementType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(MeasurementType::from(s))
    }
}

impl fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store key of a measurement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasurementId(pub String);

/// Unique id of a reporting device.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

/// Store key of a scheduled measurement task.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

macro_rules! impl_id_display {
    ($($name:ident),*) => {
        $(
            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<&str> for $name {
                fn from(id: &str) -> Self {
                    $name(id.to_string())
                }
            }

            impl $name {
                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }
        )*
    };
}

impl_id_display!(MeasurementId, DeviceId, TaskId);

/// Static properties of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: DeviceId,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
}

/// A measurement task that devices are asked to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub id: TaskId,
    #[serde(rename = "type")]
    pub measurement_type: MeasurementType,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
}

/// One measurement reported by one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub id: MeasurementId,
    #[serde(rename = "type")]
    pub measurement_type: MeasurementType,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    pub device: DeviceId,
    #[serde(default)]
    pub task: Option<TaskId>,
}

impl MeasurementRecord {
    /// Return the measurement value indexed by the given key.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.as_str())
    }

    /// Return the measurement parameter indexed by the given key.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tags_round_trip_through_strings() {
        for tag in [
            "ping",
            "dns_lookup",
            "traceroute",
            "http",
            "tcpthroughput",
            "rrc",
            "udp_burst",
        ] {
            let kind = MeasurementType::from(tag);
            assert!(!matches!(kind, MeasurementType::Other(_)), "{tag}");
            assert_eq!(kind.as_str(), tag);
        }

        let unknown = MeasurementType::from("ndt");
        assert_eq!(unknown, MeasurementType::Other("ndt".to_string()));
        assert_eq!(unknown.to_string(), "ndt");
    }

    #[test]
    fn test_validated_vocabulary() {
        assert!(MeasurementType::Ping.is_validated());
        assert!(MeasurementType::UdpBurst.is_validated());
        assert!(!MeasurementType::TcpThroughput.is_validated());
        assert!(!MeasurementType::Rrc.is_validated());
        assert!(!MeasurementType::Other("ndt".to_string()).is_validated());
    }

    #[test]
    fn test_record_deserializes_from_json() {
        let record: MeasurementRecord = serde_json::from_str(
            r#"{
                "id": "m-1",
                "type": "dns_lookup",
                "timestamp": "2012-03-21T10:00:00Z",
                "success": true,
                "parameters": {"target": "www.google.com"},
                "values": {"address": "\"10.0.0.1\"", "time_ms": "20"},
                "device": "dev-1"
            }"#,
        )
        .unwrap();

        assert_eq!(record.measurement_type, MeasurementType::DnsLookup);
        assert_eq!(record.value("time_ms"), Some("20"));
        assert_eq!(record.parameter("target"), Some("www.google.com"));
        assert!(record.task.is_none());

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "dns_lookup");
    }
}
