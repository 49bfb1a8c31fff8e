//! Traceroute validation.
//!
//! Devices report hops as flattened keys: `hop_<N>_addr_<field>` for each
//! address seen at hop `N` and `hop_<N>_rtt` for its round-trip time. The
//! constructor decodes these into per-hop maps.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::logging::structured::LogContext;
use crate::measurement::{parse_ip, parse_number};

use super::factory::MeasurementValidator;
use super::outcome::*;
use super::{render_sorted, MAX_RTT_MS};

/// Highest hop index accepted before a route is considered too long.
pub const MAX_HOP_INDEX: u32 = 45;

lazy_static! {
    static ref HOP_ADDR_KEY: Regex = Regex::new(r"^hop_(\d+)_addr_(.+)$").unwrap();
    static ref HOP_RTT_KEY: Regex = Regex::new(r"^hop_(\d+)_rtt$").unwrap();
}

/// Traceroute result decoded into hops.
#[derive(Debug, Clone)]
pub struct Traceroute {
    values: BTreeMap<String, String>,
    hops: BTreeMap<u32, BTreeMap<String, String>>,
    rtts: BTreeMap<u32, String>,
}

impl Traceroute {
    pub fn new(_parameters: &BTreeMap<String, String>, values: &BTreeMap<String, String>) -> Self {
        let mut hops: BTreeMap<u32, BTreeMap<String, String>> = BTreeMap::new();
        let mut rtts = BTreeMap::new();

        for (key, value) in values {
            if let Some(caps) = HOP_ADDR_KEY.captures(key) {
                if let Ok(index) = caps[1].parse::<u32>() {
                    hops.entry(index)
                        .or_default()
                        .insert(caps[2].to_string(), value.clone());
                }
            } else if let Some(caps) = HOP_RTT_KEY.captures(key) {
                if let Ok(index) = caps[1].parse::<u32>() {
                    rtts.entry(index).or_insert_with(|| value.clone());
                }
            }
        }

        Self {
            values: values.clone(),
            hops,
            rtts,
        }
    }

    /// Number of hops that reported at least one address.
    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    /// Addresses seen at one hop, keyed by field name.
    pub fn hop_addresses(&self, index: u32) -> Option<&BTreeMap<String, String>> {
        self.hops.get(&index)
    }
}

impl MeasurementValidator for Traceroute {
    fn validate(&self, ctx: &LogContext) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::new();

        for (position, (&index, addresses)) in self.hops.iter().enumerate() {
            if index as usize != position {
                outcome.fail(MISSING_HOP);
            }

            if index > MAX_HOP_INDEX {
                outcome.fail(TOO_MANY_HOPS);
            }

            for address in addresses.values() {
                if parse_ip(address).is_none() {
                    outcome.fail(ADDRESS_NOT_VALID);
                }
            }

            match self.rtts.get(&index) {
                Some(raw) => {
                    let in_range = parse_number(raw)
                        .map(|rtt| (0.0..=MAX_RTT_MS).contains(&rtt))
                        .unwrap_or(false);
                    if !in_range {
                        outcome.fail(LATENCY_NOT_VALID);
                    }
                }
                None => {
                    log::debug!("{} HOP_RTT_MISSING hop={}", ctx, index);
                    outcome.fail(missing_field("rtt"));
                }
            }
        }

        outcome
    }

    fn render_detail(&self) -> String {
        render_sorted(&self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(hops: impl IntoIterator<Item = (u32, &'static str, &'static str)>) -> Traceroute {
        let mut values = BTreeMap::new();
        for (index, addr, rtt) in hops {
            values.insert(format!("hop_{}_addr_1", index), addr.to_string());
            values.insert(format!("hop_{}_rtt", index), rtt.to_string());
        }
        values.insert("num_hops".to_string(), "0".to_string());
        Traceroute::new(&BTreeMap::new(), &values)
    }

    fn validate(route: &Traceroute) -> ValidationOutcome {
        route.validate(&LogContext::new("test-run"))
    }

    #[test]
    fn test_decodes_flattened_keys() {
        let mut values = BTreeMap::new();
        values.insert("hop_0_addr_1".to_string(), "\"10.0.0.1\"".to_string());
        values.insert("hop_0_addr_2".to_string(), "\"10.0.0.2\"".to_string());
        values.insert("hop_0_rtt".to_string(), "\"1.5\"".to_string());
        values.insert("hop_12_addr_1".to_string(), "8.8.8.8".to_string());
        values.insert("num_hops".to_string(), "13".to_string());

        let route = Traceroute::new(&BTreeMap::new(), &values);
        assert_eq!(route.hop_count(), 2);
        assert_eq!(route.hop_addresses(0).map(|a| a.len()), Some(2));
        assert_eq!(
            route.hop_addresses(12).and_then(|a| a.get("1")).map(String::as_str),
            Some("8.8.8.8")
        );
    }

    #[test]
    fn test_contiguous_route_is_valid() {
        let outcome = validate(&route((0..10).map(|i| (i, "\"192.168.1.1\"", "12.5"))));
        assert!(outcome.is_valid(), "{:?}", outcome.error_types());
    }

    #[test]
    fn test_gap_in_hops() {
        let outcome = validate(&route([
            (0, "10.0.0.1", "1"),
            (1, "10.0.0.2", "2"),
            (3, "10.0.0.4", "4"),
        ]));
        assert_eq!(outcome.error_types(), &[MISSING_HOP]);
    }

    #[test]
    fn test_hop_index_limit() {
        let at_limit = validate(&route((0..=MAX_HOP_INDEX).map(|i| (i, "10.0.0.1", "5"))));
        assert!(at_limit.is_valid());

        let over_limit =
            validate(&route((0..=MAX_HOP_INDEX + 1).map(|i| (i, "10.0.0.1", "5"))));
        assert_eq!(over_limit.error_types(), &[TOO_MANY_HOPS]);
    }

    #[test]
    fn test_errors_within_one_hop_accumulate() {
        let outcome = validate(&route([(0, "*", "3500")]));
        assert_eq!(outcome.error_types(), &[ADDRESS_NOT_VALID, LATENCY_NOT_VALID]);
    }

    #[test]
    fn test_unparseable_or_missing_rtt() {
        let mut values = BTreeMap::new();
        values.insert("hop_0_addr_1".to_string(), "10.0.0.1".to_string());
        values.insert("hop_0_rtt".to_string(), "timeout".to_string());
        values.insert("hop_1_addr_1".to_string(), "10.0.0.2".to_string());

        let outcome = validate(&Traceroute::new(&BTreeMap::new(), &values));
        assert_eq!(outcome.error_types(), &[LATENCY_NOT_VALID, "missing_field_rtt"]);
    }

    #[test]
    fn test_render_detail_is_key_sorted() {
        let detail = route([(0, "10.0.0.1", "1")]).render_detail();
        assert_eq!(detail, "hop_0_addr_1: 10.0.0.1\nhop_0_rtt: 1\nnum_hops: 0\n");
    }
}
