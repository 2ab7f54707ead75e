//! IP → ASN enrichment through the Shodan adapter (positional)

use crate::entity::{Entity, EntityKind};
use crate::error::Result;
use crate::tool::{LaunchOptions, ToolAdapter};
use crate::transform::{CorrelationKind, RawResult, Transform};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct IpToAsn {
    adapter: Arc<dyn ToolAdapter>,
}

impl IpToAsn {
    pub fn new(adapter: Arc<dyn ToolAdapter>) -> Self {
        Self { adapter }
    }
}

/// Pull the numeric AS number out of a host record; Shodan reports it as
/// `"AS15169"`, some mirrors as a bare number.
fn asn_number(host: &Value) -> Option<u64> {
    match host.get("asn") {
        Some(Value::String(s)) => s.trim_start_matches("AS").parse().ok(),
        Some(Value::Number(n)) => n.as_u64(),
        _ => None,
    }
}

impl Transform for IpToAsn {
    fn name(&self) -> &'static str {
        "ip_to_asn"
    }

    fn description(&self) -> &'static str {
        "Resolves each IP address to the autonomous system announcing it"
    }

    fn input_kind(&self) -> EntityKind {
        EntityKind::Ip
    }

    fn output_kind(&self) -> EntityKind {
        EntityKind::Asn
    }

    fn correlation(&self) -> CorrelationKind {
        CorrelationKind::Positional
    }

    fn execute_entity(
        &self,
        index: usize,
        entity: &Entity,
        opts: &LaunchOptions,
    ) -> Result<RawResult> {
        let host = self
            .adapter
            .launch(&entity.identifying_value(), "ip", opts)?;

        // Reshape the host record into the output entity's field names; a
        // record without an AS number fails re-validation downstream and
        // is counted as filtered, not raised.
        let payload = json!({
            "number": asn_number(&host),
            "name": host.get("org").cloned().unwrap_or(Value::Null),
            "country": host.get("country_code").cloned().unwrap_or(Value::Null),
        });

        Ok(RawResult {
            input_index: index,
            payload,
        })
    }
}
