//! Domain → subdomains enumeration through the subfinder adapter (expansion)

use crate::entity::{Entity, EntityKind};
use crate::error::Result;
use crate::tool::{LaunchOptions, ToolAdapter};
use crate::transform::{CorrelationKind, RawResult, Transform};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct DomainSubdomains {
    adapter: Arc<dyn ToolAdapter>,
}

impl DomainSubdomains {
    pub fn new(adapter: Arc<dyn ToolAdapter>) -> Self {
        Self { adapter }
    }
}

impl Transform for DomainSubdomains {
    fn name(&self) -> &'static str {
        "domain_subdomains"
    }

    fn description(&self) -> &'static str {
        "Enumerates subdomains of each domain from passive sources"
    }

    fn input_kind(&self) -> EntityKind {
        EntityKind::Domain
    }

    fn output_kind(&self) -> EntityKind {
        EntityKind::Domain
    }

    fn correlation(&self) -> CorrelationKind {
        CorrelationKind::Expansion
    }

    fn execute_entity(
        &self,
        index: usize,
        entity: &Entity,
        opts: &LaunchOptions,
    ) -> Result<RawResult> {
        let found = self
            .adapter
            .launch(&entity.identifying_value(), "domain", opts)?;

        // subfinder emits JSONL records with a `host` key; reshape to the
        // output entity's identifying field
        let hosts: Vec<Value> = match found {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| item.get("host").cloned())
                .map(|host| json!({ "name": host }))
                .collect(),
            _ => Vec::new(),
        };

        Ok(RawResult {
            input_index: index,
            payload: Value::Array(hosts),
        })
    }
}
