//! Username → social profiles through the maigret adapter (expansion)

use crate::entity::{Entity, EntityKind};
use crate::error::Result;
use crate::tool::{LaunchOptions, ToolAdapter};
use crate::transform::{CorrelationKind, RawResult, Transform};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct UsernameProfiles {
    adapter: Arc<dyn ToolAdapter>,
}

impl UsernameProfiles {
    pub fn new(adapter: Arc<dyn ToolAdapter>) -> Self {
        Self { adapter }
    }
}

impl Transform for UsernameProfiles {
    fn name(&self) -> &'static str {
        "username_profiles"
    }

    fn description(&self) -> &'static str {
        "Finds social profiles registered under each alias"
    }

    fn input_kind(&self) -> EntityKind {
        EntityKind::Alias
    }

    fn output_kind(&self) -> EntityKind {
        EntityKind::SocialProfile
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
        let hits = self
            .adapter
            .launch(&entity.identifying_value(), "username", opts)?;

        // Keep only claimed accounts with a resolvable profile URL
        let profiles: Vec<Value> = match hits {
            Value::Array(items) => items
                .into_iter()
                .filter(|item| item.get("url").map(|u| u.is_string()).unwrap_or(false))
                .map(|item| {
                    json!({
                        "username": item.get("username").cloned().unwrap_or(Value::Null),
                        "platform": item.get("site").cloned().unwrap_or(Value::Null),
                        "url": item.get("url").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect(),
            _ => Vec::new(),
        };

        Ok(RawResult {
            input_index: index,
            payload: Value::Array(profiles),
        })
    }
}
