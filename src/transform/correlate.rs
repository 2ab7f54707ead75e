//! Correlation engine: merges raw tool output back into validated entities
//!
//! Two strategies, chosen by the transform's declared kind:
//! - Positional: result *i* is the enrichment product of input *i*
//! - Expansion: one input yields a variable-length collection of results
//!
//! Both are lossless in accounting terms: every raw item that does not
//! survive re-validation (or is a duplicate of an already-emitted entity)
//! increments the `filtered` count so the caller can observe the drop.

use crate::entity::{Entity, EntityKind};
use crate::error::{Result, TalonError};
use crate::transform::RawResult;
use ahash::AHashSet;
use serde_json::{Map, Value};

/// Outcome of one postprocess call
#[derive(Debug, Clone, Default)]
pub struct Correlated {
    /// Validated, typed output entities
    pub entities: Vec<Entity>,
    /// Raw items dropped during re-validation or deduplication
    pub filtered: usize,
}

/// Build one output entity from a raw payload object, stamping the
/// back-reference to the originating input's identifying value
fn build_output(kind: EntityKind, payload: &Value, origin: &Entity) -> Option<Entity> {
    let mut map: Map<String, Value> = match payload {
        Value::Object(m) => m.clone(),
        _ => return None,
    };
    map.insert(
        "source".to_string(),
        Value::String(origin.identifying_value()),
    );
    Entity::from_map(kind, &map)
}

/// Positional correlation: requires one result per input, in association
/// order. No output entity is fabricated from an unmatched result.
pub fn positional(
    results: &[RawResult],
    inputs: &[Entity],
    output_kind: EntityKind,
) -> Result<Correlated> {
    if results.len() != inputs.len() {
        return Err(TalonError::InvalidArgument(format!(
            "positional correlation requires one result per input (got {} results for {} inputs)",
            results.len(),
            inputs.len()
        )));
    }

    // Every input index must appear exactly once
    let mut by_index: Vec<Option<&RawResult>> = vec![None; inputs.len()];
    for result in results {
        match by_index.get_mut(result.input_index) {
            Some(slot) if slot.is_none() => *slot = Some(result),
            _ => {
                return Err(TalonError::InvalidArgument(format!(
                    "duplicate or out-of-range result index {}",
                    result.input_index
                )))
            }
        }
    }

    let mut correlated = Correlated::default();
    for (input, slot) in inputs.iter().zip(by_index) {
        let result = slot.expect("every slot filled by the index check above");
        match build_output(output_kind, &result.payload, input) {
            Some(entity) => correlated.entities.push(entity),
            None => correlated.filtered += 1,
        }
    }
    Ok(correlated)
}

/// Expansion correlation: each element of a result's payload collection
/// becomes one output entity tagged with its originating input.
///
/// Dedup is on full entity equality, not the identifying value alone: one
/// username legitimately expands into many profiles that share it but
/// differ in platform. Identity-level merging belongs to the graph owner.
pub fn expansion(
    results: &[RawResult],
    inputs: &[Entity],
    output_kind: EntityKind,
) -> Result<Correlated> {
    let mut correlated = Correlated::default();
    let mut seen: AHashSet<String> = AHashSet::new();

    for result in results {
        let Some(origin) = inputs.get(result.input_index) else {
            return Err(TalonError::InvalidArgument(format!(
                "result references input index {} but only {} inputs exist",
                result.input_index,
                inputs.len()
            )));
        };

        let items: Vec<&Value> = match &result.payload {
            Value::Array(items) => items.iter().collect(),
            single @ Value::Object(_) => vec![single],
            _ => {
                correlated.filtered += 1;
                continue;
            }
        };

        for item in items {
            match build_output(output_kind, item, origin) {
                Some(entity) => {
                    if seen.insert(format!("{entity:?}")) {
                        correlated.entities.push(entity);
                    } else {
                        correlated.filtered += 1;
                    }
                }
                None => correlated.filtered += 1,
            }
        }
    }
    Ok(correlated)
}
