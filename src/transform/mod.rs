//! Transforms: pluggable enrichment steps with a
//! preprocess → execute → postprocess lifecycle
//!
//! A transform declares one input and one output entity type, normalizes
//! arbitrary raw input into typed entities, delegates execution to tool
//! adapters, and correlates raw results back into validated output
//! entities. Transforms are stateless; the `(sketch_id, scan_id)` context
//! is attribution only.

pub mod correlate;

mod domain_subdomains;
mod ip_to_asn;
mod username_profiles;

pub use correlate::Correlated;
pub use domain_subdomains::DomainSubdomains;
pub use ip_to_asn::IpToAsn;
pub use username_profiles::UsernameProfiles;

use crate::entity::{coerce_all, Entity, EntityKind, FieldDescriptor, RawInput};
use crate::error::{Result, TalonError};
use crate::events::{EventSink, ScanEvent, ScanStatus};
use crate::tool::LaunchOptions;
use ahash::AHashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Raw output of one tool dispatch, keyed back to the input entity that
/// produced it. The key survives out-of-order concurrent completion.
#[derive(Debug, Clone)]
pub struct RawResult {
    pub input_index: usize,
    pub payload: Value,
}

/// How postprocess associates raw results with inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationKind {
    /// One result per input, in association order
    Positional,
    /// One input yields a variable-length collection of results
    Expansion,
}

/// Attribution context for one transform invocation
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub sketch_id: String,
    pub scan_id: String,
}

/// One pluggable enrichment step
pub trait Transform: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_kind(&self) -> EntityKind;
    fn output_kind(&self) -> EntityKind;
    fn correlation(&self) -> CorrelationKind;

    /// Normalize a raw, loosely-typed collection into input entities.
    ///
    /// Pure: invalid elements are silently dropped, relative order is
    /// preserved, no duplicates are introduced.
    fn preprocess(&self, raw: &[RawInput]) -> Vec<Entity> {
        coerce_all(raw, self.input_kind())
    }

    /// Dispatch one input entity to the underlying tool(s)
    fn execute_entity(&self, index: usize, entity: &Entity, opts: &LaunchOptions)
        -> Result<RawResult>;

    /// Dispatch the whole preprocessed collection sequentially. The run
    /// driver uses bounded concurrent dispatch instead; this is the
    /// fallback for direct callers.
    fn execute(&self, entities: &[Entity], opts: &LaunchOptions) -> Result<Vec<RawResult>> {
        entities
            .iter()
            .enumerate()
            .map(|(i, e)| self.execute_entity(i, e, opts))
            .collect()
    }

    /// Correlate raw results against the original inputs
    fn postprocess(&self, results: &[RawResult], inputs: &[Entity]) -> Result<Correlated> {
        match self.correlation() {
            CorrelationKind::Positional => {
                correlate::positional(results, inputs, self.output_kind())
            }
            CorrelationKind::Expansion => {
                correlate::expansion(results, inputs, self.output_kind())
            }
        }
    }

    /// Input contract, computable without any instance or prior call
    fn input_schema(&self) -> Vec<FieldDescriptor> {
        self.input_kind().schema()
    }

    /// Output contract, computable without any instance or prior call
    fn output_schema(&self) -> Vec<FieldDescriptor> {
        self.output_kind().schema()
    }
}

/// Lifecycle state of one transform invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Created,
    Preprocessed,
    Executed,
    Postprocessed,
}

/// Per-invocation state machine: `Created → Preprocessed → Executed →
/// Postprocessed`, no state skipped. Owns no entities; everything is
/// returned to the caller.
pub struct TransformRun {
    transform: Arc<dyn Transform>,
    ctx: ScanContext,
    state: RunState,
    inputs: Vec<Entity>,
    results: Vec<RawResult>,
}

impl TransformRun {
    pub fn new(transform: Arc<dyn Transform>, ctx: ScanContext) -> Self {
        Self {
            transform,
            ctx,
            state: RunState::Created,
            inputs: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn context(&self) -> &ScanContext {
        &self.ctx
    }

    fn expect_state(&self, expected: RunState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(TalonError::InvalidArgument(format!(
                "transform lifecycle violation: expected {:?}, was {:?}",
                expected, self.state
            )))
        }
    }

    /// Normalize raw input; returns the number of entities kept
    pub fn preprocess(&mut self, raw: &[RawInput]) -> Result<usize> {
        self.expect_state(RunState::Created)?;
        self.inputs = self.transform.preprocess(raw);
        self.state = RunState::Preprocessed;
        Ok(self.inputs.len())
    }

    pub fn inputs(&self) -> &[Entity] {
        &self.inputs
    }

    /// Dispatch the preprocessed collection concurrently, bounded by
    /// `workers` permits.
    ///
    /// Cancellation terminates in-flight launches; results that completed
    /// before the cancel are preserved. Any other launch error fails the
    /// whole execute. Returns whether the batch was cut short by a cancel.
    pub async fn execute(&mut self, opts: &LaunchOptions, workers: usize) -> Result<bool> {
        self.expect_state(RunState::Preprocessed)?;

        // Empty preprocessed input is a legitimate terminal case
        if self.inputs.is_empty() {
            self.state = RunState::Executed;
            return Ok(false);
        }

        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let mut handles = Vec::with_capacity(self.inputs.len());

        for (index, entity) in self.inputs.iter().cloned().enumerate() {
            let transform = Arc::clone(&self.transform);
            let opts = opts.clone();
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                tokio::task::spawn_blocking(move || {
                    transform.execute_entity(index, &entity, &opts)
                })
                .await
                .map_err(|e| TalonError::Other(anyhow::anyhow!("dispatch task panicked: {e}")))?
            }));
        }

        let mut completed: Vec<RawResult> = Vec::with_capacity(handles.len());
        let mut cancelled = false;
        let mut failure: Option<TalonError> = None;

        for handle in handles {
            match handle.await {
                Ok(Ok(result)) => completed.push(result),
                Ok(Err(TalonError::Cancelled)) => cancelled = true,
                Ok(Err(e)) => failure = failure.or(Some(e)),
                Err(e) => {
                    failure =
                        failure.or(Some(TalonError::Other(anyhow::anyhow!("join error: {e}"))))
                }
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        if cancelled {
            // Keep only inputs whose results completed; reindex so the
            // positional association stays intact for the survivors.
            completed.sort_by_key(|r| r.input_index);
            let kept_inputs: Vec<Entity> = completed
                .iter()
                .map(|r| self.inputs[r.input_index].clone())
                .collect();
            for (new_index, result) in completed.iter_mut().enumerate() {
                result.input_index = new_index;
            }
            self.inputs = kept_inputs;
        }

        self.results = completed;
        self.state = RunState::Executed;
        Ok(cancelled)
    }

    /// Correlate results into validated output entities
    pub fn postprocess(&mut self) -> Result<Correlated> {
        self.expect_state(RunState::Executed)?;
        let correlated = if self.inputs.is_empty() {
            Correlated::default()
        } else {
            self.transform.postprocess(&self.results, &self.inputs)?
        };
        self.state = RunState::Postprocessed;
        Ok(correlated)
    }
}

/// Final product of one full lifecycle run
#[derive(Debug, Clone, Default)]
pub struct TransformOutcome {
    pub entities: Vec<Entity>,
    /// Items dropped during postprocess re-validation/deduplication
    pub filtered: usize,
    /// Whether the batch was cut short by a cancellation
    pub cancelled: bool,
}

/// Task-queue entrypoint: drive the full lifecycle for one
/// `(sketch_id, scan_id, raw_input)` unit, emitting progress events.
/// The caller owns persistence of the returned entities.
pub async fn run_transform(
    transform: Arc<dyn Transform>,
    ctx: ScanContext,
    raw: Vec<RawInput>,
    sink: Arc<dyn EventSink>,
    workers: usize,
    opts: LaunchOptions,
) -> Result<TransformOutcome> {
    let name = transform.name();
    sink.append(ScanEvent::status(&ctx, ScanStatus::Pending, name));

    let mut run = TransformRun::new(transform, ctx.clone());
    let kept = run.preprocess(&raw)?;
    tracing::debug!(
        "transform {} preprocessed {}/{} raw inputs",
        name,
        kept,
        raw.len()
    );

    sink.append(ScanEvent::status(&ctx, ScanStatus::Running, name));

    let outcome = async {
        let cancelled = run.execute(&opts, workers).await?;
        let correlated = run.postprocess()?;
        Ok::<TransformOutcome, TalonError>(TransformOutcome {
            entities: correlated.entities,
            filtered: correlated.filtered,
            cancelled,
        })
    }
    .await;

    match outcome {
        Ok(outcome) => {
            if !outcome.entities.is_empty() {
                sink.append(ScanEvent::graph_append(&ctx, name, &outcome));
            }
            sink.append(ScanEvent::status(&ctx, ScanStatus::Completed, name));
            Ok(outcome)
        }
        Err(e) => {
            sink.append(ScanEvent::failed(&ctx, name, &e));
            Err(e)
        }
    }
}

/// Name-keyed lookup of available transforms
#[derive(Default)]
pub struct TransformRegistry {
    transforms: AHashMap<&'static str, Arc<dyn Transform>>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, transform: Arc<dyn Transform>) {
        self.transforms.insert(transform.name(), transform);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Transform>> {
        self.transforms.get(name).cloned()
    }

    /// Registered transform names, sorted for stable listings
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.transforms.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use serde_json::json;

    /// Transform double that echoes each input into one output payload
    struct EchoAsn;

    impl Transform for EchoAsn {
        fn name(&self) -> &'static str {
            "echo_asn"
        }
        fn description(&self) -> &'static str {
            "test double"
        }
        fn input_kind(&self) -> EntityKind {
            EntityKind::Asn
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
            _opts: &LaunchOptions,
        ) -> Result<RawResult> {
            Ok(RawResult {
                input_index: index,
                payload: json!({"number": entity.identifying_value().parse::<u32>().unwrap()}),
            })
        }
    }

    #[test]
    fn test_lifecycle_states_are_not_skippable() {
        let ctx = ScanContext {
            sketch_id: "sk1".to_string(),
            scan_id: "sc1".to_string(),
        };
        let mut run = TransformRun::new(Arc::new(EchoAsn), ctx);
        assert_eq!(run.state(), RunState::Created);

        // Postprocess before preprocess/execute is a lifecycle violation
        assert!(run.postprocess().is_err());

        run.preprocess(&[RawInput::from(15169u64)]).unwrap();
        assert_eq!(run.state(), RunState::Preprocessed);
        assert!(run.postprocess().is_err());
    }

    #[tokio::test]
    async fn test_empty_preprocessed_input_yields_empty_outcome() {
        let ctx = ScanContext {
            sketch_id: "sk1".to_string(),
            scan_id: "sc1".to_string(),
        };
        let sink = Arc::new(MemorySink::default());
        let raw: Vec<RawInput> = vec!["not-a-number".into(), json!({"bogus": 1}).into()];

        let outcome = run_transform(
            Arc::new(EchoAsn),
            ctx,
            raw,
            sink.clone(),
            4,
            LaunchOptions::default(),
        )
        .await
        .unwrap();

        assert!(outcome.entities.is_empty());
        assert_eq!(outcome.filtered, 0);
        assert!(!outcome.cancelled);

        let statuses: Vec<ScanStatus> = sink.events().iter().map(|e| e.status).collect();
        assert!(statuses.contains(&ScanStatus::Completed));
        assert!(!statuses.contains(&ScanStatus::GraphAppend));
    }

    #[tokio::test]
    async fn test_full_lifecycle_emits_graph_append() {
        let ctx = ScanContext {
            sketch_id: "sk1".to_string(),
            scan_id: "sc1".to_string(),
        };
        let sink = Arc::new(MemorySink::default());
        let raw: Vec<RawInput> = vec![
            RawInput::from(15169u64),
            "garbage".into(),
            json!({"number": 13335}).into(),
        ];

        let outcome = run_transform(
            Arc::new(EchoAsn),
            ctx,
            raw,
            sink.clone(),
            2,
            LaunchOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.entities.len(), 2);
        let statuses: Vec<ScanStatus> = sink.events().iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                ScanStatus::Pending,
                ScanStatus::Running,
                ScanStatus::GraphAppend,
                ScanStatus::Completed
            ]
        );
    }

    #[test]
    fn test_registry_lookup_and_listing() {
        let mut registry = TransformRegistry::new();
        registry.register(Arc::new(EchoAsn));
        assert!(registry.get("echo_asn").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["echo_asn"]);
    }

    #[test]
    fn test_schemas_available_without_lifecycle() {
        let transform = EchoAsn;
        let input = transform.input_schema();
        let output = transform.output_schema();
        assert_eq!(input[0].name, "number");
        assert!(input[0].required);
        assert_eq!(output[0].name, "number");
    }
}
