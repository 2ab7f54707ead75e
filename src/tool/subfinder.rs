//! Subfinder adapter: passive subdomain enumeration for one domain

use crate::error::{Result, TalonError};
use crate::runtime::{ContainerRuntime, RunRequest};
use crate::tool::{check_target_type, parse_output_artifact, LaunchOptions, ToolAdapter, ToolCategory};
use serde_json::Value;
use std::sync::Arc;

pub struct Subfinder {
    runtime: Arc<dyn ContainerRuntime>,
}

impl Subfinder {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }
}

impl ToolAdapter for Subfinder {
    fn name(&self) -> &'static str {
        "subfinder"
    }

    fn description(&self) -> &'static str {
        "Passive subdomain enumeration using public sources"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Dns
    }

    fn image(&self) -> &'static str {
        "projectdiscovery/subfinder:latest"
    }

    fn supported_targets(&self) -> &'static [&'static str] {
        &["domain"]
    }

    fn version_args(&self) -> Vec<String> {
        vec!["-version".to_string()]
    }

    fn runtime(&self) -> &dyn ContainerRuntime {
        self.runtime.as_ref()
    }

    fn launch(&self, target: &str, target_type: &str, opts: &LaunchOptions) -> Result<Value> {
        check_target_type(self, target_type)?;

        // One artifact file per launch; concurrent launches never collide
        let artifact = std::env::temp_dir().join(format!("subfinder-{}.jsonl", uuid::Uuid::new_v4()));

        let mut request = RunRequest::new(
            self.image(),
            vec![
                "-d".to_string(),
                target.to_string(),
                "-silent".to_string(),
                "-oJ".to_string(),
                "-o".to_string(),
                artifact.display().to_string(),
            ],
            opts.timeout,
        );
        request.cancel = opts.cancel.clone();
        request.output_file = Some(artifact.clone());

        let output = self.runtime.run(&request)?;
        if output.exit_code != 0 {
            let _ = std::fs::remove_file(&artifact);
            return Err(TalonError::ToolExecution {
                tool: self.name().to_string(),
                message: format!("exited with code {}", output.exit_code),
            });
        }

        let items = parse_output_artifact(&artifact);
        let _ = std::fs::remove_file(&artifact);
        tracing::debug!("subfinder found {} hosts for {}", items.len(), target);
        Ok(Value::Array(items))
    }
}
