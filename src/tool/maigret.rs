//! Maigret adapter: username presence checks across social platforms

use crate::error::{Result, TalonError};
use crate::runtime::{ContainerRuntime, RunRequest};
use crate::tool::{check_target_type, parse_output_artifact, LaunchOptions, ToolAdapter, ToolCategory};
use serde_json::Value;
use std::sync::Arc;

pub struct Maigret {
    runtime: Arc<dyn ContainerRuntime>,
}

impl Maigret {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }
}

impl ToolAdapter for Maigret {
    fn name(&self) -> &'static str {
        "maigret"
    }

    fn description(&self) -> &'static str {
        "Collects accounts registered under a username across social sites"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::SocialMedia
    }

    fn image(&self) -> &'static str {
        "soxoj/maigret:latest"
    }

    fn supported_targets(&self) -> &'static [&'static str] {
        &["username"]
    }

    fn version_args(&self) -> Vec<String> {
        vec!["--version".to_string()]
    }

    fn runtime(&self) -> &dyn ContainerRuntime {
        self.runtime.as_ref()
    }

    fn launch(&self, target: &str, target_type: &str, opts: &LaunchOptions) -> Result<Value> {
        check_target_type(self, target_type)?;

        let workdir = std::env::temp_dir().join(format!("maigret-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&workdir).map_err(|e| TalonError::Io {
            source: e,
            context: format!("Failed to create maigret workdir {:?}", workdir),
        })?;
        let artifact = workdir.join(format!("report_{target}_simple.json"));

        let mut request = RunRequest::new(
            self.image(),
            vec![
                "-J".to_string(),
                "simple".to_string(),
                "-fo".to_string(),
                workdir.display().to_string(),
                target.to_string(),
            ],
            opts.timeout,
        );
        request.cancel = opts.cancel.clone();
        request.output_file = Some(artifact.clone());

        let output = self.runtime.run(&request)?;
        if output.exit_code != 0 {
            let _ = std::fs::remove_dir_all(&workdir);
            return Err(TalonError::ToolExecution {
                tool: self.name().to_string(),
                message: format!("exited with code {}", output.exit_code),
            });
        }

        // The simple report is one object keyed by site name
        let hits: Vec<Value> = parse_output_artifact(&artifact)
            .into_iter()
            .flat_map(|report| match report {
                Value::Object(sites) => sites
                    .into_iter()
                    .map(|(site, data)| {
                        serde_json::json!({
                            "site": site,
                            "username": target,
                            "url": data.get("url_user").cloned().unwrap_or(Value::Null),
                            "status": data.get("status").cloned().unwrap_or(Value::Null),
                        })
                    })
                    .collect(),
                _ => Vec::new(),
            })
            .collect();

        let _ = std::fs::remove_dir_all(&workdir);
        tracing::debug!("maigret found {} profiles for {}", hits.len(), target);
        Ok(Value::Array(hits))
    }
}
