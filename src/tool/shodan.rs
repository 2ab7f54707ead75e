//! Shodan adapter: host and ASN facts for one IP address
//!
//! Requires the `shodan_api_key` credential; the key is injected into the
//! container environment and never logged.

use crate::error::{Result, TalonError};
use crate::runtime::{ContainerRuntime, RunRequest};
use crate::tool::{check_target_type, LaunchOptions, SecretStore, ToolAdapter, ToolCategory};
use serde_json::Value;
use std::sync::Arc;

pub const SHODAN_API_KEY: &str = "shodan_api_key";

pub struct Shodan {
    runtime: Arc<dyn ContainerRuntime>,
    secrets: SecretStore,
}

impl Shodan {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, secrets: SecretStore) -> Self {
        Self { runtime, secrets }
    }
}

impl ToolAdapter for Shodan {
    fn name(&self) -> &'static str {
        "shodan"
    }

    fn description(&self) -> &'static str {
        "Queries the Shodan index for host, network, and ASN facts"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Infrastructure
    }

    fn image(&self) -> &'static str {
        "shodan/cli:latest"
    }

    fn supported_targets(&self) -> &'static [&'static str] {
        &["ip"]
    }

    fn required_secrets(&self) -> &'static [&'static str] {
        &[SHODAN_API_KEY]
    }

    fn version_args(&self) -> Vec<String> {
        vec!["version".to_string()]
    }

    fn runtime(&self) -> &dyn ContainerRuntime {
        self.runtime.as_ref()
    }

    fn launch(&self, target: &str, target_type: &str, opts: &LaunchOptions) -> Result<Value> {
        check_target_type(self, target_type)?;
        // Credential check happens before any runtime call
        let api_key = self.secrets.require(SHODAN_API_KEY)?;

        let mut request = RunRequest::new(
            self.image(),
            vec!["host".to_string(), target.to_string(), "--format".to_string(), "json".to_string()],
            opts.timeout,
        );
        request.env.push(("SHODAN_API_KEY".to_string(), api_key.to_string()));
        request.cancel = opts.cancel.clone();

        let output = self.runtime.run(&request)?;
        if output.exit_code != 0 {
            return Err(TalonError::ToolExecution {
                tool: self.name().to_string(),
                message: format!("exited with code {}", output.exit_code),
            });
        }

        // Host facts arrive on stdout; malformed output is a tool failure,
        // not a silently empty result
        serde_json::from_str(&output.stdout).map_err(|e| TalonError::ToolExecution {
            tool: self.name().to_string(),
            message: format!("malformed host output: {e}"),
        })
    }
}
