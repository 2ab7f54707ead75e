//! Tool adapters: one wrapper per external reconnaissance capability
//!
//! An adapter exposes identity metadata (name, description, category,
//! image), an idempotent install/version lifecycle, and a synchronous
//! `launch` against one target. Adapters hold no per-launch mutable state;
//! one instance is shared across concurrent launches.

mod maigret;
mod shodan;
mod subfinder;

pub use maigret::Maigret;
pub use shodan::Shodan;
pub use subfinder::Subfinder;

use crate::error::{Result, TalonError};
use crate::runtime::{CancelToken, ContainerRuntime, RunRequest};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

/// Coarse capability category, surfaced to the flow editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCategory {
    Dns,
    SocialMedia,
    Infrastructure,
}

impl ToolCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::Dns => "dns",
            ToolCategory::SocialMedia => "social_media",
            ToolCategory::Infrastructure => "infrastructure",
        }
    }
}

/// Read-only credential mapping supplied by the collaborator.
///
/// Secret values are never logged; the Debug impl redacts them.
#[derive(Clone, Default)]
pub struct SecretStore {
    secrets: HashMap<String, String>,
}

impl SecretStore {
    pub fn new(secrets: HashMap<String, String>) -> Self {
        Self { secrets }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.secrets.get(key).map(String::as_str)
    }

    /// Fetch a required credential, failing with a `Configuration` error
    /// naming the missing key
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| TalonError::Configuration {
            key: key.to_string(),
        })
    }
}

impl std::fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.secrets.keys().collect();
        keys.sort();
        f.debug_struct("SecretStore").field("keys", &keys).finish()
    }
}

/// Per-launch options supplied by the transform driver
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub timeout: Duration,
    pub cancel: CancelToken,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            cancel: CancelToken::new(),
        }
    }
}

/// One external reconnaissance capability.
///
/// Identity methods are pure. `install` and `version` are idempotent
/// checks against the local environment. `launch` runs the tool once per
/// call; concurrent launches must not interfere.
pub trait ToolAdapter: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn category(&self) -> ToolCategory;
    /// Container image reference backing this tool
    fn image(&self) -> &'static str;

    /// Target types this adapter accepts, e.g. `["domain"]`
    fn supported_targets(&self) -> &'static [&'static str];

    /// Credential keys that must be present before launch
    fn required_secrets(&self) -> &'static [&'static str] {
        &[]
    }

    /// Arguments producing the tool's version banner
    fn version_args(&self) -> Vec<String>;

    fn runtime(&self) -> &dyn ContainerRuntime;

    fn is_installed(&self) -> bool {
        self.runtime().image_present(self.image()).unwrap_or(false)
    }

    /// Ensure the tool's image is present. No-op when already installed;
    /// concurrent first calls for the same tool are serialized.
    fn install(&self) -> Result<()> {
        let guard = install_lock(self.name());
        let _held = guard.lock().unwrap();
        if self.is_installed() {
            return Ok(());
        }
        self.runtime()
            .pull(self.image())
            .map_err(|e| match e {
                TalonError::ToolInstallFailure { .. } => e,
                other => TalonError::ToolInstallFailure {
                    tool: self.name().to_string(),
                    reason: other.to_string(),
                },
            })
    }

    /// Tool version, normalized to `v<digits>(.<digits>)*`
    fn version(&self) -> Result<String> {
        if !self.is_installed() {
            return Err(TalonError::ToolUnavailable {
                tool: self.name().to_string(),
            });
        }
        let request = RunRequest::new(self.image(), self.version_args(), Duration::from_secs(30));
        let output = self.runtime().run(&request)?;
        parse_version(&output.stdout).ok_or_else(|| TalonError::ToolExecution {
            tool: self.name().to_string(),
            message: "no version token in tool output".to_string(),
        })
    }

    /// Run the tool against one target, returning its raw (untyped) result.
    ///
    /// Implementations must validate `target_type` against
    /// `supported_targets` and required credentials against the secret
    /// store before touching the runtime.
    fn launch(&self, target: &str, target_type: &str, opts: &LaunchOptions) -> Result<Value>;
}

/// Reject an unsupported target type, naming the invalid value
pub fn check_target_type(adapter: &dyn ToolAdapter, target_type: &str) -> Result<()> {
    if adapter.supported_targets().contains(&target_type) {
        Ok(())
    } else {
        Err(TalonError::InvalidArgument(format!(
            "target type '{}' is not supported by {} (expected one of {:?})",
            target_type,
            adapter.name(),
            adapter.supported_targets()
        )))
    }
}

/// Extract and normalize a version token from a tool banner
pub fn parse_version(banner: &str) -> Option<String> {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = RE.get_or_init(|| regex::Regex::new(r"v?(\d+(?:\.\d+)*)").unwrap());
    re.captures(banner)
        .map(|caps| format!("v{}", &caps[1]))
}

/// Parse a tool's output artifact into a collection of JSON values.
///
/// Missing, unreadable, or garbled artifacts degrade to an empty
/// collection; partial tool output must not abort the whole scan. Accepts
/// a JSON array, a single JSON object, or JSON-lines.
pub fn parse_output_artifact(path: &Path) -> Vec<Value> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Output artifact {:?} unreadable: {}", path, e);
            return Vec::new();
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Array(items)) => items,
        Ok(v @ Value::Object(_)) => vec![v],
        Ok(_) => Vec::new(),
        // Fall back to JSON-lines; skip lines that do not parse
        Err(_) => content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect(),
    }
}

/// Process-wide lock table serializing install per tool name
fn install_lock(tool: &str) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<String, Arc<Mutex<()>>>>> = OnceLock::new();
    let locks = LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut table = locks.lock().unwrap();
    table
        .entry(tool.to_string())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_parse_version_normalizes() {
        assert_eq!(parse_version("subfinder v2.6.3"), Some("v2.6.3".to_string()));
        assert_eq!(parse_version("2.6"), Some("v2.6".to_string()));
        assert_eq!(parse_version("version 10"), Some("v10".to_string()));
        assert_eq!(parse_version("no digits here"), None);
    }

    #[test]
    fn test_secret_store_redacts_debug() {
        let mut secrets = HashMap::new();
        secrets.insert("shodan_api_key".to_string(), "hunter2".to_string());
        let store = SecretStore::new(secrets);
        let rendered = format!("{:?}", store);
        assert!(rendered.contains("shodan_api_key"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_secret_store_require_names_missing_key() {
        let store = SecretStore::default();
        let err = store.require("shodan_api_key").unwrap_err();
        assert!(err.to_string().contains("shodan_api_key"));
    }

    #[test]
    fn test_missing_artifact_yields_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("does-not-exist.json");
        assert!(parse_output_artifact(&path).is_empty());
    }

    #[test]
    fn test_garbled_artifact_yields_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbled.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"{{{ not json at all").unwrap();
        assert!(parse_output_artifact(&path).is_empty());
    }

    #[test]
    fn test_jsonl_artifact_parses_per_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.jsonl");
        std::fs::write(&path, "{\"host\":\"a.io\"}\nnot json\n{\"host\":\"b.io\"}\n").unwrap();
        let items = parse_output_artifact(&path);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_array_artifact_parses() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, "[{\"a\":1},{\"a\":2}]").unwrap();
        assert_eq!(parse_output_artifact(&path).len(), 2);
    }

    #[test]
    fn test_install_lock_is_shared_per_name() {
        let a = install_lock("same-tool");
        let b = install_lock("same-tool");
        assert!(Arc::ptr_eq(&a, &b));
        let c = install_lock("other-tool");
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
