//! Container/process runtime collaborator seam
//!
//! Tool adapters never spawn processes themselves; they depend on the
//! `ContainerRuntime` contract to pull images and run bounded-lifetime
//! containers with captured stdout and an optional output artifact.

use crate::error::{Result, TalonError};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Clonable cancellation flag shared between a scan and its in-flight
/// launches. Cancelling terminates the underlying processes; results
/// already completed by other batch members are preserved by the caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One bounded container/process invocation
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Image reference, e.g. `projectdiscovery/subfinder:latest`
    pub image: String,
    /// Arguments passed to the image entrypoint
    pub args: Vec<String>,
    /// Environment variables injected into the container
    pub env: Vec<(String, String)>,
    /// Hard deadline; the process is killed when exceeded
    pub timeout: Duration,
    /// Cooperative cancellation; the process is killed when set
    pub cancel: CancelToken,
    /// Host path the tool is expected to write its artifact to, if any
    pub output_file: Option<PathBuf>,
}

impl RunRequest {
    pub fn new(image: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            image: image.into(),
            args,
            env: Vec::new(),
            timeout,
            cancel: CancelToken::new(),
            output_file: None,
        }
    }
}

/// Captured result of one run
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub exit_code: i32,
    pub stdout: String,
    /// Echo of the requested output artifact path; may not exist on disk
    pub output_path: Option<PathBuf>,
}

/// Contract the core depends on for pulling images and running tools.
///
/// Implementations must be safe for concurrent calls; each `run` owns its
/// process exclusively.
pub trait ContainerRuntime: Send + Sync {
    /// Whether the image is present in the local environment
    fn image_present(&self, image: &str) -> Result<bool>;

    /// Pull the image; no-op if already present
    fn pull(&self, image: &str) -> Result<()>;

    /// Run one bounded invocation and capture its output
    fn run(&self, request: &RunRequest) -> Result<RunOutput>;
}

/// Runtime backed by the local `docker` (or `podman`) CLI
pub struct DockerRuntime {
    engine: String,
    pull_timeout: Duration,
}

/// Poll interval while waiting on a child process
const POLL_INTERVAL: Duration = Duration::from_millis(50);

impl DockerRuntime {
    pub fn new(engine: impl Into<String>, pull_timeout: Duration) -> Self {
        Self {
            engine: engine.into(),
            pull_timeout,
        }
    }

    /// Wait for a child with a deadline and a cancel token, killing it on
    /// either. Returns the exit code, or the mapped error after cleanup.
    ///
    /// Stdout is drained on a dedicated thread while the child runs; a
    /// tool writing more than the OS pipe buffer would otherwise block on
    /// a full pipe and get killed at the deadline despite being healthy.
    fn wait_bounded(
        &self,
        mut child: std::process::Child,
        image: &str,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<(i32, String)> {
        use std::io::Read;

        let reader = child.stdout.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf);
                buf
            })
        });

        enum Waited {
            Exited(i32),
            Cancelled,
            TimedOut,
        }

        let deadline = Instant::now() + timeout;
        let waited = loop {
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                break Waited::Cancelled;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                break Waited::TimedOut;
            }
            match child.try_wait().map_err(|e| TalonError::Io {
                source: e,
                context: format!("Failed to wait on {image}"),
            })? {
                Some(status) => break Waited::Exited(status.code().unwrap_or(-1)),
                None => std::thread::sleep(POLL_INTERVAL),
            }
        };

        // The pipe closes once the child is gone, so the reader always
        // terminates; join even on the error paths to avoid a stray thread.
        let stdout = reader.and_then(|h| h.join().ok()).unwrap_or_default();

        match waited {
            Waited::Exited(code) => Ok((code, stdout)),
            Waited::Cancelled => Err(TalonError::Cancelled),
            Waited::TimedOut => Err(TalonError::ToolTimeout {
                tool: image.to_string(),
                seconds: timeout.as_secs(),
            }),
        }
    }
}

impl ContainerRuntime for DockerRuntime {
    fn image_present(&self, image: &str) -> Result<bool> {
        let output = Command::new(&self.engine)
            .args(["image", "inspect", image])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| TalonError::Io {
                source: e,
                context: format!("Failed to invoke {} image inspect", self.engine),
            })?;
        Ok(output.success())
    }

    fn pull(&self, image: &str) -> Result<()> {
        tracing::info!("Pulling image {}", image);
        let child = Command::new(&self.engine)
            .args(["pull", image])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| TalonError::Io {
                source: e,
                context: format!("Failed to invoke {} pull", self.engine),
            })?;

        let (code, _) = self.wait_bounded(child, image, self.pull_timeout, &CancelToken::new())?;
        if code != 0 {
            return Err(TalonError::ToolInstallFailure {
                tool: image.to_string(),
                reason: format!("{} pull exited with code {}", self.engine, code),
            });
        }
        Ok(())
    }

    fn run(&self, request: &RunRequest) -> Result<RunOutput> {
        let mut cmd = Command::new(&self.engine);
        cmd.args(["run", "--rm"]);
        for (key, value) in &request.env {
            cmd.arg("-e").arg(format!("{key}={value}"));
        }
        // Output artifacts are exchanged through a bind-mounted host dir
        if let Some(path) = &request.output_file {
            if let Some(parent) = path.parent() {
                cmd.arg("-v")
                    .arg(format!("{}:{}", parent.display(), parent.display()));
            }
        }
        cmd.arg(&request.image)
            .args(&request.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        tracing::debug!("Running {} (timeout {:?})", request.image, request.timeout);
        let child = cmd.spawn().map_err(|e| TalonError::Io {
            source: e,
            context: format!("Failed to spawn {} run for {}", self.engine, request.image),
        })?;

        let (exit_code, stdout) =
            self.wait_bounded(child, &request.image, request.timeout, &request.cancel)?;

        Ok(RunOutput {
            exit_code,
            stdout,
            output_path: request.output_file.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_propagates_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_run_request_defaults() {
        let req = RunRequest::new("img:latest", vec!["-h".to_string()], Duration::from_secs(5));
        assert!(req.env.is_empty());
        assert!(req.output_file.is_none());
        assert!(!req.cancel.is_cancelled());
    }

    fn spawn_sleeper() -> std::process::Child {
        Command::new("sleep")
            .arg("30")
            .stdout(Stdio::piped())
            .spawn()
            .unwrap()
    }

    #[cfg(target_os = "linux")]
    fn reaped(pid: u32) -> bool {
        !std::path::Path::new(&format!("/proc/{pid}")).exists()
    }

    #[test]
    fn test_wait_bounded_kills_child_at_deadline() {
        let rt = DockerRuntime::new("docker", Duration::from_secs(5));
        let child = spawn_sleeper();
        let pid = child.id();

        let started = Instant::now();
        let result = rt.wait_bounded(
            child,
            "sleeper:latest",
            Duration::from_millis(200),
            &CancelToken::new(),
        );

        match result {
            Err(TalonError::ToolTimeout { tool, seconds }) => {
                assert_eq!(tool, "sleeper:latest");
                assert_eq!(seconds, 0);
            }
            other => panic!("expected ToolTimeout, got {other:?}"),
        }
        // Returned well before the child's natural lifetime
        assert!(started.elapsed() < Duration::from_secs(5));
        #[cfg(target_os = "linux")]
        assert!(reaped(pid), "child {pid} left running after timeout");
    }

    #[test]
    fn test_wait_bounded_kills_child_on_cancel() {
        let rt = DockerRuntime::new("docker", Duration::from_secs(5));
        let child = spawn_sleeper();
        let pid = child.id();

        let token = CancelToken::new();
        token.cancel();
        let result = rt.wait_bounded(child, "sleeper:latest", Duration::from_secs(30), &token);

        assert!(matches!(result, Err(TalonError::Cancelled)));
        #[cfg(target_os = "linux")]
        assert!(reaped(pid), "child {pid} left running after cancel");
    }

    #[test]
    fn test_wait_bounded_drains_output_larger_than_pipe_buffer() {
        let rt = DockerRuntime::new("docker", Duration::from_secs(5));
        // 256 KiB of stdout, several times the default pipe capacity
        let child = Command::new("sh")
            .args(["-c", "head -c 262144 /dev/zero | tr '\\0' 'x'"])
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();

        let (code, stdout) = rt
            .wait_bounded(
                child,
                "chatty:latest",
                Duration::from_secs(10),
                &CancelToken::new(),
            )
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(stdout.len(), 262_144);
        assert!(stdout.bytes().all(|b| b == b'x'));
    }
}
