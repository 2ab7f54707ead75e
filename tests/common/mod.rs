//! Shared test doubles for integration tests
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use talon::error::{Result, TalonError};
use talon::runtime::{ContainerRuntime, RunOutput, RunRequest};

type RunHandler = Box<dyn Fn(&RunRequest) -> Result<RunOutput> + Send + Sync>;

/// Scripted container runtime: `run` is delegated to a closure, install
/// state is tracked in memory.
pub struct MockRuntime {
    installed: Mutex<HashSet<String>>,
    pull_count: AtomicUsize,
    fail_pull: bool,
    handler: RunHandler,
}

impl MockRuntime {
    pub fn new(handler: impl Fn(&RunRequest) -> Result<RunOutput> + Send + Sync + 'static) -> Self {
        Self {
            installed: Mutex::new(HashSet::new()),
            pull_count: AtomicUsize::new(0),
            fail_pull: false,
            handler: Box::new(handler),
        }
    }

    /// Runtime whose `run` must never be reached
    pub fn unreachable() -> Self {
        Self::new(|req| {
            panic!("runtime.run called unexpectedly for {}", req.image);
        })
    }

    pub fn failing_pulls(mut self) -> Self {
        self.fail_pull = true;
        self
    }

    /// Pre-mark an image as present
    pub fn preinstall(self, image: &str) -> Self {
        self.installed.lock().unwrap().insert(image.to_string());
        self
    }

    pub fn pulls(&self) -> usize {
        self.pull_count.load(Ordering::SeqCst)
    }
}

/// Convenience for handlers returning plain stdout
pub fn stdout_output(stdout: &str) -> Result<RunOutput> {
    Ok(RunOutput {
        exit_code: 0,
        stdout: stdout.to_string(),
        output_path: None,
    })
}

impl ContainerRuntime for MockRuntime {
    fn image_present(&self, image: &str) -> Result<bool> {
        Ok(self.installed.lock().unwrap().contains(image))
    }

    fn pull(&self, image: &str) -> Result<()> {
        if self.fail_pull {
            return Err(TalonError::ToolInstallFailure {
                tool: image.to_string(),
                reason: "registry unreachable".to_string(),
            });
        }
        // Window for a second racing install to observe "not installed"
        std::thread::sleep(std::time::Duration::from_millis(20));
        self.pull_count.fetch_add(1, Ordering::SeqCst);
        self.installed.lock().unwrap().insert(image.to_string());
        Ok(())
    }

    fn run(&self, request: &RunRequest) -> Result<RunOutput> {
        (self.handler)(request)
    }
}
