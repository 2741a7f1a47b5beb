//! Test harness invoked by `--run-tests`.

use crate::config::HarnessConfig;
use crate::logging::SharedStream;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info};

/// Fixed verb placed after the program name in the harness argv
pub const DISCOVERY_VERB: &str = "discover";

/// Everything the harness needs to discover and filter tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessInvocation {
    pub program: String,
    pub start_dir: PathBuf,
    pub filters: Vec<String>,
}

impl HarnessInvocation {
    pub fn new(program: impl Into<String>, start_dir: PathBuf, filters: Vec<String>) -> Self {
        Self {
            program: program.into(),
            start_dir,
            filters,
        }
    }

    /// `[program, "discover", start_dir, filters...]`
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![
            self.program.clone(),
            DISCOVERY_VERB.to_string(),
            self.start_dir.display().to_string(),
        ];
        argv.extend(self.filters.iter().cloned());
        argv
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed,
}

/// Runs the project's tests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TestHarness: Send + Sync {
    /// Run tests, writing progress to `output`
    async fn run(&self, invocation: &HarnessInvocation, output: SharedStream)
        -> Result<TestOutcome>;
}

/// Harness that runs a cargo-style test runner inside the discovery root
#[derive(Debug, Clone)]
pub struct CargoHarness {
    program: String,
    args: Vec<String>,
}

impl CargoHarness {
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    fn command(&self, invocation: &HarnessInvocation) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(&invocation.start_dir);

        if !invocation.filters.is_empty() {
            cmd.arg("--").args(&invocation.filters);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Copy one runner pipe into `output` until it closes
async fn forward<R: AsyncRead + Unpin>(mut pipe: R, mut output: SharedStream) -> Result<()> {
    let mut chunk = [0u8; 4096];
    loop {
        let read = pipe
            .read(&mut chunk)
            .await
            .context("Failed to read test runner output")?;
        if read == 0 {
            break;
        }
        output
            .write_all(&chunk[..read])
            .context("Failed to forward test runner output")?;
    }
    output.flush().context("Failed to flush test runner output")
}

#[async_trait]
impl TestHarness for CargoHarness {
    async fn run(
        &self,
        invocation: &HarnessInvocation,
        output: SharedStream,
    ) -> Result<TestOutcome> {
        info!("run_tests argv: {:?}", invocation.argv());

        let manifest = invocation.start_dir.join("Cargo.toml");
        if !manifest.is_file() {
            anyhow::bail!(
                "No Cargo.toml found in test discovery root: {}",
                invocation.start_dir.display()
            );
        }

        debug!(
            "starting test runner: {} {:?} in {}",
            self.program,
            self.args,
            invocation.start_dir.display()
        );

        let mut child = self
            .command(invocation)
            .spawn()
            .with_context(|| format!("Failed to start test runner: {}", self.program))?;

        let stdout = child
            .stdout
            .take()
            .context("Failed to capture test runner output")?;
        let stderr = child
            .stderr
            .take()
            .context("Failed to capture test runner output")?;

        // Both pipes go through `output` so the newline guard sees every byte.
        let forwarded = tokio::try_join!(
            forward(stdout, output.clone()),
            forward(stderr, output.clone())
        );
        if let Err(err) = forwarded {
            if let Err(kill_err) = child.kill().await {
                debug!("failed to stop test runner: {}", kill_err);
            }
            return Err(err);
        }

        let status = child
            .wait()
            .await
            .context("Failed to wait for test runner")?;

        debug!("test runner exited with {}", status);

        if status.success() {
            Ok(TestOutcome::Passed)
        } else {
            Ok(TestOutcome::Failed)
        }
    }
}
