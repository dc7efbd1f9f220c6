// src/dispatch/launcher.rs

//! Launching the external run script for a step.
//!
//! The dispatcher talks to a [`StepLauncher`] rather than spawning processes
//! itself, so tests can substitute a fake launcher that never touches the OS.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::dispatch::CancelToken;
use crate::plan::Step;

/// Result of one launch as seen by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    /// Non-zero exit; `-1` when the process was killed by a signal.
    Failed(i32),
    TimedOut(Duration),
    /// Killed because of an operator interrupt.
    Cancelled,
    /// The process could not be started or waited on.
    SpawnFailed(String),
}

impl StepOutcome {
    /// Error text handed to the classifier for failed outcomes.
    pub fn error_message(&self) -> Option<String> {
        match self {
            StepOutcome::Success | StepOutcome::Cancelled => None,
            StepOutcome::Failed(code) => Some(format!("exited with code {code}")),
            StepOutcome::TimedOut(limit) => Some(format!("timed out after {limit:?}")),
            StepOutcome::SpawnFailed(err) => Some(format!("could not run: {err}")),
        }
    }
}

/// Runs one step to completion. Dropping the returned future must stop the
/// step; the dispatcher relies on this for timeouts.
pub trait StepLauncher: Send + Sync {
    fn launch<'a>(
        &'a self,
        step: &'a Step,
        cancel: CancelToken,
    ) -> Pin<Box<dyn Future<Output = StepOutcome> + Send + 'a>>;
}

/// Launches `<shell> <script> <day> <config> <fire_id> <label>` as a child
/// process.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    shell: String,
    script: PathBuf,
    working_dir: Option<PathBuf>,
}

impl ProcessLauncher {
    pub fn new(shell: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
            script: script.into(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn command_line(&self, step: &Step) -> Vec<String> {
        let mut args = vec![self.shell.clone()];
        args.extend(step.launch_args(&self.script));
        args
    }

    async fn run(&self, step: &Step, mut cancel: CancelToken) -> Result<StepOutcome> {
        let args = step.launch_args(&self.script);
        info!(
            fire_id = %step.fire_id,
            step = step.display_name(),
            cmd = %self.command_line(step).join(" "),
            "starting step process"
        );

        let mut cmd = Command::new(&self.shell);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {} {}", self.shell, args.join(" ")))?;

        // Always consume output so pipe buffers don't fill; the scripts log
        // to their own files.
        if let Some(stdout) = child.stdout.take() {
            drain_lines(stdout, step, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            drain_lines(stderr, step, "stderr");
        }

        tokio::select! {
            status_res = child.wait() => {
                let status = status_res.with_context(|| {
                    format!("waiting for step process of fire {}", step.fire_id)
                })?;
                let code = status.code().unwrap_or(-1);

                info!(
                    fire_id = %step.fire_id,
                    step = step.display_name(),
                    exit_code = code,
                    success = status.success(),
                    "step process exited"
                );

                Ok(if status.success() {
                    StepOutcome::Success
                } else {
                    StepOutcome::Failed(code)
                })
            }

            _ = cancel.cancelled() => {
                info!(
                    fire_id = %step.fire_id,
                    step = step.display_name(),
                    "interrupt received; killing step process"
                );
                if let Err(e) = child.kill().await {
                    warn!(
                        fire_id = %step.fire_id,
                        error = %e,
                        "failed to kill step process on interrupt"
                    );
                }
                Ok(StepOutcome::Cancelled)
            }
        }
    }
}

impl StepLauncher for ProcessLauncher {
    fn launch<'a>(
        &'a self,
        step: &'a Step,
        cancel: CancelToken,
    ) -> Pin<Box<dyn Future<Output = StepOutcome> + Send + 'a>> {
        Box::pin(async move {
            match self.run(step, cancel).await {
                Ok(outcome) => outcome,
                Err(err) => StepOutcome::SpawnFailed(format!("{err:#}")),
            }
        })
    }
}

fn drain_lines<R>(reader: R, step: &Step, stream: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let fire_id = step.fire_id.clone();
    let name = step.display_name().to_string();
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(fire_id = %fire_id, step = %name, stream, "{}", line);
        }
    });
}
