// src/classify/mod.rs

//! Failure classifier: turns a failed step and the tail of its log into a
//! [`Diagnosis`].
//!
//! Rules, first match wins:
//!
//! 1. an upstream data-fetch marker in the tail: [`Diagnosis::UpstreamDataMissing`]
//! 2. a main-routine marker in the tail and the step's output is complete:
//!    [`Diagnosis::CompletedWithDirtyExit`]
//! 3. anything else: [`Diagnosis::Unclassified`] with the raw error and tail
//!
//! The wrapped simulation engine regularly exits non-zero after writing all
//! of its output, which is what rule 2 recognizes.

use std::collections::VecDeque;
use std::fmt;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use regex::RegexSet;
use tracing::{debug, error, warn};

use crate::config::DiagnosticsSettings;
use crate::errors::WildfireError;
use crate::fs::FileSystem;
use crate::oracle::CompletionOracle;
use crate::plan::Step;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnosis {
    /// The input-data download failed; nothing to simulate from.
    UpstreamDataMissing,
    /// Non-zero exit, but the output is complete.
    CompletedWithDirtyExit,
    Unclassified { error: String, log_tail: Vec<String> },
}

impl Diagnosis {
    /// Whether the step should be treated as not having produced output.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Diagnosis::CompletedWithDirtyExit)
    }

    /// Log the diagnosis for an operator. Dirty exits are warnings; the
    /// rest are errors.
    pub fn report(&self, step: &Step) {
        let fire_id = step.fire_id.as_str();
        let name = step.display_name();
        match self {
            Diagnosis::UpstreamDataMissing => {
                error!(
                    fire_id,
                    step = name,
                    log = ?step.log_path,
                    "input data download failed; check the data source for this day"
                );
            }
            Diagnosis::CompletedWithDirtyExit => {
                warn!(
                    fire_id,
                    step = name,
                    "step exited non-zero but its output is complete"
                );
            }
            Diagnosis::Unclassified { error, log_tail } => {
                error!(
                    fire_id,
                    step = name,
                    error = %error,
                    log = ?step.log_path,
                    "step failed"
                );
                for line in log_tail {
                    error!(fire_id, step = name, "| {}", line);
                }
            }
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnosis::UpstreamDataMissing => f.write_str("upstream data missing"),
            Diagnosis::CompletedWithDirtyExit => f.write_str("completed with dirty exit"),
            Diagnosis::Unclassified { error, .. } => write!(f, "failed: {error}"),
        }
    }
}

/// Compiled marker sets. Markers are literal substrings.
#[derive(Debug, Clone)]
pub struct LogRules {
    upstream: RegexSet,
    main_routine: RegexSet,
}

impl LogRules {
    pub fn new<S: AsRef<str>>(upstream: &[S], main_routine: &[S]) -> crate::errors::Result<Self> {
        Ok(Self {
            upstream: literal_set(upstream)?,
            main_routine: literal_set(main_routine)?,
        })
    }

    pub fn shows_upstream_failure(&self, tail: &[String]) -> bool {
        tail.iter().any(|line| self.upstream.is_match(line))
    }

    pub fn shows_main_routine(&self, tail: &[String]) -> bool {
        tail.iter().any(|line| self.main_routine.is_match(line))
    }
}

fn literal_set<S: AsRef<str>>(markers: &[S]) -> crate::errors::Result<RegexSet> {
    RegexSet::new(markers.iter().map(|m| regex::escape(m.as_ref())))
        .map_err(|e| WildfireError::ConfigError(format!("invalid log marker: {e}")))
}

/// Last `n` lines of a log. A missing or unreadable log yields an error the
/// caller is expected to report, not propagate.
///
/// Invalid UTF-8 is replaced line by line instead of failing the read.
pub fn read_log_tail(fs: &dyn FileSystem, path: &Path, n: usize) -> Result<Vec<String>> {
    let mut reader = BufReader::new(fs.open_read(path)?);
    let mut tail = VecDeque::with_capacity(n);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        if tail.len() == n {
            tail.pop_front();
        }
        tail.push_back(String::from_utf8_lossy(&buf).into_owned());
    }
    Ok(tail.into())
}

#[derive(Debug, Clone)]
pub struct FailureClassifier {
    rules: LogRules,
    tail_lines: usize,
    settle_delay: Duration,
    fs: Arc<dyn FileSystem>,
}

impl FailureClassifier {
    pub fn new(
        rules: LogRules,
        tail_lines: usize,
        settle_delay: Duration,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            rules,
            tail_lines,
            settle_delay,
            fs,
        }
    }

    pub fn from_config(
        cfg: &DiagnosticsSettings,
        fs: Arc<dyn FileSystem>,
    ) -> crate::errors::Result<Self> {
        let rules = LogRules::new(
            cfg.upstream_markers.as_slice(),
            cfg.main_routine_markers.as_slice(),
        )?;
        Ok(Self::new(rules, cfg.log_tail_lines, cfg.settle_delay, fs))
    }

    /// Apply the rules to an already-read tail. `is_complete` is only asked
    /// when the main-routine marker is present.
    pub fn classify(
        &self,
        error: &str,
        log_tail: Vec<String>,
        is_complete: impl FnOnce() -> bool,
    ) -> Diagnosis {
        if self.rules.shows_upstream_failure(&log_tail) {
            return Diagnosis::UpstreamDataMissing;
        }
        if self.rules.shows_main_routine(&log_tail) && is_complete() {
            return Diagnosis::CompletedWithDirtyExit;
        }
        Diagnosis::Unclassified {
            error: error.to_string(),
            log_tail,
        }
    }

    /// Wait for the log to settle, read its tail and classify the failure.
    pub async fn diagnose(&self, step: &Step, error: &str, oracle: &CompletionOracle) -> Diagnosis {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let log_tail = match read_log_tail(self.fs.as_ref(), &step.log_path, self.tail_lines) {
            Ok(tail) => tail,
            Err(err) => {
                debug!(
                    fire_id = %step.fire_id,
                    log = ?step.log_path,
                    error = %err,
                    "step log not readable; classifying without it"
                );
                Vec::new()
            }
        };

        self.classify(error, log_tail, || oracle.is_step_complete(step))
    }
}
