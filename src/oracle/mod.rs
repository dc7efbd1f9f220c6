// src/oracle/mod.rs

//! Completion oracle: decides whether a step's output already exists.
//!
//! A step is complete when its output directory holds at least `threshold`
//! files whose names match the step's pattern. Output is written
//! incrementally by the external programs, which do not report success
//! reliably through their exit code, so the count is a practical proxy for
//! "finished". It is a heuristic: a run killed after writing exactly
//! `threshold` snapshots looks complete.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use globset::{Glob, GlobMatcher};
use tracing::{debug, warn};

use crate::config::ConfigFile;
use crate::errors::{Result, WildfireError};
use crate::fs::FileSystem;
use crate::layout::Layout;
use crate::plan::Step;
use crate::types::{LedgerMode, StepKind};

pub mod ledger;

pub use ledger::{CompletionLedger, FileLedger, MemoryLedger, ledger_key};

/// File-name pattern plus minimum count for one kind of step.
#[derive(Debug, Clone)]
pub struct OutputRule {
    pattern: String,
    matcher: GlobMatcher,
    threshold: usize,
}

impl OutputRule {
    pub fn new(pattern: &str, threshold: usize) -> Result<Self> {
        let glob = Glob::new(pattern).map_err(|e| {
            WildfireError::ConfigError(format!("invalid output pattern {pattern:?}: {e}"))
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            matcher: glob.compile_matcher(),
            threshold,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.matcher.is_match(file_name)
    }
}

pub struct CompletionOracle {
    layout: Layout,
    grid: OutputRule,
    day: OutputRule,
    fs: Arc<dyn FileSystem>,
    ledger: Mutex<Option<Box<dyn CompletionLedger>>>,
}

impl std::fmt::Debug for CompletionOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionOracle")
            .field("layout", &self.layout)
            .field("grid", &self.grid)
            .field("day", &self.day)
            .finish_non_exhaustive()
    }
}

impl CompletionOracle {
    pub fn new(layout: Layout, grid: OutputRule, day: OutputRule, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            layout,
            grid,
            day,
            fs,
            ledger: Mutex::new(None),
        }
    }

    /// Build the oracle from the `[completion]` section, opening the ledger
    /// it asks for.
    pub fn from_config(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let layout = Layout::from_config(cfg);
        let completion = &cfg.completion;
        let grid = OutputRule::new(&completion.grid_pattern, completion.grid_threshold)?;
        let day = OutputRule::new(&completion.day_pattern, completion.day_threshold)?;

        let ledger: Option<Box<dyn CompletionLedger>> = match completion.ledger {
            LedgerMode::Off => None,
            LedgerMode::Memory => Some(Box::new(MemoryLedger::new())),
            LedgerMode::File => Some(Box::new(FileLedger::new(layout.ledger_path()))),
        };

        Ok(Self::new(layout, grid, day, fs).with_ledger_opt(ledger))
    }

    pub fn with_ledger(self, ledger: Box<dyn CompletionLedger>) -> Self {
        self.with_ledger_opt(Some(ledger))
    }

    fn with_ledger_opt(mut self, ledger: Option<Box<dyn CompletionLedger>>) -> Self {
        self.ledger = Mutex::new(ledger);
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    fn rule(&self, kind: StepKind) -> &OutputRule {
        match kind {
            StepKind::Grid => &self.grid,
            StepKind::Simulation => &self.day,
        }
    }

    /// Directory the step writes its output into.
    pub fn output_dir(&self, step: &Step) -> PathBuf {
        match &step.day {
            None => self.layout.geogrid_dir(&step.fire_id),
            Some(day) => self.layout.wrf_day_dir(&step.fire_id, day),
        }
    }

    /// Number of matching output files currently on disk. A missing
    /// directory counts as zero.
    pub fn count_outputs(&self, step: &Step) -> usize {
        let dir = self.output_dir(step);
        let rule = self.rule(step.kind);

        let entries = match self.fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir = ?dir, error = %err, "output directory not readable; counting 0");
                return 0;
            }
        };

        entries
            .iter()
            .filter(|path| self.fs.is_file(path))
            .filter_map(|path| path.file_name().and_then(|n| n.to_str()))
            .filter(|name| rule.matches(name))
            .count()
    }

    /// Whether the step's output already satisfies its threshold.
    ///
    /// The filesystem is always scanned. A ledger entry contradicted by the
    /// scan is pruned; a positive scan is recorded.
    pub fn is_step_complete(&self, step: &Step) -> bool {
        let rule = self.rule(step.kind);
        let count = self.count_outputs(step);
        let threshold = rule.threshold();
        let complete = count >= threshold;

        debug!(
            fire_id = %step.fire_id,
            step = step.display_name(),
            pattern = rule.pattern(),
            count,
            threshold,
            complete,
            "scanned step output"
        );

        self.update_ledger(step, complete, count);
        complete
    }

    fn update_ledger(&self, step: &Step, complete: bool, count: usize) {
        let Ok(mut guard) = self.ledger.lock() else {
            warn!("completion ledger lock poisoned; ledger disabled for this check");
            return;
        };
        let Some(ledger) = guard.as_mut() else {
            return;
        };

        let key = ledger_key(step);
        let result = if complete {
            ledger.save(&key, count)
        } else {
            match ledger.remove(&key) {
                Ok(true) => {
                    warn!(
                        key = %key,
                        count,
                        "ledger recorded step as complete but output is missing"
                    );
                    Ok(())
                }
                Ok(false) => Ok(()),
                Err(err) => Err(err),
            }
        };

        if let Err(err) = result {
            warn!(key = %key, error = %err, "failed to update completion ledger");
        }
    }

    /// Ledger entry for a step, if a ledger is configured and holds one.
    pub fn recorded_count(&self, step: &Step) -> Option<usize> {
        let guard = self.ledger.lock().ok()?;
        guard.as_ref()?.load(&ledger_key(step)).ok().flatten()
    }
}
