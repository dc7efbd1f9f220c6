// src/dispatch/summary.rs

use std::fmt;

use crate::classify::Diagnosis;
use crate::dispatch::chain::FireState;
use crate::plan::Step;
use crate::types::StepKind;

/// How one step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// Output was already complete; nothing was launched.
    Skipped,
    Succeeded,
    Failed(Diagnosis),
    /// Interrupted before or while running.
    Cancelled,
}

impl StepResult {
    /// Whether later steps may build on this one: it was skipped as already
    /// complete, or its process exited zero. A dirty exit does not qualify.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, StepResult::Skipped | StepResult::Succeeded)
    }

    pub fn launched(&self) -> bool {
        matches!(self, StepResult::Succeeded | StepResult::Failed(_))
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepResult::Skipped => f.write_str("skipped (already complete)"),
            StepResult::Succeeded => f.write_str("succeeded"),
            StepResult::Failed(diagnosis) => write!(f, "{diagnosis}"),
            StepResult::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub kind: StepKind,
    /// The day, or `geogrid`.
    pub name: String,
    pub result: StepResult,
}

impl StepReport {
    pub fn new(step: &Step, result: StepResult) -> Self {
        Self {
            kind: step.kind,
            name: step.display_name().to_string(),
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FireReport {
    pub fire_id: String,
    pub state: FireState,
    pub steps: Vec<StepReport>,
}

impl FireReport {
    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.name == name)
    }
}

/// Outcome of a whole dispatch, one report per fire in plan order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub fires: Vec<FireReport>,
    pub interrupted: bool,
}

impl DispatchSummary {
    pub fn fire(&self, fire_id: &str) -> Option<&FireReport> {
        self.fires.iter().find(|f| f.fire_id == fire_id)
    }

    fn results(&self) -> impl Iterator<Item = &StepResult> {
        self.fires
            .iter()
            .flat_map(|f| f.steps.iter().map(|s| &s.result))
    }

    pub fn launched(&self) -> usize {
        self.results().filter(|r| r.launched()).count()
    }

    pub fn skipped(&self) -> usize {
        self.results()
            .filter(|r| matches!(r, StepResult::Skipped))
            .count()
    }

    pub fn succeeded(&self) -> usize {
        self.results()
            .filter(|r| matches!(r, StepResult::Succeeded))
            .count()
    }

    pub fn dirty_exits(&self) -> usize {
        self.results()
            .filter(|r| matches!(r, StepResult::Failed(Diagnosis::CompletedWithDirtyExit)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.results()
            .filter(|r| matches!(r, StepResult::Failed(d) if d.is_failure()))
            .count()
    }

    pub fn fires_in(&self, state: FireState) -> usize {
        self.fires.iter().filter(|f| f.state == state).count()
    }

    /// Print the operator-facing summary to stdout.
    pub fn print(&self) {
        println!();
        println!("Dispatch summary:");
        for fire in &self.fires {
            println!("  {} [{}]", fire.fire_id, fire.state);
            for step in &fire.steps {
                println!("    {:<12} {}", step.name, step.result);
            }
        }
        println!(
            "{} fire(s): {} complete, {} aborted, {} interrupted; steps: {} launched, {} skipped, {} failed, {} dirty exit(s)",
            self.fires.len(),
            self.fires_in(FireState::AllDaysDone),
            self.fires_in(FireState::Aborted),
            self.fires_in(FireState::Interrupted),
            self.launched(),
            self.skipped(),
            self.failed(),
            self.dirty_exits(),
        );
    }
}
