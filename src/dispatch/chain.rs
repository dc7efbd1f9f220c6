// src/dispatch/chain.rs

//! Pure per-fire state machine.
//!
//! ```text
//! Pending -> GridRunning -> GridDone -> DayRunning(0) -> ... -> AllDaysDone
//!                 |                                 \
//!                 +-> Aborted                        +-> Interrupted
//! ```
//!
//! The chain consumes [`ChainEvent`]s and answers with the next
//! [`ChainCommand`] for the async shell in [`super::dispatcher`]. It holds no
//! Tokio types and does no IO, so every transition is unit testable.

use std::fmt;

use thiserror::Error;

use crate::dispatch::summary::{FireReport, StepReport, StepResult};
use crate::plan::{FirePlan, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireState {
    /// Waiting for a concurrency slot.
    Pending,
    GridRunning,
    /// Grid output is available; days may start.
    GridDone,
    /// Running the day at this index of the plan's day list.
    DayRunning(usize),
    AllDaysDone,
    /// The grid step failed; no days were attempted.
    Aborted,
    /// Stopped by an operator interrupt.
    Interrupted,
}

impl FireState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FireState::AllDaysDone | FireState::Aborted | FireState::Interrupted
        )
    }
}

impl fmt::Display for FireState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FireState::Pending => f.write_str("pending"),
            FireState::GridRunning => f.write_str("grid running"),
            FireState::GridDone => f.write_str("grid done"),
            FireState::DayRunning(i) => write!(f, "day {} running", i + 1),
            FireState::AllDaysDone => f.write_str("all days done"),
            FireState::Aborted => f.write_str("aborted"),
            FireState::Interrupted => f.write_str("interrupted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    /// A concurrency slot was acquired for this fire.
    SlotAcquired,
    /// The current step ended.
    StepFinished(StepResult),
    /// Operator abort before the current step was started.
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainCommand {
    /// Check, then launch or skip, this step.
    RunStep(Step),
    /// The chain is in a terminal state; release the slot.
    Finish,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("fire {fire_id}: event {event} is not valid in state {state}")]
pub struct InvalidTransition {
    pub fire_id: String,
    pub state: FireState,
    pub event: &'static str,
}

#[derive(Debug, Clone)]
pub struct FireChain {
    plan: FirePlan,
    state: FireState,
    reports: Vec<StepReport>,
}

impl FireChain {
    pub fn new(plan: FirePlan) -> Self {
        Self {
            plan,
            state: FireState::Pending,
            reports: Vec::new(),
        }
    }

    pub fn fire_id(&self) -> &str {
        self.plan.fire_id()
    }

    pub fn state(&self) -> FireState {
        self.state
    }

    pub fn reports(&self) -> &[StepReport] {
        &self.reports
    }

    pub fn handle(&mut self, event: ChainEvent) -> Result<ChainCommand, InvalidTransition> {
        match (self.state, event) {
            (state, _) if state.is_terminal() => Ok(ChainCommand::Finish),

            (_, ChainEvent::Interrupted) => {
                self.state = FireState::Interrupted;
                Ok(ChainCommand::Finish)
            }

            (FireState::Pending, ChainEvent::SlotAcquired) => {
                self.state = FireState::GridRunning;
                Ok(ChainCommand::RunStep(self.plan.grid().clone()))
            }

            (FireState::GridRunning, ChainEvent::StepFinished(result)) => {
                let satisfied = result.is_satisfied();
                let cancelled = result == StepResult::Cancelled;
                self.reports.push(StepReport::new(self.plan.grid(), result));

                if cancelled {
                    self.state = FireState::Interrupted;
                    Ok(ChainCommand::Finish)
                } else if satisfied {
                    self.state = FireState::GridDone;
                    Ok(self.advance_to_day(0))
                } else {
                    self.state = FireState::Aborted;
                    Ok(ChainCommand::Finish)
                }
            }

            // Day failures do not stop the chain.
            (FireState::DayRunning(index), ChainEvent::StepFinished(result)) => {
                let cancelled = result == StepResult::Cancelled;
                let day = &self.plan.days()[index];
                self.reports.push(StepReport::new(day, result));

                if cancelled {
                    self.state = FireState::Interrupted;
                    Ok(ChainCommand::Finish)
                } else {
                    Ok(self.advance_to_day(index + 1))
                }
            }

            (state, event) => Err(InvalidTransition {
                fire_id: self.fire_id().to_string(),
                state,
                event: event_name(&event),
            }),
        }
    }

    fn advance_to_day(&mut self, index: usize) -> ChainCommand {
        match self.plan.days().get(index) {
            Some(day) => {
                self.state = FireState::DayRunning(index);
                ChainCommand::RunStep(day.clone())
            }
            None => {
                self.state = FireState::AllDaysDone;
                ChainCommand::Finish
            }
        }
    }

    pub fn into_report(self) -> FireReport {
        FireReport {
            fire_id: self.plan.fire_id().to_string(),
            state: self.state,
            steps: self.reports,
        }
    }
}

fn event_name(event: &ChainEvent) -> &'static str {
    match event {
        ChainEvent::SlotAcquired => "SlotAcquired",
        ChainEvent::StepFinished(_) => "StepFinished",
        ChainEvent::Interrupted => "Interrupted",
    }
}
