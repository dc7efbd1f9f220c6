// src/dispatch/dispatcher.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::classify::FailureClassifier;
use crate::dispatch::CancelToken;
use crate::dispatch::chain::{ChainCommand, ChainEvent, FireChain, FireState};
use crate::dispatch::launcher::{StepLauncher, StepOutcome};
use crate::dispatch::summary::{DispatchSummary, FireReport, StepResult};
use crate::oracle::CompletionOracle;
use crate::plan::{RunPlan, Step};

/// Async shell around [`FireChain`].
///
/// Slots are handed out in plan order: fire `n + 1` never gets a slot before
/// fire `n`. A slot is held for the whole chain of a fire, so `max_workers`
/// bounds the number of fires in flight, not the number of processes.
pub struct Dispatcher<L> {
    launcher: Arc<L>,
    oracle: Arc<CompletionOracle>,
    classifier: Arc<FailureClassifier>,
    max_workers: usize,
    step_timeout: Option<Duration>,
}

impl<L: StepLauncher + 'static> Dispatcher<L> {
    pub fn new(
        launcher: L,
        oracle: Arc<CompletionOracle>,
        classifier: Arc<FailureClassifier>,
        max_workers: usize,
    ) -> Self {
        Self {
            launcher: Arc::new(launcher),
            oracle,
            classifier,
            max_workers: max_workers.max(1),
            step_timeout: None,
        }
    }

    pub fn with_step_timeout(mut self, step_timeout: Option<Duration>) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    /// Run every fire's chain and collect the results in plan order.
    ///
    /// Once `cancel` fires no further slots are handed out and no further
    /// steps are started; running steps are stopped by the launcher.
    pub async fn run(&self, plan: RunPlan, cancel: CancelToken) -> DispatchSummary {
        let budget = Arc::new(Semaphore::new(self.max_workers));
        let mut waiter = cancel.clone();
        let mut slots = Vec::with_capacity(plan.len());

        info!(
            fires = plan.len(),
            steps = plan.total_steps(),
            max_workers = self.max_workers,
            "dispatch starting"
        );

        for fire_plan in plan.into_fire_plans() {
            let chain = FireChain::new(fire_plan);

            let permit = if cancel.is_cancelled() {
                None
            } else {
                tokio::select! {
                    biased;
                    _ = waiter.cancelled() => None,
                    permit = budget.clone().acquire_owned() => permit.ok(),
                }
            };

            let Some(permit) = permit else {
                slots.push(Slot::Done(interrupt(chain)));
                continue;
            };

            let fire_id = chain.fire_id().to_string();
            debug!(fire_id = %fire_id, "acquired worker slot");

            let worker = self.worker(cancel.clone());
            let handle = tokio::spawn(async move {
                let report = worker.run_chain(chain).await;
                drop(permit);
                report
            });
            slots.push(Slot::Running(fire_id, handle));
        }

        let mut fires = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Slot::Done(report) => fires.push(report),
                Slot::Running(fire_id, handle) => match handle.await {
                    Ok(report) => fires.push(report),
                    Err(err) => {
                        error!(fire_id = %fire_id, error = %err, "fire worker panicked");
                        fires.push(FireReport {
                            fire_id,
                            state: FireState::Aborted,
                            steps: Vec::new(),
                        });
                    }
                },
            }
        }

        let summary = DispatchSummary {
            fires,
            interrupted: cancel.is_cancelled(),
        };
        info!(
            launched = summary.launched(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            interrupted = summary.interrupted,
            "dispatch finished"
        );
        summary
    }

    fn worker(&self, cancel: CancelToken) -> Worker<L> {
        Worker {
            launcher: Arc::clone(&self.launcher),
            oracle: Arc::clone(&self.oracle),
            classifier: Arc::clone(&self.classifier),
            step_timeout: self.step_timeout,
            cancel,
        }
    }
}

enum Slot {
    Running(String, JoinHandle<FireReport>),
    Done(FireReport),
}

fn interrupt(mut chain: FireChain) -> FireReport {
    info!(fire_id = %chain.fire_id(), "interrupted before start");
    if let Err(err) = chain.handle(ChainEvent::Interrupted) {
        warn!(error = %err, "unexpected chain state on interrupt");
    }
    chain.into_report()
}

/// Runs one fire's chain inside its slot.
struct Worker<L> {
    launcher: Arc<L>,
    oracle: Arc<CompletionOracle>,
    classifier: Arc<FailureClassifier>,
    step_timeout: Option<Duration>,
    cancel: CancelToken,
}

impl<L: StepLauncher> Worker<L> {
    async fn run_chain(self, mut chain: FireChain) -> FireReport {
        let mut command = chain.handle(ChainEvent::SlotAcquired);

        loop {
            match command {
                Ok(ChainCommand::RunStep(step)) => {
                    let event = if self.cancel.is_cancelled() {
                        ChainEvent::Interrupted
                    } else {
                        ChainEvent::StepFinished(self.run_step(&step).await)
                    };
                    command = chain.handle(event);
                }
                Ok(ChainCommand::Finish) => break,
                Err(err) => {
                    error!(error = %err, "fire chain rejected event");
                    break;
                }
            }
        }

        info!(fire_id = %chain.fire_id(), state = %chain.state(), "fire finished");
        println!("[{}] {}", chain.fire_id(), chain.state());
        chain.into_report()
    }

    async fn run_step(&self, step: &Step) -> StepResult {
        let fire_id = step.fire_id.as_str();
        let name = step.display_name();

        if self.oracle.is_step_complete(step) {
            info!(fire_id, step = name, "output already complete; skipping");
            println!("[{fire_id}] {name}: already complete, skipping");
            return StepResult::Skipped;
        }

        println!("[{fire_id}] {name}: running {}", step.label());
        let launch = self.launcher.launch(step, self.cancel.clone());
        let outcome = match self.step_timeout {
            Some(limit) => match tokio::time::timeout(limit, launch).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(fire_id, step = name, ?limit, "step timed out; killed");
                    StepOutcome::TimedOut(limit)
                }
            },
            None => launch.await,
        };

        match outcome {
            StepOutcome::Success => {
                println!("[{fire_id}] {name}: done");
                StepResult::Succeeded
            }
            StepOutcome::Cancelled => {
                println!("[{fire_id}] {name}: cancelled");
                StepResult::Cancelled
            }
            failed => {
                let error = failed.error_message().unwrap_or_default();
                let diagnosis = self.classifier.diagnose(step, &error, &self.oracle).await;
                diagnosis.report(step);
                println!("[{fire_id}] {name}: {diagnosis}");
                StepResult::Failed(diagnosis)
            }
        }
    }
}
