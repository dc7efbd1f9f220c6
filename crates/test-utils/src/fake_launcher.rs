use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wildfire_wrf::dispatch::{CancelToken, StepLauncher, StepOutcome};
use wildfire_wrf::layout::Layout;
use wildfire_wrf::oracle::ledger_key;
use wildfire_wrf::plan::Step;
use wildfire_wrf::types::StepKind;

/// What a fake step does when launched.
#[derive(Debug, Clone)]
pub struct FakeStep {
    pub exit_code: i32,
    /// Output files written before exiting.
    pub outputs: usize,
    /// Lines written to the step's log.
    pub log: Vec<String>,
    /// Never exit on its own; only cancellation or a timeout ends it.
    pub hang: bool,
}

impl FakeStep {
    pub fn succeed(outputs: usize) -> Self {
        Self {
            exit_code: 0,
            outputs,
            log: Vec::new(),
            hang: false,
        }
    }

    pub fn fail(exit_code: i32) -> Self {
        Self {
            exit_code,
            outputs: 0,
            log: Vec::new(),
            hang: false,
        }
    }

    pub fn hang() -> Self {
        Self {
            hang: true,
            ..Self::succeed(0)
        }
    }

    pub fn with_outputs(mut self, outputs: usize) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_log(mut self, lines: &[&str]) -> Self {
        self.log = lines.iter().map(|l| l.to_string()).collect();
        self
    }
}

/// Launch lifecycle events, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchEvent {
    Started(String),
    Finished(String),
}

#[derive(Debug, Default)]
struct State {
    launched: Vec<String>,
    events: Vec<LaunchEvent>,
    in_flight: usize,
    max_in_flight: usize,
}

/// A fake launcher that:
/// - records which steps were launched, keyed `fire/geogrid` or `fire/<day>`
/// - writes scripted output files and log lines like the real scripts would
/// - returns a scripted exit code (success with the day threshold of output
///   by default)
#[derive(Clone)]
pub struct FakeLauncher {
    layout: Layout,
    default: FakeStep,
    scripted: Arc<Mutex<HashMap<String, FakeStep>>>,
    delay: Duration,
    state: Arc<Mutex<State>>,
}

impl FakeLauncher {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            default: FakeStep::succeed(30),
            scripted: Arc::new(Mutex::new(HashMap::new())),
            delay: Duration::ZERO,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// How long every step "runs" before exiting.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Script the step `key` (`fire/geogrid` or `fire/<day>`).
    pub fn script(self, key: &str, step: FakeStep) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .insert(key.to_string(), step);
        self
    }

    pub fn launched(&self) -> Vec<String> {
        self.state.lock().unwrap().launched.clone()
    }

    pub fn events(&self) -> Vec<LaunchEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    fn behaviour(&self, key: &str) -> FakeStep {
        self.scripted
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    fn begin(&self, key: &str) -> InFlight {
        let mut state = self.state.lock().unwrap();
        state.launched.push(key.to_string());
        state.events.push(LaunchEvent::Started(key.to_string()));
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
        InFlight {
            key: key.to_string(),
            state: Arc::clone(&self.state),
        }
    }

    fn write_effects(&self, step: &Step, behaviour: &FakeStep) {
        let (dir, prefix) = match step.kind {
            StepKind::Grid => (self.layout.geogrid_dir(&step.fire_id), "geo_em.d01."),
            StepKind::Simulation => (
                self.layout
                    .wrf_day_dir(&step.fire_id, step.day.as_deref().unwrap_or_default()),
                "wrfout_d01_",
            ),
        };
        if behaviour.outputs > 0 {
            crate::touch_outputs(&dir, prefix, behaviour.outputs);
        }

        if let Some(parent) = step.log_path.parent() {
            fs::create_dir_all(parent).expect("create log dir");
        }
        let mut log = behaviour.log.join("\n");
        log.push('\n');
        fs::write(&step.log_path, log).expect("write step log");
    }
}

/// Marks a launch as finished when dropped, including when the dispatcher
/// drops the launch future on timeout.
struct InFlight {
    key: String,
    state: Arc<Mutex<State>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.in_flight -= 1;
            state.events.push(LaunchEvent::Finished(self.key.clone()));
        }
    }
}

impl StepLauncher for FakeLauncher {
    fn launch<'a>(
        &'a self,
        step: &'a Step,
        mut cancel: CancelToken,
    ) -> Pin<Box<dyn Future<Output = StepOutcome> + Send + 'a>> {
        Box::pin(async move {
            let key = ledger_key(step);
            let behaviour = self.behaviour(&key);
            let _in_flight = self.begin(&key);

            if behaviour.hang {
                cancel.cancelled().await;
                return StepOutcome::Cancelled;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.delay) => {}
                _ = cancel.cancelled() => return StepOutcome::Cancelled,
            }

            self.write_effects(step, &behaviour);
            if behaviour.exit_code == 0 {
                StepOutcome::Success
            } else {
                StepOutcome::Failed(behaviour.exit_code)
            }
        })
    }
}
