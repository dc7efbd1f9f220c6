// tests/chain.rs

use proptest::prelude::*;
use wildfire_wrf::classify::Diagnosis;
use wildfire_wrf::dispatch::{ChainCommand, ChainEvent, FireChain, FireState, StepResult};
use wildfire_wrf::layout::Layout;
use wildfire_wrf::types::StepKind;
use wildfire_wrf_test_utils::builders::fire_plan;

const DAYS: [&str; 6] = [
    "20200816_06",
    "20200817_06",
    "20200818_06",
    "20200819_06",
    "20200820_06",
    "20200821_06",
];

fn layout() -> Layout {
    Layout::new("/home", "/scratch", "/data", "/archive")
}

fn chain(days: &[&str]) -> FireChain {
    FireChain::new(fire_plan(&layout(), "F1", days))
}

fn failed() -> StepResult {
    StepResult::Failed(Diagnosis::Unclassified {
        error: "exited with code 1".to_string(),
        log_tail: Vec::new(),
    })
}

fn step_name(command: &ChainCommand) -> Option<String> {
    match command {
        ChainCommand::RunStep(step) => Some(step.display_name().to_string()),
        ChainCommand::Finish => None,
    }
}

#[test]
fn grid_then_days_in_order() {
    let mut c = chain(&["20200817_06", "20200816_06"]);
    assert_eq!(c.state(), FireState::Pending);

    let cmd = c.handle(ChainEvent::SlotAcquired).unwrap();
    assert_eq!(step_name(&cmd).as_deref(), Some("geogrid"));
    assert_eq!(c.state(), FireState::GridRunning);

    let cmd = c.handle(ChainEvent::StepFinished(StepResult::Succeeded)).unwrap();
    assert_eq!(step_name(&cmd).as_deref(), Some("20200816_06"));
    assert_eq!(c.state(), FireState::DayRunning(0));

    let cmd = c.handle(ChainEvent::StepFinished(StepResult::Skipped)).unwrap();
    assert_eq!(step_name(&cmd).as_deref(), Some("20200817_06"));
    assert_eq!(c.state(), FireState::DayRunning(1));

    let cmd = c.handle(ChainEvent::StepFinished(StepResult::Succeeded)).unwrap();
    assert_eq!(cmd, ChainCommand::Finish);
    assert_eq!(c.state(), FireState::AllDaysDone);

    let report = c.into_report();
    assert_eq!(report.steps.len(), 3);
    assert_eq!(report.steps[0].kind, StepKind::Grid);
    assert_eq!(report.steps[1].result, StepResult::Skipped);
}

#[test]
fn fire_without_days_finishes_after_grid() {
    let mut c = chain(&[]);
    c.handle(ChainEvent::SlotAcquired).unwrap();
    let cmd = c.handle(ChainEvent::StepFinished(StepResult::Skipped)).unwrap();
    assert_eq!(cmd, ChainCommand::Finish);
    assert_eq!(c.state(), FireState::AllDaysDone);
}

#[test]
fn grid_failure_aborts() {
    let mut c = chain(&DAYS[..2]);
    c.handle(ChainEvent::SlotAcquired).unwrap();
    let cmd = c.handle(ChainEvent::StepFinished(failed())).unwrap();
    assert_eq!(cmd, ChainCommand::Finish);
    assert_eq!(c.state(), FireState::Aborted);

    // Terminal states swallow further events.
    assert_eq!(
        c.handle(ChainEvent::StepFinished(StepResult::Succeeded)).unwrap(),
        ChainCommand::Finish
    );
    assert_eq!(c.state(), FireState::Aborted);
    assert_eq!(c.reports().len(), 1);
}

#[test]
fn grid_dirty_exit_aborts_the_fire() {
    let mut c = chain(&DAYS[..1]);
    c.handle(ChainEvent::SlotAcquired).unwrap();
    let cmd = c
        .handle(ChainEvent::StepFinished(StepResult::Failed(
            Diagnosis::CompletedWithDirtyExit,
        )))
        .unwrap();
    assert_eq!(cmd, ChainCommand::Finish);
    assert_eq!(c.state(), FireState::Aborted);
    assert_eq!(
        c.reports()[0].result,
        StepResult::Failed(Diagnosis::CompletedWithDirtyExit)
    );
}

#[test]
fn upstream_failure_on_grid_aborts() {
    let mut c = chain(&DAYS[..1]);
    c.handle(ChainEvent::SlotAcquired).unwrap();
    c.handle(ChainEvent::StepFinished(StepResult::Failed(
        Diagnosis::UpstreamDataMissing,
    )))
    .unwrap();
    assert_eq!(c.state(), FireState::Aborted);
}

#[test]
fn day_failure_moves_on() {
    let mut c = chain(&DAYS[..2]);
    c.handle(ChainEvent::SlotAcquired).unwrap();
    c.handle(ChainEvent::StepFinished(StepResult::Succeeded)).unwrap();
    let cmd = c.handle(ChainEvent::StepFinished(failed())).unwrap();
    assert_eq!(step_name(&cmd).as_deref(), Some(DAYS[1]));
}

#[test]
fn interrupts() {
    let mut pending = chain(&DAYS[..1]);
    assert_eq!(pending.handle(ChainEvent::Interrupted).unwrap(), ChainCommand::Finish);
    assert_eq!(pending.state(), FireState::Interrupted);
    assert!(pending.reports().is_empty());

    let mut running = chain(&DAYS[..2]);
    running.handle(ChainEvent::SlotAcquired).unwrap();
    running.handle(ChainEvent::StepFinished(StepResult::Succeeded)).unwrap();
    running.handle(ChainEvent::StepFinished(StepResult::Cancelled)).unwrap();
    assert_eq!(running.state(), FireState::Interrupted);
    assert_eq!(running.reports().last().unwrap().result, StepResult::Cancelled);
}

#[test]
fn out_of_order_events_are_rejected() {
    let mut c = chain(&DAYS[..1]);
    let err = c
        .handle(ChainEvent::StepFinished(StepResult::Succeeded))
        .unwrap_err();
    assert_eq!(err.state, FireState::Pending);
    assert_eq!(err.event, "StepFinished");
    assert_eq!(c.state(), FireState::Pending);

    c.handle(ChainEvent::SlotAcquired).unwrap();
    assert!(c.handle(ChainEvent::SlotAcquired).is_err());
}

fn result_strategy() -> impl Strategy<Value = StepResult> {
    prop_oneof![
        Just(StepResult::Skipped),
        Just(StepResult::Succeeded),
        Just(StepResult::Cancelled),
        Just(StepResult::Failed(Diagnosis::UpstreamDataMissing)),
        Just(StepResult::Failed(Diagnosis::CompletedWithDirtyExit)),
        Just(failed()),
    ]
}

proptest! {
    #[test]
    fn chain_always_terminates_in_order(
        num_days in 0..DAYS.len(),
        results in proptest::collection::vec(result_strategy(), DAYS.len() + 1),
    ) {
        let days = &DAYS[..num_days];
        let mut c = chain(days);
        let mut command = c.handle(ChainEvent::SlotAcquired).unwrap();
        let mut ran = Vec::new();
        let mut outcomes = results.into_iter();

        while let Some(name) = step_name(&command) {
            ran.push(name);
            let result = outcomes.next().expect("one result per step");
            command = c.handle(ChainEvent::StepFinished(result)).unwrap();
        }

        prop_assert!(c.state().is_terminal());
        prop_assert!(ran.len() <= num_days + 1);
        prop_assert_eq!(ran[0].as_str(), "geogrid");
        // Days run in ascending order, each at most once.
        prop_assert!(ran[1..].iter().zip(days).all(|(ran, day)| ran == day));

        let report = c.into_report();
        prop_assert_eq!(report.steps.len(), ran.len());
        let grid = &report.steps[0].result;
        match report.state {
            FireState::Aborted => {
                prop_assert!(matches!(grid, StepResult::Failed(_)));
                prop_assert_eq!(ran.len(), 1);
            }
            FireState::AllDaysDone => {
                prop_assert!(matches!(grid, StepResult::Skipped | StepResult::Succeeded));
                prop_assert_eq!(ran.len(), num_days + 1);
            }
            FireState::Interrupted => {
                prop_assert_eq!(&report.steps.last().unwrap().result, &StepResult::Cancelled);
            }
            other => prop_assert!(false, "non-terminal final state {other}"),
        }
    }
}
