// tests/process_launcher.rs

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use wildfire_wrf::config::load_and_validate;
use wildfire_wrf::dispatch::{CancelToken, ProcessLauncher, StepLauncher, StepOutcome};
use wildfire_wrf::layout::Layout;
use wildfire_wrf_test_utils::builders::{TestWorkspace, fire_plan};
use wildfire_wrf_test_utils::{init_tracing, with_timeout};

fn script(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

#[tokio::test]
async fn passes_step_arguments_to_the_script() {
    init_tracing();
    let ws = TestWorkspace::new();
    let layout = ws.layout();
    let out = ws.home().join("args.txt");
    let run = script(
        ws.home(),
        "run.sh",
        &format!("echo \"$@\" > {}\n", out.display()),
    );
    let plan = fire_plan(&layout, "CA_001", &["20200816_06"]);
    let launcher = ProcessLauncher::new("sh", &run).with_working_dir(ws.home());

    let outcome = with_timeout(launcher.launch(&plan.days()[0], CancelToken::never())).await;
    assert_eq!(outcome, StepOutcome::Success);

    let args = fs::read_to_string(&out).unwrap();
    let config = layout
        .day_template_dir("CA_001", "20200816_06")
        .join("wrf.yaml");
    assert_eq!(
        args.trim(),
        format!("20200816_06 {} CA_001 WPS/WRF", config.display())
    );

    let line = launcher.command_line(plan.grid());
    assert_eq!(line[0], "sh");
    assert_eq!(line.last().map(String::as_str), Some("Geogrid"));
}

#[tokio::test]
async fn non_zero_exit_is_reported() {
    let ws = TestWorkspace::new();
    let run = script(ws.home(), "run.sh", "echo failing >&2\nexit 3\n");
    let plan = fire_plan(&ws.layout(), "CA_001", &["20200816_06"]);
    let launcher = ProcessLauncher::new("sh", &run);

    let outcome = with_timeout(launcher.launch(plan.grid(), CancelToken::never())).await;
    assert_eq!(outcome, StepOutcome::Failed(3));
    assert_eq!(outcome.error_message().as_deref(), Some("exited with code 3"));
}

#[tokio::test]
async fn missing_shell_is_a_spawn_failure() {
    let ws = TestWorkspace::new();
    let plan = fire_plan(&ws.layout(), "CA_001", &["20200816_06"]);
    let launcher = ProcessLauncher::new("/definitely/not/a/shell", "run.sh");

    let outcome = with_timeout(launcher.launch(plan.grid(), CancelToken::never())).await;
    assert!(matches!(outcome, StepOutcome::SpawnFailed(_)), "got {outcome:?}");
    assert!(outcome.error_message().unwrap().starts_with("could not run"));
}

#[tokio::test]
async fn interrupt_kills_the_running_script() {
    let ws = TestWorkspace::new();
    let run = script(ws.home(), "run.sh", "sleep 30\n");
    let plan = fire_plan(&ws.layout(), "CA_001", &["20200816_06"]);
    let launcher = ProcessLauncher::new("sh", &run);
    let (tx, cancel) = CancelToken::channel();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = tx.send(true);
    });

    let started = Instant::now();
    let outcome = with_timeout(launcher.launch(plan.grid(), cancel)).await;
    assert_eq!(outcome, StepOutcome::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn relative_home_dir_still_finds_the_run_script() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("wf/wildfireTS_wrapper")).unwrap();
    fs::write(dir.path().join("wf/wildfireTS_wrapper/run.sh"), "exit 0\n").unwrap();
    let config = dir.path().join("Wildfire.toml");
    fs::write(&config, "[paths]\nhome_dir = \"wf\"\n").unwrap();

    let cfg = load_and_validate(&config).unwrap();
    let plan = fire_plan(&Layout::from_config(&cfg), "CA_001", &["20200816_06"]);
    let launcher = ProcessLauncher::new("sh", &cfg.scripts.run).with_working_dir(&cfg.paths.home_dir);

    let outcome = with_timeout(launcher.launch(plan.grid(), CancelToken::never())).await;
    assert_eq!(outcome, StepOutcome::Success);
}
