// tests/classifier.rs

use std::sync::Arc;
use std::time::Duration;

use wildfire_wrf::classify::{Diagnosis, FailureClassifier, LogRules, read_log_tail};
use wildfire_wrf::fs::mock::MockFileSystem;
use wildfire_wrf::layout::Layout;
use wildfire_wrf::oracle::{CompletionOracle, OutputRule};
use wildfire_wrf_test_utils::builders::fire_plan;

fn layout() -> Layout {
    Layout::new("/home", "/scratch", "/data", "/archive")
}

fn classifier(fs: &MockFileSystem) -> FailureClassifier {
    let rules = LogRules::new(&["download_hrrr_from_aws_or_gc.py"], &["run_wrf.py"]).unwrap();
    FailureClassifier::new(rules, 10, Duration::ZERO, Arc::new(fs.clone()))
}

fn oracle(fs: &MockFileSystem) -> CompletionOracle {
    CompletionOracle::new(
        layout(),
        OutputRule::new("geo_em.d*", 1).unwrap(),
        OutputRule::new("wrfout*", 30).unwrap(),
        Arc::new(fs.clone()),
    )
}

fn lines(text: &[&str]) -> Vec<String> {
    text.iter().map(|s| s.to_string()).collect()
}

#[test]
fn upstream_marker_wins() {
    let fs = MockFileSystem::new();
    let c = classifier(&fs);
    let tail = lines(&[
        "Traceback (most recent call last):",
        "  File \"download_hrrr_from_aws_or_gc.py\", line 88, in <module>",
        "  File \"run_wrf.py\", line 10",
    ]);

    // Even with complete output, the upstream rule applies first.
    let diagnosis = c.classify("exited with code 1", tail, || true);
    assert_eq!(diagnosis, Diagnosis::UpstreamDataMissing);
    assert!(diagnosis.is_failure());
}

#[test]
fn main_routine_with_complete_output_is_a_dirty_exit() {
    let fs = MockFileSystem::new();
    let c = classifier(&fs);
    let tail = lines(&["python run_wrf.py -b 20200816_06", "wrf: SUCCESS COMPLETE WRF", "Segmentation fault"]);

    let diagnosis = c.classify("exited with code 139", tail, || true);
    assert_eq!(diagnosis, Diagnosis::CompletedWithDirtyExit);
    assert!(!diagnosis.is_failure());
}

#[test]
fn main_routine_with_incomplete_output_is_unclassified() {
    let fs = MockFileSystem::new();
    let c = classifier(&fs);
    let tail = lines(&["python run_wrf.py", "killed"]);

    let diagnosis = c.classify("exited with code 137", tail.clone(), || false);
    assert_eq!(
        diagnosis,
        Diagnosis::Unclassified {
            error: "exited with code 137".to_string(),
            log_tail: tail,
        }
    );
}

#[test]
fn completion_is_only_checked_when_main_routine_ran() {
    let fs = MockFileSystem::new();
    let c = classifier(&fs);

    let diagnosis = c.classify("exited with code 2", lines(&["ungrib failed"]), || {
        panic!("oracle consulted without main-routine marker")
    });
    assert!(matches!(diagnosis, Diagnosis::Unclassified { .. }));
}

#[test]
fn markers_are_literal() {
    let rules = LogRules::new(&["a.b"], &["(x)"]).unwrap();
    assert!(rules.shows_upstream_failure(&lines(&["see a.b here"])));
    assert!(!rules.shows_upstream_failure(&lines(&["see axb here"])));
    assert!(rules.shows_main_routine(&lines(&["(x)"])));
    assert!(!rules.shows_main_routine(&lines(&["x"])));
}

#[test]
fn log_tail_keeps_last_lines() {
    let fs = MockFileSystem::new();
    let text: String = (1..=25).map(|n| format!("line {n}\n")).collect();
    fs.add_file("/home/logs/F1/20200816_06.log", text);

    let tail = read_log_tail(&fs, std::path::Path::new("/home/logs/F1/20200816_06.log"), 10).unwrap();
    assert_eq!(tail.len(), 10);
    assert_eq!(tail.first().map(String::as_str), Some("line 16"));
    assert_eq!(tail.last().map(String::as_str), Some("line 25"));

    fs.add_file("/home/logs/F1/short.log", "only\n");
    let tail = read_log_tail(&fs, std::path::Path::new("/home/logs/F1/short.log"), 10).unwrap();
    assert_eq!(tail, vec!["only".to_string()]);

    assert!(read_log_tail(&fs, std::path::Path::new("/home/logs/F1/none.log"), 10).is_err());
}

#[tokio::test]
async fn diagnose_reads_log_and_consults_oracle() {
    let fs = MockFileSystem::new();
    let c = classifier(&fs);
    let oracle = oracle(&fs);
    let plan = fire_plan(&layout(), "F1", &["20200816_06"]);
    let day = &plan.days()[0];

    fs.add_file(&day.log_path, "starting\npython run_wrf.py\nexit 1\n");
    fs.add_files("/scratch/F1/wrf/20200816_06", "wrfout_d01_", 31);

    let diagnosis = c.diagnose(day, "exited with code 1", &oracle).await;
    assert_eq!(diagnosis, Diagnosis::CompletedWithDirtyExit);
}

#[tokio::test]
async fn diagnose_without_log_is_unclassified() {
    let fs = MockFileSystem::new();
    let c = classifier(&fs);
    let oracle = oracle(&fs);
    let plan = fire_plan(&layout(), "F1", &["20200816_06"]);

    let diagnosis = c.diagnose(plan.grid(), "exited with code 1", &oracle).await;
    assert_eq!(
        diagnosis,
        Diagnosis::Unclassified {
            error: "exited with code 1".to_string(),
            log_tail: Vec::new(),
        }
    );
}

#[test]
fn tail_survives_invalid_utf8() {
    let fs = MockFileSystem::new();
    let mut log = b"binary junk \xff\xfe from wrf\r\n".to_vec();
    log.extend_from_slice(b"  File \"download_hrrr_from_aws_or_gc.py\", line 42\n");
    fs.add_file("/home/logs/F1/noisy.log", log);

    let tail = read_log_tail(&fs, std::path::Path::new("/home/logs/F1/noisy.log"), 10).unwrap();
    assert_eq!(tail.len(), 2);
    assert!(tail[0].starts_with("binary junk"));
    assert!(tail[0].ends_with("from wrf"));
    assert_eq!(tail[1], "  File \"download_hrrr_from_aws_or_gc.py\", line 42");
}

#[tokio::test]
async fn diagnose_sees_upstream_marker_past_binary_noise() {
    let fs = MockFileSystem::new();
    let c = classifier(&fs);
    let oracle = oracle(&fs);
    let plan = fire_plan(&layout(), "F1", &["20200816_06"]);
    let day = &plan.days()[0];

    let mut log = b"binary junk \xff\xfe from wrf\n".to_vec();
    log.extend_from_slice(b"Traceback (most recent call last):\n");
    log.extend_from_slice(b"  File \"download_hrrr_from_aws_or_gc.py\", line 42\n");
    fs.add_file(&day.log_path, log);

    let diagnosis = c.diagnose(day, "exited with code 1", &oracle).await;
    assert_eq!(diagnosis, Diagnosis::UpstreamDataMissing);
}

#[test]
fn display_is_operator_friendly() {
    assert_eq!(Diagnosis::UpstreamDataMissing.to_string(), "upstream data missing");
    assert_eq!(
        Diagnosis::CompletedWithDirtyExit.to_string(),
        "completed with dirty exit"
    );
    let d = Diagnosis::Unclassified {
        error: "exited with code 3".to_string(),
        log_tail: Vec::new(),
    };
    assert_eq!(d.to_string(), "failed: exited with code 3");
}
