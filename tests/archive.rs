// tests/archive.rs

use std::error::Error;
use std::fs;
use std::path::Path;

use wildfire_wrf::archive::{ArchiveReport, OutputArchiver, OutputMetadata, extract_metadata};
use wildfire_wrf_test_utils::{count_entries, init_tracing};

type TestResult = Result<(), Box<dyn Error>>;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn metadata_comes_from_fire_wrf_day_paths() {
    assert_eq!(
        extract_metadata(Path::new("CA_014/wrf/20200816_06/wrfout_d01_2020-08-16_06:00:00")),
        Some(OutputMetadata {
            fire_id: "CA_014".to_string(),
            day: "20200816_06".to_string(),
            file_name: "wrfout_d01_2020-08-16_06:00:00".to_string(),
        })
    );
    assert_eq!(extract_metadata(Path::new("CA_014/wps/20200816_06/wrfout_x")), None);
    assert_eq!(extract_metadata(Path::new("CA_014/wrf/wrfout_x")), None);
    assert_eq!(extract_metadata(Path::new("CA_014/wrf/20200816_06/sub/wrfout_x")), None);
    assert_eq!(extract_metadata(Path::new("/CA_014/wrf/20200816_06/wrfout_x")), None);
}

#[test]
fn copies_outputs_into_fire_day_tree() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let scratch = dir.path().join("scratch");
    let archive = dir.path().join("archive");

    write(&scratch.join("A/wrf/20200816_06/wrfout_d01_000"), "a0");
    write(&scratch.join("A/wrf/20200816_06/wrfout_d01_001"), "a1");
    write(&scratch.join("A/wrf/20200817_06/wrfout_d01_000"), "a2");
    write(&scratch.join("B/wrf/20200816_06/wrfout_d01_000"), "b0");
    write(&scratch.join("A/wrf/20200816_06/rsl.out.0000"), "log");
    write(&scratch.join("A/wps/geogrid/geo_em.d01.nc"), "geo");

    let report = OutputArchiver::new(&scratch, &archive, "wrfout").archive()?;

    assert_eq!(
        report,
        ArchiveReport {
            copied: 4,
            unchanged: 0,
            skipped: 0,
            failed: 0,
        }
    );
    assert_eq!(
        fs::read_to_string(archive.join("A/20200816_06/wrfout_d01_001"))?,
        "a1"
    );
    assert_eq!(count_entries(&archive.join("A/20200816_06")), 2);
    assert_eq!(count_entries(&archive.join("A/20200817_06")), 1);
    assert_eq!(count_entries(&archive.join("B/20200816_06")), 1);

    // Sources stay where they were.
    assert!(scratch.join("A/wrf/20200816_06/wrfout_d01_000").is_file());
    Ok(())
}

#[test]
fn second_pass_leaves_identical_files_alone() -> TestResult {
    let dir = tempfile::tempdir()?;
    let scratch = dir.path().join("scratch");
    let archive = dir.path().join("archive");
    let archiver = OutputArchiver::new(&scratch, &archive, "wrfout");

    write(&scratch.join("A/wrf/20200816_06/wrfout_d01_000"), "first");
    write(&scratch.join("A/wrf/20200816_06/wrfout_d01_001"), "same");
    assert_eq!(archiver.archive()?.copied, 2);

    let second = archiver.archive()?;
    assert_eq!(second.copied, 0);
    assert_eq!(second.unchanged, 2);

    // Same size, different content: copied again.
    write(&scratch.join("A/wrf/20200816_06/wrfout_d01_000"), "later");
    let third = archiver.archive()?;
    assert_eq!(third.copied, 1);
    assert_eq!(third.unchanged, 1);
    assert_eq!(
        fs::read_to_string(archive.join("A/20200816_06/wrfout_d01_000"))?,
        "later"
    );
    Ok(())
}

#[test]
fn malformed_paths_are_skipped() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let scratch = dir.path().join("scratch");
    let archive = dir.path().join("archive");

    write(&scratch.join("wrfout_stray"), "x");
    write(&scratch.join("A/wrf/wrfout_no_day"), "x");
    write(&scratch.join("A/wrf/20200816_06/nested/wrfout_deep"), "x");
    write(&scratch.join("A/wrf/20200816_06/wrfout_ok"), "x");

    let report = OutputArchiver::new(&scratch, &archive, "wrfout").archive()?;

    assert_eq!(report.copied, 1);
    assert_eq!(report.skipped, 3);
    assert!(archive.join("A/20200816_06/wrfout_ok").is_file());
    Ok(())
}

#[test]
fn archive_and_state_dirs_inside_scratch_are_not_rescanned() -> TestResult {
    let dir = tempfile::tempdir()?;
    let scratch = dir.path().join("scratch");
    let archive = scratch.join("archive");

    write(&scratch.join("A/wrf/20200816_06/wrfout_d01_000"), "x");
    write(&scratch.join(".wildfire/wrfout_ledger_copy"), "x");

    let archiver = OutputArchiver::new(&scratch, &archive, "wrfout");
    let first = archiver.archive()?;
    assert_eq!(first.copied, 1);
    assert_eq!(first.skipped, 0);

    // The archived copy under scratch/archive/A/20200816_06 must not be
    // picked up as a malformed source.
    let second = archiver.archive()?;
    assert_eq!(second.unchanged, 1);
    assert_eq!(second.skipped, 0);
    Ok(())
}

#[test]
fn missing_scratch_dir_is_an_empty_report() -> TestResult {
    let dir = tempfile::tempdir()?;
    let report =
        OutputArchiver::new(dir.path().join("nope"), dir.path().join("archive"), "wrfout").archive()?;
    assert_eq!(report, ArchiveReport::default());
    assert!(!dir.path().join("archive").exists());
    Ok(())
}
