// tests/fire_source.rs

use std::error::Error;

use wildfire_wrf::errors::WildfireError;
use wildfire_wrf::fire::{FireQuery, filter_fires, load_fires, normalize_state, read_fires};
use wildfire_wrf_test_utils::builders::{FireRecordBuilder, TestWorkspace};

type TestResult = Result<(), Box<dyn Error>>;

const TABLE: &str = "\
fire_id,start_date,end_date,lat,lon,state_name,acres
WA_001,2020-09-07,2020-09-09,47.1,-120.5,Washington,1200
CA_014,2020-08-16 06:00:00,2020-08-17 06:00:00,38.5,-122.25,California,90000
OR_002,2020-09-08,2020-09-08,44.9,-122.2,Oregon,400
CA_020,2020-09-01,2020-09-04,36.2,-118.8,california,50
";

#[test]
fn reads_table_with_extra_columns() -> TestResult {
    let fires = read_fires(TABLE.as_bytes())?;

    assert_eq!(fires.len(), 4);
    assert_eq!(fires[0].fire_id, "WA_001");
    assert_eq!(fires[1].lat, 38.5);
    assert_eq!(fires[1].lon, -122.25);
    assert_eq!(fires[3].state_name, "california");
    Ok(())
}

#[test]
fn missing_required_column_is_a_source_error() {
    let err = read_fires("fire_id,start_date,lat,lon\nX,2020-01-01,1,2\n".as_bytes())
        .unwrap_err();
    assert!(matches!(err, WildfireError::FireSource(ref m) if m.contains("end_date")));
}

#[test]
fn day_labels_are_inclusive_and_keep_start_hour() -> TestResult {
    let fires = read_fires(TABLE.as_bytes())?;

    assert_eq!(
        fires[0].day_labels(),
        vec!["20200907_00", "20200908_00", "20200909_00"]
    );
    assert_eq!(fires[1].day_labels(), vec!["20200816_06", "20200817_06"]);
    assert_eq!(fires[2].day_labels(), vec!["20200908_00"]);
    Ok(())
}

#[test]
fn reversed_range_has_no_days() {
    let fire = FireRecordBuilder::new("X")
        .start("2020-09-05")
        .end("2020-09-01")
        .build();
    assert!(fire.day_labels().is_empty());
}

#[test]
fn state_filter_accepts_names_and_abbreviations() -> TestResult {
    let fires = read_fires(TABLE.as_bytes())?;

    let query = FireQuery {
        states: vec!["ca".to_string(), "Washington".to_string()],
        ..FireQuery::default()
    };
    let selected = filter_fires(fires, &query)?;
    let ids: Vec<_> = selected.iter().map(|f| f.fire_id.as_str()).collect();

    assert_eq!(ids, vec!["WA_001", "CA_014", "CA_020"]);
    Ok(())
}

#[test]
fn unknown_state_is_fatal() -> TestResult {
    let fires = read_fires(TABLE.as_bytes())?;
    let query = FireQuery {
        states: vec!["Atlantis".to_string()],
        ..FireQuery::default()
    };

    let err = filter_fires(fires, &query).unwrap_err();
    assert!(matches!(err, WildfireError::InvalidState(ref s) if s == "Atlantis"));
    Ok(())
}

#[test]
fn fire_id_filter_and_cap_combine_with_state_filter() -> TestResult {
    let fires = read_fires(TABLE.as_bytes())?;
    let query = FireQuery {
        states: vec!["CA".to_string()],
        fire_ids: vec!["CA_020".to_string(), "WA_001".to_string()],
        max_fires: None,
    };
    let selected = filter_fires(fires.clone(), &query)?;
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].fire_id, "CA_020");

    let capped = filter_fires(
        fires,
        &FireQuery {
            max_fires: Some(2),
            ..FireQuery::default()
        },
    )?;
    let ids: Vec<_> = capped.iter().map(|f| f.fire_id.as_str()).collect();
    assert_eq!(ids, vec!["WA_001", "CA_014"]);
    Ok(())
}

#[test]
fn missing_table_is_fatal() {
    let err = load_fires(
        std::path::Path::new("/no/such/all_fires.csv"),
        &FireQuery::default(),
    )
    .unwrap_err();
    assert!(matches!(err, WildfireError::FireSource(_)));
}

#[test]
fn written_table_reads_back() -> TestResult {
    let ws = TestWorkspace::new();
    let fires = vec![
        FireRecordBuilder::new("A").days(2).build(),
        FireRecordBuilder::new("B").state("Oregon").build(),
    ];
    ws.write_fires(&fires);

    let loaded = load_fires(&ws.fires_csv(), &FireQuery::default())?;
    assert_eq!(loaded, fires);
    Ok(())
}

#[test]
fn empty_selection_still_has_a_header() -> TestResult {
    let ws = TestWorkspace::new();
    let loaded = load_fires(&ws.fires_csv(), &FireQuery::default())?;
    assert!(loaded.is_empty());
    Ok(())
}

#[test]
fn normalize_state_table() {
    assert_eq!(normalize_state("wa"), Some("Washington"));
    assert_eq!(normalize_state(" new mexico "), Some("New Mexico"));
    assert_eq!(normalize_state("XX"), None);
}
