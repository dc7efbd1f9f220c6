// src/fire/source.rs

use std::fs;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use crate::errors::{Result, WildfireError};
use crate::fire::record::FireRecord;
use crate::fire::states::normalize_state;

/// Columns written to the filtered fire table.
const COLUMNS: [&str; 6] = ["fire_id", "start_date", "end_date", "lat", "lon", "state_name"];

/// Which fires to run.
///
/// Empty `states` / `fire_ids` mean "no filter". When both are given a fire
/// must match both.
#[derive(Debug, Clone, Default)]
pub struct FireQuery {
    pub states: Vec<String>,
    pub fire_ids: Vec<String>,
    pub max_fires: Option<usize>,
}

/// Load the fire table at `path` and apply `query`.
///
/// A missing table is fatal for the whole run.
pub fn load_fires(path: &Path, query: &FireQuery) -> Result<Vec<FireRecord>> {
    if !path.is_file() {
        return Err(WildfireError::FireSource(format!(
            "fire table not found: {}",
            path.display()
        )));
    }

    let file = fs::File::open(path)?;
    let records = read_fires(file)?;
    info!(path = %path.display(), total = records.len(), "loaded fire table");

    filter_fires(records, query)
}

/// Parse fire records from CSV with a header row.
pub fn read_fires<R: Read>(reader: R) -> Result<Vec<FireRecord>> {
    let mut reader = csv::Reader::from_reader(reader);

    let headers = reader.headers()?.clone();
    for required in ["fire_id", "start_date", "end_date", "lat", "lon"] {
        if !headers.iter().any(|h| h == required) {
            return Err(WildfireError::FireSource(format!(
                "fire table is missing required column '{required}'"
            )));
        }
    }

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: FireRecord = row?;
        records.push(record);
    }
    Ok(records)
}

/// Apply state / fire-ID filters and the `max_fires` cap, keeping table
/// order.
pub fn filter_fires(records: Vec<FireRecord>, query: &FireQuery) -> Result<Vec<FireRecord>> {
    let states = query
        .states
        .iter()
        .map(|s| normalize_state(s).ok_or_else(|| WildfireError::InvalidState(s.clone())))
        .collect::<Result<Vec<_>>>()?;

    let mut selected: Vec<FireRecord> = records
        .into_iter()
        .filter(|fire| {
            states.is_empty()
                || states
                    .iter()
                    .any(|state| fire.state_name.trim().eq_ignore_ascii_case(state))
        })
        .filter(|fire| query.fire_ids.is_empty() || query.fire_ids.contains(&fire.fire_id))
        .collect();

    if let Some(max) = query.max_fires {
        selected.truncate(max);
    }

    debug!(
        selected = selected.len(),
        states = ?states,
        fire_ids = ?query.fire_ids,
        "filtered fire table"
    );
    Ok(selected)
}

/// Write the selected fires back out as CSV.
pub fn write_fires(path: &Path, records: &[FireRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    // `serialize` only emits the header with the first row.
    if records.is_empty() {
        writer.write_record(COLUMNS)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
