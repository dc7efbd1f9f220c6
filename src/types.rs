use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Where completed steps are remembered between oracle checks.
///
/// The filesystem scan is always authoritative; the ledger only records
/// what the scan has already confirmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerMode {
    /// No ledger; every decision is a fresh scan.
    #[default]
    Off,
    /// Ledger kept in memory for the lifetime of the run.
    Memory,
    /// Ledger persisted to `<scratch>/.wildfire/ledger`.
    File,
}

impl FromStr for LedgerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "off" => Ok(LedgerMode::Off),
            "memory" => Ok(LedgerMode::Memory),
            "file" => Ok(LedgerMode::File),
            other => Err(format!(
                "invalid ledger mode: {other} (expected \"off\", \"memory\" or \"file\")"
            )),
        }
    }
}

/// The two kinds of work dispatched for a fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// One-time domain preprocessing shared by every day of the fire.
    Grid,
    /// One simulated day.
    Simulation,
}

impl StepKind {
    /// Label passed to the run script as its last argument.
    pub fn label(self) -> &'static str {
        match self {
            StepKind::Grid => "Geogrid",
            StepKind::Simulation => "WPS/WRF",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
