// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::LedgerMode;

/// Configuration exactly as read from the TOML file.
///
/// ```toml
/// [paths]
/// home_dir = "/glade/u/home/me/wps_wrf_workflow"
/// scratch_dir = "/glade/derecho/scratch/me/workflow"
/// data_dir = "/glade/derecho/scratch/me/data"
///
/// [limits]
/// max_workers = 3
///
/// [completion]
/// day_threshold = 30
/// ```
///
/// Only `[paths].home_dir` is required. Everything else has a default
/// matching the production pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub paths: PathsSection,

    #[serde(default)]
    pub scripts: ScriptsSection,

    #[serde(default)]
    pub limits: LimitsSection,

    #[serde(default)]
    pub completion: CompletionSection,

    #[serde(default)]
    pub diagnostics: DiagnosticsSection,

    #[serde(default)]
    pub dispatch: DispatchSection,

    #[serde(default)]
    pub archive: ArchiveSection,
}

impl RawConfigFile {
    /// A config with every section at its default, rooted at `home_dir`.
    pub fn rooted_at(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            paths: PathsSection::rooted_at(home_dir),
            scripts: ScriptsSection::default(),
            limits: LimitsSection::default(),
            completion: CompletionSection::default(),
            diagnostics: DiagnosticsSection::default(),
            dispatch: DispatchSection::default(),
            archive: ArchiveSection::default(),
        }
    }
}

/// `[paths]` section. Relative paths are resolved against `home_dir`.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    /// Workflow home: holds `templates/`, `logs/` and the wrapper scripts.
    pub home_dir: PathBuf,

    /// Run workspace root: `<scratch>/<fire_id>/{wps,wrf}/...`.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Root for downloaded input data, one directory per fire.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Master fire table (CSV).
    #[serde(default = "default_fires_csv")]
    pub fires_csv: PathBuf,

    /// Where the filtered fire table for this run is written.
    #[serde(default = "default_filtered_csv")]
    pub filtered_csv: PathBuf,

    /// Archive root: `<archive>/<fire_id>/<day>/<file>`.
    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,
}

impl PathsSection {
    pub fn rooted_at(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
            scratch_dir: default_scratch_dir(),
            data_dir: default_data_dir(),
            fires_csv: default_fires_csv(),
            filtered_csv: default_filtered_csv(),
            archive_dir: default_archive_dir(),
        }
    }
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("scratch")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_fires_csv() -> PathBuf {
    PathBuf::from("wildfireTS_wrapper/fire_query/all_fires.csv")
}

fn default_filtered_csv() -> PathBuf {
    PathBuf::from("wildfireTS_wrapper/filtered_fires.csv")
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from("archive")
}

/// `[scripts]` section: the external launchers.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptsSection {
    /// Interpreter used to launch the scripts.
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Real WPS/WRF runner.
    #[serde(default = "default_run_script")]
    pub run: PathBuf,

    /// No-op runner used by `--dry-run`.
    #[serde(default = "default_test_script")]
    pub test: PathBuf,
}

fn default_shell() -> String {
    "bash".to_string()
}

fn default_run_script() -> PathBuf {
    PathBuf::from("wildfireTS_wrapper/run.sh")
}

fn default_test_script() -> PathBuf {
    PathBuf::from("wildfireTS_wrapper/test.sh")
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            run: default_run_script(),
            test: default_test_script(),
        }
    }
}

/// `[limits]` section. Each value can be overridden from the CLI.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimitsSection {
    /// Fires whose step chains may run at the same time.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    #[serde(default = "default_max_fires")]
    pub max_fires: usize,

    #[serde(default = "default_max_days")]
    pub max_days: usize,
}

fn default_max_workers() -> usize {
    3
}

fn default_max_fires() -> usize {
    6
}

fn default_max_days() -> usize {
    31
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            max_fires: default_max_fires(),
            max_days: default_max_days(),
        }
    }
}

/// `[completion]` section: what counts as "this step already ran".
///
/// The day threshold reflects the number of output snapshots one simulated
/// day produces at the configured history interval; change it together with
/// the WRF namelist.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionSection {
    /// Glob matched against file names in `<scratch>/<fire>/wps/geogrid/`.
    #[serde(default = "default_grid_pattern")]
    pub grid_pattern: String,

    #[serde(default = "default_grid_threshold")]
    pub grid_threshold: usize,

    /// Glob matched against file names in `<scratch>/<fire>/wrf/<day>/`.
    #[serde(default = "default_day_pattern")]
    pub day_pattern: String,

    #[serde(default = "default_day_threshold")]
    pub day_threshold: usize,

    #[serde(default)]
    pub ledger: LedgerMode,
}

fn default_grid_pattern() -> String {
    "geo_em.d*".to_string()
}

fn default_grid_threshold() -> usize {
    1
}

fn default_day_pattern() -> String {
    "wrfout*".to_string()
}

fn default_day_threshold() -> usize {
    30
}

impl Default for CompletionSection {
    fn default() -> Self {
        Self {
            grid_pattern: default_grid_pattern(),
            grid_threshold: default_grid_threshold(),
            day_pattern: default_day_pattern(),
            day_threshold: default_day_threshold(),
            ledger: LedgerMode::default(),
        }
    }
}

/// `[diagnostics]` section: failure classification rules.
#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticsSection {
    /// Number of trailing log lines inspected.
    #[serde(default = "default_log_tail_lines")]
    pub log_tail_lines: usize,

    /// Wait before reading the log, e.g. `"1s"` or `"500ms"`.
    #[serde(default = "default_settle_delay")]
    pub settle_delay: String,

    /// Log substrings showing the input-data download failed.
    #[serde(default = "default_upstream_markers")]
    pub upstream_markers: Vec<String>,

    /// Log substrings showing the simulation main routine was reached.
    #[serde(default = "default_main_routine_markers")]
    pub main_routine_markers: Vec<String>,
}

fn default_log_tail_lines() -> usize {
    10
}

fn default_settle_delay() -> String {
    "1s".to_string()
}

fn default_upstream_markers() -> Vec<String> {
    vec!["download_hrrr_from_aws_or_gc.py".to_string()]
}

fn default_main_routine_markers() -> Vec<String> {
    vec!["run_wrf.py".to_string()]
}

impl Default for DiagnosticsSection {
    fn default() -> Self {
        Self {
            log_tail_lines: default_log_tail_lines(),
            settle_delay: default_settle_delay(),
            upstream_markers: default_upstream_markers(),
            main_routine_markers: default_main_routine_markers(),
        }
    }
}

/// `[dispatch]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispatchSection {
    /// Kill a step that runs longer than this (e.g. `"6h"`). Unset means no
    /// limit.
    #[serde(default)]
    pub step_timeout: Option<String>,
}

/// `[archive]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveSection {
    /// File-name prefix of simulation outputs to archive.
    #[serde(default = "default_archive_prefix")]
    pub prefix: String,
}

fn default_archive_prefix() -> String {
    "wrfout".to_string()
}

impl Default for ArchiveSection {
    fn default() -> Self {
        Self {
            prefix: default_archive_prefix(),
        }
    }
}

/// Diagnostics settings after validation.
#[derive(Debug, Clone)]
pub struct DiagnosticsSettings {
    pub log_tail_lines: usize,
    pub settle_delay: Duration,
    pub upstream_markers: Vec<String>,
    pub main_routine_markers: Vec<String>,
}

/// Dispatch settings after validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchSettings {
    pub step_timeout: Option<Duration>,
}

/// Validated configuration: paths are resolved and durations parsed.
///
/// Build one with `ConfigFile::try_from(raw)` or
/// [`crate::config::load_and_validate`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub paths: PathsSection,
    pub scripts: ScriptsSection,
    pub limits: LimitsSection,
    pub completion: CompletionSection,
    pub diagnostics: DiagnosticsSettings,
    pub dispatch: DispatchSettings,
    pub archive: ArchiveSection,
}

impl ConfigFile {
    /// Assemble a config without validation. Used by `validate.rs` once all
    /// checks have passed.
    pub(crate) fn new_unchecked(
        paths: PathsSection,
        scripts: ScriptsSection,
        limits: LimitsSection,
        completion: CompletionSection,
        diagnostics: DiagnosticsSettings,
        dispatch: DispatchSettings,
        archive: ArchiveSection,
    ) -> Self {
        Self {
            paths,
            scripts,
            limits,
            completion,
            diagnostics,
            dispatch,
            archive,
        }
    }
}
