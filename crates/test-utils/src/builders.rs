#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use tempfile::TempDir;
use wildfire_wrf::config::{ConfigFile, RawConfigFile};
use wildfire_wrf::fire::record::timestamp;
use wildfire_wrf::fire::{FireRecord, write_fires};
use wildfire_wrf::layout::Layout;
use wildfire_wrf::plan::{FirePlan, Step};
use wildfire_wrf::types::LedgerMode;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the defaults rooted at `home`, with the log settle delay
/// turned off so failure tests don't sleep.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        let mut config = RawConfigFile::rooted_at(home);
        config.diagnostics.settle_delay = "0ms".to_string();
        Self { config }
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.config.limits.max_workers = n;
        self
    }

    pub fn max_fires(mut self, n: usize) -> Self {
        self.config.limits.max_fires = n;
        self
    }

    pub fn max_days(mut self, n: usize) -> Self {
        self.config.limits.max_days = n;
        self
    }

    pub fn day_threshold(mut self, n: usize) -> Self {
        self.config.completion.day_threshold = n;
        self
    }

    pub fn grid_threshold(mut self, n: usize) -> Self {
        self.config.completion.grid_threshold = n;
        self
    }

    pub fn ledger(mut self, mode: LedgerMode) -> Self {
        self.config.completion.ledger = mode;
        self
    }

    pub fn settle_delay(mut self, delay: &str) -> Self {
        self.config.diagnostics.settle_delay = delay.to_string();
        self
    }

    pub fn step_timeout(mut self, timeout: &str) -> Self {
        self.config.dispatch.step_timeout = Some(timeout.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

/// Builder for `FireRecord`.
pub struct FireRecordBuilder {
    record: FireRecord,
}

impl FireRecordBuilder {
    pub fn new(fire_id: &str) -> Self {
        let start = timestamp::parse("2020-08-16 06:00:00").expect("valid timestamp");
        Self {
            record: FireRecord {
                fire_id: fire_id.to_string(),
                start_date: start,
                end_date: start,
                lat: 38.5,
                lon: -122.25,
                state_name: "California".to_string(),
            },
        }
    }

    pub fn start(mut self, ts: &str) -> Self {
        let start = timestamp::parse(ts).expect("valid start timestamp");
        let span = self.record.end_date - self.record.start_date;
        self.record.start_date = start;
        self.record.end_date = start + span;
        self
    }

    pub fn end(mut self, ts: &str) -> Self {
        self.record.end_date = timestamp::parse(ts).expect("valid end timestamp");
        self
    }

    /// Simulate `n` days starting at the start date.
    pub fn days(mut self, n: usize) -> Self {
        let extra = n.saturating_sub(1) as i64;
        self.record.end_date = self.record.start_date + TimeDelta::days(extra);
        self
    }

    pub fn at(mut self, lat: f64, lon: f64) -> Self {
        self.record.lat = lat;
        self.record.lon = lon;
        self
    }

    pub fn state(mut self, name: &str) -> Self {
        self.record.state_name = name.to_string();
        self
    }

    pub fn build(self) -> FireRecord {
        self.record
    }
}


/// A plan for `fire_id` with the given days, without touching the disk.
pub fn fire_plan(layout: &Layout, fire_id: &str, days: &[&str]) -> FirePlan {
    let first = days.first().copied().unwrap_or("20200816_06");
    let grid = Step::grid(
        fire_id,
        first,
        layout.fire_template_dir(fire_id).join("geogrid.yaml"),
        layout.log_path(fire_id, first),
    );
    let steps = days
        .iter()
        .map(|day| {
            Step::simulation(
                fire_id,
                *day,
                layout.day_template_dir(fire_id, day).join("wrf.yaml"),
                layout.log_path(fire_id, day),
            )
        })
        .collect();
    FirePlan::new(grid, steps).expect("valid fire plan")
}

pub const MASTER_NAMELIST: &str = "\
&share
 wrf_core = 'ARW',
 max_dom = 1,
 opt_output_from_geogrid_path = './',
/

&geogrid
 e_we = 100,
 e_sn = 100,
 map_proj = 'lambert',
 ref_lat = 0.0,
 ref_lon = 0.0,
 truelat1 = 0.0,
 truelat2 = 0.0,
 stand_lon = 0.0,
 geog_data_path = '/glade/geog',
/

&ungrib
 out_format = 'WPS',
 prefix = 'FILE',
/

&metgrid
 fg_name = 'FILE',
 opt_output_from_metgrid_path = './',
/
";

pub const MASTER_RUN_YAML: &str = "\
grib_dir: /placeholder/grib
template_dir: /placeholder/templates
wps_run_dir: /placeholder/wps
wrf_run_dir: /placeholder/wrf
icbc_model: HRRR
num_procs: 128
";

pub const MASTER_SUBMIT: &str = "\
#!/bin/bash
#PBS -N wps
#PBS -q main@desched1
#PBS -l walltime=01:00:00
python run_wps.py
";

/// A throwaway workflow home with master templates and a fire table.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    /// Home directory with every master template in place and an empty
    /// fire table.
    pub fn new() -> Self {
        let ws = Self::bare();
        let master = ws.layout().master_dir();
        fs::create_dir_all(&master).expect("create master dir");
        fs::write(master.join("geogridonly.yaml"), MASTER_RUN_YAML).expect("write master");
        fs::write(master.join("wrfonly.yaml"), MASTER_RUN_YAML).expect("write master");
        fs::write(master.join("namelist.wps.hrrr"), MASTER_NAMELIST).expect("write master");
        fs::write(master.join("namelist.input.hrrr"), "&time_control\n/\n").expect("write master");
        fs::write(master.join("submit_wps.sh"), MASTER_SUBMIT).expect("write master");
        ws.write_fires(&[]);
        ws
    }

    /// Home directory with nothing in it.
    pub fn bare() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn home(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> ConfigFileBuilder {
        ConfigFileBuilder::new(self.home())
    }

    /// Layout matching the default `ConfigFile` for this home.
    pub fn layout(&self) -> Layout {
        Layout::new(
            self.home(),
            self.home().join("scratch"),
            self.home().join("data"),
            self.home().join("archive"),
        )
    }

    pub fn fires_csv(&self) -> PathBuf {
        self.home()
            .join("wildfireTS_wrapper/fire_query/all_fires.csv")
    }

    pub fn write_fires(&self, fires: &[FireRecord]) {
        write_fires(&self.fires_csv(), fires).expect("write fire table");
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
