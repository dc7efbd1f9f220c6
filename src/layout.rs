// src/layout.rs

//! On-disk layout shared with the external WPS/WRF scripts and downstream
//! tooling. Every path the pipeline reads or writes is derived here.
//!
//! ```text
//! <home>/templates/master/                 master templates (read-only)
//! <home>/templates/<fire>/                 grid config for the fire
//! <home>/templates/<fire>/<day>/           per-day simulation config
//! <home>/logs/<fire>/<label>.log           step logs written by the scripts
//! <scratch>/<fire>/wps/geogrid/            grid output
//! <scratch>/<fire>/wps/<day>/              ungrib/metgrid work dirs
//! <scratch>/<fire>/wrf/<day>/              simulation output
//! <data>/<fire>/                           downloaded input data
//! <archive>/<fire>/<day>/<file>            archived simulation output
//! ```

use std::path::{Path, PathBuf};

use crate::config::ConfigFile;

/// Name of the grid-output directory under `<scratch>/<fire>/wps/`.
pub const GEOGRID_DIR: &str = "geogrid";

/// Directory under the scratch root holding run bookkeeping.
pub const STATE_DIR: &str = ".wildfire";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    home_dir: PathBuf,
    scratch_dir: PathBuf,
    data_dir: PathBuf,
    archive_dir: PathBuf,
}

impl Layout {
    pub fn new(
        home_dir: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
        archive_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            home_dir: home_dir.into(),
            scratch_dir: scratch_dir.into(),
            data_dir: data_dir.into(),
            archive_dir: archive_dir.into(),
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(
            &cfg.paths.home_dir,
            &cfg.paths.scratch_dir,
            &cfg.paths.data_dir,
            &cfg.paths.archive_dir,
        )
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    pub fn master_dir(&self) -> PathBuf {
        self.home_dir.join("templates").join("master")
    }

    pub fn fire_template_dir(&self, fire_id: &str) -> PathBuf {
        self.home_dir.join("templates").join(fire_id)
    }

    pub fn day_template_dir(&self, fire_id: &str, day: &str) -> PathBuf {
        self.fire_template_dir(fire_id).join(day)
    }

    pub fn wps_dir(&self, fire_id: &str) -> PathBuf {
        self.scratch_dir.join(fire_id).join("wps")
    }

    pub fn wps_day_dir(&self, fire_id: &str, day: &str) -> PathBuf {
        self.wps_dir(fire_id).join(day)
    }

    pub fn geogrid_dir(&self, fire_id: &str) -> PathBuf {
        self.wps_dir(fire_id).join(GEOGRID_DIR)
    }

    pub fn wrf_dir(&self, fire_id: &str) -> PathBuf {
        self.scratch_dir.join(fire_id).join("wrf")
    }

    pub fn wrf_day_dir(&self, fire_id: &str, day: &str) -> PathBuf {
        self.wrf_dir(fire_id).join(day)
    }

    pub fn grib_dir(&self, fire_id: &str) -> PathBuf {
        self.data_dir.join(fire_id)
    }

    /// Log written by the run script; `label` is the day argument it was
    /// launched with.
    pub fn log_path(&self, fire_id: &str, label: &str) -> PathBuf {
        self.home_dir
            .join("logs")
            .join(fire_id)
            .join(format!("{label}.log"))
    }

    pub fn archive_day_dir(&self, fire_id: &str, day: &str) -> PathBuf {
        self.archive_dir.join(fire_id).join(day)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.scratch_dir.join(STATE_DIR).join("ledger")
    }
}
