// src/template/materializer.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{debug, info};

use crate::errors::{Result, WildfireError};
use crate::fire::FireRecord;
use crate::layout::Layout;
use crate::template::namelist::{Namelist, NmlValue};
use crate::template::registry::ArtifactRegistry;

pub const GEOGRID_YAML: &str = "geogridonly.yaml";
pub const WRF_YAML: &str = "wrfonly.yaml";
pub const NAMELIST_WPS: &str = "namelist.wps.hrrr";
pub const NAMELIST_INPUT: &str = "namelist.input.hrrr";
pub const SUBMIT_PREFIX: &str = "submit_";

/// Name of the grid config inside `templates/<fire>/`.
pub const GRID_CONFIG: &str = "geogrid.yaml";
/// Name of the day config inside `templates/<fire>/<day>/`.
pub const DAY_CONFIG: &str = "wrf.yaml";

/// Templates that must exist before anything is materialized.
pub const REQUIRED_MASTERS: &[&str] = &[GEOGRID_YAML, WRF_YAML, NAMELIST_WPS, NAMELIST_INPUT];

/// Queue directives rewritten for the derecho copy of each job script.
const PBS_REPLACEMENTS: &[(&str, &str)] = &[
    ("#PBS -q main@desched1", "#PBS -q main"),
    ("#PBS -q casper", "#PBS -q casper-pbs"),
];

/// Writes per-fire grid configs and per-day simulation configs from the
/// master templates.
///
/// Every write overwrites whatever is there, so re-materializing the same
/// fire/day gives the same files regardless of prior state.
#[derive(Debug, Clone)]
pub struct Materializer {
    layout: Layout,
}

impl Materializer {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Fail fast when a required master template is missing.
    pub fn check_masters(&self) -> Result<()> {
        let master_dir = self.layout.master_dir();
        for name in REQUIRED_MASTERS {
            let path = master_dir.join(name);
            if !path.is_file() {
                return Err(WildfireError::MissingTemplate(path));
            }
        }
        Ok(())
    }

    /// Write `templates/<fire>/geogrid.yaml` (plus the namelist and job
    /// scripts it points at) and return its path.
    pub fn materialize_grid(
        &self,
        fire: &FireRecord,
        registry: &mut ArtifactRegistry,
    ) -> Result<PathBuf> {
        let fire_id = fire.fire_id.as_str();
        let template_dir = self.layout.fire_template_dir(fire_id);
        fs::create_dir_all(&template_dir)?;
        registry.record(fire_id, &template_dir);

        self.ensure_run_dirs(fire_id)?;
        self.write_support_files(fire, None, &template_dir)?;

        let yaml = self.edit_run_yaml(GEOGRID_YAML, fire_id, &template_dir)?;
        let path = template_dir.join(GRID_CONFIG);
        fs::write(&path, yaml)?;

        info!(fire_id, path = %path.display(), "materialized grid config");
        Ok(path)
    }

    /// Write `templates/<fire>/<day>/wrf.yaml` (plus the day's namelist and
    /// job scripts) and return its path.
    pub fn materialize_day(
        &self,
        fire: &FireRecord,
        day: &str,
        registry: &mut ArtifactRegistry,
    ) -> Result<PathBuf> {
        let fire_id = fire.fire_id.as_str();
        let template_dir = self.layout.day_template_dir(fire_id, day);
        fs::create_dir_all(&template_dir)?;
        registry.record(fire_id, self.layout.fire_template_dir(fire_id));

        self.ensure_run_dirs(fire_id)?;
        let wps_day = self.layout.wps_day_dir(fire_id, day);
        fs::create_dir_all(wps_day.join("ungrib"))?;
        fs::create_dir_all(wps_day.join("metgrid"))?;

        self.write_support_files(fire, Some(day), &template_dir)?;

        let yaml = self.edit_run_yaml(WRF_YAML, fire_id, &template_dir)?;
        let path = template_dir.join(DAY_CONFIG);
        fs::write(&path, yaml)?;

        debug!(fire_id, day, path = %path.display(), "materialized day config");
        Ok(path)
    }

    fn ensure_run_dirs(&self, fire_id: &str) -> Result<()> {
        for dir in [
            self.layout.grib_dir(fire_id),
            self.layout.wps_dir(fire_id),
            self.layout.wrf_dir(fire_id),
        ] {
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    fn read_master(&self, name: &str) -> Result<String> {
        let path = self.layout.master_dir().join(name);
        if !path.is_file() {
            return Err(WildfireError::MissingTemplate(path));
        }
        Ok(fs::read_to_string(&path)?)
    }

    /// Namelist, `namelist.input` copies and job scripts for one template
    /// directory. `day` is `None` for the grid directory.
    fn write_support_files(
        &self,
        fire: &FireRecord,
        day: Option<&str>,
        template_dir: &Path,
    ) -> Result<()> {
        let namelist = self.edit_namelist(fire, day)?;
        fs::write(template_dir.join(NAMELIST_WPS), namelist)?;

        let input = self.read_master(NAMELIST_INPUT)?;
        for suffix in ["hybr", "pres"] {
            fs::write(template_dir.join(format!("{NAMELIST_INPUT}.{suffix}")), &input)?;
        }

        self.copy_job_scripts(template_dir)
    }

    fn edit_namelist(&self, fire: &FireRecord, day: Option<&str>) -> Result<String> {
        let master_path = self.layout.master_dir().join(NAMELIST_WPS);
        let text = self.read_master(NAMELIST_WPS)?;
        let mut nml = Namelist::parse(&text)
            .map_err(|e| template_error(&master_path, e))?;

        let fire_id = fire.fire_id.as_str();
        let geogrid_out = self.layout.geogrid_dir(fire_id);
        let mut edits = vec![
            ("share", "opt_output_from_geogrid_path", path_value(&geogrid_out)),
            ("geogrid", "ref_lat", NmlValue::Real(fire.lat)),
            ("geogrid", "truelat1", NmlValue::Real(fire.lat)),
            ("geogrid", "truelat2", NmlValue::Real(fire.lat)),
            ("geogrid", "ref_lon", NmlValue::Real(fire.lon)),
            ("geogrid", "stand_lon", NmlValue::Real(fire.lon)),
        ];

        if let Some(day) = day {
            let wps_day = self.layout.wps_day_dir(fire_id, day);
            let ungrib_prefix = wps_day.join("ungrib").join("HRRR");
            edits.push(("ungrib", "prefix", path_value(&ungrib_prefix)));
            edits.push((
                "metgrid",
                "fg_name",
                NmlValue::List(vec![path_value(&ungrib_prefix)]),
            ));
            edits.push((
                "metgrid",
                "opt_output_from_metgrid_path",
                path_value(&wps_day.join("metgrid")),
            ));
        }

        for (group, key, value) in edits {
            nml.set(group, key, value)
                .map_err(|e| template_error(&master_path, e))?;
        }
        Ok(nml.render())
    }

    fn edit_run_yaml(&self, master: &str, fire_id: &str, template_dir: &Path) -> Result<String> {
        let master_path = self.layout.master_dir().join(master);
        let mut value: Value = serde_yaml::from_str(&self.read_master(master)?)?;
        let mapping = value
            .as_mapping_mut()
            .ok_or_else(|| template_error(&master_path, "expected a YAML mapping".to_string()))?;

        let edits = [
            ("grib_dir", self.layout.grib_dir(fire_id)),
            ("template_dir", template_dir.to_path_buf()),
            ("wps_run_dir", self.layout.wps_dir(fire_id)),
            ("wrf_run_dir", self.layout.wrf_dir(fire_id)),
        ];
        for (key, path) in edits {
            mapping.insert(
                Value::String(key.to_string()),
                Value::String(path.to_string_lossy().into_owned()),
            );
        }

        Ok(serde_yaml::to_string(&value)?)
    }

    /// Copy each `submit_*` script twice: `.casper` verbatim and `.derecho`
    /// with the queue directives rewritten.
    fn copy_job_scripts(&self, template_dir: &Path) -> Result<()> {
        let master_dir = self.layout.master_dir();
        let mut scripts: Vec<PathBuf> = fs::read_dir(&master_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(SUBMIT_PREFIX))
            })
            .collect();
        scripts.sort();

        for script in scripts {
            let Some(name) = script.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let contents = fs::read_to_string(&script)?;
            fs::write(template_dir.join(format!("{name}.casper")), &contents)?;
            fs::write(
                template_dir.join(format!("{name}.derecho")),
                rewrite_pbs_queues(&contents),
            )?;
        }
        Ok(())
    }
}

/// Apply the derecho queue rewrites line by line. Lines are compared with
/// surrounding whitespace stripped.
pub fn rewrite_pbs_queues(script: &str) -> String {
    let mut out = String::with_capacity(script.len());
    for line in script.split_inclusive('\n') {
        let stripped = line.trim();
        match PBS_REPLACEMENTS.iter().find(|(from, _)| *from == stripped) {
            Some((_, to)) => {
                out.push_str(to);
                out.push('\n');
            }
            None => out.push_str(line),
        }
    }
    out
}

fn path_value(path: &Path) -> NmlValue {
    NmlValue::Str(path.to_string_lossy().into_owned())
}

fn template_error(path: &Path, msg: String) -> WildfireError {
    WildfireError::ConfigError(format!("template {}: {msg}", path.display()))
}
