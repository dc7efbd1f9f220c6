// src/plan/step.rs

use std::path::{Path, PathBuf};

use crate::types::StepKind;

/// A single unit of dispatched work: one launch of the run script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub fire_id: String,
    pub kind: StepKind,
    /// Simulated day (`YYYYMMDD_HH`); `None` for the grid step.
    pub day: Option<String>,
    /// Day argument handed to the script. The grid step gets the fire's
    /// first day.
    pub launch_day: String,
    pub config_path: PathBuf,
    pub log_path: PathBuf,
}

impl Step {
    pub fn grid(
        fire_id: impl Into<String>,
        first_day: impl Into<String>,
        config_path: impl Into<PathBuf>,
        log_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fire_id: fire_id.into(),
            kind: StepKind::Grid,
            day: None,
            launch_day: first_day.into(),
            config_path: config_path.into(),
            log_path: log_path.into(),
        }
    }

    pub fn simulation(
        fire_id: impl Into<String>,
        day: impl Into<String>,
        config_path: impl Into<PathBuf>,
        log_path: impl Into<PathBuf>,
    ) -> Self {
        let day = day.into();
        Self {
            fire_id: fire_id.into(),
            kind: StepKind::Simulation,
            launch_day: day.clone(),
            day: Some(day),
            config_path: config_path.into(),
            log_path: log_path.into(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    /// Short name for logs and the summary: the day, or `geogrid`.
    pub fn display_name(&self) -> &str {
        self.day.as_deref().unwrap_or("geogrid")
    }

    /// Arguments for the launcher, in the order the run script expects:
    /// `[script, day, config, fire_id, label]`.
    pub fn launch_args(&self, script: &Path) -> Vec<String> {
        vec![
            script.to_string_lossy().into_owned(),
            self.launch_day.clone(),
            self.config_path.to_string_lossy().into_owned(),
            self.fire_id.clone(),
            self.label().to_string(),
        ]
    }
}
