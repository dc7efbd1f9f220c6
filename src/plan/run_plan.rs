// src/plan/run_plan.rs

use std::collections::HashSet;

use tracing::{info, warn};

use crate::errors::{Result, WildfireError};
use crate::fire::FireRecord;
use crate::plan::step::Step;
use crate::template::{ArtifactRegistry, Materializer};
use crate::types::StepKind;

/// The ordered steps for one fire: exactly one grid step, then the
/// simulation days in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirePlan {
    fire_id: String,
    grid: Step,
    days: Vec<Step>,
}

impl FirePlan {
    /// Build a fire plan, sorting the days and rejecting steps that do not
    /// belong to the grid step's fire.
    pub fn new(grid: Step, mut days: Vec<Step>) -> Result<Self> {
        if grid.kind != StepKind::Grid {
            return Err(WildfireError::ConfigError(format!(
                "fire {}: first step must be the grid step",
                grid.fire_id
            )));
        }

        for day in &days {
            if day.kind != StepKind::Simulation || day.fire_id != grid.fire_id {
                return Err(WildfireError::ConfigError(format!(
                    "fire {}: unexpected step {} ({}) in day list",
                    grid.fire_id,
                    day.display_name(),
                    day.fire_id
                )));
            }
        }

        // Day labels are `YYYYMMDD_HH`, so lexical order is date order.
        days.sort_by(|a, b| a.day.cmp(&b.day));
        let before = days.len();
        days.dedup_by(|a, b| a.day == b.day);
        if days.len() != before {
            warn!(fire_id = %grid.fire_id, "dropped duplicate simulation days");
        }

        Ok(Self {
            fire_id: grid.fire_id.clone(),
            grid,
            days,
        })
    }

    pub fn fire_id(&self) -> &str {
        &self.fire_id
    }

    pub fn grid(&self) -> &Step {
        &self.grid
    }

    pub fn days(&self) -> &[Step] {
        &self.days
    }

    /// Grid step followed by every day.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        std::iter::once(&self.grid).chain(self.days.iter())
    }
}

/// Mapping from fire to its ordered steps. Built once before dispatch and
/// read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPlan {
    fires: Vec<FirePlan>,
}

impl RunPlan {
    /// Materialize configs for every fire and build the plan.
    ///
    /// At most `max_days` days are planned per fire. Fires with an empty date
    /// range and repeated fire IDs are skipped with a warning.
    pub fn build(
        fires: &[FireRecord],
        materializer: &Materializer,
        max_days: usize,
        registry: &mut ArtifactRegistry,
    ) -> Result<Self> {
        let layout = materializer.layout();
        let mut seen = HashSet::new();
        let mut plans = Vec::with_capacity(fires.len());

        for fire in fires {
            let fire_id = fire.fire_id.as_str();
            if !seen.insert(fire_id) {
                warn!(fire_id, "fire listed more than once; keeping the first entry");
                continue;
            }

            let days: Vec<String> = fire.day_labels().into_iter().take(max_days).collect();
            let Some(first_day) = days.first() else {
                warn!(fire_id, "fire ends before it starts; nothing to run");
                continue;
            };

            let grid_config = materializer.materialize_grid(fire, registry)?;
            let grid = Step::grid(
                fire_id,
                first_day.as_str(),
                grid_config,
                layout.log_path(fire_id, first_day),
            );

            let mut day_steps = Vec::with_capacity(days.len());
            for day in &days {
                let config = materializer.materialize_day(fire, day, registry)?;
                day_steps.push(Step::simulation(
                    fire_id,
                    day.as_str(),
                    config,
                    layout.log_path(fire_id, day),
                ));
            }

            info!(
                fire_id,
                state = %fire.state_name,
                days = day_steps.len(),
                "planned fire"
            );
            plans.push(FirePlan::new(grid, day_steps)?);
        }

        Ok(Self { fires: plans })
    }

    pub fn from_fire_plans(fires: Vec<FirePlan>) -> Self {
        Self { fires }
    }

    pub fn fires(&self) -> &[FirePlan] {
        &self.fires
    }

    pub fn into_fire_plans(self) -> Vec<FirePlan> {
        self.fires
    }

    pub fn len(&self) -> usize {
        self.fires.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fires.is_empty()
    }

    pub fn total_steps(&self) -> usize {
        self.fires.iter().map(|f| 1 + f.days.len()).sum()
    }
}
