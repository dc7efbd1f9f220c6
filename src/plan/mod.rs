// src/plan/mod.rs

//! Run plan: the steps to dispatch, per fire.

pub mod run_plan;
pub mod step;

pub use run_plan::{FirePlan, RunPlan};
pub use step::Step;
