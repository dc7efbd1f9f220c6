// src/template/mod.rs

//! Template materializer: turns the master templates plus a fire's
//! parameters into the config files the external scripts consume.
//!
//! - [`materializer`] writes the grid and per-day configs.
//! - [`namelist`] edits Fortran namelists.
//! - [`registry`] remembers what was written so it can be removed later.

pub mod materializer;
pub mod namelist;
pub mod registry;

pub use materializer::{DAY_CONFIG, GRID_CONFIG, Materializer, rewrite_pbs_queues};
pub use namelist::{Namelist, NmlValue};
pub use registry::ArtifactRegistry;
