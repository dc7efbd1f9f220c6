// src/fire/mod.rs

//! Fire source: the table of fire events and the filters applied to it.

pub mod record;
pub mod source;
pub mod states;

pub use record::{FireRecord, day_label};
pub use source::{FireQuery, filter_fires, load_fires, read_fires, write_fires};
pub use states::normalize_state;
