//! `owl-core` — shared foundation for the Scrum Owl workspace.
//!
//! Holds the configuration layer (`owl.toml` + `OWL_*` env overrides) and the
//! time-specification parser used by the reminder service. No domain types
//! live here; those belong to `owl-reminders`.

pub mod config;
pub mod timespec;

pub use config::OwlConfig;
pub use timespec::{parse_time_spec, TimeSpecError};
