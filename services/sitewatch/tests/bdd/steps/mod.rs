//! BDD step definitions for sitewatch

pub mod alerting_steps;
pub mod probe_steps;
