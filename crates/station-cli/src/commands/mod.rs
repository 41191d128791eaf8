//! Subcommand implementations for `station-audio`.

pub mod devices;
pub mod inject_test_alert;
pub mod run;
pub mod status;
