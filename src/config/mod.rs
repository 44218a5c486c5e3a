// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] holds the raw TOML mapping and the validated form.
//! - [`loader`] reads a file from disk; a missing file means defaults.
//! - [`validate`] turns the raw form into the validated one.

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, RawConfigSection};
pub use validate::{validate_concurrent, validate_poll_interval};
