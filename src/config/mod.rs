// src/config/mod.rs

//! Suite description loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a suite file from disk (`loader.rs`).
//! - Validate per-scope invariants like unique ids (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_str};
pub use model::{ActionConfig, DependencyConfig, RawSuiteFile, SuiteFile, SuiteSection};
