// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{RawSuiteFile, SuiteFile};
use crate::errors::Result;

/// Load a suite file from a given path and return the raw `RawSuiteFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSuiteFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_str(&contents)
}

/// Parse suite TOML that is already in memory.
pub fn parse_str(contents: &str) -> Result<RawSuiteFile> {
    let suite: RawSuiteFile = toml::from_str(contents)?;
    Ok(suite)
}

/// Load a suite file from path and run validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks ids, dependencies and repeat policies per scope.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<SuiteFile> {
    let raw = load_from_path(&path)?;
    SuiteFile::try_from(raw)
}
