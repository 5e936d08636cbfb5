// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ActionConfig, RawSuiteFile, SuiteFile};
use crate::errors::{HarnessError, Result};

impl TryFrom<RawSuiteFile> for SuiteFile {
    type Error = crate::errors::HarnessError;

    fn try_from(raw: RawSuiteFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_suite(&raw)?;
        Ok(SuiteFile::new_unchecked(raw.config, raw.actions))
    }
}

/// Semantic checks on a parsed suite.
///
/// This checks, per scope (top level and every group):
/// - there is at least one action
/// - action ids are unique
/// - every `depends_on` entry names a sibling action other than itself
/// - repeat policies are consistent
/// - only groups carry nested actions, and groups are not empty
///
/// Dependency cycles are detected when the action graph is built, because
/// the implicit lane edges take part in them.
fn validate_raw_suite(cfg: &RawSuiteFile) -> Result<()> {
    if cfg.config.default_lane.trim().is_empty() {
        return Err(HarnessError::ConfigError(
            "[config].default_lane must not be empty".to_string(),
        ));
    }
    if cfg.actions.is_empty() {
        return Err(HarnessError::ConfigError(
            "suite must contain at least one [[action]] table".to_string(),
        ));
    }
    validate_scope(&cfg.actions)
}

fn validate_scope(actions: &[ActionConfig]) -> Result<()> {
    ensure_unique_ids(actions)?;
    validate_dependencies(actions)?;

    for action in actions {
        action.repeat_policy().validate(&action.id)?;
        validate_nesting(action)?;
        if action.is_group() {
            validate_scope(&action.actions)?;
        }
    }
    Ok(())
}

fn ensure_unique_ids(actions: &[ActionConfig]) -> Result<()> {
    let mut seen = HashSet::new();
    for action in actions {
        if action.id.trim().is_empty() {
            return Err(HarnessError::ConfigError(
                "action ids must not be empty".to_string(),
            ));
        }
        if !seen.insert(action.id.as_str()) {
            return Err(HarnessError::DuplicateAction(action.id.clone()));
        }
    }
    Ok(())
}

fn validate_dependencies(actions: &[ActionConfig]) -> Result<()> {
    let ids: HashSet<&str> = actions.iter().map(|a| a.id.as_str()).collect();

    for action in actions {
        for dep in &action.depends_on {
            if dep.id() == action.id {
                return Err(HarnessError::ConfigError(format!(
                    "action '{}' cannot depend on itself in `depends_on`",
                    action.id
                )));
            }
            if !ids.contains(dep.id()) {
                return Err(HarnessError::UnknownDependency {
                    action: action.id.clone(),
                    dependency: dep.id().to_string(),
                });
            }
        }
    }
    Ok(())
}

fn validate_nesting(action: &ActionConfig) -> Result<()> {
    match (action.is_group(), action.actions.is_empty()) {
        (true, true) => Err(HarnessError::ConfigError(format!(
            "group '{}' must contain at least one nested action",
            action.id
        ))),
        (false, false) => Err(HarnessError::ConfigError(format!(
            "action '{}' of type '{}' cannot contain nested actions",
            action.id, action.kind
        ))),
        _ => Ok(()),
    }
}
