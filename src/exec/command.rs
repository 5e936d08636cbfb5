// src/exec/command.rs

//! `type = "command"`: run a shell command as one iteration.
//!
//! - `${name}` placeholders in `cmd` are filled from the variable scope.
//! - The iteration passes when the process exits with status 0 and, if
//!   `expect_stdout` is set, at least one stdout line matches that regex.
//! - `capture_stdout = "var"` stores the last stdout line in the scope.

use std::process::Stdio;
use std::sync::LazyLock;

use anyhow::Context;
use regex::{Captures, Regex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::model::ActionConfig;
use crate::engine::{Value, VariableScope};
use crate::errors::{self, HarnessError};
use crate::exec::payload::{ActionContext, ActionError, BoxFuture, Payload};
use crate::exec::registry::{optional_str, required_str};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}").expect("placeholder pattern is a valid regex")
});

#[derive(Debug, Clone)]
pub struct CommandPayload {
    cmd: String,
    expect_stdout: Option<Regex>,
    capture_stdout: Option<String>,
}

impl CommandPayload {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            expect_stdout: None,
            capture_stdout: None,
        }
    }

    pub fn expect_stdout(mut self, pattern: Regex) -> Self {
        self.expect_stdout = Some(pattern);
        self
    }

    pub fn capture_stdout(mut self, variable: impl Into<String>) -> Self {
        self.capture_stdout = Some(variable.into());
        self
    }

    pub fn from_config(cfg: &ActionConfig) -> errors::Result<Self> {
        let mut payload = Self::new(required_str(cfg, "cmd")?);

        if let Some(pattern) = optional_str(cfg, "expect_stdout")? {
            let re = Regex::new(pattern).map_err(|e| {
                HarnessError::ConfigError(format!(
                    "action '{}': invalid expect_stdout regex '{}': {}",
                    cfg.id, pattern, e
                ))
            })?;
            payload = payload.expect_stdout(re);
        }
        if let Some(var) = optional_str(cfg, "capture_stdout")? {
            payload = payload.capture_stdout(var);
        }
        Ok(payload)
    }

    async fn run_inner(&self, ctx: &ActionContext) -> Result<bool, ActionError> {
        let action = ctx.action_id();
        let line = interpolate(&self.cmd, ctx.scope())?;
        info!(action = %action, iteration = ctx.iteration(), cmd = %line, "starting command");

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&line);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&line);
            c
        };

        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for action '{}'", action))?;

        // Always consume stderr so buffers don't fill; log at debug.
        if let Some(stderr) = child.stderr.take() {
            let action = action.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(action = %action, "stderr: {}", line);
                }
            });
        }

        let mut matched = self.expect_stdout.is_none();
        let mut last_line = None;
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines
                .next_line()
                .await
                .with_context(|| format!("reading stdout of action '{}'", action))?
            {
                debug!(action = %action, "stdout: {}", line);
                if let Some(re) = &self.expect_stdout {
                    matched |= re.is_match(&line);
                }
                last_line = Some(line);
            }
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for process of action '{}'", action))?;

        info!(
            action = %action,
            exit_code = status.code().unwrap_or(-1),
            success = status.success(),
            matched,
            "command exited"
        );

        if let Some(var) = &self.capture_stdout {
            ctx.scope().set(var.clone(), last_line.map(Value::String));
        }

        Ok(status.success() && matched)
    }
}

impl Payload for CommandPayload {
    fn run<'a>(&'a self, ctx: &'a ActionContext) -> BoxFuture<'a, Result<bool, ActionError>> {
        Box::pin(self.run_inner(ctx))
    }
}

/// Replace `${name}` with the scope's value of `name`. String values are
/// inserted verbatim, everything else in its TOML rendering.
pub fn interpolate(template: &str, scope: &VariableScope) -> Result<String, ActionError> {
    let mut missing = None;
    let out = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        let name = &caps[1];
        match scope.get(name) {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(ActionError::recoverable(format!(
            "undefined variable '{}' in command",
            name
        ))),
        None => Ok(out.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_strings_verbatim_and_other_values_as_toml() {
        let scope = VariableScope::root();
        scope.set("host", Some(Value::from("localhost")));
        scope.set("port", Some(Value::from(8080i64)));

        let line = interpolate("curl http://${host}:${port}/ ${host}", &scope).unwrap();
        assert_eq!(line, "curl http://localhost:8080/ localhost");
        assert_eq!(interpolate("no placeholders", &scope).unwrap(), "no placeholders");
    }

    #[test]
    fn undefined_variable_is_recoverable() {
        let scope = VariableScope::root();
        let err = interpolate("echo ${nope}", &scope).unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("nope"));
    }
}
