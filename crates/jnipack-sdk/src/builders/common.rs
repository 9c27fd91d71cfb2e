//! Process execution shared by the build steps.
//!
//! Every external call goes through a [`ToolRunner`]. [`ProcessRunner`]
//! spawns real processes; [`RecordingRunner`] only records what would run,
//! which backs `jnipack plan` and lets the pipeline run without `gn` or
//! `ninja` installed.

use std::fmt;
use std::process::Command;
use std::sync::Mutex;

use tracing::debug;

use crate::types::{PackError, Result};

/// A fully-specified external command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// How an external command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub success: bool,
    /// Human-readable exit status, e.g. `exit status: 1`.
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutcome {
    /// An outcome for a command that exited with status 0 and no output.
    pub fn success() -> Self {
        Self {
            success: true,
            status: "exit status: 0".to_string(),
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Runs external commands to completion.
///
/// Implementations block until the command exits. They return `Err` only when
/// the command could not be run at all; a non-zero exit is reported through
/// [`ToolOutcome::success`].
pub trait ToolRunner: Send + Sync {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutcome>;
}

impl<T: ToolRunner + ?Sized> ToolRunner for &T {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutcome> {
        (**self).run(invocation)
    }
}

/// Spawns real processes with [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutcome> {
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .output()
            .map_err(|e| PackError::ToolLaunch {
                tool: invocation.program.clone(),
                source: e,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !stdout.is_empty() {
            debug!(tool = %invocation.program, stdout = %stdout.trim_end(), "command stdout");
        }

        Ok(ToolOutcome {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout,
            stderr,
        })
    }
}

/// Records invocations instead of running them; every call succeeds.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<ToolInvocation>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the invocations seen so far, in call order.
    pub fn calls(&self) -> Vec<ToolInvocation> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ToolRunner for RecordingRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutcome> {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(invocation.clone()),
            Err(poisoned) => poisoned.into_inner().push(invocation.clone()),
        }
        Ok(ToolOutcome::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display_quotes_spaces() {
        let inv = ToolInvocation::new("gn")
            .arg("gen")
            .arg("out/x86")
            .arg("--args=is_debug=false target_cpu=\"x86\"");
        assert_eq!(
            inv.to_string(),
            "gn gen out/x86 '--args=is_debug=false target_cpu=\"x86\"'"
        );
    }

    #[test]
    fn test_process_runner_not_found() {
        let inv = ToolInvocation::new("nonexistent-command-12345");
        let err = ProcessRunner.run(&inv).unwrap_err();
        assert!(matches!(err, PackError::ToolLaunch { .. }));
        assert!(err.to_string().contains("failed to start"));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_reports_exit_status() {
        let ok = ProcessRunner.run(&ToolInvocation::new("true")).unwrap();
        assert!(ok.success);

        let failed = ProcessRunner.run(&ToolInvocation::new("false")).unwrap();
        assert!(!failed.success);
        assert!(failed.status.contains('1'));
    }

    #[test]
    fn test_recording_runner_keeps_order() {
        let runner = RecordingRunner::new();
        runner.run(&ToolInvocation::new("a")).unwrap();
        runner.run(&ToolInvocation::new("b").arg("x")).unwrap();
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].program, "a");
        assert_eq!(calls[1].args, vec!["x".to_string()]);
    }
}
