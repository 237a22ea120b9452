//! External tool execution.
//!
//! Hooks never spawn processes directly; they describe the command as a
//! [`CommandSpec`] and hand it to a [`CommandRunner`]. The production runner
//! uses `tokio::process` bounded by a timeout.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{GuardError, Result};

/// A command to run from a working directory with a deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout_ms: u64,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, cwd: &Path, timeout_ms: u64) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
            timeout_ms,
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

    /// Shell-like rendering for messages and logs.
    pub fn display(&self) -> String {
        let mut out = self.program.clone();
        for arg in &self.args {
            out.push(' ');
            if arg.contains(' ') {
                out.push_str(&format!("\"{}\"", arg));
            } else {
                out.push_str(arg);
            }
        }
        out
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout when present, stderr otherwise.
    pub fn combined(&self) -> &str {
        if self.stdout.trim().is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        debug!(command = %spec.display(), cwd = %spec.cwd.display(), "running external tool");

        let child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| GuardError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        let waited =
            tokio::time::timeout(Duration::from_millis(spec.timeout_ms), child.wait_with_output())
                .await;

        match waited {
            Ok(Ok(output)) => Ok(CommandOutput {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            }),
            Ok(Err(e)) => Err(GuardError::Io(e)),
            Err(_) => Err(GuardError::Timeout {
                program: spec.program.clone(),
                timeout_ms: spec.timeout_ms,
            }),
        }
    }
}

/// Node package manager, detected from the lockfile in the project root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Pnpm,
    Yarn,
    Npm,
}

impl PackageManager {
    pub fn detect(project_root: &Path) -> PackageManager {
        if project_root.join("pnpm-lock.yaml").exists() {
            PackageManager::Pnpm
        } else if project_root.join("yarn.lock").exists() {
            PackageManager::Yarn
        } else {
            PackageManager::Npm
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Pnpm => "pnpm",
            PackageManager::Yarn => "yarn",
            PackageManager::Npm => "npm",
        }
    }

    /// Run a locally installed binary: `pnpm exec X`, `yarn X`, `npx X`.
    pub fn exec(&self, tool: &str, cwd: &Path, timeout_ms: u64) -> CommandSpec {
        match self {
            PackageManager::Pnpm => CommandSpec::new("pnpm", cwd, timeout_ms).arg("exec").arg(tool),
            PackageManager::Yarn => CommandSpec::new("yarn", cwd, timeout_ms).arg(tool),
            PackageManager::Npm => CommandSpec::new("npx", cwd, timeout_ms).arg(tool),
        }
    }

    /// Run a `package.json` script: `<pm> run <script>`.
    pub fn run_script(&self, script: &str, cwd: &Path, timeout_ms: u64) -> CommandSpec {
        CommandSpec::new(self.as_str(), cwd, timeout_ms)
            .arg("run")
            .arg(script)
    }
}
