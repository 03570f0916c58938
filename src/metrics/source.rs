use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::metrics::error::SampleError;

/// Which external tool a source wraps. The fetch contract is shared; the
/// two kinds diverge only at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Device-registry query for the GPU accelerator entry.
    Gpu,
    /// Privileged power profiler carrying the ANE and CPU cluster lines.
    Power,
}

impl SourceKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Gpu => "gpu",
            Self::Power => "power",
        }
    }
}

/// Captured output of one tool invocation, decoded lossily so a stray
/// byte never aborts a tick.
#[derive(Debug, Clone)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

/// One external command, run once per sampling tick.
#[derive(Debug, Clone)]
pub struct CommandSource {
    kind: SourceKind,
    program: String,
    args: Vec<String>,
}

impl CommandSource {
    /// Registry query scoped to the accelerator class, depth 1 so only
    /// the entry's own properties come back.
    pub fn gpu_registry() -> Self {
        Self {
            kind: SourceKind::Gpu,
            program: "ioreg".to_string(),
            args: ["-r", "-d", "1", "-c", "IOAccelerator"]
                .map(str::to_string)
                .to_vec(),
        }
    }

    /// One-shot power profile over `window`; the CPU sampler group is the
    /// one that carries the ANE power line.
    pub fn power_profiler(window: Duration) -> Self {
        Self {
            kind: SourceKind::Power,
            program: "powermetrics".to_string(),
            args: vec![
                "--samplers".to_string(),
                "cpu_power".to_string(),
                "-i".to_string(),
                window.as_millis().to_string(),
                "-n".to_string(),
                "1".to_string(),
            ],
        }
    }

    /// Arbitrary command with a chosen tag; used by tests to stand in for
    /// tools that do not exist off-macOS.
    pub fn custom(
        kind: SourceKind,
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            kind,
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn tool(&self) -> &str {
        &self.program
    }

    /// Runs the tool once and captures its output. `timeout` bounds the
    /// whole invocation; on expiry the child is killed, never orphaned.
    pub async fn fetch(&self, timeout: Duration) -> Result<RawOutput, SampleError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => SampleError::SourceUnavailable {
                tool: self.program.clone(),
            },
            std::io::ErrorKind::PermissionDenied => SampleError::PermissionDenied {
                tool: self.program.clone(),
            },
            _ => SampleError::Spawn {
                tool: self.program.clone(),
                message: err.to_string(),
            },
        })?;

        // Dropping the wait future on timeout drops the child handle, and
        // kill_on_drop reaps it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Err(_) => {
                debug!(tool = %self.program, ?timeout, "source timed out");
                return Err(SampleError::SourceTimeout {
                    tool: self.program.clone(),
                    waited: timeout,
                });
            }
            Ok(Err(err)) => {
                return Err(SampleError::Spawn {
                    tool: self.program.clone(),
                    message: err.to_string(),
                });
            }
            Ok(Ok(output)) => output,
        };

        let raw = RawOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        };

        if output.status.success() {
            Ok(raw)
        } else if stderr_reports_permission(&raw.stderr) {
            Err(SampleError::PermissionDenied {
                tool: self.program.clone(),
            })
        } else {
            Err(SampleError::CommandFailed {
                tool: self.program.clone(),
                code: raw.code,
                detail: first_line(&raw.stderr),
            })
        }
    }
}

/// powermetrics prints "powermetrics must be invoked as the superuser"
/// and exits nonzero when run unprivileged.
fn stderr_reports_permission(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("superuser")
        || lower.contains("permission denied")
        || lower.contains("operation not permitted")
}

fn first_line(stderr: &str) -> String {
    let line = stderr.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    line.trim().chars().take(160).collect()
}
