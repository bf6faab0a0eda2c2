//! External command execution with streaming output
//!
//! `cdk` and `docker` are driven as child processes. Their output is
//! forwarded line by line into tracing so it interleaves with our own logs.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{info, warn};

/// Configuration for command execution
#[derive(Debug, Clone)]
pub struct CommandConfig {
    /// Working directory for the child
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
    /// Data written to the child's stdin, which is then closed
    pub stdin: Option<String>,
    /// Kill the child if it runs longer than this
    pub timeout: Option<Duration>,
    /// Time to wait for streaming tasks to flush after command completes
    pub stream_flush_timeout: Duration,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            cwd: None,
            env: Vec::new(),
            stdin: None,
            timeout: None,
            stream_flush_timeout: Duration::from_secs(5),
        }
    }
}

impl CommandConfig {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(dir.into()),
            ..Self::default()
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

/// Run a command, streaming stdout at info and stderr at warn
///
/// # Returns
/// * `Ok(true)` if command succeeded
/// * `Ok(false)` if command failed with non-zero exit
/// * `Err` if timeout, spawn failure, or other error
pub async fn run_command(cmd: &str, args: &[&str], config: &CommandConfig) -> Result<bool> {
    info!(cmd = %cmd, args = ?args, cwd = ?config.cwd, "Running command");

    let mut command = Command::new(cmd);
    command
        .args(args)
        .stdin(if config.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &config.cwd {
        command.current_dir(dir);
    }
    for (key, value) in &config.env {
        command.env(key, value);
    }

    let mut child = command
        .spawn()
        .with_context(|| format!("Failed to spawn command: {}", cmd))?;

    if let Some(input) = &config.stdin {
        let mut stdin = child.stdin.take().context("Failed to capture stdin")?;
        stdin
            .write_all(input.as_bytes())
            .await
            .context("Failed to write command stdin")?;
        // Dropping closes the pipe so the child sees EOF
        drop(stdin);
    }

    let stdout = child.stdout.take().context("Failed to capture stdout")?;
    let stderr = child.stderr.take().context("Failed to capture stderr")?;

    let name = cmd.to_string();
    let stdout_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!(cmd = %name, "{line}");
        }
    });

    let name = cmd.to_string();
    let stderr_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            warn!(cmd = %name, "{line}");
        }
    });

    let status = match config.timeout {
        None => child.wait().await.context("Failed waiting for command")?,
        Some(timeout) => match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => status.context("Failed waiting for command")?,
            Err(_) => {
                warn!(cmd = %cmd, timeout_secs = timeout.as_secs(), "Command timed out, killing process");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed-out process");
                }
                anyhow::bail!("Command '{}' timed out after {}s", cmd, timeout.as_secs());
            }
        },
    };

    let _ = tokio::time::timeout(config.stream_flush_timeout, stdout_handle).await;
    let _ = tokio::time::timeout(config.stream_flush_timeout, stderr_handle).await;

    if !status.success() {
        warn!(cmd = %cmd, code = ?status.code(), "Command exited with failure");
    }
    Ok(status.success())
}

/// Run a command and turn a non-zero exit into an error
pub async fn run_checked(cmd: &str, args: &[&str], config: &CommandConfig) -> Result<()> {
    if run_command(cmd, args, config).await? {
        Ok(())
    } else {
        anyhow::bail!("`{} {}` failed", cmd, args.join(" "))
    }
}
