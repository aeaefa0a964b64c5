//! External tool invocation (yt-dlp, ffmpeg, ffprobe).

use std::ffi::OsString;
use std::path::Path;

use tokio::process::Command;
use tracing::debug;

use crate::{Result, SkaldError};

/// One invocation of an external binary.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    binary: String,
    args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path(self, path: &Path) -> Self {
        self.arg(path.as_os_str().to_owned())
    }

    /// Run to completion and return stdout.
    ///
    /// A non-zero exit becomes [`SkaldError::Tool`], unless stderr reports
    /// rate limiting, which maps to [`SkaldError::RateLimited`].
    pub async fn output(&self) -> Result<Vec<u8>> {
        debug!(tool = %self.binary, args = ?self.args, "running external tool");
        let output = Command::new(&self.binary)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SkaldError::Tool {
                tool: self.binary.clone(),
                message: format!("failed to start: {e}"),
            })?;

        if output.status.success() {
            return Ok(output.stdout);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        match SkaldError::from_upstream_message(stderr.trim()) {
            SkaldError::RateLimited { retry_after } => Err(SkaldError::RateLimited { retry_after }),
            _ => Err(SkaldError::Tool {
                tool: self.binary.clone(),
                message: format!("exited with {}: {}", output.status, stderr.trim()),
            }),
        }
    }

    /// Run to completion, discarding stdout.
    pub async fn run(&self) -> Result<()> {
        self.output().await.map(|_| ())
    }
}
