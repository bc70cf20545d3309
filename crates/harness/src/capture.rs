//! Output and error capture for spawned drivers
//!
//! A child that writes more than the OS pipe buffer blocks until someone
//! reads. Both channels are therefore drained by their own task while the
//! process runs, and the result is only produced once the process has exited
//! and both drains have finished.

use std::process::ExitStatus;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::trace;

use gramtest_common::{Error, ExecutionResult, Result};

/// Spawn a task that reads `reader` to the end
pub fn drain<R>(reader: R, channel: &'static str) -> JoinHandle<std::io::Result<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = reader;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        trace!(channel, bytes = buf.len(), "drained");
        Ok(String::from_utf8_lossy(&buf).into_owned())
    })
}

async fn join_drain(handle: JoinHandle<std::io::Result<String>>, channel: &str) -> Result<String> {
    match handle.await {
        Ok(read) => Ok(read?),
        Err(e) => Err(Error::Internal(format!("{} drain task failed: {}", channel, e))),
    }
}

/// A running child whose stdout and stderr are being drained
pub struct CapturedChild {
    child: Child,
    stdout: JoinHandle<std::io::Result<String>>,
    stderr: JoinHandle<std::io::Result<String>>,
}

impl CapturedChild {
    /// Start draining a child spawned with piped stdout and stderr
    pub fn attach(mut child: Child) -> Result<Self> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal("child stdout is not piped".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Internal("child stderr is not piped".to_string()))?;

        Ok(Self {
            child,
            stdout: drain(stdout, "stdout"),
            stderr: drain(stderr, "stderr"),
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the process to exit and for both drains to finish
    pub async fn wait(mut self) -> Result<(ExitStatus, ExecutionResult)> {
        let status = self.child.wait().await?;
        let (stdout, stderr) = tokio::join!(
            join_drain(self.stdout, "stdout"),
            join_drain(self.stderr, "stderr")
        );
        Ok((status, ExecutionResult::from_channels(stdout?, stderr?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_reads_everything() {
        let data: &'static [u8] = b"[@0,0:2='abc',<1>,1:0]\n";
        let handle = drain(data, "stdout");
        let text = join_drain(handle, "stdout").await.unwrap();
        assert_eq!(text, "[@0,0:2='abc',<1>,1:0]\n");
    }

    #[tokio::test]
    async fn test_drain_is_lossy_on_invalid_utf8() {
        let data: &'static [u8] = &[b'a', 0xff, b'b'];
        let text = join_drain(drain(data, "stderr"), "stderr").await.unwrap();
        assert_eq!(text, "a\u{fffd}b");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captured_child_collects_both_channels() {
        use std::process::Stdio;

        let child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg("echo out; echo err 1>&2; exit 3")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        let (status, result) = CapturedChild::attach(child).unwrap().wait().await.unwrap();
        assert_eq!(status.code(), Some(3));
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr.as_deref(), Some("err\n"));
    }
}
