//! PTY channel: the single place where a session waits for device output.

use std::time::Duration;

use log::{debug, trace};
use tokio::time::Instant;

use super::buffer::PatternBuffer;
use super::patterns::PromptPattern;
use crate::error::{ChannelError, Result};
use crate::transport::Transport;

/// How many bytes of buffer tail are quoted in timeout errors.
const ERROR_TAIL_LEN: usize = 200;

/// Stand-in deadline for waits too long to represent.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Configuration for PTY channel behavior.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Search depth for pattern matching.
    pub search_depth: usize,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self { search_depth: 1000 }
    }
}

/// High-level channel for interactive device sessions.
///
/// Owns the transport stream exclusively. Every read takes `&mut self`, so at
/// most one read can be outstanding at a time.
pub struct PtyChannel<T: Transport> {
    transport: T,

    /// Pattern buffer for accumulating output.
    buffer: PatternBuffer,

    /// Trimmed text of the most recent pattern match.
    last_match: Option<String>,
}

impl<T: Transport> PtyChannel<T> {
    /// Wrap an open transport.
    pub fn new(transport: T, config: PtyConfig) -> Self {
        Self {
            transport,
            buffer: PatternBuffer::new(config.search_depth),
            last_match: None,
        }
    }

    /// Write raw text.
    pub async fn write(&mut self, data: &str) -> Result<()> {
        self.transport.write(data.as_bytes()).await
    }

    /// Write `line` followed by a newline.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        trace!("send: {:?}", line);
        self.write(&format!("{}\n", line)).await
    }

    /// Read until `pattern` matches the tail of the accumulated output.
    ///
    /// Returns everything read, ANSI-stripped. On a match the trimmed
    /// matched text becomes [`last_match`](Self::last_match).
    pub async fn read_until(&mut self, pattern: &PromptPattern, timeout: Duration) -> Result<String> {
        let start = Instant::now();
        let deadline = deadline_after(start, timeout);
        self.buffer.clear();

        loop {
            let chunk = match tokio::time::timeout_at(deadline, self.transport.read_chunk()).await {
                Ok(chunk) => chunk?,
                Err(_) => {
                    let tail = self.error_tail();
                    self.buffer.clear();
                    return Err(ChannelError::ReadTimeout {
                        pattern: pattern.to_string(),
                        elapsed: start.elapsed(),
                        tail,
                    }
                    .into());
                }
            };

            let Some(chunk) = chunk else {
                debug!("stream closed while waiting for '{}'", pattern);
                self.buffer.clear();
                return Err(ChannelError::Closed.into());
            };

            trace!("read {} bytes", chunk.len());
            self.buffer.extend(&chunk);

            if let Some(m) = self.buffer.search_tail(pattern.regex()) {
                let matched = String::from_utf8_lossy(m.as_bytes()).trim().to_string();
                trace!("matched {:?} after {:?}", matched, start.elapsed());
                self.last_match = Some(matched);
                let data = self.buffer.take();
                return Ok(String::from_utf8_lossy(&data).into_owned());
            }
        }
    }

    /// Collect all output for a fixed wall-clock window.
    pub async fn read_for(&mut self, duration: Duration) -> Result<String> {
        let deadline = deadline_after(Instant::now(), duration);
        self.buffer.clear();

        loop {
            match tokio::time::timeout_at(deadline, self.transport.read_chunk()).await {
                Ok(Ok(Some(chunk))) => self.buffer.extend(&chunk),
                Ok(Ok(None)) => {
                    self.buffer.clear();
                    return Err(ChannelError::Closed.into());
                }
                Ok(Err(e)) => {
                    self.buffer.clear();
                    return Err(e);
                }
                Err(_) => break,
            }
        }

        let data = self.buffer.take();
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Trimmed text of the most recent pattern match.
    pub fn last_match(&self) -> Option<&str> {
        self.last_match.as_deref()
    }

    /// Close the underlying transport.
    pub async fn close(mut self) -> Result<()> {
        self.transport.close().await
    }

    fn error_tail(&self) -> String {
        let text = self.buffer.as_str_lossy();
        let start = text.len().saturating_sub(ERROR_TAIL_LEN);
        let start = (start..text.len())
            .find(|&i| text.is_char_boundary(i))
            .unwrap_or(text.len());
        text[start..].to_string()
    }
}

fn deadline_after(start: Instant, wait: Duration) -> Instant {
    start
        .checked_add(wait)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockDevice, MockStream};
    use crate::transport::{Connector, SshConfig};

    async fn open(device: &MockDevice) -> PtyChannel<MockStream> {
        let stream = device.connector().connect(&test_config()).await.unwrap();
        PtyChannel::new(stream, PtyConfig::default())
    }

    fn test_config() -> SshConfig {
        use crate::transport::{AuthMethod, HostKeyVerification};
        SshConfig {
            host: "10.0.0.1".to_string(),
            port: 22,
            username: "admin".to_string(),
            auth: AuthMethod::Password("pw".to_string().into()),
            timeout: Duration::from_secs(5),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::Disabled,
            known_hosts_path: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_until_matches_banner_prompt() {
        let device = MockDevice::new("Router>");
        let mut channel = open(&device).await;

        let output = channel
            .read_until(&PromptPattern::generic(), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(output, "Welcome\r\nRouter>");
        assert_eq!(channel.last_match(), Some("Router>"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_until_accumulates_fragments() {
        let device = MockDevice::new("Router#")
            .on("show clock", "show clock\r\n*12:00:01\x1b[\0K UTC\r\nRou\0ter#");
        let mut channel = open(&device).await;
        channel
            .read_until(&PromptPattern::generic(), Duration::from_secs(10))
            .await
            .unwrap();

        channel.send_line("show clock").await.unwrap();
        let output = channel
            .read_until(&PromptPattern::literal("Router#"), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(output, "show clock\r\n*12:00:01 UTC\r\nRouter#");
        assert_eq!(channel.last_match(), Some("Router#"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_until_times_out_at_deadline() {
        let device = MockDevice::new("Router#").silent();
        let mut channel = open(&device).await;
        channel
            .read_until(&PromptPattern::generic(), Duration::from_secs(10))
            .await
            .unwrap();

        channel.send_line("show version").await.unwrap();
        let start = Instant::now();
        let err = channel
            .read_until(&PromptPattern::literal("Router#"), Duration::from_secs(3))
            .await
            .unwrap_err();

        assert!(start.elapsed() >= Duration::from_secs(3));
        match err {
            crate::Error::Channel(ChannelError::ReadTimeout { pattern, elapsed, .. }) => {
                assert!(pattern.contains("Router#"));
                assert!(elapsed >= Duration::from_secs(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_until_does_not_reject_early() {
        let device = MockDevice::new("Router#");
        let mut channel = open(&device).await;

        let start = Instant::now();
        let output = channel
            .read_until(&PromptPattern::literal("Router#"), Duration::from_secs(3))
            .await
            .unwrap();
        assert!(output.ends_with("Router#"));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_until_fails_when_stream_closes() {
        let device = MockDevice::new("Router#").silent().hang_up_after(1);
        let mut channel = open(&device).await;
        channel
            .read_until(&PromptPattern::generic(), Duration::from_secs(10))
            .await
            .unwrap();

        channel.send_line("reload").await.unwrap();
        let err = channel
            .read_until(&PromptPattern::generic(), Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::Channel(ChannelError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_for_collects_everything() {
        let device = MockDevice::new("host$").on("ls", "ls\r\na.txt b.txt\r\nhost$ ");
        let mut channel = open(&device).await;

        channel.send_line("ls").await.unwrap();
        let start = Instant::now();
        let output = channel.read_for(Duration::from_millis(500)).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(500));
        assert_eq!(output, "Welcome\r\nhost$ls\r\na.txt b.txt\r\nhost$ ");
    }
}
