//! Command execution: pattern-gated and fixed-timing variants.

use std::time::Duration;

use log::debug;
use tokio::time::Instant;

use super::response::Response;
use super::session::{SETTLE_DELAY, Session, command_timeout, scaled};
use crate::channel::PromptPattern;
use crate::error::{ChannelError, Error, Result};
use crate::platform::VendorProfile;
use crate::transport::Connector;

/// How long `send_command_timing` listens when no expect string is given.
const TIMING_WINDOW: Duration = Duration::from_secs(2);

/// Per-command options.
///
/// ```rust
/// use ferroprompt::CommandOptions;
///
/// let options = CommandOptions::new()
///     .expect_string(r"[Pp]assword")
///     .strip_prompt(false);
/// ```
#[derive(Debug, Clone)]
pub struct CommandOptions {
    /// Regex that ends the read instead of the session prompt.
    pub expect_string: Option<String>,

    /// Drop the echoed command line.
    pub strip_command: bool,

    /// Drop the trailing prompt line.
    pub strip_prompt: bool,

    /// Multiplier on top of the profile's `global_delay_factor`.
    pub delay_factor: Option<f64>,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            expect_string: None,
            strip_command: true,
            strip_prompt: true,
            delay_factor: None,
        }
    }
}

impl CommandOptions {
    /// Default options: strip echo and prompt, wait for the session prompt.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for `pattern` instead of the prompt.
    pub fn expect_string(mut self, pattern: impl Into<String>) -> Self {
        self.expect_string = Some(pattern.into());
        self
    }

    pub fn strip_command(mut self, strip: bool) -> Self {
        self.strip_command = strip;
        self
    }

    pub fn strip_prompt(mut self, strip: bool) -> Self {
        self.strip_prompt = strip;
        self
    }

    /// Scale delays and timeouts for this command only.
    pub fn delay_factor(mut self, factor: f64) -> Self {
        self.delay_factor = Some(factor);
        self
    }

    fn pattern(&self) -> Result<Option<PromptPattern>> {
        self.expect_string
            .as_deref()
            .map(|p| PromptPattern::custom(p).map_err(|e| Error::from(ChannelError::InvalidPattern(e))))
            .transpose()
    }
}

impl<C: Connector> Session<C> {
    /// Send a command and read until the prompt (or the expect string).
    ///
    /// Waits at most `read_timeout` scaled by the delay factor; a timeout
    /// becomes [`DriverError::CommandTimeout`](crate::error::DriverError).
    pub async fn send_command(&mut self, command: &str, options: &CommandOptions) -> Result<Response> {
        self.channel_mut()?;
        let pattern = match options.pattern()? {
            Some(pattern) => pattern,
            None => self.active_prompt(),
        };
        let factor = self.delay_factor(options.delay_factor)?;
        let timeout = scaled(self.profile.read_timeout, factor);

        debug!("send_command: {}", command);
        let start = Instant::now();
        let channel = self.channel_mut()?;
        channel.send_line(command).await?;
        tokio::time::sleep(scaled(SETTLE_DELAY, factor)).await;
        let raw = channel
            .read_until(&pattern, timeout)
            .await
            .map_err(|e| command_timeout(command, e))?;
        let prompt = channel.last_match().unwrap_or_default().to_string();

        Ok(self.response(command, raw, prompt, options, start))
    }

    /// Send a command and collect output by timing rather than by prompt.
    ///
    /// With an expect string this waits for it, like `send_command`.
    /// Otherwise it listens for a fixed window (2 s scaled by the delay
    /// factor) and returns whatever arrived, which suits commands that print
    /// progress or never return a recognizable prompt.
    pub async fn send_command_timing(
        &mut self,
        command: &str,
        options: &CommandOptions,
    ) -> Result<Response> {
        self.channel_mut()?;
        let pattern = options.pattern()?;
        let factor = self.delay_factor(options.delay_factor)?;

        debug!("send_command_timing: {}", command);
        let start = Instant::now();
        let read_timeout = scaled(self.profile.read_timeout, factor);
        let channel = self.channel_mut()?;
        channel.send_line(command).await?;
        tokio::time::sleep(scaled(SETTLE_DELAY, factor)).await;

        let (raw, prompt) = match pattern {
            Some(pattern) => {
                let raw = channel
                    .read_until(&pattern, read_timeout)
                    .await
                    .map_err(|e| command_timeout(command, e))?;
                let prompt = channel.last_match().unwrap_or_default().to_string();
                (raw, prompt)
            }
            None => {
                let raw = channel.read_for(scaled(TIMING_WINDOW, factor)).await?;
                let prompt = self.trailing_prompt(&raw);
                (raw, prompt)
            }
        };

        Ok(self.response(command, raw, prompt, options, start))
    }

    fn response(
        &self,
        command: &str,
        raw: String,
        prompt: String,
        options: &CommandOptions,
        start: Instant,
    ) -> Response {
        let result = strip_output(
            &raw,
            command,
            options.strip_command,
            options.strip_prompt,
            &self.vendor,
        );
        Response::new(command, result, raw, prompt, start.elapsed())
    }

    /// The last line of `output` if it matches the active prompt.
    fn trailing_prompt(&self, output: &str) -> String {
        let pattern = self.active_prompt();
        output
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .filter(|line| pattern.is_match(line.as_bytes()))
            .unwrap_or_default()
            .to_string()
    }
}

/// Remove the command echo and the trailing prompt from raw output.
///
/// With both flags off the raw output is returned unchanged. Otherwise the
/// first line is dropped if it echoes `command`, the last non-blank line is
/// dropped,
/// line endings are normalized, the vendor post-processor runs and the
/// result is trimmed.
pub(crate) fn strip_output(
    raw: &str,
    command: &str,
    strip_command: bool,
    strip_prompt: bool,
    vendor: &VendorProfile,
) -> String {
    if !strip_command && !strip_prompt {
        return raw.to_string();
    }

    let normalized = raw.replace("\r\n", "\n");
    let mut lines: Vec<&str> = normalized.split('\n').collect();

    if strip_command && lines.first().is_some_and(|first| echoes(first, command)) {
        lines.remove(0);
    }
    if strip_prompt {
        // The prompt match may include a trailing newline
        while lines.last().is_some_and(|line| line.trim().is_empty()) {
            lines.pop();
        }
        lines.pop();
    }

    vendor.post_process(&lines.join("\n")).trim().to_string()
}

fn echoes(line: &str, command: &str) -> bool {
    let command = command.trim();
    !command.is_empty() && line.contains(command)
}
