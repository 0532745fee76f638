//! Mode transitions: enable, configuration mode, commit and abort.

use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};

use super::response::Response;
use super::session::{SETTLE_DELAY, Session, command_timeout, scaled};
use crate::channel::PromptPattern;
use crate::error::{DeviceError, DriverError, Result};
use crate::platform::Mode;
use crate::transport::Connector;

impl<C: Connector> Session<C> {
    /// Enter privileged mode.
    ///
    /// Returns an empty string without touching the device when the dialect
    /// has no enable command, no secret is configured, or the session is
    /// already privileged.
    pub async fn enable(&mut self) -> Result<String> {
        self.channel_mut()?;
        let Some(command) = self.vendor.enable_command.clone() else {
            return Ok(String::new());
        };
        if self.profile.secret.is_none() || self.check_enable_mode() {
            return Ok(String::new());
        }

        debug!("entering enable mode");
        let timeout = self.profile.read_timeout;
        let password_prompt = self.vendor.password_prompt.clone();
        let either = PromptPattern::either(&password_prompt, &self.vendor.prompt);

        let mut output = self.exchange(&command, &either, timeout).await?.raw_result;

        if self.last_match_is(&password_prompt) {
            let line = SecretString::from(format!(
                "{}\n",
                self.profile
                    .secret
                    .as_ref()
                    .map(|s| s.expose_secret())
                    .unwrap_or_default()
            ));
            let settle = scaled(SETTLE_DELAY, self.profile.global_delay_factor);

            let channel = self.channel_mut()?;
            channel.write(line.expose_secret()).await?;
            tokio::time::sleep(settle).await;
            let reply = channel
                .read_until(&either, timeout)
                .await
                .map_err(|e| command_timeout(&command, e))?;
            output.push_str(&reply);

            if self.last_match_is(&password_prompt) {
                warn!("enable secret rejected by {}", self.profile.host);
                let prompt = self.last_match().unwrap_or_default();
                return Err(DriverError::InvalidSecret { prompt }.into());
            }
        }

        self.find_prompt().await?;
        if self.mode != Mode::Enabled {
            return Err(DriverError::InvalidSecret {
                prompt: self.base_prompt.clone().unwrap_or_default(),
            }
            .into());
        }
        debug!("enable mode reached");
        Ok(output)
    }

    /// Enter configuration mode.
    ///
    /// Does nothing if already configuring.
    pub async fn config_mode(&mut self) -> Result<String> {
        self.channel_mut()?;
        if self.check_config_mode() {
            return Ok(String::new());
        }
        Ok(self.enter_config().await?.raw_result)
    }

    /// Leave configuration mode.
    ///
    /// Does nothing if not configuring. On dialects that stage changes the
    /// candidate is committed first; a failed commit is aborted and returned
    /// as [`DeviceError::CommitFailed`] without sending the exit command.
    /// Fails with [`DriverError::ModeTransitionFailed`] if the prompt still
    /// shows configuration mode afterwards.
    pub async fn exit_config_mode(&mut self) -> Result<String> {
        self.channel_mut()?;
        Ok(self
            .leave_config()
            .await?
            .into_iter()
            .map(|response| response.raw_result)
            .collect())
    }

    /// Apply a batch of configuration commands.
    ///
    /// Enters configuration mode, sends each command and checks its output
    /// for device errors, commits (on dialects that stage changes) and leaves
    /// configuration mode. Returns one [`Response`] per step, in order.
    ///
    /// On the first rejected command the rest are not sent, the staged
    /// changes are aborted and [`DeviceError::CommandRejected`] names the
    /// command.
    pub async fn send_config<I, S>(&mut self, commands: I) -> Result<Vec<Response>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.channel_mut()?;
        let mut responses = Vec::new();
        if !self.check_config_mode() {
            responses.push(self.enter_config().await?);
        }

        let timeout = self.profile.read_timeout;
        let pattern = self.active_prompt();
        for command in commands {
            let command = command.as_ref();
            debug!("config: {}", command);
            let response = self.exchange(command, &pattern, timeout).await?;

            if let Some(line) = self.vendor.find_error(&response.raw_result) {
                warn!("'{}' rejected: {}", command, line);
                let recovery_error = self.recover().await;
                return Err(DeviceError::CommandRejected {
                    command: command.to_string(),
                    output: response.result,
                    recovery_error,
                }
                .into());
            }
            responses.push(response);
        }

        responses.extend(self.leave_config().await?);
        Ok(responses)
    }

    /// Commit staged configuration.
    ///
    /// Returns `None` on dialects without a commit step or when not in
    /// configuration mode. A commit the device reports as failed is aborted
    /// and returned as [`DeviceError::CommitFailed`].
    pub async fn commit(&mut self) -> Result<Option<Response>> {
        self.channel_mut()?;
        let Some(command) = self.vendor.commit_command.clone() else {
            return Ok(None);
        };
        if !self.check_config_mode() {
            return Ok(None);
        }

        debug!("committing configuration");
        let pattern = self.active_prompt();
        let response = self
            .exchange(&command, &pattern, self.profile.read_timeout)
            .await?;

        if let Some(line) = self.vendor.find_commit_error(&response.raw_result) {
            warn!("commit failed: {}", line);
            let recovery_error = self.recover().await;
            return Err(DeviceError::CommitFailed {
                output: response.result,
                recovery_error,
            }
            .into());
        }
        Ok(Some(response))
    }

    /// Discard staged configuration and leave configuration mode.
    pub async fn abort_config(&mut self) -> Result<String> {
        self.channel_mut()?;
        if !self.check_config_mode() {
            return Ok(String::new());
        }

        let mut output = String::new();
        if let Some(command) = self.vendor.abort_command.clone() {
            debug!("aborting configuration: {}", command);
            let pattern = self.any_prompt();
            let response = self
                .exchange(&command, &pattern, self.profile.read_timeout)
                .await?;
            output.push_str(&response.raw_result);
        }

        self.find_prompt().await?;
        if let Some(response) = self.send_exit().await? {
            output.push_str(&response.raw_result);
        }
        Ok(output)
    }

    async fn enter_config(&mut self) -> Result<Response> {
        let (Some(command), Some(pattern)) = (
            self.vendor.config_command.clone(),
            self.vendor.config_prompt.clone(),
        ) else {
            return Err(DriverError::ConfigModeUnsupported {
                platform: self.vendor.name.clone(),
            }
            .into());
        };

        debug!("entering configuration mode");
        let either = self.any_prompt();
        let response = self
            .exchange(&command, &either, self.profile.read_timeout)
            .await?;
        if self.vendor.find_error(&response.raw_result).is_some() {
            return Err(DeviceError::ConfigEntryRejected {
                output: response.raw_result,
            }
            .into());
        }
        if !pattern.is_match(response.prompt.as_bytes()) {
            return Err(DriverError::ModeTransitionFailed {
                expected: Mode::Configuring.to_string(),
                prompt: response.prompt,
            }
            .into());
        }

        self.mode = Mode::Configuring;
        Ok(response)
    }

    /// Commit (where the dialect stages changes), then exit.
    async fn leave_config(&mut self) -> Result<Vec<Response>> {
        let mut responses = Vec::new();
        if !self.check_config_mode() {
            return Ok(responses);
        }
        responses.extend(self.commit().await?);
        responses.extend(self.send_exit().await?);
        Ok(responses)
    }

    /// Send the exit command as is; staged changes are not committed.
    async fn send_exit(&mut self) -> Result<Option<Response>> {
        if !self.check_config_mode() {
            return Ok(None);
        }
        let Some(command) = self.vendor.exit_config_command.clone() else {
            return Err(DriverError::ConfigModeUnsupported {
                platform: self.vendor.name.clone(),
            }
            .into());
        };

        debug!("leaving configuration mode");
        let pattern = self.vendor.prompt.clone();
        let response = self
            .exchange(&command, &pattern, self.profile.read_timeout)
            .await?;

        self.find_prompt().await?;
        if self.check_config_mode() {
            return Err(DriverError::ModeTransitionFailed {
                expected: "exec".to_string(),
                prompt: self.base_prompt.clone().unwrap_or_default(),
            }
            .into());
        }
        Ok(Some(response))
    }

    /// Best-effort abort after a device error; returns the abort's own error.
    async fn recover(&mut self) -> Option<String> {
        match self.abort_config().await {
            Ok(_) => None,
            Err(e) => {
                warn!("abort after device error failed: {}", e);
                Some(e.to_string())
            }
        }
    }

    fn last_match(&self) -> Option<String> {
        self.channel
            .as_ref()
            .and_then(|channel| channel.last_match())
            .map(str::to_string)
    }

    fn last_match_is(&self, pattern: &PromptPattern) -> bool {
        self.last_match()
            .is_some_and(|m| pattern.is_match(m.as_bytes()))
    }
}
