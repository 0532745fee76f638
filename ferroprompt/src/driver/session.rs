//! Session lifecycle: connect, prompt discovery, disconnect.

use std::time::Duration;

use log::{debug, trace, warn};
use tokio::time::Instant;

use super::profile::{DeviceProfile, MAX_DELAY_FACTOR, delay_factor_in_range};
use super::response::Response;
use crate::channel::{PromptPattern, PtyChannel, PtyConfig};
use crate::error::{ChannelError, ConfigError, DriverError, Error, Result, TransportError};
use crate::platform::{Mode, PlatformRegistry, VendorProfile};
use crate::transport::{Connector, SshConnector};

/// Pause between writing a command and starting to read its output.
pub(super) const SETTLE_DELAY: Duration = Duration::from_millis(50);

/// How long prompt discovery listens after sending a bare newline.
const DISCOVERY_WINDOW: Duration = Duration::from_millis(500);

/// Bound on closing the transport.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// An interactive CLI session with one device.
///
/// Every operation takes `&mut self`, so a session has at most one
/// outstanding read at a time. Sessions share nothing with each other and
/// can be driven from separate tasks.
///
/// # Example
///
/// ```rust,no_run
/// use ferroprompt::{CommandOptions, DeviceProfile, Session};
///
/// # async fn example() -> Result<(), ferroprompt::Error> {
/// let profile = DeviceProfile::builder("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .device_type("cisco_ios")
///     .build()?;
///
/// let mut session = Session::new(profile)?;
/// session.connect().await?;
/// let response = session
///     .send_command("show version", &CommandOptions::default())
///     .await?;
/// println!("{}", response.result);
/// session.disconnect().await?;
/// # Ok(())
/// # }
/// ```
pub struct Session<C: Connector = SshConnector> {
    pub(super) profile: DeviceProfile,
    pub(super) vendor: VendorProfile,
    connector: C,

    /// Open channel; `None` while disconnected.
    pub(super) channel: Option<PtyChannel<C::Stream>>,

    /// Prompt pattern used outside configuration mode.
    pub(super) prompt: PromptPattern,

    /// Last prompt seen by discovery.
    pub(super) base_prompt: Option<String>,

    pub(super) mode: Mode,
}

impl Session<SshConnector> {
    /// Create a session over SSH.
    ///
    /// Resolves `profile.device_type` against the global
    /// [`PlatformRegistry`]. Does not connect.
    pub fn new(profile: DeviceProfile) -> Result<Self> {
        Self::with_connector(profile, SshConnector)
    }
}

impl<C: Connector> Session<C> {
    /// Create a session that opens its stream through `connector`.
    pub fn with_connector(profile: DeviceProfile, connector: C) -> Result<Self> {
        profile.validate()?;
        let vendor = PlatformRegistry::lookup(&profile.device_type)?;
        Ok(Self::with_vendor(profile, vendor, connector))
    }

    /// Create a session for a vendor profile that is not in the registry.
    pub fn with_vendor(profile: DeviceProfile, vendor: VendorProfile, connector: C) -> Self {
        let prompt = vendor.prompt.clone();
        Self {
            profile,
            vendor,
            connector,
            channel: None,
            prompt,
            base_prompt: None,
            mode: Mode::Normal,
        }
    }

    /// The device profile this session was built from.
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// The vendor profile driving this session.
    pub fn vendor(&self) -> &VendorProfile {
        &self.vendor
    }

    /// Current mode, as last derived from the prompt.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Last prompt seen by discovery.
    pub fn base_prompt(&self) -> Option<&str> {
        self.base_prompt.as_deref()
    }

    /// Whether the session holds an open stream.
    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Connect, prepare the session and discover the prompt.
    ///
    /// Credentials are validated before any network I/O. If any later step
    /// fails the stream is closed and the session stays disconnected.
    pub async fn connect(&mut self) -> Result<()> {
        let auth = self.profile.auth_method()?;
        if self.channel.is_some() {
            return Err(DriverError::AlreadyConnected.into());
        }

        let config = self.profile.ssh_config(auth);
        debug!(
            "connecting to {} as {} ({})",
            config.socket_addr(),
            config.username,
            self.vendor.name
        );

        let timeout = self.profile.connect_timeout;
        let stream = tokio::time::timeout(timeout, self.connector.connect(&config))
            .await
            .map_err(|_| TransportError::Timeout(timeout))??;
        self.channel = Some(PtyChannel::new(stream, PtyConfig::default()));

        if let Err(e) = self.establish().await {
            debug!("session setup failed: {}", e);
            if let Some(channel) = self.channel.take() {
                if let Err(close) = channel.close().await {
                    warn!("failed to close stream after setup error: {}", close);
                }
            }
            self.reset();
            return Err(e);
        }

        debug!(
            "connected to {}, prompt {:?}, mode {}",
            self.profile.host,
            self.base_prompt.as_deref().unwrap_or(""),
            self.mode
        );
        Ok(())
    }

    /// Wait for the first prompt, run session preparation, find the prompt.
    async fn establish(&mut self) -> Result<()> {
        let read_timeout = self.profile.read_timeout;
        let vendor_prompt = self.vendor.prompt.clone();

        match self.channel_mut()?.read_until(&vendor_prompt, read_timeout).await {
            Ok(banner) => trace!("banner: {:?}", banner),
            Err(Error::Channel(ChannelError::ReadTimeout { elapsed, .. })) => {
                warn!("no prompt after {:?}, continuing with setup", elapsed);
            }
            Err(e) => return Err(e),
        }

        for command in self.vendor.session_preparation.clone() {
            debug!("session preparation: {}", command);
            self.exchange(&command, &vendor_prompt, read_timeout).await?;
        }

        self.find_prompt().await?;
        Ok(())
    }

    /// Close the stream.
    ///
    /// Does nothing when already disconnected. The session is left
    /// disconnected even if closing fails.
    pub async fn disconnect(&mut self) -> Result<()> {
        let Some(channel) = self.channel.take() else {
            return Ok(());
        };
        self.reset();
        debug!("disconnecting from {}", self.profile.host);

        match tokio::time::timeout(CLOSE_TIMEOUT, channel.close()).await {
            Ok(result) => result,
            Err(_) => {
                warn!("close did not finish within {:?}", CLOSE_TIMEOUT);
                Err(TransportError::Timeout(CLOSE_TIMEOUT).into())
            }
        }
    }

    /// Discover the current prompt.
    ///
    /// Sends a bare newline and takes the last non-empty line of the reply
    /// as the literal prompt, which also fixes the current mode. If nothing
    /// prompt-like comes back, reads fall back to the vendor prompt pattern.
    pub async fn find_prompt(&mut self) -> Result<String> {
        let window = scaled(DISCOVERY_WINDOW, self.profile.global_delay_factor);
        let channel = self.channel_mut()?;
        channel.write("\n").await?;
        let output = channel.read_for(window).await?;

        let candidate = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .filter(|line| self.is_prompt_like(line));

        match candidate {
            Some(prompt) => {
                self.mode = self.vendor.mode_for_prompt(prompt);
                self.prompt = PromptPattern::literal(prompt);
                self.base_prompt = Some(prompt.to_string());
                trace!("prompt {:?}, mode {}", prompt, self.mode);
            }
            None => {
                warn!(
                    "prompt discovery saw nothing prompt-like, using vendor pattern; mode {} is unverified",
                    self.mode
                );
                self.prompt = self.vendor.prompt.clone();
                self.base_prompt = None;
            }
        }

        Ok(self.base_prompt.clone().unwrap_or_default())
    }

    /// Are we in privileged mode (or beyond)?
    pub fn check_enable_mode(&self) -> bool {
        matches!(self.mode, Mode::Enabled | Mode::Configuring)
    }

    /// Are we in configuration mode?
    pub fn check_config_mode(&self) -> bool {
        self.mode == Mode::Configuring
    }

    fn is_prompt_like(&self, line: &str) -> bool {
        let line = line.as_bytes();
        self.vendor.prompt.is_match(line)
            || self
                .vendor
                .config_prompt
                .as_ref()
                .is_some_and(|p| p.is_match(line))
    }

    fn reset(&mut self) {
        self.prompt = self.vendor.prompt.clone();
        self.base_prompt = None;
        self.mode = Mode::Normal;
    }

    pub(super) fn channel_mut(&mut self) -> Result<&mut PtyChannel<C::Stream>> {
        self.channel
            .as_mut()
            .ok_or_else(|| DriverError::NotConnected.into())
    }

    /// Pattern that ends a read in the current mode.
    pub(super) fn active_prompt(&self) -> PromptPattern {
        match (&self.mode, &self.vendor.config_prompt) {
            (Mode::Configuring, Some(config)) => config.clone(),
            _ => self.prompt.clone(),
        }
    }

    /// Either the vendor prompt or the config prompt.
    pub(super) fn any_prompt(&self) -> PromptPattern {
        match &self.vendor.config_prompt {
            Some(config) => PromptPattern::either(&self.vendor.prompt, config),
            None => self.vendor.prompt.clone(),
        }
    }

    /// Effective multiplier for one operation.
    pub(super) fn delay_factor(&self, delay_factor: Option<f64>) -> Result<f64> {
        let factor = delay_factor.unwrap_or(1.0);
        if !delay_factor_in_range(factor) {
            return Err(ConfigError::InvalidDelayFactor {
                factor,
                max: MAX_DELAY_FACTOR,
            }
            .into());
        }
        Ok(self.profile.global_delay_factor * factor)
    }

    /// Send one line and read until `pattern`, stripping echo and prompt.
    pub(super) async fn exchange(
        &mut self,
        command: &str,
        pattern: &PromptPattern,
        timeout: Duration,
    ) -> Result<Response> {
        let settle = scaled(SETTLE_DELAY, self.profile.global_delay_factor);
        let start = Instant::now();

        let channel = self.channel_mut()?;
        channel.send_line(command).await?;
        tokio::time::sleep(settle).await;
        let raw = channel
            .read_until(pattern, timeout)
            .await
            .map_err(|e| command_timeout(command, e))?;
        let prompt = channel.last_match().unwrap_or_default().to_string();

        let result = super::command::strip_output(&raw, command, true, true, &self.vendor);
        Ok(Response::new(command, result, raw, prompt, start.elapsed()))
    }
}

/// `duration × factor`, saturating instead of panicking on overflow.
pub(super) fn scaled(duration: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(duration.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

/// Attach the command to a read timeout.
pub(super) fn command_timeout(command: &str, err: Error) -> Error {
    match err {
        Error::Channel(ChannelError::ReadTimeout {
            pattern,
            elapsed,
            tail,
        }) => DriverError::CommandTimeout {
            command: command.to_string(),
            pattern,
            elapsed,
            tail,
        }
        .into(),
        other => other,
    }
}

impl<C: Connector> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.profile.host)
            .field("platform", &self.vendor.name)
            .field("connected", &self.channel.is_some())
            .field("prompt", &self.base_prompt)
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::test_util::{new_session, profile};
    use crate::error::ConfigError;
    use crate::transport::mock::MockDevice;

    #[tokio::test(start_paused = true)]
    async fn test_connect_prepares_and_discovers_prompt() {
        let device = MockDevice::new("Router>");
        let mut session = new_session(&device, "cisco_ios");

        session.connect().await.unwrap();

        assert!(session.is_connected());
        assert_eq!(session.base_prompt(), Some("Router>"));
        assert_eq!(session.mode(), Mode::Normal);
        assert_eq!(
            device.written(),
            vec!["terminal length 0", "terminal width 511", ""]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_derives_enabled_mode() {
        let device = MockDevice::new("core-sw01#");
        let mut session = new_session(&device, "cisco_nxos");
        session.connect().await.unwrap();
        assert_eq!(session.mode(), Mode::Enabled);
        assert!(session.check_enable_mode());
        assert!(!session.check_config_mode());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_checked_before_any_io() {
        let device = MockDevice::new("Router>");
        let profile = DeviceProfile::builder("10.0.0.1")
            .username("admin")
            .device_type("cisco_ios")
            .build()
            .unwrap();
        let mut session = Session::with_connector(profile, device.connector()).unwrap();

        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::MissingAuth { .. })));
        assert_eq!(device.connect_calls(), 0);
        assert!(!session.is_connected());
    }

    #[test]
    fn test_unknown_device_type() {
        let device = MockDevice::new("Router>");
        let err = Session::with_connector(profile("cisco_asa"), device.connector()).unwrap_err();
        assert!(err.to_string().contains("cisco_asa"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_twice_fails() {
        let device = MockDevice::new("host$");
        let mut session = new_session(&device, "linux");
        session.connect().await.unwrap();

        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::AlreadyConnected)));
        assert_eq!(device.connect_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_readiness_timeout_is_tolerated() {
        let device = MockDevice::new("host$").banner("Last login: Tue Oct 13\r\n");
        let mut session = new_session(&device, "linux");

        let start = Instant::now();
        session.connect().await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(10));
        assert_eq!(session.base_prompt(), Some("host$"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_failure_leaves_session_disconnected() {
        let device = MockDevice::new("Router>").hang_up_after(1);
        let mut session = new_session(&device, "cisco_ios");

        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, Error::Channel(ChannelError::Closed)));
        assert!(!session.is_connected());
        assert_eq!(device.close_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_twice_closes_once() {
        let device = MockDevice::new("host$");
        let mut session = new_session(&device, "linux");
        session.connect().await.unwrap();

        session.disconnect().await.unwrap();
        session.disconnect().await.unwrap();

        assert_eq!(device.close_calls(), 1);
        assert!(!session.is_connected());
        assert_eq!(session.base_prompt(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_operations_fail_after_disconnect() {
        let device = MockDevice::new("host$");
        let mut session = new_session(&device, "linux");
        session.connect().await.unwrap();
        session.disconnect().await.unwrap();

        let err = session.find_prompt().await.unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::NotConnected)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_find_prompt_falls_back_to_vendor_pattern() {
        let device = MockDevice::new("host$").silent();
        let mut session = new_session(&device, "linux");

        session.connect().await.unwrap();

        assert_eq!(session.base_prompt(), None);
        assert_eq!(session.active_prompt().as_str(), session.vendor.prompt.as_str());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_rediscovery_forgets_stale_prompt() {
        let device = MockDevice::new("Router#").on("copy flash: tftp:", "copy flash: tftp:\r\n100%");
        let mut session = new_session(&device, "cisco_ios");
        session.connect().await.unwrap();
        assert_eq!(session.base_prompt(), Some("Router#"));

        session
            .send_command_timing("copy flash: tftp:", &crate::CommandOptions::default())
            .await
            .unwrap();
        let prompt = session.find_prompt().await.unwrap();

        assert_eq!(prompt, "");
        assert_eq!(session.base_prompt(), None);
        assert_eq!(session.active_prompt().as_str(), session.vendor.prompt.as_str());
    }

    #[test]
    fn test_scaled_saturates() {
        assert_eq!(scaled(Duration::from_secs(10), 2.5), Duration::from_secs(25));
        assert_eq!(scaled(Duration::MAX, 2.0), Duration::MAX);
    }
}
