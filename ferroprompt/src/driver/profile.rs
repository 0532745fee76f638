//! Device profile: who to connect to and how.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::error::{ConfigError, Result};
use crate::transport::{AuthMethod, HostKeyVerification, SshConfig};

const DEFAULT_PORT: u16 = 22;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_TERMINAL_WIDTH: u32 = 511;
const DEFAULT_TERMINAL_HEIGHT: u32 = 24;

/// Largest accepted delay factor, global or per command.
pub const MAX_DELAY_FACTOR: f64 = 1000.0;

/// Connection parameters for one device.
///
/// Build one with [`DeviceProfile::builder`], or deserialize it:
///
/// ```json
/// {
///   "host": "10.0.0.1",
///   "username": "admin",
///   "password": "cisco",
///   "secret": "enable-secret",
///   "device_type": "cisco_ios",
///   "read_timeout_ms": 20000
/// }
/// ```
///
/// Timeouts are given in milliseconds. Secrets are held as [`SecretString`]
/// and never appear in `Debug` output.
#[derive(Debug, Deserialize)]
pub struct DeviceProfile {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Login username.
    pub username: String,

    /// Login password.
    #[serde(default, deserialize_with = "secret")]
    pub password: Option<SecretString>,

    /// Private key file.
    #[serde(default)]
    pub key_file: Option<PathBuf>,

    /// Private key text (OpenSSH or PEM).
    #[serde(default, deserialize_with = "secret")]
    pub key_data: Option<SecretString>,

    /// Passphrase for an encrypted private key.
    #[serde(default, deserialize_with = "secret")]
    pub passphrase: Option<SecretString>,

    /// Privileged-mode (enable) secret.
    #[serde(default, deserialize_with = "secret")]
    pub secret: Option<SecretString>,

    /// Dialect tag (e.g., "cisco_ios", "juniper_junos", "linux").
    pub device_type: String,

    /// Bound on opening the transport.
    #[serde(
        rename = "connect_timeout_ms",
        default = "default_connect_timeout",
        deserialize_with = "millis"
    )]
    pub connect_timeout: Duration,

    /// Bound on each pattern-gated read.
    #[serde(
        rename = "read_timeout_ms",
        default = "default_read_timeout",
        deserialize_with = "millis"
    )]
    pub read_timeout: Duration,

    /// Multiplier applied to every delay and timeout. Raise it for slow
    /// devices.
    #[serde(default = "default_delay_factor")]
    pub global_delay_factor: f64,

    /// Terminal width for the PTY.
    #[serde(default = "default_terminal_width")]
    pub terminal_width: u32,

    /// Terminal height for the PTY.
    #[serde(default = "default_terminal_height")]
    pub terminal_height: u32,

    /// Host key verification mode.
    #[serde(default)]
    pub host_key_verification: HostKeyVerification,

    /// known_hosts file; `~/.ssh/known_hosts` when unset.
    #[serde(default)]
    pub known_hosts_path: Option<PathBuf>,
}

impl DeviceProfile {
    /// Start building a profile for `host`.
    pub fn builder(host: impl Into<String>) -> DeviceProfileBuilder {
        DeviceProfileBuilder::new(host)
    }

    /// Check the fields that do not involve credentials.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(invalid("host is required"));
        }
        if self.username.trim().is_empty() {
            return Err(invalid("username is required"));
        }
        if self.device_type.trim().is_empty() {
            return Err(invalid("device_type is required"));
        }
        if !delay_factor_in_range(self.global_delay_factor) {
            return Err(invalid(format!(
                "global_delay_factor must be a positive number no greater than {}, got {}",
                MAX_DELAY_FACTOR, self.global_delay_factor
            )));
        }
        Ok(())
    }

    /// Resolve the authentication material.
    ///
    /// Exactly one of a password, a key file or key text must be present.
    /// An empty password counts as absent.
    pub fn auth_method(&self) -> Result<AuthMethod> {
        let password = self
            .password
            .as_ref()
            .filter(|p| !p.expose_secret().is_empty());

        let key = match (&self.key_file, &self.key_data) {
            (Some(_), Some(_)) => return Err(self.ambiguous()),
            (Some(path), None) => Some(AuthMethod::PrivateKey {
                path: path.clone(),
                passphrase: self.passphrase.as_ref().map(copy_secret),
            }),
            (None, Some(pem)) => Some(AuthMethod::KeyData {
                pem: copy_secret(pem),
                passphrase: self.passphrase.as_ref().map(copy_secret),
            }),
            (None, None) => None,
        };

        match (password, key) {
            (Some(_), Some(_)) => Err(self.ambiguous()),
            (Some(password), None) => Ok(AuthMethod::Password(copy_secret(password))),
            (None, Some(key)) => Ok(key),
            (None, None) => Err(ConfigError::MissingAuth {
                host: self.host.clone(),
            }
            .into()),
        }
    }

    /// Build the transport configuration around resolved credentials.
    pub fn ssh_config(&self, auth: AuthMethod) -> SshConfig {
        SshConfig {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            auth,
            timeout: self.connect_timeout,
            terminal_width: self.terminal_width,
            terminal_height: self.terminal_height,
            host_key_verification: self.host_key_verification.clone(),
            known_hosts_path: self.known_hosts_path.clone(),
        }
    }

    fn ambiguous(&self) -> crate::Error {
        ConfigError::AmbiguousAuth {
            host: self.host.clone(),
        }
        .into()
    }
}

/// Builder for [`DeviceProfile`].
///
/// # Example
///
/// ```rust
/// use ferroprompt::DeviceProfile;
///
/// # fn example() -> Result<(), ferroprompt::Error> {
/// let profile = DeviceProfile::builder("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .device_type("cisco_ios")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct DeviceProfileBuilder {
    profile: DeviceProfile,
}

impl DeviceProfileBuilder {
    fn new(host: impl Into<String>) -> Self {
        Self {
            profile: DeviceProfile {
                host: host.into(),
                port: DEFAULT_PORT,
                username: String::new(),
                password: None,
                key_file: None,
                key_data: None,
                passphrase: None,
                secret: None,
                device_type: String::new(),
                connect_timeout: DEFAULT_CONNECT_TIMEOUT,
                read_timeout: DEFAULT_READ_TIMEOUT,
                global_delay_factor: 1.0,
                terminal_width: DEFAULT_TERMINAL_WIDTH,
                terminal_height: DEFAULT_TERMINAL_HEIGHT,
                host_key_verification: HostKeyVerification::default(),
                known_hosts_path: None,
            },
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.profile.port = port;
        self
    }

    /// Set the login username.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.profile.username = username.into();
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.profile.password = Some(SecretString::from(password.into()));
        self
    }

    /// Set private key authentication from a file.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.profile.key_file = Some(key_path.into());
        self
    }

    /// Set private key authentication from key text.
    pub fn key_data(mut self, pem: impl Into<String>) -> Self {
        self.profile.key_data = Some(SecretString::from(pem.into()));
        self
    }

    /// Set the private key passphrase.
    pub fn passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.profile.passphrase = Some(SecretString::from(passphrase.into()));
        self
    }

    /// Set the enable secret.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.profile.secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Set the dialect tag (e.g., "linux", "cisco_ios").
    pub fn device_type(mut self, device_type: impl Into<String>) -> Self {
        self.profile.device_type = device_type.into();
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.profile.connect_timeout = timeout;
        self
    }

    /// Set the read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.profile.read_timeout = timeout;
        self
    }

    /// Set the delay multiplier.
    pub fn global_delay_factor(mut self, factor: f64) -> Self {
        self.profile.global_delay_factor = factor;
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.profile.terminal_width = width;
        self.profile.terminal_height = height;
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.profile.host_key_verification = mode;
        self
    }

    /// Set a custom known_hosts file path.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.profile.known_hosts_path = Some(path.into());
        self
    }

    /// Validate and return the profile.
    ///
    /// Credentials are checked later, by `connect`.
    pub fn build(self) -> Result<DeviceProfile> {
        self.profile.validate()?;
        Ok(self.profile)
    }
}

pub(crate) fn delay_factor_in_range(factor: f64) -> bool {
    factor.is_finite() && factor > 0.0 && factor <= MAX_DELAY_FACTOR
}

fn invalid(message: impl Into<String>) -> crate::Error {
    ConfigError::InvalidProfile {
        message: message.into(),
    }
    .into()
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_read_timeout() -> Duration {
    DEFAULT_READ_TIMEOUT
}

fn default_delay_factor() -> f64 {
    1.0
}

fn default_terminal_width() -> u32 {
    DEFAULT_TERMINAL_WIDTH
}

fn default_terminal_height() -> u32 {
    DEFAULT_TERMINAL_HEIGHT
}

fn secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

fn millis<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}
