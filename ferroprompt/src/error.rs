//! Error types for ferroprompt.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for ferroprompt operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Device profile / credential problems, raised before any network I/O
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Errors reported by the device itself
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Platform/vendor errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// File transfer errors
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),
}

/// Device profile errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Neither a password nor a key was supplied
    #[error("No authentication material for '{host}': set a password or a private key")]
    MissingAuth { host: String },

    /// Both a password and a key were supplied
    #[error("Ambiguous authentication material for '{host}': set a password or a private key, not both")]
    AmbiguousAuth { host: String },

    /// A required field is missing or invalid
    #[error("Invalid device profile: {message}")]
    InvalidProfile { message: String },

    /// A delay factor that cannot scale a duration
    #[error("Delay factor must be a positive number no greater than {max}, got {factor}")]
    InvalidDelayFactor { factor: f64, max: f64 },
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host not present in known_hosts (strict verification)
    #[error("Host key for {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key does not match the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (pattern matching, PTY operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to open PTY channel
    #[error("Failed to open PTY channel")]
    PtyOpenFailed,

    /// No match for `pattern` before the deadline
    #[error("Pattern '{pattern}' not found within {elapsed:?} (buffer tail: {tail:?})")]
    ReadTimeout {
        pattern: String,
        elapsed: Duration,
        tail: String,
    },

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Driver layer errors (command execution, mode transitions).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Driver not connected
    #[error("Session not connected - call connect() first")]
    NotConnected,

    /// Driver already connected
    #[error("Session already connected")]
    AlreadyConnected,

    /// A command's terminating pattern never appeared
    #[error("Command '{command}' timed out after {elapsed:?} waiting for '{pattern}' (buffer tail: {tail:?})")]
    CommandTimeout {
        command: String,
        pattern: String,
        elapsed: Duration,
        tail: String,
    },

    /// The enable secret was rejected
    #[error("Failed to enter enable mode: invalid secret (prompt '{prompt}')")]
    InvalidSecret { prompt: String },

    /// The dialect has no configuration mode
    #[error("Configuration mode is not supported on platform '{platform}'")]
    ConfigModeUnsupported { platform: String },

    /// The prompt after a mode transition does not reflect the expected mode
    #[error("Failed to reach {expected} mode (prompt '{prompt}')")]
    ModeTransitionFailed { expected: String, prompt: String },
}

/// Errors the device reports in its own output.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Entering configuration mode produced an error
    #[error("Device rejected configuration mode entry:\n{output}")]
    ConfigEntryRejected { output: String },

    /// A configuration command produced an error
    #[error("Configuration failed on command '{command}'{}.\nDevice output:\n{output}", recovery_suffix(.recovery_error))]
    CommandRejected {
        command: String,
        output: String,
        recovery_error: Option<String>,
    },

    /// Commit reported a failure
    #[error("Configuration commit failed{}:\n{output}", recovery_suffix(.recovery_error))]
    CommitFailed {
        output: String,
        recovery_error: Option<String>,
    },
}

fn recovery_suffix(recovery_error: &Option<String>) -> String {
    match recovery_error {
        Some(e) => format!(" (abort also failed: {e})"),
        None => String::new(),
    }
}

/// Platform/vendor definition errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Invalid platform definition
    #[error("Invalid platform definition: {message}")]
    InvalidDefinition { message: String },

    /// Unknown platform name
    #[error("Unsupported device type: '{name}'")]
    UnknownPlatform { name: String },

    /// Platform already registered
    #[error("Platform '{name}' is already registered")]
    AlreadyRegistered { name: String },
}

/// Secondary-channel file transfer errors.
#[derive(Error, Debug)]
pub enum TransferError {
    /// Local file could not be read or written
    #[error("Local file '{path}': {source}")]
    Local {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The remote side answered with an error
    #[error("Remote rejected transfer of '{path}': {message}")]
    Remote { path: String, message: String },

    /// The remote side broke the SCP framing
    #[error("SCP protocol error: {0}")]
    Protocol(String),
}

/// Result type alias using ferroprompt's Error.
pub type Result<T> = std::result::Result<T, Error>;
