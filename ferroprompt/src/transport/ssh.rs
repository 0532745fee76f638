//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use log::{debug, trace, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKey, PrivateKeyWithHashAlg, PublicKey, decode_secret_key, load_secret_key};
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;

use super::config::{AuthMethod, HostKeyVerification, SshConfig};
use super::{Connector, Transport};
use crate::error::{ChannelError, Result, TransportError};

/// Default [`Connector`]: password or public-key SSH with a PTY shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshConnector;

impl Connector for SshConnector {
    type Stream = SshStream;

    async fn connect(&self, config: &SshConfig) -> Result<SshStream> {
        let session = connect_authenticated(config).await?;
        let channel = open_shell(&session, config).await?;
        debug!("PTY shell open on {}", config.socket_addr());
        Ok(SshStream { session, channel })
    }
}

/// An interactive PTY shell over SSH.
pub struct SshStream {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// The shell channel.
    channel: Channel<Msg>,
}

impl Transport for SshStream {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.channel
            .data(data)
            .await
            .map_err(|_| ChannelError::Closed)?;
        Ok(())
    }

    async fn read_chunk(&mut self) -> Result<Option<Bytes>> {
        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) => return Ok(Some(Bytes::copy_from_slice(&data))),
                Some(ChannelMsg::ExtendedData { data, .. }) => {
                    return Ok(Some(Bytes::copy_from_slice(&data)));
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => return Ok(None),
                Some(other) => trace!("ignoring channel message {:?}", other),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        // The peer may already have torn the channel down.
        if let Err(e) = self.channel.eof().await {
            debug!("channel eof failed: {}", e);
        }
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// Connect to the SSH server and authenticate.
///
/// Shared with the SCP transfer, which needs its own connection.
pub(crate) async fn connect_authenticated(config: &SshConfig) -> Result<Handle<SshHandler>> {
    let ssh_config = Arc::new(client::Config {
        inactivity_timeout: None,
        ..Default::default()
    });

    let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

    let handler = SshHandler {
        host: config.host.clone(),
        port: config.port,
        host_key_verification: config.host_key_verification.clone(),
        known_hosts_path: config.known_hosts_path.clone(),
        host_key_error: host_key_error.clone(),
    };

    let mut session = tokio::time::timeout(
        config.timeout,
        client::connect(ssh_config, (config.host.as_str(), config.port), handler),
    )
    .await
    .map_err(|_| TransportError::Timeout(config.timeout))?
    .map_err(|e| {
        // If check_server_key stored a detailed error, use that instead
        // of the generic russh::Error::UnknownKey
        let stored = host_key_error
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        stored.unwrap_or(TransportError::Ssh(e))
    })?;

    authenticate(&mut session, config).await?;

    Ok(session)
}

/// Open a PTY channel and request a shell on it.
async fn open_shell(session: &Handle<SshHandler>, config: &SshConfig) -> Result<Channel<Msg>> {
    let channel = session
        .channel_open_session()
        .await
        .map_err(|_| ChannelError::PtyOpenFailed)?;

    channel
        .request_pty(
            true,
            "vt100",
            config.terminal_width,
            config.terminal_height,
            0,
            0,
            &[],
        )
        .await
        .map_err(TransportError::Ssh)?;

    channel
        .request_shell(true)
        .await
        .map_err(TransportError::Ssh)?;

    Ok(channel)
}

async fn authenticate(session: &mut Handle<SshHandler>, config: &SshConfig) -> Result<()> {
    let success = match &config.auth {
        AuthMethod::Password(password) => session
            .authenticate_password(&config.username, password.expose_secret())
            .await
            .map_err(TransportError::Ssh)?
            .success(),
        AuthMethod::PrivateKey { path, passphrase } => {
            let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                .map_err(|e| TransportError::Key(e.to_string()))?;
            authenticate_key(session, &config.username, key).await?
        }
        AuthMethod::KeyData { pem, passphrase } => {
            let key = decode_secret_key(
                pem.expose_secret(),
                passphrase.as_ref().map(|p| p.expose_secret()),
            )
            .map_err(|e| TransportError::Key(e.to_string()))?;
            authenticate_key(session, &config.username, key).await?
        }
    };

    if !success {
        return Err(TransportError::AuthenticationFailed {
            user: config.username.clone(),
        }
        .into());
    }

    Ok(())
}

async fn authenticate_key(
    session: &mut Handle<SshHandler>,
    username: &str,
    key: PrivateKey,
) -> Result<bool> {
    // Get the best RSA hash algorithm supported by the server
    let hash_alg = session
        .best_supported_rsa_hash()
        .await
        .map_err(TransportError::Ssh)?
        .flatten();

    Ok(session
        .authenticate_publickey(username, PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg))
        .await
        .map_err(TransportError::Ssh)?
        .success())
}

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(TransportError::HostKeyChanged)` if key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, error: TransportError) -> bool {
        *self
            .host_key_error
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(error);
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let accepted = match self.host_key_verification {
            HostKeyVerification::Disabled => true,

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key: {}", e);
                    }
                    true
                }
                Err(e) => self.reject(e),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                }),
                Err(e) => self.reject(e),
            },
        };
        Ok(accepted)
    }
}
