//! Transport boundary.
//!
//! A [`Connector`] authenticates and opens a bidirectional byte stream; the
//! resulting [`Transport`] is owned exclusively by one session. The SSH
//! implementation wraps russh and is what [`Session::new`](crate::Session::new)
//! uses by default.

pub mod config;
#[cfg(test)]
pub(crate) mod mock;
mod ssh;

use std::future::Future;

use bytes::Bytes;

use crate::error::Result;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use ssh::{SshConnector, SshStream};
pub(crate) use ssh::{SshHandler, connect_authenticated};

/// Opens transport streams.
pub trait Connector: Send + Sync {
    /// The stream type produced by this connector.
    type Stream: Transport;

    /// Connect and authenticate, returning a stream ready for interactive use.
    fn connect(&self, config: &SshConfig) -> impl Future<Output = Result<Self::Stream>> + Send;
}

/// A bidirectional, interactive byte stream.
pub trait Transport: Send {
    /// Write raw bytes to the remote side.
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait for the next chunk of output.
    ///
    /// Returns `Ok(None)` once the remote side has closed the stream.
    fn read_chunk(&mut self) -> impl Future<Output = Result<Option<Bytes>>> + Send;

    /// Close the stream.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
