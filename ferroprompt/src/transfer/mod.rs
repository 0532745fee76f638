//! File transfer over a secondary channel.
//!
//! Transfers run on their own connection, independent of any interactive
//! [`Session`](crate::Session), so a file can be pushed while a session is
//! busy.

mod scp;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

pub use scp::{ScpHeader, ScpTransfer};

/// Outcome of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    /// Local file path.
    pub local: PathBuf,
    /// Remote file path.
    pub remote: String,
    /// Bytes moved.
    pub bytes: u64,
    /// Wall-clock time of the transfer, connection setup included.
    pub elapsed: Duration,
}

/// Copies whole files to and from a device.
pub trait FileTransfer: Send + Sync {
    /// Upload `local` to `remote`.
    fn put(&self, local: &Path, remote: &str) -> impl Future<Output = Result<TransferReport>> + Send;

    /// Download `remote` to `local`.
    fn get(&self, remote: &str, local: &Path) -> impl Future<Output = Result<TransferReport>> + Send;
}
