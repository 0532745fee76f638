//! SCP transfers over an SSH exec channel.
//!
//! The remote side runs `scp -t <path>` (we send) or `scp -f <path>` (we
//! receive). Each protocol step is acknowledged with a single status byte:
//! `0` for success, `1` (warning) or `2` (fatal) followed by a message line.
//! A file is announced with a header line `C<mode> <size> <name>\n`, then
//! its bytes, then a `0` byte.

use std::future::Future;
use std::io;
use std::path::Path;
use std::time::Duration;

use log::{debug, warn};
use russh::ChannelStream;
use russh::client::{Handle, Msg};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use super::{FileTransfer, TransferReport};
use crate::driver::DeviceProfile;
use crate::error::{Error, Result, TransferError, TransportError};
use crate::transport::{SshConfig, SshHandler, connect_authenticated};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Permissions announced for uploaded files.
const UPLOAD_MODE: u32 = 0o644;

/// Header line longer than this is treated as a protocol error.
const MAX_LINE: usize = 4096;

const INITIAL_CAPACITY: usize = 64 * 1024;

/// File header of the SCP protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScpHeader {
    /// Unix permission bits.
    pub mode: u32,
    /// File size in bytes.
    pub size: u64,
    /// File name, without directories.
    pub name: String,
}

impl ScpHeader {
    /// Render the header line, newline included.
    pub fn encode(&self) -> String {
        format!("C{:04o} {} {}\n", self.mode & 0o7777, self.size, self.name)
    }

    /// Parse a `C` header line, with or without its trailing newline.
    pub fn parse(line: &str) -> std::result::Result<Self, TransferError> {
        let line = line.trim_end_matches('\n');
        let fields = line
            .strip_prefix('C')
            .ok_or_else(|| protocol(format!("expected file header, got {:?}", line)))?;

        let mut parts = fields.splitn(3, ' ');
        let (Some(mode), Some(size), Some(name)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(protocol(format!("malformed file header {:?}", line)));
        };

        let mode = u32::from_str_radix(mode, 8)
            .map_err(|_| protocol(format!("bad mode in header {:?}", line)))?;
        let size = size
            .parse::<u64>()
            .map_err(|_| protocol(format!("bad size in header {:?}", line)))?;
        if name.is_empty() || name.contains('/') || name == ".." {
            return Err(protocol(format!("bad file name in header {:?}", line)));
        }

        Ok(Self {
            mode,
            size,
            name: name.to_string(),
        })
    }
}

/// SCP over its own SSH connection.
///
/// ```rust,no_run
/// use std::path::Path;
/// use ferroprompt::DeviceProfile;
/// use ferroprompt::transfer::{FileTransfer, ScpTransfer};
///
/// # async fn example(profile: DeviceProfile) -> Result<(), ferroprompt::Error> {
/// let scp = ScpTransfer::new(&profile)?;
/// let report = scp.put(Path::new("router.cfg"), "flash:/router.cfg").await?;
/// println!("sent {} bytes in {:?}", report.bytes, report.elapsed);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ScpTransfer {
    config: SshConfig,
    timeout: Duration,
}

impl ScpTransfer {
    /// Build a transfer client from the same profile a session uses.
    pub fn new(profile: &DeviceProfile) -> Result<Self> {
        profile.validate()?;
        let auth = profile.auth_method()?;
        Ok(Self {
            config: profile.ssh_config(auth),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Bound on a whole transfer, connection excluded (default: 5 minutes).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn open(&self, command: &str) -> Result<(Handle<SshHandler>, ChannelStream<Msg>)> {
        let session = connect_authenticated(&self.config).await?;
        let channel = session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;
        channel
            .exec(true, command)
            .await
            .map_err(TransportError::Ssh)?;
        debug!("{} on {}", command, self.config.socket_addr());
        Ok((session, channel.into_stream()))
    }

    async fn bounded<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
    }
}

impl FileTransfer for ScpTransfer {
    async fn put(&self, local: &Path, remote: &str) -> Result<TransferReport> {
        let command = remote_command("-t", remote)?;
        let start = Instant::now();
        let contents = tokio::fs::read(local).await.map_err(|source| local_error(local, source))?;
        let name = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| protocol(format!("'{}' has no file name", local.display())))?;
        let header = ScpHeader {
            mode: UPLOAD_MODE,
            size: contents.len() as u64,
            name,
        };

        let (session, mut stream) = self.open(&command).await?;
        let result = self
            .bounded(send_file(&mut stream, &header, &contents, remote))
            .await;
        hang_up(session).await;
        result?;

        debug!("sent {} bytes to {}", header.size, remote);
        Ok(TransferReport {
            local: local.to_path_buf(),
            remote: remote.to_string(),
            bytes: header.size,
            elapsed: start.elapsed(),
        })
    }

    async fn get(&self, remote: &str, local: &Path) -> Result<TransferReport> {
        let command = remote_command("-f", remote)?;
        let start = Instant::now();

        let (session, mut stream) = self.open(&command).await?;
        let result = self.bounded(receive_file(&mut stream, remote)).await;
        hang_up(session).await;
        let (header, contents) = result?;

        tokio::fs::write(local, &contents)
            .await
            .map_err(|source| local_error(local, source))?;

        debug!("received {} bytes from {}", header.size, remote);
        Ok(TransferReport {
            local: local.to_path_buf(),
            remote: remote.to_string(),
            bytes: header.size,
            elapsed: start.elapsed(),
        })
    }
}

/// Source side: push one file to a remote `scp -t`.
pub(crate) async fn send_file<S>(
    stream: &mut S,
    header: &ScpHeader,
    contents: &[u8],
    remote: &str,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    read_ack(stream, remote).await?;

    stream.write_all(header.encode().as_bytes()).await.map_err(io)?;
    stream.flush().await.map_err(io)?;
    read_ack(stream, remote).await?;

    stream.write_all(contents).await.map_err(io)?;
    stream.write_all(&[0]).await.map_err(io)?;
    stream.flush().await.map_err(io)?;
    read_ack(stream, remote).await?;

    stream.shutdown().await.map_err(io)?;
    Ok(())
}

/// Sink side: pull one file from a remote `scp -f`.
pub(crate) async fn receive_file<S>(stream: &mut S, remote: &str) -> Result<(ScpHeader, Vec<u8>)>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    ack(stream).await?;

    let header = loop {
        let status = stream.read_u8().await.map_err(io)?;
        match status {
            b'C' => {
                let line = read_line(stream).await?;
                break ScpHeader::parse(&format!("C{}", line))?;
            }
            // Timestamps, sent when the source runs with -p
            b'T' => {
                read_line(stream).await?;
                ack(stream).await?;
            }
            1 | 2 => {
                let message = read_line(stream).await?;
                return Err(remote_error(remote, message));
            }
            other => {
                return Err(protocol(format!("unexpected record type 0x{:02x}", other)).into());
            }
        }
    };
    ack(stream).await?;

    // Grow with the data actually received, not the announced size
    let mut contents = Vec::with_capacity(INITIAL_CAPACITY);
    let received = (&mut *stream)
        .take(header.size)
        .read_to_end(&mut contents)
        .await
        .map_err(io)?;
    if received as u64 != header.size {
        return Err(protocol(format!(
            "file truncated: {} of {} bytes",
            received, header.size
        ))
        .into());
    }
    read_ack(stream, remote).await?;
    ack(stream).await?;

    stream.shutdown().await.map_err(io)?;
    Ok((header, contents))
}

async fn ack<S: AsyncWrite + Unpin>(stream: &mut S) -> Result<()> {
    stream.write_all(&[0]).await.map_err(io)?;
    stream.flush().await.map_err(io)
}

async fn read_ack<S: AsyncRead + Unpin>(stream: &mut S, remote: &str) -> Result<()> {
    match stream.read_u8().await.map_err(io)? {
        0 => Ok(()),
        1 | 2 => {
            let message = read_line(stream).await?;
            Err(remote_error(remote, message))
        }
        other => Err(protocol(format!("unexpected status byte 0x{:02x}", other)).into()),
    }
}

async fn read_line<S: AsyncRead + Unpin>(stream: &mut S) -> Result<String> {
    let mut line = Vec::new();
    loop {
        let byte = stream.read_u8().await.map_err(io)?;
        if byte == b'\n' {
            break;
        }
        if line.len() >= MAX_LINE {
            return Err(protocol("status line too long").into());
        }
        line.push(byte);
    }
    Ok(String::from_utf8_lossy(&line).into_owned())
}

/// The remote `scp` invocation, with the path single-quoted for the shell.
fn remote_command(flag: &str, remote: &str) -> Result<String> {
    if remote.is_empty() || remote.chars().any(char::is_control) {
        return Err(protocol(format!("unsupported remote path {:?}", remote)).into());
    }
    Ok(format!("scp {} '{}'", flag, remote.replace('\'', r"'\''")))
}

async fn hang_up(session: Handle<SshHandler>) {
    if let Err(e) = session
        .disconnect(russh::Disconnect::ByApplication, "", "en")
        .await
    {
        warn!("scp disconnect failed: {}", e);
    }
}

fn io(e: io::Error) -> Error {
    TransportError::Io(e).into()
}

fn protocol(message: impl Into<String>) -> TransferError {
    TransferError::Protocol(message.into())
}

fn remote_error(remote: &str, message: String) -> Error {
    TransferError::Remote {
        path: remote.to_string(),
        message: message.trim().to_string(),
    }
    .into()
}

fn local_error(path: &Path, source: io::Error) -> Error {
    TransferError::Local {
        path: path.display().to_string(),
        source,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[test]
    fn test_header_encode() {
        let header = ScpHeader {
            mode: 0o644,
            size: 1234,
            name: "router.cfg".to_string(),
        };
        assert_eq!(header.encode(), "C0644 1234 router.cfg\n");
    }

    #[test]
    fn test_header_parse() {
        let header = ScpHeader::parse("C0755 42 run me.sh\n").unwrap();
        assert_eq!(header.mode, 0o755);
        assert_eq!(header.size, 42);
        assert_eq!(header.name, "run me.sh");
    }

    #[test]
    fn test_header_parse_rejects_garbage() {
        assert!(ScpHeader::parse("D0755 0 dir\n").is_err());
        assert!(ScpHeader::parse("C0644 12\n").is_err());
        assert!(ScpHeader::parse("C0999 12 x\n").is_err());
        assert!(ScpHeader::parse("C0644 -1 x\n").is_err());
        assert!(ScpHeader::parse("C0644 1 ../etc/passwd\n").is_err());
    }

    #[test]
    fn test_remote_path_check() {
        assert_eq!(
            remote_command("-t", "flash:/router.cfg").unwrap(),
            "scp -t 'flash:/router.cfg'"
        );
        assert_eq!(
            remote_command("-f", "/tmp/a b;reboot>(x)*?").unwrap(),
            "scp -f '/tmp/a b;reboot>(x)*?'"
        );
        assert_eq!(
            remote_command("-t", "it's.cfg").unwrap(),
            r"scp -t 'it'\''s.cfg'"
        );
        assert!(remote_command("-t", "").is_err());
        assert!(remote_command("-t", "a\nb").is_err());
    }

    #[tokio::test]
    async fn test_send_file() {
        let mut remote = tokio_test::io::Builder::new()
            .read(&[0])
            .write(b"C0644 5 a.txt\n")
            .read(&[0])
            .write(b"hello")
            .write(&[0])
            .read(&[0])
            .build();

        let header = ScpHeader {
            mode: 0o644,
            size: 5,
            name: "a.txt".to_string(),
        };
        send_file(&mut remote, &header, b"hello", "/tmp/a.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_file_remote_error() {
        let (mut local, mut remote) = duplex(1024);
        tokio::spawn(async move {
            remote
                .write_all(b"\x01scp: /readonly/a.txt: Permission denied\n")
                .await
                .unwrap();
        });

        let header = ScpHeader {
            mode: 0o644,
            size: 1,
            name: "a.txt".to_string(),
        };
        let err = send_file(&mut local, &header, b"x", "/readonly/a.txt")
            .await
            .unwrap_err();

        match err {
            Error::Transfer(TransferError::Remote { path, message }) => {
                assert_eq!(path, "/readonly/a.txt");
                assert_eq!(message, "scp: /readonly/a.txt: Permission denied");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_receive_file() {
        let (mut local, mut remote) = duplex(1024);
        let source = tokio::spawn(async move {
            assert_eq!(remote.read_u8().await.unwrap(), 0);
            remote.write_all(b"T1700000000 0 1700000000 0\n").await.unwrap();
            assert_eq!(remote.read_u8().await.unwrap(), 0);
            remote.write_all(b"C0600 11 running.cfg\n").await.unwrap();
            assert_eq!(remote.read_u8().await.unwrap(), 0);
            remote.write_all(b"hostname r1\0").await.unwrap();
            assert_eq!(remote.read_u8().await.unwrap(), 0);
        });

        let (header, contents) = receive_file(&mut local, "running.cfg").await.unwrap();
        source.await.unwrap();

        assert_eq!(header.mode, 0o600);
        assert_eq!(header.name, "running.cfg");
        assert_eq!(contents, b"hostname r1");
    }

    #[tokio::test]
    async fn test_receive_short_file_with_huge_header() {
        let (mut local, mut remote) = duplex(1024);
        tokio::spawn(async move {
            let _ = remote.read_u8().await;
            remote.write_all(b"C0644 1099511627776 big.bin\n").await.unwrap();
            let _ = remote.read_u8().await;
            remote.write_all(b"short").await.unwrap();
        });

        let err = receive_file(&mut local, "big.bin").await.unwrap_err();
        match err {
            Error::Transfer(TransferError::Protocol(message)) => {
                assert!(message.contains("5 of 1099511627776"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_receive_missing_file() {
        let (mut local, mut remote) = duplex(1024);
        tokio::spawn(async move {
            let _ = remote.read_u8().await;
            remote
                .write_all(b"\x01scp: nope.cfg: No such file or directory\n")
                .await
                .unwrap();
        });

        let err = receive_file(&mut local, "nope.cfg").await.unwrap_err();
        assert!(matches!(err, Error::Transfer(TransferError::Remote { .. })));
    }
}
