//! Scripted in-memory transport for tests.
//!
//! A [`MockDevice`] answers each written line with a canned reply looked up
//! by prefix, the way a simulated router would. Lines without a reply are
//! echoed back followed by the current prompt, and a bare newline is answered
//! with the prompt alone. A `\0` in a reply splits it into separately
//! delivered fragments.

use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tokio::sync::mpsc;

use super::{Connector, SshConfig, Transport};
use crate::error::{ChannelError, Result};

#[derive(Debug, Default)]
struct DeviceState {
    /// Output pushed as soon as the stream opens.
    banner: String,
    /// (line prefix, reply) pairs, first match wins.
    replies: Vec<(String, String)>,
    /// Current prompt, echoed back for a bare newline.
    prompt: String,
    /// Every line the client wrote, without the terminator.
    written: Vec<String>,
    connect_calls: usize,
    close_calls: usize,
    /// Drop the stream after this many writes.
    hang_up_after: Option<usize>,
    /// Swallow writes without replying (for timeout tests).
    silent: bool,
}

/// Handle shared between a test and the connector it hands to a session.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl MockDevice {
    /// A device that greets with `prompt`.
    pub(crate) fn new(prompt: &str) -> Self {
        let device = Self::default();
        {
            let mut state = device.lock();
            state.banner = format!("Welcome\r\n{}", prompt);
            state.prompt = prompt.to_string();
        }
        device
    }

    /// Reply with `reply` to any line starting with `prefix`.
    pub(crate) fn on(self, prefix: &str, reply: &str) -> Self {
        self.lock()
            .replies
            .push((prefix.to_string(), reply.to_string()));
        self
    }

    /// Replace the greeting pushed when the stream opens.
    pub(crate) fn banner(self, banner: &str) -> Self {
        self.lock().banner = banner.to_string();
        self
    }

    /// Stop answering anything.
    pub(crate) fn silent(self) -> Self {
        self.lock().silent = true;
        self
    }

    /// Close the stream after `writes` lines have been written.
    pub(crate) fn hang_up_after(self, writes: usize) -> Self {
        self.lock().hang_up_after = Some(writes);
        self
    }

    pub(crate) fn connector(&self) -> MockConnector {
        MockConnector {
            device: self.clone(),
        }
    }

    pub(crate) fn written(&self) -> Vec<String> {
        self.lock().written.clone()
    }

    pub(crate) fn connect_calls(&self) -> usize {
        self.lock().connect_calls
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.lock().close_calls
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// [`Connector`] backed by a [`MockDevice`].
#[derive(Debug, Clone)]
pub(crate) struct MockConnector {
    device: MockDevice,
}

impl Connector for MockConnector {
    type Stream = MockStream;

    async fn connect(&self, _config: &SshConfig) -> Result<MockStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        let banner = {
            let mut state = self.device.lock();
            state.connect_calls += 1;
            state.banner.clone()
        };
        if !banner.is_empty() {
            let _ = tx.send(Bytes::from(banner));
        }
        Ok(MockStream {
            device: self.device.clone(),
            tx: Some(tx),
            rx,
        })
    }
}

/// Stream side of a [`MockDevice`].
#[derive(Debug)]
pub(crate) struct MockStream {
    device: MockDevice,
    tx: Option<mpsc::UnboundedSender<Bytes>>,
    rx: mpsc::UnboundedReceiver<Bytes>,
}

impl Transport for MockStream {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(ChannelError::Closed.into());
        };

        let text = String::from_utf8_lossy(data);
        let mut state = self.device.lock();
        for line in text.split_inclusive('\n') {
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            state.written.push(line.clone());

            if state.silent {
                continue;
            }

            let reply = if line.is_empty() {
                format!("\r\n{}", state.prompt)
            } else {
                state
                    .replies
                    .iter()
                    .find(|(prefix, _)| line.starts_with(prefix.as_str()))
                    .map(|(_, reply)| reply.clone())
                    .unwrap_or_else(|| format!("{}\r\n{}", line, state.prompt))
            };

            let whole = reply.replace('\0', "");
            if let Some(last) = whole.lines().last() {
                if last.trim_end().ends_with(['#', '>', '$', '%']) {
                    state.prompt = last.to_string();
                }
            }
            for fragment in reply.split('\0').filter(|f| !f.is_empty()) {
                let _ = tx.send(Bytes::copy_from_slice(fragment.as_bytes()));
            }
        }

        if state
            .hang_up_after
            .is_some_and(|limit| state.written.len() >= limit)
        {
            self.tx = None;
        }
        Ok(())
    }

    async fn read_chunk(&mut self) -> Result<Option<Bytes>> {
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self) -> Result<()> {
        self.device.lock().close_calls += 1;
        self.tx = None;
        self.rx.close();
        Ok(())
    }
}
