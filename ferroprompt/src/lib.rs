//! # ferroprompt
//!
//! Async, prompt-driven CLI sessions for network device automation.
//!
//! A [`Session`] opens an interactive shell on a device, works out what its
//! prompt looks like, and then exchanges commands by reading until the prompt
//! comes back. Each device dialect (Cisco IOS, NX-OS, IOS-XR, Junos, Linux)
//! is a [`VendorProfile`] describing its prompts, error markers and the
//! commands that move between exec, enable and configuration modes.
//!
//! ## Features
//!
//! - Async SSH transport via russh, behind a swappable [`transport::Connector`]
//! - Tail-bounded prompt matching over ANSI-stripped output
//! - Enable and configuration mode tracking derived from the live prompt
//! - Config batches with commit on candidate-config dialects, and rollback on
//!   a rejected line
//! - SCP file transfer over a separate connection
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ferroprompt::{CommandOptions, DeviceProfile, with_session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ferroprompt::Error> {
//!     let profile = DeviceProfile::builder("192.168.1.1")
//!         .username("admin")
//!         .password("secret")
//!         .device_type("cisco_ios")
//!         .build()?;
//!
//!     let version = with_session(profile, async |session| {
//!         let response = session
//!             .send_command("show version", &CommandOptions::default())
//!             .await?;
//!         Ok(response.result)
//!     })
//!     .await?;
//!
//!     println!("{}", version);
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod platform;
pub mod transfer;
pub mod transport;

pub use driver::{
    CommandOptions, DeviceProfile, DeviceProfileBuilder, Response, Session, connect_handler,
    connect_with, with_session, with_session_using,
};
pub use error::{Error, Result};
pub use platform::{Mode, Platform, PlatformRegistry, VendorBehavior, VendorProfile};
pub use transfer::{FileTransfer, ScpTransfer, TransferReport};
pub use transport::{AuthMethod, SshConfig};
