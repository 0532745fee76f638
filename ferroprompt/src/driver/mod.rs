//! High-level driver for device interaction.
//!
//! The driver layer provides the main API: a [`Session`] connects, discovers
//! the prompt, sends commands and moves between modes. Per-dialect behavior
//! comes from the session's [`VendorProfile`](crate::platform::VendorProfile).

mod command;
mod handler;
mod mode;
mod profile;
mod response;
mod session;
#[cfg(test)]
mod test_util;

pub use command::CommandOptions;
pub use handler::{connect_handler, connect_with, with_session, with_session_using};
pub use profile::{DeviceProfile, DeviceProfileBuilder, MAX_DELAY_FACTOR};
pub use response::Response;
pub use session::Session;
