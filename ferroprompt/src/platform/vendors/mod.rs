//! Built-in vendor profiles.

pub mod base;
pub mod cisco_ios;
pub mod cisco_nxos;
pub mod cisco_xr;
pub mod juniper;
pub mod linux;
