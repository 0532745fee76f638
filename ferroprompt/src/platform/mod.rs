//! Platform definitions for multi-vendor support.
//!
//! Each dialect is a [`VendorProfile`] value. [`Platform`] names the
//! built-in dialects and [`PlatformRegistry`] resolves dialect tags,
//! including custom profiles registered at runtime.

mod definition;
mod mode;
mod registry;
pub mod vendors;

use std::fmt;
use std::str::FromStr;

pub use definition::VendorProfile;
pub use mode::Mode;
pub use registry::PlatformRegistry;

use crate::error::{Error, PlatformError};

/// Trait for vendor-specific output handling.
pub trait VendorBehavior: Send + Sync {
    /// Post-process stripped command output.
    fn post_process_output(&self, output: &str) -> String {
        output.to_string()
    }
}

/// Built-in device dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Generic defaults: no enable mode, no configuration mode.
    Base,
    CiscoIos,
    CiscoNxos,
    CiscoXr,
    JuniperJunos,
    Linux,
}

impl Platform {
    /// Every built-in dialect.
    pub const ALL: [Platform; 6] = [
        Platform::Base,
        Platform::CiscoIos,
        Platform::CiscoNxos,
        Platform::CiscoXr,
        Platform::JuniperJunos,
        Platform::Linux,
    ];

    /// Dialect tag.
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Base => vendors::base::PLATFORM_NAME,
            Platform::CiscoIos => vendors::cisco_ios::PLATFORM_NAME,
            Platform::CiscoNxos => vendors::cisco_nxos::PLATFORM_NAME,
            Platform::CiscoXr => vendors::cisco_xr::PLATFORM_NAME,
            Platform::JuniperJunos => vendors::juniper::PLATFORM_NAME,
            Platform::Linux => vendors::linux::PLATFORM_NAME,
        }
    }

    /// Build this dialect's profile.
    pub fn profile(&self) -> Result<VendorProfile, Error> {
        let profile = match self {
            Platform::Base => Ok(vendors::base::platform()),
            Platform::CiscoIos => vendors::cisco_ios::platform(),
            Platform::CiscoNxos => vendors::cisco_nxos::platform(),
            Platform::CiscoXr => vendors::cisco_xr::platform(),
            Platform::JuniperJunos => vendors::juniper::platform(),
            Platform::Linux => vendors::linux::platform(),
        };
        profile.map_err(|e| {
            PlatformError::InvalidDefinition {
                message: format!("{}: {}", self.name(), e),
            }
            .into()
        })
    }
}

impl FromStr for Platform {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| PlatformError::UnknownPlatform {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_round_trip_names() {
        for platform in Platform::ALL {
            assert_eq!(platform.name().parse::<Platform>().unwrap(), platform);
            assert_eq!(platform.profile().unwrap().name, platform.name());
        }
    }

    #[test]
    fn test_unknown_platform() {
        let err = "cisco_asa".parse::<Platform>().unwrap_err();
        assert!(matches!(err, PlatformError::UnknownPlatform { ref name } if name == "cisco_asa"));
    }
}
