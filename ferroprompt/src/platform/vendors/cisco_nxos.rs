//! Cisco NX-OS platform definition.
//!
//! NX-OS sessions behave like IOS for everything this crate drives: the
//! same enable step, the same `configure terminal` / `end` pair and the same
//! paging commands.

use super::cisco_ios::{CONFIG_PROMPT, ERROR_PATTERN, PREPARATION, PROMPT};
use crate::platform::VendorProfile;

/// Platform name for Cisco NX-OS.
pub const PLATFORM_NAME: &str = "cisco_nxos";

/// Create the Cisco NX-OS platform definition.
pub fn platform() -> Result<VendorProfile, regex::Error> {
    let profile = VendorProfile::new(PLATFORM_NAME)
        .with_prompt(PROMPT)?
        .with_config_prompt(CONFIG_PROMPT)?
        .with_error_pattern(ERROR_PATTERN)?
        .with_enable("enable")
        .with_config("configure terminal", "end")
        .with_abort("end");

    Ok(PREPARATION
        .into_iter()
        .fold(profile, |profile, cmd| profile.with_preparation(cmd)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Mode;

    #[test]
    fn test_cisco_nxos_platform() {
        let platform = platform().unwrap();
        assert_eq!(platform.name, "cisco_nxos");
        assert!(platform.has_enable());
        assert!(platform.has_config_mode());
        assert!(platform.commit_command.is_none());
        assert_eq!(platform.session_preparation.len(), 2);
    }

    #[test]
    fn test_modes_from_prompt() {
        let platform = platform().unwrap();
        assert_eq!(platform.mode_for_prompt("nexus-01#"), Mode::Enabled);
        assert_eq!(
            platform.mode_for_prompt("nexus-01(config-if)#"),
            Mode::Configuring
        );
    }
}
