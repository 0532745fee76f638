//! Cisco IOS-XR platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! RP/0/RSP0/CPU0:xr-1#            # exec
//! RP/0/RSP0/CPU0:xr-1(config)#    # configuration
//! ```
//!
//! IOS-XR stages configuration in a target buffer: nothing takes effect
//! until `commit`, and `abort` throws the buffer away and leaves
//! configuration mode.

use super::cisco_ios::{CONFIG_PROMPT, ERROR_PATTERN, PREPARATION, PROMPT};
use crate::platform::VendorProfile;

/// Platform name for Cisco IOS-XR.
pub const PLATFORM_NAME: &str = "cisco_xr";

const COMMIT_ERROR_PATTERN: &str =
    r"(?i)(?:%\s*failed to commit|one or more commits have occurred|invalid input)";

/// Create the Cisco IOS-XR platform definition.
pub fn platform() -> Result<VendorProfile, regex::Error> {
    let profile = VendorProfile::new(PLATFORM_NAME)
        .with_prompt(PROMPT)?
        .with_config_prompt(CONFIG_PROMPT)?
        .with_error_pattern(ERROR_PATTERN)?
        .with_commit_error_pattern(COMMIT_ERROR_PATTERN)?
        .with_enable("enable")
        .with_config("configure terminal", "end")
        .with_commit("commit")
        .with_abort("abort");

    Ok(PREPARATION
        .into_iter()
        .fold(profile, |profile, cmd| profile.with_preparation(cmd)))
}
