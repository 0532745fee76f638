//! Cisco IOS / IOS-XE platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! Router>                   # user exec
//! Router#                   # privileged exec
//! Router(config)#           # global configuration
//! Router(config-if)#        # interface configuration
//! ```
//!
//! Configuration is applied line by line; there is no commit step, and
//! `end` both leaves and "aborts" configuration mode.

use crate::platform::VendorProfile;

/// Platform name for Cisco IOS.
pub const PLATFORM_NAME: &str = "cisco_ios";

/// Exec prompt in either privilege tier, or any configuration submode.
pub(crate) const PROMPT: &str = r"[\w.\-@/:]{1,63}(?:\([\w.\-@/:+]{0,32}\))?[>#]\s*$";

/// Any configuration submode prompt.
pub(crate) const CONFIG_PROMPT: &str = r"[\w.\-@/:]{1,63}\(config[\w.\-@/:+]{0,32}\)#\s*$";

/// `%` error lines the IOS family prints for rejected input.
pub(crate) const ERROR_PATTERN: &str =
    r"(?i)%\s*(?:invalid input|incomplete command|ambiguous command|unknown command)";

/// Session preparation shared by the IOS family.
pub(crate) const PREPARATION: [&str; 2] = ["terminal length 0", "terminal width 511"];

/// Create the Cisco IOS platform definition.
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
