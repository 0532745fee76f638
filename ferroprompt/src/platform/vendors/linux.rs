//! Linux platform definition.
//!
//! This is the simplest platform: standard Linux/Unix shells with `$` (user)
//! and `#` (root) prompts. There is no enable step and no configuration
//! mode; privilege changes (`sudo`) go through `send_command` with an
//! expect string.

use crate::platform::VendorProfile;

/// Platform name for Linux.
pub const PLATFORM_NAME: &str = "linux";

const PROMPT: &str = r"[\w.\-@()/:~\[\] ]{0,128}[#$]\s*$";

/// Create the Linux platform definition.
pub fn platform() -> Result<VendorProfile, regex::Error> {
    VendorProfile::new(PLATFORM_NAME).with_prompt(PROMPT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Mode;

    #[test]
    fn test_linux_platform() {
        let platform = platform().unwrap();
        assert_eq!(platform.name, "linux");
        assert!(!platform.has_enable());
        assert!(!platform.has_config_mode());
        assert!(platform.session_preparation.is_empty());
        assert!(platform.error_pattern.is_none());
    }

    #[test]
    fn test_prompt_match() {
        let platform = platform().unwrap();
        assert!(platform.prompt.is_match(b"user@host:~$ "));
        assert!(platform.prompt.is_match(b"root@host:~# "));
        assert!(platform.prompt.is_match(b"[user@host tmp]$ "));
        assert!(!platform.prompt.is_match(b"user@host> "));
    }

    #[test]
    fn test_root_prompt_stays_normal() {
        let platform = platform().unwrap();
        assert_eq!(platform.mode_for_prompt("root@host:~#"), Mode::Normal);
    }
}
