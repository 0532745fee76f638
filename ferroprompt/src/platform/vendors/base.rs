//! Generic fallback profile.
//!
//! Matches any prompt ending in a mode symbol and knows no vendor commands,
//! so only `send_command` and `send_command_timing` are useful with it.

use crate::platform::VendorProfile;

/// Platform name for the generic profile.
pub const PLATFORM_NAME: &str = "base";

/// Create the generic profile.
pub fn platform() -> VendorProfile {
    VendorProfile::base()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::PatternKind;

    #[test]
    fn test_base_platform() {
        let platform = platform();
        assert_eq!(platform.name, "base");
        assert_eq!(platform.prompt.kind(), &PatternKind::Generic);
        assert!(!platform.has_enable());
        assert!(!platform.has_config_mode());
        assert!(platform.commit_command.is_none());
    }
}
