//! Juniper JUNOS platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! user@router>              # operational mode
//! [edit]
//! user@router#              # configuration mode
//! ```
//!
//! JUNOS has no privileged tier: `configure` goes straight from operational
//! to configuration mode. Changes are staged until `commit`; `rollback 0`
//! discards them.

use std::sync::Arc;

use crate::platform::{VendorBehavior, VendorProfile};

/// Platform name for Juniper JUNOS.
pub const PLATFORM_NAME: &str = "juniper_junos";

const PROMPT: &str = r"[\w\-@()/:.]{1,63}[>#%]\s*$";

const CONFIG_PROMPT: &str = r"[\w\-@()/:.]{1,63}#\s*$";

const ERROR_PATTERN: &str = r"(?i)(?:unknown command|syntax error|error:|missing argument|is ambiguous|no valid completions|invalid numeric value)";

const COMMIT_ERROR_PATTERN: &str = r"(?i)(?:error:|commit failed|configuration check-out failed)";

/// Create the Juniper JUNOS platform definition.
pub fn platform() -> Result<VendorProfile, regex::Error> {
    Ok(VendorProfile::new(PLATFORM_NAME)
        .with_prompt(PROMPT)?
        .with_config_prompt(CONFIG_PROMPT)?
        .with_error_pattern(ERROR_PATTERN)?
        .with_commit_error_pattern(COMMIT_ERROR_PATTERN)?
        .with_config("configure", "exit configuration-mode")
        .with_commit("commit")
        .with_abort("rollback 0")
        .with_preparation("set cli screen-length 0")
        .with_preparation("set cli screen-width 511")
        .with_behavior(Arc::new(JuniperBehavior)))
}

/// Juniper JUNOS-specific behavior.
pub struct JuniperBehavior;

impl VendorBehavior for JuniperBehavior {
    fn post_process_output(&self, output: &str) -> String {
        // [edit] context lines follow every configuration command
        output
            .lines()
            .filter(|line| !line.trim().starts_with("[edit"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
