//! Vendor profile: everything that differs between device dialects.

use std::fmt;
use std::sync::Arc;

use regex::bytes::Regex;

use super::VendorBehavior;
use super::mode::Mode;
use crate::channel::PromptPattern;

/// Password prompt used by `enable` unless a dialect overrides it.
const DEFAULT_PASSWORD_PROMPT: &str = r"(?i)password:\s*$";

/// A fixed record of dialect behavior.
///
/// A dialect is pure data plus an optional [`VendorBehavior`] hook. Commands
/// that a dialect lacks are `None`, which turns the matching operation into a
/// no-op (or, for configuration mode, an error).
#[derive(Clone)]
pub struct VendorProfile {
    /// Dialect tag (e.g., "cisco_ios", "linux").
    pub name: String,

    /// Prompt pattern used until a literal prompt has been discovered.
    pub prompt: PromptPattern,

    /// Prompt pattern of configuration mode.
    pub config_prompt: Option<PromptPattern>,

    /// Device output that marks a rejected command.
    pub error_pattern: Option<Regex>,

    /// Commit output that marks a failed commit.
    pub commit_error_pattern: Option<Regex>,

    /// Prompt asking for the enable secret.
    pub password_prompt: PromptPattern,

    /// Command that enters privileged mode.
    pub enable_command: Option<String>,

    /// Command that enters configuration mode.
    pub config_command: Option<String>,

    /// Command that applies staged configuration.
    pub commit_command: Option<String>,

    /// Command that discards staged configuration.
    pub abort_command: Option<String>,

    /// Command that leaves configuration mode.
    pub exit_config_command: Option<String>,

    /// Commands run right after connecting (e.g., disable paging).
    pub session_preparation: Vec<String>,

    /// Last prompt character in privileged mode.
    pub enable_indicator: char,

    /// Optional vendor-specific behavior.
    pub behavior: Option<Arc<dyn VendorBehavior>>,
}

impl VendorProfile {
    /// A profile with generic defaults: generic prompt, no enable mode, no
    /// configuration mode, no preparation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: PromptPattern::generic(),
            config_prompt: None,
            error_pattern: None,
            commit_error_pattern: None,
            password_prompt: PromptPattern::custom(DEFAULT_PASSWORD_PROMPT)
                .unwrap_or_else(|_| PromptPattern::generic()),
            enable_command: None,
            config_command: None,
            commit_command: None,
            abort_command: None,
            exit_config_command: None,
            session_preparation: vec![],
            enable_indicator: '#',
            behavior: None,
        }
    }

    /// The generic fallback profile.
    pub fn base() -> Self {
        Self::new(super::vendors::base::PLATFORM_NAME)
    }

    /// Set the default prompt pattern.
    pub fn with_prompt(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.prompt = PromptPattern::custom(pattern)?;
        Ok(self)
    }

    /// Set the configuration-mode prompt pattern.
    pub fn with_config_prompt(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.config_prompt = Some(PromptPattern::custom(pattern)?);
        Ok(self)
    }

    /// Set the command error pattern.
    pub fn with_error_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.error_pattern = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Set the commit error pattern.
    pub fn with_commit_error_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.commit_error_pattern = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Set the enable password prompt pattern.
    pub fn with_password_prompt(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.password_prompt = PromptPattern::custom(pattern)?;
        Ok(self)
    }

    /// Set the command that enters privileged mode.
    pub fn with_enable(mut self, command: impl Into<String>) -> Self {
        self.enable_command = Some(command.into());
        self
    }

    /// Set the configuration entry and exit commands.
    pub fn with_config(mut self, enter: impl Into<String>, exit: impl Into<String>) -> Self {
        self.config_command = Some(enter.into());
        self.exit_config_command = Some(exit.into());
        self
    }

    /// Set the commit command.
    pub fn with_commit(mut self, command: impl Into<String>) -> Self {
        self.commit_command = Some(command.into());
        self
    }

    /// Set the abort / rollback command.
    pub fn with_abort(mut self, command: impl Into<String>) -> Self {
        self.abort_command = Some(command.into());
        self
    }

    /// Add a session preparation command.
    pub fn with_preparation(mut self, command: impl Into<String>) -> Self {
        self.session_preparation.push(command.into());
        self
    }

    /// Set vendor behavior.
    pub fn with_behavior(mut self, behavior: Arc<dyn VendorBehavior>) -> Self {
        self.behavior = Some(behavior);
        self
    }

    /// Does this dialect have a privileged mode?
    pub fn has_enable(&self) -> bool {
        self.enable_command.is_some()
    }

    /// Does this dialect have a configuration mode?
    pub fn has_config_mode(&self) -> bool {
        self.config_command.is_some() && self.config_prompt.is_some()
    }

    /// Work out the mode a prompt reflects.
    pub fn mode_for_prompt(&self, prompt: &str) -> Mode {
        let prompt = prompt.trim_end();
        if self
            .config_prompt
            .as_ref()
            .is_some_and(|p| p.is_match(prompt.as_bytes()))
        {
            return Mode::Configuring;
        }
        if self.has_enable() && prompt.ends_with(self.enable_indicator) {
            return Mode::Enabled;
        }
        Mode::Normal
    }

    /// Find a command error in device output.
    pub fn find_error(&self, output: &str) -> Option<String> {
        find_line(self.error_pattern.as_ref()?, output)
    }

    /// Find a commit failure in commit output.
    pub fn find_commit_error(&self, output: &str) -> Option<String> {
        find_line(self.commit_error_pattern.as_ref()?, output)
    }

    /// Apply the vendor output post-processor, if any.
    pub fn post_process(&self, output: &str) -> String {
        match &self.behavior {
            Some(behavior) => behavior.post_process_output(output),
            None => output.to_string(),
        }
    }
}

/// The trimmed line containing the first match of `pattern`.
fn find_line(pattern: &Regex, output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| pattern.is_match(line.as_bytes()))
        .map(|line| line.trim().to_string())
}

impl fmt::Debug for VendorProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VendorProfile")
            .field("name", &self.name)
            .field("prompt", &self.prompt)
            .field("config_prompt", &self.config_prompt)
            .field("enable_command", &self.enable_command)
            .field("config_command", &self.config_command)
            .field("commit_command", &self.commit_command)
            .field("abort_command", &self.abort_command)
            .field("exit_config_command", &self.exit_config_command)
            .field("session_preparation", &self.session_preparation)
            .field(
                "behavior",
                &self.behavior.as_ref().map(|_| "<VendorBehavior>"),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_defaults() {
        let profile = VendorProfile::new("custom");
        assert!(!profile.has_enable());
        assert!(!profile.has_config_mode());
        assert!(profile.session_preparation.is_empty());
        assert_eq!(profile.mode_for_prompt("host#"), Mode::Normal);
        assert!(profile.find_error("% Invalid input").is_none());
    }

    #[test]
    fn test_builder_chain() {
        let profile = VendorProfile::new("custom")
            .with_config_prompt(r"\(cfg\)#\s*$")
            .unwrap()
            .with_error_pattern(r"^ERR")
            .unwrap()
            .with_password_prompt(r"(?i)passphrase:\s*$")
            .unwrap()
            .with_enable("su")
            .with_config("cfg", "quit")
            .with_preparation("pager off");

        assert!(profile.has_enable());
        assert!(profile.has_config_mode());
        assert_eq!(profile.exit_config_command.as_deref(), Some("quit"));
        assert_eq!(profile.mode_for_prompt("box(cfg)#"), Mode::Configuring);
        assert_eq!(profile.mode_for_prompt("box#"), Mode::Enabled);
        assert_eq!(profile.mode_for_prompt("box>"), Mode::Normal);
        assert!(profile.password_prompt.is_match(b"su\r\nPassphrase: "));
        assert_eq!(
            profile.find_error("cfg foo\r\nERR bad keyword\r\nbox(cfg)#"),
            Some("ERR bad keyword".to_string())
        );
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        assert!(VendorProfile::new("x").with_prompt("(").is_err());
    }
}
