//! Session modes.

use std::fmt;

/// The three modes a CLI session moves between.
///
/// ```text
/// ┌────────┐  enable   ┌─────────┐  config_mode  ┌─────────────┐
/// │ Normal ├───────────► Enabled ├───────────────► Configuring │
/// │   >    │           │    #    │  exit_config  │  (config)#  │
/// └────────┘           └─────────┘◄──────────────┴─────────────┘
/// ```
///
/// Dialects without a privileged tier (Linux, Juniper) go straight from
/// `Normal` to `Configuring`, or never leave `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Unprivileged exec mode.
    #[default]
    Normal,
    /// Privileged exec mode.
    Enabled,
    /// Configuration mode.
    Configuring,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Enabled => "enabled",
            Mode::Configuring => "configuring",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
