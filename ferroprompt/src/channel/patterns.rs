//! Prompt patterns.
//!
//! Two kinds of prompt pattern are used while a session runs:
//!
//! - the **generic** pattern, a heuristic for "a trailing line that ends in a
//!   mode symbol", used before the real prompt is known;
//! - a **literal** pattern, built by escaping a prompt that was actually
//!   observed, so later reads match that exact prompt and nothing else.
//!
//! Callers can also supply their own expect pattern for a single command.

use std::fmt;
use std::sync::LazyLock;

use regex::bytes::Regex;

/// Source text of the generic prompt heuristic.
///
/// The heuristic can fire on output that merely resembles a prompt, such as
/// a paged listing whose last line ends in `#`. Prompt discovery replaces it
/// with a literal pattern as soon as a real prompt has been seen.
pub const GENERIC_PROMPT: &str = r"[\w.\-@()/:~\[\] ]*[#>$%]\s*$";

static GENERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(GENERIC_PROMPT).expect("generic prompt pattern is valid"));

/// What a [`PromptPattern`] was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternKind {
    /// The generic heuristic.
    Generic,
    /// An escaped, previously observed prompt.
    Literal(String),
    /// A caller- or vendor-supplied regex.
    Custom,
}

/// A compiled pattern that terminates a read.
#[derive(Clone)]
pub struct PromptPattern {
    regex: Regex,
    kind: PatternKind,
}

impl PromptPattern {
    /// The generic heuristic prompt pattern.
    pub fn generic() -> Self {
        Self {
            regex: GENERIC.clone(),
            kind: PatternKind::Generic,
        }
    }

    /// A pattern that matches `prompt` literally at the end of the buffer.
    ///
    /// Blank input falls back to the generic pattern.
    pub fn literal(prompt: &str) -> Self {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Self::generic();
        }
        let regex = Regex::new(&escape_literal(prompt))
            .expect("escaped literal is always a valid pattern");
        Self {
            regex,
            kind: PatternKind::Literal(prompt.to_string()),
        }
    }

    /// Compile a caller-supplied regex.
    pub fn custom(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            kind: PatternKind::Custom,
        })
    }

    /// Match either of two patterns.
    pub fn either(a: &PromptPattern, b: &PromptPattern) -> Self {
        let combined = format!("(?:{})|(?:{})", a.as_str(), b.as_str());
        match Regex::new(&combined) {
            Ok(regex) => Self {
                regex,
                kind: PatternKind::Custom,
            },
            Err(_) => a.clone(),
        }
    }

    /// The underlying regex.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// The regex source.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// How the pattern was built.
    pub fn kind(&self) -> &PatternKind {
        &self.kind
    }

    /// Check whether `data` matches.
    pub fn is_match(&self, data: &[u8]) -> bool {
        self.regex.is_match(data)
    }
}

impl fmt::Debug for PromptPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptPattern")
            .field("pattern", &self.as_str())
            .field("kind", &self.kind)
            .finish()
    }
}

impl fmt::Display for PromptPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turn a literal prompt into a pattern anchored at end-of-buffer.
///
/// The prompt must be preceded by start-of-text or whitespace, so
/// `Router#` does not match a buffer ending in `LabRouter#`.
pub fn escape_literal(prompt: &str) -> String {
    format!(r"(?:^|\s){}\s*$", regex::escape(prompt))
}
