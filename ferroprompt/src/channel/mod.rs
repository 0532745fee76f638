//! Channel layer for pattern matching and PTY operations.
//!
//! This module owns the read loop: ANSI stripping, tail-search prompt
//! matching, and the two ways of waiting for output (until a pattern, or for
//! a fixed duration).

mod buffer;
pub mod patterns;
mod pty;

pub use buffer::PatternBuffer;
pub use patterns::{PatternKind, PromptPattern};
pub use pty::{PtyChannel, PtyConfig};
