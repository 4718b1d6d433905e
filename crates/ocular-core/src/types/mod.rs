//! # Types
//!
//! Engine-agnostic types used throughout the inspection core.
//!
//! These types abstract away engine-specific details, allowing the rest of
//! the core to work with concepts like "thread id" and "source location"
//! without knowing which debugging engine sits behind the provider.

use std::fmt;

pub mod address;

// Re-export all public types
pub use address::Address;

/// Thread identifier assigned by the debugging engine
///
/// Engines number the threads of the inspected process with small stable
/// ids that are distinct from the operating system thread ids. Both are
/// carried on [`crate::stack::Thread`]; this newtype is the engine-assigned
/// one and is what the provider's context-switch primitives accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadId(pub u32);

impl From<u32> for ThreadId
{
    fn from(id: u32) -> Self
    {
        ThreadId(id)
    }
}

impl fmt::Display for ThreadId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// Source code location for a function or frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation
{
    /// Absolute or workspace-relative path.
    pub file: String,
    /// Line number, if known.
    pub line: Option<u32>,
    /// Column number, if known.
    pub column: Option<u32>,
}

impl SourceLocation
{
    /// Helper to build a location when only a file is known.
    pub fn from_file(file: impl Into<String>) -> Self
    {
        Self {
            file: file.into(),
            line: None,
            column: None,
        }
    }
}
