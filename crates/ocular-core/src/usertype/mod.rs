//! # User-Type Wrappers
//!
//! Typed views over well-known standard-library layouts in the target.
//!
//! Wrappers validate structurally at construction: the required sub-fields
//! must exist, but field offsets and sizes are whatever the debuggee's
//! symbols say. A type missing a required member is rejected with
//! `IncompatibleLayout` up front rather than failing mid-read.
//!
//! All wrappers transparently descend the compressed-pair nesting
//! (`_Mypair` / `_Myval2`) newer MSVC standard libraries wrap their
//! members in, so the same wrapper reads both the flat and the nested
//! layout generations.

mod list;
mod vector;
mod wide_string;

pub use list::{ListIter, ListView};
pub use vector::{VectorIter, VectorView};
pub use wide_string::WideString;

use once_cell::unsync::OnceCell;

use crate::error::{OcularError, Result};
use crate::variable::Variable;

/// Explicit compute-once cell for derived values a wrapper caches.
///
/// The first access computes and stores; later accesses return the stored
/// value without touching the target. When the debuggee resumes, cached
/// values go stale silently; callers who know that happened call
/// [`UserMember::invalidate`] to force a recompute.
#[derive(Debug, Default)]
pub struct UserMember<T>
{
    cell: OnceCell<T>,
}

impl<T> UserMember<T>
{
    /// Create an empty cell.
    pub fn new() -> Self
    {
        Self { cell: OnceCell::new() }
    }

    /// Return the cached value, computing it with `init` on first access.
    pub fn get_or_try_init<F>(&self, init: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T>,
    {
        self.cell.get_or_try_init(init)
    }

    /// Discard the cached value so the next access recomputes.
    pub fn invalidate(&mut self)
    {
        self.cell.take();
    }
}

/// Descend through compressed-pair wrapper members to the payload.
///
/// `_Mypair` holds an empty-base-optimized allocator alongside the real
/// container state in `_Myval2`; older layouts keep the state flat. Each
/// level is followed only when present.
fn descend_compressed_pair(variable: Variable) -> Result<Variable>
{
    let mut current = variable;
    if current.code_type().has_field("_Mypair") {
        current = current.get_field("_Mypair")?;
    }
    if current.code_type().has_field("_Myval2") {
        current = current.get_field("_Myval2")?;
    }
    Ok(current)
}

/// Reject a layout missing a required member.
fn require_field(variable: &Variable, wrapper: &'static str, name: &str) -> Result<()>
{
    if variable.code_type().has_field(name) {
        Ok(())
    } else {
        Err(OcularError::IncompatibleLayout {
            wrapper,
            type_name: variable.code_type().full_name(),
            missing: format!("field {name}"),
        })
    }
}
