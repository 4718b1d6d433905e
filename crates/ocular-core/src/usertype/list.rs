//! Doubly-linked-list wrapper over the MSVC `std::list` layout.

use crate::error::{OcularError, Result};
use crate::types::Address;
use crate::variable::Variable;

use super::{descend_compressed_pair, require_field};

/// View of a target `std::list`.
///
/// The layout keeps a pointer to a heap-allocated sentinel node in
/// `_Myhead` and the element count in `_Mysize`. Node links through
/// `_Next` form a circle back to the sentinel; the payload sits in
/// `_Myval`. Traversal is lazy and bounded by the reported size so a
/// cycle introduced by target corruption surfaces as an error instead
/// of an unbounded walk.
pub struct ListView
{
    storage: Variable,
}

impl ListView
{
    const WRAPPER: &'static str = "ListView";

    /// Wrap a list variable, validating the layout.
    ///
    /// ## Errors
    ///
    /// `IncompatibleLayout` when `_Myhead` or `_Mysize` is absent, or the
    /// node type lacks `_Next` or `_Myval`.
    pub fn new(variable: Variable) -> Result<Self>
    {
        let storage = descend_compressed_pair(variable)?;
        require_field(&storage, Self::WRAPPER, "_Myhead")?;
        require_field(&storage, Self::WRAPPER, "_Mysize")?;

        let node_type = storage
            .get_field("_Myhead")?
            .code_type()
            .element_type()
            .map_err(|_| OcularError::IncompatibleLayout {
                wrapper: Self::WRAPPER,
                type_name: storage.code_type().full_name(),
                missing: "pointer-typed _Myhead".to_string(),
            })?;
        for member in ["_Next", "_Myval"] {
            if !node_type.has_field(member) {
                return Err(OcularError::IncompatibleLayout {
                    wrapper: Self::WRAPPER,
                    type_name: node_type.full_name(),
                    missing: format!("node field {member}"),
                });
            }
        }

        Ok(Self { storage })
    }

    /// Number of elements the list reports holding.
    pub fn len(&self) -> Result<u64>
    {
        self.storage.get_field("_Mysize")?.to_u64()
    }

    /// Returns `true` when the list reports zero elements.
    pub fn is_empty(&self) -> Result<bool>
    {
        Ok(self.len()? == 0)
    }

    /// Lazily walk the list, yielding one payload Variable per node.
    ///
    /// Nodes are followed through `_Next` starting after the sentinel and
    /// stopping when the walk returns to it. The walk never follows more
    /// links than the reported size; a sentinel still unreached at that
    /// bound means the node chain is corrupted.
    pub fn iter(&self) -> Result<ListIter>
    {
        let sentinel = self.storage.get_field("_Myhead")?;
        let sentinel_address = Address::new(sentinel.read_data()?);
        let bound = self.len()?;
        let first = sentinel.get_field("_Next")?;
        Ok(ListIter {
            node: Some(first),
            sentinel: sentinel_address,
            bound,
            yielded: 0,
        })
    }
}

/// Lazy iterator over a [`ListView`]'s payloads.
pub struct ListIter
{
    node: Option<Variable>,
    sentinel: Address,
    bound: u64,
    yielded: u64,
}

impl Iterator for ListIter
{
    type Item = Result<Variable>;

    fn next(&mut self) -> Option<Self::Item>
    {
        let node = self.node.take()?;

        let target = match node.read_data() {
            Ok(target) => target,
            Err(err) => return Some(Err(err)),
        };
        if Address::new(target) == self.sentinel {
            return None;
        }
        if self.yielded >= self.bound {
            return Some(Err(OcularError::CorruptedContainer {
                container: "ListView",
                bound: self.bound,
            }));
        }

        let value = match node.get_field("_Myval") {
            Ok(value) => value,
            Err(err) => return Some(Err(err)),
        };
        match node.get_field("_Next") {
            Ok(next) => self.node = Some(next),
            Err(err) => return Some(Err(err)),
        }
        self.yielded += 1;
        Some(Ok(value))
    }
}
