//! Vector wrapper over the MSVC `std::vector` layout.

use std::sync::Arc;

use crate::codetype::CodeType;
use crate::error::{OcularError, Result};
use crate::variable::Variable;

use super::{descend_compressed_pair, require_field};

/// View of a target `std::vector`.
///
/// The layout carries three element pointers: `_Myfirst` (data start),
/// `_Mylast` (one past the live elements), `_Myend` (one past the
/// allocation). Length and capacity fall out of pointer arithmetic; no
/// element bytes are touched until one is asked for.
pub struct VectorView
{
    storage: Variable,
    element_type: Arc<CodeType>,
}

impl VectorView
{
    const WRAPPER: &'static str = "VectorView";

    /// Wrap a vector variable, validating the layout.
    ///
    /// ## Errors
    ///
    /// `IncompatibleLayout` when `_Myfirst`, `_Mylast`, or `_Myend` is
    /// absent, or `_Myfirst` is not a pointer type.
    pub fn new(variable: Variable) -> Result<Self>
    {
        let storage = descend_compressed_pair(variable)?;
        require_field(&storage, Self::WRAPPER, "_Myfirst")?;
        require_field(&storage, Self::WRAPPER, "_Mylast")?;
        require_field(&storage, Self::WRAPPER, "_Myend")?;

        let first = storage.get_field("_Myfirst")?;
        let element_type = first.code_type().element_type().map_err(|_| {
            OcularError::IncompatibleLayout {
                wrapper: Self::WRAPPER,
                type_name: storage.code_type().full_name(),
                missing: "pointer-typed _Myfirst".to_string(),
            }
        })?;

        Ok(Self { storage, element_type })
    }

    /// Element type of the wrapped vector.
    pub fn element_type(&self) -> &Arc<CodeType>
    {
        &self.element_type
    }

    /// Number of live elements.
    pub fn len(&self) -> Result<u64>
    {
        let first = self.storage.get_field("_Myfirst")?.to_u64()?;
        let last = self.storage.get_field("_Mylast")?.to_u64()?;
        Ok(self.span_elements(first, last))
    }

    /// Returns `true` when the vector holds no elements.
    pub fn is_empty(&self) -> Result<bool>
    {
        Ok(self.len()? == 0)
    }

    /// Allocated capacity in elements.
    pub fn capacity(&self) -> Result<u64>
    {
        let first = self.storage.get_field("_Myfirst")?.to_u64()?;
        let end = self.storage.get_field("_Myend")?.to_u64()?;
        Ok(self.span_elements(first, end))
    }

    /// Get the element at `index` as a typed Variable.
    ///
    /// ## Errors
    ///
    /// `IndexOutOfRange` against the live length.
    pub fn element(&self, index: usize) -> Result<Variable>
    {
        let length = self.len()?;
        if index as u64 >= length {
            return Err(OcularError::IndexOutOfRange { index, length });
        }
        self.storage.get_field("_Myfirst")?.get_array_element(index)
    }

    /// Iterate over the live elements.
    ///
    /// The length is sampled once at iterator creation.
    pub fn iter(&self) -> Result<VectorIter<'_>>
    {
        Ok(VectorIter {
            vector: self,
            index: 0,
            len: self.len()? as usize,
        })
    }

    fn span_elements(&self, start: u64, end: u64) -> u64
    {
        let elem_size = self.element_type.size();
        if elem_size == 0 {
            return 0;
        }
        end.saturating_sub(start) / elem_size
    }
}

/// Iterator over a [`VectorView`]'s elements.
pub struct VectorIter<'a>
{
    vector: &'a VectorView,
    index: usize,
    len: usize,
}

impl Iterator for VectorIter<'_>
{
    type Item = Result<Variable>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.index >= self.len {
            return None;
        }
        let item = self.vector.element(self.index);
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>)
    {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}
