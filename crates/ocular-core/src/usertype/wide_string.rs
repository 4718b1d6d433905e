//! Wide-string wrapper over the MSVC `std::basic_string` layout.

use widestring::U16String;

use crate::error::{OcularError, Result};
use crate::types::Address;
use crate::variable::Variable;

use super::{descend_compressed_pair, require_field, UserMember};

/// View of a target `std::wstring` (MSVC `basic_string<wchar_t>` layout).
///
/// The layout keeps small strings inline in `_Bx._Buf` and spills longer
/// ones to a heap allocation reachable through `_Bx._Ptr`; `_Mysize` and
/// `_Myres` carry the length and reserved capacity in characters. Which
/// branch holds the text is decided by comparing the length against the
/// inline capacity, exactly the discriminant the library itself uses.
///
/// Length, capacity, and decoded text are cached after first read. The
/// cache does not observe debuggee resumption; construct a fresh wrapper
/// (or invalidate) when the target has run.
pub struct WideString
{
    storage: Variable,
    len: UserMember<u64>,
    reserved: UserMember<u64>,
    text: UserMember<String>,
}

impl WideString
{
    const WRAPPER: &'static str = "WideString";

    /// Wrap a string variable, validating the layout.
    ///
    /// ## Errors
    ///
    /// `IncompatibleLayout` when `_Bx` (with `_Buf` and `_Ptr`), `_Mysize`,
    /// or `_Myres` is absent.
    pub fn new(variable: Variable) -> Result<Self>
    {
        let storage = descend_compressed_pair(variable)?;
        require_field(&storage, Self::WRAPPER, "_Bx")?;
        require_field(&storage, Self::WRAPPER, "_Mysize")?;
        require_field(&storage, Self::WRAPPER, "_Myres")?;

        let buf_union = storage.get_field("_Bx")?;
        for member in ["_Buf", "_Ptr"] {
            if !buf_union.code_type().has_field(member) {
                return Err(OcularError::IncompatibleLayout {
                    wrapper: Self::WRAPPER,
                    type_name: storage.code_type().full_name(),
                    missing: format!("field _Bx.{member}"),
                });
            }
        }

        Ok(Self {
            storage,
            len: UserMember::new(),
            reserved: UserMember::new(),
            text: UserMember::new(),
        })
    }

    /// String length in characters. Cached after the first read.
    pub fn len(&self) -> Result<u64>
    {
        self.len
            .get_or_try_init(|| self.storage.get_field("_Mysize")?.to_u64())
            .copied()
    }

    /// Returns `true` for a zero-length string.
    pub fn is_empty(&self) -> Result<bool>
    {
        Ok(self.len()? == 0)
    }

    /// Reserved capacity in characters. Cached after the first read.
    pub fn reserved(&self) -> Result<u64>
    {
        self.reserved
            .get_or_try_init(|| self.storage.get_field("_Myres")?.to_u64())
            .copied()
    }

    /// Decode the string's text. Cached after the first decode.
    ///
    /// Reads exactly `len` characters; embedded NULs are legal string
    /// content and never terminate the decode. Short strings come from the
    /// inline buffer; longer ones follow the spilled pointer. The inline
    /// capacity is the buffer's array length minus the terminator slot.
    pub fn text(&self) -> Result<&str>
    {
        self.text
            .get_or_try_init(|| {
                let len = self.len()?;
                let buf_union = self.storage.get_field("_Bx")?;
                let inline_buf = buf_union.get_field("_Buf")?;
                let inline_capacity = inline_buf.get_array_length()?.saturating_sub(1);

                let base = if len <= inline_capacity {
                    inline_buf.get_pointer_address()?
                } else {
                    let spilled = buf_union.get_field("_Ptr")?;
                    let target = spilled.read_data()?;
                    if target == 0 {
                        return Err(OcularError::NullPointerDereference {
                            type_name: spilled.code_type().full_name(),
                        });
                    }
                    Address::new(target)
                };

                self.decode_units(base, len as usize)
            })
            .map(String::as_str)
    }

    /// Discard all cached reads so the next access hits the target again.
    pub fn invalidate(&mut self)
    {
        self.len.invalidate();
        self.reserved.invalidate();
        self.text.invalidate();
    }

    fn decode_units(&self, base: Address, len: usize) -> Result<String>
    {
        let bytes = self.storage.session().provider().read_memory(base, len * 2)?;
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(U16String::from_vec(units).to_string_lossy())
    }
}
