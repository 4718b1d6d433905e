//! # Variable Model
//!
//! Typed views onto memory locations or values in the target process.
//!
//! A [`Variable`] binds a [`CodeType`] to storage: either a target-memory
//! address or an inline scalar for register-resident values. It owns no
//! target memory: every scalar read goes back through the provider, so a
//! Variable observed twice reflects the live target both times. Variables
//! are always derived (field access, indexing, dereference, cast), never
//! mutated in place, and their CodeType never changes after construction.
//!
//! Staleness is not detected: a Variable created before the debuggee
//! resumed keeps reading whatever is at its address now. Re-fetch from the
//! session when the target moves.

use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use widestring::U16String;

use crate::codetype::{CodeType, PrimitiveKind, TypeKind};
use crate::error::{OcularError, Result};
use crate::provider::FieldPlacement;
use crate::session::Session;
use crate::types::Address;

/// Name given to variables whose value was computed rather than resolved
/// from symbols (field access, array elements, casts).
pub const COMPUTED_NAME: &str = "<computed>";

/// Upper bound on characters fetched when decoding a terminated string.
pub const MAX_STRING_READ: usize = 1024;

/// Where a Variable's bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableStorage
{
    /// Backed by target memory at an address.
    Memory(Address),
    /// Inline scalar (register-resident local, literal, or synthesized
    /// pointer value). At most pointer-sized.
    Value(u64),
}

/// A typed view onto a specific memory location or value in the target.
#[derive(Clone)]
pub struct Variable
{
    session: Session,
    code_type: Arc<CodeType>,
    storage: VariableStorage,
    name: String,
}

impl Variable
{
    /// Create a memory-backed Variable.
    pub fn new(session: &Session, code_type: Arc<CodeType>, address: Address) -> Self
    {
        Self::with_name(session, code_type, address, COMPUTED_NAME)
    }

    /// Create a memory-backed Variable with an explicit name.
    pub fn with_name(session: &Session, code_type: Arc<CodeType>, address: Address, name: &str) -> Self
    {
        Self {
            session: session.clone(),
            code_type,
            storage: VariableStorage::Memory(address),
            name: name.to_string(),
        }
    }

    /// Create a value-backed Variable (register-resident or literal).
    pub fn from_value(session: &Session, code_type: Arc<CodeType>, value: u64, name: &str) -> Self
    {
        Self {
            session: session.clone(),
            code_type,
            storage: VariableStorage::Value(value),
            name: name.to_string(),
        }
    }

    fn derived(&self, code_type: Arc<CodeType>, storage: VariableStorage, name: &str) -> Self
    {
        Self {
            session: self.session.clone(),
            code_type,
            storage,
            name: name.to_string(),
        }
    }

    /// Variable name, or [`COMPUTED_NAME`] for derived values.
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// The bound code type. Never changes after construction.
    pub fn code_type(&self) -> &Arc<CodeType>
    {
        &self.code_type
    }

    /// Storage backing this Variable.
    pub fn storage(&self) -> VariableStorage
    {
        self.storage
    }

    /// Memory address for memory-backed Variables.
    pub fn address(&self) -> Option<Address>
    {
        match self.storage {
            VariableStorage::Memory(address) => Some(address),
            VariableStorage::Value(_) => None,
        }
    }

    /// Read this Variable's scalar data from the live target.
    ///
    /// Re-fetches on every call; the debuggee may have changed. Bytes are
    /// decoded little-endian from the type's declared size, except pointers,
    /// which read at the provider's target word size.
    ///
    /// ## Errors
    ///
    /// - `MemoryReadError` when the target bytes cannot be read
    /// - `InvalidArgument` for types wider than 8 bytes or zero-sized
    pub fn read_data(&self) -> Result<u64>
    {
        match self.storage {
            VariableStorage::Value(value) => Ok(value),
            VariableStorage::Memory(address) => {
                // Pointers read at the target word size the provider reports,
                // not the metadata size, so a pointer type whose symbols
                // declare no size still reads the full pointer.
                let size = if self.code_type.is_pointer() {
                    self.session.provider().pointer_size()
                } else {
                    self.code_type.size()
                };
                if size == 0 || size > 8 {
                    return Err(OcularError::InvalidArgument(format!(
                        "cannot read scalar data of {}-byte type {}",
                        size,
                        self.code_type.full_name()
                    )));
                }
                let bytes = self.session.provider().read_memory(address, size as usize)?;
                Ok(u64_from_le(&bytes))
            }
        }
    }

    /// Returns `true` when this is a pointer holding the null address.
    pub fn is_null_pointer(&self) -> Result<bool>
    {
        Ok(self.code_type.is_pointer() && self.read_data()? == 0)
    }

    /// Address this Variable points at (for pointers) or lives at.
    ///
    /// Mirrors the transparency of the original object model: member access
    /// through a pointer variable targets the pointee.
    pub fn get_pointer_address(&self) -> Result<Address>
    {
        if self.code_type.is_pointer() {
            return Ok(Address::new(self.read_data()?));
        }
        match self.storage {
            VariableStorage::Memory(address) => Ok(address),
            VariableStorage::Value(_) => Err(OcularError::InvalidArgument(format!(
                "variable {} of type {} is register-resident and has no address",
                self.name,
                self.code_type.full_name()
            ))),
        }
    }

    /// Base address for field access: the object itself, or the pointee for
    /// pointer-typed variables (with an explicit null check).
    fn field_base_address(&self) -> Result<Address>
    {
        let base = self.get_pointer_address()?;
        if self.code_type.is_pointer() && base.is_null() {
            return Err(OcularError::NullPointerDereference {
                type_name: self.code_type.full_name(),
            });
        }
        Ok(base)
    }

    /// Get a field by name, searching base classes.
    ///
    /// ## Errors
    ///
    /// `NoSuchField`; `NullPointerDereference` when accessed through a null
    /// pointer.
    pub fn get_field(&self, name: &str) -> Result<Variable>
    {
        let (placement, field_type) = self.code_type.field(name)?;
        let address = match placement {
            FieldPlacement::Offset(offset) => self.field_base_address()? + offset,
            // Statics live at a fixed address independent of this storage.
            FieldPlacement::Static(address) => address,
        };
        Ok(self.derived(field_type, VariableStorage::Memory(address), name))
    }

    /// Get a field declared directly on the bound type (no base-class walk).
    pub fn get_class_field(&self, name: &str) -> Result<Variable>
    {
        let (placement, field_type) = self.code_type.class_field(name)?;
        let address = match placement {
            FieldPlacement::Offset(offset) => self.field_base_address()? + offset,
            FieldPlacement::Static(address) => address,
        };
        Ok(self.derived(field_type, VariableStorage::Memory(address), name))
    }

    /// View this object as one of its base classes.
    ///
    /// Offset arithmetic plus type substitution; multiple inheritance
    /// levels compose by chaining calls.
    pub fn get_base_class(&self, name: &str) -> Result<Variable>
    {
        let (offset, base_type) = self.code_type.base_class(name)?;
        let address = self.field_base_address()? + offset;
        Ok(self.derived(base_type, VariableStorage::Memory(address), name))
    }

    /// Field names of the bound type, including inherited ones.
    pub fn field_names(&self) -> Result<Vec<String>>
    {
        self.code_type.field_names()
    }

    /// Get the array element at `index`.
    ///
    /// Arrays with a declared length are bounds-checked; pointer-as-array
    /// access is unbounded and the caller's responsibility.
    ///
    /// ## Errors
    ///
    /// `NotAPointerOrArray`, `IndexOutOfRange`, `NullPointerDereference`.
    pub fn get_array_element(&self, index: usize) -> Result<Variable>
    {
        let element_type = self.code_type.element_type()?;
        let base = match self.code_type.kind() {
            TypeKind::Array => {
                let length = self.code_type.array_length()?;
                if index as u64 >= length {
                    return Err(OcularError::IndexOutOfRange { index, length });
                }
                self.address().ok_or_else(|| {
                    OcularError::InvalidArgument("array variable without a memory address".to_string())
                })?
            }
            TypeKind::Pointer => {
                let target = self.read_data()?;
                if target == 0 {
                    return Err(OcularError::NullPointerDereference {
                        type_name: self.code_type.full_name(),
                    });
                }
                Address::new(target)
            }
            _ => unreachable!("element_type() already rejected non-pointer/array kinds"),
        };
        let address = base + (index as u64) * element_type.size();
        Ok(self.derived(element_type, VariableStorage::Memory(address), COMPUTED_NAME))
    }

    /// Declared length of an array-typed Variable.
    pub fn get_array_length(&self) -> Result<u64>
    {
        self.code_type.array_length()
    }

    /// Dereference a pointer, producing a view of the pointee.
    ///
    /// ## Errors
    ///
    /// - `NotAPointerOrArray` for non-pointer types
    /// - `NullPointerDereference` when the stored pointer is zero (policy:
    ///   an error, never a Variable at address zero)
    /// - `MemoryReadError` when the pointer bytes cannot be read
    pub fn dereference_pointer(&self) -> Result<Variable>
    {
        if !self.code_type.is_pointer() {
            return Err(OcularError::NotAPointerOrArray {
                type_name: self.code_type.full_name(),
            });
        }
        self.get_array_element(0)
    }

    /// Displace this Variable by a signed byte offset.
    ///
    /// For pointers the stored pointer value moves; for memory-backed
    /// variables the address moves. The result keeps the same code type;
    /// cast afterwards if the displaced bytes hold something else.
    pub fn adjust_pointer(&self, offset: i64) -> Result<Variable>
    {
        if self.code_type.is_pointer() {
            let value = self.read_data()?.wrapping_add_signed(offset);
            return Ok(self.derived(self.code_type.clone(), VariableStorage::Value(value), &self.name));
        }
        match self.storage {
            VariableStorage::Memory(address) => Ok(self.derived(
                self.code_type.clone(),
                VariableStorage::Memory(address.offset(offset)),
                &self.name,
            )),
            VariableStorage::Value(_) => Err(OcularError::InvalidArgument(format!(
                "cannot displace register-resident variable of type {}",
                self.code_type.full_name()
            ))),
        }
    }

    /// Reinterpret the same storage under a different type, by name.
    ///
    /// Accepts `Type` (resolved in this Variable's module) or
    /// `module!Type`. No runtime verification beyond resolving the type:
    /// this mirrors the raw-memory model of the debuggee.
    pub fn cast_as(&self, type_name: &str) -> Result<Variable>
    {
        let (module, name) = match type_name.split_once('!') {
            Some((module, name)) if !module.is_empty() => (module, name),
            _ => (self.code_type.module(), type_name),
        };
        let new_type = self.session.resolve_type(module, name)?;
        self.cast_as_type(&new_type)
    }

    /// Reinterpret the same storage under an already-resolved type.
    ///
    /// Casting is composition-stable: `cast_as(X)` then `cast_as(Y)` lands
    /// on the same storage as a single `cast_as(Y)`.
    pub fn cast_as_type(&self, new_type: &Arc<CodeType>) -> Result<Variable>
    {
        if Arc::ptr_eq(new_type, &self.code_type) {
            return Ok(self.clone());
        }

        let was_pointer = self.code_type.is_pointer();
        let storage = match (was_pointer, new_type.is_pointer()) {
            // Pointer to pointer: same storage, same pointee address.
            (true, true) => self.storage,
            // Object to pointer: the object's address becomes the pointer value.
            (false, true) => match self.storage {
                VariableStorage::Memory(address) => VariableStorage::Value(address.value()),
                VariableStorage::Value(_) => {
                    return Err(OcularError::InvalidArgument(format!(
                        "cannot cast register-resident {} to pointer type {}",
                        self.code_type.full_name(),
                        new_type.full_name()
                    )))
                }
            },
            // Pointer to object: the view moves to the pointee.
            (true, false) => VariableStorage::Memory(Address::new(self.read_data()?)),
            // Object to object: same address, new layout.
            (false, false) => match self.storage {
                VariableStorage::Memory(address) => VariableStorage::Memory(address),
                VariableStorage::Value(value) => VariableStorage::Value(value),
            },
        };

        Ok(self.derived(new_type.clone(), storage, &self.name))
    }

    /// Decode as a boolean: any nonzero scalar is `true`.
    pub fn to_bool(&self) -> Result<bool>
    {
        Ok(self.read_data()? != 0)
    }

    /// Decode as an unsigned integer of the declared size.
    pub fn to_u64(&self) -> Result<u64>
    {
        self.read_data()
    }

    /// Decode as a signed integer, sign-extending from the declared size.
    pub fn to_i64(&self) -> Result<i64>
    {
        Ok(sign_extend(self.read_data()?, self.code_type.size()))
    }

    /// Decode as a float; the declared size selects f32 or f64.
    pub fn to_f64(&self) -> Result<f64>
    {
        let raw = self.read_data()?;
        match self.code_type.size() {
            4 => Ok(f64::from(f32::from_bits(raw as u32))),
            8 => Ok(f64::from_bits(raw)),
            size => Err(OcularError::InvalidArgument(format!(
                "cannot decode {size}-byte type {} as float",
                self.code_type.full_name()
            ))),
        }
    }

    /// Render this Variable for display.
    ///
    /// Null pointers render as `(null)`. Character pointers and arrays
    /// decode a terminated, bounded run of characters. Which strategy
    /// applies is re-derived on every call, since it depends on the live
    /// type and data. Primitives decode per size and signedness, other
    /// pointers render as hex, and everything else falls back to the type
    /// name in braces.
    pub fn to_display_string(&self) -> Result<String>
    {
        if self.code_type.is_pointer() || self.code_type.is_array() {
            if self.code_type.is_pointer() && self.read_data()? == 0 {
                return Ok("(null)".to_string());
            }
            if let Some(kind) = self.code_type.element_type()?.primitive_kind() {
                match kind {
                    PrimitiveKind::Char8 => return self.read_terminated_string(1),
                    PrimitiveKind::Char16 => return self.read_terminated_string(2),
                    _ => {}
                }
            }
        }

        if let Some(kind) = self.code_type.primitive_kind() {
            let raw = self.read_data()?;
            return Ok(match kind {
                PrimitiveKind::Bool => (raw != 0).to_string(),
                PrimitiveKind::Char8 => char::from(raw as u8).to_string(),
                PrimitiveKind::Char16 => char::from_u32(raw as u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER)
                    .to_string(),
                PrimitiveKind::Signed => sign_extend(raw, self.code_type.size()).to_string(),
                PrimitiveKind::Unsigned => raw.to_string(),
                PrimitiveKind::Float => self.to_f64()?.to_string(),
            });
        }

        match self.code_type.kind() {
            TypeKind::Enum => Ok(self.read_data()?.to_string()),
            TypeKind::Pointer => Ok(format!("0x{:x}", self.read_data()?)),
            _ => Ok(format!("{{{}}}", self.code_type.name())),
        }
    }

    /// Read a NUL-terminated character run of `width`-byte units, bounded
    /// by [`MAX_STRING_READ`] (and the declared length for inline arrays).
    fn read_terminated_string(&self, width: usize) -> Result<String>
    {
        let (base, limit) = if self.code_type.is_array() {
            let address = self.address().ok_or_else(|| {
                OcularError::InvalidArgument("character array without a memory address".to_string())
            })?;
            (address, (self.code_type.array_length()? as usize).min(MAX_STRING_READ))
        } else {
            (Address::new(self.read_data()?), MAX_STRING_READ)
        };

        let mut units = Vec::new();
        for index in 0..limit {
            let bytes = self
                .session
                .provider()
                .read_memory(base + (index * width) as u64, width)?;
            let unit = u64_from_le(&bytes);
            if unit == 0 {
                break;
            }
            units.push(unit);
        }

        if width == 2 {
            let wide: Vec<u16> = units.iter().map(|unit| *unit as u16).collect();
            Ok(U16String::from_vec(wide).to_string_lossy())
        } else {
            Ok(units.iter().map(|unit| char::from(*unit as u8)).collect())
        }
    }

    pub(crate) fn session(&self) -> &Session
    {
        &self.session
    }
}

impl fmt::Display for Variable
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.to_display_string() {
            Ok(text) => write!(f, "{text}"),
            Err(err) => write!(f, "<unreadable: {err}>"),
        }
    }
}

impl fmt::Debug for Variable
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Variable")
            .field("name", &self.name)
            .field("type", &self.code_type.full_name())
            .field("storage", &self.storage)
            .finish()
    }
}

fn u64_from_le(bytes: &[u8]) -> u64
{
    let mut raw = [0u8; 8];
    let len = bytes.len().min(8);
    raw[..len].copy_from_slice(&bytes[..len]);
    u64::from_le_bytes(raw)
}

fn sign_extend(raw: u64, size: u64) -> i64
{
    match size {
        1 => i64::from(raw as u8 as i8),
        2 => i64::from(raw as u16 as i16),
        4 => i64::from(raw as u32 as i32),
        _ => raw as i64,
    }
}

/// Ordered mapping of names to Variables
///
/// Produced when a frame materializes its locals and arguments: order
/// follows the engine's enumeration, and names stay addressable for
/// by-name lookup.
#[derive(Clone, Default)]
pub struct VariableCollection
{
    variables: Vec<Variable>,
}

impl VariableCollection
{
    /// Create an empty collection.
    pub fn new() -> Self
    {
        Self::default()
    }

    pub(crate) fn push(&mut self, variable: Variable)
    {
        self.variables.push(variable);
    }

    /// Number of variables.
    pub fn len(&self) -> usize
    {
        self.variables.len()
    }

    /// Returns `true` when the collection holds nothing.
    pub fn is_empty(&self) -> bool
    {
        self.variables.is_empty()
    }

    /// Look up a variable by name.
    pub fn get(&self, name: &str) -> Option<&Variable>
    {
        self.variables.iter().find(|variable| variable.name() == name)
    }

    /// Names in enumeration order.
    pub fn names(&self) -> Vec<&str>
    {
        self.variables.iter().map(Variable::name).collect()
    }

    /// Iterate in enumeration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Variable>
    {
        self.variables.iter()
    }
}

impl Index<usize> for VariableCollection
{
    type Output = Variable;

    fn index(&self, index: usize) -> &Self::Output
    {
        &self.variables[index]
    }
}

impl<'a> IntoIterator for &'a VariableCollection
{
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter
    {
        self.variables.iter()
    }
}

#[cfg(test)]
mod tests
{
    use super::{sign_extend, u64_from_le};

    #[test]
    fn little_endian_decode_pads_short_reads()
    {
        assert_eq!(u64_from_le(&[0x34, 0x12]), 0x1234);
        assert_eq!(u64_from_le(&[0xff]), 0xff);
    }

    #[test]
    fn sign_extension_honors_declared_size()
    {
        assert_eq!(sign_extend(0xff, 1), -1);
        assert_eq!(sign_extend(0xff, 2), 255);
        assert_eq!(sign_extend(0xffff_fffe, 4), -2);
        assert_eq!(sign_extend(u64::MAX, 8), -1);
    }
}
