//! # Code Type Model
//!
//! Resolved type-layout descriptors and the process-wide type cache.
//!
//! A [`CodeType`] describes one type of the target process: its size, kind,
//! ordered fields, base classes, and (for pointers and arrays) its element
//! type. Instances are built lazily from provider metadata and interned in a
//! [`TypeCache`] keyed by `(module, name)`, so repeated resolution of the
//! same name returns the identical `Arc` and downstream caches keyed by
//! `CodeType` identity behave correctly.
//!
//! Field and element types are stored as [`TypeRef`]s and resolved through
//! the owning session on access. This keeps resolution of one type from
//! recursing into the whole reachable type graph, which would never
//! terminate for self-referential layouts like linked-list nodes.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use smallvec::SmallVec;
use tracing::debug;

use crate::error::{OcularError, Result};
use crate::provider::{BaseMetadata, FieldMetadata, FieldPlacement, TypeMetadata, TypeRef};
use crate::session::SessionInner;

pub use crate::provider::{PrimitiveKind, TypeKind};

/// Resolved type-layout descriptor, immutable once interned.
///
/// Identity is the `(module, name)` pair; equality compares identity, not
/// layout. A `CodeType` holds a weak handle to its session so field, base,
/// and element lookups can resolve their `TypeRef`s through the same cache
/// that produced this instance.
pub struct CodeType
{
    session: Weak<SessionInner>,
    module: String,
    name: String,
    size: u64,
    kind: TypeKind,
    element: Option<TypeRef>,
    fields: Vec<FieldMetadata>,
    bases: SmallVec<[BaseMetadata; 2]>,
}

impl CodeType
{
    pub(crate) fn from_metadata(session: Weak<SessionInner>, module: &str, metadata: TypeMetadata) -> Result<Self>
    {
        if matches!(metadata.kind, TypeKind::Pointer | TypeKind::Array) && metadata.element.is_none() {
            return Err(OcularError::InvalidArgument(format!(
                "metadata for {module}!{} declares a {:?} kind without an element type",
                metadata.name, metadata.kind
            )));
        }

        // Instance-field offsets must be monotonic non-decreasing and stay
        // inside the declared size within a single inheritance layout.
        let mut previous = 0u64;
        for field in &metadata.fields {
            let FieldPlacement::Offset(offset) = field.placement else {
                continue;
            };
            if offset < previous || offset > metadata.size {
                return Err(OcularError::InvalidArgument(format!(
                    "metadata for {module}!{} has field {} at invalid offset {offset}",
                    metadata.name, field.name
                )));
            }
            previous = offset;
        }

        Ok(Self {
            session,
            module: module.to_string(),
            name: metadata.name,
            size: metadata.size,
            kind: metadata.kind,
            element: metadata.element,
            fields: metadata.fields,
            bases: SmallVec::from_vec(metadata.bases),
        })
    }

    /// Module this type was resolved in.
    pub fn module(&self) -> &str
    {
        &self.module
    }

    /// Type name.
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// `module!name` form used in messages and cast expressions.
    pub fn full_name(&self) -> String
    {
        format!("{}!{}", self.module, self.name)
    }

    /// Size in bytes.
    pub fn size(&self) -> u64
    {
        self.size
    }

    /// Kind classification.
    pub fn kind(&self) -> TypeKind
    {
        self.kind
    }

    /// Returns `true` for pointer types.
    pub fn is_pointer(&self) -> bool
    {
        self.kind == TypeKind::Pointer
    }

    /// Returns `true` for array types.
    pub fn is_array(&self) -> bool
    {
        self.kind == TypeKind::Array
    }

    /// Returns `true` for primitive (scalar) types.
    pub fn is_primitive(&self) -> bool
    {
        matches!(self.kind, TypeKind::Primitive(_))
    }

    /// Primitive classification, if this is a primitive type.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind>
    {
        match self.kind {
            TypeKind::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    /// Element type of a pointer or array.
    ///
    /// ## Errors
    ///
    /// `NotAPointerOrArray` for any other kind.
    pub fn element_type(&self) -> Result<Arc<CodeType>>
    {
        match &self.element {
            Some(element) if matches!(self.kind, TypeKind::Pointer | TypeKind::Array) => self.resolve_ref(element),
            _ => Err(OcularError::NotAPointerOrArray {
                type_name: self.full_name(),
            }),
        }
    }

    /// Declared length of an array type: `size / element_size`.
    ///
    /// ## Errors
    ///
    /// `NotAPointerOrArray` for non-arrays; `InvalidArgument` when the
    /// element type reports size zero.
    pub fn array_length(&self) -> Result<u64>
    {
        if self.kind != TypeKind::Array {
            return Err(OcularError::NotAPointerOrArray {
                type_name: self.full_name(),
            });
        }

        let element = self.element_type()?;
        if element.size() == 0 {
            return Err(OcularError::InvalidArgument(format!(
                "array {} has a zero-sized element type {}",
                self.full_name(),
                element.full_name()
            )));
        }
        Ok(self.size / element.size())
    }

    /// Look up a field declared directly on this type (no base-class walk).
    ///
    /// Returns the field's placement and resolved type.
    pub fn class_field(&self, name: &str) -> Result<(FieldPlacement, Arc<CodeType>)>
    {
        for field in &self.fields {
            if field.name == name {
                return Ok((field.placement, self.resolve_ref(&field.ty)?));
            }
        }
        Err(self.no_such_field(name))
    }

    /// Look up a field on this type or any of its base classes.
    ///
    /// Base classes are searched in declaration order, recursively; offsets
    /// compose by chained addition, so a field inherited two levels deep
    /// reports `base_offset + nested_base_offset + field_offset`. Static
    /// fields keep their absolute address through the walk.
    pub fn field(&self, name: &str) -> Result<(FieldPlacement, Arc<CodeType>)>
    {
        // Only a name miss falls through to the base-class walk. A field whose
        // name matched but whose type failed to resolve is a resolution
        // failure, not an absent field.
        match self.class_field(name) {
            Ok(found) => return Ok(found),
            Err(OcularError::NoSuchField { .. }) => {}
            Err(err) => return Err(err),
        }
        for base in &self.bases {
            let base_type = self.resolve_ref(&base.ty)?;
            match base_type.field(name) {
                Ok((placement, ty)) => {
                    let placement = match placement {
                        FieldPlacement::Offset(offset) => FieldPlacement::Offset(base.offset + offset),
                        FieldPlacement::Static(address) => FieldPlacement::Static(address),
                    };
                    return Ok((placement, ty));
                }
                Err(OcularError::NoSuchField { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Err(self.no_such_field(name))
    }

    /// Returns `true` when [`CodeType::field`] would succeed.
    pub fn has_field(&self, name: &str) -> bool
    {
        self.field(name).is_ok()
    }

    /// View-as-base accessor: offset and type of a named direct base class.
    ///
    /// ## Errors
    ///
    /// `NoSuchField` when no direct base carries the name.
    pub fn base_class(&self, name: &str) -> Result<(u64, Arc<CodeType>)>
    {
        for base in &self.bases {
            if base.name == name {
                return Ok((base.offset, self.resolve_ref(&base.ty)?));
            }
        }
        Err(self.no_such_field(name))
    }

    /// Ordered base-class list as `(name, offset)` pairs.
    pub fn base_class_names(&self) -> Vec<(String, u64)>
    {
        self.bases.iter().map(|base| (base.name.clone(), base.offset)).collect()
    }

    /// Field names declared directly on this type, in layout order.
    pub fn class_field_names(&self) -> Vec<String>
    {
        self.fields.iter().map(|field| field.name.clone()).collect()
    }

    /// Field names including inherited ones: base-class fields first (in
    /// base declaration order), then this type's own fields.
    pub fn field_names(&self) -> Result<Vec<String>>
    {
        let mut names = Vec::new();
        for base in &self.bases {
            names.extend(self.resolve_ref(&base.ty)?.field_names()?);
        }
        names.extend(self.class_field_names());
        Ok(names)
    }

    pub(crate) fn resolve_ref(&self, reference: &TypeRef) -> Result<Arc<CodeType>>
    {
        let inner = self.session.upgrade().ok_or_else(|| {
            OcularError::InvalidArgument(format!(
                "session owning type {} has been dropped",
                self.full_name()
            ))
        })?;
        TypeCache::resolve(&inner, &reference.module, &reference.name)
    }

    fn no_such_field(&self, field: &str) -> OcularError
    {
        OcularError::NoSuchField {
            type_name: self.full_name(),
            field: field.to_string(),
        }
    }
}

impl PartialEq for CodeType
{
    fn eq(&self, other: &Self) -> bool
    {
        self.module == other.module && self.name == other.name
    }
}

impl Eq for CodeType {}

impl fmt::Display for CodeType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}!{}", self.module, self.name)
    }
}

impl fmt::Debug for CodeType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("CodeType")
            .field("module", &self.module)
            .field("name", &self.name)
            .field("size", &self.size)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Process-wide cache of interned [`CodeType`]s.
///
/// Entries live for the duration of the debug session and are invalidated
/// wholesale when the module set changes; nothing here detects that on its
/// own, callers drop the cache through
/// [`crate::session::Session::invalidate_types`] when they resume or reload.
#[derive(Default)]
pub(crate) struct TypeCache
{
    entries: Mutex<HashMap<(String, String), Arc<CodeType>>>,
}

impl TypeCache
{
    pub(crate) fn new() -> Self
    {
        Self::default()
    }

    /// Resolve `(module, name)` to a reference-stable `Arc<CodeType>`.
    ///
    /// ## Errors
    ///
    /// - `SymbolNotFound` when the provider reports no match
    /// - `AmbiguousSymbol` when more than one *distinct* layout matches
    ///   (identical duplicates from separate compilation units collapse)
    pub(crate) fn resolve(inner: &Arc<SessionInner>, module: &str, name: &str) -> Result<Arc<CodeType>>
    {
        let key = (module.to_string(), name.to_string());
        if let Some(existing) = inner.types.lock_entries().get(&key) {
            return Ok(existing.clone());
        }

        let mut matches: Vec<TypeMetadata> = Vec::new();
        for candidate in inner.provider().resolve_type(module, name)? {
            if !matches.contains(&candidate) {
                matches.push(candidate);
            }
        }
        if matches.is_empty() {
            return Err(OcularError::SymbolNotFound {
                module: module.to_string(),
                name: name.to_string(),
            });
        }
        if matches.len() > 1 {
            return Err(OcularError::AmbiguousSymbol {
                module: module.to_string(),
                name: name.to_string(),
                count: matches.len(),
            });
        }

        let metadata = matches.remove(0);
        debug!(module, name, size = metadata.size, "interning code type");
        let code_type = Arc::new(CodeType::from_metadata(Arc::downgrade(inner), module, metadata)?);

        // First insertion wins so concurrent resolution stays reference-stable.
        let mut entries = inner.types.lock_entries();
        Ok(entries.entry(key).or_insert(code_type).clone())
    }

    /// Drop every cached type. Used on module reload.
    pub(crate) fn invalidate(&self)
    {
        let mut entries = self.lock_entries();
        debug!(dropped = entries.len(), "invalidating type cache");
        entries.clear();
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<(String, String), Arc<CodeType>>>
    {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
