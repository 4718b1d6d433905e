//! # Error Types
//!
//! General error handling for the inspection core.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Every failure below is surfaced to the caller as a distinct, catchable
//! value. Nothing in this crate logs-and-swallows an error, and nothing
//! retries: a stale read is a caller concern, not a transient fault.

use thiserror::Error;

use crate::types::Address;

/// Main error type for inspection operations
///
/// This enum represents all the ways an operation on the typed object model
/// can fail. Each variant corresponds to a specific error condition.
///
/// ## Error Categories
///
/// 1. **Resolution errors**: SymbolNotFound, AmbiguousSymbol
/// 2. **Layout-contract violations** (programmer/script error): NoSuchField,
///    NotAPointerOrArray, IndexOutOfRange
/// 3. **Environment conditions**: MemoryReadError (never silently substituted
///    with zeros), NullPointerDereference
/// 4. **Wrapper validation failures**: IncompatibleLayout, CorruptedContainer
/// 5. **Corrupted-target guards**: StackUnwindLimitExceeded
#[derive(Error, Debug)]
pub enum OcularError
{
    /// No type or symbol with the given name exists in the module
    ///
    /// Returned by type/symbol resolution when the engine reports no match
    /// for the `(module, name)` pair.
    #[error("Symbol not found: {module}!{name}")]
    SymbolNotFound
    {
        /// Module the lookup was scoped to
        module: String,
        /// Type or symbol name that failed to resolve
        name: String,
    },

    /// More than one distinct layout matches the given name
    ///
    /// The engine reported several definitions for the same `(module, name)`
    /// pair whose layouts differ. Identical duplicates (the common case with
    /// per-compilation-unit debug info) are collapsed before this is raised.
    #[error("Ambiguous symbol: {module}!{name} matches {count} distinct layouts")]
    AmbiguousSymbol
    {
        /// Module the lookup was scoped to
        module: String,
        /// Type or symbol name that resolved ambiguously
        name: String,
        /// Number of distinct layouts found
        count: usize,
    },

    /// The bound code type has no field with the given name
    ///
    /// Field lookup walks the declared fields and then the base-class chain;
    /// this is raised when neither contains the name.
    #[error("Type {type_name} has no field named {field}")]
    NoSuchField
    {
        /// Name of the type the lookup ran against
        type_name: String,
        /// Field name that was requested
        field: String,
    },

    /// Dereference or element access on a type that is neither pointer nor array
    #[error("Type {type_name} is not a pointer or array type")]
    NotAPointerOrArray
    {
        /// Name of the offending type
        type_name: String,
    },

    /// Array index beyond the statically declared length
    ///
    /// Only raised for arrays whose code type declares a length.
    /// Pointer-as-array access is unbounded and the caller's responsibility.
    #[error("Index {index} is out of range for array of length {length}")]
    IndexOutOfRange
    {
        /// Requested element index
        index: usize,
        /// Declared array length
        length: u64,
    },

    /// Target memory could not be read
    ///
    /// The address is not mapped, paged out, or the engine connection failed.
    /// This is always surfaced; reads are never substituted with zeros.
    #[error("Cannot read {length} bytes at {address}: {reason}")]
    MemoryReadError
    {
        /// Address the read started at
        address: Address,
        /// Number of bytes requested
        length: usize,
        /// Engine-reported reason
        reason: String,
    },

    /// A pointer with value zero was dereferenced
    ///
    /// Policy choice: a null target address is an error, not a sentinel
    /// Variable pointing at address zero.
    #[error("Null pointer dereference on variable of type {type_name}")]
    NullPointerDereference
    {
        /// Pointer type that held the null value
        type_name: String,
    },

    /// A user-type wrapper was constructed over a Variable whose layout
    /// does not match the expected structural pattern
    #[error("Incompatible layout for {wrapper}: type {type_name} is missing {missing}")]
    IncompatibleLayout
    {
        /// Wrapper that rejected the layout
        wrapper: &'static str,
        /// Name of the rejected type
        type_name: String,
        /// What structural element was absent or malformed
        missing: String,
    },

    /// Container traversal did not terminate within the container's reported size
    ///
    /// Converts "infinite loop on corrupted data" into a reported error:
    /// a linked container whose traversal never returns to the sentinel is
    /// cut off after the number of nodes the container claims to hold.
    #[error("Corrupted {container}: traversal did not terminate within {bound} nodes")]
    CorruptedContainer
    {
        /// Which container kind detected the corruption
        container: &'static str,
        /// Traversal bound that was exhausted
        bound: u64,
    },

    /// Stack unwinding exceeded the maximum frame count
    ///
    /// Guards against corrupted or pathological call stacks that would
    /// otherwise unwind forever.
    #[error("Stack unwind exceeded the limit of {limit} frames")]
    StackUnwindLimitExceeded
    {
        /// Depth guard that was hit
        limit: usize,
    },

    /// The session was built without a managed-runtime provider
    ///
    /// Heap enumeration and generation queries require GC heap metadata that
    /// only a managed-runtime engine exposes.
    #[error("No managed-runtime provider available for this session")]
    HeapUnavailable,

    /// Invalid argument passed to a core operation
    ///
    /// Examples:
    /// - Casting a register-resident value to a non-pointer type
    /// - Type metadata violating the field-offset invariant
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience type alias for `Result<T, OcularError>`
///
/// ```rust
/// use ocular_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, OcularError>;
