//! # Provider Trait
//!
//! The interface to the external process-debugging engine.
//!
//! This trait defines what the core needs from an engine, regardless of what
//! the engine actually is: a live-process debugger, a crash-dump reader, or
//! an in-memory fixture in tests. Everything the typed object model does
//! bottoms out in these few primitives: read bytes at an address, resolve a
//! name to type metadata, and step one frame up the call stack.
//!
//! ## Why use a trait?
//!
//! Traits allow us to:
//! - Write engine-agnostic code for the whole variable/type/stack model
//! - Swap implementations easily (e.g., for testing against scripted fixtures)
//! - Hide engine round-trip details behind a clean interface
//!
//! ## Context-implicit reads
//!
//! Register and local-variable reads always target "the current thread" of
//! the engine, mirroring how real engine connections behave. Reading state
//! for another thread requires a scoped context switch through
//! [`crate::session::Session::switch_thread`], which restores the previous
//! current thread on every exit path.
//!
//! ## Thread Safety
//!
//! Methods take `&self` so providers may use interior mutability, but the
//! core does not assume the provider is thread-safe. Callers serialize
//! access to a session.

use crate::error::Result;
use crate::types::{Address, SourceLocation, ThreadId};

/// Reference to a type by `(module, name)`, resolved lazily through the
/// session's type cache.
///
/// Metadata uses references instead of inline nested metadata so that
/// self-referential layouts (a list node whose `_Next` field points at the
/// node type itself) do not recurse at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef
{
    /// Module the type lives in.
    pub module: String,
    /// Fully qualified type name within the module.
    pub name: String,
}

impl TypeRef
{
    /// Convenience constructor.
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self
    {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }
}

/// Classification of a primitive type, driving scalar decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind
{
    /// Boolean of any size; nonzero is `true`.
    Bool,
    /// One-byte character unit (narrow strings).
    Char8,
    /// Two-byte character unit (wide strings, UTF-16).
    Char16,
    /// Signed integer; decoded with sign extension from the declared size.
    Signed,
    /// Unsigned integer.
    Unsigned,
    /// IEEE float; declared size selects f32 or f64 decoding.
    Float,
}

/// Kind of a type, shared by raw metadata and resolved [`crate::codetype::CodeType`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind
{
    /// Scalar with a decoding classification.
    Primitive(PrimitiveKind),
    /// Struct or class with fields and optional base classes.
    Struct,
    /// Pointer; `element` names the pointee type.
    Pointer,
    /// Fixed-size array; `element` names the element type and the declared
    /// length is `size / element.size`.
    Array,
    /// Enumeration; decoded as its underlying integer.
    Enum,
}

/// Storage placement of a field within its owning type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPlacement
{
    /// Instance field at a byte offset from the start of the owning object.
    Offset(u64),
    /// Static field at an absolute address, independent of any instance.
    Static(Address),
}

/// One field in a type layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMetadata
{
    /// Field name.
    pub name: String,
    /// Instance offset or static address.
    pub placement: FieldPlacement,
    /// Field type, resolved lazily.
    pub ty: TypeRef,
}

impl FieldMetadata
{
    /// Convenience constructor for the common instance-field case.
    pub fn at_offset(name: impl Into<String>, offset: u64, ty: TypeRef) -> Self
    {
        Self {
            name: name.into(),
            placement: FieldPlacement::Offset(offset),
            ty,
        }
    }
}

/// One base class in a type layout.
///
/// The offset may be zero for a first base and non-zero for subsequent or
/// virtual bases; multiple inheritance levels compose by chained offset
/// addition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseMetadata
{
    /// Base class name.
    pub name: String,
    /// Byte offset of the base subobject.
    pub offset: u64,
    /// Base class type, resolved lazily.
    pub ty: TypeRef,
}

/// Raw type layout as reported by the engine, before it is interned into a
/// [`crate::codetype::CodeType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMetadata
{
    /// Type name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Kind classification.
    pub kind: TypeKind,
    /// Element type for pointers and arrays.
    pub element: Option<TypeRef>,
    /// Ordered field list.
    pub fields: Vec<FieldMetadata>,
    /// Ordered base-class list.
    pub bases: Vec<BaseMetadata>,
}

/// A module (binary image) loaded in the target process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo
{
    /// Module name used to scope type and symbol lookups.
    pub name: String,
    /// Load address.
    pub base: Address,
    /// Image size in bytes.
    pub size: u64,
}

/// A thread of the target process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadInfo
{
    /// Engine-assigned thread id.
    pub id: ThreadId,
    /// Operating-system thread id.
    pub os_id: u32,
}

/// Register snapshot describing one point in a thread's call stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameContext
{
    /// Instruction pointer.
    pub pc: Address,
    /// Stack pointer.
    pub sp: Address,
    /// Frame/base pointer.
    pub fp: Address,
}

/// Function metadata for an instruction pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo
{
    /// Function name.
    pub name: String,
    /// Address of the function's first instruction, used to compute the
    /// byte displacement of a frame's pc from the function start.
    pub start: Address,
    /// Source file/line when line-number metadata exists.
    pub location: Option<SourceLocation>,
}

/// Where a local variable's storage lives at a given instruction pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalLocation
{
    /// Absolute target address (globals promoted into scope, statics).
    Absolute(Address),
    /// Signed byte offset from the frame pointer.
    FrameOffset(i64),
    /// Engine register number; read context-implicitly from the current
    /// thread, yielding a value-backed Variable.
    Register(u16),
}

/// One named local or argument valid at an instruction pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInfo
{
    /// Local or argument name.
    pub name: String,
    /// Declared type.
    pub ty: TypeRef,
    /// Storage location.
    pub location: LocalLocation,
}

/// Interface to the native debugging engine
///
/// All read operations in the object model are pass-through to
/// [`Provider::read_memory`]; the model performs no caching of raw bytes, so
/// repeated scalar reads on the same Variable re-fetch from the live target
/// by design (the debuggee may have changed between calls).
///
/// Memory reads may block on an engine round-trip. The core exposes no
/// cancellation token; callers needing timeouts must wrap calls externally.
pub trait Provider
{
    /// Read `length` bytes at `address` in the target process.
    ///
    /// ## Errors
    ///
    /// `MemoryReadError` when any requested byte is unmapped or the engine
    /// cannot service the read. Partial reads are not returned.
    fn read_memory(&self, address: Address, length: usize) -> Result<Vec<u8>>;

    /// Resolve a type name to all matching layouts in a module.
    ///
    /// Returns every definition the engine knows for the `(module, name)`
    /// pair; the type cache collapses identical duplicates and rejects
    /// genuinely ambiguous results. An empty vector means not found.
    fn resolve_type(&self, module: &str, name: &str) -> Result<Vec<TypeMetadata>>;

    /// Resolve a global/static symbol to its address and type.
    fn resolve_symbol(&self, module: &str, name: &str) -> Result<Option<(Address, TypeRef)>>;

    /// Enumerate loaded modules.
    fn enumerate_modules(&self) -> Result<Vec<ModuleInfo>>;

    /// Pointer size of the target, in bytes.
    fn pointer_size(&self) -> u64;

    /// Enumerate the threads of the target process.
    fn threads(&self) -> Result<Vec<ThreadInfo>>;

    /// Engine-assigned id of the current thread.
    fn current_thread(&self) -> Result<ThreadId>;

    /// Make `thread` the engine's current thread, returning the previous one.
    ///
    /// This is the low-level half of the scoped switch discipline; use
    /// [`crate::session::Session::switch_thread`] instead of calling it
    /// directly so the previous thread is restored on error paths too.
    fn set_current_thread(&self, thread: ThreadId) -> Result<ThreadId>;

    /// Register snapshot (pc/sp/fp) of a stopped thread.
    fn thread_context(&self, thread: ThreadId) -> Result<FrameContext>;

    /// One unwind step: recover the caller's context from `frame`.
    ///
    /// Returns `None` when the frame has no resolvable caller (top of stack).
    fn unwind_frame(&self, thread: ThreadId, frame: &FrameContext) -> Result<Option<FrameContext>>;

    /// Function metadata for an instruction pointer, if the engine has
    /// symbols covering it.
    fn function_at(&self, pc: Address) -> Result<Option<FunctionInfo>>;

    /// Named locals and arguments valid at an instruction pointer.
    fn locals_at(&self, pc: Address) -> Result<Vec<LocalInfo>>;

    /// Read a register of the current thread.
    ///
    /// Context-implicit: call inside a scoped thread switch when targeting a
    /// thread other than the current one.
    fn read_register(&self, register: u16) -> Result<u64>;
}

/// Additional queries exposed by a managed-runtime engine
///
/// A managed provider understands the garbage-collected heap of a runtime
/// loaded in the target process and can report live objects and their
/// runtime types. The core only consumes this metadata; it never implements
/// any collector behavior itself.
pub trait ManagedProvider: Provider
{
    /// Whether the GC heap is in a consistent state for enumeration.
    ///
    /// Stopping the process mid-collection can leave segments unwalkable;
    /// callers may still attempt a walk but should expect partial results.
    fn can_walk_heap(&self) -> bool;

    /// Total heap size: the sum of the lengths of all segments.
    fn total_heap_size(&self) -> u64;

    /// Number of generations the runtime reports (the large-object heap
    /// counts as the last generation).
    fn generation_count(&self) -> u32;

    /// Bytes attributed to one generation.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` for a generation outside `0..generation_count()`.
    fn size_by_generation(&self, generation: u32) -> Result<u64>;

    /// Lazy enumeration of live object addresses, in the runtime's native
    /// order. Nothing is materialized ahead of consumption.
    fn enumerate_object_addresses(&self) -> Box<dyn Iterator<Item = Address> + '_>;

    /// Runtime type of the object at `address`.
    fn object_type(&self, address: Address) -> Result<TypeRef>;
}
