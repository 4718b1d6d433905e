//! # ocular-core
//!
//! Symbolic object model over a native debugging engine for Ocular.
//!
//! This crate provides the scripting-facing view of a stopped debuggee,
//! including:
//! - Interned code types resolved from debug symbols ([`CodeType`])
//! - Typed views onto target memory and values ([`Variable`])
//! - Wrappers over well-known standard-library layouts ([`usertype`])
//! - Threads, stack traces, and frame locals ([`stack`])
//! - Managed (GC) heap enumeration ([`Heap`])
//!
//! Everything is driven through the [`Provider`] trait, which abstracts
//! the underlying engine: symbol resolution, memory reads, thread
//! contexts, and unwinding. The model caches type identity aggressively
//! and raw bytes never: every scalar read goes back to the live target.

pub mod codetype;
pub mod error;
pub mod heap;
pub mod provider;
pub mod session;
pub mod stack;
pub mod types;
pub mod usertype;
pub mod variable;

pub use codetype::CodeType;
// Re-export commonly used types
pub use error::{OcularError, Result};
pub use heap::Heap;
pub use provider::{
    BaseMetadata, FieldMetadata, FieldPlacement, FrameContext, FunctionInfo, LocalInfo, LocalLocation,
    ManagedProvider, ModuleInfo, PrimitiveKind, Provider, ThreadInfo, TypeKind, TypeMetadata,
    TypeRef,
};
pub use session::{Session, ThreadSwitcher};
pub use stack::{StackFrame, StackTrace, Thread, MAX_UNWIND_DEPTH};
pub use types::{Address, SourceLocation, ThreadId};
pub use usertype::{ListView, UserMember, VectorView, WideString};
pub use variable::{Variable, VariableCollection, VariableStorage};
