//! # Managed-Heap Enumerator
//!
//! Garbage-collected heap walking for sessions with a managed-runtime
//! provider.

use std::sync::Arc;

use crate::error::Result;
use crate::provider::ManagedProvider;
use crate::session::Session;
use crate::variable::Variable;

/// The managed (garbage-collected) heap of the debuggee.
///
/// Only available from sessions built with
/// [`Session::with_managed`](crate::Session::with_managed); plain native
/// sessions have no GC heap metadata to walk.
pub struct Heap
{
    session: Session,
    managed: Arc<dyn ManagedProvider>,
}

impl Heap
{
    pub(crate) fn new(session: Session, managed: Arc<dyn ManagedProvider>) -> Self
    {
        Self { session, managed }
    }

    /// Whether the runtime reports the heap as walkable.
    ///
    /// The heap is unwalkable when the debuggee stopped mid-GC; callers
    /// should check before enumerating.
    pub fn can_walk_heap(&self) -> bool
    {
        self.managed.can_walk_heap()
    }

    /// Total heap size in bytes across all generations.
    pub fn total_heap_size(&self) -> u64
    {
        self.managed.total_heap_size()
    }

    /// Number of GC generations the runtime tracks.
    pub fn generation_count(&self) -> u32
    {
        self.managed.generation_count()
    }

    /// Bytes held by one generation.
    pub fn size_by_generation(&self, generation: u32) -> Result<u64>
    {
        self.managed.size_by_generation(generation)
    }

    /// Lazily enumerate live heap objects as typed Variables.
    ///
    /// Objects come back in the provider's walk order. Each address's
    /// runtime type is resolved through the session's type cache as the
    /// iterator advances; nothing is materialized ahead of consumption.
    /// Per-object failures surface as `Err` items without ending the walk.
    pub fn enumerate_objects(&self) -> impl Iterator<Item = Result<Variable>> + '_
    {
        self.managed.enumerate_object_addresses().map(move |address| {
            let type_ref = self.managed.object_type(address)?;
            let code_type = self.session.resolve_type(&type_ref.module, &type_ref.name)?;
            Ok(Variable::new(&self.session, code_type, address))
        })
    }
}
