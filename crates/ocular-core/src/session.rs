//! # Debug Session
//!
//! Cheap-cloneable handle tying a provider to the process-wide type cache.
//!
//! A [`Session`] models one coherent "current execution state": one target
//! process inspected through one engine connection. All Variables, threads,
//! and heap walkers derived from a session carry a clone of it, so the type
//! cache stays shared and reference-stable across the whole object graph.
//!
//! ## Caching and staleness
//!
//! The type cache is never invalidated automatically. When the debuggee
//! resumes execution or modules reload, callers drop session-scoped caches
//! through [`Session::invalidate_types`] and re-fetch Variables; nothing in
//! the core detects staleness on its own.

use std::sync::Arc;

use tracing::warn;

use crate::codetype::{CodeType, TypeCache};
use crate::error::{OcularError, Result};
use crate::heap::Heap;
use crate::provider::{ManagedProvider, ModuleInfo, Provider};
use crate::stack::Thread;
use crate::types::ThreadId;
use crate::variable::Variable;

pub(crate) struct SessionInner
{
    provider: Arc<dyn Provider>,
    managed: Option<Arc<dyn ManagedProvider>>,
    pub(crate) types: TypeCache,
}

impl SessionInner
{
    pub(crate) fn provider(&self) -> &dyn Provider
    {
        &*self.provider
    }
}

/// Handle to one debug session
///
/// Clones share the same provider connection and type cache. The session is
/// accessed synchronously; the core does not assume the provider is
/// thread-safe and callers serialize access.
#[derive(Clone)]
pub struct Session
{
    inner: Arc<SessionInner>,
}

impl Session
{
    /// Create a session over a native-symbol provider.
    pub fn new(provider: impl Provider + 'static) -> Self
    {
        Self {
            inner: Arc::new(SessionInner {
                provider: Arc::new(provider),
                managed: None,
                types: TypeCache::new(),
            }),
        }
    }

    /// Create a session over a managed-runtime provider, enabling
    /// [`Session::heap`].
    pub fn with_managed(provider: impl ManagedProvider + 'static) -> Self
    {
        let provider = Arc::new(provider);
        Self {
            inner: Arc::new(SessionInner {
                provider: provider.clone(),
                managed: Some(provider),
                types: TypeCache::new(),
            }),
        }
    }

    pub(crate) fn inner(&self) -> &Arc<SessionInner>
    {
        &self.inner
    }

    pub(crate) fn provider(&self) -> &dyn Provider
    {
        self.inner.provider()
    }

    /// Resolve a type name against the session's type cache.
    ///
    /// Repeated resolution of the same `(module, name)` returns the
    /// identical cached instance.
    ///
    /// ## Errors
    ///
    /// `SymbolNotFound` / `AmbiguousSymbol` per the cache contract.
    pub fn resolve_type(&self, module: &str, name: &str) -> Result<Arc<CodeType>>
    {
        TypeCache::resolve(&self.inner, module, name)
    }

    /// Resolve a global or static variable by name.
    ///
    /// ## Errors
    ///
    /// `SymbolNotFound` when the engine knows no such symbol.
    pub fn global_variable(&self, module: &str, name: &str) -> Result<Variable>
    {
        let (address, type_ref) = self
            .provider()
            .resolve_symbol(module, name)?
            .ok_or_else(|| OcularError::SymbolNotFound {
                module: module.to_string(),
                name: name.to_string(),
            })?;
        let code_type = self.resolve_type(&type_ref.module, &type_ref.name)?;
        Ok(Variable::with_name(self, code_type, address, name))
    }

    /// Modules loaded in the target process.
    pub fn modules(&self) -> Result<Vec<ModuleInfo>>
    {
        self.provider().enumerate_modules()
    }

    /// All threads of the target process.
    pub fn threads(&self) -> Result<Vec<Thread>>
    {
        Ok(self
            .provider()
            .threads()?
            .into_iter()
            .map(|info| Thread::new(self.clone(), info))
            .collect())
    }

    /// The engine's current thread.
    pub fn current_thread(&self) -> Result<Thread>
    {
        let current = self.provider().current_thread()?;
        let info = self
            .provider()
            .threads()?
            .into_iter()
            .find(|info| info.id == current)
            .ok_or_else(|| OcularError::InvalidArgument(format!("current thread {current} not in thread list")))?;
        Ok(Thread::new(self.clone(), info))
    }

    /// GC heap view, when the session was built over a managed provider.
    ///
    /// ## Errors
    ///
    /// `HeapUnavailable` for sessions without managed-runtime metadata.
    pub fn heap(&self) -> Result<Heap>
    {
        match &self.inner.managed {
            Some(managed) => Ok(Heap::new(self.clone(), managed.clone())),
            None => Err(OcularError::HeapUnavailable),
        }
    }

    /// Drop all cached types.
    ///
    /// Call when the module set changes (reload) or the debuggee resumes;
    /// Variables and CodeTypes created before this point keep working but
    /// describe the old state.
    pub fn invalidate_types(&self)
    {
        self.inner.types.invalidate();
    }

    /// Scoped switch of the engine's current thread.
    ///
    /// Register and locals reads are context-implicit, so reading another
    /// thread's state requires making it current first. The returned guard
    /// restores the previous current thread when dropped, on every exit
    /// path including errors.
    pub fn switch_thread(&self, target: ThreadId) -> Result<ThreadSwitcher<'_>>
    {
        let previous = self.provider().set_current_thread(target)?;
        Ok(ThreadSwitcher {
            session: self,
            previous: (previous != target).then_some(previous),
        })
    }
}

/// Guard for a scoped thread-context switch
///
/// Restores the previously current thread on drop. Restoration failure
/// cannot be propagated out of `Drop`, so it is logged instead; the next
/// engine call will surface the broken state.
pub struct ThreadSwitcher<'a>
{
    session: &'a Session,
    previous: Option<ThreadId>,
}

impl Drop for ThreadSwitcher<'_>
{
    fn drop(&mut self)
    {
        if let Some(previous) = self.previous.take() {
            if let Err(err) = self.session.provider().set_current_thread(previous) {
                warn!("Failed to restore current thread {previous}: {err}");
            }
        }
    }
}
