//! # Thread and Call-Stack Model
//!
//! Threads, captured stack traces, and frames with lazily-materialized
//! locals.
//!
//! A [`StackTrace`] is an immutable snapshot: unwinding happens once when
//! the trace is captured, and the frames never change afterwards. Frame
//! locals are the exception: they are resolved lazily on first access,
//! inside a scoped switch to the owning thread, because register and
//! frame-relative reads are context-implicit in the engine.

use std::sync::Arc;

use once_cell::unsync::OnceCell;
use tracing::{debug, trace};

use crate::error::{OcularError, Result};
use crate::provider::{FrameContext, FunctionInfo, LocalLocation, ThreadInfo};
use crate::session::Session;
use crate::types::{Address, SourceLocation, ThreadId};
use crate::variable::{Variable, VariableCollection};

/// Maximum number of frames a single unwind will produce.
///
/// A corrupted stack can make the unwinder loop; hitting this bound is
/// treated as corruption rather than a very deep call stack.
pub const MAX_UNWIND_DEPTH: usize = 1024;

/// One thread of the debuggee.
///
/// Holds at most one cached stack trace: [`Thread::stack_trace`] unwinds
/// on first call and returns the same snapshot afterwards, while
/// [`Thread::refresh_stack_trace`] discards the snapshot and unwinds
/// again (after the debuggee resumed and stopped, say).
pub struct Thread
{
    session: Session,
    id: ThreadId,
    os_id: u32,
    trace: OnceCell<Arc<StackTrace>>,
}

impl Thread
{
    pub(crate) fn new(session: Session, info: ThreadInfo) -> Self
    {
        Self {
            session,
            id: info.id,
            os_id: info.os_id,
            trace: OnceCell::new(),
        }
    }

    /// Engine-assigned thread id.
    pub fn id(&self) -> ThreadId
    {
        self.id
    }

    /// Operating-system thread id.
    pub fn os_id(&self) -> u32
    {
        self.os_id
    }

    /// Capture this thread's stack trace, or return the cached snapshot.
    pub fn stack_trace(&self) -> Result<Arc<StackTrace>>
    {
        self.trace
            .get_or_try_init(|| StackTrace::capture(&self.session, self.id).map(Arc::new))
            .cloned()
    }

    /// Discard the cached snapshot and unwind again.
    pub fn refresh_stack_trace(&mut self) -> Result<Arc<StackTrace>>
    {
        self.trace.take();
        self.stack_trace()
    }

    /// Locals of the innermost frame.
    pub fn locals(&self) -> Result<VariableCollection>
    {
        let trace = self.stack_trace()?;
        trace.current_frame().locals().cloned()
    }
}

/// Immutable, ordered snapshot of a thread's call stack.
///
/// Frames run callee-to-caller: frame 0 is where the thread is stopped.
pub struct StackTrace
{
    frames: Vec<StackFrame>,
}

impl StackTrace
{
    /// Unwind a thread's stack from its current register context.
    ///
    /// ## Errors
    ///
    /// `StackUnwindLimitExceeded` when the unwinder produces more than
    /// [`MAX_UNWIND_DEPTH`] frames, which indicates a corrupted stack.
    pub(crate) fn capture(session: &Session, thread_id: ThreadId) -> Result<Self>
    {
        let provider = session.provider();
        let mut context = provider.thread_context(thread_id)?;
        let mut frames = Vec::new();

        loop {
            if frames.len() >= MAX_UNWIND_DEPTH {
                return Err(OcularError::StackUnwindLimitExceeded { limit: MAX_UNWIND_DEPTH });
            }
            let function = provider.function_at(context.pc)?;
            trace!(pc = %context.pc, depth = frames.len(), "unwind step");
            frames.push(StackFrame::new(session.clone(), thread_id, context, function));
            match provider.unwind_frame(thread_id, &context)? {
                Some(caller) => context = caller,
                None => break,
            }
        }

        debug!(thread = %thread_id, frames = frames.len(), "captured stack trace");
        Ok(Self { frames })
    }

    /// All frames, callee-to-caller.
    pub fn frames(&self) -> &[StackFrame]
    {
        &self.frames
    }

    /// The innermost frame (where the thread is stopped).
    pub fn current_frame(&self) -> &StackFrame
    {
        &self.frames[0]
    }

    /// Number of frames.
    pub fn len(&self) -> usize
    {
        self.frames.len()
    }

    /// A trace always has at least the innermost frame.
    pub fn is_empty(&self) -> bool
    {
        self.frames.is_empty()
    }
}

/// One frame of a captured stack trace.
pub struct StackFrame
{
    session: Session,
    thread_id: ThreadId,
    context: FrameContext,
    function: Option<FunctionInfo>,
    locals: OnceCell<VariableCollection>,
}

impl StackFrame
{
    fn new(
        session: Session,
        thread_id: ThreadId,
        context: FrameContext,
        function: Option<FunctionInfo>,
    ) -> Self
    {
        Self {
            session,
            thread_id,
            context,
            function,
            locals: OnceCell::new(),
        }
    }

    /// Instruction pointer.
    pub fn pc(&self) -> Address
    {
        self.context.pc
    }

    /// Stack pointer.
    pub fn sp(&self) -> Address
    {
        self.context.sp
    }

    /// Frame pointer.
    pub fn fp(&self) -> Address
    {
        self.context.fp
    }

    /// Name of the function this frame executes, when symbols know it.
    pub fn function_name(&self) -> Option<&str>
    {
        self.function.as_ref().map(|function| function.name.as_str())
    }

    /// Byte displacement of the pc from the function start.
    pub fn displacement(&self) -> Option<u64>
    {
        self.function
            .as_ref()
            .map(|function| self.context.pc.value().wrapping_sub(function.start.value()))
    }

    /// Source file and line, when line-number metadata exists.
    pub fn source_location(&self) -> Option<&SourceLocation>
    {
        self.function.as_ref().and_then(|function| function.location.as_ref())
    }

    /// Locals and arguments valid at this frame's pc.
    ///
    /// Materialized lazily on first access. Resolution runs inside a
    /// scoped switch to the owning thread because register and
    /// frame-relative locations read from the current thread context.
    pub fn locals(&self) -> Result<&VariableCollection>
    {
        self.locals.get_or_try_init(|| self.materialize_locals())
    }

    fn materialize_locals(&self) -> Result<VariableCollection>
    {
        let guard = self.session.switch_thread(self.thread_id)?;
        let infos = self.session.provider().locals_at(self.context.pc)?;

        let mut collection = VariableCollection::new();
        for info in infos {
            let code_type = self.session.resolve_type(&info.ty.module, &info.ty.name)?;
            let variable = match info.location {
                LocalLocation::Absolute(address) => {
                    Variable::with_name(&self.session, code_type, address, &info.name)
                }
                LocalLocation::FrameOffset(offset) => {
                    Variable::with_name(&self.session, code_type, self.context.fp.offset(offset), &info.name)
                }
                LocalLocation::Register(register) => {
                    let value = self.session.provider().read_register(register)?;
                    Variable::from_value(&self.session, code_type, value, &info.name)
                }
            };
            collection.push(variable);
        }
        drop(guard);
        Ok(collection)
    }
}

impl std::fmt::Debug for StackFrame
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("StackFrame")
            .field("pc", &self.context.pc)
            .field("sp", &self.context.sp)
            .field("fp", &self.context.fp)
            .field("function", &self.function_name())
            .finish()
    }
}

impl std::fmt::Display for StackFrame
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        match (&self.function, self.displacement()) {
            (Some(function), Some(displacement)) => {
                write!(f, "{}+0x{displacement:x}", function.name)
            }
            _ => write!(f, "{}", self.context.pc),
        }
    }
}
