//! Scripted in-memory engine for integration tests.
//!
//! `FixtureProvider` implements the full provider surface against tables
//! populated by the test: a byte-addressable memory map, type layouts,
//! symbols, threads with unwind chains, locals, and a managed heap. Tests
//! build the target state they need and drive the object model against it.

// Each test binary uses its own subset of the fixture surface.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};

use ocular_core::{
    Address, BaseMetadata, FieldMetadata, FieldPlacement, FrameContext, FunctionInfo, LocalInfo,
    ManagedProvider, ModuleInfo, OcularError, PrimitiveKind, Provider, Result, ThreadId,
    ThreadInfo, TypeKind, TypeMetadata, TypeRef,
};

/// Default module every fixture starts with.
pub const MODULE: &str = "app";

static TRACING: Once = Once::new();

/// Route object-model tracing through the real subscriber, once per test
/// binary. Warn level keeps passing runs quiet while still surfacing
/// failed thread restores.
fn init_tracing()
{
    TRACING.call_once(|| {
        let _ = ocular_utils::init_logging_with_level(ocular_utils::LogLevel::Warn, ocular_utils::LogFormat::Pretty);
    });
}

/// Byte-addressable target memory, shared between the provider and the
/// test so bytes can change after the session takes ownership.
#[derive(Clone, Default)]
pub struct SharedMemory(Arc<Mutex<HashMap<u64, u8>>>);

impl SharedMemory
{
    pub fn write_bytes(&self, address: u64, bytes: &[u8])
    {
        let mut map = self.0.lock().unwrap();
        for (index, byte) in bytes.iter().enumerate() {
            map.insert(address + index as u64, *byte);
        }
    }

    pub fn write_u16(&self, address: u64, value: u16)
    {
        self.write_bytes(address, &value.to_le_bytes());
    }

    pub fn write_u32(&self, address: u64, value: u32)
    {
        self.write_bytes(address, &value.to_le_bytes());
    }

    pub fn write_u64(&self, address: u64, value: u64)
    {
        self.write_bytes(address, &value.to_le_bytes());
    }

    pub fn write_wide(&self, address: u64, units: &[u16])
    {
        for (index, unit) in units.iter().enumerate() {
            self.write_u16(address + 2 * index as u64, *unit);
        }
    }

    fn read(&self, address: Address, length: usize) -> Result<Vec<u8>>
    {
        let map = self.0.lock().unwrap();
        let mut bytes = Vec::with_capacity(length);
        for index in 0..length {
            match map.get(&(address.value() + index as u64)) {
                Some(byte) => bytes.push(*byte),
                None => {
                    return Err(OcularError::MemoryReadError {
                        address,
                        length,
                        reason: "unmapped".to_string(),
                    })
                }
            }
        }
        Ok(bytes)
    }
}

pub struct FixtureProvider
{
    memory: SharedMemory,
    types: HashMap<(String, String), Vec<TypeMetadata>>,
    symbols: HashMap<(String, String), (Address, TypeRef)>,
    modules: Vec<ModuleInfo>,
    threads: Vec<ThreadInfo>,
    current: Mutex<ThreadId>,
    /// Full frame chain per thread, innermost first.
    chains: HashMap<ThreadId, Vec<FrameContext>>,
    /// When set, unwinding never terminates (every frame has a caller).
    endless_unwind: bool,
    functions: Vec<(Address, u64, FunctionInfo)>,
    locals: HashMap<u64, Vec<LocalInfo>>,
    registers: HashMap<u16, u64>,
    /// Every thread id ever passed to `set_current_thread`, in order.
    switch_log: Arc<Mutex<Vec<ThreadId>>>,
    heap_objects: Vec<(Address, TypeRef)>,
    generations: Vec<u64>,
    walkable: bool,
}

impl FixtureProvider
{
    pub fn new() -> Self
    {
        init_tracing();
        let main_thread = ThreadId(1);
        Self {
            memory: SharedMemory::default(),
            types: HashMap::new(),
            symbols: HashMap::new(),
            modules: vec![ModuleInfo {
                name: MODULE.to_string(),
                base: Address::new(0x0040_0000),
                size: 0x10_0000,
            }],
            threads: vec![ThreadInfo { id: main_thread, os_id: 1001 }],
            current: Mutex::new(main_thread),
            chains: HashMap::new(),
            endless_unwind: false,
            functions: Vec::new(),
            locals: HashMap::new(),
            registers: HashMap::new(),
            switch_log: Arc::new(Mutex::new(Vec::new())),
            heap_objects: Vec::new(),
            generations: Vec::new(),
            walkable: true,
        }
    }

    /// Handle onto the target memory, usable after the session owns the
    /// provider.
    pub fn memory(&self) -> SharedMemory
    {
        self.memory.clone()
    }

    /// Handle onto the thread-switch log, usable after the session owns
    /// the provider.
    pub fn switch_log(&self) -> Arc<Mutex<Vec<ThreadId>>>
    {
        Arc::clone(&self.switch_log)
    }

    pub fn write_bytes(&self, address: u64, bytes: &[u8])
    {
        self.memory.write_bytes(address, bytes);
    }

    pub fn write_u16(&self, address: u64, value: u16)
    {
        self.memory.write_u16(address, value);
    }

    pub fn write_u32(&self, address: u64, value: u32)
    {
        self.memory.write_u32(address, value);
    }

    pub fn write_u64(&self, address: u64, value: u64)
    {
        self.memory.write_u64(address, value);
    }

    pub fn write_wide(&self, address: u64, units: &[u16])
    {
        self.memory.write_wide(address, units);
    }

    pub fn add_type(&mut self, name: &str, metadata: TypeMetadata)
    {
        self.types
            .entry((MODULE.to_string(), name.to_string()))
            .or_default()
            .push(metadata);
    }

    pub fn add_symbol(&mut self, name: &str, address: u64, type_name: &str)
    {
        self.symbols.insert(
            (MODULE.to_string(), name.to_string()),
            (Address::new(address), TypeRef::new(MODULE, type_name)),
        );
    }

    pub fn add_thread(&mut self, id: u32, os_id: u32)
    {
        self.threads.push(ThreadInfo { id: ThreadId(id), os_id });
    }

    pub fn set_chain(&mut self, thread: u32, chain: Vec<FrameContext>)
    {
        self.chains.insert(ThreadId(thread), chain);
    }

    pub fn set_endless_unwind(&mut self)
    {
        self.endless_unwind = true;
    }

    pub fn add_function(&mut self, name: &str, start: u64, length: u64)
    {
        self.functions.push((
            Address::new(start),
            length,
            FunctionInfo {
                name: name.to_string(),
                start: Address::new(start),
                location: None,
            },
        ));
    }

    pub fn set_locals(&mut self, pc: u64, locals: Vec<LocalInfo>)
    {
        self.locals.insert(pc, locals);
    }

    pub fn set_register(&mut self, register: u16, value: u64)
    {
        self.registers.insert(register, value);
    }

    pub fn add_heap_object(&mut self, address: u64, type_name: &str)
    {
        self.heap_objects
            .push((Address::new(address), TypeRef::new(MODULE, type_name)));
    }

    pub fn set_generations(&mut self, generations: Vec<u64>)
    {
        self.generations = generations;
    }

    pub fn set_walkable(&mut self, walkable: bool)
    {
        self.walkable = walkable;
    }
}

impl Provider for FixtureProvider
{
    fn read_memory(&self, address: Address, length: usize) -> Result<Vec<u8>>
    {
        self.memory.read(address, length)
    }

    fn resolve_type(&self, module: &str, name: &str) -> Result<Vec<TypeMetadata>>
    {
        Ok(self
            .types
            .get(&(module.to_string(), name.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn resolve_symbol(&self, module: &str, name: &str) -> Result<Option<(Address, TypeRef)>>
    {
        Ok(self.symbols.get(&(module.to_string(), name.to_string())).cloned())
    }

    fn enumerate_modules(&self) -> Result<Vec<ModuleInfo>>
    {
        Ok(self.modules.clone())
    }

    fn pointer_size(&self) -> u64
    {
        8
    }

    fn threads(&self) -> Result<Vec<ThreadInfo>>
    {
        Ok(self.threads.clone())
    }

    fn current_thread(&self) -> Result<ThreadId>
    {
        Ok(*self.current.lock().unwrap())
    }

    fn set_current_thread(&self, thread: ThreadId) -> Result<ThreadId>
    {
        if !self.threads.iter().any(|info| info.id == thread) {
            return Err(OcularError::InvalidArgument(format!("no thread {thread}")));
        }
        self.switch_log.lock().unwrap().push(thread);
        let mut current = self.current.lock().unwrap();
        let previous = *current;
        *current = thread;
        Ok(previous)
    }

    fn thread_context(&self, thread: ThreadId) -> Result<FrameContext>
    {
        self.chains
            .get(&thread)
            .and_then(|chain| chain.first())
            .copied()
            .ok_or_else(|| OcularError::InvalidArgument(format!("no context for thread {thread}")))
    }

    fn unwind_frame(&self, thread: ThreadId, frame: &FrameContext) -> Result<Option<FrameContext>>
    {
        if self.endless_unwind {
            return Ok(Some(*frame));
        }
        let chain = self
            .chains
            .get(&thread)
            .ok_or_else(|| OcularError::InvalidArgument(format!("no chain for thread {thread}")))?;
        let position = chain.iter().position(|candidate| candidate == frame);
        Ok(position.and_then(|index| chain.get(index + 1)).copied())
    }

    fn function_at(&self, pc: Address) -> Result<Option<FunctionInfo>>
    {
        Ok(self
            .functions
            .iter()
            .find(|(start, length, _)| pc >= *start && pc.value() < start.value() + length)
            .map(|(_, _, info)| info.clone()))
    }

    fn locals_at(&self, pc: Address) -> Result<Vec<LocalInfo>>
    {
        Ok(self.locals.get(&pc.value()).cloned().unwrap_or_default())
    }

    fn read_register(&self, register: u16) -> Result<u64>
    {
        self.registers
            .get(&register)
            .copied()
            .ok_or_else(|| OcularError::InvalidArgument(format!("no register {register}")))
    }
}

impl ManagedProvider for FixtureProvider
{
    fn can_walk_heap(&self) -> bool
    {
        self.walkable
    }

    fn total_heap_size(&self) -> u64
    {
        self.generations.iter().sum()
    }

    fn generation_count(&self) -> u32
    {
        self.generations.len() as u32
    }

    fn size_by_generation(&self, generation: u32) -> Result<u64>
    {
        self.generations
            .get(generation as usize)
            .copied()
            .ok_or_else(|| OcularError::InvalidArgument(format!("no generation {generation}")))
    }

    fn enumerate_object_addresses(&self) -> Box<dyn Iterator<Item = Address> + '_>
    {
        Box::new(self.heap_objects.iter().map(|(address, _)| *address))
    }

    fn object_type(&self, address: Address) -> Result<TypeRef>
    {
        self.heap_objects
            .iter()
            .find(|(candidate, _)| *candidate == address)
            .map(|(_, type_ref)| type_ref.clone())
            .ok_or_else(|| OcularError::InvalidArgument(format!("no object at {address}")))
    }
}

// Metadata builders shared by the test files.

pub fn primitive(name: &str, size: u64, kind: PrimitiveKind) -> TypeMetadata
{
    TypeMetadata {
        name: name.to_string(),
        size,
        kind: TypeKind::Primitive(kind),
        element: None,
        fields: Vec::new(),
        bases: Vec::new(),
    }
}

pub fn pointer(name: &str, element: &str) -> TypeMetadata
{
    TypeMetadata {
        name: name.to_string(),
        size: 8,
        kind: TypeKind::Pointer,
        element: Some(TypeRef::new(MODULE, element)),
        fields: Vec::new(),
        bases: Vec::new(),
    }
}

pub fn array(name: &str, element: &str, total_size: u64) -> TypeMetadata
{
    TypeMetadata {
        name: name.to_string(),
        size: total_size,
        kind: TypeKind::Array,
        element: Some(TypeRef::new(MODULE, element)),
        fields: Vec::new(),
        bases: Vec::new(),
    }
}

pub fn structure(name: &str, size: u64, fields: Vec<FieldMetadata>) -> TypeMetadata
{
    TypeMetadata {
        name: name.to_string(),
        size,
        kind: TypeKind::Struct,
        element: None,
        fields,
        bases: Vec::new(),
    }
}

pub fn structure_with_bases(
    name: &str,
    size: u64,
    fields: Vec<FieldMetadata>,
    bases: Vec<BaseMetadata>,
) -> TypeMetadata
{
    TypeMetadata {
        name: name.to_string(),
        size,
        kind: TypeKind::Struct,
        element: None,
        fields,
        bases,
    }
}

pub fn field(name: &str, offset: u64, type_name: &str) -> FieldMetadata
{
    FieldMetadata::at_offset(name, offset, TypeRef::new(MODULE, type_name))
}

pub fn static_field(name: &str, address: u64, type_name: &str) -> FieldMetadata
{
    FieldMetadata {
        name: name.to_string(),
        placement: FieldPlacement::Static(Address::new(address)),
        ty: TypeRef::new(MODULE, type_name),
    }
}

/// Register the primitive vocabulary most fixtures need.
pub fn install_primitives(provider: &mut FixtureProvider)
{
    provider.add_type("bool", primitive("bool", 1, PrimitiveKind::Bool));
    provider.add_type("char", primitive("char", 1, PrimitiveKind::Char8));
    provider.add_type("wchar_t", primitive("wchar_t", 2, PrimitiveKind::Char16));
    provider.add_type("int", primitive("int", 4, PrimitiveKind::Signed));
    provider.add_type("unsigned int", primitive("unsigned int", 4, PrimitiveKind::Unsigned));
    provider.add_type("long long", primitive("long long", 8, PrimitiveKind::Signed));
    provider.add_type(
        "unsigned long long",
        primitive("unsigned long long", 8, PrimitiveKind::Unsigned),
    );
    provider.add_type("double", primitive("double", 8, PrimitiveKind::Float));
    provider.add_type("float", primitive("float", 4, PrimitiveKind::Float));
}
