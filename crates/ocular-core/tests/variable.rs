//! Tests for the typed variable model

mod common;

use common::{field, install_primitives, pointer, structure, FixtureProvider, SharedMemory, MODULE};
use ocular_core::{OcularError, Session, Variable, VariableStorage};

const OBJ: u64 = 0x1000;
const PTR: u64 = 0x2000;

fn session_with(setup: impl FnOnce(&mut FixtureProvider)) -> (Session, SharedMemory)
{
    let mut provider = FixtureProvider::new();
    install_primitives(&mut provider);
    setup(&mut provider);
    let memory = provider.memory();
    (Session::new(provider), memory)
}

fn point_fixture() -> (Session, SharedMemory)
{
    session_with(|provider| {
        provider.add_type("Point", structure("Point", 8, vec![
            field("x", 0, "int"),
            field("y", 4, "int"),
        ]));
        provider.add_type("Point*", pointer("Point*", "Point"));
        provider.add_symbol("origin", OBJ, "Point");
        provider.write_u32(OBJ, 3);
        provider.write_u32(OBJ + 4, 7);
    })
}

#[test]
fn test_global_variable_resolves_name_and_address()
{
    let (session, _) = point_fixture();

    let origin = session.global_variable(MODULE, "origin").unwrap();
    assert_eq!(origin.name(), "origin");
    assert_eq!(origin.address().map(|a| a.value()), Some(OBJ));
    assert_eq!(origin.code_type().name(), "Point");
}

#[test]
fn test_field_access_reads_target_bytes()
{
    let (session, _) = point_fixture();

    let origin = session.global_variable(MODULE, "origin").unwrap();
    assert_eq!(origin.get_field("x").unwrap().to_i64().unwrap(), 3);
    assert_eq!(origin.get_field("y").unwrap().to_i64().unwrap(), 7);
    assert_eq!(origin.get_field("x").unwrap().name(), "x");
}

#[test]
fn test_missing_field_is_no_such_field()
{
    let (session, _) = point_fixture();

    let origin = session.global_variable(MODULE, "origin").unwrap();
    match origin.get_field("z") {
        Err(OcularError::NoSuchField { type_name, field }) => {
            assert!(type_name.contains("Point"));
            assert_eq!(field, "z");
        }
        other => panic!("Expected NoSuchField, got {other:?}"),
    }
}

#[test]
fn test_scalar_reads_refetch_from_live_target()
{
    // No byte caching: the same Variable observes target mutations.
    let (session, memory) = point_fixture();

    let x = session.global_variable(MODULE, "origin").unwrap().get_field("x").unwrap();
    assert_eq!(x.to_i64().unwrap(), 3);

    memory.write_u32(OBJ, 42);
    assert_eq!(x.to_i64().unwrap(), 42);
}

#[test]
fn test_pointer_field_access_targets_pointee()
{
    let (session, _) = session_with(|provider| {
        provider.add_type("Point", structure("Point", 8, vec![
            field("x", 0, "int"),
            field("y", 4, "int"),
        ]));
        provider.add_type("Point*", pointer("Point*", "Point"));
        provider.add_symbol("point_ptr", PTR, "Point*");
        provider.write_u64(PTR, OBJ);
        provider.write_u32(OBJ, 11);
        provider.write_u32(OBJ + 4, 22);
    });

    let pointer_var = session.global_variable(MODULE, "point_ptr").unwrap();
    assert_eq!(pointer_var.get_pointer_address().unwrap().value(), OBJ);
    // Member access through the pointer lands on the pointee.
    assert_eq!(pointer_var.get_field("y").unwrap().to_i64().unwrap(), 22);
}

#[test]
fn test_null_pointer_field_access_fails()
{
    let (session, _) = session_with(|provider| {
        provider.add_type("Point", structure("Point", 8, vec![field("x", 0, "int")]));
        provider.add_type("Point*", pointer("Point*", "Point"));
        provider.add_symbol("null_ptr", PTR, "Point*");
        provider.write_u64(PTR, 0);
    });

    let null_ptr = session.global_variable(MODULE, "null_ptr").unwrap();
    assert!(null_ptr.is_null_pointer().unwrap());
    assert!(matches!(
        null_ptr.get_field("x"),
        Err(OcularError::NullPointerDereference { .. })
    ));
    assert!(matches!(
        null_ptr.dereference_pointer(),
        Err(OcularError::NullPointerDereference { .. })
    ));
}

#[test]
fn test_dereference_is_element_zero()
{
    let (session, _) = session_with(|provider| {
        provider.add_type("int*", pointer("int*", "int"));
        provider.add_symbol("p", PTR, "int*");
        provider.write_u64(PTR, OBJ);
        provider.write_u32(OBJ, 5);
        provider.write_u32(OBJ + 4, 6);
    });

    let p = session.global_variable(MODULE, "p").unwrap();
    let deref = p.dereference_pointer().unwrap();
    assert_eq!(deref.to_i64().unwrap(), 5);
    assert_eq!(deref.name(), "<computed>");
    assert_eq!(p.get_array_element(1).unwrap().to_i64().unwrap(), 6);
}

#[test]
fn test_repeated_dereference_is_stable_while_target_is_stopped()
{
    let (session, _) = session_with(|provider| {
        provider.add_type("Point", structure("Point", 8, vec![
            field("x", 0, "int"),
            field("y", 4, "int"),
        ]));
        provider.add_type("Point*", pointer("Point*", "Point"));
        provider.add_symbol("point_ptr", PTR, "Point*");
        provider.write_u64(PTR, OBJ);
        provider.write_u32(OBJ, 11);
        provider.write_u32(OBJ + 4, 22);
    });

    let pointer_var = session.global_variable(MODULE, "point_ptr").unwrap();
    let first = pointer_var.dereference_pointer().unwrap();
    let second = pointer_var.dereference_pointer().unwrap();

    // Same interned type instance and the same decoded bytes both times.
    assert!(std::sync::Arc::ptr_eq(first.code_type(), second.code_type()));
    assert_eq!(first.address(), second.address());
    assert_eq!(
        first.get_field("x").unwrap().to_i64().unwrap(),
        second.get_field("x").unwrap().to_i64().unwrap()
    );
    assert_eq!(
        first.get_field("y").unwrap().to_i64().unwrap(),
        second.get_field("y").unwrap().to_i64().unwrap()
    );
}

#[test]
fn test_pointer_reads_use_target_word_size()
{
    // Some engines report pointer types without a size. The read must use
    // the provider's word size, not the metadata size.
    let (session, _) = session_with(|provider| {
        provider.add_type("int*", {
            let mut layout = pointer("int*", "int");
            layout.size = 0;
            layout
        });
        provider.add_symbol("p", PTR, "int*");
        provider.write_u64(PTR, 0x1_2345_6000);
        provider.write_u32(0x1_2345_6000, 77);
    });

    let p = session.global_variable(MODULE, "p").unwrap();
    assert_eq!(p.get_pointer_address().unwrap().value(), 0x1_2345_6000);
    assert_eq!(p.dereference_pointer().unwrap().to_i64().unwrap(), 77);
}

#[test]
fn test_field_with_unresolvable_type_surfaces_resolution_error()
{
    let (session, _) = session_with(|provider| {
        provider.add_type("Point", structure("Point", 8, vec![field("x", 0, "ghost")]));
        provider.add_symbol("origin", OBJ, "Point");
        provider.write_u32(OBJ, 3);
    });

    let origin = session.global_variable(MODULE, "origin").unwrap();
    match origin.get_field("x") {
        Err(OcularError::SymbolNotFound { name, .. }) => assert_eq!(name, "ghost"),
        other => panic!("Expected SymbolNotFound for the field's type, got {other:?}"),
    }
}

#[test]
fn test_array_indexing_is_bounds_checked()
{
    let (session, _) = session_with(|provider| {
        provider.add_type("int[4]", common::array("int[4]", "int", 16));
        provider.add_symbol("values", OBJ, "int[4]");
        for index in 0..4u32 {
            provider.write_u32(OBJ + u64::from(index) * 4, index * 10);
        }
    });

    let values = session.global_variable(MODULE, "values").unwrap();
    assert_eq!(values.get_array_length().unwrap(), 4);
    assert_eq!(values.get_array_element(3).unwrap().to_i64().unwrap(), 30);
    match values.get_array_element(4) {
        Err(OcularError::IndexOutOfRange { index, length }) => {
            assert_eq!(index, 4);
            assert_eq!(length, 4);
        }
        other => panic!("Expected IndexOutOfRange, got {other:?}"),
    }
}

#[test]
fn test_cast_between_object_and_pointer_views()
{
    let (session, _) = point_fixture();

    let origin = session.global_variable(MODULE, "origin").unwrap();

    // Object to pointer: the address becomes the pointer value.
    let as_ptr = origin.cast_as("Point*").unwrap();
    assert_eq!(as_ptr.storage(), VariableStorage::Value(OBJ));
    assert_eq!(as_ptr.get_pointer_address().unwrap().value(), OBJ);

    // Pointer back to object: the view returns to the pointee.
    let back = as_ptr.cast_as("Point").unwrap();
    assert_eq!(back.storage(), VariableStorage::Memory(origin.address().unwrap()));
    assert_eq!(back.get_field("x").unwrap().to_i64().unwrap(), 3);
}

#[test]
fn test_cast_composition_matches_direct_cast()
{
    let (session, _) = session_with(|provider| {
        provider.add_type("Point", structure("Point", 8, vec![
            field("x", 0, "int"),
            field("y", 4, "int"),
        ]));
        provider.add_type("Pair", structure("Pair", 8, vec![
            field("first", 0, "int"),
            field("second", 4, "int"),
        ]));
        provider.add_symbol("origin", OBJ, "Point");
        provider.write_u32(OBJ, 1);
        provider.write_u32(OBJ + 4, 2);
    });

    let origin = session.global_variable(MODULE, "origin").unwrap();
    let via_pair = origin.cast_as("Pair").unwrap().cast_as("Point").unwrap();
    let direct = origin.cast_as("Point").unwrap();
    assert_eq!(via_pair.storage(), direct.storage());
    assert!(std::sync::Arc::ptr_eq(via_pair.code_type(), direct.code_type()));
}

#[test]
fn test_adjust_pointer_displaces_by_bytes()
{
    let (session, _) = session_with(|provider| {
        provider.add_type("int*", pointer("int*", "int"));
        provider.add_symbol("p", PTR, "int*");
        provider.write_u64(PTR, OBJ + 8);
        provider.write_u32(OBJ, 100);
        provider.write_u32(OBJ + 8, 200);
    });

    let p = session.global_variable(MODULE, "p").unwrap();
    let rewound = p.adjust_pointer(-8).unwrap();
    assert_eq!(rewound.dereference_pointer().unwrap().to_i64().unwrap(), 100);
    // The original is untouched.
    assert_eq!(p.dereference_pointer().unwrap().to_i64().unwrap(), 200);
}

#[test]
fn test_base_class_view_is_offset_and_retype()
{
    let (session, _) = session_with(|provider| {
        provider.add_type("Base", structure("Base", 8, vec![field("id", 0, "int")]));
        provider.add_type("Derived", {
            let mut layout = structure("Derived", 16, vec![field("value", 8, "int")]);
            layout.bases.push(ocular_core::BaseMetadata {
                name: "Base".to_string(),
                offset: 0,
                ty: ocular_core::TypeRef::new(MODULE, "Base"),
            });
            layout
        });
        provider.add_symbol("derived", OBJ, "Derived");
        provider.write_u32(OBJ, 3);
        provider.write_u32(OBJ + 8, 4);
    });

    let derived = session.global_variable(MODULE, "derived").unwrap();
    let base = derived.get_base_class("Base").unwrap();
    assert_eq!(base.code_type().name(), "Base");
    assert_eq!(base.get_field("id").unwrap().to_i64().unwrap(), 3);
    // The inherited field is also reachable directly.
    assert_eq!(derived.get_field("id").unwrap().to_i64().unwrap(), 3);
    assert_eq!(derived.get_field("value").unwrap().to_i64().unwrap(), 4);
}

#[test]
fn test_signed_decoding_sign_extends()
{
    let (session, _) = session_with(|provider| {
        provider.add_symbol("minus_two", OBJ, "int");
        provider.write_u32(OBJ, (-2i32) as u32);
    });

    let minus_two = session.global_variable(MODULE, "minus_two").unwrap();
    assert_eq!(minus_two.to_i64().unwrap(), -2);
    assert_eq!(minus_two.to_u64().unwrap(), 0xffff_fffe);
}

#[test]
fn test_float_decoding_by_declared_size()
{
    let (session, _) = session_with(|provider| {
        provider.add_symbol("pi32", OBJ, "float");
        provider.add_symbol("pi64", OBJ + 8, "double");
        provider.write_u32(OBJ, 3.5f32.to_bits());
        provider.write_u64(OBJ + 8, 3.5f64.to_bits());
    });

    let pi32 = session.global_variable(MODULE, "pi32").unwrap();
    let pi64 = session.global_variable(MODULE, "pi64").unwrap();
    assert_eq!(pi32.to_f64().unwrap(), 3.5);
    assert_eq!(pi64.to_f64().unwrap(), 3.5);
}

#[test]
fn test_display_renders_by_type_shape()
{
    let (session, _) = session_with(|provider| {
        provider.add_type("Point", structure("Point", 8, vec![field("x", 0, "int")]));
        provider.add_type("Point*", pointer("Point*", "Point"));
        provider.add_type("char*", pointer("char*", "char"));
        provider.add_symbol("count", OBJ, "int");
        provider.add_symbol("origin", OBJ + 8, "Point");
        provider.add_symbol("origin_ptr", OBJ + 16, "Point*");
        provider.add_symbol("null_ptr", OBJ + 24, "Point*");
        provider.add_symbol("greeting", OBJ + 32, "char*");
        provider.write_u32(OBJ, (-7i32) as u32);
        provider.write_u32(OBJ + 8, 0);
        provider.write_u64(OBJ + 16, 0x1234);
        provider.write_u64(OBJ + 24, 0);
        provider.write_u64(OBJ + 32, 0x5000);
        provider.write_bytes(0x5000, b"hello\0");
    });

    let display = |name: &str| {
        session
            .global_variable(MODULE, name)
            .unwrap()
            .to_display_string()
            .unwrap()
    };

    assert_eq!(display("count"), "-7");
    assert_eq!(display("origin"), "{Point}");
    assert_eq!(display("origin_ptr"), "0x1234");
    assert_eq!(display("null_ptr"), "(null)");
    assert_eq!(display("greeting"), "hello");
}

#[test]
fn test_wide_character_pointer_display()
{
    let (session, _) = session_with(|provider| {
        provider.add_type("wchar_t*", pointer("wchar_t*", "wchar_t"));
        provider.add_symbol("greeting", PTR, "wchar_t*");
        provider.write_u64(PTR, 0x5000);
        let units: Vec<u16> = "wide".encode_utf16().chain(std::iter::once(0)).collect();
        provider.write_wide(0x5000, &units);
    });

    let greeting = session.global_variable(MODULE, "greeting").unwrap();
    assert_eq!(greeting.to_display_string().unwrap(), "wide");
}

#[test]
fn test_value_backed_variable_has_no_address()
{
    let (session, _) = point_fixture();
    let int_type = session.resolve_type(MODULE, "int").unwrap();
    let value = Variable::from_value(&session, int_type, 9, "reg_local");

    assert_eq!(value.address(), None);
    assert_eq!(value.to_u64().unwrap(), 9);
    assert_eq!(value.name(), "reg_local");
}

#[test]
fn test_static_field_reads_fixed_address()
{
    const STATIC_ADDR: u64 = 0x9000;

    let (session, _) = session_with(|provider| {
        provider.add_type("Counter", {
            let mut layout = structure("Counter", 4, vec![field("value", 0, "int")]);
            layout.fields.push(common::static_field("instances", STATIC_ADDR, "int"));
            layout
        });
        provider.add_symbol("counter", OBJ, "Counter");
        provider.write_u32(OBJ, 1);
        provider.write_u32(STATIC_ADDR, 42);
    });

    let counter = session.global_variable(MODULE, "counter").unwrap();
    let instances = counter.get_field("instances").unwrap();
    // Statics live at a fixed address, independent of the instance.
    assert_eq!(instances.address().map(|a| a.value()), Some(STATIC_ADDR));
    assert_eq!(instances.to_i64().unwrap(), 42);
}

#[test]
fn test_unmapped_read_is_memory_read_error()
{
    let (session, _) = session_with(|provider| {
        provider.add_symbol("ghost", 0xdead_0000, "int");
    });

    let ghost = session.global_variable(MODULE, "ghost").unwrap();
    assert!(matches!(
        ghost.read_data(),
        Err(OcularError::MemoryReadError { .. })
    ));
}
