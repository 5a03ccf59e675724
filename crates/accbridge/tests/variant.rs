//! Tests for the VARIANT codec

use std::ffi::c_void;
use std::ptr;

use accbridge::bstr;
use accbridge::variant::*;
use accbridge::{AccessibleObject, DISP_E_BADVARTYPE, Error, GUID, ObjectRef, ScopedVariant, Value};

fn round_trip(value: Value) -> Value {
    let variant = ScopedVariant::new(value).expect("encode");
    variant.decode().expect("decode")
}

// =============================================================================
// Test: 64-bit integers keep both halves
// =============================================================================

#[test]
fn test_i8_minus_one_sets_both_halves() {
    let variant = ScopedVariant::new(Value::I8(-1)).unwrap();
    assert_eq!(variant.get().vt, VT_I8);
    assert_eq!(unsafe { variant.get().data.halves }, [0xFFFF_FFFF, 0xFFFF_FFFF]);
    assert_eq!(variant.decode(), Ok(Value::I8(-1)));
}

#[test]
fn test_u8_high_bits_survive() {
    assert_eq!(round_trip(Value::U8(u64::MAX - 1)), Value::U8(u64::MAX - 1));
    assert_eq!(round_trip(Value::I8(i64::MIN)), Value::I8(i64::MIN));
}

#[test]
fn test_currency_and_filetime_use_wide_payload() {
    let cy = Currency::from_units(-3, -2500);
    assert_eq!(round_trip(Value::Currency(cy)), Value::Currency(cy));
    assert_eq!(round_trip(Value::FileTime(FileTime(1 << 40))), Value::FileTime(FileTime(1 << 40)));
}

// =============================================================================
// Test: scalars and strings
// =============================================================================

#[test]
fn test_bool_uses_variant_true() {
    let variant = ScopedVariant::new(Value::Bool(true)).unwrap();
    assert_eq!(unsafe { variant.get().data.bool_val }, VARIANT_TRUE);
    assert_eq!(variant.decode(), Ok(Value::Bool(true)));
    assert_eq!(round_trip(Value::Bool(false)), Value::Bool(false));
}

#[test]
fn test_small_integers_keep_their_kind() {
    assert_eq!(round_trip(Value::I1(-7)), Value::I1(-7));
    assert_eq!(round_trip(Value::U2(65535)), Value::U2(65535));
    assert_eq!(round_trip(Value::Int(-4)), Value::Int(-4));
    assert_eq!(round_trip(Value::UInt(4)), Value::UInt(4));
}

#[test]
fn test_string_round_trip() {
    assert_eq!(round_trip(Value::String("Schaltfläche".into())), Value::String("Schaltfläche".into()));
    assert_eq!(round_trip(Value::String(String::new())), Value::String(String::new()));
}

#[test]
fn test_decimal_round_trip() {
    let d = Decimal {
        mantissa: (1u128 << 90) + 17,
        scale: 4,
        negative: true,
    };
    let variant = ScopedVariant::new(Value::Decimal(d)).unwrap();
    assert_eq!(variant.get().vt, VT_DECIMAL);
    assert_eq!(variant.decode(), Ok(Value::Decimal(d)));
}

#[test]
fn test_error_and_empty() {
    assert_eq!(round_trip(Value::Error(accbridge::DISP_E_PARAMNOTFOUND)), Value::Error(accbridge::DISP_E_PARAMNOTFOUND));
    assert_eq!(round_trip(Value::Empty), Value::Empty);
    assert_eq!(round_trip(Value::Null), Value::Null);
}

// =============================================================================
// Test: by-reference payloads
// =============================================================================

#[test]
fn test_byref_i4_reads_through_pointer() {
    let mut target = 42i32;
    let mut variant = VARIANT::empty();
    variant.vt = VT_BYREF | VT_I4;
    variant.data.ptr = (&mut target as *mut i32).cast::<c_void>();
    assert_eq!(variant.decode(), Ok(Value::I4(42)));
}

#[test]
fn test_byref_bstr() {
    let mut text = bstr::alloc("by ref");
    let mut variant = VARIANT::empty();
    variant.vt = VT_BYREF | VT_BSTR;
    variant.data.ptr = (&mut text as *mut bstr::BSTR).cast::<c_void>();
    assert_eq!(variant.decode(), Ok(Value::String("by ref".into())));
    unsafe { bstr::free(text) };
}

#[test]
fn test_byref_variant_unwraps_once() {
    let mut inner = VARIANT::from_i4(9);
    let mut outer = VARIANT::empty();
    outer.vt = VT_BYREF | VT_VARIANT;
    outer.data.ptr = (&mut inner as *mut VARIANT).cast::<c_void>();
    assert_eq!(outer.decode(), Ok(Value::I4(9)));
}

#[test]
fn test_null_byref_is_malformed() {
    let mut variant = VARIANT::empty();
    variant.vt = VT_BYREF | VT_I4;
    variant.data.ptr = ptr::null_mut();
    assert!(matches!(variant.decode(), Err(Error::InvalidVariant { .. })));
}

#[test]
fn test_clsid_decodes_but_does_not_encode() {
    let mut guid = GUID::from_u128(0x618736E0_3C3D_11CF_810C_00AA00389B71);
    let mut variant = VARIANT::empty();
    variant.vt = VT_CLSID;
    variant.data.ptr = (&mut guid as *mut GUID).cast::<c_void>();
    assert_eq!(variant.decode(), Ok(Value::Guid(guid)));
    assert_eq!(
        VARIANT::encode(Value::Guid(guid)).unwrap_err(),
        Error::UnsupportedVariant { vt: VT_CLSID }
    );
}

// =============================================================================
// Test: unsupported kinds
// =============================================================================

#[test]
fn test_floating_point_is_unsupported() {
    let mut variant = VARIANT::empty();
    variant.vt = VT_R8;
    let error = variant.decode().unwrap_err();
    assert_eq!(error, Error::UnsupportedVariant { vt: VT_R8 });
    assert_eq!(error.hresult(), DISP_E_BADVARTYPE);
}

#[test]
fn test_arrays_are_unsupported() {
    let mut variant = VARIANT::empty();
    variant.vt = VT_ARRAY | VT_I4;
    assert!(matches!(variant.decode(), Err(Error::UnsupportedVariant { .. })));
}

// =============================================================================
// Test: objects
// =============================================================================

#[test]
fn test_dispatch_round_trip_preserves_identity() {
    let object = AccessibleObject::new(Box::new(accbridge::accessible::SystemBehavior));
    let handle: ObjectRef = object.as_object_ref();

    let variant = ScopedVariant::new(Value::Dispatch(Some(handle.clone()))).unwrap();
    assert_eq!(variant.get().vt, VT_DISPATCH);
    assert!(variant.get().as_object().is_some());
    assert_eq!(variant.decode(), Ok(Value::Dispatch(Some(handle))));
}

#[test]
fn test_null_dispatch_round_trip() {
    assert_eq!(round_trip(Value::Dispatch(None)), Value::Dispatch(None));
}

#[test]
fn test_clear_is_idempotent() {
    let mut variant = VARIANT::encode(Value::String("once".into())).unwrap();
    unsafe {
        variant.clear();
        variant.clear();
    }
    assert!(variant.is_empty());
}
