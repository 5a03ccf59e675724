//! Tests for the COM ABI layer: declared layouts, thunks and owned scopes

use std::ffi::c_void;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use accbridge::com::{self, ComRefCount};
use accbridge::{
    ComInterface, ComScope, E_FAIL, E_NOINTERFACE, E_POINTER, Error, GUID, HRESULT, IID_IUNKNOWN,
    IUnknown, IUnknownVTable, RPC_E_DISCONNECTED, S_OK, com_interface, com_method,
    com_method_result, iunknown_thunks, write_out,
};

com_interface! {
    /// Two-operand arithmetic
    pub interface ICalculator : IUnknown (0x12345678_1234_5678_9ABC_DEF012345678) {
        fn add(a: i32, b: i32, result: *mut i32) -> HRESULT;
        fn multiply(a: i32, b: i32, result: *mut i32) -> HRESULT;
    }

    pub interface IScientific : ICalculator (0x23170F69_40C1_278A_0000_000600600000) {
        fn square(x: i32, result: *mut i32) -> HRESULT;
    }

    pub interface IFaulty : IUnknown (0x0A1B2C3D_0000_4000_8000_00000000F00D) {
        fn explode() -> HRESULT;
        fn refuse() -> HRESULT;
    }
}

// =============================================================================
// Test: declared layouts
// =============================================================================

#[test]
fn test_iid_from_literal() {
    let iid = ICalculator::IID;
    assert_eq!(iid.data1, 0x12345678);
    assert_eq!(iid.data2, 0x1234);
    assert_eq!(iid.data3, 0x5678);
    assert_eq!(iid.data4, [0x9a, 0xbc, 0xde, 0xf0, 0x12, 0x34, 0x56, 0x78]);
}

#[test]
fn test_guid_formatting() {
    assert_eq!(format!("{:?}", IScientific::IID), "{23170F69-40C1-278A-0000-000600600000}");
    assert_eq!(IScientific::IID.to_string(), "23170f69-40c1-278a-0000-000600600000");
    assert_eq!(format!("{:?}", GUID::ZERO), "{00000000-0000-0000-0000-000000000000}");
}

#[test]
fn test_slot_counts_include_bases() {
    assert_eq!(IUnknown::SLOT_COUNT, 3);
    assert_eq!(ICalculator::SLOT_COUNT, 5);
    assert_eq!(IScientific::SLOT_COUNT, 6);
}

#[test]
fn test_vtable_sizes_match_slot_counts() {
    let ptr_size = std::mem::size_of::<*const c_void>();
    assert_eq!(std::mem::size_of::<IUnknownVTable>(), 3 * ptr_size);
    assert_eq!(std::mem::size_of::<ICalculatorVTable>(), ICalculator::SLOT_COUNT * ptr_size);
    assert_eq!(std::mem::size_of::<IScientificVTable>(), IScientific::SLOT_COUNT * ptr_size);
}

#[test]
fn test_base_vtable_comes_first() {
    assert_eq!(std::mem::offset_of!(ICalculatorVTable, base), 0);
    assert_eq!(std::mem::offset_of!(IScientificVTable, base), 0);
    assert_eq!(std::mem::offset_of!(IScientificVTable, square), 5 * std::mem::size_of::<*const c_void>());
}

// =============================================================================
// A two-vtable wrapper
// =============================================================================

#[repr(C)]
struct Calculator {
    vtbl_scientific: *const IScientificVTable,
    vtbl_faulty: *const IFaultyVTable,
    ref_count: ComRefCount,
    offset: i32,
    destroyed: Arc<AtomicBool>,
}

iunknown_thunks!(Calculator);

const FAULTY: usize = std::mem::offset_of!(Calculator, vtbl_faulty);

static SCIENTIFIC_VTABLE: IScientificVTable = IScientificVTable {
    base: ICalculatorVTable {
        base: iunknown_base::<0>(),
        add: calc_add,
        multiply: calc_multiply,
    },
    square: calc_square,
};

static FAULTY_VTABLE: IFaultyVTable = IFaultyVTable {
    base: iunknown_base::<FAULTY>(),
    explode: faulty_explode,
    refuse: faulty_refuse,
};

unsafe extern "system" fn calc_add(this: *mut c_void, a: i32, b: i32, result: *mut i32) -> HRESULT {
    com_method!(this, calc: Calculator[vtbl_scientific] => {
        write_out!(result, calc.offset + a + b);
        S_OK
    })
}

unsafe extern "system" fn calc_multiply(this: *mut c_void, a: i32, b: i32, result: *mut i32) -> HRESULT {
    com_method!(this, calc: Calculator[vtbl_scientific] => {
        write_out!(result, calc.offset * a * b);
        S_OK
    })
}

unsafe extern "system" fn calc_square(this: *mut c_void, x: i32, result: *mut i32) -> HRESULT {
    com_method!(this, _calc: Calculator[vtbl_scientific] => {
        write_out!(result, x * x);
        S_OK
    })
}

unsafe extern "system" fn faulty_explode(this: *mut c_void) -> HRESULT {
    com_method!(this, _calc: Calculator[vtbl_faulty] => panic!("boom"))
}

unsafe extern "system" fn faulty_refuse(this: *mut c_void) -> HRESULT {
    com_method_result!(this, _calc: Calculator[vtbl_faulty] => Err(Error::Released))
}

impl Calculator {
    fn create(offset: i32) -> (*mut c_void, Arc<AtomicBool>) {
        let destroyed = Arc::new(AtomicBool::new(false));
        let calc = Box::new(Self {
            vtbl_scientific: &SCIENTIFIC_VTABLE,
            vtbl_faulty: &FAULTY_VTABLE,
            ref_count: ComRefCount::new(),
            offset,
            destroyed: destroyed.clone(),
        });
        (Box::into_raw(calc).cast(), destroyed)
    }

    fn query_interface(&self, riid: *const GUID, ppv: *mut *mut c_void) -> HRESULT {
        if ppv.is_null() || riid.is_null() {
            return E_POINTER;
        }
        let riid = unsafe { &*riid };
        let base = self as *const Self as *const u8;
        let slot = if *riid == IID_IUNKNOWN || *riid == ICalculator::IID || *riid == IScientific::IID {
            base
        } else if *riid == IFaulty::IID {
            unsafe { base.add(FAULTY) }
        } else {
            unsafe { *ppv = ptr::null_mut() };
            return E_NOINTERFACE;
        };
        self.ref_count.add_ref();
        unsafe { *ppv = slot as *mut c_void };
        S_OK
    }

    unsafe fn final_release(this: *mut Self) {
        let calc = unsafe { Box::from_raw(this) };
        calc.destroyed.store(true, Ordering::SeqCst);
    }
}

fn calculator(offset: i32) -> (ComScope<IScientific>, Arc<AtomicBool>) {
    let (raw, destroyed) = Calculator::create(offset);
    (unsafe { ComScope::from_raw(raw) }.unwrap(), destroyed)
}

// =============================================================================
// Test: calls through the vtable
// =============================================================================

#[test]
fn test_calls_through_vtable() {
    let (calc, _) = calculator(10);
    let mut out = 0;

    assert_eq!(unsafe { (calc.vtbl().base.add)(calc.as_raw(), 2, 3, &mut out) }, S_OK);
    assert_eq!(out, 15);
    assert_eq!(unsafe { (calc.vtbl().base.multiply)(calc.as_raw(), 2, 3, &mut out) }, S_OK);
    assert_eq!(out, 60);
    assert_eq!(unsafe { (calc.vtbl().square)(calc.as_raw(), 7, &mut out) }, S_OK);
    assert_eq!(out, 49);
}

#[test]
fn test_null_out_pointer() {
    let (calc, _) = calculator(0);
    assert_eq!(unsafe { (calc.vtbl().square)(calc.as_raw(), 2, ptr::null_mut()) }, E_POINTER);
}

#[test]
fn test_null_this() {
    let mut out = 0;
    assert_eq!(unsafe { calc_add(ptr::null_mut(), 1, 1, &mut out) }, E_POINTER);
}

#[test]
fn test_panic_becomes_e_fail() {
    let (calc, _) = calculator(0);
    let faulty = calc.cast::<IFaulty>().unwrap();
    assert_eq!(unsafe { (faulty.vtbl().explode)(faulty.as_raw()) }, E_FAIL);
    // The object survives the panic.
    let mut out = 0;
    assert_eq!(unsafe { (calc.vtbl().square)(calc.as_raw(), 3, &mut out) }, S_OK);
    assert_eq!(out, 9);
}

#[test]
fn test_result_thunk_maps_error() {
    let (calc, _) = calculator(0);
    let faulty = calc.cast::<IFaulty>().unwrap();
    assert_eq!(unsafe { (faulty.vtbl().refuse)(faulty.as_raw()) }, RPC_E_DISCONNECTED);
}

// =============================================================================
// Test: reference counting and identity
// =============================================================================

#[test]
fn test_ref_counting() {
    let (raw, destroyed) = Calculator::create(0);
    assert_eq!(unsafe { com::add_ref(raw) }, 2);
    assert_eq!(unsafe { com::release(raw) }, 1);
    assert!(!destroyed.load(Ordering::SeqCst));
    assert_eq!(unsafe { com::release(raw) }, 0);
    assert!(destroyed.load(Ordering::SeqCst));
}

#[test]
fn test_secondary_vtable_shares_count() {
    let (calc, destroyed) = calculator(0);
    let faulty = calc.cast::<IFaulty>().unwrap();
    assert_ne!(faulty.as_raw(), calc.as_raw());

    drop(calc);
    assert!(!destroyed.load(Ordering::SeqCst));
    drop(faulty);
    assert!(destroyed.load(Ordering::SeqCst));
}

#[test]
fn test_identity_across_interfaces() {
    let (calc, _) = calculator(0);
    let faulty = calc.cast::<IFaulty>().unwrap();
    assert_eq!(unsafe { com::identity(faulty.as_raw()) }, Some(calc.as_raw() as usize));
    assert!(calc.is_same_object(faulty.as_raw()));

    let (other, _) = calculator(0);
    assert!(!calc.is_same_object(other.as_raw()));
    assert_eq!(unsafe { com::identity(ptr::null_mut()) }, None);
}

#[test]
fn test_cast_to_unsupported_interface() {
    let (calc, _) = calculator(0);
    assert_eq!(calc.cast::<accbridge::IAccessible>().err(), Some(Error::Native(E_NOINTERFACE)));

    let (hr, out) = unsafe { com::query_interface(calc.as_raw(), &accbridge::IAccessible::IID) };
    assert_eq!(hr, E_NOINTERFACE);
    assert!(out.is_null());
}

#[test]
fn test_scope_clone_and_into_raw() {
    let (calc, destroyed) = calculator(0);
    let copy = calc.clone();
    drop(calc);
    assert!(!destroyed.load(Ordering::SeqCst));

    let raw = copy.into_raw();
    assert!(!destroyed.load(Ordering::SeqCst));
    let borrowed = unsafe { ComScope::<IScientific>::from_borrowed(raw) }.unwrap();
    unsafe { com::release(raw) };
    assert!(!destroyed.load(Ordering::SeqCst));
    drop(borrowed);
    assert!(destroyed.load(Ordering::SeqCst));
}

#[test]
fn test_scope_from_null() {
    assert!(unsafe { ComScope::<IScientific>::from_raw(ptr::null_mut()) }.is_none());
    assert!(unsafe { ComScope::<IScientific>::from_borrowed(ptr::null_mut()) }.is_none());
}

#[test]
fn test_try_add_ref_refuses_dead_count() {
    let count = ComRefCount::new();
    assert!(count.try_add_ref());
    assert_eq!(count.release(), 1);
    assert_eq!(count.release(), 0);
    assert!(!count.try_add_ref());
    assert_eq!(count.count(), 0);
}
