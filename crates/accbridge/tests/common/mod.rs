//! Native test doubles built from raw vtables.
//!
//! `MockAccessible` plays the system accessible object: it records every
//! child id that reaches it and counts its final release. `MockEnum` plays a
//! system `IEnumVARIANT` yielding `VT_I4 1..=total`.

#![allow(dead_code)]

use std::ffi::c_void;
use std::mem::offset_of;
use std::ptr::{self, NonNull};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use accbridge::bstr::{self, BSTR};
use accbridge::fallback::StdAccessibleFactory;
use accbridge::*;
use parking_lot::Mutex;

/// What the mock observed.
#[derive(Debug, Default)]
pub struct MockStats {
    pub released: AtomicU32,
    pub created: AtomicU32,
    pub forwarded: Mutex<Vec<i32>>,
}

impl MockStats {
    pub fn forwarded(&self) -> Vec<i32> {
        self.forwarded.lock().clone()
    }

    pub fn released(&self) -> u32 {
        self.released.load(Ordering::SeqCst)
    }
}

/// Answers of the mock system object.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub name: Option<String>,
    pub value: Option<String>,
    pub role: i32,
    pub child_count: i32,
    /// Nonzero: also answer `IOleWindow` with this handle.
    pub hwnd: usize,
}

impl MockConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }
}

// =============================================================================
// MockAccessible
// =============================================================================

#[repr(C)]
pub struct MockAccessible {
    vtbl: *const IAccessibleVTable,
    vtbl_window: *const IOleWindowVTable,
    ref_count: ComRefCount,
    config: MockConfig,
    stats: Arc<MockStats>,
}

const WINDOW: usize = offset_of!(MockAccessible, vtbl_window);

accbridge::iunknown_thunks!(MockAccessible);

impl MockAccessible {
    /// A new mock with one reference owned by the caller.
    pub fn create(config: MockConfig, stats: Arc<MockStats>) -> NonNull<c_void> {
        stats.created.fetch_add(1, Ordering::SeqCst);
        let mock = Box::new(Self {
            vtbl: &MOCK_ACCESSIBLE_VTABLE,
            vtbl_window: &MOCK_WINDOW_VTABLE,
            ref_count: ComRefCount::new(),
            config,
            stats,
        });
        NonNull::from(Box::leak(mock)).cast()
    }

    /// A mock held by an agile pointer, plus its observations.
    pub fn agile(config: MockConfig) -> (AgileComPointer<IAccessible>, Arc<MockStats>) {
        let stats = Arc::new(MockStats::default());
        let raw = Self::create(config, stats.clone());
        (unsafe { AgileComPointer::new(raw.as_ptr(), true) }, stats)
    }

    fn query_interface(&self, riid: *const GUID, ppv: *mut *mut c_void) -> HRESULT {
        if ppv.is_null() || riid.is_null() {
            return E_POINTER;
        }
        let riid = unsafe { &*riid };
        let slot: *const c_void = if *riid == IID_IUNKNOWN
            || *riid == IDispatch::IID
            || *riid == IAccessible::IID
            || *riid == IAgileObject::IID
        {
            ptr::addr_of!(self.vtbl).cast()
        } else if *riid == IOleWindow::IID && self.config.hwnd != 0 {
            ptr::addr_of!(self.vtbl_window).cast()
        } else {
            unsafe { *ppv = ptr::null_mut() };
            return E_NOINTERFACE;
        };
        self.ref_count.add_ref();
        unsafe { *ppv = slot as *mut c_void };
        S_OK
    }

    unsafe fn final_release(this: *mut Self) {
        let mock = unsafe { Box::from_raw(this) };
        mock.stats.released.fetch_add(1, Ordering::SeqCst);
    }
}

fn mock<'a>(this: *mut c_void) -> &'a MockAccessible {
    unsafe { &*(this as *const MockAccessible) }
}

fn record(this: *mut c_void, child: &VARIANT) {
    let id = child.as_i4().unwrap_or(i32::MIN);
    mock(this).stats.forwarded.lock().push(id);
}

fn write_string(out: *mut BSTR, value: Option<&str>) -> HRESULT {
    unsafe { *out = value.map_or(ptr::null_mut(), bstr::alloc) };
    S_OK
}

unsafe extern "system" fn type_info_count(_this: *mut c_void, count: *mut u32) -> HRESULT {
    unsafe { *count = 0 };
    S_OK
}

unsafe extern "system" fn type_info(_this: *mut c_void, _: u32, _: u32, info: *mut *mut c_void) -> HRESULT {
    unsafe { *info = ptr::null_mut() };
    E_NOTIMPL
}

unsafe extern "system" fn ids_of_names(
    _this: *mut c_void,
    _: *const GUID,
    _: *const *const u16,
    _: u32,
    _: u32,
    _: *mut i32,
) -> HRESULT {
    E_NOTIMPL
}

unsafe extern "system" fn dispatch_invoke(
    _this: *mut c_void,
    _: i32,
    _: *const GUID,
    _: u32,
    _: u16,
    _: *mut DISPPARAMS,
    _: *mut VARIANT,
    _: *mut c_void,
    _: *mut u32,
) -> HRESULT {
    E_NOTIMPL
}

unsafe extern "system" fn get_parent(_this: *mut c_void, parent: *mut *mut c_void) -> HRESULT {
    unsafe { *parent = ptr::null_mut() };
    S_FALSE
}

unsafe extern "system" fn get_child_count(this: *mut c_void, count: *mut i32) -> HRESULT {
    unsafe { *count = mock(this).config.child_count };
    S_OK
}

unsafe extern "system" fn get_child(this: *mut c_void, child: VARIANT, out: *mut *mut c_void) -> HRESULT {
    record(this, &child);
    unsafe { *out = ptr::null_mut() };
    S_FALSE
}

unsafe extern "system" fn get_name(this: *mut c_void, child: VARIANT, out: *mut BSTR) -> HRESULT {
    record(this, &child);
    write_string(out, mock(this).config.name.as_deref())
}

unsafe extern "system" fn get_value(this: *mut c_void, child: VARIANT, out: *mut BSTR) -> HRESULT {
    record(this, &child);
    write_string(out, mock(this).config.value.as_deref())
}

unsafe extern "system" fn get_no_string(this: *mut c_void, child: VARIANT, out: *mut BSTR) -> HRESULT {
    record(this, &child);
    write_string(out, None)
}

unsafe extern "system" fn get_role(this: *mut c_void, child: VARIANT, out: *mut VARIANT) -> HRESULT {
    record(this, &child);
    unsafe { out.write(VARIANT::from_i4(mock(this).config.role)) };
    S_OK
}

unsafe extern "system" fn get_state(this: *mut c_void, child: VARIANT, out: *mut VARIANT) -> HRESULT {
    record(this, &child);
    unsafe { out.write(VARIANT::from_i4(0)) };
    S_OK
}

unsafe extern "system" fn get_help_topic(this: *mut c_void, file: *mut BSTR, child: VARIANT, topic: *mut i32) -> HRESULT {
    record(this, &child);
    unsafe {
        *file = ptr::null_mut();
        *topic = -1;
    }
    S_FALSE
}

unsafe extern "system" fn get_nothing(_this: *mut c_void, out: *mut VARIANT) -> HRESULT {
    unsafe { out.write(VARIANT::empty()) };
    S_FALSE
}

unsafe extern "system" fn select(this: *mut c_void, _flags: i32, child: VARIANT) -> HRESULT {
    record(this, &child);
    S_OK
}

unsafe extern "system" fn location(
    this: *mut c_void,
    left: *mut i32,
    top: *mut i32,
    width: *mut i32,
    height: *mut i32,
    child: VARIANT,
) -> HRESULT {
    record(this, &child);
    unsafe {
        *left = 10;
        *top = 20;
        *width = 30;
        *height = 40;
    }
    S_OK
}

unsafe extern "system" fn navigate(this: *mut c_void, _direction: i32, start: VARIANT, end: *mut VARIANT) -> HRESULT {
    record(this, &start);
    unsafe { end.write(VARIANT::empty()) };
    S_FALSE
}

unsafe extern "system" fn hit_test(_this: *mut c_void, _x: i32, _y: i32, out: *mut VARIANT) -> HRESULT {
    unsafe { out.write(VARIANT::empty()) };
    S_FALSE
}

unsafe extern "system" fn do_default_action(this: *mut c_void, child: VARIANT) -> HRESULT {
    record(this, &child);
    S_OK
}

unsafe extern "system" fn put_string(this: *mut c_void, child: VARIANT, _value: BSTR) -> HRESULT {
    record(this, &child);
    S_OK
}

unsafe extern "system" fn get_window(this: *mut c_void, hwnd: *mut HWND) -> HRESULT {
    let mock = unsafe { &*((this as *const u8).sub(WINDOW) as *const MockAccessible) };
    unsafe { *hwnd = mock.config.hwnd as HWND };
    S_OK
}

unsafe extern "system" fn context_help(_this: *mut c_void, _enter_mode: i32) -> HRESULT {
    S_OK
}

static MOCK_ACCESSIBLE_VTABLE: IAccessibleVTable = IAccessibleVTable {
    base: IDispatchVTable {
        base: iunknown_base::<0>(),
        get_type_info_count: type_info_count,
        get_type_info: type_info,
        get_ids_of_names: ids_of_names,
        invoke: dispatch_invoke,
    },
    get_acc_parent: get_parent,
    get_acc_child_count: get_child_count,
    get_acc_child: get_child,
    get_acc_name: get_name,
    get_acc_value: get_value,
    get_acc_description: get_no_string,
    get_acc_role: get_role,
    get_acc_state: get_state,
    get_acc_help: get_no_string,
    get_acc_help_topic: get_help_topic,
    get_acc_keyboard_shortcut: get_no_string,
    get_acc_focus: get_nothing,
    get_acc_selection: get_nothing,
    get_acc_default_action: get_no_string,
    acc_select: select,
    acc_location: location,
    acc_navigate: navigate,
    acc_hit_test: hit_test,
    acc_do_default_action: do_default_action,
    put_acc_name: put_string,
    put_acc_value: put_string,
};

static MOCK_WINDOW_VTABLE: IOleWindowVTable = IOleWindowVTable {
    base: iunknown_base::<WINDOW>(),
    get_window,
    context_sensitive_help: context_help,
};

// =============================================================================
// MockEnum
// =============================================================================

pub mod enumerator {
    use super::*;

    /// System enumerator over `VT_I4 1..=total`.
    #[repr(C)]
    pub struct MockEnum {
        vtbl: *const IEnumVARIANTVTable,
        ref_count: ComRefCount,
        position: Mutex<u32>,
        total: u32,
        stats: Arc<MockStats>,
    }

    accbridge::iunknown_thunks!(MockEnum);

    impl MockEnum {
        pub fn create(total: u32, position: u32, stats: Arc<MockStats>) -> NonNull<c_void> {
            stats.created.fetch_add(1, Ordering::SeqCst);
            let mock = Box::new(Self {
                vtbl: &MOCK_ENUM_VTABLE,
                ref_count: ComRefCount::new(),
                position: Mutex::new(position),
                total,
                stats,
            });
            NonNull::from(Box::leak(mock)).cast()
        }

        fn query_interface(&self, riid: *const GUID, ppv: *mut *mut c_void) -> HRESULT {
            if ppv.is_null() || riid.is_null() {
                return E_POINTER;
            }
            let riid = unsafe { &*riid };
            if *riid != IID_IUNKNOWN && *riid != IEnumVARIANT::IID && *riid != IAgileObject::IID {
                unsafe { *ppv = ptr::null_mut() };
                return E_NOINTERFACE;
            }
            self.ref_count.add_ref();
            unsafe { *ppv = self as *const Self as *mut c_void };
            S_OK
        }

        unsafe fn final_release(this: *mut Self) {
            let mock = unsafe { Box::from_raw(this) };
            mock.stats.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn this<'a>(this: *mut c_void) -> &'a MockEnum {
        unsafe { &*(this as *const MockEnum) }
    }

    unsafe extern "system" fn next(this_: *mut c_void, celt: u32, items: *mut VARIANT, fetched: *mut u32) -> HRESULT {
        let mock = this(this_);
        let mut position = mock.position.lock();
        let mut n = 0;
        while n < celt && *position < mock.total {
            *position += 1;
            unsafe { items.add(n as usize).write(VARIANT::from_i4(*position as i32)) };
            n += 1;
        }
        if !fetched.is_null() {
            unsafe { *fetched = n };
        }
        if n == celt { S_OK } else { S_FALSE }
    }

    unsafe extern "system" fn skip(this_: *mut c_void, celt: u32) -> HRESULT {
        let mock = this(this_);
        let mut position = mock.position.lock();
        let step = celt.min(mock.total - *position);
        *position += step;
        if step == celt { S_OK } else { S_FALSE }
    }

    unsafe extern "system" fn reset(this_: *mut c_void) -> HRESULT {
        *this(this_).position.lock() = 0;
        S_OK
    }

    unsafe extern "system" fn clone(this_: *mut c_void, out: *mut *mut c_void) -> HRESULT {
        let mock = this(this_);
        let position = *mock.position.lock();
        unsafe { *out = MockEnum::create(mock.total, position, mock.stats.clone()).as_ptr() };
        S_OK
    }

    static MOCK_ENUM_VTABLE: IEnumVARIANTVTable = IEnumVARIANTVTable {
        base: iunknown_base::<0>(),
        next,
        skip,
        reset,
        clone,
    };
}

// =============================================================================
// Factory
// =============================================================================

/// `StdAccessibleFactory` handing out mocks and counting calls.
#[derive(Debug, Default)]
pub struct MockFactory {
    pub config: MockConfig,
    /// Children of the system enumerator; `None` refuses `IEnumVARIANT`.
    pub enum_total: Option<u32>,
    pub calls: AtomicU32,
    pub accessible_stats: Arc<MockStats>,
    pub enum_stats: Arc<MockStats>,
}

impl MockFactory {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StdAccessibleFactory for MockFactory {
    fn create(&self, _hwnd: HWND, _object_id: i32, iid: &GUID) -> Result<NonNull<c_void>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *iid == IAccessible::IID {
            return Ok(MockAccessible::create(self.config.clone(), self.accessible_stats.clone()));
        }
        if *iid == IEnumVARIANT::IID {
            if let Some(total) = self.enum_total {
                return Ok(enumerator::MockEnum::create(total, 0, self.enum_stats.clone()));
            }
        }
        Err(Error::NoInterface { iid: *iid })
    }
}

/// A window handle for tests; never dereferenced.
pub fn fake_hwnd() -> HWND {
    0x1234 as HWND
}
