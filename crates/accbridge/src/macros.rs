//! Boundary macros for vtable thunks.
//!
//! Each thunk receives `this` pointing at one of the vtable-pointer fields of
//! a `#[repr(C)]` wrapper struct. The macros recover the wrapper by
//! subtracting that field's offset (the same this-adjustment a C++ compiler
//! emits for secondary bases) and run the body with panics contained.

/// Executes a thunk body that produces an `HRESULT`.
///
/// 1. Returns `E_POINTER` for a null `this`
/// 2. Adjusts `this` back to the start of `$T` using the offset of `$field`
/// 3. Runs the body under `catch_unwind`; a panic is logged and becomes `E_FAIL`
///
/// # Examples
/// ```ignore
/// unsafe extern "system" fn get_window(this: *mut c_void, hwnd: *mut HWND) -> HRESULT {
///     com_method!(this, ccw: AccessibleCcw[vtbl_ole_window] => {
///         ccw.object.ole_window(hwnd)
///     })
/// }
/// ```
#[macro_export]
macro_rules! com_method {
    ($this:ident, $inner:ident : $T:ty [$field:ident] => $body:expr) => {
        $crate::com_method!($this, $inner: $T[@ ::std::mem::offset_of!($T, $field)] => $body)
    };

    // Offset form, for thunks shared between slots through a const generic.
    ($this:ident, $inner:ident : $T:ty [@ $offset:expr] => $body:expr) => {{
        if $this.is_null() {
            return $crate::E_POINTER;
        }

        #[allow(unused_unsafe)]
        let $inner: &$T = unsafe { &*(($this as *const u8).sub($offset) as *const $T) };

        match ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(
            || -> $crate::HRESULT { $body },
        )) {
            Ok(hr) => hr,
            Err(_) => {
                $crate::tracing::error!(
                    target: "accbridge::boundary",
                    wrapper = stringify!($T),
                    slot = stringify!($offset),
                    "panic caught at native boundary"
                );
                $crate::E_FAIL
            }
        }
    }};
}

/// Executes a thunk body that produces `accbridge::Result<()>`.
///
/// `Ok(())` becomes `S_OK`; `Err(e)` becomes `e.hresult()`, so native
/// failures forwarded from a system object keep their original status.
#[macro_export]
macro_rules! com_method_result {
    ($this:ident, $inner:ident : $T:ty [$field:ident] => $body:expr) => {
        $crate::com_method_result!($this, $inner: $T[@ ::std::mem::offset_of!($T, $field)] => $body)
    };

    ($this:ident, $inner:ident : $T:ty [@ $offset:expr] => $body:expr) => {
        $crate::com_method!($this, $inner: $T[@ $offset] => {
            match (|| -> $crate::Result<()> { $body })() {
                Ok(()) => $crate::S_OK,
                Err(e) => e.hresult(),
            }
        })
    };
}

/// Writes `value` through an out-pointer, returning `E_POINTER` from the
/// enclosing closure when the pointer is null.
#[macro_export]
macro_rules! write_out {
    ($out:expr, $value:expr) => {{
        if $out.is_null() {
            return $crate::E_POINTER;
        }
        #[allow(unused_unsafe)]
        unsafe {
            *$out = $value;
        }
    }};
}

/// Generates offset-adjusting `IUnknown` thunks for a multi-vtable wrapper.
///
/// Expects `$T` to provide:
/// - `fn query_interface(&self, riid: *const GUID, ppv: *mut *mut c_void) -> HRESULT`
/// - a `ref_count: ComRefCount` field
/// - `unsafe fn final_release(this: *mut Self)`, called once the count reaches zero
///
/// Emits `iunknown_base::<OFFSET>()`, which builds the `IUnknownVTable` for
/// the vtable-pointer field at byte offset `OFFSET`.
#[macro_export]
macro_rules! iunknown_thunks {
    ($T:ty) => {
        unsafe extern "system" fn thunk_query_interface<const OFFSET: usize>(
            this: *mut $crate::c_void,
            riid: *const $crate::GUID,
            ppv: *mut *mut $crate::c_void,
        ) -> $crate::HRESULT {
            if this.is_null() {
                return $crate::E_POINTER;
            }
            let outer = unsafe { &*((this as *const u8).sub(OFFSET) as *const $T) };
            outer.query_interface(riid, ppv)
        }

        unsafe extern "system" fn thunk_add_ref<const OFFSET: usize>(this: *mut $crate::c_void) -> u32 {
            if this.is_null() {
                return 0;
            }
            let outer = unsafe { &*((this as *const u8).sub(OFFSET) as *const $T) };
            outer.ref_count.add_ref()
        }

        unsafe extern "system" fn thunk_release<const OFFSET: usize>(this: *mut $crate::c_void) -> u32 {
            if this.is_null() {
                return 0;
            }
            let outer = unsafe { (this as *mut u8).sub(OFFSET) as *mut $T };
            let remaining = unsafe { (*outer).ref_count.release() };
            if remaining == 0 {
                unsafe { <$T>::final_release(outer) };
            }
            remaining
        }

        const fn iunknown_base<const OFFSET: usize>() -> $crate::IUnknownVTable {
            $crate::IUnknownVTable {
                query_interface: thunk_query_interface::<OFFSET>,
                add_ref: thunk_add_ref::<OFFSET>,
                release: thunk_release::<OFFSET>,
            }
        }
    };
}
