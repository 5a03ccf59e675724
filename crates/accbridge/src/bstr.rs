//! Automation strings and arrays.
//!
//! A `BSTR` points at UTF-16 data preceded by a 4-byte byte-length prefix and
//! followed by a null terminator. Whoever owns a `BSTR` frees it exactly once
//! through the same allocator that produced it.
//!
//! The allocator is pluggable so an embedder on Windows can route to
//! `SysAllocStringLen`/`SysFreeString` and `SafeArrayCreateVector`/
//! `SafeArrayDestroy`; the default [`HeapAllocator`] reproduces the layouts
//! on the Rust heap.

use std::alloc::{self as heap, Layout};
use std::ffi::c_void;
use std::ptr;
use std::sync::OnceLock;

use crate::com::{E_INVALIDARG, E_POINTER, HRESULT, S_OK, release};
use crate::variant::{VARTYPE, VT_DISPATCH, VT_I4, VT_UNKNOWN};

/// Pointer to the first UTF-16 unit of a length-prefixed string.
pub type BSTR = *mut u16;

// =============================================================================
// SAFEARRAY
// =============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SAFEARRAYBOUND {
    pub elements: u32,
    pub lower_bound: i32,
}

/// One-dimensional layout of an Automation `SAFEARRAY`.
#[repr(C)]
#[derive(Debug)]
pub struct SAFEARRAY {
    pub dims: u16,
    pub features: u16,
    pub element_size: u32,
    pub locks: u32,
    pub data: *mut c_void,
    pub bounds: [SAFEARRAYBOUND; 1],
}

pub const FADF_HAVEVARTYPE: u16 = 0x0080;
pub const FADF_UNKNOWN: u16 = 0x0200;
pub const FADF_DISPATCH: u16 = 0x0400;

impl SAFEARRAY {
    /// Element count of the first dimension.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bounds[0].elements as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// View the elements as `T`.
    ///
    /// # Safety
    /// `T` must match the element type the array was created with.
    #[must_use]
    pub unsafe fn as_slice<T>(&self) -> &[T] {
        if self.data.is_null() || self.is_empty() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.data as *const T, self.len()) }
    }

    /// Mutable view of the elements as `T`.
    ///
    /// # Safety
    /// `T` must match the element type the array was created with.
    pub unsafe fn as_mut_slice<T>(&mut self) -> &mut [T] {
        if self.data.is_null() || self.is_empty() {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(self.data as *mut T, self.len()) }
    }
}

// =============================================================================
// Allocator
// =============================================================================

/// Producer and reclaimer of Automation-owned memory.
pub trait OleAllocator: Send + Sync {
    /// Allocate a `BSTR` holding `chars`. Null on allocation failure.
    fn alloc_string(&self, chars: &[u16]) -> BSTR;

    /// Free a `BSTR` produced by this allocator. Null is ignored.
    ///
    /// # Safety
    /// `bstr` must be null or a live string from this allocator.
    unsafe fn free_string(&self, bstr: BSTR);

    /// Create a zeroed one-dimensional array of `len` elements of `vt`.
    /// Null on allocation failure or an element type it cannot hold.
    fn create_vector(&self, vt: VARTYPE, len: u32) -> *mut SAFEARRAY;

    /// Destroy an array from `create_vector`, releasing interface elements.
    ///
    /// # Safety
    /// `array` must be null or a live array from this allocator.
    unsafe fn destroy_array(&self, array: *mut SAFEARRAY) -> HRESULT;
}

/// Rust-heap implementation of the Automation memory layouts.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

const PREFIX: usize = std::mem::size_of::<u32>();

fn string_layout(byte_len: usize) -> Option<Layout> {
    Layout::from_size_align(PREFIX + byte_len + 2, PREFIX).ok()
}

fn element_size(vt: VARTYPE) -> Option<(u32, u16)> {
    match vt {
        VT_I4 => Some((4, 0)),
        VT_UNKNOWN => Some((std::mem::size_of::<*mut c_void>() as u32, FADF_UNKNOWN)),
        VT_DISPATCH => Some((std::mem::size_of::<*mut c_void>() as u32, FADF_DISPATCH)),
        _ => None,
    }
}

impl OleAllocator for HeapAllocator {
    fn alloc_string(&self, chars: &[u16]) -> BSTR {
        let byte_len = chars.len() * 2;
        let Ok(prefix) = u32::try_from(byte_len) else {
            return ptr::null_mut();
        };
        let Some(layout) = string_layout(byte_len) else {
            return ptr::null_mut();
        };

        unsafe {
            let base = heap::alloc(layout);
            if base.is_null() {
                return ptr::null_mut();
            }
            (base as *mut u32).write(prefix);
            let data = base.add(PREFIX) as *mut u16;
            ptr::copy_nonoverlapping(chars.as_ptr(), data, chars.len());
            data.add(chars.len()).write(0);
            data
        }
    }

    unsafe fn free_string(&self, bstr: BSTR) {
        if bstr.is_null() {
            return;
        }
        unsafe {
            let base = (bstr as *mut u8).sub(PREFIX);
            let byte_len = (base as *const u32).read() as usize;
            if let Some(layout) = string_layout(byte_len) {
                heap::dealloc(base, layout);
            }
        }
    }

    fn create_vector(&self, vt: VARTYPE, len: u32) -> *mut SAFEARRAY {
        let Some((size, features)) = element_size(vt) else {
            return ptr::null_mut();
        };

        let data = if len == 0 {
            ptr::null_mut()
        } else {
            let Ok(layout) = Layout::from_size_align(size as usize * len as usize, 8) else {
                return ptr::null_mut();
            };
            let data = unsafe { heap::alloc_zeroed(layout) };
            if data.is_null() {
                return ptr::null_mut();
            }
            data as *mut c_void
        };

        Box::into_raw(Box::new(SAFEARRAY {
            dims: 1,
            features,
            element_size: size,
            locks: 0,
            data,
            bounds: [SAFEARRAYBOUND {
                elements: len,
                lower_bound: 0,
            }],
        }))
    }

    unsafe fn destroy_array(&self, array: *mut SAFEARRAY) -> HRESULT {
        if array.is_null() {
            return E_POINTER;
        }
        let array = unsafe { Box::from_raw(array) };
        if array.dims != 1 {
            // Not one of ours; leak rather than free with the wrong layout.
            std::mem::forget(array);
            return E_INVALIDARG;
        }

        if array.features & (FADF_UNKNOWN | FADF_DISPATCH) != 0 {
            for &element in unsafe { array.as_slice::<*mut c_void>() } {
                if !element.is_null() {
                    unsafe { release(element) };
                }
            }
        }

        if !array.data.is_null() {
            let size = array.element_size as usize * array.len();
            if let Ok(layout) = Layout::from_size_align(size, 8) {
                unsafe { heap::dealloc(array.data as *mut u8, layout) };
            }
        }
        S_OK
    }
}

static ALLOCATOR: OnceLock<Box<dyn OleAllocator>> = OnceLock::new();

/// Install the process-wide allocator. Fails if one is already in use.
pub fn set_allocator(allocator: Box<dyn OleAllocator>) -> Result<(), Box<dyn OleAllocator>> {
    ALLOCATOR.set(allocator)
}

/// The process-wide allocator, [`HeapAllocator`] unless another was installed first.
pub fn allocator() -> &'static dyn OleAllocator {
    ALLOCATOR.get_or_init(|| Box::new(HeapAllocator)).as_ref()
}

// =============================================================================
// String helpers
// =============================================================================

/// Allocate a `BSTR` for `s` with the process-wide allocator.
#[must_use]
pub fn alloc(s: &str) -> BSTR {
    let wide: Vec<u16> = s.encode_utf16().collect();
    allocator().alloc_string(&wide)
}

/// Free a `BSTR` with the process-wide allocator.
///
/// # Safety
/// `bstr` must be null or an owned string from the process-wide allocator.
pub unsafe fn free(bstr: BSTR) {
    unsafe { allocator().free_string(bstr) }
}

/// Length in UTF-16 units, read from the prefix. Null counts as empty.
///
/// # Safety
/// `bstr` must be null or a live `BSTR`.
#[must_use]
pub unsafe fn len(bstr: BSTR) -> usize {
    if bstr.is_null() {
        return 0;
    }
    unsafe { ((bstr as *const u8).sub(PREFIX) as *const u32).read() as usize / 2 }
}

/// Copy a `BSTR` into an owned string without freeing it.
///
/// # Safety
/// `bstr` must be null or a live `BSTR`.
#[must_use]
pub unsafe fn to_string(bstr: BSTR) -> String {
    if bstr.is_null() {
        return String::new();
    }
    let units = unsafe { std::slice::from_raw_parts(bstr, len(bstr)) };
    String::from_utf16_lossy(units)
}

/// Copy and free an owned `BSTR` in one step.
///
/// # Safety
/// `bstr` must be null or an owned string from the process-wide allocator.
#[must_use]
pub unsafe fn take(bstr: BSTR) -> String {
    let s = unsafe { to_string(bstr) };
    unsafe { free(bstr) };
    s
}

/// Copy a null-terminated wide string (`LPWSTR`).
///
/// # Safety
/// `wide` must be null or point to a null-terminated UTF-16 buffer.
#[must_use]
pub unsafe fn wide_to_string(wide: *const u16) -> String {
    if wide.is_null() {
        return String::new();
    }
    let mut n = 0;
    while unsafe { *wide.add(n) } != 0 {
        n += 1;
    }
    String::from_utf16_lossy(unsafe { std::slice::from_raw_parts(wide, n) })
}

/// Create an `i32` array, as used for UIA runtime ids.
#[must_use]
pub fn i32_vector(values: &[i32]) -> *mut SAFEARRAY {
    let Ok(len) = u32::try_from(values.len()) else {
        return ptr::null_mut();
    };
    let array = allocator().create_vector(VT_I4, len);
    if let Some(array) = unsafe { array.as_mut() } {
        unsafe { array.as_mut_slice::<i32>() }.copy_from_slice(values);
    }
    array
}

/// Create an `IUnknown` array, taking ownership of one reference per element.
#[must_use]
pub fn unknown_vector(elements: Vec<*mut c_void>) -> *mut SAFEARRAY {
    let Ok(len) = u32::try_from(elements.len()) else {
        for element in elements.into_iter().filter(|p| !p.is_null()) {
            unsafe { release(element) };
        }
        return ptr::null_mut();
    };
    let array = allocator().create_vector(VT_UNKNOWN, len);
    match unsafe { array.as_mut() } {
        Some(array) => unsafe { array.as_mut_slice::<*mut c_void>() }.copy_from_slice(&elements),
        None => {
            for element in elements.into_iter().filter(|p| !p.is_null()) {
                unsafe { release(element) };
            }
        }
    }
    array
}
