//! COM ABI primitives
//!
//! Everything here is binary-layout exact: native accessibility clients hold
//! pointers to structs built from these types and call through them directly.
//!
//! ## Key Types
//! - [`GUID`] - 128-bit interface identifier
//! - [`HRESULT`] - status code returned across the boundary
//! - [`IUnknownVTable`] - the three lifetime/identity slots every vtable starts with
//! - [`ComRefCount`] - atomic counter embedded in every wrapper we hand out
//! - [`ComScope`] - owned reference released on drop
//!
//! ## Ownership
//! A pointer returned from a producing call (`QueryInterface`, the resolver)
//! carries one reference. The receiver releases it exactly once, either by
//! hand with [`release`] or by wrapping it in a [`ComScope`].

use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Error, Result};

// =============================================================================
// GUID - Globally Unique Identifier
// =============================================================================

/// 128-bit globally unique identifier (GUID/UUID/IID).
///
/// Format: `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}`
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct GUID {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl GUID {
    /// Create a new GUID from components
    #[must_use]
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// Create a GUID from its 128-bit big-endian reading, so
    /// `0x618736E0_3C3D_11CF_810C_00AA00389B71` is `{618736E0-3C3D-11CF-810C-00AA00389B71}`.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self::new(
            (value >> 96) as u32,
            (value >> 80) as u16,
            (value >> 64) as u16,
            (value as u64).to_be_bytes(),
        )
    }

    /// The nil/zero GUID
    pub const ZERO: GUID = GUID::new(0, 0, 0, [0; 8]);
}

impl std::fmt::Debug for GUID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
            self.data1,
            self.data2,
            self.data3,
            self.data4[0],
            self.data4[1],
            self.data4[2],
            self.data4[3],
            self.data4[4],
            self.data4[5],
            self.data4[6],
            self.data4[7]
        )
    }
}

impl std::fmt::Display for GUID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.data1,
            self.data2,
            self.data3,
            self.data4[0],
            self.data4[1],
            self.data4[2],
            self.data4[3],
            self.data4[4],
            self.data4[5],
            self.data4[6],
            self.data4[7]
        )
    }
}

#[cfg(feature = "windows-compat")]
impl From<windows_core::GUID> for GUID {
    fn from(value: windows_core::GUID) -> Self {
        Self::new(value.data1, value.data2, value.data3, value.data4)
    }
}

#[cfg(feature = "windows-compat")]
impl From<GUID> for windows_core::GUID {
    fn from(value: GUID) -> Self {
        windows_core::GUID::from_values(value.data1, value.data2, value.data3, value.data4)
    }
}

// =============================================================================
// HRESULT - COM status codes
// =============================================================================

/// COM result type. 0 (S_OK) indicates success, negative values indicate errors.
pub type HRESULT = i32;

/// Success
pub const S_OK: HRESULT = 0;
/// Success, but returned false
pub const S_FALSE: HRESULT = 1;
/// Not implemented
pub const E_NOTIMPL: HRESULT = 0x8000_4001_u32 as i32;
/// No such interface supported
pub const E_NOINTERFACE: HRESULT = 0x8000_4002_u32 as i32;
/// Invalid pointer
pub const E_POINTER: HRESULT = 0x8000_4003_u32 as i32;
/// Unspecified failure
pub const E_FAIL: HRESULT = 0x8000_4005_u32 as i32;
/// Out of memory
pub const E_OUTOFMEMORY: HRESULT = 0x8007_000E_u32 as i32;
/// Catastrophic failure / call made in the wrong state
pub const E_UNEXPECTED: HRESULT = 0x8000_FFFF_u32 as i32;
/// Invalid argument
pub const E_INVALIDARG: HRESULT = 0x8007_0057_u32 as i32;
/// The object does not have the requested (optional) member.
///
/// System accessible objects return this for properties they legitimately
/// lack; callers treat it as "no value".
pub const DISP_E_MEMBERNOTFOUND: HRESULT = 0x8002_0003_u32 as i32;
/// An optional parameter was omitted
pub const DISP_E_PARAMNOTFOUND: HRESULT = 0x8002_0004_u32 as i32;
/// Name not recognized by `GetIDsOfNames`
pub const DISP_E_UNKNOWNNAME: HRESULT = 0x8002_0006_u32 as i32;
/// Bad variant type
pub const DISP_E_BADVARTYPE: HRESULT = 0x8002_0008_u32 as i32;
/// The object has disconnected from its clients
pub const RPC_E_DISCONNECTED: HRESULT = 0x8001_0108_u32 as i32;

/// Check if an HRESULT indicates success (non-negative)
#[inline]
#[must_use]
pub const fn succeeded(hr: HRESULT) -> bool {
    hr >= 0
}

/// Check if an HRESULT indicates failure (negative)
#[inline]
#[must_use]
pub const fn failed(hr: HRESULT) -> bool {
    hr < 0
}

#[cfg(feature = "windows-compat")]
#[must_use]
pub const fn to_windows_hresult(hr: HRESULT) -> windows_core::HRESULT {
    windows_core::HRESULT(hr)
}

// =============================================================================
// Interface identification
// =============================================================================

/// A COM interface known at compile time.
///
/// Implemented for marker types by [`com_interface!`](crate::com_interface).
pub trait ComInterface {
    /// The interface ID (IID) for this interface.
    const IID: GUID;
    /// Total number of vtable slots, including inherited ones.
    const SLOT_COUNT: usize;
    /// The `#[repr(C)]` vtable layout.
    type VTable: 'static;
}

/// IUnknown interface ID
pub const IID_IUNKNOWN: GUID = GUID::from_u128(0x00000000_0000_0000_C000_000000000046);

// =============================================================================
// IUnknown - Base COM interface
// =============================================================================

/// Base vtable for every COM interface: slots 0, 1, 2.
#[repr(C)]
pub struct IUnknownVTable {
    pub query_interface:
        unsafe extern "system" fn(this: *mut c_void, riid: *const GUID, ppv: *mut *mut c_void) -> HRESULT,
    pub add_ref: unsafe extern "system" fn(this: *mut c_void) -> u32,
    pub release: unsafe extern "system" fn(this: *mut c_void) -> u32,
}

/// Marker type for `IUnknown`.
pub struct IUnknown;

impl ComInterface for IUnknown {
    const IID: GUID = IID_IUNKNOWN;
    const SLOT_COUNT: usize = 3;
    type VTable = IUnknownVTable;
}

/// Read the vtable of an interface pointer as `T`'s layout.
///
/// # Safety
/// `this` must be a live pointer to an object whose first field points to a
/// vtable compatible with `T::VTable`.
#[inline]
pub unsafe fn vtable<'a, T: ComInterface>(this: *mut c_void) -> &'a T::VTable {
    unsafe { &**(this as *const *const T::VTable) }
}

#[inline]
unsafe fn unknown_vtable<'a>(this: *mut c_void) -> &'a IUnknownVTable {
    unsafe { vtable::<IUnknown>(this) }
}

/// Call `QueryInterface` through any interface pointer.
///
/// On success the returned pointer carries one new reference.
///
/// # Safety
/// `this` must be a live COM interface pointer.
pub unsafe fn query_interface(this: *mut c_void, iid: &GUID) -> (HRESULT, *mut c_void) {
    let mut out = ptr::null_mut();
    let hr = unsafe { (unknown_vtable(this).query_interface)(this, iid, &mut out) };
    if failed(hr) {
        // Some objects write garbage into `ppv` on failure.
        return (hr, ptr::null_mut());
    }
    (hr, out)
}

/// Call `AddRef` through any interface pointer.
///
/// # Safety
/// `this` must be a live COM interface pointer.
#[inline]
pub unsafe fn add_ref(this: *mut c_void) -> u32 {
    unsafe { (unknown_vtable(this).add_ref)(this) }
}

/// Call `Release` through any interface pointer.
///
/// # Safety
/// `this` must be a live COM interface pointer that the caller owns a reference on.
#[inline]
pub unsafe fn release(this: *mut c_void) -> u32 {
    unsafe { (unknown_vtable(this).release)(this) }
}

/// The canonical `IUnknown` address of an object, for identity comparison only.
///
/// The reference obtained by the query is released before returning, so the
/// result must not be called through.
///
/// # Safety
/// `this` must be a live COM interface pointer.
pub unsafe fn identity(this: *mut c_void) -> Option<usize> {
    if this.is_null() {
        return None;
    }
    let (hr, unknown) = unsafe { query_interface(this, &IID_IUNKNOWN) };
    if failed(hr) || unknown.is_null() {
        return None;
    }
    unsafe { release(unknown) };
    Some(unknown as usize)
}

// =============================================================================
// ComRefCount - Atomic reference counter for COM objects
// =============================================================================

/// Atomic reference counter for COM objects.
///
/// Embed this in wrapper structs handed to native code.
#[repr(transparent)]
pub struct ComRefCount(AtomicU32);

impl ComRefCount {
    /// Create a new reference counter with count = 1
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU32::new(1))
    }

    /// Increment the reference count. Returns the new count.
    #[inline]
    pub fn add_ref(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Increment only if the object is still alive (count > 0).
    ///
    /// Used when reviving a cached wrapper that another thread may be
    /// tearing down concurrently.
    #[inline]
    pub fn try_add_ref(&self) -> bool {
        self.0
            .fetch_update(Ordering::Acquire, Ordering::Relaxed, |count| {
                (count != 0).then_some(count + 1)
            })
            .is_ok()
    }

    /// Decrement the reference count. Returns the new count.
    ///
    /// When count reaches 0, the caller should destroy the object.
    #[inline]
    pub fn release(&self) -> u32 {
        let remaining = self.0.fetch_sub(1, Ordering::Release) - 1;
        if remaining == 0 {
            std::sync::atomic::fence(Ordering::Acquire);
        }
        remaining
    }

    /// Get the current reference count.
    #[inline]
    #[must_use]
    pub fn count(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for ComRefCount {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ComScope - owned reference released on drop
// =============================================================================

/// One owned reference on an interface pointer, released when dropped.
///
/// Not `Send`: pointers obtained mid-call are released on the same call
/// stack. Store pointers across calls in an
/// [`AgileComPointer`](crate::agile::AgileComPointer) instead.
pub struct ComScope<T: ComInterface> {
    ptr: NonNull<c_void>,
    _marker: PhantomData<*const T>,
}

impl<T: ComInterface> ComScope<T> {
    /// Take ownership of a reference the caller already holds.
    ///
    /// # Safety
    /// `ptr` must be null or a live pointer implementing `T` with one
    /// reference owned by the caller.
    #[must_use]
    pub unsafe fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self {
            ptr,
            _marker: PhantomData,
        })
    }

    /// AddRef a borrowed pointer and own the new reference.
    ///
    /// # Safety
    /// `ptr` must be null or a live pointer implementing `T`.
    #[must_use]
    pub unsafe fn from_borrowed(ptr: *mut c_void) -> Option<Self> {
        let scope = unsafe { Self::from_raw(ptr) }?;
        unsafe { add_ref(scope.as_raw()) };
        Some(scope)
    }

    /// The raw pointer. Ownership stays with the scope.
    #[inline]
    #[must_use]
    pub fn as_raw(&self) -> *mut c_void {
        self.ptr.as_ptr()
    }

    /// Give up ownership without releasing.
    #[inline]
    #[must_use]
    pub fn into_raw(self) -> *mut c_void {
        let ptr = self.ptr.as_ptr();
        std::mem::forget(self);
        ptr
    }

    /// The vtable, typed as `T`'s layout.
    #[inline]
    #[must_use]
    pub fn vtbl(&self) -> &T::VTable {
        unsafe { vtable::<T>(self.as_raw()) }
    }

    /// `QueryInterface` for `U`, returning a separately owned reference.
    pub fn cast<U: ComInterface>(&self) -> Result<ComScope<U>> {
        let (hr, out) = unsafe { query_interface(self.as_raw(), &U::IID) };
        if failed(hr) {
            return Err(Error::from_hresult(hr));
        }
        unsafe { ComScope::from_raw(out) }.ok_or(Error::NoInterface { iid: U::IID })
    }

    /// Same-object test by `IUnknown` identity.
    #[must_use]
    pub fn is_same_object(&self, other: *mut c_void) -> bool {
        let ours = unsafe { identity(self.as_raw()) };
        ours.is_some() && ours == unsafe { identity(other) }
    }
}

impl<T: ComInterface> Clone for ComScope<T> {
    fn clone(&self) -> Self {
        unsafe { add_ref(self.as_raw()) };
        Self {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }
}

impl<T: ComInterface> Drop for ComScope<T> {
    fn drop(&mut self) {
        unsafe { release(self.as_raw()) };
    }
}

impl<T: ComInterface> std::fmt::Debug for ComScope<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComScope")
            .field("iid", &T::IID)
            .field("ptr", &self.ptr)
            .finish()
    }
}
