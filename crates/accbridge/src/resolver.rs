//! Object identity resolution across the native boundary.
//!
//! [`ComHelpers`] turns a Rust object into a native interface pointer and
//! back. Forward resolution tries, in order:
//!
//! 1. the object's own wrapper source, producing one CCW per object from a
//!    process-wide wrapper table
//! 2. a native instance previously bound to the object (the RCW registry)
//! 3. the installed [`LegacyInterop`], whose failures are logged, not raised
//!
//! Reverse resolution walks the same chain backwards: CCWs we created are
//! recognized through the internal `IManagedIdentity` marker interface.
//!
//! ## Wrapper table lifetime
//! A CCW holds its object strongly; the table holds no reference on the CCW.
//! When the last native reference goes away the CCW removes its own entry
//! (only if the entry still names it) and frees itself. Resolution revives
//! a cached CCW with a conditional increment, so a CCW that is already being
//! torn down is replaced instead of resurrected.

use std::any::Any;
use std::collections::HashMap;
use std::ffi::c_void;
use std::ptr::{self, NonNull};
use std::sync::{Arc, LazyLock, Weak};

use parking_lot::{Mutex, RwLock};

use crate::agile::AgileComPointer;
use crate::com::{
    ComInterface, ComRefCount, ComScope, E_NOINTERFACE, E_POINTER, GUID, HRESULT, IID_IUNKNOWN,
    IUnknown, IUnknownVTable, S_OK, failed, identity, query_interface, release, vtable,
};
use crate::error::{Error, Result};
use crate::interfaces::{IAgileObject, IManagedIdentity, IManagedIdentityVTable};

// =============================================================================
// Object model
// =============================================================================

/// Upcasts for trait objects. Implemented for every eligible type.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A Rust object that can be handed to native code.
pub trait ComObject: AsAny {
    /// The managed-wrapper capability: objects that can project themselves
    /// as a native wrapper return their source here.
    fn wrapper_source(&self) -> Option<&dyn WrapperSource> {
        None
    }

    /// Called once after a new wrapper was created for this object.
    fn wrapper_created(&self, _identity: NonNull<c_void>) {}
}

/// Shared handle to a [`ComObject`].
pub type ObjectRef = Arc<dyn ComObject>;

/// Identity key of an object: the address of its allocation.
#[must_use]
pub fn object_key(object: &ObjectRef) -> usize {
    Arc::as_ptr(object) as *const () as usize
}

/// Reference identity, ignoring which trait vtable the handles carry.
#[must_use]
pub fn same_object(a: &ObjectRef, b: &ObjectRef) -> bool {
    object_key(a) == object_key(b)
}

/// Recover the concrete type behind a handle.
#[must_use]
pub fn downcast<T: ComObject>(object: &ObjectRef) -> Option<Arc<T>> {
    object.clone().into_any().downcast::<T>().ok()
}

/// Borrowing form of [`downcast`].
#[must_use]
pub fn downcast_ref<T: ComObject>(object: &ObjectRef) -> Option<&T> {
    (**object).as_any().downcast_ref::<T>()
}

/// A freshly created native wrapper.
#[derive(Debug, Clone, Copy)]
pub struct NativeWrapper {
    /// The wrapper's `IUnknown`, carrying the one initial reference.
    pub identity: NonNull<c_void>,
    /// Conditionally AddRef the wrapper at `identity`; false once it is dying.
    pub revive: unsafe fn(identity: usize) -> bool,
}

/// Factory of native wrappers for one kind of object.
pub trait WrapperSource: Send + Sync {
    /// Build a wrapper that holds `object` strongly. `key` must be reported
    /// back by the wrapper's `IManagedIdentity::get_instance_key` and passed
    /// to [`ComHelpers::forget_wrapper`] on final release.
    fn create_wrapper(&self, object: ObjectRef, key: usize) -> Result<NativeWrapper>;
}

/// Platform interop of last resort (`GetIUnknownForObject`/`GetObjectForIUnknown`).
pub trait LegacyInterop: Send + Sync {
    /// Produce an `IUnknown` with one owned reference.
    fn unknown_for_object(&self, object: &ObjectRef) -> Result<NonNull<c_void>>;
    /// Find the object behind a borrowed pointer.
    fn object_for_unknown(&self, unknown: NonNull<c_void>) -> Result<ObjectRef>;
}

// =============================================================================
// ComHelpers
// =============================================================================

struct WrapperEntry {
    identity: usize,
    revive: unsafe fn(usize) -> bool,
    object: Weak<dyn ComObject>,
}

struct NativeEntry {
    object: Weak<dyn ComObject>,
    identity: usize,
    pointer: AgileComPointer<IUnknown>,
}

/// Process-wide resolver between Rust objects and native pointers.
pub struct ComHelpers {
    wrappers: Mutex<HashMap<usize, WrapperEntry>>,
    natives: RwLock<HashMap<usize, NativeEntry>>,
    legacy: RwLock<Option<Arc<dyn LegacyInterop>>>,
}

static HELPERS: LazyLock<ComHelpers> = LazyLock::new(|| ComHelpers {
    wrappers: Mutex::new(HashMap::new()),
    natives: RwLock::new(HashMap::new()),
    legacy: RwLock::new(None),
});

/// Drops one reference on scope exit when armed.
struct ReleaseOnExit(Option<*mut c_void>);

impl Drop for ReleaseOnExit {
    fn drop(&mut self) {
        if let Some(pointer) = self.0.take() {
            unsafe { release(pointer) };
        }
    }
}

impl ComHelpers {
    /// The process-wide instance.
    pub fn global() -> &'static ComHelpers {
        &HELPERS
    }

    /// Install or remove the legacy interop fallback.
    pub fn set_legacy_interop(&self, interop: Option<Arc<dyn LegacyInterop>>) {
        *self.legacy.write() = interop;
    }

    /// Produce a native pointer for `iid` on `object`.
    ///
    /// On success the pointer carries one reference owned by the caller.
    /// Callers check the status, not only the pointer.
    pub fn resolve(&self, object: Option<&ObjectRef>, iid: &GUID) -> (*mut c_void, HRESULT) {
        let Some(object) = object else {
            return (ptr::null_mut(), E_POINTER);
        };

        let Some(unknown) = self.identity_for(object) else {
            return (ptr::null_mut(), E_NOINTERFACE);
        };

        if *iid == IID_IUNKNOWN {
            return (unknown.as_ptr(), S_OK);
        }

        let (hr, out) = unsafe { query_interface(unknown.as_ptr(), iid) };
        unsafe { release(unknown.as_ptr()) };
        (out, hr)
    }

    /// [`resolve`](Self::resolve) into an owned, typed scope.
    pub fn get_com_pointer<T: ComInterface>(&self, object: &ObjectRef) -> Result<ComScope<T>> {
        let (pointer, hr) = self.resolve(Some(object), &T::IID);
        if failed(hr) {
            return Err(Error::from_hresult(hr));
        }
        unsafe { ComScope::from_raw(pointer) }.ok_or(Error::NoInterface { iid: T::IID })
    }

    fn identity_for(&self, object: &ObjectRef) -> Option<NonNull<c_void>> {
        if let Some(source) = object.wrapper_source() {
            match self.wrapper_for(object, source) {
                Ok(identity) => return Some(identity),
                Err(error) => {
                    tracing::warn!(target: "accbridge::resolver", %error, "wrapper creation failed");
                }
            }
        }

        if let Some(identity) = self.native_for(object) {
            return Some(identity);
        }

        let interop = self.legacy.read().clone()?;
        match interop.unknown_for_object(object) {
            Ok(unknown) => Some(unknown),
            Err(error) => {
                tracing::warn!(target: "accbridge::resolver", %error, "legacy interop could not produce a pointer");
                None
            }
        }
    }

    fn wrapper_for(&self, object: &ObjectRef, source: &dyn WrapperSource) -> Result<NonNull<c_void>> {
        let key = object_key(object);
        let mut table = self.wrappers.lock();

        if let Some(entry) = table.get(&key) {
            if unsafe { (entry.revive)(entry.identity) } {
                tracing::trace!(target: "accbridge::resolver", key, "reusing wrapper");
                return NonNull::new(entry.identity as *mut c_void).ok_or(Error::NullPointer);
            }
        }

        let wrapper = source.create_wrapper(object.clone(), key)?;
        table.insert(
            key,
            WrapperEntry {
                identity: wrapper.identity.as_ptr() as usize,
                revive: wrapper.revive,
                object: Arc::downgrade(object),
            },
        );
        drop(table);

        tracing::trace!(target: "accbridge::resolver", key, "created wrapper");
        object.wrapper_created(wrapper.identity);
        Ok(wrapper.identity)
    }

    /// Called by a wrapper on final release. The entry is removed only if
    /// it still names `identity`; a replacement created meanwhile survives.
    pub fn forget_wrapper(&self, key: usize, identity: usize) {
        let mut table = self.wrappers.lock();
        if table.get(&key).is_some_and(|entry| entry.identity == identity) {
            table.remove(&key);
        }
    }

    /// Whether a live wrapper currently exists for `object`.
    #[must_use]
    pub fn has_wrapper(&self, object: &ObjectRef) -> bool {
        self.wrappers.lock().contains_key(&object_key(object))
    }

    // -------------------------------------------------------------------------
    // RCW registry
    // -------------------------------------------------------------------------

    /// Record `pointer` as the native instance of `object`. The pointer is
    /// borrowed; the registry holds its own reference on the object's
    /// `IUnknown` until [`forget_native`](Self::forget_native).
    ///
    /// # Safety
    /// `pointer` must be a live COM interface pointer.
    pub unsafe fn bind_native(&self, object: &ObjectRef, pointer: *mut c_void) -> Result<()> {
        if pointer.is_null() {
            return Err(Error::NullPointer);
        }
        let (hr, unknown) = unsafe { query_interface(pointer, &IID_IUNKNOWN) };
        if failed(hr) || unknown.is_null() {
            return Err(Error::from_hresult(if failed(hr) { hr } else { E_NOINTERFACE }));
        }

        let entry = NativeEntry {
            object: Arc::downgrade(object),
            identity: unknown as usize,
            pointer: unsafe { AgileComPointer::new(unknown, true) },
        };
        let previous = self.natives.write().insert(object_key(object), entry);
        drop(previous);
        Ok(())
    }

    /// Drop the native instance bound to `object`, if any.
    pub fn forget_native(&self, object: &ObjectRef) -> bool {
        let removed = self.natives.write().remove(&object_key(object));
        removed.is_some()
    }

    fn native_for(&self, object: &ObjectRef) -> Option<NonNull<c_void>> {
        let natives = self.natives.read();
        let entry = natives.get(&object_key(object))?;
        // A dead owner means the key was reused by a different allocation.
        entry.object.upgrade()?;
        let scope = entry.pointer.get_interface().ok()?;
        NonNull::new(scope.into_raw())
    }

    fn native_owner(&self, identity: usize) -> Option<ObjectRef> {
        self.natives
            .read()
            .values()
            .find(|entry| entry.identity == identity)
            .and_then(|entry| entry.object.upgrade())
    }

    // -------------------------------------------------------------------------
    // Reverse direction
    // -------------------------------------------------------------------------

    /// Find the Rust object behind a native pointer.
    ///
    /// With `take_ownership` the input is released exactly once, whether or
    /// not any path found an object.
    ///
    /// # Safety
    /// `pointer` must be null or a live COM interface pointer; with
    /// `take_ownership` the caller must own one reference on it.
    pub unsafe fn unwrap(&self, pointer: *mut c_void, take_ownership: bool) -> Option<ObjectRef> {
        if pointer.is_null() {
            return None;
        }
        let _release = ReleaseOnExit(take_ownership.then_some(pointer));

        if let Some(object) = unsafe { self.wrapped_object(pointer) } {
            return Some(object);
        }

        if let Some(object) = unsafe { identity(pointer) }.and_then(|id| self.native_owner(id)) {
            return Some(object);
        }

        let interop = self.legacy.read().clone()?;
        match interop.object_for_unknown(NonNull::new(pointer)?) {
            Ok(object) => Some(object),
            Err(error) => {
                tracing::debug!(target: "accbridge::resolver", %error, "legacy interop found no object");
                None
            }
        }
    }

    /// Recognize one of our own wrappers by its marker interface.
    unsafe fn wrapped_object(&self, pointer: *mut c_void) -> Option<ObjectRef> {
        let key = unsafe { instance_key(pointer) }?;
        self.wrappers.lock().get(&key).and_then(|entry| entry.object.upgrade())
    }

    /// Whether `pointer` is a native view of `object`.
    ///
    /// # Safety
    /// `pointer` must be null or a live COM interface pointer (borrowed).
    pub unsafe fn wraps_same_object(&self, object: &ObjectRef, pointer: *mut c_void) -> bool {
        if pointer.is_null() {
            return false;
        }
        if let Some(found) = unsafe { self.unwrap(pointer, false) } {
            return same_object(&found, object);
        }

        let (fresh, hr) = self.resolve(Some(object), &IID_IUNKNOWN);
        if failed(hr) || fresh.is_null() {
            return false;
        }
        let same = Some(fresh as usize) == unsafe { identity(pointer) };
        unsafe { release(fresh) };
        same
    }
}

// =============================================================================
// StandardWrapper
// =============================================================================

/// Wrapper source producing identity-only wrappers (`IUnknown` plus marker).
///
/// Objects that need a stable native identity but expose no other interface
/// return `Some(&STANDARD_WRAPPERS)` from [`ComObject::wrapper_source`].
#[derive(Debug, Default)]
pub struct StandardWrappers;

pub static STANDARD_WRAPPERS: StandardWrappers = StandardWrappers;

impl WrapperSource for StandardWrappers {
    fn create_wrapper(&self, object: ObjectRef, key: usize) -> Result<NativeWrapper> {
        Ok(StandardWrapper::create(object, key))
    }
}

#[repr(C)]
struct StandardWrapper {
    vtbl_unknown: *const IUnknownVTable,
    vtbl_identity: *const IManagedIdentityVTable,
    ref_count: ComRefCount,
    key: usize,
    object: ObjectRef,
}

crate::iunknown_thunks!(StandardWrapper);

static STANDARD_UNKNOWN_VTABLE: IUnknownVTable = iunknown_base::<0>();

static STANDARD_IDENTITY_VTABLE: IManagedIdentityVTable = IManagedIdentityVTable {
    base: iunknown_base::<{ std::mem::offset_of!(StandardWrapper, vtbl_identity) }>(),
    get_instance_key: standard_instance_key,
};

unsafe extern "system" fn standard_instance_key(this: *mut c_void, key: *mut usize) -> HRESULT {
    crate::com_method!(this, wrapper: StandardWrapper[vtbl_identity] => {
        crate::write_out!(key, wrapper.key);
        S_OK
    })
}

impl StandardWrapper {
    fn create(object: ObjectRef, key: usize) -> NativeWrapper {
        let wrapper = Box::new(Self {
            vtbl_unknown: &STANDARD_UNKNOWN_VTABLE,
            vtbl_identity: &STANDARD_IDENTITY_VTABLE,
            ref_count: ComRefCount::new(),
            key,
            object,
        });
        let identity = NonNull::from(Box::leak(wrapper)).cast::<c_void>();
        NativeWrapper {
            identity,
            revive: Self::revive,
        }
    }

    unsafe fn revive(identity: usize) -> bool {
        let wrapper = unsafe { &*(identity as *const Self) };
        wrapper.ref_count.try_add_ref()
    }

    fn query_interface(&self, riid: *const GUID, ppv: *mut *mut c_void) -> HRESULT {
        if ppv.is_null() {
            return E_POINTER;
        }
        unsafe { *ppv = ptr::null_mut() };
        if riid.is_null() {
            return E_POINTER;
        }

        let riid = unsafe { &*riid };
        let slot: *const *const c_void = if *riid == IID_IUNKNOWN || *riid == IAgileObject::IID {
            ptr::addr_of!(self.vtbl_unknown).cast()
        } else if *riid == IManagedIdentity::IID {
            ptr::addr_of!(self.vtbl_identity).cast()
        } else {
            return E_NOINTERFACE;
        };

        self.ref_count.add_ref();
        unsafe { *ppv = slot as *mut c_void };
        S_OK
    }

    unsafe fn final_release(this: *mut Self) {
        let wrapper = unsafe { Box::from_raw(this) };
        ComHelpers::global().forget_wrapper(wrapper.key, this as usize);
        tracing::trace!(target: "accbridge::resolver", key = wrapper.key, "wrapper released");
        drop(wrapper);
    }
}

/// Read the identity a pointer's wrapper reports, if it is one of ours.
///
/// # Safety
/// `pointer` must be a live COM interface pointer.
pub unsafe fn instance_key(pointer: *mut c_void) -> Option<usize> {
    let (hr, marker) = unsafe { query_interface(pointer, &IManagedIdentity::IID) };
    if failed(hr) || marker.is_null() {
        return None;
    }
    let mut key = 0usize;
    let hr = unsafe { (vtable::<IManagedIdentity>(marker).get_instance_key)(marker, &mut key) };
    unsafe { release(marker) };
    (!failed(hr)).then_some(key)
}
