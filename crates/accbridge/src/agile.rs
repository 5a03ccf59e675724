//! Thread-agile owning handles to native interface pointers.
//!
//! An [`AgileComPointer`] owns exactly one reference on a native object and
//! releases it exactly once, from whichever thread disposes it. How that is
//! made safe depends on the object:
//!
//! - objects answering `IAgileObject` are free-threaded and held directly
//! - other objects are proxied through an `IAgileReference` when an
//!   [`AgileReferenceFactory`] is installed (the `RoGetAgileReference` path)
//! - otherwise the pointer is held directly but is bound to the creating
//!   thread; releasing it elsewhere is logged
//!
//! ```text
//! unbound --bind--> binding --> bound --dispose--> released
//! ```

use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicI32, AtomicU8, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::RwLock;

use crate::com::{
    ComInterface, ComScope, E_NOINTERFACE, E_POINTER, E_UNEXPECTED, GUID, HRESULT, IUnknown, S_OK, add_ref,
    failed, identity, query_interface, release, vtable,
};
use crate::error::{Error, Result};
use crate::interfaces::{IAgileObject, IAgileReference};

const UNBOUND: u8 = 0;
const BINDING: u8 = 1;
const BOUND: u8 = 2;
const RELEASED: u8 = 3;

/// Lifecycle of an [`AgileComPointer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgileState {
    Unbound,
    Binding,
    Bound,
    Released,
}

/// How the owned reference is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgileMode {
    /// The object is free-threaded; the raw pointer is kept.
    Agile,
    /// Access goes through an `IAgileReference`.
    Proxied,
    /// Raw pointer of a non-agile object, tied to the creating thread.
    ThreadBound,
}

enum Binding {
    Direct {
        ptr: NonNull<c_void>,
        agile: bool,
        owner: ThreadId,
    },
    Proxied {
        reference: NonNull<c_void>,
    },
}

impl Binding {
    fn mode(&self) -> AgileMode {
        match self {
            Self::Direct { agile: true, .. } => AgileMode::Agile,
            Self::Direct { agile: false, .. } => AgileMode::ThreadBound,
            Self::Proxied { .. } => AgileMode::Proxied,
        }
    }

    /// Release the owned reference.
    unsafe fn release(self) {
        match self {
            Self::Direct { ptr, agile, owner } => {
                if !agile && owner != thread::current().id() {
                    tracing::warn!(
                        target: "accbridge::agile",
                        ?owner,
                        "releasing a non-agile pointer from a foreign thread"
                    );
                }
                unsafe { release(ptr.as_ptr()) };
            }
            Self::Proxied { reference } => unsafe {
                release(reference.as_ptr());
            },
        }
    }
}

// =============================================================================
// Agile reference factory
// =============================================================================

/// Producer of `IAgileReference` objects, the `RoGetAgileReference` equivalent.
pub trait AgileReferenceFactory: Send + Sync {
    /// Create an agile reference to `unknown` for interface `iid`.
    ///
    /// The input reference is borrowed; the returned pointer carries one
    /// reference of its own.
    fn create(&self, iid: &GUID, unknown: NonNull<c_void>) -> Result<NonNull<c_void>>;
}

static AGILE_FACTORY: OnceLock<Box<dyn AgileReferenceFactory>> = OnceLock::new();

/// Install the process-wide agile reference factory. Fails if one is already installed.
pub fn install_agile_reference_factory(
    factory: Box<dyn AgileReferenceFactory>,
) -> std::result::Result<(), Box<dyn AgileReferenceFactory>> {
    AGILE_FACTORY.set(factory)
}

fn agile_reference_factory() -> Option<&'static dyn AgileReferenceFactory> {
    AGILE_FACTORY.get().map(Box::as_ref)
}

// =============================================================================
// AgileComPointer
// =============================================================================

/// Owning handle to a native pointer implementing `T`.
pub struct AgileComPointer<T: ComInterface> {
    state: AtomicU8,
    status: AtomicI32,
    access: RwLock<Option<Binding>>,
    _marker: PhantomData<fn() -> T>,
}

// The binding is only reachable through `access`, and thread-bound pointers
// are released with a diagnostic rather than touched off-thread.
unsafe impl<T: ComInterface> Send for AgileComPointer<T> {}
unsafe impl<T: ComInterface> Sync for AgileComPointer<T> {}

impl<T: ComInterface> AgileComPointer<T> {
    /// Bind a raw pointer known to implement `T`.
    ///
    /// Without `take_ownership` an independent reference is acquired first,
    /// so the caller's reference is left untouched.
    ///
    /// # Safety
    /// `raw` must be null or a live pointer implementing `T`; with
    /// `take_ownership` the caller must own one reference on it.
    pub unsafe fn new(raw: *mut c_void, take_ownership: bool) -> Self {
        let pointer = Self::unbound();
        if raw.is_null() {
            pointer.status.store(E_POINTER, Ordering::Relaxed);
        } else {
            // A fresh handle cannot already be bound.
            let _ = unsafe { pointer.bind(raw, take_ownership) };
        }
        pointer
    }

    /// An empty handle awaiting [`bind`](Self::bind).
    #[must_use]
    pub fn unbound() -> Self {
        Self {
            state: AtomicU8::new(UNBOUND),
            status: AtomicI32::new(S_OK),
            access: RwLock::new(None),
            _marker: PhantomData,
        }
    }

    /// An empty handle recording why it could not be produced.
    #[must_use]
    pub fn failed(status: HRESULT) -> Self {
        let pointer = Self::unbound();
        pointer.status.store(status, Ordering::Relaxed);
        pointer
    }

    /// Move an unbound handle to bound. Only the first bind succeeds; a
    /// losing caller that passed ownership has its reference released.
    ///
    /// # Safety
    /// Same contract as [`new`](Self::new).
    pub unsafe fn bind(&self, raw: *mut c_void, take_ownership: bool) -> Result<()> {
        let Some(raw) = NonNull::new(raw) else {
            return Err(Error::NullPointer);
        };

        if self
            .state
            .compare_exchange(UNBOUND, BINDING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            if take_ownership {
                unsafe { release(raw.as_ptr()) };
            }
            return Err(match self.state() {
                AgileState::Released => Error::Released,
                _ => Error::from_hresult(E_UNEXPECTED),
            });
        }

        if !take_ownership {
            unsafe { add_ref(raw.as_ptr()) };
        }
        let binding = unsafe { Self::make_binding(raw) };
        tracing::trace!(
            target: "accbridge::agile",
            iid = %T::IID,
            mode = ?binding.mode(),
            "bound native pointer"
        );

        *self.access.write() = Some(binding);
        self.status.store(S_OK, Ordering::Relaxed);
        self.state.store(BOUND, Ordering::Release);
        Ok(())
    }

    /// Decide how to hold `raw`, consuming the one reference we own on it.
    unsafe fn make_binding(raw: NonNull<c_void>) -> Binding {
        let (hr, agile) = unsafe { query_interface(raw.as_ptr(), &IAgileObject::IID) };
        if !failed(hr) && !agile.is_null() {
            unsafe { release(agile) };
            return Binding::Direct {
                ptr: raw,
                agile: true,
                owner: thread::current().id(),
            };
        }

        if let Some(factory) = agile_reference_factory() {
            match factory.create(&T::IID, raw) {
                Ok(reference) => {
                    unsafe { release(raw.as_ptr()) };
                    return Binding::Proxied { reference };
                }
                Err(error) => {
                    tracing::debug!(
                        target: "accbridge::agile",
                        %error,
                        "agile reference unavailable; holding thread-bound pointer"
                    );
                }
            }
        }

        Binding::Direct {
            ptr: raw,
            agile: false,
            owner: thread::current().id(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> AgileState {
        match self.state.load(Ordering::Acquire) {
            UNBOUND => AgileState::Unbound,
            BINDING => AgileState::Binding,
            BOUND => AgileState::Bound,
            _ => AgileState::Released,
        }
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.state() == AgileState::Bound
    }

    /// `S_OK` for a usable handle, otherwise the status it was created with.
    #[must_use]
    pub fn status(&self) -> HRESULT {
        self.status.load(Ordering::Relaxed)
    }

    /// How the reference is held, if bound.
    #[must_use]
    pub fn mode(&self) -> Option<AgileMode> {
        self.access.read().as_ref().map(Binding::mode)
    }

    /// A fresh owned reference for use on the current call stack.
    pub fn get_interface(&self) -> Result<ComScope<T>> {
        let guard = self.access.read();
        let Some(binding) = guard.as_ref() else {
            return Err(match self.state() {
                AgileState::Released => Error::Released,
                _ if failed(self.status()) => Error::from_hresult(self.status()),
                _ => Error::NullPointer,
            });
        };

        match binding {
            Binding::Direct { ptr, .. } => {
                unsafe { add_ref(ptr.as_ptr()) };
                unsafe { ComScope::from_raw(ptr.as_ptr()) }.ok_or(Error::NullPointer)
            }
            Binding::Proxied { reference } => {
                let reference = reference.as_ptr();
                let mut out = std::ptr::null_mut();
                let hr = unsafe {
                    (vtable::<IAgileReference>(reference).resolve)(reference, &T::IID, &mut out)
                };
                if failed(hr) {
                    return Err(Error::from_hresult(hr));
                }
                unsafe { ComScope::from_raw(out) }.ok_or(Error::NoInterface { iid: T::IID })
            }
        }
    }

    /// Query the held object for `U`, returning a new handle that owns the
    /// queried reference. Failure yields a handle carrying the status.
    #[must_use]
    pub fn with_interface<U: ComInterface>(&self) -> AgileComPointer<U> {
        let scope = match self.get_interface() {
            Ok(scope) => scope,
            Err(error) => return AgileComPointer::failed(error.hresult()),
        };

        let (hr, out) = unsafe { query_interface(scope.as_raw(), &U::IID) };
        if failed(hr) || out.is_null() {
            let status = if failed(hr) { hr } else { E_NOINTERFACE };
            return AgileComPointer::failed(status);
        }
        unsafe { AgileComPointer::new(out, true) }
    }

    /// Whether `other` refers to the same native object, by `IUnknown` identity.
    #[must_use]
    pub fn is_same_native_object<U: ComInterface>(&self, other: &AgileComPointer<U>) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Whether `raw` is the same native object as the held one.
    #[must_use]
    pub fn is_same_native_pointer(&self, raw: *mut c_void) -> bool {
        let theirs = unsafe { identity(raw) };
        theirs.is_some() && theirs == self.identity()
    }

    fn identity(&self) -> Option<usize> {
        let scope = self.get_interface().ok()?;
        unsafe { identity(scope.as_raw()) }
    }

    /// Release the owned reference. Exactly one caller wins; every other
    /// call, concurrent or later, is a no-op.
    pub fn dispose(&self) {
        if self
            .state
            .compare_exchange(BOUND, RELEASED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Unbound handles become terminal too, without a release.
            let _ = self.state.compare_exchange(
                UNBOUND,
                RELEASED,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            return;
        }

        let binding = self.access.write().take();
        if let Some(binding) = binding {
            unsafe { binding.release() };
        }
    }
}

impl AgileComPointer<IUnknown> {
    /// Erase the interface type, keeping the same reference.
    #[must_use]
    pub fn from_scope<T: ComInterface>(scope: ComScope<T>) -> Self {
        unsafe { Self::new(scope.into_raw(), true) }
    }
}

impl<T: ComInterface> Drop for AgileComPointer<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: ComInterface> std::fmt::Debug for AgileComPointer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgileComPointer")
            .field("iid", &T::IID)
            .field("state", &self.state())
            .field("mode", &self.mode())
            .field("status", &format_args!("0x{:08X}", self.status() as u32))
            .finish()
    }
}
