//! `IEnumVARIANT` over an accessible object's children.
//!
//! An object that enumerates its own children (`child_count() >= 0`) yields
//! one `VT_DISPATCH` per child, or `VT_I4 CHILDID_SELF` for an empty slot.
//! Otherwise the enumeration is forwarded to the system enumerator, in the
//! order `sys_child_order` imposes when the owner provides one. Without a
//! system enumerator the sequence is empty.

use std::ffi::c_void;
use std::ptr::{self, NonNull};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::accessible::AccessibleObject;
use crate::agile::AgileComPointer;
use crate::com::{
    ComInterface, ComRefCount, ComScope, E_POINTER, GUID, HRESULT, IID_IUNKNOWN, S_FALSE, S_OK, failed,
};
use crate::interfaces::{CHILDID_SELF, IAgileObject, IEnumVARIANT, IEnumVARIANTVTable};
use crate::variant::VARIANT;

/// Cursor over one owner's children.
pub struct ChildEnumerator {
    owner: Weak<AccessibleObject>,
    cursor: Mutex<u32>,
    /// A clone of a forwarding enumerator owns its own system cursor;
    /// `None` uses the owner's system enumerator.
    system: Option<AgileComPointer<IEnumVARIANT>>,
}

impl ChildEnumerator {
    pub(crate) fn new(owner: Weak<AccessibleObject>) -> Self {
        Self {
            owner,
            cursor: Mutex::new(0),
            system: None,
        }
    }

    /// Local position, or the slot in the imposed order while reordering
    /// system children. Meaningless while forwarding in system order.
    #[must_use]
    pub fn position(&self) -> u32 {
        *self.cursor.lock()
    }

    fn system<'a>(&'a self, owner: &'a AccessibleObject) -> Option<&'a AgileComPointer<IEnumVARIANT>> {
        self.system.as_ref().or_else(|| owner.system().enum_variant())
    }

    /// `IEnumVARIANT::Next`.
    ///
    /// # Safety
    /// `items` must have room for `celt` variants; `fetched` may be null
    /// only when `celt` is 1.
    pub unsafe fn next(&self, celt: u32, items: *mut VARIANT, fetched: *mut u32) -> HRESULT {
        if !fetched.is_null() {
            unsafe { *fetched = 0 };
        }
        if celt == 0 {
            return S_OK;
        }
        if items.is_null() || (fetched.is_null() && celt > 1) {
            return E_POINTER;
        }

        let Some(owner) = self.owner.upgrade() else {
            return S_FALSE;
        };

        let count = owner.child_count();
        if count >= 0 {
            let count = count.unsigned_abs();
            let mut cursor = self.cursor.lock();
            let mut n = 0u32;
            while n < celt && *cursor < count {
                let item = match owner.child(*cursor as i32) {
                    Some(child) => owner.as_child_id(Some(&child)),
                    None => VARIANT::from_i4(CHILDID_SELF),
                };
                unsafe { items.add(n as usize).write(item) };
                n += 1;
                *cursor += 1;
            }
            if !fetched.is_null() {
                unsafe { *fetched = n };
            }
            return if n == celt { S_OK } else { S_FALSE };
        }

        let order = owner.sys_child_order();
        match self.system(&owner).map(AgileComPointer::get_interface) {
            Some(Ok(system)) => match order {
                Some(order) => unsafe { self.next_reordered(&system, &order, celt, items, fetched) },
                None => unsafe { (system.vtbl().next)(system.as_raw(), celt, items, fetched) },
            },
            Some(Err(error)) => error.hresult(),
            None => S_FALSE,
        }
    }

    /// Fetch system children slot by slot, each one by its position in `order`.
    unsafe fn next_reordered(
        &self,
        system: &ComScope<IEnumVARIANT>,
        order: &[i32],
        celt: u32,
        items: *mut VARIANT,
        fetched: *mut u32,
    ) -> HRESULT {
        let mut cursor = self.cursor.lock();
        let mut n = 0u32;
        while n < celt {
            let Some(&position) = order.get(*cursor as usize) else {
                break;
            };
            if !unsafe { goto_item(system, position, items.add(n as usize)) } {
                tracing::debug!(target: "accbridge::enum_variant", position, "system child order names a missing child");
                break;
            }
            n += 1;
            *cursor += 1;
        }
        if !fetched.is_null() {
            unsafe { *fetched = n };
        }
        if n == celt { S_OK } else { S_FALSE }
    }

    /// `IEnumVARIANT::Skip`.
    pub fn skip(&self, celt: u32) -> HRESULT {
        let Some(owner) = self.owner.upgrade() else {
            return S_FALSE;
        };

        let count = owner.child_count();
        if count >= 0 {
            let mut cursor = self.cursor.lock();
            let remaining = count.unsigned_abs().saturating_sub(*cursor);
            let step = celt.min(remaining);
            *cursor += step;
            return if step == celt { S_OK } else { S_FALSE };
        }

        if let Some(order) = owner.sys_child_order() {
            let mut cursor = self.cursor.lock();
            let remaining = u32::try_from(order.len()).unwrap_or(u32::MAX).saturating_sub(*cursor);
            let step = celt.min(remaining);
            *cursor += step;
            return if step == celt { S_OK } else { S_FALSE };
        }

        match self.system(&owner).map(AgileComPointer::get_interface) {
            Some(Ok(system)) => unsafe { (system.vtbl().skip)(system.as_raw(), celt) },
            Some(Err(error)) => error.hresult(),
            None if celt == 0 => S_OK,
            None => S_FALSE,
        }
    }

    /// `IEnumVARIANT::Reset`.
    pub fn reset(&self) -> HRESULT {
        *self.cursor.lock() = 0;

        let Some(owner) = self.owner.upgrade() else {
            return S_OK;
        };
        if owner.child_count() >= 0 {
            return S_OK;
        }
        match self.system(&owner).map(AgileComPointer::get_interface) {
            Some(Ok(system)) => unsafe { (system.vtbl().reset)(system.as_raw()) },
            Some(Err(error)) => error.hresult(),
            None => S_OK,
        }
    }

    /// An independent enumerator at the same position.
    pub fn try_clone(&self) -> crate::Result<Self> {
        let owner = self.owner.upgrade();
        let forwarding = owner.as_ref().is_some_and(|owner| owner.child_count() < 0);

        let system = match owner.as_deref().and_then(|owner| self.system(owner)) {
            Some(system) if forwarding => {
                let system = system.get_interface()?;
                let mut out = ptr::null_mut();
                let hr = unsafe { (system.vtbl().clone)(system.as_raw(), &mut out) };
                if failed(hr) {
                    return Err(crate::Error::from_hresult(hr));
                }
                if out.is_null() {
                    return Err(crate::Error::NullPointer);
                }
                Some(unsafe { AgileComPointer::new(out, true) })
            }
            _ => None,
        };

        Ok(Self {
            owner: self.owner.clone(),
            cursor: Mutex::new(self.position()),
            system,
        })
    }

    /// `IEnumVARIANT::Clone`: a new native enumerator that keeps the owner alive.
    ///
    /// # Safety
    /// `result` must be null or valid for a pointer write.
    pub unsafe fn clone_into(&self, result: *mut *mut c_void) -> HRESULT {
        if result.is_null() {
            return E_POINTER;
        }
        unsafe { *result = ptr::null_mut() };

        match self.try_clone() {
            Ok(state) => {
                let owner = state.owner.upgrade();
                unsafe { *result = EnumVariantCcw::create(state, owner).as_ptr() };
                S_OK
            }
            Err(error) => error.hresult(),
        }
    }
}

/// Read the system child at `position` into `item`: reset, skip, then fetch one.
unsafe fn goto_item(system: &ComScope<IEnumVARIANT>, position: i32, item: *mut VARIANT) -> bool {
    let Ok(position) = u32::try_from(position) else {
        return false;
    };
    let mut fetched = 0u32;
    unsafe {
        (system.vtbl().reset)(system.as_raw());
        if failed((system.vtbl().skip)(system.as_raw(), position)) {
            return false;
        }
        (system.vtbl().next)(system.as_raw(), 1, item, &mut fetched);
    }
    fetched == 1
}

impl std::fmt::Debug for ChildEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildEnumerator")
            .field("position", &self.position())
            .field("forwarding", &self.system.is_some())
            .finish()
    }
}

// =============================================================================
// Standalone wrapper for cloned enumerators
// =============================================================================

#[repr(C)]
struct EnumVariantCcw {
    vtbl: *const IEnumVARIANTVTable,
    ref_count: ComRefCount,
    state: ChildEnumerator,
    _owner: Option<Arc<AccessibleObject>>,
}

crate::iunknown_thunks!(EnumVariantCcw);

static ENUM_VARIANT_VTABLE: IEnumVARIANTVTable = IEnumVARIANTVTable {
    base: iunknown_base::<0>(),
    next: enum_next,
    skip: enum_skip,
    reset: enum_reset,
    clone: enum_clone,
};

unsafe extern "system" fn enum_next(this: *mut c_void, celt: u32, items: *mut VARIANT, fetched: *mut u32) -> HRESULT {
    crate::com_method!(this, ccw: EnumVariantCcw[vtbl] => unsafe { ccw.state.next(celt, items, fetched) })
}

unsafe extern "system" fn enum_skip(this: *mut c_void, celt: u32) -> HRESULT {
    crate::com_method!(this, ccw: EnumVariantCcw[vtbl] => ccw.state.skip(celt))
}

unsafe extern "system" fn enum_reset(this: *mut c_void) -> HRESULT {
    crate::com_method!(this, ccw: EnumVariantCcw[vtbl] => ccw.state.reset())
}

unsafe extern "system" fn enum_clone(this: *mut c_void, result: *mut *mut c_void) -> HRESULT {
    crate::com_method!(this, ccw: EnumVariantCcw[vtbl] => unsafe { ccw.state.clone_into(result) })
}

impl EnumVariantCcw {
    fn create(state: ChildEnumerator, owner: Option<Arc<AccessibleObject>>) -> NonNull<c_void> {
        let ccw = Box::new(Self {
            vtbl: &ENUM_VARIANT_VTABLE,
            ref_count: ComRefCount::new(),
            state,
            _owner: owner,
        });
        NonNull::from(Box::leak(ccw)).cast()
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
        if *riid != IID_IUNKNOWN && *riid != IEnumVARIANT::IID && *riid != IAgileObject::IID {
            return crate::E_NOINTERFACE;
        }
        self.ref_count.add_ref();
        unsafe { *ppv = self as *const Self as *mut c_void };
        S_OK
    }

    unsafe fn final_release(this: *mut Self) {
        drop(unsafe { Box::from_raw(this) });
    }
}
