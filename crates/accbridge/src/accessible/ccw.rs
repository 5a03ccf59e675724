//! The native wrapper of an [`AccessibleObject`].
//!
//! One `#[repr(C)]` allocation carries a vtable pointer per interface. The
//! `IAccessible` slot sits at offset 0 and doubles as the `IUnknown`,
//! `IDispatch` and `IAgileObject` identity.

use std::ffi::c_void;
use std::mem::offset_of;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr::{self, NonNull};
use std::sync::Arc;

use super::{AccessibleObject, dispatch, uia};
use crate::bstr::{self, BSTR, SAFEARRAY};
use crate::com::{
    ComInterface, ComRefCount, ComScope, E_FAIL, E_INVALIDARG, E_NOINTERFACE, E_NOTIMPL, E_POINTER,
    GUID, HRESULT, IID_IUNKNOWN, S_FALSE, S_OK,
};
use crate::error::{Error, Result};
use crate::interfaces::*;
use crate::resolver::{ComHelpers, NativeWrapper, ObjectRef, WrapperSource, downcast};
use crate::variant::{ScopedVariant, VARIANT};

// =============================================================================
// Layout
// =============================================================================

#[repr(C)]
pub(super) struct AccessibleCcw {
    pub(super) vtbl_accessible: *const IAccessibleVTable,
    pub(super) vtbl_dispatch_ex: *const IDispatchExVTable,
    pub(super) vtbl_enum: *const IEnumVARIANTVTable,
    pub(super) vtbl_ole_window: *const IOleWindowVTable,
    pub(super) vtbl_service: *const IServiceProviderVTable,
    pub(super) vtbl_accessible_ex: *const IAccessibleExVTable,
    pub(super) vtbl_simple: *const IRawElementProviderSimpleVTable,
    pub(super) vtbl_fragment: *const IRawElementProviderFragmentVTable,
    pub(super) vtbl_fragment_root: *const IRawElementProviderFragmentRootVTable,
    pub(super) vtbl_legacy: *const ILegacyIAccessibleProviderVTable,
    pub(super) vtbl_invoke: *const IInvokeProviderVTable,
    pub(super) vtbl_toggle: *const IToggleProviderVTable,
    pub(super) vtbl_value: *const IValueProviderVTable,
    pub(super) vtbl_range_value: *const IRangeValueProviderVTable,
    pub(super) vtbl_expand_collapse: *const IExpandCollapseProviderVTable,
    pub(super) vtbl_selection: *const ISelectionProviderVTable,
    pub(super) vtbl_selection_item: *const ISelectionItemProviderVTable,
    pub(super) vtbl_scroll_item: *const IScrollItemProviderVTable,
    pub(super) vtbl_grid: *const IGridProviderVTable,
    pub(super) vtbl_grid_item: *const IGridItemProviderVTable,
    pub(super) vtbl_identity: *const IManagedIdentityVTable,
    ref_count: ComRefCount,
    key: usize,
    pub(super) object: Arc<AccessibleObject>,
}

const DISPATCH_EX: usize = offset_of!(AccessibleCcw, vtbl_dispatch_ex);
const ENUM: usize = offset_of!(AccessibleCcw, vtbl_enum);
const OLE_WINDOW: usize = offset_of!(AccessibleCcw, vtbl_ole_window);
const SERVICE: usize = offset_of!(AccessibleCcw, vtbl_service);
const ACCESSIBLE_EX: usize = offset_of!(AccessibleCcw, vtbl_accessible_ex);
const SIMPLE: usize = offset_of!(AccessibleCcw, vtbl_simple);
const FRAGMENT: usize = offset_of!(AccessibleCcw, vtbl_fragment);
const FRAGMENT_ROOT: usize = offset_of!(AccessibleCcw, vtbl_fragment_root);
const LEGACY: usize = offset_of!(AccessibleCcw, vtbl_legacy);
const INVOKE: usize = offset_of!(AccessibleCcw, vtbl_invoke);
const TOGGLE: usize = offset_of!(AccessibleCcw, vtbl_toggle);
const VALUE: usize = offset_of!(AccessibleCcw, vtbl_value);
const RANGE_VALUE: usize = offset_of!(AccessibleCcw, vtbl_range_value);
const EXPAND_COLLAPSE: usize = offset_of!(AccessibleCcw, vtbl_expand_collapse);
const SELECTION: usize = offset_of!(AccessibleCcw, vtbl_selection);
const SELECTION_ITEM: usize = offset_of!(AccessibleCcw, vtbl_selection_item);
const SCROLL_ITEM: usize = offset_of!(AccessibleCcw, vtbl_scroll_item);
const GRID: usize = offset_of!(AccessibleCcw, vtbl_grid);
const GRID_ITEM: usize = offset_of!(AccessibleCcw, vtbl_grid_item);
const IDENTITY: usize = offset_of!(AccessibleCcw, vtbl_identity);

crate::iunknown_thunks!(AccessibleCcw);

// =============================================================================
// VTables
// =============================================================================

static ACCESSIBLE_VTABLE: IAccessibleVTable = IAccessibleVTable {
    base: dispatch::idispatch_vtable::<0>(iunknown_base::<0>()),
    get_acc_parent: acc_get_parent,
    get_acc_child_count: acc_get_child_count,
    get_acc_child: acc_get_child,
    get_acc_name: acc_get_name,
    get_acc_value: acc_get_value,
    get_acc_description: acc_get_description,
    get_acc_role: acc_get_role,
    get_acc_state: acc_get_state,
    get_acc_help: acc_get_help,
    get_acc_help_topic: acc_get_help_topic,
    get_acc_keyboard_shortcut: acc_get_keyboard_shortcut,
    get_acc_focus: acc_get_focus,
    get_acc_selection: acc_get_selection,
    get_acc_default_action: acc_get_default_action,
    acc_select,
    acc_location,
    acc_navigate,
    acc_hit_test,
    acc_do_default_action,
    put_acc_name: acc_put_name,
    put_acc_value: acc_put_value,
};

static DISPATCH_EX_VTABLE: IDispatchExVTable = IDispatchExVTable {
    base: dispatch::idispatch_vtable::<DISPATCH_EX>(iunknown_base::<DISPATCH_EX>()),
    get_disp_id: dispatch::get_disp_id,
    invoke_ex: dispatch::invoke_ex,
    delete_member_by_name: dispatch::delete_member_by_name,
    delete_member_by_disp_id: dispatch::delete_member_by_disp_id,
    get_member_properties: dispatch::get_member_properties,
    get_member_name: dispatch::get_member_name,
    get_next_disp_id: dispatch::get_next_disp_id,
    get_name_space_parent: dispatch::get_name_space_parent,
};

static ENUM_VTABLE: IEnumVARIANTVTable = IEnumVARIANTVTable {
    base: iunknown_base::<ENUM>(),
    next: enum_next,
    skip: enum_skip,
    reset: enum_reset,
    clone: enum_clone,
};

static OLE_WINDOW_VTABLE: IOleWindowVTable = IOleWindowVTable {
    base: iunknown_base::<OLE_WINDOW>(),
    get_window: ole_get_window,
    context_sensitive_help: ole_context_sensitive_help,
};

static SERVICE_VTABLE: IServiceProviderVTable = IServiceProviderVTable {
    base: iunknown_base::<SERVICE>(),
    query_service,
};

static ACCESSIBLE_EX_VTABLE: IAccessibleExVTable = IAccessibleExVTable {
    base: iunknown_base::<ACCESSIBLE_EX>(),
    get_object_for_child: ex_get_object_for_child,
    get_iaccessible_pair: ex_get_iaccessible_pair,
    get_runtime_id: ex_get_runtime_id,
    convert_returned_element: ex_convert_returned_element,
};

static SIMPLE_VTABLE: IRawElementProviderSimpleVTable = IRawElementProviderSimpleVTable {
    base: iunknown_base::<SIMPLE>(),
    get_provider_options: uia::simple_provider_options,
    get_pattern_provider: uia::simple_pattern_provider,
    get_property_value: uia::simple_property_value,
    get_host_raw_element_provider: uia::simple_host_provider,
};

static FRAGMENT_VTABLE: IRawElementProviderFragmentVTable = IRawElementProviderFragmentVTable {
    base: iunknown_base::<FRAGMENT>(),
    navigate: uia::fragment_navigate,
    get_runtime_id: uia::fragment_runtime_id,
    get_bounding_rectangle: uia::fragment_bounding_rectangle,
    get_embedded_fragment_roots: uia::fragment_embedded_roots,
    set_focus: uia::fragment_set_focus,
    get_fragment_root: uia::fragment_root,
};

static FRAGMENT_ROOT_VTABLE: IRawElementProviderFragmentRootVTable = IRawElementProviderFragmentRootVTable {
    base: iunknown_base::<FRAGMENT_ROOT>(),
    element_provider_from_point: uia::root_element_from_point,
    get_focus: uia::root_focus,
};

static LEGACY_VTABLE: ILegacyIAccessibleProviderVTable = ILegacyIAccessibleProviderVTable {
    base: iunknown_base::<LEGACY>(),
    select: uia::legacy_select,
    do_default_action: uia::legacy_do_default_action,
    set_value: uia::legacy_set_value,
    get_iaccessible: uia::legacy_iaccessible,
    get_child_id: uia::legacy_child_id,
    get_name: uia::legacy_name,
    get_value: uia::legacy_value,
    get_description: uia::legacy_description,
    get_role: uia::legacy_role,
    get_state: uia::legacy_state,
    get_help: uia::legacy_help,
    get_keyboard_shortcut: uia::legacy_keyboard_shortcut,
    get_selection: uia::legacy_selection,
    get_default_action: uia::legacy_default_action,
};

static INVOKE_VTABLE: IInvokeProviderVTable = IInvokeProviderVTable {
    base: iunknown_base::<INVOKE>(),
    invoke: uia::invoke,
};

static TOGGLE_VTABLE: IToggleProviderVTable = IToggleProviderVTable {
    base: iunknown_base::<TOGGLE>(),
    toggle: uia::toggle,
    get_toggle_state: uia::toggle_state,
};

static VALUE_VTABLE: IValueProviderVTable = IValueProviderVTable {
    base: iunknown_base::<VALUE>(),
    set_value: uia::value_set,
    get_value: uia::value_get,
    get_is_read_only: uia::value_is_read_only,
};

static RANGE_VALUE_VTABLE: IRangeValueProviderVTable = IRangeValueProviderVTable {
    base: iunknown_base::<RANGE_VALUE>(),
    set_value: uia::range_set_value,
    get_value: uia::range_value,
    get_is_read_only: uia::range_is_read_only,
    get_maximum: uia::range_maximum,
    get_minimum: uia::range_minimum,
    get_large_change: uia::range_large_change,
    get_small_change: uia::range_small_change,
};

static EXPAND_COLLAPSE_VTABLE: IExpandCollapseProviderVTable = IExpandCollapseProviderVTable {
    base: iunknown_base::<EXPAND_COLLAPSE>(),
    expand: uia::expand,
    collapse: uia::collapse,
    get_expand_collapse_state: uia::expand_collapse_state,
};

static SELECTION_VTABLE: ISelectionProviderVTable = ISelectionProviderVTable {
    base: iunknown_base::<SELECTION>(),
    get_selection: uia::selection,
    get_can_select_multiple: uia::selection_can_select_multiple,
    get_is_selection_required: uia::selection_is_required,
};

static SELECTION_ITEM_VTABLE: ISelectionItemProviderVTable = ISelectionItemProviderVTable {
    base: iunknown_base::<SELECTION_ITEM>(),
    select: uia::item_select,
    add_to_selection: uia::item_add_to_selection,
    remove_from_selection: uia::item_remove_from_selection,
    get_is_selected: uia::item_is_selected,
    get_selection_container: uia::item_selection_container,
};

static SCROLL_ITEM_VTABLE: IScrollItemProviderVTable = IScrollItemProviderVTable {
    base: iunknown_base::<SCROLL_ITEM>(),
    scroll_into_view: uia::scroll_into_view,
};

static GRID_VTABLE: IGridProviderVTable = IGridProviderVTable {
    base: iunknown_base::<GRID>(),
    get_item: uia::grid_item,
    get_row_count: uia::grid_row_count,
    get_column_count: uia::grid_column_count,
};

static GRID_ITEM_VTABLE: IGridItemProviderVTable = IGridItemProviderVTable {
    base: iunknown_base::<GRID_ITEM>(),
    get_row: uia::grid_item_row,
    get_column: uia::grid_item_column,
    get_row_span: uia::grid_item_row_span,
    get_column_span: uia::grid_item_column_span,
    get_containing_grid: uia::grid_item_containing_grid,
};

static IDENTITY_VTABLE: IManagedIdentityVTable = IManagedIdentityVTable {
    base: iunknown_base::<IDENTITY>(),
    get_instance_key: identity_instance_key,
};

// =============================================================================
// Creation, identity and lifetime
// =============================================================================

/// Produces the wrapper for [`AccessibleObject`]s.
pub(super) struct AccessibleWrappers;

pub(super) static ACCESSIBLE_WRAPPERS: AccessibleWrappers = AccessibleWrappers;

impl WrapperSource for AccessibleWrappers {
    fn create_wrapper(&self, object: ObjectRef, key: usize) -> Result<NativeWrapper> {
        let object = downcast::<AccessibleObject>(&object).ok_or(Error::NoInterface { iid: IAccessible::IID })?;
        Ok(AccessibleCcw::create(object, key))
    }
}

impl AccessibleCcw {
    fn create(object: Arc<AccessibleObject>, key: usize) -> NativeWrapper {
        let ccw = Box::new(Self {
            vtbl_accessible: &ACCESSIBLE_VTABLE,
            vtbl_dispatch_ex: &DISPATCH_EX_VTABLE,
            vtbl_enum: &ENUM_VTABLE,
            vtbl_ole_window: &OLE_WINDOW_VTABLE,
            vtbl_service: &SERVICE_VTABLE,
            vtbl_accessible_ex: &ACCESSIBLE_EX_VTABLE,
            vtbl_simple: &SIMPLE_VTABLE,
            vtbl_fragment: &FRAGMENT_VTABLE,
            vtbl_fragment_root: &FRAGMENT_ROOT_VTABLE,
            vtbl_legacy: &LEGACY_VTABLE,
            vtbl_invoke: &INVOKE_VTABLE,
            vtbl_toggle: &TOGGLE_VTABLE,
            vtbl_value: &VALUE_VTABLE,
            vtbl_range_value: &RANGE_VALUE_VTABLE,
            vtbl_expand_collapse: &EXPAND_COLLAPSE_VTABLE,
            vtbl_selection: &SELECTION_VTABLE,
            vtbl_selection_item: &SELECTION_ITEM_VTABLE,
            vtbl_scroll_item: &SCROLL_ITEM_VTABLE,
            vtbl_grid: &GRID_VTABLE,
            vtbl_grid_item: &GRID_ITEM_VTABLE,
            vtbl_identity: &IDENTITY_VTABLE,
            ref_count: ComRefCount::new(),
            key,
            object,
        });
        NativeWrapper {
            identity: NonNull::from(Box::leak(ccw)).cast(),
            revive: Self::revive,
        }
    }

    unsafe fn revive(identity: usize) -> bool {
        let ccw = unsafe { &*(identity as *const Self) };
        ccw.ref_count.try_add_ref()
    }

    /// The vtable slot answering `riid`, if this object exposes it.
    fn interface_slot(&self, riid: &GUID) -> Option<*const c_void> {
        let object = &*self.object;
        let behavior = object.behavior();
        let supports = |pattern_id| behavior.is_pattern_supported(object, pattern_id);

        let slot: *const c_void = if *riid == IID_IUNKNOWN
            || *riid == IDispatch::IID
            || *riid == IAccessible::IID
            || *riid == IAgileObject::IID
        {
            ptr::addr_of!(self.vtbl_accessible).cast()
        } else if *riid == IDispatchEx::IID {
            ptr::addr_of!(self.vtbl_dispatch_ex).cast()
        } else if *riid == IEnumVARIANT::IID {
            ptr::addr_of!(self.vtbl_enum).cast()
        } else if *riid == IOleWindow::IID {
            ptr::addr_of!(self.vtbl_ole_window).cast()
        } else if *riid == IServiceProvider::IID {
            ptr::addr_of!(self.vtbl_service).cast()
        } else if *riid == IAccessibleEx::IID {
            if !behavior.is_iaccessible_ex_supported(object) {
                return None;
            }
            ptr::addr_of!(self.vtbl_accessible_ex).cast()
        } else if *riid == IRawElementProviderSimple::IID {
            ptr::addr_of!(self.vtbl_simple).cast()
        } else if *riid == IRawElementProviderFragment::IID {
            ptr::addr_of!(self.vtbl_fragment).cast()
        } else if *riid == IRawElementProviderFragmentRoot::IID {
            ptr::addr_of!(self.vtbl_fragment_root).cast()
        } else if *riid == ILegacyIAccessibleProvider::IID {
            ptr::addr_of!(self.vtbl_legacy).cast()
        } else if *riid == IInvokeProvider::IID && supports(pattern::INVOKE) {
            ptr::addr_of!(self.vtbl_invoke).cast()
        } else if *riid == IToggleProvider::IID && supports(pattern::TOGGLE) {
            ptr::addr_of!(self.vtbl_toggle).cast()
        } else if *riid == IValueProvider::IID && supports(pattern::VALUE) {
            ptr::addr_of!(self.vtbl_value).cast()
        } else if *riid == IRangeValueProvider::IID && supports(pattern::RANGE_VALUE) {
            ptr::addr_of!(self.vtbl_range_value).cast()
        } else if *riid == IExpandCollapseProvider::IID && supports(pattern::EXPAND_COLLAPSE) {
            ptr::addr_of!(self.vtbl_expand_collapse).cast()
        } else if *riid == ISelectionProvider::IID && supports(pattern::SELECTION) {
            ptr::addr_of!(self.vtbl_selection).cast()
        } else if *riid == ISelectionItemProvider::IID && supports(pattern::SELECTION_ITEM) {
            ptr::addr_of!(self.vtbl_selection_item).cast()
        } else if *riid == IScrollItemProvider::IID && supports(pattern::SCROLL_ITEM) {
            ptr::addr_of!(self.vtbl_scroll_item).cast()
        } else if *riid == IGridProvider::IID && supports(pattern::GRID) {
            ptr::addr_of!(self.vtbl_grid).cast()
        } else if *riid == IGridItemProvider::IID && supports(pattern::GRID_ITEM) {
            ptr::addr_of!(self.vtbl_grid_item).cast()
        } else if *riid == IManagedIdentity::IID {
            ptr::addr_of!(self.vtbl_identity).cast()
        } else {
            return None;
        };
        Some(slot)
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
        // Pattern checks run behavior code.
        let slot = match catch_unwind(AssertUnwindSafe(|| self.interface_slot(riid))) {
            Ok(Some(slot)) => slot,
            Ok(None) => return E_NOINTERFACE,
            Err(_) => {
                tracing::error!(target: "accbridge::boundary", iid = ?riid, "panic caught in QueryInterface");
                return E_FAIL;
            }
        };

        self.hand_out(slot, ppv);
        S_OK
    }

    /// Give the caller one new reference through `slot`.
    fn hand_out(&self, slot: *const c_void, ppv: *mut *mut c_void) {
        self.ref_count.add_ref();
        unsafe { *ppv = slot as *mut c_void };
    }

    unsafe fn final_release(this: *mut Self) {
        let ccw = unsafe { Box::from_raw(this) };
        ComHelpers::global().forget_wrapper(ccw.key, this as usize);
        tracing::trace!(target: "accbridge::accessible", key = ccw.key, "accessible wrapper released");
        drop(ccw);
    }
}

unsafe extern "system" fn identity_instance_key(this: *mut c_void, key: *mut usize) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_identity] => {
        crate::write_out!(key, ccw.key);
        S_OK
    })
}

// =============================================================================
// Out-parameter helpers
// =============================================================================

/// A string result: `None` is a null `BSTR` with `S_OK`.
pub(super) fn write_bstr(out: *mut BSTR, value: Result<Option<String>>) -> HRESULT {
    if out.is_null() {
        return E_POINTER;
    }
    unsafe { *out = ptr::null_mut() };
    match value {
        Ok(Some(text)) => {
            unsafe { *out = bstr::alloc(&text) };
            S_OK
        }
        Ok(None) => S_OK,
        Err(error) => error.hresult(),
    }
}

fn write_variant(out: *mut VARIANT, value: Result<ScopedVariant>) -> HRESULT {
    if out.is_null() {
        return E_POINTER;
    }
    match value {
        Ok(variant) => {
            unsafe { out.write(variant.into_raw()) };
            S_OK
        }
        Err(error) => {
            unsafe { out.write(VARIANT::empty()) };
            error.hresult()
        }
    }
}

/// An optional integer as `VT_I4`, or `VT_EMPTY` when absent.
fn write_i4(out: *mut VARIANT, value: Result<Option<i32>>) -> HRESULT {
    if out.is_null() {
        return E_POINTER;
    }
    unsafe { out.write(VARIANT::empty()) };
    match value {
        Ok(value) => {
            if let Some(value) = value {
                unsafe { out.write(VARIANT::from_i4(value)) };
            }
            S_OK
        }
        Err(error) => error.hresult(),
    }
}

fn write_dispatch(out: *mut *mut c_void, value: Result<Option<ComScope<IDispatch>>>, missing: HRESULT) -> HRESULT {
    if out.is_null() {
        return E_POINTER;
    }
    unsafe { *out = ptr::null_mut() };
    match value {
        Ok(Some(dispatch)) => {
            unsafe { *out = dispatch.into_raw() };
            S_OK
        }
        Ok(None) => missing,
        Err(error) => error.hresult(),
    }
}

/// A provider pointer of interface `T` for `object`; null when absent.
pub(super) fn write_provider<T: ComInterface>(out: *mut *mut c_void, object: Option<Arc<AccessibleObject>>) -> HRESULT {
    if out.is_null() {
        return E_POINTER;
    }
    unsafe { *out = ptr::null_mut() };
    let Some(object) = object else {
        return S_OK;
    };
    match ComHelpers::global().get_com_pointer::<T>(&object.as_object_ref()) {
        Ok(provider) => {
            unsafe { *out = provider.into_raw() };
            S_OK
        }
        Err(error) => error.hresult(),
    }
}

/// An `IUnknown` array of simple providers, skipping objects without a wrapper.
pub(super) fn provider_array(objects: Vec<Arc<AccessibleObject>>) -> *mut SAFEARRAY {
    let elements = objects
        .iter()
        .filter_map(|object| {
            ComHelpers::global()
                .get_com_pointer::<IRawElementProviderSimple>(&object.as_object_ref())
                .ok()
        })
        .map(ComScope::into_raw)
        .collect();
    bstr::unknown_vector(elements)
}

/// The runtime id as an `i32` array; `E_NOTIMPL` when the object has none.
pub(super) fn write_runtime_id(object: &AccessibleObject, out: *mut *mut SAFEARRAY) -> HRESULT {
    if out.is_null() {
        return E_POINTER;
    }
    unsafe { *out = ptr::null_mut() };
    match object.behavior().runtime_id(object) {
        Some(id) => {
            let array = bstr::i32_vector(&id);
            if array.is_null() {
                return crate::E_OUTOFMEMORY;
            }
            unsafe { *out = array };
            S_OK
        }
        None => E_NOTIMPL,
    }
}

// =============================================================================
// IAccessible
// =============================================================================

unsafe extern "system" fn acc_get_parent(this: *mut c_void, parent: *mut *mut c_void) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        write_dispatch(parent, ccw.object.acc_parent(), S_OK)
    })
}

unsafe extern "system" fn acc_get_child_count(this: *mut c_void, count: *mut i32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        if count.is_null() {
            return E_POINTER;
        }
        match ccw.object.acc_child_count() {
            Ok(n) => {
                unsafe { *count = n };
                S_OK
            }
            Err(error) => error.hresult(),
        }
    })
}

unsafe extern "system" fn acc_get_child(this: *mut c_void, child: VARIANT, dispatch: *mut *mut c_void) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        // A child without its own object is a simple element: S_FALSE.
        write_dispatch(dispatch, ccw.object.acc_child(&child), S_FALSE)
    })
}

unsafe extern "system" fn acc_get_name(this: *mut c_void, child: VARIANT, name: *mut BSTR) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        write_bstr(name, ccw.object.acc_name(&child))
    })
}

unsafe extern "system" fn acc_get_value(this: *mut c_void, child: VARIANT, value: *mut BSTR) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        write_bstr(value, ccw.object.acc_value(&child))
    })
}

unsafe extern "system" fn acc_get_description(this: *mut c_void, child: VARIANT, description: *mut BSTR) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        write_bstr(description, ccw.object.acc_description(&child))
    })
}

unsafe extern "system" fn acc_get_role(this: *mut c_void, child: VARIANT, role: *mut VARIANT) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        write_i4(role, ccw.object.acc_role(&child))
    })
}

unsafe extern "system" fn acc_get_state(this: *mut c_void, child: VARIANT, state: *mut VARIANT) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        write_i4(state, ccw.object.acc_state(&child))
    })
}

unsafe extern "system" fn acc_get_help(this: *mut c_void, child: VARIANT, help: *mut BSTR) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        write_bstr(help, ccw.object.acc_help(&child))
    })
}

unsafe extern "system" fn acc_get_help_topic(
    this: *mut c_void,
    help_file: *mut BSTR,
    child: VARIANT,
    topic: *mut i32,
) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        if help_file.is_null() || topic.is_null() {
            return E_POINTER;
        }
        unsafe { *topic = -1 };
        match ccw.object.acc_help_topic(&child) {
            Ok((file, id)) => {
                unsafe { *topic = id };
                write_bstr(help_file, Ok(file))
            }
            Err(error) => {
                unsafe { *help_file = ptr::null_mut() };
                error.hresult()
            }
        }
    })
}

unsafe extern "system" fn acc_get_keyboard_shortcut(this: *mut c_void, child: VARIANT, shortcut: *mut BSTR) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        write_bstr(shortcut, ccw.object.acc_keyboard_shortcut(&child))
    })
}

unsafe extern "system" fn acc_get_focus(this: *mut c_void, child: *mut VARIANT) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        write_variant(child, ccw.object.acc_focus())
    })
}

unsafe extern "system" fn acc_get_selection(this: *mut c_void, children: *mut VARIANT) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        write_variant(children, ccw.object.acc_selection())
    })
}

unsafe extern "system" fn acc_get_default_action(this: *mut c_void, child: VARIANT, action: *mut BSTR) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        write_bstr(action, ccw.object.acc_default_action(&child))
    })
}

unsafe extern "system" fn acc_select(this: *mut c_void, flags: i32, child: VARIANT) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_accessible] => ccw.object.acc_select(flags, &child))
}

unsafe extern "system" fn acc_location(
    this: *mut c_void,
    left: *mut i32,
    top: *mut i32,
    width: *mut i32,
    height: *mut i32,
    child: VARIANT,
) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        if left.is_null() || top.is_null() || width.is_null() || height.is_null() {
            return E_POINTER;
        }
        match ccw.object.acc_location(&child) {
            Ok(rect) => {
                unsafe {
                    *left = rect.left;
                    *top = rect.top;
                    *width = rect.width;
                    *height = rect.height;
                }
                S_OK
            }
            Err(error) => error.hresult(),
        }
    })
}

unsafe extern "system" fn acc_navigate(this: *mut c_void, direction: i32, start: VARIANT, end: *mut VARIANT) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        write_variant(end, ccw.object.acc_navigate(direction, &start))
    })
}

unsafe extern "system" fn acc_hit_test(this: *mut c_void, x: i32, y: i32, child: *mut VARIANT) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        write_variant(child, ccw.object.acc_hit_test(x, y))
    })
}

unsafe extern "system" fn acc_do_default_action(this: *mut c_void, child: VARIANT) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_accessible] => ccw.object.acc_do_default_action(&child))
}

unsafe extern "system" fn acc_put_name(this: *mut c_void, child: VARIANT, name: BSTR) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        let name = unsafe { bstr::to_string(name) };
        ccw.object.acc_set_name(&child, &name)
    })
}

unsafe extern "system" fn acc_put_value(this: *mut c_void, child: VARIANT, value: BSTR) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_accessible] => {
        let value = unsafe { bstr::to_string(value) };
        ccw.object.acc_set_value(&child, &value)
    })
}

// =============================================================================
// IEnumVARIANT
// =============================================================================

unsafe extern "system" fn enum_next(this: *mut c_void, celt: u32, items: *mut VARIANT, fetched: *mut u32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_enum] => unsafe {
        ccw.object.enumerator().next(celt, items, fetched)
    })
}

unsafe extern "system" fn enum_skip(this: *mut c_void, celt: u32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_enum] => ccw.object.enumerator().skip(celt))
}

unsafe extern "system" fn enum_reset(this: *mut c_void) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_enum] => ccw.object.enumerator().reset())
}

unsafe extern "system" fn enum_clone(this: *mut c_void, result: *mut *mut c_void) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_enum] => unsafe {
        ccw.object.enumerator().clone_into(result)
    })
}

// =============================================================================
// IOleWindow
// =============================================================================

impl AccessibleObject {
    /// The window of the system object, else of the nearest parent that has one.
    pub fn window(&self) -> Result<HWND> {
        self.with_nearest_window(|window| window.window())?
            .ok_or(Error::Native(E_FAIL))
    }

    /// Context help along the same chain; a parentless object accepts it.
    pub fn context_sensitive_help(&self, enter_mode: bool) -> Result<()> {
        Ok(self
            .with_nearest_window(|window| window.context_sensitive_help(enter_mode))?
            .unwrap_or_default())
    }

    /// Run `call` on the first system window found walking up from this
    /// object. `None` when the chain ends, or loops, without one.
    fn with_nearest_window<R>(
        &self,
        call: impl FnOnce(&crate::agile::AgileComPointer<IOleWindow>) -> Result<R>,
    ) -> Result<Option<R>> {
        if let Some(window) = self.system.ole_window() {
            return call(window).map(Some);
        }

        let mut visited = vec![ptr::from_ref(self)];
        let mut next = self.parent()?;
        while let Some(object) = next {
            if visited.contains(&Arc::as_ptr(&object)) {
                tracing::warn!(target: "accbridge::accessible", "parent chain loops back on itself");
                return Ok(None);
            }
            if let Some(window) = object.system.ole_window() {
                return call(window).map(Some);
            }
            visited.push(Arc::as_ptr(&object));
            next = object.parent()?;
        }
        Ok(None)
    }
}

unsafe extern "system" fn ole_get_window(this: *mut c_void, hwnd: *mut HWND) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_ole_window] => {
        if hwnd.is_null() {
            return E_POINTER;
        }
        unsafe { *hwnd = ptr::null_mut() };
        match ccw.object.window() {
            Ok(window) => {
                unsafe { *hwnd = window };
                S_OK
            }
            Err(error) => error.hresult(),
        }
    })
}

unsafe extern "system" fn ole_context_sensitive_help(this: *mut c_void, enter_mode: i32) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_ole_window] => {
        ccw.object.context_sensitive_help(enter_mode != 0)
    })
}

// =============================================================================
// IServiceProvider and IAccessibleEx
// =============================================================================

unsafe extern "system" fn query_service(
    this: *mut c_void,
    service: *const GUID,
    riid: *const GUID,
    ppv: *mut *mut c_void,
) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_service] => {
        if service.is_null() || riid.is_null() {
            return E_NOINTERFACE;
        }
        if ppv.is_null() {
            return E_POINTER;
        }
        unsafe { *ppv = ptr::null_mut() };

        let (service, riid) = unsafe { (&*service, &*riid) };
        let object = &*ccw.object;
        if *service == IAccessibleEx::IID
            && *riid == IAccessibleEx::IID
            && object.behavior().is_iaccessible_ex_supported(object)
        {
            ccw.hand_out(ptr::addr_of!(ccw.vtbl_accessible_ex).cast(), ppv);
            return S_OK;
        }
        E_NOINTERFACE
    })
}

unsafe extern "system" fn ex_get_object_for_child(this: *mut c_void, _child: i32, result: *mut *mut c_void) -> HRESULT {
    crate::com_method!(this, _ccw: AccessibleCcw[vtbl_accessible_ex] => {
        crate::write_out!(result, ptr::null_mut());
        S_OK
    })
}

unsafe extern "system" fn ex_get_iaccessible_pair(this: *mut c_void, accessible: *mut *mut c_void, child: *mut i32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible_ex] => {
        if accessible.is_null() {
            return E_POINTER;
        }
        unsafe { *accessible = ptr::null_mut() };
        if child.is_null() {
            return E_INVALIDARG;
        }
        ccw.hand_out(ptr::addr_of!(ccw.vtbl_accessible).cast(), accessible);
        unsafe { *child = CHILDID_SELF };
        S_OK
    })
}

unsafe extern "system" fn ex_get_runtime_id(this: *mut c_void, result: *mut *mut SAFEARRAY) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_accessible_ex] => write_runtime_id(&ccw.object, result))
}

unsafe extern "system" fn ex_convert_returned_element(
    this: *mut c_void,
    _element: *mut c_void,
    result: *mut *mut c_void,
) -> HRESULT {
    crate::com_method!(this, _ccw: AccessibleCcw[vtbl_accessible_ex] => {
        if !result.is_null() {
            unsafe { *result = ptr::null_mut() };
        }
        E_NOTIMPL
    })
}

/// The `IAccessible` handed out for `object`.
pub(super) fn iaccessible_of(object: &AccessibleObject) -> Option<ComScope<IAccessible>> {
    let this = object.arc()?;
    object.as_iaccessible(Some(&this))?.cast::<IAccessible>().ok()
}
