//! UI Automation provider slots of the accessible wrapper.
//!
//! Every slot forwards to [`AccessibleBehavior`](super::AccessibleBehavior)
//! on the wrapped object. Providers handed back to the client are our own
//! wrappers around the returned objects.

use std::ffi::c_void;
use std::ptr;
use std::sync::Arc;

use super::AccessibleObject;
use super::ccw::{AccessibleCcw, iaccessible_of, provider_array, write_bstr, write_provider, write_runtime_id};
use crate::bstr::{self, BSTR, SAFEARRAY};
use crate::com::{ComInterface, E_INVALIDARG, E_POINTER, HRESULT, S_OK};
use crate::interfaces::{
    IExpandCollapseProvider, IGridItemProvider, IGridProvider, IInvokeProvider,
    ILegacyIAccessibleProvider, IRangeValueProvider, IRawElementProviderFragment,
    IRawElementProviderFragmentRoot, IRawElementProviderSimple, IScrollItemProvider,
    ISelectionItemProvider, ISelectionProvider, IToggleProvider, IValueProvider, NavigateDirection,
    UiaRect, pattern, property,
};
use crate::variant::{VARIANT, VT_ARRAY, VT_I4, Value};

fn to_bool(value: bool) -> i32 {
    i32::from(value)
}

/// Drop a result that names the object itself, for directions that must not.
fn not_self(object: &AccessibleObject, found: Option<Arc<AccessibleObject>>, direction: NavigateDirection) -> Option<Arc<AccessibleObject>> {
    let found = found?;
    if ptr::eq(object, Arc::as_ptr(&found)) {
        tracing::warn!(target: "accbridge::accessible", ?direction, "fragment navigation returned the object itself");
        return None;
    }
    Some(found)
}

/// The provider to QueryInterface for `pattern_id`'s interface.
fn pattern_iid(pattern_id: i32) -> Option<crate::GUID> {
    Some(match pattern_id {
        pattern::INVOKE => IInvokeProvider::IID,
        pattern::TOGGLE => IToggleProvider::IID,
        pattern::VALUE => IValueProvider::IID,
        pattern::RANGE_VALUE => IRangeValueProvider::IID,
        pattern::EXPAND_COLLAPSE => IExpandCollapseProvider::IID,
        pattern::SELECTION => ISelectionProvider::IID,
        pattern::SELECTION_ITEM => ISelectionItemProvider::IID,
        pattern::SCROLL_ITEM => IScrollItemProvider::IID,
        pattern::GRID => IGridProvider::IID,
        pattern::GRID_ITEM => IGridItemProvider::IID,
        pattern::LEGACY_IACCESSIBLE => ILegacyIAccessibleProvider::IID,
        _ => return None,
    })
}

// =============================================================================
// IRawElementProviderSimple
// =============================================================================

pub(super) unsafe extern "system" fn simple_provider_options(this: *mut c_void, options: *mut i32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_simple] => {
        crate::write_out!(options, ccw.object.behavior().provider_options(&ccw.object));
        S_OK
    })
}

pub(super) unsafe extern "system" fn simple_pattern_provider(this: *mut c_void, pattern_id: i32, result: *mut *mut c_void) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_simple] => {
        if result.is_null() {
            return E_POINTER;
        }
        unsafe { *result = ptr::null_mut() };

        let object = &*ccw.object;
        let Some(iid) = pattern_iid(pattern_id) else {
            return S_OK;
        };
        if pattern_id != pattern::LEGACY_IACCESSIBLE && !object.behavior().is_pattern_supported(object, pattern_id) {
            return S_OK;
        }
        let (hr, provider) = unsafe { crate::com::query_interface(this, &iid) };
        if crate::failed(hr) {
            return S_OK;
        }
        unsafe { *result = provider };
        S_OK
    })
}

pub(super) unsafe extern "system" fn simple_property_value(this: *mut c_void, property_id: i32, result: *mut VARIANT) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_simple] => {
        if result.is_null() {
            return E_POINTER;
        }
        unsafe { result.write(VARIANT::empty()) };
        let object = &*ccw.object;

        if property_id == property::RUNTIME_ID {
            if let Some(id) = object.behavior().runtime_id(object) {
                let mut variant = VARIANT::empty();
                variant.vt = VT_ARRAY | VT_I4;
                variant.data.ptr = bstr::i32_vector(&id).cast();
                unsafe { result.write(variant) };
            }
            return S_OK;
        }

        let value = match object.behavior().property_value(object, property_id) {
            Ok(value) => value,
            Err(error) => return error.hresult(),
        };
        if matches!(value, Value::Empty) {
            return S_OK;
        }
        match VARIANT::encode(value) {
            Ok(variant) => {
                unsafe { result.write(variant) };
                S_OK
            }
            Err(error) => error.hresult(),
        }
    })
}

pub(super) unsafe extern "system" fn simple_host_provider(this: *mut c_void, result: *mut *mut c_void) -> HRESULT {
    crate::com_method!(this, _ccw: AccessibleCcw[vtbl_simple] => {
        crate::write_out!(result, ptr::null_mut());
        S_OK
    })
}

// =============================================================================
// IRawElementProviderFragment and FragmentRoot
// =============================================================================

pub(super) unsafe extern "system" fn fragment_navigate(this: *mut c_void, direction: i32, result: *mut *mut c_void) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_fragment] => {
        if result.is_null() {
            return E_POINTER;
        }
        unsafe { *result = ptr::null_mut() };
        let Some(direction) = NavigateDirection::from_raw(direction) else {
            return E_INVALIDARG;
        };

        let object = &*ccw.object;
        let found = object.behavior().fragment_navigate(object, direction);
        let found = match direction {
            NavigateDirection::Parent | NavigateDirection::FirstChild | NavigateDirection::LastChild => {
                not_self(object, found, direction)
            }
            _ => found,
        };
        write_provider::<IRawElementProviderFragment>(result, found)
    })
}

pub(super) unsafe extern "system" fn fragment_runtime_id(this: *mut c_void, result: *mut *mut SAFEARRAY) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_fragment] => write_runtime_id(&ccw.object, result))
}

pub(super) unsafe extern "system" fn fragment_bounding_rectangle(this: *mut c_void, result: *mut UiaRect) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_fragment] => {
        if result.is_null() {
            return E_POINTER;
        }
        unsafe { *result = UiaRect::default() };
        match ccw.object.behavior().bounding_rectangle(&ccw.object) {
            Ok(rect) => {
                unsafe { *result = rect };
                S_OK
            }
            Err(error) => error.hresult(),
        }
    })
}

pub(super) unsafe extern "system" fn fragment_embedded_roots(this: *mut c_void, result: *mut *mut SAFEARRAY) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_fragment] => {
        let roots = ccw.object.behavior().embedded_fragment_roots(&ccw.object);
        crate::write_out!(result, roots.map_or(ptr::null_mut(), provider_array));
        S_OK
    })
}

pub(super) unsafe extern "system" fn fragment_set_focus(this: *mut c_void) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_fragment] => ccw.object.behavior().set_focus(&ccw.object))
}

pub(super) unsafe extern "system" fn fragment_root(this: *mut c_void, result: *mut *mut c_void) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_fragment] => {
        let root = ccw.object.behavior().fragment_root(&ccw.object);
        write_provider::<IRawElementProviderFragmentRoot>(result, root)
    })
}

pub(super) unsafe extern "system" fn root_element_from_point(this: *mut c_void, x: f64, y: f64, result: *mut *mut c_void) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_fragment_root] => {
        let found = ccw.object.behavior().element_provider_from_point(&ccw.object, x, y);
        write_provider::<IRawElementProviderFragment>(result, found)
    })
}

pub(super) unsafe extern "system" fn root_focus(this: *mut c_void, result: *mut *mut c_void) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_fragment_root] => {
        let focused = ccw.object.behavior().focus_element(&ccw.object);
        write_provider::<IRawElementProviderFragment>(result, focused)
    })
}

// =============================================================================
// ILegacyIAccessibleProvider
// =============================================================================

pub(super) unsafe extern "system" fn legacy_select(this: *mut c_void, flags: i32) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_legacy] => ccw.object.select(flags))
}

pub(super) unsafe extern "system" fn legacy_do_default_action(this: *mut c_void) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_legacy] => ccw.object.do_default_action())
}

pub(super) unsafe extern "system" fn legacy_set_value(this: *mut c_void, value: *const u16) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_legacy] => {
        let value = unsafe { bstr::wide_to_string(value) };
        ccw.object.set_value(&value)
    })
}

pub(super) unsafe extern "system" fn legacy_iaccessible(this: *mut c_void, accessible: *mut *mut c_void) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_legacy] => {
        let pointer = iaccessible_of(&ccw.object).map_or(ptr::null_mut(), |scope| scope.into_raw());
        crate::write_out!(accessible, pointer);
        S_OK
    })
}

pub(super) unsafe extern "system" fn legacy_child_id(this: *mut c_void, result: *mut i32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_legacy] => {
        crate::write_out!(result, ccw.object.behavior().child_id(&ccw.object));
        S_OK
    })
}

pub(super) unsafe extern "system" fn legacy_name(this: *mut c_void, result: *mut BSTR) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_legacy] => write_bstr(result, ccw.object.name()))
}

pub(super) unsafe extern "system" fn legacy_value(this: *mut c_void, result: *mut BSTR) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_legacy] => write_bstr(result, ccw.object.value()))
}

pub(super) unsafe extern "system" fn legacy_description(this: *mut c_void, result: *mut BSTR) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_legacy] => write_bstr(result, ccw.object.description()))
}

pub(super) unsafe extern "system" fn legacy_role(this: *mut c_void, result: *mut u32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_legacy] => {
        if result.is_null() {
            return E_POINTER;
        }
        match ccw.object.role() {
            Ok(role) => {
                unsafe { *result = role.unwrap_or(crate::role::NONE) as u32 };
                S_OK
            }
            Err(error) => error.hresult(),
        }
    })
}

pub(super) unsafe extern "system" fn legacy_state(this: *mut c_void, result: *mut u32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_legacy] => {
        if result.is_null() {
            return E_POINTER;
        }
        match ccw.object.state() {
            Ok(state) => {
                unsafe { *result = state as u32 };
                S_OK
            }
            Err(error) => error.hresult(),
        }
    })
}

pub(super) unsafe extern "system" fn legacy_help(this: *mut c_void, result: *mut BSTR) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_legacy] => write_bstr(result, ccw.object.help()))
}

pub(super) unsafe extern "system" fn legacy_keyboard_shortcut(this: *mut c_void, result: *mut BSTR) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_legacy] => write_bstr(result, ccw.object.keyboard_shortcut()))
}

pub(super) unsafe extern "system" fn legacy_selection(this: *mut c_void, result: *mut *mut SAFEARRAY) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_legacy] => {
        if result.is_null() {
            return E_POINTER;
        }
        unsafe { *result = ptr::null_mut() };
        match ccw.object.selected() {
            Ok(selected) => {
                unsafe { *result = provider_array(selected.into_iter().collect()) };
                S_OK
            }
            Err(error) => error.hresult(),
        }
    })
}

pub(super) unsafe extern "system" fn legacy_default_action(this: *mut c_void, result: *mut BSTR) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_legacy] => write_bstr(result, ccw.object.default_action()))
}

// =============================================================================
// Control patterns
// =============================================================================

pub(super) unsafe extern "system" fn invoke(this: *mut c_void) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_invoke] => ccw.object.behavior().invoke(&ccw.object))
}

pub(super) unsafe extern "system" fn toggle(this: *mut c_void) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_toggle] => ccw.object.behavior().toggle(&ccw.object))
}

pub(super) unsafe extern "system" fn toggle_state(this: *mut c_void, result: *mut i32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_toggle] => {
        crate::write_out!(result, ccw.object.behavior().toggle_state(&ccw.object) as i32);
        S_OK
    })
}

pub(super) unsafe extern "system" fn value_set(this: *mut c_void, value: *const u16) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_value] => {
        let value = unsafe { bstr::wide_to_string(value) };
        ccw.object.behavior().set_value_text(&ccw.object, &value)
    })
}

pub(super) unsafe extern "system" fn value_get(this: *mut c_void, result: *mut BSTR) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_value] => write_bstr(result, ccw.object.value()))
}

pub(super) unsafe extern "system" fn value_is_read_only(this: *mut c_void, result: *mut i32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_value] => {
        crate::write_out!(result, to_bool(ccw.object.behavior().is_read_only(&ccw.object)));
        S_OK
    })
}

pub(super) unsafe extern "system" fn range_set_value(this: *mut c_void, value: f64) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_range_value] => {
        ccw.object.behavior().set_range_value(&ccw.object, value)
    })
}

pub(super) unsafe extern "system" fn range_value(this: *mut c_void, result: *mut f64) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_range_value] => {
        crate::write_out!(result, ccw.object.behavior().range_value(&ccw.object));
        S_OK
    })
}

pub(super) unsafe extern "system" fn range_is_read_only(this: *mut c_void, result: *mut i32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_range_value] => {
        crate::write_out!(result, to_bool(ccw.object.behavior().is_read_only(&ccw.object)));
        S_OK
    })
}

pub(super) unsafe extern "system" fn range_maximum(this: *mut c_void, result: *mut f64) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_range_value] => {
        crate::write_out!(result, ccw.object.behavior().maximum(&ccw.object));
        S_OK
    })
}

pub(super) unsafe extern "system" fn range_minimum(this: *mut c_void, result: *mut f64) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_range_value] => {
        crate::write_out!(result, ccw.object.behavior().minimum(&ccw.object));
        S_OK
    })
}

pub(super) unsafe extern "system" fn range_large_change(this: *mut c_void, result: *mut f64) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_range_value] => {
        crate::write_out!(result, ccw.object.behavior().large_change(&ccw.object));
        S_OK
    })
}

pub(super) unsafe extern "system" fn range_small_change(this: *mut c_void, result: *mut f64) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_range_value] => {
        crate::write_out!(result, ccw.object.behavior().small_change(&ccw.object));
        S_OK
    })
}

pub(super) unsafe extern "system" fn expand(this: *mut c_void) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_expand_collapse] => ccw.object.behavior().expand(&ccw.object))
}

pub(super) unsafe extern "system" fn collapse(this: *mut c_void) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_expand_collapse] => ccw.object.behavior().collapse(&ccw.object))
}

pub(super) unsafe extern "system" fn expand_collapse_state(this: *mut c_void, result: *mut i32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_expand_collapse] => {
        crate::write_out!(result, ccw.object.behavior().expand_collapse_state(&ccw.object) as i32);
        S_OK
    })
}

pub(super) unsafe extern "system" fn selection(this: *mut c_void, result: *mut *mut SAFEARRAY) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_selection] => {
        let selection = ccw.object.behavior().selection(&ccw.object);
        crate::write_out!(result, selection.map_or(ptr::null_mut(), provider_array));
        S_OK
    })
}

pub(super) unsafe extern "system" fn selection_can_select_multiple(this: *mut c_void, result: *mut i32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_selection] => {
        crate::write_out!(result, to_bool(ccw.object.behavior().can_select_multiple(&ccw.object)));
        S_OK
    })
}

pub(super) unsafe extern "system" fn selection_is_required(this: *mut c_void, result: *mut i32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_selection] => {
        crate::write_out!(result, to_bool(ccw.object.behavior().is_selection_required(&ccw.object)));
        S_OK
    })
}

pub(super) unsafe extern "system" fn item_select(this: *mut c_void) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_selection_item] => ccw.object.behavior().select_item(&ccw.object))
}

pub(super) unsafe extern "system" fn item_add_to_selection(this: *mut c_void) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_selection_item] => {
        ccw.object.behavior().add_to_selection(&ccw.object)
    })
}

pub(super) unsafe extern "system" fn item_remove_from_selection(this: *mut c_void) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_selection_item] => {
        ccw.object.behavior().remove_from_selection(&ccw.object)
    })
}

pub(super) unsafe extern "system" fn item_is_selected(this: *mut c_void, result: *mut i32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_selection_item] => {
        crate::write_out!(result, to_bool(ccw.object.behavior().is_item_selected(&ccw.object)));
        S_OK
    })
}

pub(super) unsafe extern "system" fn item_selection_container(this: *mut c_void, result: *mut *mut c_void) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_selection_item] => {
        let container = ccw.object.behavior().item_selection_container(&ccw.object);
        write_provider::<IRawElementProviderSimple>(result, container)
    })
}

pub(super) unsafe extern "system" fn scroll_into_view(this: *mut c_void) -> HRESULT {
    crate::com_method_result!(this, ccw: AccessibleCcw[vtbl_scroll_item] => {
        ccw.object.behavior().scroll_into_view(&ccw.object)
    })
}

pub(super) unsafe extern "system" fn grid_item(this: *mut c_void, row: i32, column: i32, result: *mut *mut c_void) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_grid] => {
        let item = ccw.object.behavior().grid_item(&ccw.object, row, column);
        write_provider::<IRawElementProviderSimple>(result, item)
    })
}

pub(super) unsafe extern "system" fn grid_row_count(this: *mut c_void, result: *mut i32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_grid] => {
        crate::write_out!(result, ccw.object.behavior().row_count(&ccw.object));
        S_OK
    })
}

pub(super) unsafe extern "system" fn grid_column_count(this: *mut c_void, result: *mut i32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_grid] => {
        crate::write_out!(result, ccw.object.behavior().column_count(&ccw.object));
        S_OK
    })
}

pub(super) unsafe extern "system" fn grid_item_row(this: *mut c_void, result: *mut i32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_grid_item] => {
        crate::write_out!(result, ccw.object.behavior().row(&ccw.object));
        S_OK
    })
}

pub(super) unsafe extern "system" fn grid_item_column(this: *mut c_void, result: *mut i32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_grid_item] => {
        crate::write_out!(result, ccw.object.behavior().column(&ccw.object));
        S_OK
    })
}

pub(super) unsafe extern "system" fn grid_item_row_span(this: *mut c_void, result: *mut i32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_grid_item] => {
        crate::write_out!(result, ccw.object.behavior().row_span(&ccw.object));
        S_OK
    })
}

pub(super) unsafe extern "system" fn grid_item_column_span(this: *mut c_void, result: *mut i32) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_grid_item] => {
        crate::write_out!(result, ccw.object.behavior().column_span(&ccw.object));
        S_OK
    })
}

pub(super) unsafe extern "system" fn grid_item_containing_grid(this: *mut c_void, result: *mut *mut c_void) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_grid_item] => {
        let grid = ccw.object.behavior().containing_grid(&ccw.object);
        write_provider::<IRawElementProviderSimple>(result, grid)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_iids() {
        assert_eq!(pattern_iid(pattern::INVOKE), Some(IInvokeProvider::IID));
        assert_eq!(pattern_iid(pattern::LEGACY_IACCESSIBLE), Some(ILegacyIAccessibleProvider::IID));
        assert_eq!(pattern_iid(pattern::TEXT), None);
    }
}
