//! Tests for the UI Automation provider surface

mod common;

use std::ffi::c_void;
use std::ptr;
use std::sync::Arc;

use accbridge::bstr::{self, BSTR};
use accbridge::interfaces::*;
use accbridge::*;
use accbridge::variant::{VT_ARRAY, VT_I4};
use common::{MockAccessible, MockConfig};

struct Checkbox;

impl AccessibleBehavior for Checkbox {
    fn name(&self, _: &AccessibleObject) -> Result<Option<String>> {
        Ok(Some("Remember me".into()))
    }

    fn role(&self, _: &AccessibleObject) -> Result<Option<i32>> {
        Ok(Some(role::CHECKBUTTON))
    }

    fn state(&self, _: &AccessibleObject) -> Result<i32> {
        Ok(state::FOCUSABLE)
    }

    fn is_pattern_supported(&self, _: &AccessibleObject, pattern_id: i32) -> bool {
        pattern_id == pattern::TOGGLE
    }

    fn toggle_state(&self, _: &AccessibleObject) -> ToggleState {
        ToggleState::On
    }

    fn automation_id(&self, _: &AccessibleObject) -> Option<String> {
        Some("remember".into())
    }

    fn fragment_navigate(&self, owner: &AccessibleObject, _: NavigateDirection) -> Option<Arc<AccessibleObject>> {
        owner.arc()
    }
}

fn provider<T: ComInterface>(object: &Arc<AccessibleObject>) -> ComScope<T> {
    ComHelpers::global().get_com_pointer::<T>(&object.as_object_ref()).unwrap()
}

fn property_value(simple: &ComScope<IRawElementProviderSimple>, property_id: i32) -> (HRESULT, ScopedVariant) {
    let mut out = ScopedVariant::empty();
    let hr = unsafe { (simple.vtbl().get_property_value)(simple.as_raw(), property_id, out.as_out()) };
    (hr, out)
}

fn pattern_provider(simple: &ComScope<IRawElementProviderSimple>, pattern_id: i32) -> Option<ComScope<IUnknown>> {
    let mut out: *mut c_void = ptr::null_mut();
    let hr = unsafe { (simple.vtbl().get_pattern_provider)(simple.as_raw(), pattern_id, &mut out) };
    assert_eq!(hr, S_OK);
    unsafe { ComScope::from_raw(out) }
}

// =============================================================================
// Test: IRawElementProviderSimple
// =============================================================================

#[test]
fn test_provider_options_are_server_side() {
    let object = AccessibleObject::new(Box::new(Checkbox));
    let simple = provider::<IRawElementProviderSimple>(&object);
    let mut options = 0;
    assert_eq!(unsafe { (simple.vtbl().get_provider_options)(simple.as_raw(), &mut options) }, S_OK);
    assert_eq!(options, provider_options::SERVER_SIDE | provider_options::USE_COM_THREADING);
}

#[test]
fn test_property_values() {
    let object = AccessibleObject::new(Box::new(Checkbox));
    let simple = provider::<IRawElementProviderSimple>(&object);

    let (hr, name) = property_value(&simple, property::NAME);
    assert_eq!(hr, S_OK);
    assert_eq!(name.decode(), Ok(Value::String("Remember me".into())));

    assert_eq!(property_value(&simple, property::FRAMEWORK_ID).1.decode(), Ok(Value::String("Win32".into())));
    assert_eq!(property_value(&simple, property::AUTOMATION_ID).1.decode(), Ok(Value::String("remember".into())));
    assert_eq!(property_value(&simple, property::LEGACY_ROLE).1.decode(), Ok(Value::I4(role::CHECKBUTTON)));
    assert_eq!(property_value(&simple, property::IS_TOGGLE_PATTERN_AVAILABLE).1.decode(), Ok(Value::Bool(true)));
    assert_eq!(property_value(&simple, property::IS_VALUE_PATTERN_AVAILABLE).1.decode(), Ok(Value::Bool(false)));
}

#[test]
fn test_unknown_property_is_empty() {
    let object = AccessibleObject::new(Box::new(Checkbox));
    let simple = provider::<IRawElementProviderSimple>(&object);

    let (hr, value) = property_value(&simple, property::PROCESS_ID);
    assert_eq!(hr, S_OK);
    assert!(value.get().is_empty());

    let (hr, runtime_id) = property_value(&simple, property::RUNTIME_ID);
    assert_eq!(hr, S_OK);
    assert!(runtime_id.get().is_empty());
}

#[test]
fn test_pattern_providers_follow_support() {
    let object = AccessibleObject::new(Box::new(Checkbox));
    let simple = provider::<IRawElementProviderSimple>(&object);

    assert!(pattern_provider(&simple, pattern::TOGGLE).is_some());
    assert!(pattern_provider(&simple, pattern::LEGACY_IACCESSIBLE).is_some());
    assert!(pattern_provider(&simple, pattern::VALUE).is_none());
    assert!(pattern_provider(&simple, pattern::TEXT).is_none());
}

#[test]
fn test_host_provider_is_null() {
    let object = AccessibleObject::new(Box::new(Checkbox));
    let simple = provider::<IRawElementProviderSimple>(&object);
    let mut host: *mut c_void = ptr::NonNull::dangling().as_ptr();
    assert_eq!(unsafe { (simple.vtbl().get_host_raw_element_provider)(simple.as_raw(), &mut host) }, S_OK);
    assert!(host.is_null());
}

// =============================================================================
// Test: patterns
// =============================================================================

#[test]
fn test_toggle_state() {
    let object = AccessibleObject::new(Box::new(Checkbox));
    let toggle = provider::<IToggleProvider>(&object);
    let mut current = -1;
    assert_eq!(unsafe { (toggle.vtbl().get_toggle_state)(toggle.as_raw(), &mut current) }, S_OK);
    assert_eq!(current, ToggleState::On as i32);
}

#[test]
fn test_legacy_provider() {
    let object = AccessibleObject::new(Box::new(Checkbox));
    let legacy = provider::<ILegacyIAccessibleProvider>(&object);

    let mut name: BSTR = ptr::null_mut();
    assert_eq!(unsafe { (legacy.vtbl().get_name)(legacy.as_raw(), &mut name) }, S_OK);
    assert_eq!(unsafe { bstr::take(name) }, "Remember me");

    let mut legacy_role = 0u32;
    assert_eq!(unsafe { (legacy.vtbl().get_role)(legacy.as_raw(), &mut legacy_role) }, S_OK);
    assert_eq!(legacy_role, role::CHECKBUTTON as u32);

    let mut legacy_state = 0u32;
    assert_eq!(unsafe { (legacy.vtbl().get_state)(legacy.as_raw(), &mut legacy_state) }, S_OK);
    assert_eq!(legacy_state, state::FOCUSABLE as u32);

    let mut child_id = -1;
    assert_eq!(unsafe { (legacy.vtbl().get_child_id)(legacy.as_raw(), &mut child_id) }, S_OK);
    assert_eq!(child_id, CHILDID_SELF);

    let mut accessible: *mut c_void = ptr::null_mut();
    assert_eq!(unsafe { (legacy.vtbl().get_iaccessible)(legacy.as_raw(), &mut accessible) }, S_OK);
    let accessible = unsafe { ComScope::<IAccessible>::from_raw(accessible) }.unwrap();
    assert!(accessible.is_same_object(legacy.as_raw()));
}

// =============================================================================
// Test: fragments
// =============================================================================

#[test]
fn test_fragment_never_navigates_to_itself() {
    let object = AccessibleObject::new(Box::new(Checkbox));
    let fragment = provider::<IRawElementProviderFragment>(&object);

    for direction in [NavigateDirection::Parent, NavigateDirection::FirstChild, NavigateDirection::LastChild] {
        let mut found: *mut c_void = ptr::null_mut();
        let hr = unsafe { (fragment.vtbl().navigate)(fragment.as_raw(), direction as i32, &mut found) };
        assert_eq!(hr, S_OK);
        assert!(found.is_null(), "{direction:?}");
    }
}

#[test]
fn test_fragment_rejects_unknown_direction() {
    let object = AccessibleObject::new(Box::new(Checkbox));
    let fragment = provider::<IRawElementProviderFragment>(&object);
    let mut found: *mut c_void = ptr::null_mut();
    assert_eq!(unsafe { (fragment.vtbl().navigate)(fragment.as_raw(), 9, &mut found) }, E_INVALIDARG);
}

#[test]
fn test_system_wrapper_runtime_id_property_is_an_i4_array() {
    let (accessible, _stats) = MockAccessible::agile(MockConfig::named("wrapped"));
    let object = AccessibleObject::system_wrapper(accessible);
    let simple = provider::<IRawElementProviderSimple>(&object);

    let (hr, runtime_id) = property_value(&simple, property::RUNTIME_ID);
    assert_eq!(hr, S_OK);
    let variant = runtime_id.get();
    assert_eq!(variant.vt, VT_ARRAY | VT_I4);

    let array = unsafe { &*variant.data.ptr.cast::<bstr::SAFEARRAY>() };
    let ids = unsafe { array.as_slice::<i32>() };
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], UIA_APPEND_RUNTIME_ID);
    assert_eq!(Some(ids.to_vec()), object.default_runtime_id());
}

#[test]
fn test_runtime_id_requires_system_wrapper() {
    let object = AccessibleObject::new(Box::new(Checkbox));
    let fragment = provider::<IRawElementProviderFragment>(&object);
    let mut array = ptr::null_mut();
    assert_eq!(unsafe { (fragment.vtbl().get_runtime_id)(fragment.as_raw(), &mut array) }, E_NOTIMPL);
    assert!(array.is_null());
}
