//! Tests for AgileComPointer lifecycle

mod common;

use std::sync::Arc;
use std::thread;

use accbridge::*;
use common::{MockAccessible, MockConfig, MockStats};

// =============================================================================
// Test: binding
// =============================================================================

#[test]
fn test_null_pointer_records_status() {
    let pointer = unsafe { AgileComPointer::<IAccessible>::new(std::ptr::null_mut(), true) };
    assert_eq!(pointer.state(), AgileState::Unbound);
    assert_eq!(pointer.status(), E_POINTER);
    assert!(pointer.get_interface().is_err());
}

#[test]
fn test_agile_object_is_held_directly() {
    let (pointer, _stats) = MockAccessible::agile(MockConfig::default());
    assert!(pointer.is_bound());
    assert_eq!(pointer.mode(), Some(AgileMode::Agile));
    assert_eq!(pointer.status(), S_OK);
}

#[test]
fn test_borrowed_pointer_keeps_caller_reference() {
    let stats = Arc::new(MockStats::default());
    let raw = MockAccessible::create(MockConfig::default(), stats.clone());

    let pointer = unsafe { AgileComPointer::<IAccessible>::new(raw.as_ptr(), false) };
    drop(pointer);
    assert_eq!(stats.released(), 0);

    unsafe { accbridge::com::release(raw.as_ptr()) };
    assert_eq!(stats.released(), 1);
}

#[test]
fn test_second_bind_is_rejected_and_released() {
    let (pointer, _) = MockAccessible::agile(MockConfig::default());
    let stats = Arc::new(MockStats::default());
    let other = MockAccessible::create(MockConfig::default(), stats.clone());

    assert!(unsafe { pointer.bind(other.as_ptr(), true) }.is_err());
    assert_eq!(stats.released(), 1);
}

#[test]
fn test_bind_after_dispose_fails() {
    let pointer = AgileComPointer::<IAccessible>::unbound();
    pointer.dispose();
    assert_eq!(pointer.state(), AgileState::Released);

    let stats = Arc::new(MockStats::default());
    let raw = MockAccessible::create(MockConfig::default(), stats.clone());
    assert_eq!(unsafe { pointer.bind(raw.as_ptr(), true) }, Err(Error::Released));
    assert_eq!(stats.released(), 1);
}

// =============================================================================
// Test: release exactly once
// =============================================================================

#[test]
fn test_dispose_releases_once() {
    let (pointer, stats) = MockAccessible::agile(MockConfig::default());
    pointer.dispose();
    pointer.dispose();
    assert_eq!(stats.released(), 1);
    assert_eq!(pointer.get_interface().err(), Some(Error::Released));
    drop(pointer);
    assert_eq!(stats.released(), 1);
}

#[test]
fn test_concurrent_dispose_releases_once() {
    let (pointer, stats) = MockAccessible::agile(MockConfig::default());
    let pointer = Arc::new(pointer);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pointer = pointer.clone();
            thread::spawn(move || pointer.dispose())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(pointer.state(), AgileState::Released);
    assert_eq!(stats.released(), 1);
}

#[test]
fn test_interface_used_from_another_thread() {
    let (pointer, stats) = MockAccessible::agile(MockConfig::named("Remote"));
    let pointer = Arc::new(pointer);

    let worker = {
        let pointer = pointer.clone();
        thread::spawn(move || pointer.name(&VARIANT::from_i4(0)))
    };
    assert_eq!(worker.join().unwrap(), Ok(Some("Remote".to_string())));

    drop(pointer);
    assert_eq!(stats.released(), 1);
}

// =============================================================================
// Test: interface conversion and identity
// =============================================================================

#[test]
fn test_with_interface_owns_its_reference() {
    let (pointer, stats) = MockAccessible::agile(MockConfig::default());
    let dispatch = pointer.with_interface::<IDispatch>();
    assert!(dispatch.is_bound());
    assert!(pointer.is_same_native_object(&dispatch));

    drop(pointer);
    assert_eq!(stats.released(), 0);
    drop(dispatch);
    assert_eq!(stats.released(), 1);
}

#[test]
fn test_with_interface_failure_carries_status() {
    let (pointer, _) = MockAccessible::agile(MockConfig::default());
    let window = pointer.with_interface::<IOleWindow>();
    assert!(!window.is_bound());
    assert_eq!(window.status(), E_NOINTERFACE);
}

#[test]
fn test_with_interface_on_released_pointer() {
    let (pointer, _) = MockAccessible::agile(MockConfig::default());
    pointer.dispose();
    let dispatch = pointer.with_interface::<IDispatch>();
    assert_eq!(dispatch.status(), Error::Released.hresult());
}

#[test]
fn test_distinct_objects_are_not_the_same() {
    let (first, _) = MockAccessible::agile(MockConfig::default());
    let (second, _) = MockAccessible::agile(MockConfig::default());
    assert!(!first.is_same_native_object(&second));

    let scope = second.get_interface().unwrap();
    assert!(second.is_same_native_pointer(scope.as_raw()));
    assert!(!first.is_same_native_pointer(scope.as_raw()));
    assert!(!first.is_same_native_pointer(std::ptr::null_mut()));
}

#[test]
fn test_erased_pointer_from_scope() {
    let (pointer, stats) = MockAccessible::agile(MockConfig::default());
    let erased = AgileComPointer::from_scope(pointer.get_interface().unwrap());
    assert!(erased.is_bound());
    assert!(erased.is_same_native_object(&pointer));

    drop(pointer);
    drop(erased);
    assert_eq!(stats.released(), 1);
}
