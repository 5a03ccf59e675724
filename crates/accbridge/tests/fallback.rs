//! Tests for the system fallback chain

mod common;

use std::ptr;

use accbridge::fallback::SystemFallback;
use accbridge::interfaces::{OBJID_CLIENT, Rect};
use accbridge::*;
use common::{MockAccessible, MockConfig, MockFactory, fake_hwnd};

fn self_id() -> VARIANT {
    VARIANT::from_i4(0)
}

// =============================================================================
// Test: creation
// =============================================================================

#[test]
fn test_no_window_never_calls_factory() {
    let fallback = SystemFallback::new();
    let factory = MockFactory::new(MockConfig::default());

    let result = fallback.use_std_accessible_objects_with(&factory, ptr::null_mut(), OBJID_CLIENT);
    assert_eq!(result, Err(Error::NoWindow));
    assert_eq!(factory.calls(), 0);
    assert!(fallback.objects().is_none());
}

#[test]
fn test_objects_are_created_once() {
    let fallback = SystemFallback::new();
    let factory = MockFactory {
        enum_total: Some(2),
        ..MockFactory::new(MockConfig::default())
    };

    for _ in 0..3 {
        fallback
            .use_std_accessible_objects_with(&factory, fake_hwnd(), OBJID_CLIENT)
            .unwrap();
    }

    // One request per interface.
    assert_eq!(factory.calls(), 2);
    assert!(fallback.accessible().is_some());
    assert!(fallback.enum_variant().is_some());
}

#[test]
fn test_missing_enumerator_is_tolerated() {
    let fallback = SystemFallback::new();
    let factory = MockFactory::new(MockConfig::default());

    fallback
        .use_std_accessible_objects_with(&factory, fake_hwnd(), OBJID_CLIENT)
        .unwrap();
    assert!(fallback.accessible().is_some());
    assert!(fallback.enum_variant().is_none());
}

#[test]
fn test_system_objects_released_with_fallback() {
    let fallback = SystemFallback::new();
    let factory = MockFactory {
        enum_total: Some(1),
        ..MockFactory::new(MockConfig::default())
    };
    fallback
        .use_std_accessible_objects_with(&factory, fake_hwnd(), OBJID_CLIENT)
        .unwrap();

    drop(fallback);
    assert_eq!(factory.accessible_stats.released(), 1);
    assert_eq!(factory.enum_stats.released(), 1);
}

// =============================================================================
// Test: window handle
// =============================================================================

#[test]
fn test_ole_window_only_with_window() {
    let windowed = SystemFallback::new();
    let factory = MockFactory::new(MockConfig {
        hwnd: 0x4321,
        ..MockConfig::default()
    });
    windowed
        .use_std_accessible_objects_with(&factory, fake_hwnd(), OBJID_CLIENT)
        .unwrap();
    let window = windowed.ole_window().expect("ole window");
    assert_eq!(window.window(), Ok(0x4321 as HWND));

    let windowless = SystemFallback::new();
    windowless
        .use_std_accessible_objects_with(&MockFactory::new(MockConfig::default()), fake_hwnd(), OBJID_CLIENT)
        .unwrap();
    assert!(windowless.ole_window().is_none());
}

#[test]
fn test_from_accessible_finds_window() {
    let (accessible, _) = MockAccessible::agile(MockConfig {
        hwnd: 0x99,
        ..MockConfig::default()
    });
    let fallback = SystemFallback::from_accessible(accessible);
    assert!(fallback.enum_variant().is_none());
    assert_eq!(fallback.ole_window().map(|w| w.window()), Some(Ok(0x99 as HWND)));
}

// =============================================================================
// Test: typed helpers
// =============================================================================

#[test]
fn test_string_helpers() {
    let (accessible, stats) = MockAccessible::agile(MockConfig {
        value: Some("42".into()),
        ..MockConfig::named("Slider")
    });

    assert_eq!(accessible.name(&self_id()), Ok(Some("Slider".to_string())));
    assert_eq!(accessible.value(&self_id()), Ok(Some("42".to_string())));
    assert_eq!(accessible.description(&VARIANT::from_i4(3)), Ok(None));
    assert_eq!(stats.forwarded(), vec![0, 0, 3]);
}

#[test]
fn test_numeric_helpers() {
    let (accessible, _) = MockAccessible::agile(MockConfig {
        role: 43,
        child_count: 2,
        ..MockConfig::default()
    });

    assert_eq!(accessible.role(&self_id()), Ok(Some(43)));
    assert_eq!(accessible.acc_state(&self_id()), Ok(Some(0)));
    assert_eq!(accessible.child_count(), Ok(2));
    assert_eq!(accessible.location(&self_id()), Ok(Rect::new(10, 20, 30, 40)));
}

#[test]
fn test_empty_results() {
    let (accessible, _) = MockAccessible::agile(MockConfig::default());

    assert!(accessible.parent().unwrap().is_none());
    assert!(accessible.child(&VARIANT::from_i4(1)).unwrap().is_none());
    assert!(accessible.focus().unwrap().get().is_empty());
    assert!(accessible.hit_test(1, 1).unwrap().get().is_empty());
    assert_eq!(accessible.help_topic(&self_id()), Ok((None, -1)));
}

#[test]
fn test_helpers_after_dispose() {
    let (accessible, _) = MockAccessible::agile(MockConfig::named("gone"));
    accessible.dispose();
    assert_eq!(accessible.name(&self_id()), Err(Error::Released));
}
