//! Walks an accessible tree the way a native screen reader would.
//!
//! The tree is built from Rust behaviors, then read back exclusively
//! through the native vtables the bridge hands out:
//! 1. `IAccessible` for direct property reads
//! 2. `IEnumVARIANT` for child enumeration
//! 3. `IDispatch` late binding by member name
//! 4. UI Automation's `IRawElementProviderSimple`
//!
//! Set `RUST_LOG=accbridge=trace` to watch wrappers being created and released.

use std::ptr;
use std::sync::Arc;

use accbridge::bstr::{self, BSTR};
use accbridge::interfaces::{
    DISPATCH_PROPERTYGET, DISPID_ACC_ROLE, DISPPARAMS, IAccessible, IDispatch, IEnumVARIANT,
    IRawElementProviderSimple, Rect, property, role, state,
};
use accbridge::resolver::downcast;
use accbridge::variant::{ScopedVariant, VARIANT};
use accbridge::{
    AccessibleBehavior, AccessibleObject, ComHelpers, ComScope, Error, IID_IUNKNOWN, Result, S_OK,
    Value, failed,
};
use tracing_subscriber::EnvFilter;

// =============================================================================
// A small dialog
// =============================================================================

struct Button {
    label: &'static str,
    bounds: Rect,
    focused: bool,
}

impl AccessibleBehavior for Button {
    fn name(&self, _: &AccessibleObject) -> Result<Option<String>> {
        Ok(Some(self.label.to_string()))
    }

    fn role(&self, _: &AccessibleObject) -> Result<Option<i32>> {
        Ok(Some(role::PUSHBUTTON))
    }

    fn state(&self, _: &AccessibleObject) -> Result<i32> {
        Ok(state::FOCUSABLE | if self.focused { state::FOCUSED } else { 0 })
    }

    fn bounds(&self, _: &AccessibleObject) -> Result<Rect> {
        Ok(self.bounds)
    }

    fn default_action(&self, _: &AccessibleObject) -> Result<Option<String>> {
        Ok(Some("Press".into()))
    }

    fn do_default_action(&self, _: &AccessibleObject) -> Result<()> {
        println!("  [{}] pressed", self.label);
        Ok(())
    }
}

struct Dialog {
    title: &'static str,
    buttons: Vec<Arc<AccessibleObject>>,
}

impl AccessibleBehavior for Dialog {
    fn name(&self, _: &AccessibleObject) -> Result<Option<String>> {
        Ok(Some(self.title.to_string()))
    }

    fn role(&self, _: &AccessibleObject) -> Result<Option<i32>> {
        Ok(Some(role::DIALOG))
    }

    fn bounds(&self, _: &AccessibleObject) -> Result<Rect> {
        Ok(Rect::new(100, 100, 320, 120))
    }

    fn child_count(&self, _: &AccessibleObject) -> i32 {
        self.buttons.len() as i32
    }

    fn child(&self, _: &AccessibleObject, index: i32) -> Option<Arc<AccessibleObject>> {
        usize::try_from(index).ok().and_then(|i| self.buttons.get(i)).cloned()
    }
}

fn build_dialog() -> Arc<AccessibleObject> {
    let ok = AccessibleObject::new(Box::new(Button {
        label: "OK",
        bounds: Rect::new(120, 180, 80, 24),
        focused: true,
    }));
    let cancel = AccessibleObject::new(Box::new(Button {
        label: "Cancel",
        bounds: Rect::new(220, 180, 80, 24),
        focused: false,
    }));
    AccessibleObject::new(Box::new(Dialog {
        title: "Save changes?",
        buttons: vec![ok, cancel],
    }))
}

// =============================================================================
// Native-side helpers
// =============================================================================

fn check(hr: accbridge::HRESULT) -> Result<()> {
    if failed(hr) { Err(Error::from_hresult(hr)) } else { Ok(()) }
}

fn native_name(accessible: &ComScope<IAccessible>, child: VARIANT) -> Result<String> {
    let mut out: BSTR = ptr::null_mut();
    check(unsafe { (accessible.vtbl().get_acc_name)(accessible.as_raw(), child, &mut out) })?;
    Ok(unsafe { bstr::take(out) })
}

fn native_role(accessible: &ComScope<IAccessible>, child: VARIANT) -> Result<Value> {
    let mut out = ScopedVariant::empty();
    check(unsafe { (accessible.vtbl().get_acc_role)(accessible.as_raw(), child, out.as_out()) })?;
    out.decode()
}

fn native_location(accessible: &ComScope<IAccessible>, child: VARIANT) -> Result<Rect> {
    let mut r = Rect::default();
    check(unsafe {
        (accessible.vtbl().acc_location)(
            accessible.as_raw(),
            &mut r.left,
            &mut r.top,
            &mut r.width,
            &mut r.height,
            child,
        )
    })?;
    Ok(r)
}

fn late_bound_role(dispatch: &ComScope<IDispatch>) -> Result<Value> {
    let name: Vec<u16> = "accRole".encode_utf16().chain([0]).collect();
    let names = [name.as_ptr()];
    let mut dispid = 0;
    check(unsafe {
        (dispatch.vtbl().get_ids_of_names)(dispatch.as_raw(), &IID_IUNKNOWN, names.as_ptr(), 1, 0, &mut dispid)
    })?;
    println!("  GetIDsOfNames(\"accRole\") = {dispid} (expected {DISPID_ACC_ROLE})");

    let mut params = DISPPARAMS {
        args: ptr::null_mut(),
        named_args: ptr::null_mut(),
        arg_count: 0,
        named_arg_count: 0,
    };
    let mut result = ScopedVariant::empty();
    check(unsafe {
        (dispatch.vtbl().invoke)(
            dispatch.as_raw(),
            dispid,
            &IID_IUNKNOWN,
            0,
            DISPATCH_PROPERTYGET,
            &mut params,
            result.as_out(),
            ptr::null_mut(),
            ptr::null_mut(),
        )
    })?;
    result.decode()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== accbridge walkthrough ===\n");

    let dialog = build_dialog();
    let helpers = ComHelpers::global();
    let accessible = helpers.get_com_pointer::<IAccessible>(&dialog.as_object_ref())?;

    // =========================================================================
    // STEP 1: direct IAccessible reads
    // =========================================================================
    println!("--- STEP 1: IAccessible ---");
    let mut count = 0;
    check(unsafe { (accessible.vtbl().get_acc_child_count)(accessible.as_raw(), &mut count) })?;
    println!("  name:     {}", native_name(&accessible, VARIANT::empty())?);
    println!("  role:     {:?}", native_role(&accessible, VARIANT::empty())?);
    println!("  children: {count}");
    for id in 1..=count {
        let child = VARIANT::from_i4(id);
        println!(
            "  child {id}: {:<8} at {:?}",
            native_name(&accessible, child)?,
            native_location(&accessible, child)?
        );
    }

    // =========================================================================
    // STEP 2: IEnumVARIANT
    // =========================================================================
    println!("\n--- STEP 2: IEnumVARIANT ---");
    let enumerator = accessible.cast::<IEnumVARIANT>()?;
    loop {
        let mut item = VARIANT::empty();
        let mut fetched = 0;
        let hr = unsafe { (enumerator.vtbl().next)(enumerator.as_raw(), 1, &mut item, &mut fetched) };
        if fetched == 0 {
            break;
        }
        let item = unsafe { ScopedVariant::from_raw(item) };
        if let Value::Dispatch(Some(object)) = item.decode()? {
            let child = downcast::<AccessibleObject>(&object).ok_or(Error::NullPointer)?;
            let native = helpers.get_com_pointer::<IAccessible>(&object)?;
            let kind = native_role(&native, VARIANT::empty())?;
            let focused = child.state()? & state::FOCUSED != 0;
            println!("  {:<8} role {kind:?}, focused: {focused}", child.name()?.unwrap_or_default());
            check(unsafe { (native.vtbl().acc_do_default_action)(native.as_raw(), VARIANT::empty()) })?;
        }
        if hr != S_OK {
            break;
        }
    }

    // =========================================================================
    // STEP 3: late binding
    // =========================================================================
    println!("\n--- STEP 3: IDispatch ---");
    let dispatch = accessible.cast::<IDispatch>()?;
    println!("  Invoke(accRole) = {:?}", late_bound_role(&dispatch)?);

    // =========================================================================
    // STEP 4: UI Automation
    // =========================================================================
    println!("\n--- STEP 4: IRawElementProviderSimple ---");
    let simple = accessible.cast::<IRawElementProviderSimple>()?;
    for (label, id) in [
        ("Name", property::NAME),
        ("FrameworkId", property::FRAMEWORK_ID),
        ("IsInvokePatternAvailable", property::IS_INVOKE_PATTERN_AVAILABLE),
    ] {
        let mut out = ScopedVariant::empty();
        check(unsafe { (simple.vtbl().get_property_value)(simple.as_raw(), id, out.as_out()) })?;
        println!("  {label}: {:?}", out.decode()?);
    }

    // =========================================================================
    // STEP 5: identity
    // =========================================================================
    println!("\n--- STEP 5: round trip ---");
    let back = unsafe { helpers.unwrap(simple.as_raw(), false) }.ok_or(Error::NullPointer)?;
    let same = unsafe { helpers.wraps_same_object(&back, accessible.as_raw()) };
    println!("  provider unwraps to the dialog: {same}");

    drop((accessible, enumerator, dispatch, simple));
    println!("  wrapper alive after release: {}", helpers.has_wrapper(&dialog.as_object_ref()));

    println!("\n=== done ===");
    Ok(())
}
