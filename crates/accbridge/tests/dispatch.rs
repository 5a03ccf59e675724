//! Tests for late-bound access through IDispatch and IDispatchEx

use std::ffi::c_void;
use std::ptr;
use std::sync::Arc;

use accbridge::bstr;
use accbridge::interfaces::*;
use accbridge::variant::{VT_BSTR, VT_BYREF, VT_I4};
use accbridge::*;
use parking_lot::Mutex;

/// A named button whose name can be changed.
struct Button {
    name: Mutex<String>,
}

impl AccessibleBehavior for Button {
    fn name(&self, _: &AccessibleObject) -> Result<Option<String>> {
        Ok(Some(self.name.lock().clone()))
    }

    fn set_name(&self, _: &AccessibleObject, name: &str) -> Result<()> {
        *self.name.lock() = name.to_string();
        Ok(())
    }

    fn role(&self, _: &AccessibleObject) -> Result<Option<i32>> {
        Ok(Some(role::PUSHBUTTON))
    }

    fn bounds(&self, _: &AccessibleObject) -> Result<Rect> {
        Ok(Rect::new(1, 2, 3, 4))
    }
}

fn button(name: &str) -> Arc<AccessibleObject> {
    AccessibleObject::new(Box::new(Button {
        name: Mutex::new(name.to_string()),
    }))
}

fn dispatch_of(object: &Arc<AccessibleObject>) -> ComScope<IDispatch> {
    ComHelpers::global()
        .get_com_pointer::<IDispatch>(&object.as_object_ref())
        .unwrap()
}

fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain([0]).collect()
}

fn ids_of_names(dispatch: &ComScope<IDispatch>, names: &[&str]) -> (HRESULT, Vec<i32>) {
    let wide: Vec<Vec<u16>> = names.iter().map(|name| wide(name)).collect();
    let pointers: Vec<*const u16> = wide.iter().map(|name| name.as_ptr()).collect();
    let mut ids = vec![0; names.len()];
    let hr = unsafe {
        (dispatch.vtbl().get_ids_of_names)(
            dispatch.as_raw(),
            &IID_IUNKNOWN,
            pointers.as_ptr(),
            names.len() as u32,
            0,
            ids.as_mut_ptr(),
        )
    };
    (hr, ids)
}

/// `Invoke` with `args` in declaration order.
fn invoke(dispatch: &ComScope<IDispatch>, dispid: i32, flags: u16, args: &[VARIANT]) -> (HRESULT, ScopedVariant) {
    let mut reversed: Vec<VARIANT> = args.iter().rev().copied().collect();
    let mut params = DISPPARAMS {
        args: reversed.as_mut_ptr(),
        named_args: ptr::null_mut(),
        arg_count: reversed.len() as u32,
        named_arg_count: 0,
    };
    let mut result = ScopedVariant::empty();
    let hr = unsafe {
        (dispatch.vtbl().invoke)(
            dispatch.as_raw(),
            dispid,
            &IID_IUNKNOWN,
            0,
            flags,
            &mut params,
            result.as_out(),
            ptr::null_mut(),
            ptr::null_mut(),
        )
    };
    (hr, result)
}

// =============================================================================
// Test: IDispatch
// =============================================================================

#[test]
fn test_names_resolve_case_insensitively() {
    let object = button("OK");
    let dispatch = dispatch_of(&object);

    assert_eq!(ids_of_names(&dispatch, &["accName"]), (S_OK, vec![DISPID_ACC_NAME]));
    assert_eq!(ids_of_names(&dispatch, &["ACCLOCATION"]), (S_OK, vec![DISPID_ACC_LOCATION]));
    assert_eq!(ids_of_names(&dispatch, &["accFrobnicate"]), (DISP_E_UNKNOWNNAME, vec![DISPID_UNKNOWN]));
}

#[test]
fn test_parameter_names_are_unknown() {
    let object = button("OK");
    let dispatch = dispatch_of(&object);
    assert_eq!(
        ids_of_names(&dispatch, &["accName", "varChild"]),
        (DISP_E_UNKNOWNNAME, vec![DISPID_ACC_NAME, DISPID_UNKNOWN])
    );
}

#[test]
fn test_type_info_is_absent() {
    let object = button("OK");
    let dispatch = dispatch_of(&object);
    let mut count = 7;
    assert_eq!(unsafe { (dispatch.vtbl().get_type_info_count)(dispatch.as_raw(), &mut count) }, S_OK);
    assert_eq!(count, 0);

    let mut info: *mut c_void = ptr::null_mut();
    assert_eq!(unsafe { (dispatch.vtbl().get_type_info)(dispatch.as_raw(), 0, 0, &mut info) }, E_NOTIMPL);
}

#[test]
fn test_invoke_property_get() {
    let object = button("OK");
    let dispatch = dispatch_of(&object);

    let (hr, name) = invoke(&dispatch, DISPID_ACC_NAME, DISPATCH_PROPERTYGET, &[]);
    assert_eq!(hr, S_OK);
    assert_eq!(name.decode(), Ok(Value::String("OK".into())));

    let (hr, kind) = invoke(&dispatch, DISPID_ACC_ROLE, DISPATCH_PROPERTYGET, &[VARIANT::from_i4(0)]);
    assert_eq!(hr, S_OK);
    assert_eq!(kind.decode(), Ok(Value::I4(role::PUSHBUTTON)));
}

#[test]
fn test_invoke_property_put() {
    let object = button("OK");
    let dispatch = dispatch_of(&object);

    let value = VARIANT::from_bstr(bstr::alloc("Cancel"));
    let (hr, _) = invoke(&dispatch, DISPID_ACC_NAME, DISPATCH_PROPERTYPUT, &[VARIANT::from_i4(0), value]);
    unsafe { bstr::free(value.data.bstr) };

    assert_eq!(hr, S_OK);
    assert_eq!(object.name(), Ok(Some("Cancel".to_string())));
}

#[test]
fn test_invoke_location_writes_byref_arguments() {
    let object = button("OK");
    let dispatch = dispatch_of(&object);

    let mut out = [0i32; 4];
    let mut args: Vec<VARIANT> = out
        .iter_mut()
        .map(|slot| {
            let mut arg = VARIANT::empty();
            arg.vt = VT_BYREF | VT_I4;
            arg.data.ptr = (slot as *mut i32).cast();
            arg
        })
        .collect();
    args.push(VARIANT::from_i4(0));

    let (hr, _) = invoke(&dispatch, DISPID_ACC_LOCATION, DISPATCH_METHOD, &args);
    assert_eq!(hr, S_OK);
    assert_eq!(out, [1, 2, 3, 4]);
}

#[test]
fn test_invoke_help_topic_writes_file() {
    let object = button("OK");
    let dispatch = dispatch_of(&object);

    let mut file: bstr::BSTR = ptr::null_mut();
    let mut file_arg = VARIANT::empty();
    file_arg.vt = VT_BYREF | VT_BSTR;
    file_arg.data.ptr = (&mut file as *mut bstr::BSTR).cast();

    let (hr, topic) = invoke(&dispatch, DISPID_ACC_HELPTOPIC, DISPATCH_PROPERTYGET, &[file_arg, VARIANT::from_i4(0)]);
    assert_eq!(hr, S_OK);
    assert_eq!(topic.decode(), Ok(Value::I4(-1)));
    assert!(file.is_null());
}

#[test]
fn test_invoke_unknown_member() {
    let object = button("OK");
    let dispatch = dispatch_of(&object);
    let (hr, result) = invoke(&dispatch, 12345, DISPATCH_METHOD, &[]);
    assert_eq!(hr, DISP_E_MEMBERNOTFOUND);
    assert!(result.get().is_empty());
}

#[test]
fn test_invoke_put_needs_value() {
    let object = button("OK");
    let dispatch = dispatch_of(&object);
    let (hr, _) = invoke(&dispatch, DISPID_ACC_NAME, DISPATCH_PROPERTYPUT, &[]);
    assert_eq!(hr, DISP_E_PARAMNOTFOUND);
}

// =============================================================================
// Test: IDispatchEx
// =============================================================================

#[test]
fn test_disp_id_honours_case_flag() {
    let object = button("OK");
    let ex = ComHelpers::global()
        .get_com_pointer::<IDispatchEx>(&object.as_object_ref())
        .unwrap();
    let name = bstr::alloc("accname");

    let mut id = 0;
    let hr = unsafe { (ex.vtbl().get_disp_id)(ex.as_raw(), name, FDEX_NAME_CASE_INSENSITIVE, &mut id) };
    assert_eq!((hr, id), (S_OK, DISPID_ACC_NAME));

    let hr = unsafe { (ex.vtbl().get_disp_id)(ex.as_raw(), name, FDEX_NAME_CASE_SENSITIVE, &mut id) };
    assert_eq!((hr, id), (DISP_E_UNKNOWNNAME, DISPID_UNKNOWN));

    unsafe { bstr::free(name) };
}

#[test]
fn test_members_enumerate_by_name() {
    let object = button("OK");
    let ex = ComHelpers::global()
        .get_com_pointer::<IDispatchEx>(&object.as_object_ref())
        .unwrap();

    let mut names = Vec::new();
    let mut id = DISPID_STARTENUM;
    loop {
        let mut next = 0;
        let hr = unsafe { (ex.vtbl().get_next_disp_id)(ex.as_raw(), 0, id, &mut next) };
        if hr == S_FALSE {
            break;
        }
        assert_eq!(hr, S_OK);

        let mut name: bstr::BSTR = ptr::null_mut();
        assert_eq!(unsafe { (ex.vtbl().get_member_name)(ex.as_raw(), next, &mut name) }, S_OK);
        names.push(unsafe { bstr::take(name) });
        id = next;
    }

    assert_eq!(names.len(), 19);
    assert_eq!(names.first().map(String::as_str), Some("accParent"));
    assert_eq!(names.last().map(String::as_str), Some("accDoDefaultAction"));
}

#[test]
fn test_invoke_ex_matches_invoke() {
    let object = button("Apply");
    let ex = ComHelpers::global()
        .get_com_pointer::<IDispatchEx>(&object.as_object_ref())
        .unwrap();

    let mut result = ScopedVariant::empty();
    let hr = unsafe {
        (ex.vtbl().invoke_ex)(
            ex.as_raw(),
            DISPID_ACC_NAME,
            0,
            DISPATCH_PROPERTYGET,
            ptr::null_mut(),
            result.as_out(),
            ptr::null_mut(),
            ptr::null_mut(),
        )
    };
    assert_eq!(hr, S_OK);
    assert_eq!(result.decode(), Ok(Value::String("Apply".into())));
}

#[test]
fn test_dynamic_members_cannot_be_deleted() {
    let object = button("OK");
    let ex = ComHelpers::global()
        .get_com_pointer::<IDispatchEx>(&object.as_object_ref())
        .unwrap();
    assert_eq!(unsafe { (ex.vtbl().delete_member_by_disp_id)(ex.as_raw(), DISPID_ACC_NAME) }, S_FALSE);
}
