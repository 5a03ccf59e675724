//! Late-bound access to the MSAA members.
//!
//! Script hosts and old automation clients reach `accName`, `accChild` and
//! the rest through `IDispatch::Invoke` or `IDispatchEx` instead of the
//! vtable. Members resolve by name to the standard `DISPID_ACC_*` ids and
//! are executed by [`AccessibleObject::invoke_member`].

use std::ffi::c_void;
use std::ptr;

use super::AccessibleObject;
use super::ccw::AccessibleCcw;
use crate::bstr::{self, BSTR};
use crate::com::{
    DISP_E_MEMBERNOTFOUND, DISP_E_PARAMNOTFOUND, DISP_E_UNKNOWNNAME, E_INVALIDARG, E_NOTIMPL,
    E_POINTER, GUID, HRESULT, IUnknownVTable, S_FALSE, S_OK,
};
use crate::error::{Error, Result};
use crate::interfaces::*;
use crate::variant::{ScopedVariant, VARIANT, VT_BSTR, VT_BYREF, VT_I4, Value};

const MEMBERS: &[(&str, i32)] = &[
    ("accParent", DISPID_ACC_PARENT),
    ("accChildCount", DISPID_ACC_CHILDCOUNT),
    ("accChild", DISPID_ACC_CHILD),
    ("accName", DISPID_ACC_NAME),
    ("accValue", DISPID_ACC_VALUE),
    ("accDescription", DISPID_ACC_DESCRIPTION),
    ("accRole", DISPID_ACC_ROLE),
    ("accState", DISPID_ACC_STATE),
    ("accHelp", DISPID_ACC_HELP),
    ("accHelpTopic", DISPID_ACC_HELPTOPIC),
    ("accKeyboardShortcut", DISPID_ACC_KEYBOARDSHORTCUT),
    ("accFocus", DISPID_ACC_FOCUS),
    ("accSelection", DISPID_ACC_SELECTION),
    ("accDefaultAction", DISPID_ACC_DEFAULTACTION),
    ("accSelect", DISPID_ACC_SELECT),
    ("accLocation", DISPID_ACC_LOCATION),
    ("accNavigate", DISPID_ACC_NAVIGATE),
    ("accHitTest", DISPID_ACC_HITTEST),
    ("accDoDefaultAction", DISPID_ACC_DODEFAULTACTION),
];

/// The dispatch id of member `name`.
pub(crate) fn member_id(name: &str, case_sensitive: bool) -> Option<i32> {
    MEMBERS
        .iter()
        .find(|(member, _)| {
            if case_sensitive {
                *member == name
            } else {
                member.eq_ignore_ascii_case(name)
            }
        })
        .map(|&(_, id)| id)
}

pub(crate) fn member_name(id: i32) -> Option<&'static str> {
    MEMBERS.iter().find(|&&(_, member)| member == id).map(|&(name, _)| name)
}

/// The member following `id` in enumeration order; `DISPID_STARTENUM` starts over.
fn next_member(id: i32) -> Option<Option<i32>> {
    if id == DISPID_STARTENUM {
        return Some(MEMBERS.first().map(|&(_, id)| id));
    }
    let index = MEMBERS.iter().position(|&(_, member)| member == id)?;
    Some(MEMBERS.get(index + 1).map(|&(_, id)| id))
}

// =============================================================================
// Argument access
// =============================================================================

fn arg_i32(args: &[VARIANT], index: usize) -> Result<i32> {
    let arg = args.get(index).ok_or(Error::Native(DISP_E_PARAMNOTFOUND))?;
    let value = arg.decode()?.as_i64().ok_or(Error::Native(E_INVALIDARG))?;
    i32::try_from(value).map_err(|_| Error::Native(E_INVALIDARG))
}

fn arg_string(args: &[VARIANT], index: usize) -> Result<String> {
    let arg = args.get(index).ok_or(Error::Native(DISP_E_PARAMNOTFOUND))?;
    match arg.decode()? {
        Value::String(text) => Ok(text),
        Value::Empty | Value::Null => Ok(String::new()),
        _ => Err(Error::Native(E_INVALIDARG)),
    }
}

/// An optional child id; absent means the object itself.
fn arg_child(args: &[VARIANT], index: usize) -> VARIANT {
    args.get(index).copied().unwrap_or_else(|| VARIANT::from_i4(CHILDID_SELF))
}

/// Store `value` through a `VT_BYREF | VT_I4` argument, if the caller passed one.
fn write_byref_i4(args: &[VARIANT], index: usize, value: i32) {
    if let Some(arg) = args.get(index) {
        let target = unsafe { arg.data.ptr }.cast::<i32>();
        if arg.vt == VT_BYREF | VT_I4 && !target.is_null() {
            unsafe { *target = value };
        }
    }
}

fn string_result(value: Option<String>) -> ScopedVariant {
    match value {
        Some(text) => unsafe { ScopedVariant::from_raw(VARIANT::from_bstr(bstr::alloc(&text))) },
        None => ScopedVariant::empty(),
    }
}

fn i4_result(value: Option<i32>) -> ScopedVariant {
    match value {
        Some(value) => unsafe { ScopedVariant::from_raw(VARIANT::from_i4(value)) },
        None => ScopedVariant::empty(),
    }
}

fn dispatch_result(value: Option<crate::ComScope<IDispatch>>) -> ScopedVariant {
    match value {
        Some(dispatch) => unsafe { ScopedVariant::from_raw(VARIANT::from_dispatch(dispatch.into_raw())) },
        None => ScopedVariant::empty(),
    }
}

impl AccessibleObject {
    /// Execute member `dispid` with `args` in declaration order.
    ///
    /// Property puts (`accName`, `accValue`) take the new value as the last
    /// argument. `accLocation` and `accHelpTopic` report through by-reference
    /// arguments when the caller supplies them.
    pub fn invoke_member(&self, dispid: i32, flags: u16, args: &[VARIANT]) -> Result<ScopedVariant> {
        let put = flags & (DISPATCH_PROPERTYPUT | DISPATCH_PROPERTYPUTREF) != 0;
        tracing::trace!(
            target: "accbridge::dispatch",
            member = member_name(dispid).unwrap_or("?"),
            put,
            args = args.len(),
            "late-bound call"
        );

        if put {
            let value_index = args.len().checked_sub(1).ok_or(Error::Native(DISP_E_PARAMNOTFOUND))?;
            let value = arg_string(args, value_index)?;
            let child = arg_child(&args[..value_index], 0);
            return match dispid {
                DISPID_ACC_NAME => self.acc_set_name(&child, &value),
                DISPID_ACC_VALUE => self.acc_set_value(&child, &value),
                _ => Err(Error::Native(DISP_E_MEMBERNOTFOUND)),
            }
            .map(|()| ScopedVariant::empty());
        }

        match dispid {
            DISPID_ACC_PARENT => self.acc_parent().map(dispatch_result),
            DISPID_ACC_CHILDCOUNT => self.acc_child_count().map(|n| i4_result(Some(n))),
            DISPID_ACC_CHILD => self.acc_child(&arg_child(args, 0)).map(dispatch_result),
            DISPID_ACC_NAME => self.acc_name(&arg_child(args, 0)).map(string_result),
            DISPID_ACC_VALUE => self.acc_value(&arg_child(args, 0)).map(string_result),
            DISPID_ACC_DESCRIPTION => self.acc_description(&arg_child(args, 0)).map(string_result),
            DISPID_ACC_ROLE => self.acc_role(&arg_child(args, 0)).map(i4_result),
            DISPID_ACC_STATE => self.acc_state(&arg_child(args, 0)).map(i4_result),
            DISPID_ACC_HELP => self.acc_help(&arg_child(args, 0)).map(string_result),
            DISPID_ACC_HELPTOPIC => {
                let (file, topic) = self.acc_help_topic(&arg_child(args, 1))?;
                if let Some(arg) = args.first() {
                    let target = unsafe { arg.data.ptr }.cast::<BSTR>();
                    if arg.vt == VT_BYREF | VT_BSTR && !target.is_null() {
                        unsafe { *target = file.as_deref().map_or(ptr::null_mut(), bstr::alloc) };
                    }
                }
                Ok(i4_result(Some(topic)))
            }
            DISPID_ACC_KEYBOARDSHORTCUT => self.acc_keyboard_shortcut(&arg_child(args, 0)).map(string_result),
            DISPID_ACC_FOCUS => self.acc_focus(),
            DISPID_ACC_SELECTION => self.acc_selection(),
            DISPID_ACC_DEFAULTACTION => self.acc_default_action(&arg_child(args, 0)).map(string_result),
            DISPID_ACC_SELECT => {
                let flags = arg_i32(args, 0)?;
                self.acc_select(flags, &arg_child(args, 1)).map(|()| ScopedVariant::empty())
            }
            DISPID_ACC_LOCATION => {
                let rect = self.acc_location(&arg_child(args, 4))?;
                for (index, value) in [rect.left, rect.top, rect.width, rect.height].into_iter().enumerate() {
                    write_byref_i4(args, index, value);
                }
                Ok(ScopedVariant::empty())
            }
            DISPID_ACC_NAVIGATE => {
                let direction = arg_i32(args, 0)?;
                self.acc_navigate(direction, &arg_child(args, 1))
            }
            DISPID_ACC_HITTEST => {
                let x = arg_i32(args, 0)?;
                let y = arg_i32(args, 1)?;
                self.acc_hit_test(x, y)
            }
            DISPID_ACC_DODEFAULTACTION => {
                self.acc_do_default_action(&arg_child(args, 0)).map(|()| ScopedVariant::empty())
            }
            _ => Err(Error::Native(DISP_E_MEMBERNOTFOUND)),
        }
    }
}

/// Run `Invoke` against the wrapper: `params` arrive last-argument-first.
///
/// # Safety
/// `params` must be null or a valid `DISPPARAMS`; `result` must be null or
/// writable.
unsafe fn invoke_params(
    object: &AccessibleObject,
    dispid: i32,
    flags: u16,
    params: *mut DISPPARAMS,
    result: *mut VARIANT,
) -> HRESULT {
    let mut args: Vec<VARIANT> = match unsafe { params.as_ref() } {
        Some(params) if params.arg_count > 0 => {
            if params.args.is_null() {
                return E_POINTER;
            }
            unsafe { std::slice::from_raw_parts(params.args, params.arg_count as usize) }.to_vec()
        }
        _ => Vec::new(),
    };
    args.reverse();

    if !result.is_null() {
        unsafe { result.write(VARIANT::empty()) };
    }
    match object.invoke_member(dispid, flags, &args) {
        Ok(value) => {
            if !result.is_null() {
                unsafe { result.write(value.into_raw()) };
            }
            S_OK
        }
        Err(error) => error.hresult(),
    }
}

// =============================================================================
// IDispatch, shared by every slot that derives from it
// =============================================================================

unsafe extern "system" fn get_type_info_count<const OFFSET: usize>(this: *mut c_void, count: *mut u32) -> HRESULT {
    crate::com_method!(this, _ccw: AccessibleCcw[@ OFFSET] => {
        crate::write_out!(count, 0);
        S_OK
    })
}

unsafe extern "system" fn get_type_info<const OFFSET: usize>(
    this: *mut c_void,
    _itinfo: u32,
    _lcid: u32,
    info: *mut *mut c_void,
) -> HRESULT {
    crate::com_method!(this, _ccw: AccessibleCcw[@ OFFSET] => {
        if !info.is_null() {
            unsafe { *info = ptr::null_mut() };
        }
        E_NOTIMPL
    })
}

unsafe extern "system" fn get_ids_of_names<const OFFSET: usize>(
    this: *mut c_void,
    _riid: *const GUID,
    names: *const *const u16,
    count: u32,
    _lcid: u32,
    dispids: *mut i32,
) -> HRESULT {
    crate::com_method!(this, _ccw: AccessibleCcw[@ OFFSET] => {
        if count == 0 {
            return S_OK;
        }
        if names.is_null() || dispids.is_null() {
            return E_POINTER;
        }

        let names = unsafe { std::slice::from_raw_parts(names, count as usize) };
        let dispids = unsafe { std::slice::from_raw_parts_mut(dispids, count as usize) };
        dispids.fill(DISPID_UNKNOWN);

        // Only the member name resolves; parameter names are unknown.
        let name = unsafe { bstr::wide_to_string(names[0]) };
        let Some(id) = member_id(&name, false) else {
            return DISP_E_UNKNOWNNAME;
        };
        dispids[0] = id;
        if count > 1 { DISP_E_UNKNOWNNAME } else { S_OK }
    })
}

unsafe extern "system" fn invoke<const OFFSET: usize>(
    this: *mut c_void,
    dispid: i32,
    _riid: *const GUID,
    _lcid: u32,
    flags: u16,
    params: *mut DISPPARAMS,
    result: *mut VARIANT,
    _excep_info: *mut c_void,
    _arg_err: *mut u32,
) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[@ OFFSET] => unsafe {
        invoke_params(&ccw.object, dispid, flags, params, result)
    })
}

/// `IDispatch` slots for the vtable-pointer field at byte offset `OFFSET`.
pub(super) const fn idispatch_vtable<const OFFSET: usize>(base: IUnknownVTable) -> IDispatchVTable {
    IDispatchVTable {
        base,
        get_type_info_count: get_type_info_count::<OFFSET>,
        get_type_info: get_type_info::<OFFSET>,
        get_ids_of_names: get_ids_of_names::<OFFSET>,
        invoke: invoke::<OFFSET>,
    }
}

// =============================================================================
// IDispatchEx
// =============================================================================

pub(super) unsafe extern "system" fn get_disp_id(this: *mut c_void, name: BSTR, grfdex: u32, pid: *mut i32) -> HRESULT {
    crate::com_method!(this, _ccw: AccessibleCcw[vtbl_dispatch_ex] => {
        if pid.is_null() {
            return E_POINTER;
        }
        unsafe { *pid = DISPID_UNKNOWN };
        let name = unsafe { bstr::to_string(name) };
        match member_id(&name, grfdex & FDEX_NAME_CASE_SENSITIVE != 0) {
            Some(id) => {
                unsafe { *pid = id };
                S_OK
            }
            None => DISP_E_UNKNOWNNAME,
        }
    })
}

pub(super) unsafe extern "system" fn invoke_ex(
    this: *mut c_void,
    id: i32,
    _lcid: u32,
    flags: u16,
    params: *mut DISPPARAMS,
    result: *mut VARIANT,
    _excep_info: *mut c_void,
    _caller: *mut c_void,
) -> HRESULT {
    crate::com_method!(this, ccw: AccessibleCcw[vtbl_dispatch_ex] => unsafe {
        invoke_params(&ccw.object, id, flags, params, result)
    })
}

pub(super) unsafe extern "system" fn delete_member_by_name(this: *mut c_void, _name: BSTR, _grfdex: u32) -> HRESULT {
    crate::com_method!(this, _ccw: AccessibleCcw[vtbl_dispatch_ex] => S_FALSE)
}

pub(super) unsafe extern "system" fn delete_member_by_disp_id(this: *mut c_void, _id: i32) -> HRESULT {
    crate::com_method!(this, _ccw: AccessibleCcw[vtbl_dispatch_ex] => S_FALSE)
}

pub(super) unsafe extern "system" fn get_member_properties(
    this: *mut c_void,
    _id: i32,
    _fetch: u32,
    pgrfdex: *mut u32,
) -> HRESULT {
    crate::com_method!(this, _ccw: AccessibleCcw[vtbl_dispatch_ex] => {
        if !pgrfdex.is_null() {
            unsafe { *pgrfdex = 0 };
        }
        E_NOTIMPL
    })
}

pub(super) unsafe extern "system" fn get_member_name(this: *mut c_void, id: i32, name: *mut BSTR) -> HRESULT {
    crate::com_method!(this, _ccw: AccessibleCcw[vtbl_dispatch_ex] => {
        if name.is_null() {
            return E_POINTER;
        }
        unsafe { *name = ptr::null_mut() };
        match member_name(id) {
            Some(member) => {
                unsafe { *name = bstr::alloc(member) };
                S_OK
            }
            None => DISP_E_MEMBERNOTFOUND,
        }
    })
}

pub(super) unsafe extern "system" fn get_next_disp_id(this: *mut c_void, _grfdex: u32, id: i32, pid: *mut i32) -> HRESULT {
    crate::com_method!(this, _ccw: AccessibleCcw[vtbl_dispatch_ex] => {
        if pid.is_null() {
            return E_POINTER;
        }
        unsafe { *pid = DISPID_STARTENUM };
        match next_member(id) {
            Some(Some(next)) => {
                unsafe { *pid = next };
                S_OK
            }
            Some(None) => S_FALSE,
            None => DISP_E_MEMBERNOTFOUND,
        }
    })
}

pub(super) unsafe extern "system" fn get_name_space_parent(this: *mut c_void, punk: *mut *mut c_void) -> HRESULT {
    crate::com_method!(this, _ccw: AccessibleCcw[vtbl_dispatch_ex] => {
        crate::write_out!(punk, ptr::null_mut());
        E_NOTIMPL
    })
}
