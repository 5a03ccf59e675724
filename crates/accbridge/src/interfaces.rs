//! Interface declarations and wire constants for MSAA, UI Automation and OLE.
//!
//! Methods are listed in vtable order; a misordered slot is an ABI break that
//! native clients will call into the wrong function.

use std::ffi::c_void;

use crate::bstr::{BSTR, SAFEARRAY};
use crate::com::{GUID, HRESULT, IUnknown};
use crate::variant::VARIANT;

/// Native window handle.
pub type HWND = *mut c_void;

/// Argument block for `IDispatch::Invoke`. Arguments are stored in reverse order.
#[repr(C)]
#[derive(Debug)]
pub struct DISPPARAMS {
    pub args: *mut VARIANT,
    pub named_args: *mut i32,
    pub arg_count: u32,
    pub named_arg_count: u32,
}

/// Screen rectangle as UI Automation reports it.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UiaRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Integer screen rectangle as MSAA reports it through `accLocation`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    #[must_use]
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left
            && y >= self.top
            && i64::from(x) < i64::from(self.left) + i64::from(self.width)
            && i64::from(y) < i64::from(self.top) + i64::from(self.height)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

impl From<Rect> for UiaRect {
    fn from(r: Rect) -> Self {
        Self {
            left: f64::from(r.left),
            top: f64::from(r.top),
            width: f64::from(r.width),
            height: f64::from(r.height),
        }
    }
}

crate::com_interface! {
    /// OLE Automation late binding.
    pub interface IDispatch : IUnknown (0x00020400_0000_0000_C000_000000000046) {
        fn get_type_info_count(pctinfo: *mut u32) -> HRESULT;
        fn get_type_info(itinfo: u32, lcid: u32, pptinfo: *mut *mut c_void) -> HRESULT;
        fn get_ids_of_names(
            riid: *const GUID,
            names: *const *const u16,
            count: u32,
            lcid: u32,
            dispids: *mut i32,
        ) -> HRESULT;
        fn invoke(
            dispid: i32,
            riid: *const GUID,
            lcid: u32,
            flags: u16,
            params: *mut DISPPARAMS,
            result: *mut VARIANT,
            excep_info: *mut c_void,
            arg_err: *mut u32,
        ) -> HRESULT;
    }

    /// Dynamic dispatch extensions.
    pub interface IDispatchEx : IDispatch (0xA6EF9860_C720_11D0_9337_00A0C90DCAA9) {
        fn get_disp_id(name: BSTR, grfdex: u32, pid: *mut i32) -> HRESULT;
        fn invoke_ex(
            id: i32,
            lcid: u32,
            flags: u16,
            params: *mut DISPPARAMS,
            result: *mut VARIANT,
            excep_info: *mut c_void,
            caller: *mut c_void,
        ) -> HRESULT;
        fn delete_member_by_name(name: BSTR, grfdex: u32) -> HRESULT;
        fn delete_member_by_disp_id(id: i32) -> HRESULT;
        fn get_member_properties(id: i32, fetch: u32, pgrfdex: *mut u32) -> HRESULT;
        fn get_member_name(id: i32, name: *mut BSTR) -> HRESULT;
        fn get_next_disp_id(grfdex: u32, id: i32, pid: *mut i32) -> HRESULT;
        fn get_name_space_parent(punk: *mut *mut c_void) -> HRESULT;
    }

    /// MSAA accessible object.
    pub interface IAccessible : IDispatch (0x618736E0_3C3D_11CF_810C_00AA00389B71) {
        fn get_acc_parent(parent: *mut *mut c_void) -> HRESULT;
        fn get_acc_child_count(count: *mut i32) -> HRESULT;
        fn get_acc_child(child: VARIANT, dispatch: *mut *mut c_void) -> HRESULT;
        fn get_acc_name(child: VARIANT, name: *mut BSTR) -> HRESULT;
        fn get_acc_value(child: VARIANT, value: *mut BSTR) -> HRESULT;
        fn get_acc_description(child: VARIANT, description: *mut BSTR) -> HRESULT;
        fn get_acc_role(child: VARIANT, role: *mut VARIANT) -> HRESULT;
        fn get_acc_state(child: VARIANT, state: *mut VARIANT) -> HRESULT;
        fn get_acc_help(child: VARIANT, help: *mut BSTR) -> HRESULT;
        fn get_acc_help_topic(help_file: *mut BSTR, child: VARIANT, topic: *mut i32) -> HRESULT;
        fn get_acc_keyboard_shortcut(child: VARIANT, shortcut: *mut BSTR) -> HRESULT;
        fn get_acc_focus(child: *mut VARIANT) -> HRESULT;
        fn get_acc_selection(children: *mut VARIANT) -> HRESULT;
        fn get_acc_default_action(child: VARIANT, action: *mut BSTR) -> HRESULT;
        fn acc_select(flags: i32, child: VARIANT) -> HRESULT;
        fn acc_location(
            left: *mut i32,
            top: *mut i32,
            width: *mut i32,
            height: *mut i32,
            child: VARIANT,
        ) -> HRESULT;
        fn acc_navigate(direction: i32, start: VARIANT, end: *mut VARIANT) -> HRESULT;
        fn acc_hit_test(x: i32, y: i32, child: *mut VARIANT) -> HRESULT;
        fn acc_do_default_action(child: VARIANT) -> HRESULT;
        fn put_acc_name(child: VARIANT, name: BSTR) -> HRESULT;
        fn put_acc_value(child: VARIANT, value: BSTR) -> HRESULT;
    }

    /// Bridge from MSAA to UI Automation.
    pub interface IAccessibleEx : IUnknown (0xF8B80ADA_2C44_48D0_89BE_5FF23C9CD875) {
        fn get_object_for_child(child: i32, result: *mut *mut c_void) -> HRESULT;
        fn get_iaccessible_pair(accessible: *mut *mut c_void, child: *mut i32) -> HRESULT;
        fn get_runtime_id(result: *mut *mut SAFEARRAY) -> HRESULT;
        fn convert_returned_element(element: *mut c_void, result: *mut *mut c_void) -> HRESULT;
    }

    pub interface IServiceProvider : IUnknown (0x6D5140C1_7436_11CE_8034_00AA006009FA) {
        fn query_service(service: *const GUID, riid: *const GUID, ppv: *mut *mut c_void) -> HRESULT;
    }

    /// Child enumeration.
    pub interface IEnumVARIANT : IUnknown (0x00020404_0000_0000_C000_000000000046) {
        fn next(celt: u32, items: *mut VARIANT, fetched: *mut u32) -> HRESULT;
        fn skip(celt: u32) -> HRESULT;
        fn reset() -> HRESULT;
        fn clone(result: *mut *mut c_void) -> HRESULT;
    }

    pub interface IOleWindow : IUnknown (0x00000114_0000_0000_C000_000000000046) {
        fn get_window(hwnd: *mut HWND) -> HRESULT;
        fn context_sensitive_help(enter_mode: i32) -> HRESULT;
    }

    pub interface IRawElementProviderSimple : IUnknown (0xD6DD68D1_86FD_4332_8666_9ABEDEA2D24C) {
        fn get_provider_options(options: *mut i32) -> HRESULT;
        fn get_pattern_provider(pattern_id: i32, result: *mut *mut c_void) -> HRESULT;
        fn get_property_value(property_id: i32, result: *mut VARIANT) -> HRESULT;
        fn get_host_raw_element_provider(result: *mut *mut c_void) -> HRESULT;
    }

    pub interface IRawElementProviderFragment : IUnknown (0xF7063DA8_8359_439C_9297_BBC5299A7D87) {
        fn navigate(direction: i32, result: *mut *mut c_void) -> HRESULT;
        fn get_runtime_id(result: *mut *mut SAFEARRAY) -> HRESULT;
        fn get_bounding_rectangle(result: *mut UiaRect) -> HRESULT;
        fn get_embedded_fragment_roots(result: *mut *mut SAFEARRAY) -> HRESULT;
        fn set_focus() -> HRESULT;
        fn get_fragment_root(result: *mut *mut c_void) -> HRESULT;
    }

    pub interface IRawElementProviderFragmentRoot : IUnknown (0x620CE2A5_AB8F_40A9_86CB_DE3C75599B58) {
        fn element_provider_from_point(x: f64, y: f64, result: *mut *mut c_void) -> HRESULT;
        fn get_focus(result: *mut *mut c_void) -> HRESULT;
    }

    pub interface ILegacyIAccessibleProvider : IUnknown (0xE44C3566_915D_4070_99C6_047BFF5A08F5) {
        fn select(flags: i32) -> HRESULT;
        fn do_default_action() -> HRESULT;
        fn set_value(value: *const u16) -> HRESULT;
        fn get_iaccessible(accessible: *mut *mut c_void) -> HRESULT;
        fn get_child_id(result: *mut i32) -> HRESULT;
        fn get_name(result: *mut BSTR) -> HRESULT;
        fn get_value(result: *mut BSTR) -> HRESULT;
        fn get_description(result: *mut BSTR) -> HRESULT;
        fn get_role(result: *mut u32) -> HRESULT;
        fn get_state(result: *mut u32) -> HRESULT;
        fn get_help(result: *mut BSTR) -> HRESULT;
        fn get_keyboard_shortcut(result: *mut BSTR) -> HRESULT;
        fn get_selection(result: *mut *mut SAFEARRAY) -> HRESULT;
        fn get_default_action(result: *mut BSTR) -> HRESULT;
    }

    pub interface IInvokeProvider : IUnknown (0x54FCB24B_E18E_47A2_B4D3_ECCBE77599A2) {
        fn invoke() -> HRESULT;
    }

    pub interface IToggleProvider : IUnknown (0x56D00BD0_C4F4_433C_A836_1A52A57E0892) {
        fn toggle() -> HRESULT;
        fn get_toggle_state(result: *mut i32) -> HRESULT;
    }

    pub interface IValueProvider : IUnknown (0xC7935180_6FB3_4201_B174_7DF73ADBF64A) {
        fn set_value(value: *const u16) -> HRESULT;
        fn get_value(result: *mut BSTR) -> HRESULT;
        fn get_is_read_only(result: *mut i32) -> HRESULT;
    }

    pub interface IRangeValueProvider : IUnknown (0x36DC7AEF_33E6_4691_AFE1_2BE7274B3D33) {
        fn set_value(value: f64) -> HRESULT;
        fn get_value(result: *mut f64) -> HRESULT;
        fn get_is_read_only(result: *mut i32) -> HRESULT;
        fn get_maximum(result: *mut f64) -> HRESULT;
        fn get_minimum(result: *mut f64) -> HRESULT;
        fn get_large_change(result: *mut f64) -> HRESULT;
        fn get_small_change(result: *mut f64) -> HRESULT;
    }

    pub interface IExpandCollapseProvider : IUnknown (0xD847D3A5_CAB0_4A98_8C32_ECB45C59AD24) {
        fn expand() -> HRESULT;
        fn collapse() -> HRESULT;
        fn get_expand_collapse_state(result: *mut i32) -> HRESULT;
    }

    pub interface ISelectionProvider : IUnknown (0xFB8B03AF_3BDF_48D4_BD36_1A65793BE168) {
        fn get_selection(result: *mut *mut SAFEARRAY) -> HRESULT;
        fn get_can_select_multiple(result: *mut i32) -> HRESULT;
        fn get_is_selection_required(result: *mut i32) -> HRESULT;
    }

    pub interface ISelectionItemProvider : IUnknown (0x2ACAD808_B2D4_452D_A407_91FF1AD167B2) {
        fn select() -> HRESULT;
        fn add_to_selection() -> HRESULT;
        fn remove_from_selection() -> HRESULT;
        fn get_is_selected(result: *mut i32) -> HRESULT;
        fn get_selection_container(result: *mut *mut c_void) -> HRESULT;
    }

    pub interface IScrollItemProvider : IUnknown (0x2360C714_4BF1_4B26_BA65_9B21316127EB) {
        fn scroll_into_view() -> HRESULT;
    }

    pub interface IGridProvider : IUnknown (0xB17D6187_0907_464B_A168_0EF17A1572B1) {
        fn get_item(row: i32, column: i32, result: *mut *mut c_void) -> HRESULT;
        fn get_row_count(result: *mut i32) -> HRESULT;
        fn get_column_count(result: *mut i32) -> HRESULT;
    }

    pub interface IGridItemProvider : IUnknown (0xD02541F1_FB81_4D64_AE32_F520F8A6DBD1) {
        fn get_row(result: *mut i32) -> HRESULT;
        fn get_column(result: *mut i32) -> HRESULT;
        fn get_row_span(result: *mut i32) -> HRESULT;
        fn get_column_span(result: *mut i32) -> HRESULT;
        fn get_containing_grid(result: *mut *mut c_void) -> HRESULT;
    }

    /// Opt-in marker for free-threaded objects.
    pub interface IAgileObject : IUnknown (0x94EA2B94_E9CC_49E0_C0FF_EE64CA8F5B90) {}

    pub interface IAgileReference : IUnknown (0xC03F6A43_65A4_9818_987E_E0B810D2A6F2) {
        fn resolve(riid: *const GUID, ppv: *mut *mut c_void) -> HRESULT;
    }

    /// Answered only by wrappers this process created; yields the key of
    /// the wrapped object in the resolver's wrapper table.
    pub interface IManagedIdentity : IUnknown (0x5A3E9C71_0D2B_4F86_9B1C_7E40A2D6F813) {
        fn get_instance_key(key: *mut usize) -> HRESULT;
    }
}

// =============================================================================
// MSAA constants
// =============================================================================

/// Child id meaning "the object itself".
pub const CHILDID_SELF: i32 = 0;

pub const OBJID_WINDOW: i32 = 0;
pub const OBJID_CLIENT: i32 = 0xFFFF_FFFC_u32 as i32;

pub const NAVDIR_UP: i32 = 1;
pub const NAVDIR_DOWN: i32 = 2;
pub const NAVDIR_LEFT: i32 = 3;
pub const NAVDIR_RIGHT: i32 = 4;
pub const NAVDIR_NEXT: i32 = 5;
pub const NAVDIR_PREVIOUS: i32 = 6;
pub const NAVDIR_FIRSTCHILD: i32 = 7;
pub const NAVDIR_LASTCHILD: i32 = 8;

pub const SELFLAG_NONE: i32 = 0;
pub const SELFLAG_TAKEFOCUS: i32 = 0x1;
pub const SELFLAG_TAKESELECTION: i32 = 0x2;
pub const SELFLAG_EXTENDSELECTION: i32 = 0x4;
pub const SELFLAG_ADDSELECTION: i32 = 0x8;
pub const SELFLAG_REMOVESELECTION: i32 = 0x10;

/// `ROLE_SYSTEM_*` values.
pub mod role {
    pub const NONE: i32 = 0;
    pub const TITLEBAR: i32 = 0x1;
    pub const MENUBAR: i32 = 0x2;
    pub const SCROLLBAR: i32 = 0x3;
    pub const MENUPOPUP: i32 = 0xB;
    pub const MENUITEM: i32 = 0xC;
    pub const TOOLTIP: i32 = 0xD;
    pub const WINDOW: i32 = 0x9;
    pub const CLIENT: i32 = 0xA;
    pub const DOCUMENT: i32 = 0xF;
    pub const PANE: i32 = 0x10;
    pub const DIALOG: i32 = 0x12;
    pub const GROUPING: i32 = 0x14;
    pub const TOOLBAR: i32 = 0x16;
    pub const TABLE: i32 = 0x18;
    pub const COLUMNHEADER: i32 = 0x19;
    pub const ROWHEADER: i32 = 0x1A;
    pub const COLUMN: i32 = 0x1B;
    pub const ROW: i32 = 0x1C;
    pub const CELL: i32 = 0x1D;
    pub const LINK: i32 = 0x1E;
    pub const LIST: i32 = 0x21;
    pub const LISTITEM: i32 = 0x22;
    pub const OUTLINE: i32 = 0x23;
    pub const OUTLINEITEM: i32 = 0x24;
    pub const PAGETAB: i32 = 0x25;
    pub const STATICTEXT: i32 = 0x29;
    pub const TEXT: i32 = 0x2A;
    pub const PUSHBUTTON: i32 = 0x2B;
    pub const CHECKBUTTON: i32 = 0x2C;
    pub const RADIOBUTTON: i32 = 0x2D;
    pub const COMBOBOX: i32 = 0x2E;
    pub const PROGRESSBAR: i32 = 0x30;
    pub const SLIDER: i32 = 0x33;
    pub const SPINBUTTON: i32 = 0x34;
    pub const BUTTONDROPDOWN: i32 = 0x38;
    pub const BUTTONMENU: i32 = 0x39;
    pub const SPLITBUTTON: i32 = 0x3E;
}

/// `STATE_SYSTEM_*` flags.
pub mod state {
    pub const NORMAL: i32 = 0;
    pub const UNAVAILABLE: i32 = 0x1;
    pub const SELECTED: i32 = 0x2;
    pub const FOCUSED: i32 = 0x4;
    pub const PRESSED: i32 = 0x8;
    pub const CHECKED: i32 = 0x10;
    pub const MIXED: i32 = 0x20;
    pub const READONLY: i32 = 0x40;
    pub const HOTTRACKED: i32 = 0x80;
    pub const DEFAULT: i32 = 0x100;
    pub const EXPANDED: i32 = 0x200;
    pub const COLLAPSED: i32 = 0x400;
    pub const BUSY: i32 = 0x800;
    pub const INVISIBLE: i32 = 0x8000;
    pub const OFFSCREEN: i32 = 0x1_0000;
    pub const SIZEABLE: i32 = 0x2_0000;
    pub const FOCUSABLE: i32 = 0x10_0000;
    pub const SELECTABLE: i32 = 0x20_0000;
    pub const LINKED: i32 = 0x40_0000;
    pub const MULTISELECTABLE: i32 = 0x100_0000;
}

// =============================================================================
// Automation dispatch ids
// =============================================================================

pub const DISPID_UNKNOWN: i32 = -1;
pub const DISPID_STARTENUM: i32 = -1;

pub const DISPID_ACC_PARENT: i32 = -5000;
pub const DISPID_ACC_CHILDCOUNT: i32 = -5001;
pub const DISPID_ACC_CHILD: i32 = -5002;
pub const DISPID_ACC_NAME: i32 = -5003;
pub const DISPID_ACC_VALUE: i32 = -5004;
pub const DISPID_ACC_DESCRIPTION: i32 = -5005;
pub const DISPID_ACC_ROLE: i32 = -5006;
pub const DISPID_ACC_STATE: i32 = -5007;
pub const DISPID_ACC_HELP: i32 = -5008;
pub const DISPID_ACC_HELPTOPIC: i32 = -5009;
pub const DISPID_ACC_KEYBOARDSHORTCUT: i32 = -5010;
pub const DISPID_ACC_FOCUS: i32 = -5011;
pub const DISPID_ACC_SELECTION: i32 = -5012;
pub const DISPID_ACC_DEFAULTACTION: i32 = -5013;
pub const DISPID_ACC_SELECT: i32 = -5014;
pub const DISPID_ACC_LOCATION: i32 = -5015;
pub const DISPID_ACC_NAVIGATE: i32 = -5016;
pub const DISPID_ACC_HITTEST: i32 = -5017;
pub const DISPID_ACC_DODEFAULTACTION: i32 = -5018;

pub const DISPATCH_METHOD: u16 = 0x1;
pub const DISPATCH_PROPERTYGET: u16 = 0x2;
pub const DISPATCH_PROPERTYPUT: u16 = 0x4;
pub const DISPATCH_PROPERTYPUTREF: u16 = 0x8;

pub const FDEX_NAME_CASE_SENSITIVE: u32 = 0x1;
pub const FDEX_NAME_CASE_INSENSITIVE: u32 = 0x8;

// =============================================================================
// UI Automation constants
// =============================================================================

/// `UIA_*PatternId` values.
pub mod pattern {
    pub const INVOKE: i32 = 10000;
    pub const SELECTION: i32 = 10001;
    pub const VALUE: i32 = 10002;
    pub const RANGE_VALUE: i32 = 10003;
    pub const SCROLL: i32 = 10004;
    pub const EXPAND_COLLAPSE: i32 = 10005;
    pub const GRID: i32 = 10006;
    pub const GRID_ITEM: i32 = 10007;
    pub const MULTIPLE_VIEW: i32 = 10008;
    pub const WINDOW: i32 = 10009;
    pub const SELECTION_ITEM: i32 = 10010;
    pub const DOCK: i32 = 10011;
    pub const TABLE: i32 = 10012;
    pub const TABLE_ITEM: i32 = 10013;
    pub const TEXT: i32 = 10014;
    pub const TOGGLE: i32 = 10015;
    pub const TRANSFORM: i32 = 10016;
    pub const SCROLL_ITEM: i32 = 10017;
    pub const LEGACY_IACCESSIBLE: i32 = 10018;
}

/// `UIA_*PropertyId` values.
pub mod property {
    pub const RUNTIME_ID: i32 = 30000;
    pub const BOUNDING_RECTANGLE: i32 = 30001;
    pub const PROCESS_ID: i32 = 30002;
    pub const CONTROL_TYPE: i32 = 30003;
    pub const LOCALIZED_CONTROL_TYPE: i32 = 30004;
    pub const NAME: i32 = 30005;
    pub const ACCELERATOR_KEY: i32 = 30006;
    pub const ACCESS_KEY: i32 = 30007;
    pub const HAS_KEYBOARD_FOCUS: i32 = 30008;
    pub const IS_KEYBOARD_FOCUSABLE: i32 = 30009;
    pub const IS_ENABLED: i32 = 30010;
    pub const AUTOMATION_ID: i32 = 30011;
    pub const CLASS_NAME: i32 = 30012;
    pub const HELP_TEXT: i32 = 30013;
    pub const IS_CONTROL_ELEMENT: i32 = 30016;
    pub const IS_CONTENT_ELEMENT: i32 = 30017;
    pub const IS_PASSWORD: i32 = 30019;
    pub const NATIVE_WINDOW_HANDLE: i32 = 30020;
    pub const IS_OFFSCREEN: i32 = 30022;
    pub const FRAMEWORK_ID: i32 = 30024;
    pub const IS_EXPAND_COLLAPSE_PATTERN_AVAILABLE: i32 = 30028;
    pub const IS_GRID_ITEM_PATTERN_AVAILABLE: i32 = 30029;
    pub const IS_GRID_PATTERN_AVAILABLE: i32 = 30030;
    pub const IS_INVOKE_PATTERN_AVAILABLE: i32 = 30031;
    pub const IS_RANGE_VALUE_PATTERN_AVAILABLE: i32 = 30033;
    pub const IS_SCROLL_ITEM_PATTERN_AVAILABLE: i32 = 30035;
    pub const IS_SELECTION_ITEM_PATTERN_AVAILABLE: i32 = 30036;
    pub const IS_SELECTION_PATTERN_AVAILABLE: i32 = 30037;
    pub const IS_TOGGLE_PATTERN_AVAILABLE: i32 = 30041;
    pub const IS_VALUE_PATTERN_AVAILABLE: i32 = 30043;
    pub const VALUE_VALUE: i32 = 30045;
    pub const VALUE_IS_READ_ONLY: i32 = 30046;
    pub const RANGE_VALUE_VALUE: i32 = 30047;
    pub const EXPAND_COLLAPSE_STATE: i32 = 30070;
    pub const TOGGLE_STATE: i32 = 30086;
    pub const IS_LEGACY_IACCESSIBLE_PATTERN_AVAILABLE: i32 = 30090;
    pub const LEGACY_CHILD_ID: i32 = 30091;
    pub const LEGACY_NAME: i32 = 30092;
    pub const LEGACY_VALUE: i32 = 30093;
    pub const LEGACY_DESCRIPTION: i32 = 30094;
    pub const LEGACY_ROLE: i32 = 30095;
    pub const LEGACY_STATE: i32 = 30096;
    pub const LEGACY_HELP: i32 = 30097;
    pub const LEGACY_KEYBOARD_SHORTCUT: i32 = 30098;
    pub const LEGACY_DEFAULT_ACTION: i32 = 30100;
}

/// `ProviderOptions` flags.
pub mod provider_options {
    pub const CLIENT_SIDE: i32 = 0x1;
    pub const SERVER_SIDE: i32 = 0x2;
    pub const NON_CLIENT_AREA: i32 = 0x4;
    pub const OVERRIDE: i32 = 0x8;
    pub const PROVIDER_OWNS_SET_FOCUS: i32 = 0x10;
    pub const USE_COM_THREADING: i32 = 0x20;
}

/// `NavigateDirection` for fragment navigation.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigateDirection {
    Parent = 0,
    NextSibling = 1,
    PreviousSibling = 2,
    FirstChild = 3,
    LastChild = 4,
}

impl NavigateDirection {
    #[must_use]
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => Self::Parent,
            1 => Self::NextSibling,
            2 => Self::PreviousSibling,
            3 => Self::FirstChild,
            4 => Self::LastChild,
            _ => return None,
        })
    }
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandCollapseState {
    Collapsed = 0,
    Expanded = 1,
    PartiallyExpanded = 2,
    LeafNode = 3,
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    Off = 0,
    On = 1,
    Indeterminate = 2,
}

/// First element of a runtime id that UI Automation completes with the host's id.
pub const UIA_APPEND_RUNTIME_ID: i32 = 3;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::com::ComInterface;

    const PTR: usize = std::mem::size_of::<*const c_void>();

    #[test]
    fn test_slot_counts_match_idl() {
        assert_eq!(IDispatch::SLOT_COUNT, 7);
        assert_eq!(IDispatchEx::SLOT_COUNT, 15);
        assert_eq!(IAccessible::SLOT_COUNT, 28);
        assert_eq!(IEnumVARIANT::SLOT_COUNT, 7);
        assert_eq!(ILegacyIAccessibleProvider::SLOT_COUNT, 17);
        assert_eq!(IAgileObject::SLOT_COUNT, 3);
    }

    #[test]
    fn test_vtable_sizes_are_slot_counts() {
        assert_eq!(std::mem::size_of::<IAccessibleVTable>(), IAccessible::SLOT_COUNT * PTR);
        assert_eq!(std::mem::size_of::<IRangeValueProviderVTable>(), IRangeValueProvider::SLOT_COUNT * PTR);
        assert_eq!(std::mem::size_of::<IAgileObjectVTable>(), 3 * PTR);
    }

    #[test]
    fn test_accessible_iid() {
        assert_eq!(format!("{:?}", IAccessible::IID), "{618736E0-3C3D-11CF-810C-00AA00389B71}");
        assert_eq!(IEnumVARIANT::IID.to_string(), "00020404-0000-0000-c000-000000000046");
    }

    #[test]
    fn test_name_slot_offset() {
        // QueryInterface, AddRef, Release, 4 x IDispatch, parent, child count, child, name
        assert_eq!(std::mem::offset_of!(IAccessibleVTable, get_acc_name), 10 * PTR);
    }

    #[test]
    fn test_rect_contains() {
        let r = Rect::new(10, 10, 5, 5);
        assert!(r.contains(10, 10));
        assert!(r.contains(14, 14));
        assert!(!r.contains(15, 10));
        assert!(!r.contains(9, 12));
    }
}
