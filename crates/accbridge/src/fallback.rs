//! System accessible objects as delegation targets.
//!
//! A facade that does not override a behavior forwards the call to an
//! accessible object the platform synthesizes for a window handle
//! (`CreateStdAccessibleObject`). The objects are created once per facade
//! and held as [`AgileComPointer`]s.
//!
//! The typed helpers on `AgileComPointer<IAccessible>` wrap the raw
//! `IAccessible` slots: output `BSTR`s are copied and freed, output
//! variants come back as [`ScopedVariant`]s, and `DISP_E_MEMBERNOTFOUND`
//! means "no value" rather than an error.

use std::ffi::c_void;
use std::ptr::{self, NonNull};
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::agile::AgileComPointer;
use crate::bstr::{self, BSTR};
use crate::com::{ComInterface, ComScope, DISP_E_MEMBERNOTFOUND, E_NOTIMPL, GUID, HRESULT, failed};
use crate::error::{Error, Result};
use crate::interfaces::{
    HWND, IAccessible, IAccessibleVTable, IDispatch, IEnumVARIANT, IOleWindow, Rect,
};
use crate::variant::{ScopedVariant, VARIANT};

// =============================================================================
// Factory
// =============================================================================

/// Producer of standard system accessible objects.
pub trait StdAccessibleFactory: Send + Sync {
    /// Create the system object for `(hwnd, object_id)` answering `iid`.
    /// The returned pointer carries one reference owned by the caller.
    fn create(&self, hwnd: HWND, object_id: i32, iid: &GUID) -> Result<NonNull<c_void>>;
}

static STD_FACTORY: OnceLock<Box<dyn StdAccessibleFactory>> = OnceLock::new();

/// Install the process-wide factory. Fails if one is already installed.
pub fn install_std_factory(
    factory: Box<dyn StdAccessibleFactory>,
) -> std::result::Result<(), Box<dyn StdAccessibleFactory>> {
    STD_FACTORY.set(factory)
}

/// The process-wide factory, if installed.
pub fn std_factory() -> Option<&'static dyn StdAccessibleFactory> {
    STD_FACTORY.get().map(Box::as_ref)
}

// =============================================================================
// SystemFallback
// =============================================================================

/// The system objects a facade delegates to.
#[derive(Debug)]
pub struct SystemObjects {
    pub accessible: Option<AgileComPointer<IAccessible>>,
    pub enum_variant: Option<AgileComPointer<IEnumVARIANT>>,
    pub ole_window: Option<AgileComPointer<IOleWindow>>,
}

/// Lazily created, then immutable, system delegation state.
#[derive(Debug, Default)]
pub struct SystemFallback {
    objects: OnceLock<SystemObjects>,
    init: Mutex<()>,
}

impl SystemFallback {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fallback state around an existing system `IAccessible`.
    #[must_use]
    pub fn from_accessible(accessible: AgileComPointer<IAccessible>) -> Self {
        let fallback = Self::new();
        let ole_window = Some(accessible.with_interface::<IOleWindow>()).filter(AgileComPointer::is_bound);
        let _ = fallback.objects.set(SystemObjects {
            accessible: Some(accessible),
            enum_variant: None,
            ole_window,
        });
        fallback
    }

    #[must_use]
    pub fn objects(&self) -> Option<&SystemObjects> {
        self.objects.get()
    }

    #[must_use]
    pub fn accessible(&self) -> Option<&AgileComPointer<IAccessible>> {
        self.objects.get()?.accessible.as_ref()
    }

    #[must_use]
    pub fn enum_variant(&self) -> Option<&AgileComPointer<IEnumVARIANT>> {
        self.objects.get()?.enum_variant.as_ref()
    }

    #[must_use]
    pub fn ole_window(&self) -> Option<&AgileComPointer<IOleWindow>> {
        self.objects.get()?.ole_window.as_ref()
    }

    /// Bind to the system objects for `(hwnd, object_id)` through the
    /// process-wide factory.
    pub fn use_std_accessible_objects(&self, hwnd: HWND, object_id: i32) -> Result<()> {
        if hwnd.is_null() {
            return Err(Error::NoWindow);
        }
        let factory = std_factory().ok_or(Error::Native(E_NOTIMPL))?;
        self.use_std_accessible_objects_with(factory, hwnd, object_id)
    }

    /// Bind to the system objects for `(hwnd, object_id)` through `factory`.
    ///
    /// Creation happens at most once; later calls keep the first objects.
    pub fn use_std_accessible_objects_with(
        &self,
        factory: &dyn StdAccessibleFactory,
        hwnd: HWND,
        object_id: i32,
    ) -> Result<()> {
        if hwnd.is_null() {
            return Err(Error::NoWindow);
        }
        if self.objects.get().is_some() {
            return Ok(());
        }

        let _init = self.init.lock();
        if self.objects.get().is_some() {
            return Ok(());
        }

        let accessible = create::<IAccessible>(factory, hwnd, object_id);
        let enum_variant = create::<IEnumVARIANT>(factory, hwnd, object_id);
        if let (Err(error), Err(_)) = (&accessible, &enum_variant) {
            return Err(error.clone());
        }

        let accessible = accessible.ok();
        let ole_window = accessible
            .as_ref()
            .map(AgileComPointer::with_interface::<IOleWindow>)
            .filter(AgileComPointer::is_bound);

        tracing::trace!(
            target: "accbridge::fallback",
            object_id,
            accessible = accessible.is_some(),
            enum_variant = enum_variant.is_ok(),
            ole_window = ole_window.is_some(),
            "bound system accessible objects"
        );

        let _ = self.objects.set(SystemObjects {
            accessible,
            enum_variant: enum_variant.ok(),
            ole_window,
        });
        Ok(())
    }
}

fn create<T: ComInterface>(
    factory: &dyn StdAccessibleFactory,
    hwnd: HWND,
    object_id: i32,
) -> Result<AgileComPointer<T>> {
    match factory.create(hwnd, object_id, &T::IID) {
        Ok(pointer) => Ok(unsafe { AgileComPointer::new(pointer.as_ptr(), true) }),
        Err(error) => {
            tracing::debug!(target: "accbridge::fallback", iid = %T::IID, %error, "no system object");
            Err(error)
        }
    }
}

// =============================================================================
// Typed forwarding helpers
// =============================================================================

type StringGetter = unsafe extern "system" fn(*mut c_void, VARIANT, *mut BSTR) -> HRESULT;
type VariantGetter = unsafe extern "system" fn(*mut c_void, VARIANT, *mut VARIANT) -> HRESULT;

/// Take an out-`BSTR`, freeing it on every path.
fn string_result(hr: HRESULT, out: BSTR) -> Result<Option<String>> {
    let value = (!out.is_null()).then(|| unsafe { bstr::take(out) });
    if hr == DISP_E_MEMBERNOTFOUND {
        return Ok(None);
    }
    if failed(hr) {
        return Err(Error::from_hresult(hr));
    }
    Ok(value)
}

fn check(hr: HRESULT) -> Result<()> {
    if failed(hr) {
        Err(Error::from_hresult(hr))
    } else {
        Ok(())
    }
}

impl AgileComPointer<IAccessible> {
    fn string_property(
        &self,
        child: &VARIANT,
        slot: fn(&IAccessibleVTable) -> StringGetter,
    ) -> Result<Option<String>> {
        let accessible = self.get_interface()?;
        let mut out: BSTR = ptr::null_mut();
        let hr = unsafe { slot(accessible.vtbl())(accessible.as_raw(), *child, &mut out) };
        string_result(hr, out)
    }

    fn int_property(
        &self,
        child: &VARIANT,
        slot: fn(&IAccessibleVTable) -> VariantGetter,
    ) -> Result<Option<i32>> {
        let accessible = self.get_interface()?;
        let mut out = ScopedVariant::empty();
        let hr = unsafe { slot(accessible.vtbl())(accessible.as_raw(), *child, out.as_out()) };
        if hr == DISP_E_MEMBERNOTFOUND {
            return Ok(None);
        }
        check(hr)?;
        Ok(out.get().as_i4())
    }

    fn variant_property(
        &self,
        slot: fn(&IAccessibleVTable) -> unsafe extern "system" fn(*mut c_void, *mut VARIANT) -> HRESULT,
    ) -> Result<ScopedVariant> {
        let accessible = self.get_interface()?;
        let mut out = ScopedVariant::empty();
        let hr = unsafe { slot(accessible.vtbl())(accessible.as_raw(), out.as_out()) };
        if hr == DISP_E_MEMBERNOTFOUND {
            return Ok(ScopedVariant::empty());
        }
        check(hr)?;
        Ok(out)
    }

    pub fn name(&self, child: &VARIANT) -> Result<Option<String>> {
        self.string_property(child, |v| v.get_acc_name)
    }

    pub fn value(&self, child: &VARIANT) -> Result<Option<String>> {
        self.string_property(child, |v| v.get_acc_value)
    }

    pub fn description(&self, child: &VARIANT) -> Result<Option<String>> {
        self.string_property(child, |v| v.get_acc_description)
    }

    pub fn help(&self, child: &VARIANT) -> Result<Option<String>> {
        self.string_property(child, |v| v.get_acc_help)
    }

    pub fn keyboard_shortcut(&self, child: &VARIANT) -> Result<Option<String>> {
        self.string_property(child, |v| v.get_acc_keyboard_shortcut)
    }

    pub fn default_action(&self, child: &VARIANT) -> Result<Option<String>> {
        self.string_property(child, |v| v.get_acc_default_action)
    }

    pub fn role(&self, child: &VARIANT) -> Result<Option<i32>> {
        self.int_property(child, |v| v.get_acc_role)
    }

    pub fn acc_state(&self, child: &VARIANT) -> Result<Option<i32>> {
        self.int_property(child, |v| v.get_acc_state)
    }

    pub fn child_count(&self) -> Result<i32> {
        let accessible = self.get_interface()?;
        let mut count = 0;
        check(unsafe { (accessible.vtbl().get_acc_child_count)(accessible.as_raw(), &mut count) })?;
        Ok(count)
    }

    /// `accChild`. A system object answers `S_FALSE` with null for simple
    /// elements, which is `None` here.
    pub fn child(&self, child: &VARIANT) -> Result<Option<ComScope<IDispatch>>> {
        let accessible = self.get_interface()?;
        let mut out = ptr::null_mut();
        let hr = unsafe { (accessible.vtbl().get_acc_child)(accessible.as_raw(), *child, &mut out) };
        let out = unsafe { ComScope::from_raw(out) };
        if hr == DISP_E_MEMBERNOTFOUND {
            return Ok(None);
        }
        check(hr)?;
        Ok(out)
    }

    pub fn parent(&self) -> Result<Option<ComScope<IDispatch>>> {
        let accessible = self.get_interface()?;
        let mut out = ptr::null_mut();
        let hr = unsafe { (accessible.vtbl().get_acc_parent)(accessible.as_raw(), &mut out) };
        let out = unsafe { ComScope::from_raw(out) };
        if hr == DISP_E_MEMBERNOTFOUND {
            return Ok(None);
        }
        check(hr)?;
        Ok(out)
    }

    pub fn focus(&self) -> Result<ScopedVariant> {
        self.variant_property(|v| v.get_acc_focus)
    }

    pub fn selection(&self) -> Result<ScopedVariant> {
        self.variant_property(|v| v.get_acc_selection)
    }

    pub fn location(&self, child: &VARIANT) -> Result<Rect> {
        let accessible = self.get_interface()?;
        let mut r = Rect::default();
        check(unsafe {
            (accessible.vtbl().acc_location)(
                accessible.as_raw(),
                &mut r.left,
                &mut r.top,
                &mut r.width,
                &mut r.height,
                *child,
            )
        })?;
        Ok(r)
    }

    pub fn navigate(&self, direction: i32, start: &VARIANT) -> Result<ScopedVariant> {
        let accessible = self.get_interface()?;
        let mut out = ScopedVariant::empty();
        let hr = unsafe {
            (accessible.vtbl().acc_navigate)(accessible.as_raw(), direction, *start, out.as_out())
        };
        check(hr)?;
        Ok(out)
    }

    /// `accHitTest`. `S_FALSE` (point outside the object) yields an empty variant.
    pub fn hit_test(&self, x: i32, y: i32) -> Result<ScopedVariant> {
        let accessible = self.get_interface()?;
        let mut out = ScopedVariant::empty();
        let hr = unsafe { (accessible.vtbl().acc_hit_test)(accessible.as_raw(), x, y, out.as_out()) };
        check(hr)?;
        Ok(out)
    }

    pub fn select(&self, flags: i32, child: &VARIANT) -> Result<()> {
        let accessible = self.get_interface()?;
        check(unsafe { (accessible.vtbl().acc_select)(accessible.as_raw(), flags, *child) })
    }

    pub fn do_default_action(&self, child: &VARIANT) -> Result<()> {
        let accessible = self.get_interface()?;
        check(unsafe { (accessible.vtbl().acc_do_default_action)(accessible.as_raw(), *child) })
    }

    /// `accHelpTopic`: the help file and topic id.
    pub fn help_topic(&self, child: &VARIANT) -> Result<(Option<String>, i32)> {
        let accessible = self.get_interface()?;
        let mut file: BSTR = ptr::null_mut();
        let mut topic = -1;
        let hr = unsafe {
            (accessible.vtbl().get_acc_help_topic)(accessible.as_raw(), &mut file, *child, &mut topic)
        };
        let file = string_result(hr, file)?;
        if hr == DISP_E_MEMBERNOTFOUND {
            return Ok((None, -1));
        }
        Ok((file, topic))
    }

    pub fn set_name(&self, child: &VARIANT, name: &str) -> Result<()> {
        self.put_string(child, name, |v| v.put_acc_name)
    }

    pub fn set_value(&self, child: &VARIANT, value: &str) -> Result<()> {
        self.put_string(child, value, |v| v.put_acc_value)
    }

    fn put_string(
        &self,
        child: &VARIANT,
        text: &str,
        slot: fn(&IAccessibleVTable) -> unsafe extern "system" fn(*mut c_void, VARIANT, BSTR) -> HRESULT,
    ) -> Result<()> {
        let accessible = self.get_interface()?;
        let text = bstr::alloc(text);
        let hr = unsafe { slot(accessible.vtbl())(accessible.as_raw(), *child, text) };
        unsafe { bstr::free(text) };
        check(hr)
    }
}

impl AgileComPointer<IOleWindow> {
    pub fn window(&self) -> Result<HWND> {
        let window = self.get_interface()?;
        let mut hwnd: HWND = ptr::null_mut();
        check(unsafe { (window.vtbl().get_window)(window.as_raw(), &mut hwnd) })?;
        Ok(hwnd)
    }

    pub fn context_sensitive_help(&self, enter_mode: bool) -> Result<()> {
        let window = self.get_interface()?;
        check(unsafe { (window.vtbl().context_sensitive_help)(window.as_raw(), i32::from(enter_mode)) })
    }
}
