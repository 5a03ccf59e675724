//! The accessible object facade.
//!
//! An [`AccessibleObject`] pairs overridable behavior ([`AccessibleBehavior`])
//! with a wrapped system accessible object. Native clients reach it through
//! a single wrapper answering `IAccessible`, `IEnumVARIANT`, `IOleWindow`,
//! `IDispatchEx`, `IAccessibleEx` and the UI Automation provider interfaces.
//!
//! Calls that name a child take an MSAA child id:
//!
//! | Id | Meaning |
//! |----|---------|
//! | `VT_EMPTY`, `CHILDID_SELF`, `DISP_E_PARAMNOTFOUND` | the object itself |
//! | `1..=child_count()` | child `n - 1` of the object's own children |
//! | anything else | opaque, forwarded unchanged to the system object |
//!
//! Only client objects (`OBJID_CLIENT`) answer from their behavior;
//! non-client objects forward every call.

mod behavior;
mod ccw;
mod dispatch;
mod uia;

use std::cell::Cell;
use std::ffi::c_void;
use std::ptr;
use std::sync::{Arc, Weak};

pub use behavior::{AccessibleBehavior, SystemBehavior};

use crate::agile::AgileComPointer;
use crate::com::{ComInterface, ComScope, DISP_E_PARAMNOTFOUND, query_interface};
use crate::enum_variant::ChildEnumerator;
use crate::error::Result;
use crate::fallback::{StdAccessibleFactory, SystemFallback};
use crate::interfaces::{
    CHILDID_SELF, HWND, IAccessible, IDispatch, NAVDIR_DOWN, NAVDIR_FIRSTCHILD, NAVDIR_LASTCHILD,
    NAVDIR_LEFT, NAVDIR_NEXT, NAVDIR_PREVIOUS, NAVDIR_RIGHT, NAVDIR_UP, OBJID_CLIENT, Rect,
    UIA_APPEND_RUNTIME_ID, pattern, property, role, state,
};
use crate::resolver::{ComHelpers, ComObject, ObjectRef, WrapperSource, downcast};
use crate::variant::{ScopedVariant, VARIANT, VT_DISPATCH, VT_EMPTY, VT_ERROR, VT_I4, VT_INT, Value};

/// How a child id resolves against one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildId {
    /// The object itself.
    Itself,
    /// Index into the object's own children.
    Local(i32),
    /// Not resolvable here; passed to the system object unchanged.
    Forwarded,
}

/// Whether `id` names the object itself.
#[must_use]
/// Fold an address into 32 bits, keeping the high half on 64-bit targets.
fn identity_hash(address: usize) -> i32 {
    let address = address as u64;
    (address ^ (address >> 32)) as i32
}

pub fn is_self_id(id: &VARIANT) -> bool {
    match id.vt {
        VT_EMPTY => true,
        VT_I4 | VT_INT | VT_ERROR => {
            let raw = unsafe { id.data.l };
            (id.vt != VT_ERROR && raw == CHILDID_SELF) || raw == DISP_E_PARAMNOTFOUND
        }
        _ => false,
    }
}

thread_local! {
    static NAME_FALLBACK_ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// Marks a parent-name lookup on this thread; nested lookups don't inherit again.
struct NameFallbackGuard(bool);

impl NameFallbackGuard {
    fn enter() -> Self {
        Self(NAME_FALLBACK_ACTIVE.replace(true))
    }
}

impl Drop for NameFallbackGuard {
    fn drop(&mut self) {
        NAME_FALLBACK_ACTIVE.set(self.0);
    }
}

/// A Rust accessible object exposed to native accessibility clients.
pub struct AccessibleObject {
    this: Weak<AccessibleObject>,
    behavior: Box<dyn AccessibleBehavior>,
    system: SystemFallback,
    object_id: i32,
    system_wrapper: bool,
    enumerator: ChildEnumerator,
}

impl AccessibleObject {
    /// A client object driven by `behavior`.
    pub fn new(behavior: Box<dyn AccessibleBehavior>) -> Arc<Self> {
        Self::with_object_id(behavior, OBJID_CLIENT)
    }

    /// An object for a specific `OBJID_*`. Anything but `OBJID_CLIENT`
    /// is a pure pass-through to the system object.
    pub fn with_object_id(behavior: Box<dyn AccessibleBehavior>, object_id: i32) -> Arc<Self> {
        Self::build(behavior, SystemFallback::new(), object_id, false)
    }

    /// Wrap a system accessible object the Rust side has never seen.
    pub fn system_wrapper(accessible: AgileComPointer<IAccessible>) -> Arc<Self> {
        Self::build(
            Box::new(SystemBehavior),
            SystemFallback::from_accessible(accessible),
            OBJID_CLIENT,
            true,
        )
    }

    fn build(
        behavior: Box<dyn AccessibleBehavior>,
        system: SystemFallback,
        object_id: i32,
        system_wrapper: bool,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            behavior,
            system,
            object_id,
            system_wrapper,
            enumerator: ChildEnumerator::new(this.clone()),
        })
    }

    /// A strong handle to this object, if it is still alive.
    #[must_use]
    pub fn arc(&self) -> Option<Arc<Self>> {
        self.this.upgrade()
    }

    /// This object as a resolver handle.
    #[must_use]
    pub fn as_object_ref(self: &Arc<Self>) -> ObjectRef {
        self.clone()
    }

    #[must_use]
    pub fn behavior(&self) -> &dyn AccessibleBehavior {
        self.behavior.as_ref()
    }

    #[must_use]
    pub fn system(&self) -> &SystemFallback {
        &self.system
    }

    #[must_use]
    pub fn object_id(&self) -> i32 {
        self.object_id
    }

    #[must_use]
    pub fn is_client_object(&self) -> bool {
        self.object_id == OBJID_CLIENT
    }

    #[must_use]
    pub fn is_system_wrapper(&self) -> bool {
        self.system_wrapper
    }

    pub(crate) fn enumerator(&self) -> &ChildEnumerator {
        &self.enumerator
    }

    fn is(&self, other: &Arc<Self>) -> bool {
        ptr::eq(self, Arc::as_ptr(other))
    }

    /// Bind the system objects for `hwnd` through the installed factory.
    pub fn use_std_accessible_objects(&self, hwnd: HWND, object_id: i32) -> Result<()> {
        self.system.use_std_accessible_objects(hwnd, object_id)
    }

    pub fn use_std_accessible_objects_with(
        &self,
        factory: &dyn StdAccessibleFactory,
        hwnd: HWND,
        object_id: i32,
    ) -> Result<()> {
        self.system.use_std_accessible_objects_with(factory, hwnd, object_id)
    }

    /// Classify `id` against this object's children.
    #[must_use]
    pub fn resolve_child_id(&self, id: &VARIANT) -> ChildId {
        if is_self_id(id) {
            return ChildId::Itself;
        }
        match id.as_i4() {
            Some(n) if n >= 1 && n <= self.child_count() => ChildId::Local(n - 1),
            Some(n) => {
                tracing::debug!(target: "accbridge::accessible", child_id = n, "forwarding child id");
                ChildId::Forwarded
            }
            None => ChildId::Forwarded,
        }
    }

    fn forward<R: Default>(&self, call: impl FnOnce(&AgileComPointer<IAccessible>) -> Result<R>) -> Result<R> {
        match self.system.accessible() {
            Some(accessible) => call(accessible),
            None => Ok(R::default()),
        }
    }

    /// The common shape of a child-addressed MSAA call.
    fn dispatch_child<R: Default>(
        &self,
        id: &VARIANT,
        local: impl FnOnce(&AccessibleObject) -> Result<R>,
        system: impl FnOnce(&AgileComPointer<IAccessible>) -> Result<R>,
    ) -> Result<R> {
        if self.is_client_object() {
            match self.resolve_child_id(id) {
                ChildId::Itself => return local(self),
                ChildId::Local(index) => {
                    if let Some(child) = self.child(index) {
                        return local(&*child);
                    }
                }
                ChildId::Forwarded => {}
            }
        }
        self.forward(system)
    }

    // =========================================================================
    // Managed surface
    // =========================================================================

    pub fn bounds(&self) -> Result<Rect> {
        self.behavior.bounds(self)
    }

    pub fn default_action(&self) -> Result<Option<String>> {
        self.behavior.default_action(self)
    }

    pub fn description(&self) -> Result<Option<String>> {
        self.behavior.description(self)
    }

    pub fn help(&self) -> Result<Option<String>> {
        self.behavior.help(self)
    }

    pub fn keyboard_shortcut(&self) -> Result<Option<String>> {
        self.behavior.keyboard_shortcut(self)
    }

    pub fn name(&self) -> Result<Option<String>> {
        self.behavior.name(self)
    }

    pub fn set_name(&self, name: &str) -> Result<()> {
        self.behavior.set_name(self, name)
    }

    pub fn value(&self) -> Result<Option<String>> {
        self.behavior.value(self)
    }

    pub fn set_value(&self, value: &str) -> Result<()> {
        self.behavior.set_value(self, value)
    }

    pub fn role(&self) -> Result<Option<i32>> {
        self.behavior.role(self)
    }

    pub fn state(&self) -> Result<i32> {
        self.behavior.state(self)
    }

    pub fn help_topic(&self) -> Result<(Option<String>, i32)> {
        self.behavior.help_topic(self)
    }

    /// The parent, never this object itself.
    pub fn parent(&self) -> Result<Option<Arc<Self>>> {
        let parent = self.behavior.parent(self)?;
        Ok(parent.filter(|parent| {
            let cyclic = self.is(parent);
            if cyclic {
                tracing::warn!(target: "accbridge::accessible", "object reported itself as its own parent");
            }
            !cyclic
        }))
    }

    /// Own child at `index`, never this object itself.
    #[must_use]
    pub fn child(&self, index: i32) -> Option<Arc<Self>> {
        let child = self.behavior.child(self, index)?;
        if self.is(&child) {
            tracing::warn!(target: "accbridge::accessible", index, "object reported itself as its own child");
            return None;
        }
        Some(child)
    }

    /// Number of own children, -1 when enumeration belongs to the system object.
    #[must_use]
    pub fn child_count(&self) -> i32 {
        self.behavior.child_count(self)
    }

    #[must_use]
    pub fn sys_child_order(&self) -> Option<Vec<i32>> {
        self.behavior.sys_child_order(self)
    }

    pub fn focused(&self) -> Result<Option<Arc<Self>>> {
        self.behavior.focused(self)
    }

    pub fn selected(&self) -> Result<Option<Arc<Self>>> {
        self.behavior.selected(self)
    }

    pub fn hit_test(&self, x: i32, y: i32) -> Result<Option<Arc<Self>>> {
        self.behavior.hit_test(self, x, y)
    }

    /// Object reached by `direction`, never this object itself.
    pub fn navigate(&self, direction: i32) -> Result<Option<Arc<Self>>> {
        let found = self.behavior.navigate(self, direction)?;
        Ok(self.not_self(found, direction))
    }

    fn not_self(&self, found: Option<Arc<Self>>, direction: i32) -> Option<Arc<Self>> {
        let found = found?;
        if self.is(&found) {
            tracing::warn!(target: "accbridge::accessible", direction, "navigation returned the object itself");
            return None;
        }
        Some(found)
    }

    pub fn select(&self, flags: i32) -> Result<()> {
        self.behavior.select(self, flags)
    }

    pub fn do_default_action(&self) -> Result<()> {
        self.behavior.do_default_action(self)
    }

    // =========================================================================
    // Platform defaults
    // =========================================================================

    pub fn default_bounds(&self) -> Result<Rect> {
        self.forward(|s| s.location(&self_id()))
    }

    pub fn default_default_action(&self) -> Result<Option<String>> {
        self.forward(|s| s.default_action(&self_id()))
    }

    pub fn default_description(&self) -> Result<Option<String>> {
        self.forward(|s| s.description(&self_id()))
    }

    pub fn default_help(&self) -> Result<Option<String>> {
        self.forward(|s| s.help(&self_id()))
    }

    pub fn default_keyboard_shortcut(&self) -> Result<Option<String>> {
        self.forward(|s| s.keyboard_shortcut(&self_id()))
    }

    /// The system name; when it is empty, the parent's name. The fallback
    /// applies once: a parent asked for its name here doesn't consult its
    /// own parent.
    pub fn default_name(&self) -> Result<Option<String>> {
        let name = self.forward(|s| s.name(&self_id()))?;
        if name.as_deref().is_some_and(|n| !n.is_empty()) || NAME_FALLBACK_ACTIVE.get() {
            return Ok(name);
        }

        let _guard = NameFallbackGuard::enter();
        let Some(parent) = self.parent()? else {
            return Ok(name);
        };
        let inherited = parent.name()?;
        Ok(if inherited.as_deref().is_some_and(|n| !n.is_empty()) {
            inherited
        } else {
            name
        })
    }

    pub fn default_set_name(&self, name: &str) -> Result<()> {
        self.forward(|s| s.set_name(&self_id(), name))
    }

    pub fn default_value(&self) -> Result<Option<String>> {
        match self.system.accessible() {
            Some(accessible) => accessible.value(&self_id()),
            None => Ok(Some(String::new())),
        }
    }

    pub fn default_set_value(&self, value: &str) -> Result<()> {
        self.forward(|s| s.set_value(&self_id(), value))
    }

    pub fn default_parent(&self) -> Result<Option<Arc<Self>>> {
        let parent = self.forward(AgileComPointer::parent)?;
        Ok(parent.and_then(|dispatch| self.try_get_accessible_object_from_pointer(dispatch.as_raw())))
    }

    pub fn default_role(&self) -> Result<Option<i32>> {
        self.forward(|s| s.role(&self_id()))
    }

    pub fn default_state(&self) -> Result<i32> {
        Ok(self.forward(|s| s.acc_state(&self_id()))?.unwrap_or(state::NORMAL))
    }

    pub fn default_help_topic(&self) -> Result<(Option<String>, i32)> {
        match self.system.accessible() {
            Some(accessible) => accessible.help_topic(&self_id()),
            None => Ok((None, -1)),
        }
    }

    /// The first own child carrying `flag`, else self when it carries it.
    fn child_with_state(&self, flag: i32) -> Result<Option<Option<Arc<Self>>>> {
        let count = self.child_count();
        if count < 0 {
            return Ok(None);
        }
        for index in 0..count {
            if let Some(child) = self.child(index) {
                if child.state()? & flag != 0 {
                    return Ok(Some(Some(child)));
                }
            }
        }
        Ok(Some(if self.state()? & flag != 0 { self.arc() } else { None }))
    }

    pub fn default_focused(&self) -> Result<Option<Arc<Self>>> {
        if let Some(found) = self.child_with_state(state::FOCUSED)? {
            return Ok(found);
        }
        match self.system.accessible() {
            Some(accessible) => Ok(self.try_get_accessible_object(accessible.focus()?)),
            None => Ok(None),
        }
    }

    pub fn default_selected(&self) -> Result<Option<Arc<Self>>> {
        if let Some(found) = self.child_with_state(state::SELECTED)? {
            return Ok(found);
        }
        match self.system.accessible() {
            Some(accessible) => Ok(self.try_get_accessible_object(accessible.selection()?)),
            None => Ok(None),
        }
    }

    pub fn default_hit_test(&self, x: i32, y: i32) -> Result<Option<Arc<Self>>> {
        let count = self.child_count();
        if count >= 0 {
            for index in 0..count {
                if let Some(child) = self.child(index) {
                    if child.bounds()?.contains(x, y) {
                        return Ok(Some(child));
                    }
                }
            }
            return Ok(self.arc());
        }

        match self.system.accessible() {
            Some(accessible) => match accessible.hit_test(x, y) {
                Ok(found) => Ok(self.try_get_accessible_object(found)),
                Err(_) => Ok(None),
            },
            None => Ok(if self.bounds()?.contains(x, y) { self.arc() } else { None }),
        }
    }

    pub fn default_navigate(&self, direction: i32) -> Result<Option<Arc<Self>>> {
        let count = self.child_count();
        if count >= 0 {
            match direction {
                NAVDIR_FIRSTCHILD => return Ok(self.child(0)),
                NAVDIR_LASTCHILD => return Ok(self.child(count - 1)),
                NAVDIR_PREVIOUS | NAVDIR_UP | NAVDIR_LEFT | NAVDIR_NEXT | NAVDIR_DOWN | NAVDIR_RIGHT => {
                    let parent = self.parent().ok().flatten();
                    if parent.is_some_and(|parent| parent.child_count() > 0) {
                        return Ok(None);
                    }
                }
                _ => {}
            }
        }

        let Some(accessible) = self.system.accessible() else {
            return Ok(None);
        };
        if let Some(found) = self.behavior.sys_child(self, direction) {
            return Ok(self.not_self(found, direction));
        }
        Ok(self.try_get_accessible_object(accessible.navigate(direction, &self_id())?))
    }

    pub fn default_select(&self, flags: i32) -> Result<()> {
        self.forward(|s| s.select(flags, &self_id()))
    }

    pub fn default_do_default_action(&self) -> Result<()> {
        self.forward(|s| s.do_default_action(&self_id()))
    }

    /// System wrappers get `[UIA_APPEND_RUNTIME_ID, identity]`; other
    /// objects must provide their own.
    #[must_use]
    pub fn default_runtime_id(&self) -> Option<Vec<i32>> {
        self.system_wrapper
            .then(|| vec![UIA_APPEND_RUNTIME_ID, identity_hash(ptr::from_ref(self) as usize)])
    }

    /// Whether the MSAA proxy would report the invoke pattern, judged from
    /// role and default action.
    #[must_use]
    pub fn is_invoke_pattern_available(&self) -> bool {
        match self.role().ok().flatten() {
            Some(
                role::MENUITEM
                | role::LINK
                | role::PUSHBUTTON
                | role::BUTTONDROPDOWN
                | role::BUTTONMENU
                | role::SPLITBUTTON
                | role::CHECKBUTTON
                | role::CELL
                | role::LISTITEM,
            ) => true,
            None
            | Some(
                role::NONE
                | role::CLIENT
                | role::DIALOG
                | role::COLUMN
                | role::ROW
                | role::PAGETAB
                | role::WINDOW,
            ) => false,
            Some(_) => self
                .default_action()
                .ok()
                .flatten()
                .is_some_and(|action| !action.is_empty()),
        }
    }

    pub fn default_property_value(&self, property_id: i32) -> Result<Value> {
        let text_or_empty = |s: Option<String>| Value::String(s.unwrap_or_default());
        let non_empty = |s: Option<String>| match s {
            Some(s) if !s.is_empty() => Value::String(s),
            _ => Value::Empty,
        };
        let supports = |pattern_id| Value::Bool(self.behavior.is_pattern_supported(self, pattern_id));

        Ok(match property_id {
            property::ACCESS_KEY => text_or_empty(self.keyboard_shortcut()?),
            property::AUTOMATION_ID => self.behavior.automation_id(self).map_or(Value::Empty, Value::String),
            property::FRAMEWORK_ID => Value::String(self.behavior.framework_id(self).to_string()),
            property::HELP_TEXT => text_or_empty(self.help()?),
            property::IS_EXPAND_COLLAPSE_PATTERN_AVAILABLE => supports(pattern::EXPAND_COLLAPSE),
            property::IS_GRID_ITEM_PATTERN_AVAILABLE => supports(pattern::GRID_ITEM),
            property::IS_GRID_PATTERN_AVAILABLE => supports(pattern::GRID),
            property::IS_INVOKE_PATTERN_AVAILABLE => Value::Bool(self.is_invoke_pattern_available()),
            property::IS_LEGACY_IACCESSIBLE_PATTERN_AVAILABLE => supports(pattern::LEGACY_IACCESSIBLE),
            property::IS_RANGE_VALUE_PATTERN_AVAILABLE => supports(pattern::RANGE_VALUE),
            property::IS_SCROLL_ITEM_PATTERN_AVAILABLE => supports(pattern::SCROLL_ITEM),
            property::IS_SELECTION_ITEM_PATTERN_AVAILABLE => supports(pattern::SELECTION_ITEM),
            property::IS_SELECTION_PATTERN_AVAILABLE => supports(pattern::SELECTION),
            property::IS_TOGGLE_PATTERN_AVAILABLE => supports(pattern::TOGGLE),
            property::IS_VALUE_PATTERN_AVAILABLE => supports(pattern::VALUE),
            property::IS_OFFSCREEN => Value::Bool(self.state()? & state::OFFSCREEN != 0),
            property::IS_PASSWORD => Value::Bool(false),
            property::LEGACY_DEFAULT_ACTION => non_empty(self.default_action()?),
            property::LEGACY_NAME => non_empty(self.name()?),
            property::LEGACY_ROLE => Value::I4(self.role()?.unwrap_or(role::NONE)),
            property::LEGACY_STATE => Value::I4(self.state()?),
            property::NAME => self.name()?.map_or(Value::Empty, Value::String),
            property::VALUE_VALUE => non_empty(self.value()?),
            _ => Value::Empty,
        })
    }

    // =========================================================================
    // MSAA surface (child-id addressed)
    // =========================================================================

    pub fn acc_name(&self, id: &VARIANT) -> Result<Option<String>> {
        if self.is_client_object() {
            match self.resolve_child_id(id) {
                ChildId::Itself => return self.name(),
                ChildId::Local(index) => {
                    if let Some(child) = self.child(index) {
                        return child.name();
                    }
                }
                ChildId::Forwarded => {}
            }
        }

        let name = self.forward(|s| s.name(id))?;
        if self.is_client_object() && name.as_deref().is_none_or(str::is_empty) {
            // Nameless children are named after their container.
            return self.name();
        }
        Ok(name)
    }

    pub fn acc_value(&self, id: &VARIANT) -> Result<Option<String>> {
        self.dispatch_child(id, AccessibleObject::value, |s| s.value(id))
    }

    pub fn acc_description(&self, id: &VARIANT) -> Result<Option<String>> {
        self.dispatch_child(id, AccessibleObject::description, |s| s.description(id))
    }

    pub fn acc_help(&self, id: &VARIANT) -> Result<Option<String>> {
        self.dispatch_child(id, AccessibleObject::help, |s| s.help(id))
    }

    pub fn acc_keyboard_shortcut(&self, id: &VARIANT) -> Result<Option<String>> {
        self.dispatch_child(id, AccessibleObject::keyboard_shortcut, |s| s.keyboard_shortcut(id))
    }

    pub fn acc_default_action(&self, id: &VARIANT) -> Result<Option<String>> {
        self.dispatch_child(id, AccessibleObject::default_action, |s| s.default_action(id))
    }

    pub fn acc_role(&self, id: &VARIANT) -> Result<Option<i32>> {
        self.dispatch_child(id, AccessibleObject::role, |s| s.role(id))
    }

    pub fn acc_state(&self, id: &VARIANT) -> Result<Option<i32>> {
        self.dispatch_child(id, |o| o.state().map(Some), |s| s.acc_state(id))
    }

    pub fn acc_help_topic(&self, id: &VARIANT) -> Result<(Option<String>, i32)> {
        if self.system.accessible().is_none() && !self.is_client_object() {
            return Ok((None, -1));
        }
        self.dispatch_child(id, AccessibleObject::help_topic, |s| s.help_topic(id))
    }

    pub fn acc_location(&self, id: &VARIANT) -> Result<Rect> {
        self.dispatch_child(id, AccessibleObject::bounds, |s| s.location(id))
    }

    pub fn acc_select(&self, flags: i32, id: &VARIANT) -> Result<()> {
        self.dispatch_child(id, |o| o.select(flags), |s| s.select(flags, id))
    }

    pub fn acc_do_default_action(&self, id: &VARIANT) -> Result<()> {
        self.dispatch_child(id, AccessibleObject::do_default_action, |s| s.do_default_action(id))
    }

    pub fn acc_set_name(&self, id: &VARIANT, name: &str) -> Result<()> {
        self.dispatch_child(id, |o| o.set_name(name), |s| s.set_name(id, name))
    }

    pub fn acc_set_value(&self, id: &VARIANT, value: &str) -> Result<()> {
        self.dispatch_child(id, |o| o.set_value(value), |s| s.set_value(id, value))
    }

    /// Own children when enumerated locally, else the system's count, else 0.
    pub fn acc_child_count(&self) -> Result<i32> {
        let count = if self.is_client_object() { self.child_count() } else { -1 };
        if count != -1 {
            return Ok(count);
        }
        self.forward(AgileComPointer::child_count)
    }

    /// `accChild`: the dispatch pointer for a child id.
    pub fn acc_child(&self, id: &VARIANT) -> Result<Option<ComScope<IDispatch>>> {
        if self.is_client_object() {
            match self.resolve_child_id(id) {
                ChildId::Itself => return Ok(self.arc().and_then(|this| self.as_iaccessible(Some(&this)))),
                ChildId::Local(index) => {
                    // `child` already refuses to hand out this object.
                    if let Some(child) = self.child(index) {
                        return Ok(self.as_iaccessible(Some(&child)));
                    }
                }
                ChildId::Forwarded => {}
            }
        }

        self.forward(|s| {
            if s.child_count()? == 0 {
                return Ok(None);
            }
            s.child(id)
        })
    }

    /// `accParent`: never this object itself.
    pub fn acc_parent(&self) -> Result<Option<ComScope<IDispatch>>> {
        Ok(self.as_iaccessible(self.parent()?.as_ref()))
    }

    pub fn acc_focus(&self) -> Result<ScopedVariant> {
        if self.is_client_object() {
            if let Some(focused) = self.focused()? {
                return Ok(self.as_child_id_scoped(Some(&focused)));
            }
        }
        self.forward_variant(AgileComPointer::focus)
    }

    pub fn acc_selection(&self) -> Result<ScopedVariant> {
        if self.is_client_object() {
            if let Some(selected) = self.selected()? {
                return Ok(self.as_child_id_scoped(Some(&selected)));
            }
        }
        self.forward_variant(AgileComPointer::selection)
    }

    pub fn acc_hit_test(&self, x: i32, y: i32) -> Result<ScopedVariant> {
        if self.is_client_object() {
            if let Some(hit) = self.hit_test(x, y)? {
                return Ok(self.as_child_id_scoped(Some(&hit)));
            }
        }
        self.forward_variant(|s| s.hit_test(x, y))
    }

    pub fn acc_navigate(&self, direction: i32, start: &VARIANT) -> Result<ScopedVariant> {
        if self.is_client_object() {
            match self.resolve_child_id(start) {
                ChildId::Itself => {
                    if let Some(found) = self.navigate(direction)? {
                        return Ok(self.as_child_id_scoped(Some(&found)));
                    }
                }
                ChildId::Local(index) => {
                    if let Some(child) = self.child(index) {
                        let found = child.navigate(direction)?;
                        return Ok(self.as_child_id_scoped(found.as_ref()));
                    }
                }
                ChildId::Forwarded => {}
            }
        }

        if is_self_id(start) {
            if let Some(found) = self.behavior.sys_child(self, direction) {
                return Ok(self.as_child_id_scoped(self.not_self(found, direction).as_ref()));
            }
        }
        self.forward_variant(|s| s.navigate(direction, start))
    }

    fn forward_variant(
        &self,
        call: impl FnOnce(&AgileComPointer<IAccessible>) -> Result<ScopedVariant>,
    ) -> Result<ScopedVariant> {
        self.forward(call)
    }

    // =========================================================================
    // Object <-> native
    // =========================================================================

    /// The native `IAccessible` (as `IDispatch`) for `object`. A system
    /// wrapper hands out the pointer it wraps rather than a new wrapper.
    #[must_use]
    pub fn as_iaccessible(&self, object: Option<&Arc<Self>>) -> Option<ComScope<IDispatch>> {
        let object = object?;
        if object.system_wrapper {
            let accessible = object.system.accessible()?.get_interface().ok()?;
            return accessible.cast::<IDispatch>().ok();
        }
        match ComHelpers::global().get_com_pointer::<IDispatch>(&object.as_object_ref()) {
            Ok(dispatch) => Some(dispatch),
            Err(error) => {
                tracing::warn!(target: "accbridge::accessible", %error, "no native wrapper for accessible object");
                None
            }
        }
    }

    /// MSAA child-id form of `object` relative to this one: `VT_I4 0` for
    /// self, `VT_EMPTY` for none, else an owned `VT_DISPATCH`.
    #[must_use]
    pub fn as_child_id(&self, object: Option<&Arc<Self>>) -> VARIANT {
        match object {
            None => VARIANT::empty(),
            Some(object) if self.is(object) => VARIANT::from_i4(CHILDID_SELF),
            Some(object) => self
                .as_iaccessible(Some(object))
                .map_or_else(VARIANT::empty, |dispatch| VARIANT::from_dispatch(dispatch.into_raw())),
        }
    }

    fn as_child_id_scoped(&self, object: Option<&Arc<Self>>) -> ScopedVariant {
        unsafe { ScopedVariant::from_raw(self.as_child_id(object)) }
    }

    /// Map a navigation result back to an object. `VT_I4 CHILDID_SELF` is
    /// this object; a dispatch pointer is resolved; anything else is null.
    #[must_use]
    pub fn try_get_accessible_object(&self, result: ScopedVariant) -> Option<Arc<Self>> {
        let variant = result.get();
        match variant.vt {
            VT_I4 => {
                let id = unsafe { variant.data.l };
                if id == CHILDID_SELF {
                    return self.arc();
                }
                tracing::debug!(target: "accbridge::accessible", child_id = id, "unexpected child id in result");
                None
            }
            VT_DISPATCH => variant
                .as_object()
                .and_then(|pointer| self.try_get_accessible_object_from_pointer(pointer)),
            vt => {
                if vt != VT_EMPTY {
                    tracing::debug!(target: "accbridge::accessible", vt, "ignoring result variant");
                }
                None
            }
        }
    }

    /// Resolve a borrowed native pointer: one of our own wrappers, this
    /// object's own system object, or a new system wrapper.
    fn try_get_accessible_object_from_pointer(&self, pointer: *mut c_void) -> Option<Arc<Self>> {
        if pointer.is_null() {
            return None;
        }

        if let Some(object) = unsafe { ComHelpers::global().unwrap(pointer, false) } {
            if let Some(accessible) = downcast::<Self>(&object) {
                return Some(accessible);
            }
        }

        let (hr, accessible) = unsafe { query_interface(pointer, &IAccessible::IID) };
        if crate::com::failed(hr) || accessible.is_null() {
            tracing::debug!(target: "accbridge::accessible", "result does not answer IAccessible");
            return None;
        }
        let accessible = unsafe { AgileComPointer::<IAccessible>::new(accessible, true) };

        if self
            .system
            .accessible()
            .is_some_and(|own| own.is_same_native_object(&accessible))
        {
            return self.arc();
        }

        tracing::trace!(target: "accbridge::accessible", "wrapping system accessible object");
        Some(Self::system_wrapper(accessible))
    }
}

fn self_id() -> VARIANT {
    VARIANT::from_i4(CHILDID_SELF)
}

impl ComObject for AccessibleObject {
    fn wrapper_source(&self) -> Option<&dyn WrapperSource> {
        Some(&ccw::ACCESSIBLE_WRAPPERS)
    }
}

impl std::fmt::Debug for AccessibleObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessibleObject")
            .field("object_id", &self.object_id)
            .field("system_wrapper", &self.system_wrapper)
            .field("system", &self.system.objects().is_some())
            .finish_non_exhaustive()
    }
}
