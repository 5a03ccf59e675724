//! Overridable behavior of an accessible object.

use std::sync::Arc;

use crate::error::Result;
use crate::interfaces::{ExpandCollapseState, NavigateDirection, Rect, ToggleState, UiaRect, pattern, provider_options};
use crate::variant::Value;

use super::AccessibleObject;

/// The virtuals of an accessible object.
///
/// Every method receives the owning [`AccessibleObject`] and defaults to
/// what the platform does: MSAA properties come from the wrapped system
/// object, children come from nowhere (`child_count` of -1), and the UI
/// Automation surface reports nothing supported.
///
/// Override only what the object knows better than the system.
#[allow(unused_variables)]
pub trait AccessibleBehavior: Send + Sync + 'static {
    // -------------------------------------------------------------------------
    // MSAA properties
    // -------------------------------------------------------------------------

    /// Screen bounds.
    fn bounds(&self, owner: &AccessibleObject) -> Result<Rect> {
        owner.default_bounds()
    }

    fn default_action(&self, owner: &AccessibleObject) -> Result<Option<String>> {
        owner.default_default_action()
    }

    fn description(&self, owner: &AccessibleObject) -> Result<Option<String>> {
        owner.default_description()
    }

    fn help(&self, owner: &AccessibleObject) -> Result<Option<String>> {
        owner.default_help()
    }

    fn keyboard_shortcut(&self, owner: &AccessibleObject) -> Result<Option<String>> {
        owner.default_keyboard_shortcut()
    }

    /// The system name, or the parent's name when the system name is empty.
    fn name(&self, owner: &AccessibleObject) -> Result<Option<String>> {
        owner.default_name()
    }

    fn set_name(&self, owner: &AccessibleObject, name: &str) -> Result<()> {
        owner.default_set_name(name)
    }

    /// The system value, or an empty string without a system object.
    fn value(&self, owner: &AccessibleObject) -> Result<Option<String>> {
        owner.default_value()
    }

    fn set_value(&self, owner: &AccessibleObject, value: &str) -> Result<()> {
        owner.default_set_value(value)
    }

    fn parent(&self, owner: &AccessibleObject) -> Result<Option<Arc<AccessibleObject>>> {
        owner.default_parent()
    }

    /// `ROLE_SYSTEM_*`, `None` when unknown.
    fn role(&self, owner: &AccessibleObject) -> Result<Option<i32>> {
        owner.default_role()
    }

    /// `STATE_SYSTEM_*` flags.
    fn state(&self, owner: &AccessibleObject) -> Result<i32> {
        owner.default_state()
    }

    /// Help file and topic id.
    fn help_topic(&self, owner: &AccessibleObject) -> Result<(Option<String>, i32)> {
        owner.default_help_topic()
    }

    // -------------------------------------------------------------------------
    // Children and navigation
    // -------------------------------------------------------------------------

    /// The child at `index`, for objects that enumerate their own children.
    fn child(&self, owner: &AccessibleObject, index: i32) -> Option<Arc<AccessibleObject>> {
        None
    }

    /// Number of own children; -1 leaves enumeration to the system object.
    fn child_count(&self, owner: &AccessibleObject) -> i32 {
        -1
    }

    /// Override system navigation relative to self. `Some(result)` replaces
    /// the system answer (`Some(None)` means "off the end"); `None` lets the
    /// system navigate.
    fn sys_child(&self, owner: &AccessibleObject, direction: i32) -> Option<Option<Arc<AccessibleObject>>> {
        None
    }

    /// Order imposed on the system enumerator's children. Entry `i` is the
    /// system position of the child enumerated at slot `i`; positions left
    /// out are hidden. `None` keeps the system order.
    fn sys_child_order(&self, owner: &AccessibleObject) -> Option<Vec<i32>> {
        None
    }

    fn focused(&self, owner: &AccessibleObject) -> Result<Option<Arc<AccessibleObject>>> {
        owner.default_focused()
    }

    fn selected(&self, owner: &AccessibleObject) -> Result<Option<Arc<AccessibleObject>>> {
        owner.default_selected()
    }

    fn hit_test(&self, owner: &AccessibleObject, x: i32, y: i32) -> Result<Option<Arc<AccessibleObject>>> {
        owner.default_hit_test(x, y)
    }

    fn navigate(&self, owner: &AccessibleObject, direction: i32) -> Result<Option<Arc<AccessibleObject>>> {
        owner.default_navigate(direction)
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    /// `SELFLAG_*` selection.
    fn select(&self, owner: &AccessibleObject, flags: i32) -> Result<()> {
        owner.default_select(flags)
    }

    fn do_default_action(&self, owner: &AccessibleObject) -> Result<()> {
        owner.default_do_default_action()
    }

    // -------------------------------------------------------------------------
    // UI Automation
    // -------------------------------------------------------------------------

    fn is_iaccessible_ex_supported(&self, owner: &AccessibleObject) -> bool {
        false
    }

    fn is_pattern_supported(&self, owner: &AccessibleObject, pattern_id: i32) -> bool {
        pattern_id == pattern::INVOKE && owner.is_invoke_pattern_available()
    }

    /// Runtime id. Only system wrappers have a default one.
    fn runtime_id(&self, owner: &AccessibleObject) -> Option<Vec<i32>> {
        owner.default_runtime_id()
    }

    fn provider_options(&self, owner: &AccessibleObject) -> i32 {
        provider_options::SERVER_SIDE | provider_options::USE_COM_THREADING
    }

    fn property_value(&self, owner: &AccessibleObject, property_id: i32) -> Result<Value> {
        owner.default_property_value(property_id)
    }

    fn framework_id(&self, owner: &AccessibleObject) -> &str {
        "Win32"
    }

    /// Automation id; `None` leaves the property empty.
    fn automation_id(&self, owner: &AccessibleObject) -> Option<String> {
        None
    }

    fn fragment_navigate(&self, owner: &AccessibleObject, direction: NavigateDirection) -> Option<Arc<AccessibleObject>> {
        None
    }

    fn fragment_root(&self, owner: &AccessibleObject) -> Option<Arc<AccessibleObject>> {
        None
    }

    fn embedded_fragment_roots(&self, owner: &AccessibleObject) -> Option<Vec<Arc<AccessibleObject>>> {
        None
    }

    /// The element at a point; the object itself by default.
    fn element_provider_from_point(&self, owner: &AccessibleObject, x: f64, y: f64) -> Option<Arc<AccessibleObject>> {
        owner.arc()
    }

    fn focus_element(&self, owner: &AccessibleObject) -> Option<Arc<AccessibleObject>> {
        None
    }

    fn set_focus(&self, owner: &AccessibleObject) -> Result<()> {
        Ok(())
    }

    fn bounding_rectangle(&self, owner: &AccessibleObject) -> Result<UiaRect> {
        owner.bounds().map(UiaRect::from)
    }

    fn expand(&self, owner: &AccessibleObject) -> Result<()> {
        Ok(())
    }

    fn collapse(&self, owner: &AccessibleObject) -> Result<()> {
        Ok(())
    }

    fn expand_collapse_state(&self, owner: &AccessibleObject) -> ExpandCollapseState {
        ExpandCollapseState::Collapsed
    }

    fn toggle(&self, owner: &AccessibleObject) -> Result<()> {
        Ok(())
    }

    fn toggle_state(&self, owner: &AccessibleObject) -> ToggleState {
        ToggleState::Indeterminate
    }

    fn grid_item(&self, owner: &AccessibleObject, row: i32, column: i32) -> Option<Arc<AccessibleObject>> {
        None
    }

    fn row_count(&self, owner: &AccessibleObject) -> i32 {
        -1
    }

    fn column_count(&self, owner: &AccessibleObject) -> i32 {
        -1
    }

    fn row(&self, owner: &AccessibleObject) -> i32 {
        -1
    }

    fn column(&self, owner: &AccessibleObject) -> i32 {
        -1
    }

    fn row_span(&self, owner: &AccessibleObject) -> i32 {
        1
    }

    fn column_span(&self, owner: &AccessibleObject) -> i32 {
        1
    }

    fn containing_grid(&self, owner: &AccessibleObject) -> Option<Arc<AccessibleObject>> {
        None
    }

    fn invoke(&self, owner: &AccessibleObject) -> Result<()> {
        owner.do_default_action()
    }

    fn is_read_only(&self, owner: &AccessibleObject) -> bool {
        false
    }

    /// `IValueProvider::SetValue`; sets the MSAA value by default.
    fn set_value_text(&self, owner: &AccessibleObject, value: &str) -> Result<()> {
        owner.set_value(value)
    }

    fn range_value(&self, owner: &AccessibleObject) -> f64 {
        f64::NAN
    }

    fn set_range_value(&self, owner: &AccessibleObject, value: f64) -> Result<()> {
        Ok(())
    }

    fn minimum(&self, owner: &AccessibleObject) -> f64 {
        f64::NAN
    }

    fn maximum(&self, owner: &AccessibleObject) -> f64 {
        f64::NAN
    }

    fn small_change(&self, owner: &AccessibleObject) -> f64 {
        f64::NAN
    }

    fn large_change(&self, owner: &AccessibleObject) -> f64 {
        f64::NAN
    }

    fn selection(&self, owner: &AccessibleObject) -> Option<Vec<Arc<AccessibleObject>>> {
        None
    }

    fn can_select_multiple(&self, owner: &AccessibleObject) -> bool {
        false
    }

    fn is_selection_required(&self, owner: &AccessibleObject) -> bool {
        false
    }

    fn select_item(&self, owner: &AccessibleObject) -> Result<()> {
        Ok(())
    }

    fn add_to_selection(&self, owner: &AccessibleObject) -> Result<()> {
        Ok(())
    }

    fn remove_from_selection(&self, owner: &AccessibleObject) -> Result<()> {
        Ok(())
    }

    fn is_item_selected(&self, owner: &AccessibleObject) -> bool {
        false
    }

    fn item_selection_container(&self, owner: &AccessibleObject) -> Option<Arc<AccessibleObject>> {
        None
    }

    fn scroll_into_view(&self, owner: &AccessibleObject) -> Result<()> {
        Ok(())
    }

    /// Child id reported through `ILegacyIAccessibleProvider`.
    fn child_id(&self, owner: &AccessibleObject) -> i32 {
        crate::interfaces::CHILDID_SELF
    }
}

/// Pure pass-through behavior, used by system wrappers and non-client objects.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBehavior;

impl AccessibleBehavior for SystemBehavior {}
