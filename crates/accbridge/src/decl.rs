//! Declarative macro for COM interface layouts
//!
//! `com_interface!` turns an IDL-like block into the `#[repr(C)]` vtable the
//! native side expects, a zero-sized marker type, and the
//! [`ComInterface`](crate::ComInterface) impl carrying the IID.
//!
//! # Example
//! ```ignore
//! com_interface! {
//!     /// Late-bound automation
//!     pub interface IDispatch : IUnknown (0x00020400_0000_0000_C000_000000000046) {
//!         fn get_type_info_count(pctinfo: *mut u32) -> HRESULT;
//!     }
//! }
//! ```
//!
//! Expands to `IDispatchVTable { base: IUnknownVTable, get_type_info_count: ... }`
//! and `pub struct IDispatch;`. Every slot is `unsafe extern "system"` and
//! takes the interface pointer as its first argument.

/// Declare one or more COM interfaces.
///
/// Methods are listed in exact vtable order; the base interface's slots
/// come first via the embedded `base` field.
///
/// # Syntax
/// ```ignore
/// com_interface! {
///     pub interface IFoo : IUnknown (0x12345678_1234_1234_1234_123456789ABC) {
///         fn method(arg: i32) -> HRESULT;
///     }
/// }
/// ```
#[macro_export]
macro_rules! com_interface {
    (@count) => { 0usize };
    (@count $head:ident $($tail:ident)*) => {
        1usize + $crate::com_interface!(@count $($tail)*)
    };

    (
        $(
            $(#[$meta:meta])*
            $vis:vis interface $name:ident : $base:ident ($iid:expr) {
                $(
                    $(#[$method_meta:meta])*
                    fn $method:ident ($($pname:ident : $pty:ty),* $(,)?) -> $ret:ty;
                )*
            }
        )*
    ) => {
        $(
            $crate::paste! {
                #[doc = "VTable layout for [`" $name "`]"]
                #[repr(C)]
                $vis struct [<$name VTable>] {
                    pub base: <$base as $crate::ComInterface>::VTable,
                    $(
                        $(#[$method_meta])*
                        pub $method: unsafe extern "system" fn(
                            this: *mut $crate::c_void
                            $(, $pname: $pty)*
                        ) -> $ret,
                    )*
                }

                $(#[$meta])*
                $vis struct $name;

                impl $crate::ComInterface for $name {
                    const IID: $crate::GUID = $crate::GUID::from_u128($iid);
                    const SLOT_COUNT: usize = <$base as $crate::ComInterface>::SLOT_COUNT
                        + $crate::com_interface!(@count $($method)*);
                    type VTable = [<$name VTable>];
                }
            }
        )*
    };
}
