//! COM interop and accessibility bridge
//!
//! This crate lets Rust objects take part in native COM as reference-counted
//! `IUnknown` objects, and lets them consume native accessible objects as
//! fallback implementations.
//!
//! ## Layers
//!
//! | Module | Role |
//! |--------|------|
//! | [`com`] | GUID/HRESULT, `IUnknown`, reference counting, owned scopes |
//! | [`decl`] | `com_interface!`, IDL-like vtable declarations |
//! | [`variant`] | `VARIANT` layout and the typed codec |
//! | [`bstr`] | `BSTR`/`SAFEARRAY` allocation |
//! | [`resolver`] | Rust object ⇄ native pointer resolution ([`ComHelpers`]) |
//! | [`agile`] | [`AgileComPointer`], release-exactly-once native handles |
//! | [`accessible`] | [`AccessibleObject`], the multi-interface facade |
//! | [`fallback`] | System accessible objects as delegation targets |
//!
//! ## Exposing an accessible object
//! ```ignore
//! use accbridge::{AccessibleBehavior, AccessibleObject, ComHelpers, IAccessible};
//!
//! struct Button;
//!
//! impl AccessibleBehavior for Button {
//!     fn name(&self, _: &AccessibleObject) -> accbridge::Result<Option<String>> {
//!         Ok(Some("OK".into()))
//!     }
//! }
//!
//! let object = AccessibleObject::new(Box::new(Button));
//! let accessible = ComHelpers::global().get_com_pointer::<IAccessible>(&object.as_object_ref())?;
//! // hand accessible.into_raw() to the native caller
//! ```

pub mod accessible;
pub mod agile;
pub mod bstr;
pub mod com;
pub mod decl;
pub mod enum_variant;
pub mod error;
pub mod fallback;
pub mod interfaces;
mod macros;
pub mod resolver;
pub mod variant;

pub use accessible::{AccessibleBehavior, AccessibleObject, ChildId};
pub use agile::{AgileComPointer, AgileMode, AgileState};
pub use com::{
    ComInterface, ComRefCount, ComScope, DISP_E_BADVARTYPE, DISP_E_MEMBERNOTFOUND,
    DISP_E_PARAMNOTFOUND, DISP_E_UNKNOWNNAME, E_FAIL, E_INVALIDARG, E_NOINTERFACE, E_NOTIMPL,
    E_OUTOFMEMORY, E_POINTER, E_UNEXPECTED, GUID, HRESULT, IID_IUNKNOWN, IUnknown,
    IUnknownVTable, RPC_E_DISCONNECTED, S_FALSE, S_OK, failed, succeeded,
};
pub use error::{Error, Result};
pub use fallback::{StdAccessibleFactory, SystemFallback};
pub use interfaces::*;
pub use resolver::{ComHelpers, ComObject, ObjectRef};
pub use variant::{ScopedVariant, VARIANT, Value};

// Re-export paste for use by declarative macros
#[doc(hidden)]
pub use paste::paste;

// Re-exports for macro-generated code
#[doc(hidden)]
pub use std::ffi::c_void;
#[doc(hidden)]
pub use tracing;
