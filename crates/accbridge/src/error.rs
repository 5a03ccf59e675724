//! Error types for the interop bridge.
//!
//! Errors never cross the native boundary as panics or Rust values. Every
//! vtable thunk converts them back to a status with [`Error::hresult`].

use crate::com::{
    DISP_E_BADVARTYPE, E_FAIL, E_INVALIDARG, E_NOINTERFACE, E_POINTER, GUID, HRESULT,
    RPC_E_DISCONNECTED,
};

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the bridge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The variant's kind is outside what the codec models.
    #[error("unsupported variant kind 0x{vt:04X}")]
    UnsupportedVariant { vt: u16 },

    /// The variant breaks its own layout contract (e.g. null by-reference payload).
    #[error("malformed variant: {reason}")]
    InvalidVariant { reason: &'static str },

    /// A required pointer was null.
    #[error("null pointer")]
    NullPointer,

    /// The object does not expose the requested interface.
    #[error("interface {iid:?} not supported")]
    NoInterface { iid: GUID },

    /// A native call failed; the status is carried unchanged.
    #[error("native call failed with HRESULT 0x{:08X}", *.0 as u32)]
    Native(HRESULT),

    /// The agile pointer was already released.
    #[error("pointer already released")]
    Released,

    /// No window handle is associated with the object.
    #[error("no window handle")]
    NoWindow,
}

impl Error {
    /// Wrap a native failure status.
    ///
    /// `E_POINTER` and `E_NOINTERFACE` are kept as [`Error::Native`] so the
    /// exact status round-trips through [`Error::hresult`].
    #[must_use]
    pub fn from_hresult(hr: HRESULT) -> Self {
        Self::Native(hr)
    }

    /// Create a malformed-variant error.
    #[must_use]
    pub fn invalid_variant(reason: &'static str) -> Self {
        Self::InvalidVariant { reason }
    }

    /// The status to report across the boundary.
    #[must_use]
    pub fn hresult(&self) -> HRESULT {
        match self {
            Self::UnsupportedVariant { .. } => DISP_E_BADVARTYPE,
            Self::InvalidVariant { .. } => E_INVALIDARG,
            Self::NullPointer => E_POINTER,
            Self::NoInterface { .. } => E_NOINTERFACE,
            Self::Native(hr) => *hr,
            Self::Released => RPC_E_DISCONNECTED,
            Self::NoWindow => E_FAIL,
        }
    }
}
