//! The Automation `VARIANT` and its codec.
//!
//! [`VARIANT`] is the exact wire struct: a 16-bit type tag, three reserved
//! words and an 8-byte-aligned payload. It is `Copy` and has no destructor
//! because native callers pass it by value, so a bitwise copy is not an
//! ownership transfer. Owned variants are cleared explicitly with
//! [`VARIANT::clear`] or held in a [`ScopedVariant`].
//!
//! [`Value`] is the decoded, owned form.

use std::ffi::c_void;
use std::fmt;
use std::ptr;

use crate::bstr::{self, BSTR, OleAllocator, SAFEARRAY};
use crate::com::{ComInterface, GUID, HRESULT, IID_IUNKNOWN, release};
use crate::error::{Error, Result};
use crate::interfaces::IDispatch;
use crate::resolver::{ComHelpers, ObjectRef, same_object};

/// Variant type tag.
pub type VARTYPE = u16;

pub const VT_EMPTY: VARTYPE = 0;
pub const VT_NULL: VARTYPE = 1;
pub const VT_I2: VARTYPE = 2;
pub const VT_I4: VARTYPE = 3;
pub const VT_R4: VARTYPE = 4;
pub const VT_R8: VARTYPE = 5;
pub const VT_CY: VARTYPE = 6;
pub const VT_DATE: VARTYPE = 7;
pub const VT_BSTR: VARTYPE = 8;
pub const VT_DISPATCH: VARTYPE = 9;
pub const VT_ERROR: VARTYPE = 10;
pub const VT_BOOL: VARTYPE = 11;
pub const VT_VARIANT: VARTYPE = 12;
pub const VT_UNKNOWN: VARTYPE = 13;
pub const VT_DECIMAL: VARTYPE = 14;
pub const VT_I1: VARTYPE = 16;
pub const VT_UI1: VARTYPE = 17;
pub const VT_UI2: VARTYPE = 18;
pub const VT_UI4: VARTYPE = 19;
pub const VT_I8: VARTYPE = 20;
pub const VT_UI8: VARTYPE = 21;
pub const VT_INT: VARTYPE = 22;
pub const VT_UINT: VARTYPE = 23;
pub const VT_VOID: VARTYPE = 24;
pub const VT_HRESULT: VARTYPE = 25;
pub const VT_PTR: VARTYPE = 26;
pub const VT_SAFEARRAY: VARTYPE = 27;
pub const VT_CARRAY: VARTYPE = 28;
pub const VT_USERDEFINED: VARTYPE = 29;
pub const VT_LPSTR: VARTYPE = 30;
pub const VT_LPWSTR: VARTYPE = 31;
pub const VT_RECORD: VARTYPE = 36;
pub const VT_INT_PTR: VARTYPE = 37;
pub const VT_UINT_PTR: VARTYPE = 38;
pub const VT_FILETIME: VARTYPE = 64;
pub const VT_BLOB: VARTYPE = 65;
pub const VT_STREAM: VARTYPE = 66;
pub const VT_STORAGE: VARTYPE = 67;
pub const VT_STREAMED_OBJECT: VARTYPE = 68;
pub const VT_STORED_OBJECT: VARTYPE = 69;
pub const VT_BLOB_OBJECT: VARTYPE = 70;
pub const VT_CF: VARTYPE = 71;
pub const VT_CLSID: VARTYPE = 72;
pub const VT_VERSIONED_STREAM: VARTYPE = 73;
pub const VT_BSTR_BLOB: VARTYPE = 0x0FFF;
pub const VT_VECTOR: VARTYPE = 0x1000;
pub const VT_ARRAY: VARTYPE = 0x2000;
pub const VT_BYREF: VARTYPE = 0x4000;
pub const VT_TYPEMASK: VARTYPE = 0x0FFF;

pub const VARIANT_TRUE: i16 = -1;
pub const VARIANT_FALSE: i16 = 0;

// =============================================================================
// Wire layout
// =============================================================================

/// Payload of a [`VARIANT`]. Which field is live is determined by the tag.
#[repr(C)]
#[derive(Clone, Copy)]
pub union VariantData {
    pub ll: i64,
    pub ull: u64,
    /// Low half, then high half.
    pub halves: [u32; 2],
    pub l: i32,
    pub ul: u32,
    pub i: i16,
    pub ui: u16,
    pub c: i8,
    pub b: u8,
    pub bool_val: i16,
    pub scode: HRESULT,
    pub bstr: BSTR,
    pub ptr: *mut c_void,
    /// `VT_RECORD` occupies two pointers; this arm fixes the payload size.
    pub record: [*mut c_void; 2],
}

/// The Automation tagged union, byte-for-byte.
#[repr(C, align(8))]
#[derive(Clone, Copy)]
pub struct VARIANT {
    pub vt: VARTYPE,
    pub reserved1: u16,
    pub reserved2: u16,
    pub reserved3: u16,
    pub data: VariantData,
}

/// 96-bit scaled decimal, which overlays the whole variant including the tag.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DECIMAL {
    pub reserved: u16,
    pub scale: u8,
    pub sign: u8,
    pub hi32: u32,
    pub lo64: u64,
}

const DECIMAL_NEG: u8 = 0x80;

impl Default for VARIANT {
    fn default() -> Self {
        Self::empty()
    }
}

impl VARIANT {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            vt: VT_EMPTY,
            reserved1: 0,
            reserved2: 0,
            reserved3: 0,
            data: VariantData {
                record: [ptr::null_mut(); 2],
            },
        }
    }

    fn with(vt: VARTYPE, data: VariantData) -> Self {
        let mut v = Self::empty();
        v.vt = vt;
        v.data = data;
        v
    }

    /// A `VT_I4` variant, the usual carrier of child ids.
    #[must_use]
    pub fn from_i4(value: i32) -> Self {
        let mut v = Self::empty();
        v.vt = VT_I4;
        v.data.l = value;
        v
    }

    /// A `VT_ERROR` variant.
    #[must_use]
    pub fn from_error(scode: HRESULT) -> Self {
        let mut v = Self::empty();
        v.vt = VT_ERROR;
        v.data.scode = scode;
        v
    }

    /// A `VT_DISPATCH` variant taking ownership of one reference on `dispatch`.
    #[must_use]
    pub fn from_dispatch(dispatch: *mut c_void) -> Self {
        let mut v = Self::empty();
        v.vt = VT_DISPATCH;
        v.data.ptr = dispatch;
        v
    }

    /// A `VT_BSTR` variant taking ownership of `bstr`.
    #[must_use]
    pub fn from_bstr(bstr: BSTR) -> Self {
        let mut v = Self::empty();
        v.vt = VT_BSTR;
        v.data.bstr = bstr;
        v
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vt == VT_EMPTY
    }

    /// The value of a by-value `VT_I4`/`VT_INT`.
    #[must_use]
    pub fn as_i4(&self) -> Option<i32> {
        match self.vt {
            VT_I4 | VT_INT => Some(unsafe { self.data.l }),
            _ => None,
        }
    }

    /// The pointer of a by-value `VT_DISPATCH`/`VT_UNKNOWN`. Borrowed.
    #[must_use]
    pub fn as_object(&self) -> Option<*mut c_void> {
        match self.vt {
            VT_DISPATCH | VT_UNKNOWN => Some(unsafe { self.data.ptr }).filter(|p| !p.is_null()),
            _ => None,
        }
    }

    fn as_decimal(&self) -> DECIMAL {
        unsafe { *(self as *const Self as *const DECIMAL) }
    }

    /// Free the payload if it owns one and reset to `VT_EMPTY`.
    ///
    /// Clearing twice is a no-op the second time.
    ///
    /// # Safety
    /// The variant must own its payload (it came from [`encode`](Self::encode),
    /// from a native out-parameter, or was otherwise transferred to the caller),
    /// and no copy of it may be cleared as well.
    pub unsafe fn clear(&mut self) {
        unsafe { self.clear_with(bstr::allocator()) }
    }

    /// [`clear`](Self::clear) with an explicit string allocator.
    ///
    /// # Safety
    /// As for [`clear`](Self::clear); a `BSTR` or array payload must come
    /// from `allocator`.
    pub unsafe fn clear_with(&mut self, allocator: &dyn OleAllocator) {
        match self.vt {
            VT_BSTR => unsafe { allocator.free_string(self.data.bstr) },
            VT_DISPATCH | VT_UNKNOWN => {
                let p = unsafe { self.data.ptr };
                if !p.is_null() {
                    unsafe { release(p) };
                }
            }
            vt if vt & VT_ARRAY != 0 && vt & VT_BYREF == 0 => {
                let array = unsafe { self.data.ptr }.cast::<SAFEARRAY>();
                if !array.is_null() {
                    unsafe { allocator.destroy_array(array) };
                }
            }
            _ => {}
        }
        *self = Self::empty();
    }

    // -------------------------------------------------------------------------
    // Decode
    // -------------------------------------------------------------------------

    /// Decode into an owned [`Value`] without taking anything from the variant.
    pub fn decode(&self) -> Result<Value> {
        let vt = self.vt;
        if vt & (VT_ARRAY | VT_VECTOR) != 0 {
            return Err(Error::UnsupportedVariant { vt });
        }

        let base = vt & VT_TYPEMASK;
        if vt & VT_BYREF == 0 {
            return self.decode_direct(base);
        }

        let p = unsafe { self.data.ptr };
        if p.is_null() {
            return match base {
                VT_EMPTY => Ok(Value::Empty),
                VT_NULL => Ok(Value::Null),
                _ => Err(Error::invalid_variant("null by-reference payload")),
            };
        }
        unsafe { Self::decode_byref(vt, base, p) }
    }

    fn decode_direct(&self, base: VARTYPE) -> Result<Value> {
        let data = self.data;
        unsafe {
            Ok(match base {
                VT_EMPTY => Value::Empty,
                VT_NULL => Value::Null,
                VT_I1 => Value::I1(data.c),
                VT_UI1 => Value::U1(data.b),
                VT_I2 => Value::I2(data.i),
                VT_UI2 => Value::U2(data.ui),
                VT_I4 => Value::I4(data.l),
                VT_UI4 => Value::U4(data.ul),
                VT_INT => Value::Int(data.l),
                VT_UINT => Value::UInt(data.ul),
                VT_I8 => Value::I8(join_halves(data.halves) as i64),
                VT_UI8 => Value::U8(join_halves(data.halves)),
                VT_CY => Value::Currency(Currency(join_halves(data.halves) as i64)),
                VT_FILETIME => Value::FileTime(FileTime(join_halves(data.halves))),
                VT_BOOL => Value::Bool(data.bool_val != 0),
                VT_ERROR | VT_HRESULT => Value::Error(data.scode),
                VT_BSTR => Value::String(bstr::to_string(data.bstr)),
                VT_LPWSTR => Value::String(bstr::wide_to_string(data.ptr as *const u16)),
                VT_DISPATCH => Value::Dispatch(unwrap_object(data.ptr)),
                VT_UNKNOWN => Value::Unknown(unwrap_object(data.ptr)),
                VT_DECIMAL => Value::Decimal(Decimal::from_raw(self.as_decimal())),
                VT_CLSID => {
                    let guid = data.ptr as *const GUID;
                    if guid.is_null() {
                        return Err(Error::invalid_variant("null CLSID pointer"));
                    }
                    Value::Guid(*guid)
                }
                _ => return Err(Error::UnsupportedVariant { vt: self.vt }),
            })
        }
    }

    unsafe fn decode_byref(vt: VARTYPE, base: VARTYPE, p: *mut c_void) -> Result<Value> {
        unsafe {
            Ok(match base {
                VT_EMPTY => Value::Empty,
                VT_NULL => Value::Null,
                VT_I1 => Value::I1(*(p as *const i8)),
                VT_UI1 => Value::U1(*(p as *const u8)),
                VT_I2 => Value::I2(*(p as *const i16)),
                VT_UI2 => Value::U2(*(p as *const u16)),
                VT_I4 => Value::I4(*(p as *const i32)),
                VT_UI4 => Value::U4(*(p as *const u32)),
                VT_INT => Value::Int(*(p as *const i32)),
                VT_UINT => Value::UInt(*(p as *const u32)),
                VT_I8 => Value::I8(ptr::read_unaligned(p as *const i64)),
                VT_UI8 => Value::U8(ptr::read_unaligned(p as *const u64)),
                VT_CY => Value::Currency(Currency(ptr::read_unaligned(p as *const i64))),
                VT_BOOL => Value::Bool(*(p as *const i16) != 0),
                VT_ERROR | VT_HRESULT => Value::Error(*(p as *const HRESULT)),
                VT_BSTR => Value::String(bstr::to_string(*(p as *const BSTR))),
                VT_LPWSTR => Value::String(bstr::wide_to_string(*(p as *const *const u16))),
                VT_DISPATCH => Value::Dispatch(unwrap_object(*(p as *const *mut c_void))),
                VT_UNKNOWN => Value::Unknown(unwrap_object(*(p as *const *mut c_void))),
                VT_DECIMAL => Value::Decimal(Decimal::from_raw(*(p as *const DECIMAL))),
                VT_VARIANT => {
                    let inner = &*(p as *const VARIANT);
                    if inner.vt & VT_BYREF != 0 {
                        return Err(Error::invalid_variant("nested by-reference variant"));
                    }
                    inner.decode()?
                }
                _ => return Err(Error::UnsupportedVariant { vt }),
            })
        }
    }

    // -------------------------------------------------------------------------
    // Encode
    // -------------------------------------------------------------------------

    /// Encode an owned value with the process-wide allocator.
    ///
    /// The result owns its payload and must be cleared exactly once.
    pub fn encode(value: Value) -> Result<Self> {
        Self::encode_with(value, bstr::allocator())
    }

    /// [`encode`](Self::encode) with an explicit string allocator.
    pub fn encode_with(value: Value, allocator: &dyn OleAllocator) -> Result<Self> {
        Ok(match value {
            Value::Empty => Self::empty(),
            Value::Null => Self::with(VT_NULL, VariantData { ll: 0 }),
            Value::I1(v) => Self::with(VT_I1, scalar(|d| d.c = v)),
            Value::U1(v) => Self::with(VT_UI1, scalar(|d| d.b = v)),
            Value::I2(v) => Self::with(VT_I2, scalar(|d| d.i = v)),
            Value::U2(v) => Self::with(VT_UI2, scalar(|d| d.ui = v)),
            Value::I4(v) => Self::with(VT_I4, scalar(|d| d.l = v)),
            Value::U4(v) => Self::with(VT_UI4, scalar(|d| d.ul = v)),
            Value::Int(v) => Self::with(VT_INT, scalar(|d| d.l = v)),
            Value::UInt(v) => Self::with(VT_UINT, scalar(|d| d.ul = v)),
            Value::I8(v) => Self::with(VT_I8, scalar(|d| d.halves = split_halves(v as u64))),
            Value::U8(v) => Self::with(VT_UI8, scalar(|d| d.halves = split_halves(v))),
            Value::Currency(c) => Self::with(VT_CY, scalar(|d| d.halves = split_halves(c.0 as u64))),
            Value::FileTime(t) => Self::with(VT_FILETIME, scalar(|d| d.halves = split_halves(t.0))),
            Value::Bool(b) => Self::with(
                VT_BOOL,
                scalar(|d| d.bool_val = if b { VARIANT_TRUE } else { VARIANT_FALSE }),
            ),
            Value::Error(hr) => Self::from_error(hr),
            Value::String(s) => {
                let wide: Vec<u16> = s.encode_utf16().collect();
                let b = allocator.alloc_string(&wide);
                if b.is_null() {
                    return Err(Error::from_hresult(crate::com::E_OUTOFMEMORY));
                }
                Self::from_bstr(b)
            }
            Value::Decimal(d) => {
                let raw = d.to_raw()?;
                let mut v = Self::empty();
                unsafe { *(&mut v as *mut Self as *mut DECIMAL) = raw };
                v.vt = VT_DECIMAL;
                v
            }
            Value::Dispatch(object) => Self::with(VT_DISPATCH, scalar(|d| d.ptr = ptr::null_mut()))
                .with_object(object, &IDispatch::IID)?,
            Value::Unknown(object) => Self::with(VT_UNKNOWN, scalar(|d| d.ptr = ptr::null_mut()))
                .with_object(object, &IID_IUNKNOWN)?,
            Value::Guid(_) => return Err(Error::UnsupportedVariant { vt: VT_CLSID }),
        })
    }

    fn with_object(mut self, object: Option<ObjectRef>, iid: &GUID) -> Result<Self> {
        if let Some(object) = object {
            let (pointer, hr) = ComHelpers::global().resolve(Some(&object), iid);
            if crate::com::failed(hr) {
                return Err(Error::from_hresult(hr));
            }
            self.data.ptr = pointer;
        }
        Ok(self)
    }
}

fn scalar(set: impl FnOnce(&mut VariantData)) -> VariantData {
    let mut data = VariantData {
        record: [ptr::null_mut(); 2],
    };
    set(&mut data);
    data
}

#[inline]
fn join_halves([lo, hi]: [u32; 2]) -> u64 {
    (u64::from(hi) << 32) | u64::from(lo)
}

#[inline]
fn split_halves(v: u64) -> [u32; 2] {
    [v as u32, (v >> 32) as u32]
}

fn unwrap_object(p: *mut c_void) -> Option<ObjectRef> {
    if p.is_null() {
        return None;
    }
    unsafe { ComHelpers::global().unwrap(p, false) }
}

impl fmt::Debug for VARIANT {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = unsafe { self.data.ull };
        f.debug_struct("VARIANT")
            .field("vt", &format_args!("0x{:04X}", self.vt))
            .field("payload", &format_args!("0x{payload:016X}"))
            .finish()
    }
}

// =============================================================================
// Decoded values
// =============================================================================

/// Currency: a 64-bit integer scaled by 10 000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Currency(pub i64);

impl Currency {
    pub const SCALE: i64 = 10_000;

    #[must_use]
    pub const fn from_units(whole: i64, ten_thousandths: i64) -> Self {
        Self(whole * Self::SCALE + ten_thousandths)
    }

    #[must_use]
    pub const fn whole(&self) -> i64 {
        self.0 / Self::SCALE
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:04}", abs / 10_000, abs % 10_000)
    }
}

/// 100 ns ticks since 1601-01-01 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileTime(pub u64);

impl FileTime {
    /// Seconds between 1601-01-01 and the Unix epoch.
    const UNIX_OFFSET_SECS: u64 = 11_644_473_600;
    const TICKS_PER_SEC: u64 = 10_000_000;

    /// Wall-clock time, if the ticks fall on or after the Unix epoch.
    #[must_use]
    pub fn to_system_time(&self) -> Option<std::time::SystemTime> {
        let since_unix = self.0.checked_sub(Self::UNIX_OFFSET_SECS * Self::TICKS_PER_SEC)?;
        let duration = std::time::Duration::new(
            since_unix / Self::TICKS_PER_SEC,
            ((since_unix % Self::TICKS_PER_SEC) * 100) as u32,
        );
        std::time::SystemTime::UNIX_EPOCH.checked_add(duration)
    }
}

/// 96-bit mantissa with a power-of-ten scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    pub mantissa: u128,
    pub scale: u8,
    pub negative: bool,
}

impl Decimal {
    fn from_raw(raw: DECIMAL) -> Self {
        Self {
            mantissa: (u128::from(raw.hi32) << 64) | u128::from(raw.lo64),
            scale: raw.scale,
            negative: raw.sign & DECIMAL_NEG != 0,
        }
    }

    /// Largest mantissa the wire layout holds.
    pub const MAX_MANTISSA: u128 = (1 << 96) - 1;
    /// Largest power-of-ten scale.
    pub const MAX_SCALE: u8 = 28;

    fn to_raw(self) -> Result<DECIMAL> {
        if self.mantissa > Self::MAX_MANTISSA {
            return Err(Error::invalid_variant("decimal mantissa exceeds 96 bits"));
        }
        if self.scale > Self::MAX_SCALE {
            return Err(Error::invalid_variant("decimal scale above 28"));
        }
        Ok(DECIMAL {
            reserved: VT_DECIMAL,
            scale: self.scale,
            sign: if self.negative { DECIMAL_NEG } else { 0 },
            hi32: (self.mantissa >> 64) as u32,
            lo64: self.mantissa as u64,
        })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.to_string();
        let scale = usize::from(self.scale);
        let sign = if self.negative { "-" } else { "" };
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int, frac) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{int}.{frac}")
    }
}

/// A decoded variant value.
#[derive(Clone)]
pub enum Value {
    Empty,
    Null,
    I1(i8),
    U1(u8),
    I2(i16),
    U2(u16),
    I4(i32),
    U4(u32),
    I8(i64),
    U8(u64),
    Int(i32),
    UInt(u32),
    Bool(bool),
    Error(HRESULT),
    Currency(Currency),
    Decimal(Decimal),
    FileTime(FileTime),
    Guid(GUID),
    String(String),
    /// The object behind a dispatch pointer, `None` for null or unresolvable.
    Dispatch(Option<ObjectRef>),
    Unknown(Option<ObjectRef>),
}

impl Value {
    /// Integer view for the integral kinds that fit in `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        Some(match *self {
            Self::I1(v) => v.into(),
            Self::U1(v) => v.into(),
            Self::I2(v) => v.into(),
            Self::U2(v) => v.into(),
            Self::I4(v) | Self::Int(v) => v.into(),
            Self::U4(v) | Self::UInt(v) => v.into(),
            Self::I8(v) => v,
            Self::U8(v) => i64::try_from(v).ok()?,
            _ => return None,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Empty, Empty) | (Null, Null) => true,
            (I1(a), I1(b)) => a == b,
            (U1(a), U1(b)) => a == b,
            (I2(a), I2(b)) => a == b,
            (U2(a), U2(b)) => a == b,
            (I4(a), I4(b)) | (Int(a), Int(b)) => a == b,
            (U4(a), U4(b)) | (UInt(a), UInt(b)) => a == b,
            (I8(a), I8(b)) => a == b,
            (U8(a), U8(b)) => a == b,
            (Bool(a), Bool(b)) => a == b,
            (Error(a), Error(b)) => a == b,
            (Currency(a), Currency(b)) => a == b,
            (Decimal(a), Decimal(b)) => a == b,
            (FileTime(a), FileTime(b)) => a == b,
            (Guid(a), Guid(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Dispatch(a), Dispatch(b)) | (Unknown(a), Unknown(b)) => match (a, b) {
                (Some(a), Some(b)) => same_object(a, b),
                (None, None) => true,
                _ => false,
            },
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Null => f.write_str("Null"),
            Self::I1(v) => f.debug_tuple("I1").field(v).finish(),
            Self::U1(v) => f.debug_tuple("U1").field(v).finish(),
            Self::I2(v) => f.debug_tuple("I2").field(v).finish(),
            Self::U2(v) => f.debug_tuple("U2").field(v).finish(),
            Self::I4(v) => f.debug_tuple("I4").field(v).finish(),
            Self::U4(v) => f.debug_tuple("U4").field(v).finish(),
            Self::I8(v) => f.debug_tuple("I8").field(v).finish(),
            Self::U8(v) => f.debug_tuple("U8").field(v).finish(),
            Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Self::UInt(v) => f.debug_tuple("UInt").field(v).finish(),
            Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Self::Error(v) => write!(f, "Error(0x{:08X})", *v as u32),
            Self::Currency(v) => write!(f, "Currency({v})"),
            Self::Decimal(v) => write!(f, "Decimal({v})"),
            Self::FileTime(v) => f.debug_tuple("FileTime").field(&v.0).finish(),
            Self::Guid(v) => f.debug_tuple("Guid").field(v).finish(),
            Self::String(v) => f.debug_tuple("String").field(v).finish(),
            Self::Dispatch(v) => write!(f, "Dispatch({:?})", v.as_ref().map(object_addr)),
            Self::Unknown(v) => write!(f, "Unknown({:?})", v.as_ref().map(object_addr)),
        }
    }
}

fn object_addr(object: &ObjectRef) -> *const () {
    std::sync::Arc::as_ptr(object) as *const ()
}

// =============================================================================
// ScopedVariant
// =============================================================================

/// An owned [`VARIANT`] cleared exactly once on drop.
pub struct ScopedVariant(VARIANT);

impl ScopedVariant {
    #[must_use]
    pub fn empty() -> Self {
        Self(VARIANT::empty())
    }

    /// Encode `value` into an owned variant.
    pub fn new(value: Value) -> Result<Self> {
        VARIANT::encode(value).map(Self)
    }

    /// Take ownership of a variant's payload.
    ///
    /// # Safety
    /// Same ownership contract as [`VARIANT::clear`].
    #[must_use]
    pub unsafe fn from_raw(variant: VARIANT) -> Self {
        Self(variant)
    }

    /// Give up ownership without clearing.
    #[must_use]
    pub fn into_raw(self) -> VARIANT {
        let variant = self.0;
        std::mem::forget(self);
        variant
    }

    #[must_use]
    pub fn get(&self) -> &VARIANT {
        &self.0
    }

    /// Out-parameter slot. Any previous content is cleared first.
    pub fn as_out(&mut self) -> *mut VARIANT {
        unsafe { self.0.clear() };
        &mut self.0
    }

    pub fn decode(&self) -> Result<Value> {
        self.0.decode()
    }
}

impl Default for ScopedVariant {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for ScopedVariant {
    fn drop(&mut self) {
        unsafe { self.0.clear() };
    }
}

impl fmt::Debug for ScopedVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScopedVariant").field(&self.0).finish()
    }
}
