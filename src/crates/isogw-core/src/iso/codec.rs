//! Packing and unpacking between [`Message`] and wire bytes.
//!
//! `pack` and `unpack` form a bijection over valid messages: for every
//! message `m` whose fields satisfy the spec table, `unpack(pack(m)) == m`,
//! and for every byte sequence `b` that `unpack` accepts,
//! `pack(unpack(b)) == b`.  The bitmap layout, the ascending field order,
//! and the MLI are all canonical, so there is exactly one wire form per
//! message.

use std::fmt::Write as _;

use thiserror::Error;

use crate::iso::message::{Message, MAX_FIELD};
use crate::iso::spec::{field_spec, FieldKind};

/// MTI (4) + primary bitmap (8).
const HEADER_LEN: usize = 12;

/// Largest body an MLI can describe.
const MAX_BODY_LEN: usize = u16::MAX as usize;

/// Errors produced while packing or unpacking a message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IsoError {
    /// The MTI is not exactly four ASCII decimal digits.
    #[error("invalid MTI: {0:?}")]
    InvalidMti(String),

    /// A populated field number lies outside 2..=128 (field 1 is reserved
    /// for the secondary-bitmap indicator).
    #[error("unsupported field {0}")]
    UnsupportedField(u8),

    /// The field number is in range but has no entry in the spec table.
    #[error("field {0} not implemented")]
    NotImplemented(u8),

    /// A fixed-width value does not match its declared length.
    #[error("DE{field} length mismatch: expected {expected}, got {actual}")]
    FixedLengthMismatch { field: u8, expected: usize, actual: usize },

    /// An LLVAR/LLLVAR value exceeds what its length prefix can express.
    #[error("DE{field} value too long for LL(L)VAR: {len} > {max}")]
    ValueTooLong { field: u8, len: usize, max: usize },

    /// A field value contains non-ASCII bytes.
    #[error("DE{0} value is not ASCII")]
    ValueNotAscii(u8),

    /// The packed body would not fit behind a 2-byte MLI.
    #[error("message too long for MLI: {0} bytes")]
    FrameTooLong(usize),

    /// Fewer than two bytes were supplied.
    #[error("buffer too short for MLI")]
    BufferTooShortForMli,

    /// The buffer ends before the MLI-declared body does.
    #[error("incomplete message: need {need}, have {have}")]
    Incomplete { need: usize, have: usize },

    /// The body ends before MTI + primary bitmap.
    #[error("too short for MTI+bitmap")]
    TooShortForHeader,

    /// Primary bit 1 promised a secondary bitmap that is not there.
    #[error("too short for secondary bitmap")]
    TooShortForSecondaryBitmap,

    /// A fixed-width field or an LL(L)VAR value runs past the body end.
    #[error("truncated DE{0}")]
    TruncatedField(u8),

    /// An LL(L)VAR length prefix is not ASCII decimal digits.
    #[error("invalid LL(L)VAR length for DE{0}")]
    InvalidVarLength(u8),

    /// Bytes remain after the last bitmap-announced field, or the buffer
    /// extends past the MLI-declared frame end.
    #[error("extra bytes at end: {0}")]
    ExtraBytes(usize),
}

// ── Packing ───────────────────────────────────────────────────────────────────

/// Serializes a message to its framed wire form, MLI prefix included.
///
/// # Errors
///
/// Returns [`IsoError`] when the MTI is malformed, a field number is out
/// of range or unknown to the spec table, or a value violates its codec.
///
/// # Examples
///
/// ```rust
/// use isogw_core::{pack, unpack, Message};
///
/// let mut m = Message::new("0800");
/// m.set(11, "123456");
/// m.set(70, "301");
/// let wire = pack(&m).unwrap();
/// assert_eq!(unpack(&wire).unwrap(), m);
/// ```
pub fn pack(m: &Message) -> Result<Vec<u8>, IsoError> {
    if !is_valid_mti(&m.mti) {
        return Err(IsoError::InvalidMti(m.mti.clone()));
    }

    // Presence bitmaps.  Bit N of the primary bitmap (1-indexed, MSB
    // first) marks field N; fields above 64 land in the secondary bitmap
    // and force primary bit 1 on.
    let mut primary: u64 = 0;
    let mut secondary: u64 = 0;
    for &f in m.fields.keys() {
        if f < 2 || f > MAX_FIELD {
            return Err(IsoError::UnsupportedField(f));
        }
        if f <= 64 {
            primary |= 1 << (64 - u32::from(f));
        } else {
            secondary |= 1 << (64 - u32::from(f - 64));
        }
    }
    if secondary != 0 {
        primary |= 1 << 63;
    }

    let mut body = Vec::with_capacity(HEADER_LEN + 32);
    body.extend_from_slice(m.mti.as_bytes());
    body.extend_from_slice(&primary.to_be_bytes());
    if secondary != 0 {
        body.extend_from_slice(&secondary.to_be_bytes());
    }

    // BTreeMap iteration is ascending, which is the wire order.
    for (&f, value) in &m.fields {
        encode_field(&mut body, f, value)?;
    }

    if body.len() > MAX_BODY_LEN {
        return Err(IsoError::FrameTooLong(body.len()));
    }

    let mut wire = Vec::with_capacity(2 + body.len());
    wire.extend_from_slice(&(body.len() as u16).to_be_bytes());
    wire.extend_from_slice(&body);
    Ok(wire)
}

fn encode_field(body: &mut Vec<u8>, field: u8, value: &str) -> Result<(), IsoError> {
    let spec = field_spec(field).ok_or(IsoError::NotImplemented(field))?;
    if !value.is_ascii() {
        return Err(IsoError::ValueNotAscii(field));
    }
    match spec.kind {
        FieldKind::FixedNum | FieldKind::FixedAns => {
            if value.len() != spec.len {
                return Err(IsoError::FixedLengthMismatch {
                    field,
                    expected: spec.len,
                    actual: value.len(),
                });
            }
            body.extend_from_slice(value.as_bytes());
        }
        FieldKind::Llvar => encode_var(body, field, value, 2, 99)?,
        FieldKind::Lllvar => encode_var(body, field, value, 3, 999)?,
    }
    Ok(())
}

fn encode_var(
    body: &mut Vec<u8>,
    field: u8,
    value: &str,
    prefix_digits: usize,
    max: usize,
) -> Result<(), IsoError> {
    if value.len() > max {
        return Err(IsoError::ValueTooLong { field, len: value.len(), max });
    }
    let mut prefix = String::with_capacity(prefix_digits);
    // Infallible: writing to a String cannot error.
    let _ = write!(prefix, "{:0width$}", value.len(), width = prefix_digits);
    body.extend_from_slice(prefix.as_bytes());
    body.extend_from_slice(value.as_bytes());
    Ok(())
}

// ── Unpacking ─────────────────────────────────────────────────────────────────

/// Parses one framed wire message back into a [`Message`].
///
/// The buffer must hold exactly one frame: the 2-byte MLI plus the number
/// of body bytes it declares.  A shorter buffer is `Incomplete`; a longer
/// one is `ExtraBytes`.  Streaming across frames is the transport's job,
/// not the codec's.
///
/// # Errors
///
/// Returns [`IsoError`] when framing, bitmaps, or any data element cannot
/// be decoded.
pub fn unpack(b: &[u8]) -> Result<Message, IsoError> {
    if b.len() < 2 {
        return Err(IsoError::BufferTooShortForMli);
    }
    let mli = u16::from_be_bytes([b[0], b[1]]) as usize;
    if b.len() - 2 < mli {
        return Err(IsoError::Incomplete { need: mli, have: b.len() - 2 });
    }
    if b.len() - 2 > mli {
        return Err(IsoError::ExtraBytes(b.len() - 2 - mli));
    }
    let body = &b[2..];
    if body.len() < HEADER_LEN {
        return Err(IsoError::TooShortForHeader);
    }

    let mti = std::str::from_utf8(&body[..4])
        .ok()
        .filter(|s| is_valid_mti(s))
        .ok_or_else(|| IsoError::InvalidMti(String::from_utf8_lossy(&body[..4]).into_owned()))?;

    let primary = u64::from_be_bytes(body[4..12].try_into().unwrap());
    let mut off = HEADER_LEN;

    let secondary = if primary & (1 << 63) != 0 {
        if body.len() < HEADER_LEN + 8 {
            return Err(IsoError::TooShortForSecondaryBitmap);
        }
        off += 8;
        u64::from_be_bytes(body[12..20].try_into().unwrap())
    } else {
        0
    };

    let mut m = Message::new(mti);
    for f in 2..=MAX_FIELD {
        let present = if f <= 64 {
            primary & (1 << (64 - u32::from(f))) != 0
        } else {
            secondary & (1 << (64 - u32::from(f - 64))) != 0
        };
        if !present {
            continue;
        }
        let value = decode_field(body, &mut off, f)?;
        m.fields.insert(f, value);
    }

    if off != body.len() {
        return Err(IsoError::ExtraBytes(body.len() - off));
    }
    Ok(m)
}

fn decode_field(body: &[u8], off: &mut usize, field: u8) -> Result<String, IsoError> {
    let spec = field_spec(field).ok_or(IsoError::NotImplemented(field))?;
    match spec.kind {
        FieldKind::FixedNum | FieldKind::FixedAns => take_value(body, off, field, spec.len),
        FieldKind::Llvar => decode_var(body, off, field, 2),
        FieldKind::Lllvar => decode_var(body, off, field, 3),
    }
}

fn decode_var(
    body: &[u8],
    off: &mut usize,
    field: u8,
    prefix_digits: usize,
) -> Result<String, IsoError> {
    if *off + prefix_digits > body.len() {
        return Err(IsoError::TruncatedField(field));
    }
    let prefix = &body[*off..*off + prefix_digits];
    let mut len = 0usize;
    for &d in prefix {
        if !d.is_ascii_digit() {
            return Err(IsoError::InvalidVarLength(field));
        }
        len = len * 10 + usize::from(d - b'0');
    }
    *off += prefix_digits;
    take_value(body, off, field, len)
}

fn take_value(body: &[u8], off: &mut usize, field: u8, len: usize) -> Result<String, IsoError> {
    if *off + len > body.len() {
        return Err(IsoError::TruncatedField(field));
    }
    let bytes = &body[*off..*off + len];
    let value = std::str::from_utf8(bytes)
        .ok()
        .filter(|s| s.is_ascii())
        .ok_or(IsoError::ValueNotAscii(field))?;
    *off += len;
    Ok(value.to_string())
}

fn is_valid_mti(mti: &str) -> bool {
    mti.len() == 4 && mti.bytes().all(|b| b.is_ascii_digit())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
