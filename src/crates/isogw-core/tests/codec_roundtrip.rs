//! Integration tests for the isogw-core codec.
//!
//! These tests go through the *public* API only — the same surface the
//! gateway and the simulator use.  Unit tests inside `src/iso/codec.rs`
//! cover individual encode/decode paths; the suites here exercise whole
//! messages end to end:
//!
//! 1. **Round trips** — `unpack(pack(m)) == m` for representative
//!    messages, and `pack(unpack(b)) == b` for accepted byte sequences
//!    (the wire form is canonical).
//! 2. **Echo idiom** — request builder and response predicate.
//! 3. **Boundary behavior** — the exact failure points of LLVAR/LLLVAR
//!    lengths, bitmap-announced unknown fields, and trailing bytes.

use isogw_core::{is_echo_response, new_echo_request, pack, stan_of, unpack, IsoError, Message};

/// Packs `m`, unpacks the bytes, and asserts the round trip is lossless
/// in both directions before returning the decoded message.
fn round_trip(m: &Message) -> Message {
    let wire = pack(m).expect("pack must succeed");
    let decoded = unpack(&wire).expect("unpack must succeed");
    let rewire = pack(&decoded).expect("re-pack must succeed");
    assert_eq!(rewire, wire, "wire form must be canonical");
    decoded
}

// ── Echo scenarios ────────────────────────────────────────────────────────────

#[test]
fn test_echo_request_round_trip() {
    let mut m = new_echo_request(123_456);
    // Pin DE7 so the assertion does not depend on the clock.
    m.set(7, "0102030405");

    let decoded = round_trip(&m);
    assert_eq!(decoded.mti, "0800");
    assert_eq!(decoded.get(7), Some("0102030405"));
    assert_eq!(decoded.get(11), Some("123456"));
    assert_eq!(decoded.get(70), Some("301"));
}

#[test]
fn test_echo_response_recognition() {
    let mut m = Message::new("0810");
    m.set(11, "000007");
    m.set(70, "301");
    assert!(is_echo_response(&m));
    assert_eq!(stan_of(&m), 7);

    m.set(70, "999");
    assert!(!is_echo_response(&m), "DE70 other than 301 is not an echo");
}

#[test]
fn test_simulated_echo_exchange() {
    // What the acquirer does with an inbound 0800: echo DE11 and DE70
    // back under MTI 0810.
    let request = round_trip(&new_echo_request(42));

    let mut response = Message::new("0810");
    response.set(7, "0102030405");
    response.set(11, request.get(11).unwrap());
    response.set(70, request.get(70).unwrap());

    let decoded = round_trip(&response);
    assert!(is_echo_response(&decoded));
    assert_eq!(stan_of(&decoded), stan_of(&request));
}

// ── Variable-length fields ────────────────────────────────────────────────────

#[test]
fn test_variable_fields_wire_layout() {
    let mut m = Message::new("0800");
    m.set(7, "0102030405");
    m.set(11, "123456");
    m.set(48, "HELLO WORLD");
    m.set(102, "ACC1234567");

    let wire = pack(&m).expect("pack must succeed");

    // The LLLVAR prefix of DE48 and the LLVAR prefix of DE102 must sit
    // directly in front of their values.
    let contains = |needle: &[u8]| wire.windows(needle.len()).any(|w| w == needle);
    assert!(contains(b"011HELLO WORLD"), "DE48 must be 011-prefixed");
    assert!(contains(b"10ACC1234567"), "DE102 must be 10-prefixed");

    let decoded = unpack(&wire).expect("unpack must succeed");
    assert_eq!(decoded, m);
}

#[test]
fn test_format_error_response_round_trip() {
    let mut m = Message::new("0210");
    m.set(39, "30");
    let decoded = round_trip(&m);
    assert_eq!(decoded.get(39), Some("30"));
}

#[test]
fn test_dense_message_round_trip() {
    let mut m = Message::new("0200");
    m.set(2, "4111111111111111");
    m.set(3, "000000");
    m.set(4, "000000010000");
    m.set(7, "0102030405");
    m.set(11, "000123");
    m.set(12, "120000");
    m.set(13, "0102");
    m.set(14, "2712");
    m.set(22, "051");
    m.set(24, "001");
    m.set(25, "00");
    m.set(35, "4111111111111111=27121010000012300001");
    m.set(37, "000000000123");
    m.set(41, "TERM0001");
    m.set(42, "MERCHANT0000001");
    m.set(49, "840");
    m.set(55, "9F2608AABBCCDD11223344");
    m.set(102, "ACC1234567");
    assert_eq!(round_trip(&m), m);
}

// ── Boundary behavior ─────────────────────────────────────────────────────────

#[test]
fn test_llvar_and_lllvar_limits() {
    let mut at_limit = Message::new("0800");
    at_limit.set(2, "5".repeat(99));
    at_limit.set(48, "B".repeat(999));
    assert_eq!(round_trip(&at_limit), at_limit);

    let mut over = Message::new("0800");
    over.set(2, "5".repeat(100));
    assert!(matches!(pack(&over), Err(IsoError::ValueTooLong { field: 2, .. })));

    let mut over = Message::new("0800");
    over.set(48, "B".repeat(1000));
    assert!(matches!(pack(&over), Err(IsoError::ValueTooLong { field: 48, .. })));
}

#[test]
fn test_trailing_byte_with_adjusted_mli_is_rejected() {
    let mut m = Message::new("0800");
    m.set(11, "123456");
    let mut wire = pack(&m).unwrap();
    wire.push(0x00);
    let mli = (wire.len() - 2) as u16;
    wire[..2].copy_from_slice(&mli.to_be_bytes());
    assert!(matches!(unpack(&wire), Err(IsoError::ExtraBytes(1))));
}

#[test]
fn test_bitmap_bit_for_unknown_field_is_rejected() {
    // Start from a valid frame and additionally flag DE6, which has no
    // spec entry.  Bit 6 lives in the first bitmap byte.
    let mut m = Message::new("0800");
    m.set(11, "123456");
    let mut wire = pack(&m).unwrap();
    wire[6] |= 1 << (8 - 6);
    assert!(matches!(unpack(&wire), Err(IsoError::NotImplemented(6))));
}

#[test]
fn test_unpack_of_truncated_buffers() {
    let mut m = Message::new("0800");
    m.set(11, "123456");
    let wire = pack(&m).unwrap();

    assert!(matches!(unpack(&wire[..1]), Err(IsoError::BufferTooShortForMli)));
    for cut in 2..wire.len() {
        assert!(
            unpack(&wire[..cut]).is_err(),
            "truncation at {cut} must not decode"
        );
    }
}
