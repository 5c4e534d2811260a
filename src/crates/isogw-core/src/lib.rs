//! # isogw-core
//!
//! Shared library for the ISO 8583 payment gateway containing the message
//! codec, the data-element specification table, and the echo-test (network
//! management) helpers.
//!
//! This crate is used by both the gateway and the acquirer simulator.
//! It has zero dependencies on sockets, timers, or OS APIs: everything in
//! here is a pure function over byte buffers and message values.
//!
//! # Module map
//!
//! - **`iso`** – The wire codec.  `pack` turns a [`Message`] into a framed
//!   byte sequence (2-byte MLI, MTI, bitmaps, data elements) and `unpack`
//!   reverses it.  The `spec` sub-module is the read-only table describing
//!   how each data element is encoded.

pub mod iso;

// Re-export the most-used items at the crate root so callers can write
// `isogw_core::pack` instead of `isogw_core::iso::codec::pack`.
pub use iso::codec::{pack, unpack, IsoError};
pub use iso::echo::{is_echo_response, new_echo_request, stan_of};
pub use iso::message::Message;
pub use iso::spec::{field_spec, FieldKind, FieldSpec};
pub use iso::stan::StanCounter;
