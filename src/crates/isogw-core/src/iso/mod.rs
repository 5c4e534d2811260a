//! ISO 8583 message model and wire codec.
//!
//! # Wire format
//!
//! Every framed message on the wire looks like this:
//!
//! ```text
//! [2B MLI big-endian][4B MTI ASCII][8B primary bitmap]
//!     [optional 8B secondary bitmap][data elements, ascending field order]
//! ```
//!
//! - **MLI** – length of everything after itself, big-endian u16.
//! - **MTI** – four ASCII decimal digits classifying the message
//!   (`0800` echo request, `0810` echo response, `0200`/`0210`
//!   authorization pair, …).
//! - **Primary bitmap** – 64 presence bits, MSB first; bit N set means
//!   data element N is present.  Bit 1 is reserved: it announces that a
//!   secondary bitmap follows, covering fields 65..128.
//! - **Data elements** – each encoded per its entry in [`spec`]: fixed
//!   width, or LLVAR/LLLVAR with a 2- or 3-digit ASCII length prefix.
//!
//! # Sub-modules
//!
//! - **`message`** – The logical [`message::Message`] value (MTI + field map).
//! - **`spec`**    – The read-only data-element specification table.
//! - **`codec`**   – `pack` / `unpack` between `Message` and wire bytes.
//! - **`echo`**    – Builders and predicates for NMM 301 echo exchanges.
//! - **`stan`**    – Atomic System Trace Audit Number counter.

pub mod codec;
pub mod echo;
pub mod message;
pub mod spec;
pub mod stan;

pub use codec::{pack, unpack, IsoError};
pub use echo::{is_echo_response, new_echo_request, stan_of};
pub use message::Message;
pub use spec::{field_spec, FieldKind, FieldSpec};
pub use stan::StanCounter;
