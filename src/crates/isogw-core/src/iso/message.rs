//! The logical ISO 8583 message value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// MTI of a network management (echo) request.
pub const MTI_NETWORK_MGMT_REQUEST: &str = "0800";
/// MTI of a network management (echo) response.
pub const MTI_NETWORK_MGMT_RESPONSE: &str = "0810";

/// Highest data element number addressable through the secondary bitmap.
pub const MAX_FIELD: u8 = 128;

/// A logical ISO 8583 message: a four-digit MTI plus a map from data
/// element number to its ASCII value.
///
/// The map is ordered by field number, which is exactly the order the
/// elements appear on the wire.  Field 1 is reserved (it denotes the
/// presence of a secondary bitmap) and is rejected at pack time.
///
/// # Examples
///
/// ```rust
/// use isogw_core::Message;
///
/// let mut m = Message::new("0800");
/// m.set(11, "123456");
/// m.set(70, "301");
/// assert_eq!(m.get(11), Some("123456"));
/// assert!(m.contains(70));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message Type Indicator, exactly four ASCII decimal digits.
    pub mti: String,
    /// Data elements keyed by field number (2..=128), ascending.
    pub fields: BTreeMap<u8, String>,
}

impl Message {
    /// Creates an empty message with the given MTI.
    pub fn new(mti: impl Into<String>) -> Self {
        Self {
            mti: mti.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Sets a data element value, replacing any previous value.
    pub fn set(&mut self, field: u8, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    /// Returns the value of a data element, if present.
    pub fn get(&self, field: u8) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Returns `true` if the data element is populated.
    pub fn contains(&self, field: u8) -> bool {
        self.fields.contains_key(&field)
    }
}
