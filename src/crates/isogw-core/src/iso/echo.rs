//! Network management (echo test) message helpers.
//!
//! An echo exchange is the liveness probe of the link: the gateway sends
//! an MTI `0800` carrying network management code `301` in DE70, the
//! acquirer answers with an MTI `0810` echoing the STAN.  No business
//! data is involved.

use chrono::Utc;

use crate::iso::message::{Message, MTI_NETWORK_MGMT_REQUEST, MTI_NETWORK_MGMT_RESPONSE};

/// DE70 network management information code for an echo test.
pub const NMM_ECHO_TEST: &str = "301";

/// Builds an echo request: MTI `0800`, DE7 = current UTC `MMDDhhmmss`,
/// DE11 = `stan mod 10^6` zero-padded to six digits, DE70 = `301`.
pub fn new_echo_request(stan: u64) -> Message {
    let mut m = Message::new(MTI_NETWORK_MGMT_REQUEST);
    m.set(7, Utc::now().format("%m%d%H%M%S").to_string());
    m.set(11, format!("{:06}", stan % 1_000_000));
    m.set(70, NMM_ECHO_TEST);
    m
}

/// Returns `true` iff `m` is an echo response: MTI `0810`, DE70 = `301`,
/// and DE11 present.
pub fn is_echo_response(m: &Message) -> bool {
    m.mti == MTI_NETWORK_MGMT_RESPONSE && m.get(70) == Some(NMM_ECHO_TEST) && m.contains(11)
}

/// Numeric DE11 for logging and correlation; 0 when absent or non-numeric.
pub fn stan_of(m: &Message) -> u64 {
    m.get(11).and_then(|v| v.parse().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_request_shape() {
        let m = new_echo_request(123_456);
        assert_eq!(m.mti, "0800");
        assert_eq!(m.get(11), Some("123456"));
        assert_eq!(m.get(70), Some("301"));
        let de7 = m.get(7).expect("DE7 must be set");
        assert_eq!(de7.len(), 10);
        assert!(de7.bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn test_echo_request_stan_wraps_at_one_million() {
        let m = new_echo_request(1_000_007);
        assert_eq!(m.get(11), Some("000007"));
    }

    #[test]
    fn test_echo_request_stan_is_zero_padded() {
        let m = new_echo_request(7);
        assert_eq!(m.get(11), Some("000007"));
    }

    #[test]
    fn test_is_echo_response_accepts_0810_with_301() {
        let mut m = Message::new("0810");
        m.set(11, "000007");
        m.set(70, "301");
        assert!(is_echo_response(&m));
    }

    #[test]
    fn test_is_echo_response_rejects_other_nmm_code() {
        let mut m = Message::new("0810");
        m.set(11, "000007");
        m.set(70, "999");
        assert!(!is_echo_response(&m));
    }

    #[test]
    fn test_is_echo_response_rejects_wrong_mti() {
        let mut m = Message::new("0800");
        m.set(11, "000007");
        m.set(70, "301");
        assert!(!is_echo_response(&m));
    }

    #[test]
    fn test_is_echo_response_requires_stan() {
        let mut m = Message::new("0810");
        m.set(70, "301");
        assert!(!is_echo_response(&m));
    }

    #[test]
    fn test_stan_of_parses_de11() {
        let mut m = Message::new("0810");
        m.set(11, "000042");
        assert_eq!(stan_of(&m), 42);
    }

    #[test]
    fn test_stan_of_absent_is_zero() {
        let m = Message::new("0810");
        assert_eq!(stan_of(&m), 0);
    }
}
