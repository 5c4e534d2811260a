//! The read-only data-element specification table.

/// Encoding format of an ISO 8583 data element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// ASCII decimal digits, fixed width.
    FixedNum,
    /// ASCII alphanumeric-special, fixed width.
    FixedAns,
    /// Two ASCII decimal digits of length prefix, then the value (max 99).
    Llvar,
    /// Three ASCII decimal digits of length prefix, then the value (max 999).
    Lllvar,
}

/// Describes one data element: number, human name, encoding, and the
/// declared width for fixed-length kinds (0 for variable kinds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub num: u8,
    pub name: &'static str,
    pub kind: FieldKind,
    pub len: usize,
}

const fn fixed_num(num: u8, name: &'static str, len: usize) -> FieldSpec {
    FieldSpec { num, name, kind: FieldKind::FixedNum, len }
}

const fn fixed_ans(num: u8, name: &'static str, len: usize) -> FieldSpec {
    FieldSpec { num, name, kind: FieldKind::FixedAns, len }
}

const fn llvar(num: u8, name: &'static str) -> FieldSpec {
    FieldSpec { num, name, kind: FieldKind::Llvar, len: 0 }
}

const fn lllvar(num: u8, name: &'static str) -> FieldSpec {
    FieldSpec { num, name, kind: FieldKind::Lllvar, len: 0 }
}

/// The data elements this gateway speaks, sorted by field number.
///
/// Fields absent from this table are rejected by the codec in both
/// directions with a "not implemented" error.
static COMMON_SPEC: &[FieldSpec] = &[
    llvar(2, "PAN"),
    fixed_num(3, "ProcessingCode", 6),
    fixed_num(4, "Amount", 12),
    fixed_num(7, "TransmissionDateTime", 10),
    fixed_num(11, "STAN", 6),
    fixed_num(12, "LocalTime", 6),
    fixed_num(13, "LocalDate", 4),
    fixed_num(14, "Expiry", 4),
    fixed_num(22, "POSEntryMode", 3),
    fixed_num(23, "PANSeq", 3),
    fixed_num(24, "NII", 3),
    fixed_num(25, "POSCond", 2),
    llvar(32, "AcqInstID"),
    llvar(35, "Track2"),
    fixed_ans(37, "RRN", 12),
    fixed_ans(38, "AuthID", 6),
    fixed_ans(39, "RespCode", 2),
    fixed_ans(41, "TermID", 8),
    fixed_ans(42, "MerchID", 15),
    fixed_ans(43, "MerchLoc", 40),
    lllvar(48, "AddlDataPriv"),
    fixed_ans(49, "Currency", 3),
    fixed_ans(52, "PINBlock", 16),
    fixed_num(53, "SecCtrl", 16),
    lllvar(54, "AddlAmounts"),
    lllvar(55, "ICCData"),
    lllvar(60, "AdviceReason"),
    lllvar(61, "POSExt"),
    lllvar(62, "Priv"),
    lllvar(63, "Priv2"),
    fixed_num(70, "NMMCode", 3),
    llvar(102, "AccountID1"),
];

/// Looks up the codec entry for a data element number.
///
/// Returns `None` for numbers the gateway does not implement.
pub fn field_spec(num: u8) -> Option<&'static FieldSpec> {
    COMMON_SPEC
        .binary_search_by_key(&num, |s| s.num)
        .ok()
        .map(|i| &COMMON_SPEC[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted_by_field_number() {
        for pair in COMMON_SPEC.windows(2) {
            assert!(pair[0].num < pair[1].num, "table must be strictly ascending");
        }
    }

    #[test]
    fn test_lookup_known_fields() {
        let stan = field_spec(11).expect("DE11 must be present");
        assert_eq!(stan.name, "STAN");
        assert_eq!(stan.kind, FieldKind::FixedNum);
        assert_eq!(stan.len, 6);

        let pan = field_spec(2).expect("DE2 must be present");
        assert_eq!(pan.kind, FieldKind::Llvar);

        let icc = field_spec(55).expect("DE55 must be present");
        assert_eq!(icc.kind, FieldKind::Lllvar);
    }

    #[test]
    fn test_lookup_unknown_field_returns_none() {
        assert!(field_spec(1).is_none());
        assert!(field_spec(5).is_none());
        assert!(field_spec(128).is_none());
    }

    #[test]
    fn test_all_entries_are_in_field_range() {
        for s in COMMON_SPEC {
            assert!(s.num >= 2 && s.num <= 128);
        }
    }
}
