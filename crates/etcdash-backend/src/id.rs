//! Member and lease identifier encoding.
//!
//! etcd identifies members and leases with 64-bit integers. The console
//! shows them as lowercase hex without a `0x` prefix, while client calls
//! and some wire payloads carry them as unsigned decimals. All conversions
//! between the two go through this module so that values near the 64-bit
//! boundary are never routed through a lossy numeric type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::BackendError;

/// Parse a hex string (optionally `0x`-prefixed, any case) into a `u64`.
fn parse_hex_u64(input: &str) -> Result<u64, BackendError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(invalid(input, "empty identifier"));
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid(input, "not a hexadecimal number"));
    }

    u64::from_str_radix(digits, 16).map_err(|e| invalid(input, &e.to_string()))
}

/// Parse an unsigned decimal string into a `u64`.
fn parse_decimal_u64(input: &str) -> Result<u64, BackendError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(input, "not an unsigned decimal number"));
    }
    trimmed
        .parse::<u64>()
        .map_err(|e| invalid(input, &e.to_string()))
}

fn invalid(value: &str, reason: &str) -> BackendError {
    BackendError::InvalidId {
        value: value.to_owned(),
        reason: reason.to_owned(),
    }
}

/// Normalize any identifier representation seen on the wire into display hex.
///
/// Accepts `0x`-prefixed hex or an unsigned decimal. Anything else is
/// returned unchanged so that unexpected formats are still visible.
#[must_use]
pub fn to_display_hex(raw: &str) -> String {
    if raw.starts_with("0x") || raw.starts_with("0X") {
        return parse_hex_u64(raw).map_or_else(|_| raw.to_owned(), |v| format!("{v:x}"));
    }
    parse_decimal_u64(raw).map_or_else(|_| raw.to_owned(), |v| format!("{v:x}"))
}

/// A cluster member identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(u64);

impl MemberId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Parse the display form (hex, `0x` prefix optional).
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidId`] if `hex` is empty, contains
    /// non-hex characters, or overflows 64 bits.
    pub fn parse_hex(hex: &str) -> Result<Self, BackendError> {
        parse_hex_u64(hex).map(Self)
    }

    /// Parse the decimal wire form.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidId`] if `decimal` is not an unsigned
    /// decimal that fits in 64 bits.
    pub fn from_wire(decimal: &str) -> Result<Self, BackendError> {
        parse_decimal_u64(decimal).map(Self)
    }

    /// Decimal wire form.
    #[must_use]
    pub fn to_wire(self) -> String {
        self.0.to_string()
    }

    /// Lowercase hex display form.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("{:x}", self.0)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl FromStr for MemberId {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl Serialize for MemberId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for MemberId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// A lease identifier.
///
/// etcd leases are signed 64-bit on the wire but always positive in
/// practice; hex values above `i64::MAX` are rejected instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeaseId(i64);

impl LeaseId {
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Parse the display form (hex, `0x` prefix optional).
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidId`] for malformed hex or values that
    /// do not fit in a signed 64-bit lease ID.
    pub fn parse_hex(hex: &str) -> Result<Self, BackendError> {
        let raw = parse_hex_u64(hex)?;
        i64::try_from(raw)
            .map(Self)
            .map_err(|_| invalid(hex, "lease ID exceeds i64::MAX"))
    }

    /// Lowercase hex display form.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("{:x}", self.0)
    }
}

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl FromStr for LeaseId {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_id_roundtrips_at_64_bit_boundaries() {
        for raw in [0, 1, u64::from(u32::MAX), i64::MAX as u64, u64::MAX] {
            let id = MemberId::new(raw);
            assert_eq!(MemberId::parse_hex(&id.to_hex()).unwrap(), id);
            assert_eq!(MemberId::from_wire(&id.to_wire()).unwrap(), id);
        }
        assert_eq!(MemberId::new(u64::MAX).to_hex(), "ffffffffffffffff");
        assert_eq!(MemberId::new(u64::MAX).to_wire(), "18446744073709551615");
    }

    #[test]
    fn member_id_accepts_prefix_and_uppercase() {
        let id = MemberId::parse_hex("0x8E9E05C52164694D").unwrap();
        assert_eq!(id.to_string(), "8e9e05c52164694d");
    }

    #[test]
    fn member_id_rejects_garbage() {
        assert!(MemberId::parse_hex("").is_err());
        assert!(MemberId::parse_hex("0x").is_err());
        assert!(MemberId::parse_hex("+ff").is_err());
        assert!(MemberId::parse_hex("xyz").is_err());
        assert!(MemberId::parse_hex("1ffffffffffffffff").is_err());
        assert!(MemberId::from_wire("-1").is_err());
        assert!(MemberId::from_wire("18446744073709551616").is_err());
    }

    #[test]
    fn display_hex_normalizes_wire_forms() {
        assert_eq!(to_display_hex("255"), "ff");
        assert_eq!(to_display_hex("0xFF"), "ff");
        assert_eq!(to_display_hex("18446744073709551615"), "ffffffffffffffff");
        assert_eq!(to_display_hex("not-an-id"), "not-an-id");
    }

    #[test]
    fn lease_id_rejects_values_above_i64_max() {
        assert!(LeaseId::parse_hex("7fffffffffffffff").is_ok());
        assert!(LeaseId::parse_hex("8000000000000000").is_err());
        assert_eq!(LeaseId::new(0x694d_7a3b).to_hex(), "694d7a3b");
    }

    #[test]
    fn member_id_serde_uses_hex() {
        let json = serde_json::to_string(&MemberId::new(255)).unwrap();
        assert_eq!(json, "\"ff\"");
        let back: MemberId = serde_json::from_str("\"0xff\"").unwrap();
        assert_eq!(back, MemberId::new(255));
    }
}
