//! Derivation engine
//!
//! Pure functions that turn raw upstream numbers into explorer semantics:
//! slot to epoch arithmetic, epoch progress, relative time strings, status
//! labels and wide-integer normalization. Nothing here performs I/O or fails;
//! callers validate their inputs first.

use alloy_primitives::U256;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Slots in one beacon-chain epoch. Protocol constant.
pub const SLOTS_PER_EPOCH: u64 = 32;

pub fn slot_to_epoch(slot: u64) -> u64 {
    slot / SLOTS_PER_EPOCH
}

pub fn slot_in_epoch(slot: u64) -> u64 {
    slot % SLOTS_PER_EPOCH
}

/// Completion of the current epoch, in hundredths of a percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EpochProgress(u32);

impl EpochProgress {
    pub fn hundredths(&self) -> u32 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl fmt::Display for EpochProgress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for EpochProgress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// `((slot mod 32) + 1) / 32 * 100`, rounded to two decimals.
///
/// The quotient is computed exactly in integer hundredths. Ties round to the
/// even neighbour, which is also what `format!("{:.2}")` does for the exactly
/// representable float, so slot 100 reports `15.62`.
///
/// Half-up rounding (JavaScript `toFixed(2)`) would give `15.63` for slot 100
/// and `3.13` for the first slot of an epoch. Slot 100 must report `15.62`,
/// so this stays half-to-even.
pub fn epoch_progress(slot: u64) -> EpochProgress {
    let numerator = (slot_in_epoch(slot) + 1) * 100 * 100;
    let quotient = numerator / SLOTS_PER_EPOCH;
    let twice_remainder = 2 * (numerator % SLOTS_PER_EPOCH);

    let rounded = if twice_remainder > SLOTS_PER_EPOCH
        || (twice_remainder == SLOTS_PER_EPOCH && quotient % 2 == 1)
    {
        quotient + 1
    } else {
        quotient
    };

    // slot_in_epoch < 32 keeps this at or below 10_000
    EpochProgress(rounded as u32)
}

/// Renders the age of `timestamp` relative to `now` (both unix seconds).
///
/// Timestamps in the future yield negative minutes; they are reported as-is.
/// The difference is taken in `i128` so no upstream value can overflow it.
pub fn relative_time(timestamp: Option<u64>, now: i64) -> String {
    match timestamp {
        Some(ts) => {
            let delta = i128::from(now) - i128::from(ts);
            format!("{} mins ago", delta.div_euclid(60))
        }
        None => "Unknown time".to_string(),
    }
}

pub fn canonical_status(canonical: bool) -> &'static str {
    if canonical {
        "Proposed"
    } else {
        "Not Proposed"
    }
}

pub fn finality_label(finalized: bool) -> &'static str {
    if finalized {
        "Yes"
    } else {
        "No"
    }
}

/// Arbitrary-precision unsigned quantity as it arrives from an upstream:
/// `0x`-prefixed hex from JSON-RPC, decimal strings or plain JSON integers
/// from REST endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct WideInt(U256);

impl WideInt {
    pub fn new(value: U256) -> Self {
        WideInt(value)
    }

    pub fn value(&self) -> U256 {
        self.0
    }
}

impl From<u64> for WideInt {
    fn from(value: u64) -> Self {
        WideInt(U256::from(value))
    }
}

impl FromStr for WideInt {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("empty quantity".to_string());
        }
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some("") => return Err(format!("empty hex quantity {:?}", s)),
            Some(digits) => U256::from_str_radix(digits, 16),
            None => U256::from_str_radix(trimmed, 10),
        };
        parsed
            .map(WideInt)
            .map_err(|e| format!("invalid quantity {:?}: {}", s, e))
    }
}

impl fmt::Display for WideInt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for WideInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct WideIntVisitor;

        impl Visitor<'_> for WideIntVisitor {
            type Value = WideInt;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a hex or decimal unsigned integer")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<WideInt, E> {
                Ok(WideInt::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<WideInt, E> {
                u64::try_from(v)
                    .map(WideInt::from)
                    .map_err(|_| E::custom(format!("negative quantity {}", v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<WideInt, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(WideIntVisitor)
    }
}

/// Decimal rendering of a wide quantity. Absent stays absent.
pub fn normalize_wide_int(value: Option<WideInt>) -> Option<String> {
    value.map(|v| v.to_string())
}

/// Parses a `0x`-prefixed hex quantity that must fit in 64 bits (block
/// numbers, timestamps, nonces).
pub fn parse_hex_u64(s: &str) -> Result<u64, String> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| format!("quantity {:?} is missing the 0x prefix", s))?;
    u64::from_str_radix(digits, 16).map_err(|e| format!("invalid quantity {:?}: {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_to_epoch() {
        for slot in [0u64, 1, 31, 32, 33, 100, 9_999_999, u64::MAX] {
            assert_eq!(slot_to_epoch(slot), slot / 32);
            assert!(slot_in_epoch(slot) < SLOTS_PER_EPOCH);
        }
        assert_eq!(slot_to_epoch(31), 0);
        assert_eq!(slot_to_epoch(32), 1);
    }

    #[test]
    fn test_slot_100_scenario() {
        assert_eq!(slot_to_epoch(100), 3);
        assert_eq!(slot_in_epoch(100), 4);
        assert_eq!(epoch_progress(100).to_string(), "15.62");
        assert_eq!(epoch_progress(100).hundredths(), 1562);
    }

    #[test]
    fn test_epoch_progress_bounds_and_shape() {
        assert_eq!(epoch_progress(0).to_string(), "3.12");
        assert_eq!(epoch_progress(31).to_string(), "100.00");
        assert_eq!(epoch_progress(15).to_string(), "50.00");
        assert_eq!(epoch_progress(2).to_string(), "9.38");

        let mut previous = epoch_progress(64);
        for slot in 65..96 {
            let current = epoch_progress(slot);
            assert!(current >= previous, "progress decreased at slot {}", slot);
            assert!(current.hundredths() <= 10_000);
            previous = current;
        }
        // resets at the boundary
        assert!(epoch_progress(96) < epoch_progress(95));
        assert_eq!(epoch_progress(96), epoch_progress(0));
    }

    #[test]
    fn test_epoch_progress_serializes_as_string() {
        let json = serde_json::to_value(epoch_progress(100)).unwrap();
        assert_eq!(json, serde_json::json!("15.62"));
    }

    #[test]
    fn test_relative_time() {
        assert_eq!(relative_time(None, 1_700_000_000), "Unknown time");
        assert_eq!(relative_time(Some(1_700_000_000), 1_700_000_000), "0 mins ago");
        assert_eq!(relative_time(Some(1_700_000_000), 1_700_000_059), "0 mins ago");
        assert_eq!(relative_time(Some(1_700_000_000), 1_700_000_125), "2 mins ago");
        // clock skew is not clamped
        assert_eq!(relative_time(Some(1_700_000_030), 1_700_000_000), "-1 mins ago");
        assert_eq!(relative_time(Some(1_700_000_120), 1_700_000_000), "-2 mins ago");
    }

    #[test]
    fn test_relative_time_extreme_timestamps() {
        // past i64::MAX: far in the future, never wrapped into the past
        let rendered = relative_time(Some(1u64 << 63), 1_700_000_000);
        assert!(rendered.starts_with('-'), "{}", rendered);

        let delta = 1_700_000_000i128 - i128::from(u64::MAX);
        assert_eq!(
            relative_time(Some(u64::MAX), 1_700_000_000),
            format!("{} mins ago", delta.div_euclid(60))
        );
        assert_eq!(relative_time(Some(0), i64::MAX), format!("{} mins ago", i64::MAX / 60));
        assert_eq!(relative_time(Some(u64::MAX), i64::MIN).chars().next(), Some('-'));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(canonical_status(true), "Proposed");
        assert_eq!(canonical_status(false), "Not Proposed");
        assert_eq!(finality_label(true), "Yes");
        assert_eq!(finality_label(false), "No");
    }

    #[test]
    fn test_normalize_wide_int() {
        let hex: WideInt = "0x1c9c380".parse().unwrap();
        assert_eq!(normalize_wide_int(Some(hex)), Some("30000000".to_string()));

        // wider than 64 bits
        let big: WideInt = "0x1000000000000000000000000".parse().unwrap();
        assert_eq!(
            normalize_wide_int(Some(big)).as_deref(),
            Some("79228162514264337593543950336")
        );

        assert_eq!(normalize_wide_int(None), None);
    }

    #[test]
    fn test_normalize_wide_int_is_idempotent() {
        for input in ["0", "7", "30000000", "79228162514264337593543950336"] {
            let once = normalize_wide_int(Some(input.parse().unwrap())).unwrap();
            assert_eq!(once, input);
            let twice = normalize_wide_int(Some(once.parse().unwrap())).unwrap();
            assert_eq!(twice, once);
        }
    }

    #[test]
    fn test_wide_int_rejects_garbage() {
        assert!("0x".parse::<WideInt>().is_err());
        assert!("0xzz".parse::<WideInt>().is_err());
        assert!("-5".parse::<WideInt>().is_err());
        assert!("".parse::<WideInt>().is_err());
    }

    #[test]
    fn test_wide_int_deserialize() {
        let from_number: WideInt = serde_json::from_str("33987345000000000").unwrap();
        assert_eq!(from_number.to_string(), "33987345000000000");

        let from_hex: WideInt = serde_json::from_str("\"0xff\"").unwrap();
        assert_eq!(from_hex.to_string(), "255");

        assert!(serde_json::from_str::<WideInt>("-1").is_err());
        assert!(serde_json::from_str::<WideInt>("1.5").is_err());
    }

    #[test]
    fn test_parse_hex_u64() {
        assert_eq!(parse_hex_u64("0x0"), Ok(0));
        assert_eq!(parse_hex_u64("0x1312d00"), Ok(20_000_000));
        assert!(parse_hex_u64("1312d00").is_err());
        assert!(parse_hex_u64("0x").is_err());
    }
}
