//! Conservative fixed-point encoding for solver facts.
//!
//! The solver only reasons over integers, so every continuous measurement is
//! scaled by `10^precision` and rounded *up*. Rounding up means an encoded
//! distance is never shorter than the true one.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Encoder/decoder for a single precision level.
///
/// Two codecs built for the same precision compare equal and behave
/// identically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrecisionCodec {
    precision: i32,
    scale: f64,
}

impl PrecisionCodec {
    pub fn new(precision: i32) -> Self {
        Self {
            precision,
            scale: 10f64.powi(precision),
        }
    }

    pub fn precision(&self) -> i32 {
        self.precision
    }

    /// Smallest integer that is `>= value * 10^precision`.
    pub fn encode(&self, value: f64) -> i64 {
        (value * self.scale).ceil() as i64
    }

    /// Lossy inverse of [`encode`](Self::encode).
    pub fn decode(&self, encoded: i64) -> f64 {
        encoded as f64 / self.scale
    }

    pub fn value(&self, raw: f64) -> PrecisionValue {
        PrecisionValue {
            raw,
            encoded: self.encode(raw),
            precision: self.precision,
        }
    }
}

/// A raw measurement paired with its encoded form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrecisionValue {
    pub raw: f64,
    pub encoded: i64,
    pub precision: i32,
}

impl PrecisionValue {
    /// An exact zero, valid at any precision.
    pub fn zero(precision: i32) -> Self {
        Self {
            raw: 0.0,
            encoded: 0,
            precision,
        }
    }

    pub fn decoded(&self) -> f64 {
        PrecisionCodec::new(self.precision).decode(self.encoded)
    }
}

/// Memo of codecs keyed by precision level.
#[derive(Debug, Default, Clone)]
pub struct CodecCache {
    codecs: HashMap<i32, PrecisionCodec>,
}

impl CodecCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, precision: i32) -> PrecisionCodec {
        *self
            .codecs
            .entry(precision)
            .or_insert_with(|| PrecisionCodec::new(precision))
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

/// Distance and duration precision levels used for one compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecisionPair {
    pub distance: i32,
    pub duration: i32,
}

impl Default for PrecisionPair {
    fn default() -> Self {
        Self {
            distance: 2,
            duration: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_rounds_up() {
        let codec = PrecisionCodec::new(2);
        assert_eq!(codec.encode(12.345), 1235);
        assert_eq!(codec.encode(3.0), 300);
        assert_eq!(codec.encode(0.001), 1);
    }

    #[test]
    fn test_precision_zero() {
        let codec = PrecisionCodec::new(0);
        assert_eq!(codec.encode(4.2), 5);
        assert_eq!(codec.encode(4.0), 4);
        assert_eq!(codec.decode(5), 5.0);
    }

    #[test]
    fn test_negative_precision_scales_down() {
        let codec = PrecisionCodec::new(-1);
        assert_eq!(codec.encode(123.0), 13);
        assert_eq!(codec.decode(13), 130.0);
    }

    #[test]
    fn test_decode() {
        let codec = PrecisionCodec::new(2);
        assert!((codec.decode(1235) - 12.35).abs() < 1e-9);
    }

    #[test]
    fn test_value_carries_both_forms() {
        let value = PrecisionCodec::new(1).value(2.04);
        assert_eq!(value.encoded, 21);
        assert_eq!(value.raw, 2.04);
        assert!((value.decoded() - 2.1).abs() < 1e-9);
    }

    #[test]
    fn test_cache_returns_equal_codecs() {
        let mut cache = CodecCache::new();
        let a = cache.get(3);
        let b = cache.get(3);
        assert_eq!(a, b);
        assert_eq!(a, PrecisionCodec::new(3));
        assert_eq!(cache.len(), 1);
        cache.get(0);
        assert_eq!(cache.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_encode_is_tight_ceiling(value in 0.0f64..10_000.0, precision in 0i32..6) {
            let codec = PrecisionCodec::new(precision);
            let scaled = value * 10f64.powi(precision);
            let encoded = codec.encode(value) as f64;
            prop_assert!(encoded >= scaled);
            prop_assert!(encoded - 1.0 < scaled);
        }

        #[test]
        fn prop_encode_is_monotonic(a in 0.0f64..1_000.0, b in 0.0f64..1_000.0, precision in 0i32..5) {
            let codec = PrecisionCodec::new(precision);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(codec.encode(lo) <= codec.encode(hi));
        }

        #[test]
        fn prop_decode_bounded_above(value in 0.0f64..1_000.0, precision in 0i32..5) {
            let codec = PrecisionCodec::new(precision);
            let decoded = codec.decode(codec.encode(value));
            let step = 10f64.powi(-precision);
            prop_assert!(decoded + 1e-9 >= value);
            prop_assert!(decoded <= value + step + 1e-9);
        }
    }
}
