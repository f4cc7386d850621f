use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, hash::Hash, hash::Hasher};

/// A wrapper around f32 that provides total ordering and proper equality semantics.
///
/// Standard f32 does not implement `Ord` or `Eq` due to NaN values and signed zeros.
/// This wrapper uses bit-level comparison to ensure that any floating-point numbers are
/// compared using a total order, including NaN values and signed zeros.
///
/// Scores and path costs are stored as `TotalF32` so that they can key heaps and sorted
/// vectors. Infinite values are legitimate: an unreachable vertex has infinite cost, and
/// a lower bound that cannot be established is `NEG_INFINITY`.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct TotalF32(pub f32);

impl TotalF32 {
    pub const ZERO: TotalF32 = TotalF32(0.0);
    pub const INFINITY: TotalF32 = TotalF32(f32::INFINITY);
    pub const NEG_INFINITY: TotalF32 = TotalF32(f32::NEG_INFINITY);

    #[inline]
    pub fn get(self) -> f32 {
        self.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl PartialEq for TotalF32 {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for TotalF32 {}

impl PartialOrd for TotalF32 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TotalF32 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f32> for TotalF32 {
    fn from(x: f32) -> Self {
        TotalF32(x)
    }
}

impl Hash for TotalF32 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl fmt::Display for TotalF32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality() {
        assert_eq!(TotalF32(1.0), TotalF32(1.0));
        assert_ne!(TotalF32(1.0), TotalF32(2.0));
        assert_eq!(TotalF32(f32::NAN), TotalF32(f32::NAN));
    }

    #[test]
    fn test_infinities_order_around_finite_scores() {
        assert!(TotalF32::NEG_INFINITY < TotalF32(-1e30));
        assert!(TotalF32(1e30) < TotalF32::INFINITY);
        assert!(!TotalF32::INFINITY.is_finite());
        assert!(TotalF32::ZERO.is_finite());
    }

    #[test]
    fn test_negative_scores_sort_first() {
        let mut values = [TotalF32(0.5), TotalF32(-1.5), TotalF32(0.0), TotalF32(-0.25)];
        values.sort();
        let raw: Vec<f32> = values.iter().map(|v| v.get()).collect();
        assert_eq!(raw, vec![-1.5, -0.25, 0.0, 0.5]);
    }

    #[test]
    fn test_serializes_as_plain_number() {
        let json = serde_json::to_string(&TotalF32(2.5)).unwrap();
        assert_eq!(json, "2.5");
        let back: TotalF32 = serde_json::from_str("-0.75").unwrap();
        assert_eq!(back, TotalF32(-0.75));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", TotalF32(1.5)), "1.5");
    }
}
