//! Relationship weighting policy.
//!
//! Weightings are stored as raw integers clamped to `0..=100`. The named
//! buckets below are derived from the stored value whenever a weighting is
//! shown and are never persisted.

use serde::{Deserialize, Serialize};

/// Lowest storable weighting.
pub const MIN_WEIGHTING: i32 = 0;

/// Highest storable weighting.
pub const MAX_WEIGHTING: i32 = 100;

/// Named weighting bucket, ordered by ascending threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bucket {
    /// Relationship is denied.
    Deny,
    /// Relationship is doubted.
    Doubt,
    /// No opinion either way.
    None,
    /// Weakly asserted.
    Weak,
    /// Moderately asserted.
    Mid,
    /// Strongly asserted.
    Strong,
}

impl Bucket {
    /// Every bucket in ascending threshold order.
    pub const ALL: [Self; 6] = [
        Self::Deny,
        Self::Doubt,
        Self::None,
        Self::Weak,
        Self::Mid,
        Self::Strong,
    ];

    /// The threshold value a bucket stands for.
    #[must_use]
    pub const fn threshold(self) -> i32 {
        match self {
            Self::Deny => -100,
            Self::Doubt => -50,
            Self::None => 0,
            Self::Weak => 33,
            Self::Mid => 66,
            Self::Strong => 100,
        }
    }

    /// Display name of the bucket.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deny => "Deny",
            Self::Doubt => "Doubt",
            Self::None => "None",
            Self::Weak => "Weak",
            Self::Mid => "Mid",
            Self::Strong => "Strong",
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a raw weighting.
///
/// Returns the first bucket, scanning upward, whose threshold is at least
/// `raw`. Anything above the top threshold falls back to [`Bucket::None`].
#[must_use]
pub fn bucket(raw: i32) -> Bucket {
    Bucket::ALL
        .into_iter()
        .find(|b| raw <= b.threshold())
        .unwrap_or(Bucket::None)
}

/// Clamp a raw weighting into the storable range.
#[must_use]
pub const fn normalize(raw: i32) -> i32 {
    if raw < MIN_WEIGHTING {
        MIN_WEIGHTING
    } else if raw > MAX_WEIGHTING {
        MAX_WEIGHTING
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_thresholds() {
        for b in Bucket::ALL {
            assert_eq!(bucket(b.threshold()), b);
        }
    }

    #[test]
    fn test_rounds_up_to_next_threshold() {
        assert_eq!(bucket(1), Bucket::Weak);
        assert_eq!(bucket(34), Bucket::Mid);
        assert_eq!(bucket(80), Bucket::Strong);
        assert_eq!(bucket(-75), Bucket::Doubt);
        assert_eq!(bucket(-500), Bucket::Deny);
    }

    #[test]
    fn test_above_top_falls_back_to_none() {
        assert_eq!(bucket(101), Bucket::None);
        assert_eq!(bucket(i32::MAX), Bucket::None);
    }

    #[test]
    fn test_normalize_clamps() {
        assert_eq!(normalize(-20), 0);
        assert_eq!(normalize(0), 0);
        assert_eq!(normalize(55), 55);
        assert_eq!(normalize(100), 100);
        assert_eq!(normalize(250), 100);
        assert_eq!(normalize(i32::MIN), 0);
    }

    #[test]
    fn test_normalized_buckets_are_monotonic() {
        let mut previous = bucket(normalize(-300));
        for w in -300..=300 {
            let stored = normalize(w);
            assert!((MIN_WEIGHTING..=MAX_WEIGHTING).contains(&stored));
            let current = bucket(stored);
            assert!(current >= previous, "bucket decreased at {w}");
            previous = current;
        }
    }
}
