//! Numeric cut-offs used by threshold detection
//!
//! Every constant the detector relies on lives here so it can be tuned from
//! the configuration file without touching the algorithm.

use serde::{Deserialize, Serialize};

use crate::models::Confidence;

/// Tunable threshold-detection policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdPolicy {
    /// Fewest test stages accepted
    pub min_stages: usize,
    /// Interior points sampled along the fitted curve
    pub sample_count: usize,
    /// Below this R² the curve is not trusted and the fixed-crossing fallback is used
    pub r_squared_fallback: f64,
    /// R² needed for HIGH confidence
    pub r_squared_high: f64,
    /// Relative curve-to-baseline distance below which confidence is LOW
    pub relative_distance_low: f64,
    /// Relative curve-to-baseline distance needed for HIGH confidence
    pub relative_distance_high: f64,
    /// Stage-to-stage lactate drop (mmol/L) counted as a non-monotonic step
    pub monotonic_drop_tolerance: f64,
    /// Number of such drops tolerated before warning
    pub monotonic_drops_allowed: usize,
    /// Fixed concentration used by the fallback (mmol/L)
    pub fallback_lactate: f64,
    /// Lowest plausible Mod-Dmax lactate (mmol/L)
    pub mod_dmax_min_lactate: f64,
    /// Highest plausible Mod-Dmax lactate (mmol/L)
    pub mod_dmax_max_lactate: f64,
    /// Crossing used when Mod-Dmax is out of bounds, and for the aerobic threshold (mmol/L)
    pub aerobic_lactate: f64,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            min_stages: 4,
            sample_count: 1000,
            r_squared_fallback: 0.90,
            r_squared_high: 0.95,
            relative_distance_low: 0.05,
            relative_distance_high: 0.10,
            monotonic_drop_tolerance: 0.2,
            monotonic_drops_allowed: 1,
            fallback_lactate: 4.0,
            mod_dmax_min_lactate: 1.5,
            mod_dmax_max_lactate: 4.5,
            aerobic_lactate: 2.0,
        }
    }
}

impl ThresholdPolicy {
    /// Confidence for a curve fit of quality `r_squared` whose maximal
    /// distance is `relative_distance` of the lactate range
    pub fn classify_confidence(&self, r_squared: f64, relative_distance: f64) -> Confidence {
        if r_squared < self.r_squared_fallback || relative_distance < self.relative_distance_low {
            Confidence::Low
        } else if r_squared >= self.r_squared_high
            && relative_distance >= self.relative_distance_high
        {
            Confidence::High
        } else {
            Confidence::Medium
        }
    }

    /// Whether a lactate value lies in the Mod-Dmax plausibility band
    pub fn mod_dmax_in_bounds(&self, lactate: f64) -> bool {
        lactate >= self.mod_dmax_min_lactate && lactate <= self.mod_dmax_max_lactate
    }

    /// Sanity-check values loaded from configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.min_stages < crate::curve_fit::MIN_POINTS {
            return Err(format!(
                "min_stages must be at least {}",
                crate::curve_fit::MIN_POINTS
            ));
        }
        if self.sample_count < 2 {
            return Err("sample_count must be at least 2".to_string());
        }
        if !(0.0..=1.0).contains(&self.r_squared_fallback)
            || !(0.0..=1.0).contains(&self.r_squared_high)
            || self.r_squared_high < self.r_squared_fallback
        {
            return Err("R² cut-offs must lie in 0-1 with high >= fallback".to_string());
        }
        if self.relative_distance_high < self.relative_distance_low {
            return Err("relative_distance_high must be >= relative_distance_low".to_string());
        }
        if self.mod_dmax_min_lactate >= self.mod_dmax_max_lactate {
            return Err("Mod-Dmax lactate bounds are inverted".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_classification() {
        let policy = ThresholdPolicy::default();
        assert_eq!(policy.classify_confidence(0.99, 0.5), Confidence::High);
        assert_eq!(policy.classify_confidence(0.95, 0.10), Confidence::High);
        assert_eq!(policy.classify_confidence(0.93, 0.5), Confidence::Medium);
        assert_eq!(policy.classify_confidence(0.99, 0.07), Confidence::Medium);
        assert_eq!(policy.classify_confidence(0.89, 0.5), Confidence::Low);
        assert_eq!(policy.classify_confidence(1.0, 0.0), Confidence::Low);
    }

    #[test]
    fn test_mod_dmax_bounds_are_inclusive() {
        let policy = ThresholdPolicy::default();
        assert!(policy.mod_dmax_in_bounds(1.5));
        assert!(policy.mod_dmax_in_bounds(4.5));
        assert!(!policy.mod_dmax_in_bounds(1.26));
        assert!(!policy.mod_dmax_in_bounds(4.51));
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let policy = ThresholdPolicy {
            mod_dmax_min_lactate: 5.0,
            ..ThresholdPolicy::default()
        };
        assert!(policy.validate().is_err());
        assert!(ThresholdPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let policy: ThresholdPolicy = toml::from_str("r_squared_high = 0.97").unwrap();
        assert_eq!(policy.r_squared_high, 0.97);
        assert_eq!(policy.sample_count, 1000);
    }
}
