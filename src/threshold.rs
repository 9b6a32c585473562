//! Lactate threshold detection (D-max and Modified D-max)
//!
//! D-max fits a cubic to the lactate curve and picks the point furthest from
//! the straight line joining the first and last stage. Modified D-max bounds
//! that point to a plausible lactate range and otherwise falls back to the
//! fixed 2.0 mmol/L crossing. Poor curve fits fall back to the 4.0 mmol/L
//! crossing. Degraded paths attach a warning rather than failing.

use tracing::{debug, info, warn};

use crate::curve_fit::{fit_cubic, CubicFit};
use crate::error::{Result, ValidationError};
use crate::models::{Confidence, LactateTest, ThresholdMethod, ThresholdResult};
use crate::threshold_policy::ThresholdPolicy;

/// Validated test data in effort space
#[derive(Debug, Clone)]
struct Stages<'a> {
    effort: Vec<f64>,
    lactate: &'a [f64],
    heart_rate: &'a [f64],
}

impl Stages<'_> {
    fn first(&self) -> (f64, f64) {
        (self.effort[0], self.lactate[0])
    }

    fn last(&self) -> (f64, f64) {
        let n = self.effort.len() - 1;
        (self.effort[n], self.lactate[n])
    }

    fn lactate_range(&self) -> f64 {
        let (min, max) = self
            .lactate
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        max - min
    }
}

/// A located crossing of a fixed lactate concentration
#[derive(Debug, Clone, Copy, PartialEq)]
struct Crossing {
    intensity: f64,
    lactate: f64,
    heart_rate: f64,
    /// False when no stage pair brackets the target and the closest stage was used
    exact: bool,
}

/// Threshold detector parameterised by a [`ThresholdPolicy`]
#[derive(Debug, Clone, Default)]
pub struct ThresholdDetector {
    policy: ThresholdPolicy,
}

impl ThresholdDetector {
    pub fn new(policy: ThresholdPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ThresholdPolicy {
        &self.policy
    }

    /// Check stage data before any computation
    pub fn validate(&self, test: &LactateTest) -> std::result::Result<(), ValidationError> {
        self.stages(test).map(|_| ())
    }

    fn stages<'a>(&self, test: &'a LactateTest) -> std::result::Result<Stages<'a>, ValidationError> {
        let (n_int, n_lac, n_hr) = (
            test.intensity.len(),
            test.lactate.len(),
            test.heart_rate.len(),
        );
        if n_int != n_lac || n_int != n_hr {
            return Err(ValidationError::MismatchedLengths {
                intensity: n_int,
                lactate: n_lac,
                heart_rate: n_hr,
            });
        }
        if n_int < self.policy.min_stages {
            return Err(ValidationError::TooFewStages {
                found: n_int,
                required: self.policy.min_stages,
            });
        }

        for (stage, &value) in test.intensity.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid("intensity", stage, value));
            }
        }
        for (stage, &value) in test.lactate.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid("lactate", stage, value));
            }
        }
        for (stage, &value) in test.heart_rate.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid("heart_rate", stage, value));
            }
        }

        let effort = test.effort_intensities();
        if let Some(stage) = (1..effort.len()).find(|&i| effort[i] <= effort[i - 1]) {
            return Err(ValidationError::NonIncreasingIntensity { stage });
        }

        Ok(Stages {
            effort,
            lactate: &test.lactate,
            heart_rate: &test.heart_rate,
        })
    }

    /// Warning text when lactate drops more often than the policy tolerates
    fn monotonicity_warning(&self, stages: &Stages<'_>) -> Option<String> {
        let drops = stages
            .lactate
            .windows(2)
            .filter(|w| w[0] - w[1] > self.policy.monotonic_drop_tolerance)
            .count();
        if drops > self.policy.monotonic_drops_allowed {
            warn!(drops, "lactate curve is not monotonic");
            Some(format!(
                "Lactate decreased by more than {:.1} mmol/L between {} pairs of stages; check sample handling",
                self.policy.monotonic_drop_tolerance, drops
            ))
        } else {
            None
        }
    }

    /// D-max threshold, falling back to the fixed crossing when the fit is poor
    pub fn detect_dmax(&self, test: &LactateTest) -> Result<ThresholdResult> {
        let stages = self.stages(test)?;
        let monotonic_warning = self.monotonicity_warning(&stages);
        let fit = fit_cubic(&stages.effort, stages.lactate)?;

        if fit.r_squared < self.policy.r_squared_fallback {
            return Ok(self.fallback(test, &stages, &fit, monotonic_warning));
        }

        let (x_first, y_first) = stages.first();
        let (x_last, y_last) = stages.last();
        let slope = (y_last - y_first) / (x_last - x_first);
        let norm = (1.0 + slope * slope).sqrt();

        let samples = self.policy.sample_count;
        let mut best_x = (x_first + x_last) / 2.0;
        let mut best_distance = f64::NEG_INFINITY;
        for i in 1..samples {
            let x = x_first + (x_last - x_first) * i as f64 / samples as f64;
            let baseline = y_first + slope * (x - x_first);
            let distance = (fit.evaluate(x) - baseline).abs() / norm;
            if distance > best_distance {
                best_distance = distance;
                best_x = x;
            }
        }
        let distance = best_distance.max(0.0);

        let range = stages.lactate_range();
        let relative_distance = if range > 0.0 { distance / range } else { 0.0 };
        let confidence = self
            .policy
            .classify_confidence(fit.r_squared, relative_distance);

        debug!(
            intensity = best_x,
            distance,
            relative_distance,
            "D-max sample with maximal distance"
        );

        let result = ThresholdResult {
            intensity: best_x,
            lactate: fit.evaluate(best_x),
            heart_rate: interpolate_heart_rate(&stages.effort, stages.heart_rate, best_x),
            unit: test.unit.effort_unit(),
            method: ThresholdMethod::Dmax,
            r_squared: fit.r_squared,
            confidence,
            warning: monotonic_warning,
            coefficients: fit.coefficients,
            distance,
        };

        info!(
            intensity = result.intensity,
            lactate = result.lactate,
            heart_rate = result.heart_rate,
            confidence = %result.confidence,
            "D-max threshold detected"
        );
        Ok(result)
    }

    fn fallback(
        &self,
        test: &LactateTest,
        stages: &Stages<'_>,
        fit: &CubicFit,
        monotonic_warning: Option<String>,
    ) -> ThresholdResult {
        let target = self.policy.fallback_lactate;
        let crossing = find_crossing(stages, target);

        let mut message = if crossing.exact {
            format!(
                "Curve fit R² {:.2} is below {:.2}; threshold taken at the {:.1} mmol/L crossing",
                fit.r_squared, self.policy.r_squared_fallback, target
            )
        } else {
            format!(
                "Curve fit R² {:.2} is below {:.2} and lactate never crosses {:.1} mmol/L; using the closest stage ({:.2} mmol/L)",
                fit.r_squared, self.policy.r_squared_fallback, target, crossing.lactate
            )
        };
        if let Some(extra) = monotonic_warning {
            message.push_str("; ");
            message.push_str(&extra);
        }

        warn!(
            r_squared = fit.r_squared,
            intensity = crossing.intensity,
            "poor lactate curve fit, using fixed-concentration fallback"
        );

        ThresholdResult {
            intensity: crossing.intensity,
            lactate: crossing.lactate,
            heart_rate: crossing.heart_rate,
            unit: test.unit.effort_unit(),
            method: ThresholdMethod::Fallback,
            r_squared: fit.r_squared,
            confidence: Confidence::Low,
            warning: Some(message),
            coefficients: fit.coefficients,
            distance: 0.0,
        }
    }

    /// Modified D-max: D-max bounded to the plausible lactate band
    pub fn detect_mod_dmax(&self, test: &LactateTest) -> Result<ThresholdResult> {
        let dmax = self.detect_dmax(test)?;
        if dmax.method == ThresholdMethod::Fallback {
            return Ok(self.clamp_to_band(dmax));
        }

        if self.policy.mod_dmax_in_bounds(dmax.lactate) {
            return Ok(ThresholdResult {
                method: ThresholdMethod::ModDmax,
                ..dmax
            });
        }

        let stages = self.stages(test)?;
        let target = self.policy.aerobic_lactate;
        let stage_crossing = find_crossing(&stages, target);
        let fitted_crossing = if stage_crossing.exact {
            None
        } else {
            cubic_crossing(&dmax.coefficients, &stages, target, self.policy.sample_count)
        };

        let (crossing, confidence, detail) = match fitted_crossing {
            _ if stage_crossing.exact => (
                stage_crossing,
                Confidence::Medium,
                format!("using the {:.1} mmol/L crossing", target),
            ),
            Some(fitted) => (
                fitted,
                Confidence::Low,
                format!(
                    "no stage pair brackets {:.1} mmol/L, using the fitted curve crossing",
                    target
                ),
            ),
            None => {
                let bounded = stage_crossing
                    .lactate
                    .clamp(self.policy.mod_dmax_min_lactate, self.policy.mod_dmax_max_lactate);
                let detail = format!(
                    "lactate never reaches {:.1} mmol/L, using the closest stage ({:.2} mmol/L measured, reported as {:.1})",
                    target, stage_crossing.lactate, bounded
                );
                (
                    Crossing {
                        lactate: bounded,
                        ..stage_crossing
                    },
                    Confidence::Low,
                    detail,
                )
            }
        };

        let mut message = format!(
            "D-max lactate {:.2} mmol/L is outside {:.1}-{:.1} mmol/L and was discarded; {}",
            dmax.lactate, self.policy.mod_dmax_min_lactate, self.policy.mod_dmax_max_lactate, detail
        );
        if let Some(extra) = &dmax.warning {
            message.push_str("; ");
            message.push_str(extra);
        }

        warn!(
            discarded_lactate = dmax.lactate,
            intensity = crossing.intensity,
            "Modified D-max out of bounds"
        );

        Ok(ThresholdResult {
            intensity: crossing.intensity,
            lactate: crossing.lactate,
            heart_rate: crossing.heart_rate,
            method: ThresholdMethod::ModDmax,
            confidence,
            warning: Some(message),
            ..dmax
        })
    }

    /// Keep a fallback result inside the Modified D-max lactate band
    fn clamp_to_band(&self, result: ThresholdResult) -> ThresholdResult {
        if self.policy.mod_dmax_in_bounds(result.lactate) {
            return result;
        }
        let bounded = result
            .lactate
            .clamp(self.policy.mod_dmax_min_lactate, self.policy.mod_dmax_max_lactate);
        warn!(
            measured = result.lactate,
            reported = bounded,
            "fallback lactate outside the Modified D-max band"
        );

        let note = format!(
            "closest-stage lactate {:.2} mmol/L reported as {:.1} mmol/L",
            result.lactate, bounded
        );
        let warning = match result.warning {
            Some(existing) => format!("{}; {}", existing, note),
            None => note,
        };
        ThresholdResult {
            lactate: bounded,
            warning: Some(warning),
            ..result
        }
    }

    /// Aerobic threshold at the first 2.0 mmol/L crossing
    pub fn detect_aerobic(&self, test: &LactateTest) -> Result<ThresholdResult> {
        let stages = self.stages(test)?;
        let target = self.policy.aerobic_lactate;
        let crossing = find_crossing(&stages, target);

        let warning = if crossing.exact {
            None
        } else {
            Some(format!(
                "Lactate never crosses {:.1} mmol/L; aerobic threshold taken at the closest stage",
                target
            ))
        };

        Ok(ThresholdResult {
            intensity: crossing.intensity,
            lactate: crossing.lactate,
            heart_rate: crossing.heart_rate,
            unit: test.unit.effort_unit(),
            method: ThresholdMethod::AerobicCrossing,
            r_squared: 0.0,
            confidence: if crossing.exact {
                Confidence::Medium
            } else {
                Confidence::Low
            },
            warning,
            coefficients: [0.0; 4],
            distance: 0.0,
        })
    }
}

fn invalid(field: &str, stage: usize, value: f64) -> ValidationError {
    ValidationError::InvalidMeasurement {
        field: field.to_string(),
        stage,
        value,
    }
}

/// First consecutive pair whose lactate rises through `target`, interpolated
/// linearly; otherwise the stage whose lactate is closest to `target`
fn find_crossing(stages: &Stages<'_>, target: f64) -> Crossing {
    for i in 0..stages.effort.len() - 1 {
        let (lo, hi) = (stages.lactate[i], stages.lactate[i + 1]);
        if lo <= target && target <= hi && hi > lo {
            let fraction = (target - lo) / (hi - lo);
            let intensity = stages.effort[i] + fraction * (stages.effort[i + 1] - stages.effort[i]);
            let heart_rate = stages.heart_rate[i]
                + fraction * (stages.heart_rate[i + 1] - stages.heart_rate[i]);
            return Crossing {
                intensity,
                lactate: target,
                heart_rate,
                exact: true,
            };
        }
    }

    let closest = (0..stages.lactate.len())
        .min_by(|&a, &b| {
            (stages.lactate[a] - target)
                .abs()
                .total_cmp(&(stages.lactate[b] - target).abs())
        })
        .unwrap_or(0);
    Crossing {
        intensity: stages.effort[closest],
        lactate: stages.lactate[closest],
        heart_rate: stages.heart_rate[closest],
        exact: false,
    }
}

/// First rising crossing of `target` on the fitted cubic within the tested range,
/// refined by bisection
fn cubic_crossing(
    coefficients: &[f64; 4],
    stages: &Stages<'_>,
    target: f64,
    samples: usize,
) -> Option<Crossing> {
    let [a, b, c, d] = *coefficients;
    let residual = |x: f64| ((a * x + b) * x + c) * x + d - target;
    let (x_first, _) = stages.first();
    let (x_last, _) = stages.last();
    let samples = samples.max(1);
    let step = (x_last - x_first) / samples as f64;

    let (mut lo, mut hi) = (0..samples)
        .map(|i| (x_first + step * i as f64, x_first + step * (i + 1) as f64))
        .find(|&(x0, x1)| residual(x0) < 0.0 && residual(x1) >= 0.0)?;
    for _ in 0..60 {
        let mid = (lo + hi) / 2.0;
        if residual(mid) < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Some(Crossing {
        intensity: hi,
        lactate: target,
        heart_rate: interpolate_heart_rate(&stages.effort, stages.heart_rate, hi),
        exact: true,
    })
}

/// Heart rate at `x` by linear interpolation between the bracketing stages.
/// Values outside the tested range take the nearest end stage.
pub fn interpolate_heart_rate(intensity: &[f64], heart_rate: &[f64], x: f64) -> f64 {
    let n = intensity.len().min(heart_rate.len());
    if n == 0 {
        return 0.0;
    }
    if x <= intensity[0] {
        return heart_rate[0];
    }
    if x >= intensity[n - 1] {
        return heart_rate[n - 1];
    }
    for i in 0..n - 1 {
        let (x0, x1) = (intensity[i], intensity[i + 1]);
        if x >= x0 && x <= x1 {
            if x1 == x0 {
                return heart_rate[i];
            }
            let fraction = (x - x0) / (x1 - x0);
            return heart_rate[i] + fraction * (heart_rate[i + 1] - heart_rate[i]);
        }
    }
    heart_rate[n - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlannerError;
    use crate::models::IntensityUnit;
    use proptest::prelude::*;

    const WATTS: [f64; 6] = [100.0, 130.0, 160.0, 190.0, 220.0, 250.0];
    const CYCLING_HR: [f64; 6] = [125.0, 137.0, 149.0, 161.0, 174.0, 186.0];

    fn cycling_test(lactate: [f64; 6]) -> LactateTest {
        LactateTest::new(
            WATTS.to_vec(),
            lactate.to_vec(),
            CYCLING_HR.to_vec(),
            IntensityUnit::Power,
        )
    }

    fn detector() -> ThresholdDetector {
        ThresholdDetector::default()
    }

    #[test]
    fn test_dmax_cycling_scenario() {
        let test = cycling_test([1.5, 1.8, 2.2, 3.0, 4.9, 12.5]);
        let result = detector().detect_dmax(&test).unwrap();

        assert_eq!(result.method, ThresholdMethod::Dmax);
        assert!(result.intensity > 195.0 && result.intensity < 215.0, "{}", result.intensity);
        assert!((result.intensity - 199.0).abs() < 1.5);
        assert!((result.lactate - 3.09).abs() < 0.1);
        assert!((result.heart_rate - 164.9).abs() < 1.0);
        assert!(result.r_squared > 0.98);
        assert_eq!(result.confidence, Confidence::High);
        assert!(result.warning.is_none());
        assert_eq!(result.unit, IntensityUnit::Power);
    }

    #[test]
    fn test_mod_dmax_keeps_plausible_dmax() {
        let test = cycling_test([1.5, 1.8, 2.2, 3.0, 4.9, 12.5]);
        let dmax = detector().detect_dmax(&test).unwrap();
        let modified = detector().detect_mod_dmax(&test).unwrap();

        assert_eq!(modified.method, ThresholdMethod::ModDmax);
        assert_eq!(modified.intensity, dmax.intensity);
        assert_eq!(modified.confidence, dmax.confidence);
    }

    #[test]
    fn test_running_speed_test() {
        let test = LactateTest::new(
            vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0],
            vec![1.1, 1.2, 1.5, 2.0, 3.1, 5.0, 8.2],
            vec![130.0, 140.0, 149.0, 158.0, 167.0, 176.0, 184.0],
            IntensityUnit::Speed,
        );
        let result = detector().detect_dmax(&test).unwrap();
        assert!((result.intensity - 13.63).abs() < 0.05);
        assert!((result.lactate - 2.59).abs() < 0.05);
        assert!(result.r_squared > 0.999);
        assert!(result.pace().is_some());
    }

    #[test]
    fn test_pace_test_matches_speed_test() {
        let speeds = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0];
        let lactate = vec![1.1, 1.2, 1.5, 2.0, 3.1, 5.0, 8.2];
        let hr = vec![130.0, 140.0, 149.0, 158.0, 167.0, 176.0, 184.0];
        let paces: Vec<f64> = speeds.iter().map(|s| 60.0 / s).collect();

        let by_speed = detector()
            .detect_dmax(&LactateTest::new(speeds.to_vec(), lactate.clone(), hr.clone(), IntensityUnit::Speed))
            .unwrap();
        let by_pace = detector()
            .detect_dmax(&LactateTest::new(paces, lactate, hr, IntensityUnit::Pace))
            .unwrap();

        assert_eq!(by_pace.unit, IntensityUnit::Speed);
        assert!((by_pace.intensity - by_speed.intensity).abs() < 1e-6);
    }

    #[test]
    fn test_linear_lactate_is_low_confidence() {
        let test = LactateTest::new(
            vec![100.0, 150.0, 200.0, 250.0, 300.0],
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            vec![120.0, 135.0, 150.0, 165.0, 180.0],
            IntensityUnit::Power,
        );
        let result = detector().detect_dmax(&test).unwrap();
        assert!(result.distance < 1e-6);
        assert_eq!(result.confidence, Confidence::Low);
    }

    #[test]
    fn test_poor_fit_uses_fallback_crossing() {
        let test = cycling_test([2.0, 5.0, 1.5, 6.0, 2.0, 7.0]);
        let result = detector().detect_dmax(&test).unwrap();

        assert_eq!(result.method, ThresholdMethod::Fallback);
        assert_eq!(result.confidence, Confidence::Low);
        assert!((result.intensity - 120.0).abs() < 1e-9);
        assert!((result.heart_rate - 133.0).abs() < 1e-9);
        assert_eq!(result.lactate, 4.0);
        let warning = result.warning.unwrap();
        assert!(warning.contains("4.0 mmol/L"));
        assert!(warning.contains("decreased"));
    }

    #[test]
    fn test_mod_dmax_passes_fallback_through() {
        let test = cycling_test([2.0, 5.0, 1.5, 6.0, 2.0, 7.0]);
        let result = detector().detect_mod_dmax(&test).unwrap();
        assert_eq!(result.method, ThresholdMethod::Fallback);
    }

    #[test]
    fn test_mod_dmax_out_of_bounds_uses_two_mmol_crossing() {
        let test = cycling_test([0.8, 0.9, 1.0, 1.2, 2.4, 8.0]);
        let dmax = detector().detect_dmax(&test).unwrap();
        assert!(dmax.lactate < 1.5);

        let result = detector().detect_mod_dmax(&test).unwrap();
        assert_eq!(result.method, ThresholdMethod::ModDmax);
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(result.lactate, 2.0);
        assert!((result.intensity - 210.0).abs() < 1e-9);
        assert!((result.heart_rate - 169.666_666).abs() < 1e-3);
        assert!(result.warning.unwrap().contains("1.26"));
    }

    #[test]
    fn test_mod_dmax_flat_curve_stays_in_band() {
        let test = cycling_test([0.5, 0.6, 0.7, 0.8, 0.9, 1.2]);
        let result = detector().detect_mod_dmax(&test).unwrap();

        assert_eq!(result.method, ThresholdMethod::ModDmax);
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.lactate, 1.5);
        assert_eq!(result.intensity, 250.0);
        assert!(result.warning.unwrap().contains("1.20 mmol/L measured"));
    }

    #[test]
    fn test_mod_dmax_high_baseline_stays_in_band() {
        let test = cycling_test([5.0, 5.5, 6.5, 8.0, 11.0, 16.0]);
        let result = detector().detect_mod_dmax(&test).unwrap();

        assert_eq!(result.method, ThresholdMethod::ModDmax);
        assert_eq!(result.lactate, 4.5);
        assert_eq!(result.intensity, 100.0);
        assert_eq!(result.heart_rate, 125.0);
    }

    #[test]
    fn test_cubic_crossing_solves_fitted_curve() {
        let test = cycling_test([0.5, 0.6, 0.7, 0.8, 0.9, 1.2]);
        let stages = detector().stages(&test).unwrap();
        let crossing = cubic_crossing(&[0.0, 0.0, 0.01, 0.0], &stages, 2.0, 1000).unwrap();

        assert!(crossing.exact);
        assert_eq!(crossing.lactate, 2.0);
        assert!((crossing.intensity - 200.0).abs() < 1e-6);
        assert!((crossing.heart_rate - 165.333_333).abs() < 1e-3);
        assert!(cubic_crossing(&[0.0, 0.0, 0.0, 1.0], &stages, 2.0, 1000).is_none());
    }

    #[test]
    fn test_aerobic_crossing() {
        let test = cycling_test([1.5, 1.8, 2.2, 3.0, 4.9, 12.5]);
        let result = detector().detect_aerobic(&test).unwrap();
        assert_eq!(result.method, ThresholdMethod::AerobicCrossing);
        // between 130 W (1.8) and 160 W (2.2)
        assert!((result.intensity - 145.0).abs() < 1e-9);
        assert!((result.heart_rate - 143.0).abs() < 1e-9);
    }

    #[test]
    fn test_aerobic_without_crossing_uses_closest_stage() {
        let test = cycling_test([2.5, 2.8, 3.2, 4.0, 5.9, 12.5]);
        let result = detector().detect_aerobic(&test).unwrap();
        assert_eq!(result.intensity, 100.0);
        assert_eq!(result.confidence, Confidence::Low);
        assert!(result.warning.is_some());
    }

    #[test]
    fn test_rejects_too_few_stages() {
        let test = LactateTest::new(
            vec![100.0, 150.0, 200.0],
            vec![1.0, 2.0, 4.0],
            vec![120.0, 140.0, 160.0],
            IntensityUnit::Power,
        );
        let err = detector().detect_dmax(&test).unwrap_err();
        assert!(matches!(
            err,
            PlannerError::Validation(ValidationError::TooFewStages { found: 3, required: 4 })
        ));
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let test = LactateTest::new(
            vec![100.0, 150.0, 200.0, 250.0],
            vec![1.0, 2.0, 4.0, 8.0],
            vec![120.0, 140.0, 160.0],
            IntensityUnit::Power,
        );
        assert_eq!(
            detector().validate(&test),
            Err(ValidationError::MismatchedLengths {
                intensity: 4,
                lactate: 4,
                heart_rate: 3
            })
        );
    }

    #[test]
    fn test_rejects_non_increasing_effort() {
        let test = LactateTest::new(
            vec![100.0, 150.0, 150.0, 250.0],
            vec![1.0, 2.0, 4.0, 8.0],
            vec![120.0, 140.0, 160.0, 170.0],
            IntensityUnit::Power,
        );
        assert_eq!(
            detector().validate(&test),
            Err(ValidationError::NonIncreasingIntensity { stage: 2 })
        );

        // Pace must decrease to be harder
        let test = LactateTest::new(
            vec![5.0, 5.5, 4.0, 3.5],
            vec![1.0, 2.0, 4.0, 8.0],
            vec![120.0, 140.0, 160.0, 170.0],
            IntensityUnit::Pace,
        );
        assert_eq!(
            detector().validate(&test),
            Err(ValidationError::NonIncreasingIntensity { stage: 1 })
        );
    }

    #[test]
    fn test_rejects_negative_lactate() {
        let test = LactateTest::new(
            vec![100.0, 150.0, 200.0, 250.0],
            vec![1.0, -2.0, 4.0, 8.0],
            vec![120.0, 140.0, 160.0, 170.0],
            IntensityUnit::Power,
        );
        assert!(matches!(
            detector().validate(&test),
            Err(ValidationError::InvalidMeasurement { stage: 1, .. })
        ));
    }

    #[test]
    fn test_heart_rate_interpolation() {
        let x = [100.0, 200.0, 300.0];
        let hr = [120.0, 150.0, 170.0];
        assert_eq!(interpolate_heart_rate(&x, &hr, 150.0), 135.0);
        assert_eq!(interpolate_heart_rate(&x, &hr, 250.0), 160.0);
        assert_eq!(interpolate_heart_rate(&x, &hr, 50.0), 120.0);
        assert_eq!(interpolate_heart_rate(&x, &hr, 400.0), 170.0);
    }

    fn increasing_lactate() -> impl Strategy<Value = Vec<f64>> {
        (0.5f64..2.0, prop::collection::vec(0.05f64..3.0, 5)).prop_map(|(start, steps)| {
            let mut values = vec![start];
            for step in steps {
                let next = values[values.len() - 1] + step;
                values.push(next);
            }
            values
        })
    }

    proptest! {
        #[test]
        fn prop_dmax_threshold_is_interior(lactate in increasing_lactate()) {
            let test = LactateTest::new(WATTS.to_vec(), lactate, CYCLING_HR.to_vec(), IntensityUnit::Power);
            let result = detector().detect_dmax(&test).unwrap();
            if result.method == ThresholdMethod::Dmax {
                prop_assert!(result.intensity > 100.0 && result.intensity < 250.0);
                prop_assert!(result.heart_rate >= 125.0 && result.heart_rate <= 186.0);
            }
        }

        #[test]
        fn prop_mod_dmax_lactate_bounded(lactate in increasing_lactate()) {
            let test = LactateTest::new(WATTS.to_vec(), lactate, CYCLING_HR.to_vec(), IntensityUnit::Power);
            let result = detector().detect_mod_dmax(&test).unwrap();
            prop_assert!((1.5..=4.5).contains(&result.lactate), "{}", result.lactate);
        }
    }
}
