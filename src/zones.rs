use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::{Result, ValidationError};
use crate::models::{
    pace_speed_convert, ElitePaces, IntensityUnit, LactateTest, ThresholdResult, TrainingZone,
    ZoneSource, ZoneTable,
};
use crate::threshold::interpolate_heart_rate;

/// Zone names, Z1 to Z5
pub const ZONE_NAMES: [&str; 5] = ["Recovery", "Endurance", "Tempo", "Threshold", "VO2max"];

/// Power zone boundaries as fractions of threshold power
///
/// - Z1: < 55% (Active Recovery)
/// - Z2: 55-75% (Endurance)
/// - Z3: 75-90% (Tempo)
/// - Z4: 90-105% (Lactate Threshold)
/// - Z5: 105-130% (VO2 Max)
pub const POWER_BOUNDARIES: [f64; 6] = [0.0, 0.55, 0.75, 0.90, 1.05, 1.30];

/// Speed zone boundaries as fractions of threshold speed
///
/// - Z1: < 78% (Active Recovery)
/// - Z2: 78-88% (Endurance)
/// - Z3: 88-95% (Tempo)
/// - Z4: 95-102% (Lactate Threshold)
/// - Z5: 102-110% (VO2 Max)
pub const SPEED_BOUNDARIES: [f64; 6] = [0.0, 0.78, 0.88, 0.95, 1.02, 1.10];

/// Accepted aerobic/anaerobic threshold ratio for using LT1 as the Z2/Z3 boundary
const AEROBIC_RATIO_RANGE: (f64, f64) = (0.6, 0.95);

/// Accepted elite reference paces, min/km
const ELITE_PACE_RANGE: (f64, f64) = (2.0, 12.0);

/// Zone calculation utilities
pub struct ZoneCalculator;

impl ZoneCalculator {
    /// Five-zone table anchored on the anaerobic threshold.
    ///
    /// When an aerobic threshold is supplied and sits at a plausible fraction of
    /// the anaerobic one, it replaces the default Z2/Z3 boundary. Heart-rate
    /// bands are interpolated from the test stages when a test is given.
    pub fn from_thresholds(
        anaerobic: &ThresholdResult,
        aerobic: Option<&ThresholdResult>,
        test: Option<&LactateTest>,
    ) -> Result<ZoneTable> {
        Self::validate_threshold(anaerobic.intensity, "threshold intensity")?;

        let unit = anaerobic.unit.effort_unit();
        let fractions = match unit {
            IntensityUnit::Power => POWER_BOUNDARIES,
            _ => SPEED_BOUNDARIES,
        };
        let mut bounds: Vec<f64> = fractions
            .iter()
            .map(|f| Self::calculate_percentage(anaerobic.intensity, *f))
            .collect();

        if let Some(lt1) = aerobic {
            let ratio = lt1.intensity / anaerobic.intensity;
            let (min_ratio, max_ratio) = AEROBIC_RATIO_RANGE;
            if ratio >= min_ratio
                && ratio <= max_ratio
                && lt1.intensity > bounds[1]
                && lt1.intensity < bounds[3]
            {
                debug!(aerobic = lt1.intensity, ratio, "aerobic threshold sets Z2/Z3 boundary");
                bounds[2] = lt1.intensity;
            } else {
                debug!(aerobic = lt1.intensity, ratio, "aerobic threshold ignored for zone bounds");
            }
        }

        let stage_hr = test.map(|t| (t.effort_intensities(), t.heart_rate.clone()));
        let threshold_hr = if anaerobic.heart_rate > 0.0 {
            Some(anaerobic.heart_rate.round() as u16)
        } else {
            None
        };

        let table = Self::build_table(
            ZoneSource::LactateTest,
            unit,
            anaerobic.intensity,
            threshold_hr,
            &bounds,
            stage_hr.as_ref().map(|(x, hr)| (x.as_slice(), hr.as_slice())),
        );
        info!(
            threshold = anaerobic.intensity,
            unit = unit.symbol(),
            "zones derived from lactate test"
        );
        Ok(table)
    }

    /// Check elite reference paces and return them as floats
    /// `[easy, marathon, threshold, interval, repetition]`
    pub fn validate_elite_paces(
        paces: &ElitePaces,
    ) -> std::result::Result<[f64; 5], ValidationError> {
        let fields = [
            ("easy", &paces.easy),
            ("marathon", &paces.marathon),
            ("threshold", &paces.threshold),
            ("interval", &paces.interval),
            ("repetition", &paces.repetition),
        ];

        let mut values = [0.0; 5];
        for (i, (name, pace)) in fields.iter().enumerate() {
            let pace = pace.ok_or_else(|| ValidationError::InvalidParameter {
                parameter: format!("elite_paces.{}", name),
                value: "missing".to_string(),
                reason: "every reference pace is required".to_string(),
            })?;
            let value = Self::validate_pace(pace, name)?;
            values[i] = value;
        }

        if let Some(i) = (1..values.len()).find(|&i| values[i] >= values[i - 1]) {
            return Err(ValidationError::InvalidParameter {
                parameter: format!("elite_paces.{}", fields[i].0),
                value: values[i].to_string(),
                reason: format!("must be faster than the {} pace", fields[i - 1].0),
            });
        }
        Ok(values)
    }

    /// Zone table from elite reference paces. The bands are expressed as speed.
    pub fn from_elite_paces(paces: &ElitePaces, test: Option<&LactateTest>) -> Result<ZoneTable> {
        let [easy, marathon, threshold, interval, repetition] = Self::validate_elite_paces(paces)?;
        let s_easy = pace_speed_convert(easy);
        let s_marathon = pace_speed_convert(marathon);
        let s_threshold = pace_speed_convert(threshold);
        let s_interval = pace_speed_convert(interval);
        let s_repetition = pace_speed_convert(repetition);

        let bounds = [
            0.85 * s_easy,
            s_easy,
            s_marathon,
            s_marathon.max(0.97 * s_threshold),
            (s_threshold + s_interval) / 2.0,
            s_repetition,
        ];

        // HR bands only make sense when the test was run on foot
        let stage_hr = test
            .filter(|t| t.unit.effort_unit() == IntensityUnit::Speed)
            .map(|t| (t.effort_intensities(), t.heart_rate.clone()));
        let threshold_hr = stage_hr
            .as_ref()
            .map(|(x, hr)| interpolate_heart_rate(x, hr, s_threshold).round() as u16);

        info!(threshold_speed = s_threshold, "zones derived from elite reference paces");
        Ok(Self::build_table(
            ZoneSource::EliteReference,
            IntensityUnit::Speed,
            s_threshold,
            threshold_hr,
            &bounds,
            stage_hr.as_ref().map(|(x, hr)| (x.as_slice(), hr.as_slice())),
        ))
    }

    /// Pick the zone table for an athlete: valid elite paces supersede test zones
    pub fn resolve(
        test_zones: Option<ZoneTable>,
        elite: Option<&ElitePaces>,
        test: Option<&LactateTest>,
    ) -> (Option<ZoneTable>, Option<String>) {
        match elite.map(|paces| Self::from_elite_paces(paces, test)) {
            Some(Ok(table)) => (Some(table), None),
            Some(Err(e)) => {
                warn!(error = %e, "elite reference paces rejected");
                (
                    test_zones,
                    Some(format!("Elite reference paces ignored: {}", e)),
                )
            }
            None => (test_zones, None),
        }
    }

    fn build_table(
        source: ZoneSource,
        unit: IntensityUnit,
        threshold_intensity: f64,
        threshold_heart_rate: Option<u16>,
        bounds: &[f64],
        stages: Option<(&[f64], &[f64])>,
    ) -> ZoneTable {
        let hr_at = |effort: f64| {
            stages.map(|(x, hr)| interpolate_heart_rate(x, hr, effort).round() as u16)
        };

        let zones = bounds
            .windows(2)
            .enumerate()
            .map(|(i, w)| TrainingZone {
                number: i as u8 + 1,
                name: ZONE_NAMES[i].to_string(),
                low: w[0],
                high: w[1],
                hr_low: if i == 0 { None } else { hr_at(w[0]) },
                hr_high: hr_at(w[1]),
            })
            .collect();

        ZoneTable {
            source,
            unit,
            threshold_intensity,
            threshold_heart_rate,
            zones,
        }
    }

    /// Calculate a fraction of a threshold value
    fn calculate_percentage(value: f64, fraction: f64) -> f64 {
        value * fraction
    }

    fn validate_threshold(value: f64, field_name: &str) -> Result<()> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ValidationError::InvalidParameter {
                parameter: field_name.to_string(),
                value: value.to_string(),
                reason: "must be positive".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn validate_pace(pace: Decimal, name: &str) -> std::result::Result<f64, ValidationError> {
        let value = pace.to_f64().unwrap_or(0.0);
        let (min, max) = ELITE_PACE_RANGE;
        if value <= 0.0 || value < min || value > max {
            return Err(ValidationError::InvalidParameter {
                parameter: format!("elite_paces.{}", name),
                value: pace.to_string(),
                reason: format!("pace must be within {}-{} min/km", min, max),
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlannerError;
    use crate::models::{Confidence, ThresholdMethod};
    use rust_decimal_macros::dec;

    fn threshold(intensity: f64, heart_rate: f64, unit: IntensityUnit) -> ThresholdResult {
        ThresholdResult {
            intensity,
            lactate: 3.0,
            heart_rate,
            unit,
            method: ThresholdMethod::ModDmax,
            r_squared: 0.99,
            confidence: Confidence::High,
            warning: None,
            coefficients: [0.0; 4],
            distance: 1.0,
        }
    }

    fn cycling_test() -> LactateTest {
        LactateTest::new(
            vec![100.0, 130.0, 160.0, 190.0, 220.0, 250.0],
            vec![1.5, 1.8, 2.2, 3.0, 4.9, 12.5],
            vec![125.0, 137.0, 149.0, 161.0, 174.0, 186.0],
            IntensityUnit::Power,
        )
    }

    fn elite_paces() -> ElitePaces {
        ElitePaces {
            easy: Some(dec!(4.50)),
            marathon: Some(dec!(3.40)),
            threshold: Some(dec!(3.20)),
            interval: Some(dec!(3.00)),
            repetition: Some(dec!(2.80)),
        }
    }

    #[test]
    fn test_power_zones_from_threshold() {
        let table =
            ZoneCalculator::from_thresholds(&threshold(200.0, 165.0, IntensityUnit::Power), None, None)
                .unwrap();
        assert_eq!(table.zones.len(), 5);
        assert_eq!(table.source, ZoneSource::LactateTest);
        assert!((table.zones[0].high - 110.0).abs() < 1e-9);
        assert!((table.zones[1].high - 150.0).abs() < 1e-9);
        assert!((table.zones[3].high - 210.0).abs() < 1e-9);
        assert!((table.zones[4].high - 260.0).abs() < 1e-9);
        assert_eq!(table.threshold_heart_rate, Some(165));
        assert!(table.zones.iter().all(|z| z.hr_high.is_none()));
    }

    #[test]
    fn test_speed_zones_from_threshold() {
        let table =
            ZoneCalculator::from_thresholds(&threshold(15.0, 170.0, IntensityUnit::Speed), None, None)
                .unwrap();
        assert_eq!(table.unit, IntensityUnit::Speed);
        assert!((table.zones[3].low - 14.25).abs() < 1e-9);
        assert!((table.zones[3].high - 15.3).abs() < 1e-9);
        assert!(table.pace_range(4).is_some());
    }

    #[test]
    fn test_zones_are_contiguous_and_increasing() {
        let table =
            ZoneCalculator::from_thresholds(&threshold(200.0, 165.0, IntensityUnit::Power), None, None)
                .unwrap();
        for pair in table.zones.windows(2) {
            assert_eq!(pair[0].high, pair[1].low);
            assert!(pair[0].low < pair[0].high);
        }
    }

    #[test]
    fn test_aerobic_threshold_sets_z2_z3_boundary() {
        let lt2 = threshold(199.0, 165.0, IntensityUnit::Power);
        let lt1 = threshold(145.0, 143.0, IntensityUnit::Power);
        let table = ZoneCalculator::from_thresholds(&lt2, Some(&lt1), Some(&cycling_test())).unwrap();
        assert_eq!(table.zones[1].high, 145.0);
        assert_eq!(table.zones[2].low, 145.0);
        assert_eq!(table.zones[1].hr_high, Some(143));
    }

    #[test]
    fn test_implausible_aerobic_threshold_ignored() {
        let lt2 = threshold(200.0, 165.0, IntensityUnit::Power);
        let lt1 = threshold(100.0, 125.0, IntensityUnit::Power);
        let table = ZoneCalculator::from_thresholds(&lt2, Some(&lt1), None).unwrap();
        assert!((table.zones[1].high - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_heart_rate_bands_from_stages() {
        let table = ZoneCalculator::from_thresholds(
            &threshold(200.0, 165.0, IntensityUnit::Power),
            None,
            Some(&cycling_test()),
        )
        .unwrap();
        assert_eq!(table.zones[0].hr_low, None);
        // 110 W sits between 100 W (125 bpm) and 130 W (137 bpm)
        assert_eq!(table.zones[0].hr_high, Some(129));
        // Z5 top is above the last stage
        assert_eq!(table.zones[4].hr_high, Some(186));
    }

    #[test]
    fn test_invalid_threshold() {
        let err = ZoneCalculator::from_thresholds(&threshold(0.0, 150.0, IntensityUnit::Power), None, None)
            .unwrap_err();
        assert!(matches!(err, PlannerError::Validation(_)));
    }

    #[test]
    fn test_elite_zones() {
        let table = ZoneCalculator::from_elite_paces(&elite_paces(), None).unwrap();
        assert_eq!(table.source, ZoneSource::EliteReference);
        assert_eq!(table.unit, IntensityUnit::Speed);
        assert!((table.threshold_intensity - 18.75).abs() < 1e-9);
        // Z4 spans 0.97 × threshold speed to the threshold/interval midpoint
        assert!((table.zones[3].low - 18.1875).abs() < 1e-9);
        assert!((table.zones[3].high - 19.375).abs() < 1e-9);
        assert!((table.zones[4].high - 60.0 / 2.8).abs() < 1e-9);
    }

    #[test]
    fn test_elite_paces_must_be_complete() {
        let paces = ElitePaces {
            interval: None,
            ..elite_paces()
        };
        assert!(ZoneCalculator::validate_elite_paces(&paces).is_err());
    }

    #[test]
    fn test_elite_paces_must_be_ordered() {
        let paces = ElitePaces {
            threshold: Some(dec!(3.50)),
            ..elite_paces()
        };
        let err = ZoneCalculator::validate_elite_paces(&paces).unwrap_err();
        assert!(err.to_string().contains("threshold"));
    }

    #[test]
    fn test_elite_paces_range() {
        let paces = ElitePaces {
            easy: Some(dec!(12.5)),
            ..elite_paces()
        };
        assert!(ZoneCalculator::validate_elite_paces(&paces).is_err());
    }

    #[test]
    fn test_resolve_prefers_elite() {
        let test_zones =
            ZoneCalculator::from_thresholds(&threshold(15.0, 170.0, IntensityUnit::Speed), None, None)
                .unwrap();
        let (table, note) = ZoneCalculator::resolve(Some(test_zones.clone()), Some(&elite_paces()), None);
        assert_eq!(table.unwrap().source, ZoneSource::EliteReference);
        assert!(note.is_none());

        let bad = ElitePaces::default();
        let (table, note) = ZoneCalculator::resolve(Some(test_zones.clone()), Some(&bad), None);
        assert_eq!(table, Some(test_zones));
        assert!(note.is_some());
    }
}
