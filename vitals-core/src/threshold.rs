//! Threshold detector (C8): deterministic clinical bounds, independent of
//! the learned scorer. Used to measure detection lead time against C9;
//! never persisted to the anomaly table.

use tracing::info;

use crate::domain::Reading;

const HR_HIGH: i32 = 140;
const SPO2_LOW: i32 = 90;

#[derive(Debug, Clone, Copy)]
pub struct ThresholdCrossing {
    pub metric: &'static str,
    pub value: f64,
}

/// Fires a crossing for every violated bound. A single reading can cross
/// more than one threshold.
pub fn check(reading: &Reading) -> Vec<ThresholdCrossing> {
    let mut crossings = Vec::new();
    if reading.hr > HR_HIGH {
        crossings.push(ThresholdCrossing {
            metric: "hr",
            value: reading.hr as f64,
        });
    }
    if reading.spo2 < SPO2_LOW {
        crossings.push(ThresholdCrossing {
            metric: "spo2",
            value: reading.spo2 as f64,
        });
    }
    crossings
}

/// Emits one `THRESHOLD_CROSSED` log line per crossing, matching the
/// key=value format in §6.
pub fn log_crossings(reading: &Reading, crossings: &[ThresholdCrossing]) {
    for c in crossings {
        info!(
            "THRESHOLD_CROSSED patient_id={} metric={} value={} timestamp={}",
            reading.patient_id,
            c.metric,
            c.value,
            reading.timestamp.to_rfc3339()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(hr: i32, spo2: i32) -> Reading {
        Reading::from_validated_parts("pt-1".into(), Utc::now(), hr, 120, 80, spo2, 16, 36.8)
    }

    #[test]
    fn no_crossing_for_normal_reading() {
        assert!(check(&reading(72, 98)).is_empty());
    }

    #[test]
    fn hr_crossing_fires_above_140() {
        let crossings = check(&reading(141, 98));
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].metric, "hr");
    }

    #[test]
    fn spo2_crossing_fires_below_90() {
        let crossings = check(&reading(72, 89));
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].metric, "spo2");
    }

    #[test]
    fn both_can_fire_together() {
        let crossings = check(&reading(180, 85));
        assert_eq!(crossings.len(), 2);
    }

    #[test]
    fn boundary_values_do_not_fire() {
        assert!(check(&reading(140, 90)).is_empty());
    }
}
