//! Anomaly classifier (C10). Invoked only when the model scorer flags a
//! reading; assigns one of the four closed-set kinds by a fixed priority
//! order that must not be reordered.

use tracing::info;

use crate::domain::{AnomalyKind, Reading};
use crate::windows::WindowSummary;

/// 10-minute window entries below this count are treated as "not yet
/// warm" and fall back to the startup default (§4.10, rule 5).
const WARM_WINDOW_MIN_ENTRIES: usize = 6;
const SPIKE_HR_DELTA: f64 = 20.0;
const DROP_SPO2_DELTA: f64 = 5.0;
const MULTI_SIGNAL_SCORE_THRESHOLD: f64 = 0.2;

#[derive(Debug, Clone, Copy)]
pub struct Classification {
    pub kind: AnomalyKind,
    pub score: f64,
}

/// Priority, evaluated top to bottom:
/// 1. 10m window warm (>= 6 entries) and `|hr - avg_hr_10m| > 20` -> spike.
/// 2. `|spo2 - avg_spo2_10m| > 5` -> drop.
/// 3. `score > 0.2` -> multi-signal.
/// 4. otherwise -> drift.
/// 5. 10m window not yet warm (<= 5 entries) -> spike (startup default),
///    overriding the above.
pub fn classify(reading: &Reading, window_10m: &WindowSummary, score: f64) -> Classification {
    let kind = if window_10m.count < WARM_WINDOW_MIN_ENTRIES {
        AnomalyKind::Spike
    } else if (reading.hr as f64 - window_10m.avg_hr).abs() > SPIKE_HR_DELTA {
        AnomalyKind::Spike
    } else if (reading.spo2 as f64 - window_10m.avg_spo2).abs() > DROP_SPO2_DELTA {
        AnomalyKind::Drop
    } else if score > MULTI_SIGNAL_SCORE_THRESHOLD {
        AnomalyKind::MultiSignal
    } else {
        AnomalyKind::Drift
    };

    info!(
        "ANOMALY_DETECTED patient_id={} type={} score={} timestamp={}",
        reading.patient_id,
        kind.as_str(),
        score,
        reading.timestamp.to_rfc3339()
    );

    Classification { kind, score }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(hr: i32, spo2: i32) -> Reading {
        Reading::from_validated_parts("pt-1".into(), Utc::now(), hr, 120, 80, spo2, 16, 36.8)
    }

    fn warm_window(avg_hr: f64, avg_spo2: f64) -> WindowSummary {
        WindowSummary {
            count: 10,
            avg_hr,
            avg_spo2,
            avg_temp: 37.0,
            end_time: Some(Utc::now()),
        }
    }

    fn cold_window(count: usize) -> WindowSummary {
        WindowSummary {
            count,
            avg_hr: 0.0,
            avg_spo2: 0.0,
            avg_temp: 0.0,
            end_time: None,
        }
    }

    #[test]
    fn cold_window_defaults_to_spike() {
        let c = classify(&reading(72, 98), &cold_window(5), 0.9);
        assert_eq!(c.kind, AnomalyKind::Spike);
    }

    #[test]
    fn warm_window_large_hr_delta_is_spike() {
        let c = classify(&reading(150, 97), &warm_window(90.0, 97.0), 0.9);
        assert_eq!(c.kind, AnomalyKind::Spike);
    }

    #[test]
    fn warm_window_spo2_delta_is_drop_when_hr_stable() {
        let c = classify(&reading(92, 85), &warm_window(90.0, 97.0), 0.9);
        assert_eq!(c.kind, AnomalyKind::Drop);
    }

    #[test]
    fn high_score_with_no_delta_is_multi_signal() {
        let c = classify(&reading(91, 97), &warm_window(90.0, 97.0), 0.5);
        assert_eq!(c.kind, AnomalyKind::MultiSignal);
    }

    #[test]
    fn low_score_with_no_delta_is_drift() {
        let c = classify(&reading(91, 97), &warm_window(90.0, 97.0), 0.1);
        assert_eq!(c.kind, AnomalyKind::Drift);
    }

    #[test]
    fn hr_delta_takes_priority_over_spo2_delta() {
        let c = classify(&reading(150, 85), &warm_window(90.0, 97.0), 0.9);
        assert_eq!(c.kind, AnomalyKind::Spike);
    }
}
