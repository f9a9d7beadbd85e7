//! Sliding window set (C7): per-patient, three independent time-windowed
//! aggregators. Never persisted between worker lifetimes — rebuilt
//! implicitly as new readings arrive after a restart (C12).

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};

use crate::domain::Reading;

const SHORT_WINDOW_SECS: i64 = 30;
const MEDIUM_WINDOW_SECS: i64 = 120;
const LONG_WINDOW_SECS: i64 = 600;

/// Aggregate over a window's retained entries, computed on demand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSummary {
    pub count: usize,
    pub avg_hr: f64,
    pub avg_spo2: f64,
    pub avg_temp: f64,
    pub end_time: Option<DateTime<Utc>>,
}

impl WindowSummary {
    fn empty() -> Self {
        Self {
            count: 0,
            avg_hr: 0.0,
            avg_spo2: 0.0,
            avg_temp: 0.0,
            end_time: None,
        }
    }
}

#[derive(Debug)]
struct Window {
    size: Duration,
    entries: VecDeque<(DateTime<Utc>, Reading)>,
}

impl Window {
    fn new(size_secs: i64) -> Self {
        Self {
            size: Duration::seconds(size_secs),
            entries: VecDeque::new(),
        }
    }

    /// Pruning reference is the newest *observed* timestamp, not wall
    /// clock — an out-of-order reading is appended and counted, but a
    /// single future-dated reading evicts all prior data (§4.7). This is
    /// why the ingest 300s skew bound is load-bearing here.
    fn insert(&mut self, reading: Reading) {
        let ts = reading.timestamp;
        self.entries.push_back((ts, reading));
        while let Some((front_ts, _)) = self.entries.front() {
            if ts - *front_ts > self.size {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    fn summary(&self) -> WindowSummary {
        let count = self.entries.len();
        if count == 0 {
            return WindowSummary::empty();
        }

        let mut hr_sum = 0i64;
        let mut spo2_sum = 0i64;
        let mut temp_sum = 0f64;
        for (_, r) in &self.entries {
            hr_sum += r.hr as i64;
            spo2_sum += r.spo2 as i64;
            temp_sum += r.temp;
        }

        WindowSummary {
            count,
            avg_hr: hr_sum as f64 / count as f64,
            avg_spo2: spo2_sum as f64 / count as f64,
            avg_temp: temp_sum / count as f64,
            end_time: self.entries.back().map(|(ts, _)| *ts),
        }
    }
}

#[derive(Debug)]
struct PatientWindows {
    short: Window,
    medium: Window,
    long: Window,
}

impl PatientWindows {
    fn new() -> Self {
        Self {
            short: Window::new(SHORT_WINDOW_SECS),
            medium: Window::new(MEDIUM_WINDOW_SECS),
            long: Window::new(LONG_WINDOW_SECS),
        }
    }

    fn insert(&mut self, reading: Reading) {
        self.short.insert(reading.clone());
        self.medium.insert(reading.clone());
        self.long.insert(reading);
    }
}

/// Summaries for all three windows after an insert, in size order.
#[derive(Debug, Clone, Copy)]
pub struct WindowSnapshot {
    pub window_30s: WindowSummary,
    pub window_2m: WindowSummary,
    pub window_10m: WindowSummary,
}

/// Worker-local map of per-patient window state. Never shared across
/// workers (§5) — this is the primary reason cross-worker anomaly
/// classification is tolerated as an approximation.
#[derive(Debug, Default)]
pub struct WindowStore {
    patients: HashMap<String, PatientWindows>,
}

impl WindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a reading into its patient's three windows and returns the
    /// resulting summaries.
    pub fn insert(&mut self, reading: Reading) -> WindowSnapshot {
        let entry = self
            .patients
            .entry(reading.patient_id.clone())
            .or_insert_with(PatientWindows::new);
        entry.insert(reading);

        WindowSnapshot {
            window_30s: entry.short.summary(),
            window_2m: entry.medium.summary(),
            window_10m: entry.long.summary(),
        }
    }

    pub fn patient_count(&self) -> usize {
        self.patients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading_at(patient_id: &str, secs: i64, hr: i32) -> Reading {
        let ts = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        Reading::from_validated_parts(patient_id.to_string(), ts, hr, 120, 80, 98, 16, 36.8)
    }

    #[test]
    fn prunes_entries_older_than_window_size() {
        let mut store = WindowStore::new();
        store.insert(reading_at("pt-1", 0, 70));
        store.insert(reading_at("pt-1", 10, 71));
        let snap = store.insert(reading_at("pt-1", 31, 72));
        // t=0 is 31s behind t=31, evicted from the 30s window but retained elsewhere.
        assert_eq!(snap.window_30s.count, 2);
        assert_eq!(snap.window_2m.count, 3);
    }

    #[test]
    fn future_dated_reading_evicts_all_prior_entries() {
        let mut store = WindowStore::new();
        store.insert(reading_at("pt-1", 0, 70));
        store.insert(reading_at("pt-1", 5, 71));
        let snap = store.insert(reading_at("pt-1", 10_000, 72));
        assert_eq!(snap.window_30s.count, 1);
        assert_eq!(snap.window_10m.count, 1);
    }

    #[test]
    fn out_of_order_reading_is_still_counted() {
        let mut store = WindowStore::new();
        store.insert(reading_at("pt-1", 20, 70));
        let snap = store.insert(reading_at("pt-1", 5, 71));
        assert_eq!(snap.window_30s.count, 2);
    }

    #[test]
    fn averages_are_means_over_retained_entries() {
        let mut store = WindowStore::new();
        store.insert(reading_at("pt-1", 0, 60));
        let snap = store.insert(reading_at("pt-1", 1, 80));
        assert_eq!(snap.window_30s.avg_hr, 70.0);
    }

    #[test]
    fn windows_are_keyed_independently_per_patient() {
        let mut store = WindowStore::new();
        store.insert(reading_at("pt-1", 0, 60));
        store.insert(reading_at("pt-2", 0, 90));
        assert_eq!(store.patient_count(), 2);
    }
}
