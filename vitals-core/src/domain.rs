//! The `Reading` value type and its validation (C1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Maximum allowed clock skew into the future, per §3: timestamps more than
/// this far ahead of wall clock are rejected.
pub const MAX_FUTURE_SKEW_SECS: i64 = 300;

const MAX_PATIENT_ID_LEN: usize = 50;
const HR_RANGE: std::ops::RangeInclusive<i32> = 30..=250;
const BP_SYS_RANGE: std::ops::RangeInclusive<i32> = 50..=250;
const BP_DIA_RANGE: std::ops::RangeInclusive<i32> = 30..=150;
const SPO2_RANGE: std::ops::RangeInclusive<i32> = 50..=100;
const RR_RANGE: std::ops::RangeInclusive<i32> = 4..=60;
const TEMP_RANGE: std::ops::RangeInclusive<f64> = 30.0..=45.0;

/// Untyped payload as received over HTTP or reconstructed from a stream
/// entry, before range/skew checks have run.
#[derive(Debug, Clone, Deserialize)]
pub struct RawReading {
    pub patient_id: String,
    pub timestamp: DateTime<Utc>,
    pub hr: i32,
    pub bp_sys: i32,
    pub bp_dia: i32,
    pub spo2: i32,
    pub rr: i32,
    pub temp: f64,
}

/// A single field violation, carrying the offending field name so callers
/// can build the `422` response body.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("field {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// A validated, immutable vitals observation. The only way to construct one
/// is [`Reading::validate`]; once constructed it is never mutated, and is
/// referenced by its server-assigned event id after persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub patient_id: String,
    pub timestamp: DateTime<Utc>,
    pub hr: i32,
    pub bp_sys: i32,
    pub bp_dia: i32,
    pub spo2: i32,
    pub rr: i32,
    pub temp: f64,
}

impl Reading {
    /// Enforces every range in §3 and the timestamp skew bound. Stateless.
    pub fn validate(raw: RawReading) -> Result<Self, ValidationError> {
        if raw.patient_id.is_empty() || raw.patient_id.chars().count() > MAX_PATIENT_ID_LEN {
            return Err(ValidationError::new(
                "patient_id",
                format!(
                    "must be 1-{MAX_PATIENT_ID_LEN} characters, got {}",
                    raw.patient_id.chars().count()
                ),
            ));
        }

        let skew_secs = (raw.timestamp - Utc::now()).num_seconds();
        if skew_secs > MAX_FUTURE_SKEW_SECS {
            return Err(ValidationError::new(
                "timestamp",
                format!("{skew_secs}s ahead of wall clock, max is {MAX_FUTURE_SKEW_SECS}s"),
            ));
        }

        if !HR_RANGE.contains(&raw.hr) {
            return Err(ValidationError::new(
                "hr",
                format!("{} outside {:?}", raw.hr, HR_RANGE),
            ));
        }
        if !BP_SYS_RANGE.contains(&raw.bp_sys) {
            return Err(ValidationError::new(
                "bp_sys",
                format!("{} outside {:?}", raw.bp_sys, BP_SYS_RANGE),
            ));
        }
        if !BP_DIA_RANGE.contains(&raw.bp_dia) {
            return Err(ValidationError::new(
                "bp_dia",
                format!("{} outside {:?}", raw.bp_dia, BP_DIA_RANGE),
            ));
        }
        if !SPO2_RANGE.contains(&raw.spo2) {
            return Err(ValidationError::new(
                "spo2",
                format!("{} outside {:?}", raw.spo2, SPO2_RANGE),
            ));
        }
        if !RR_RANGE.contains(&raw.rr) {
            return Err(ValidationError::new(
                "rr",
                format!("{} outside {:?}", raw.rr, RR_RANGE),
            ));
        }
        if !TEMP_RANGE.contains(&raw.temp) {
            return Err(ValidationError::new(
                "temp",
                format!("{} outside {:?}", raw.temp, TEMP_RANGE),
            ));
        }

        Ok(Reading {
            patient_id: raw.patient_id,
            timestamp: raw.timestamp,
            hr: raw.hr,
            bp_sys: raw.bp_sys,
            bp_dia: raw.bp_dia,
            spo2: raw.spo2,
            rr: raw.rr,
            temp: raw.temp,
        })
    }

    /// Reconstructs a reading already known to satisfy the invariants above
    /// (e.g. decoded back off the stream, where the ingest side already
    /// validated it). Skips range checks; callers must not use this for
    /// untrusted input.
    pub fn from_validated_parts(
        patient_id: String,
        timestamp: DateTime<Utc>,
        hr: i32,
        bp_sys: i32,
        bp_dia: i32,
        spo2: i32,
        rr: i32,
        temp: f64,
    ) -> Self {
        Reading {
            patient_id,
            timestamp,
            hr,
            bp_sys,
            bp_dia,
            spo2,
            rr,
            temp,
        }
    }

    /// The 6-feature vector `[hr, bp_sys, bp_dia, spo2, rr, temp]` consumed
    /// by the model scorer (C9).
    pub fn feature_vector(&self) -> [f64; 6] {
        [
            self.hr as f64,
            self.bp_sys as f64,
            self.bp_dia as f64,
            self.spo2 as f64,
            self.rr as f64,
            self.temp,
        ]
    }

    /// Stable idempotency fingerprint: `sha256(patient_id + ":" +
    /// timestamp_iso8601)`, hex-encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.patient_id.as_bytes());
        hasher.update(b":");
        hasher.update(self.timestamp.to_rfc3339().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// The closed set of anomaly kinds the classifier (C10) may assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnomalyKind {
    Spike,
    Drop,
    Drift,
    MultiSignal,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spike => "spike",
            Self::Drop => "drop",
            Self::Drift => "drift",
            Self::MultiSignal => "multi-signal",
        }
    }
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn raw(patient_id: &str) -> RawReading {
        RawReading {
            patient_id: patient_id.to_string(),
            timestamp: Utc::now(),
            hr: 72,
            bp_sys: 120,
            bp_dia: 80,
            spo2: 98,
            rr: 16,
            temp: 36.8,
        }
    }

    #[test]
    fn accepts_well_formed_reading() {
        assert!(Reading::validate(raw("pt-1")).is_ok());
    }

    #[test]
    fn rejects_empty_patient_id() {
        let err = Reading::validate(raw("")).unwrap_err();
        assert_eq!(err.field, "patient_id");
    }

    #[test]
    fn hr_boundary_30_admitted_29_rejected() {
        let mut r = raw("pt-1");
        r.hr = 30;
        assert!(Reading::validate(r.clone()).is_ok());
        r.hr = 29;
        assert_eq!(Reading::validate(r).unwrap_err().field, "hr");
    }

    #[test]
    fn hr_boundary_250_admitted_251_rejected() {
        let mut r = raw("pt-1");
        r.hr = 250;
        assert!(Reading::validate(r.clone()).is_ok());
        r.hr = 251;
        assert_eq!(Reading::validate(r).unwrap_err().field, "hr");
    }

    #[test]
    fn spo2_rejects_above_100() {
        let mut r = raw("pt-1");
        r.spo2 = 110;
        assert_eq!(Reading::validate(r).unwrap_err().field, "spo2");
    }

    #[test]
    fn timestamp_skew_boundary() {
        let mut r = raw("pt-1");
        r.timestamp = Utc::now() + Duration::seconds(299);
        assert!(Reading::validate(r.clone()).is_ok());
        r.timestamp = Utc::now() + Duration::seconds(301);
        assert_eq!(Reading::validate(r).unwrap_err().field, "timestamp");
    }

    #[test]
    fn fingerprint_is_stable_for_identical_reading() {
        let r1 = Reading::validate(raw("pt-1")).unwrap();
        let r2 = r1.clone();
        assert_eq!(r1.fingerprint(), r2.fingerprint());
    }

    #[test]
    fn fingerprint_differs_by_timestamp() {
        let mut raw1 = raw("pt-1");
        raw1.timestamp = Utc::now();
        let mut raw2 = raw1.clone();
        raw2.timestamp = raw1.timestamp + Duration::seconds(1);
        let r1 = Reading::validate(raw1).unwrap();
        let r2 = Reading::validate(raw2).unwrap();
        assert_ne!(r1.fingerprint(), r2.fingerprint());
    }
}
