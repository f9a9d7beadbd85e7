//! Model scorer (C9): wraps a pre-trained unsupervised detector loaded once
//! at worker startup.
//!
//! Training the model is explicitly out of scope (§1) — the scorer is an
//! opaque artifact with one load step and one operation,
//! `score(vector) -> (flag, value)` (§9). This module defines the artifact
//! format this workspace loads: a per-feature center/scale pair describing
//! a Mahalanobis-style distance-from-normal scorer, serialized as JSON so
//! it can be produced by any offline training pipeline without requiring a
//! Rust-specific model format. Any unsupervised one-class detector meeting
//! the load/score contract is an acceptable substitute.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PhysioError, Result};

/// Result of scoring one feature vector.
#[derive(Debug, Clone, Copy)]
pub struct ScorerOutput {
    pub anomalous: bool,
    /// Higher means more abnormal. The model's native decision function
    /// convention ("lower = more abnormal") is inverted once here, at the
    /// scoring boundary — every downstream comparison assumes "higher =
    /// worse" (§9, "scorer boundary").
    pub score: f64,
}

/// On-disk artifact: per-feature center and scale for `[hr, bp_sys, bp_dia,
/// spo2, rr, temp]`, plus the native decision threshold.
#[derive(Debug, Deserialize, Serialize)]
pub struct ScorerArtifact {
    pub center: [f64; 6],
    pub scale: [f64; 6],
    pub threshold: f64,
}

#[derive(Debug)]
pub struct ModelScorer {
    artifact: ScorerArtifact,
}

impl ModelScorer {
    /// Missing or unloadable model is fatal at startup — the worker
    /// refuses to start without one (§4.9).
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            PhysioError::ModelUnloadable(format!("cannot read model file {}: {e}", path.display()))
        })?;
        let artifact: ScorerArtifact = serde_json::from_slice(&bytes).map_err(|e| {
            PhysioError::ModelUnloadable(format!("cannot parse model file {}: {e}", path.display()))
        })?;

        if artifact.scale.iter().any(|s| *s == 0.0) {
            return Err(PhysioError::ModelUnloadable(
                "scorer artifact has a zero-scale feature".into(),
            ));
        }

        Ok(Self { artifact })
    }

    pub fn score(&self, features: [f64; 6]) -> ScorerOutput {
        let mut squared = 0.0;
        for i in 0..6 {
            let z = (features[i] - self.artifact.center[i]) / self.artifact.scale[i];
            squared += z * z;
        }
        let distance = squared.sqrt();
        let native_decision = self.artifact.threshold - distance;
        ScorerOutput {
            anomalous: native_decision < 0.0,
            score: -native_decision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> ScorerArtifact {
        ScorerArtifact {
            center: [75.0, 120.0, 80.0, 97.0, 16.0, 37.0],
            scale: [10.0, 15.0, 10.0, 3.0, 4.0, 0.5],
            threshold: 3.0,
        }
    }

    #[test]
    fn inverts_native_decision_so_higher_is_worse() {
        let scorer = ModelScorer { artifact: artifact() };
        let normal = scorer.score([75.0, 120.0, 80.0, 97.0, 16.0, 37.0]);
        let abnormal = scorer.score([220.0, 200.0, 150.0, 60.0, 50.0, 41.0]);
        assert!(abnormal.score > normal.score);
        assert!(!normal.anomalous);
        assert!(abnormal.anomalous);
    }

    #[test]
    fn rejects_zero_scale_artifact() {
        let mut art = artifact();
        art.scale[0] = 0.0;
        let bytes = serde_json::to_vec(&art).unwrap();
        let tmp = std::env::temp_dir().join("vitals-scorer-test-zero-scale.json");
        std::fs::write(&tmp, bytes).unwrap();
        let result = ModelScorer::load(&tmp);
        std::fs::remove_file(&tmp).ok();
        assert!(result.is_err());
    }
}
