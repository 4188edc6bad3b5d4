use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::presentation::domain::status_text::Locale;
use crate::shared::constants::{
    DEFAULT_DETECTION_INTERVAL_MS, DEFAULT_MIN_CONFIDENCE, DEFAULT_MISSING_THRESHOLD_SECS,
    DEFAULT_WARNING_THRESHOLD_SECS, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("missing threshold must be a positive, representable number of seconds, got {0}")]
    MissingThreshold(f64),
    #[error("warning threshold must be a positive, representable number of seconds, got {0}")]
    WarningThreshold(f64),
    #[error("warning threshold ({warning}s) must be below the missing threshold ({missing}s)")]
    ThresholdOrder { warning: f64, missing: f64 },
    #[error("detection interval must be greater than zero")]
    DetectionInterval,
    #[error("detection timeout must be greater than zero")]
    DetectionTimeout,
    #[error("minimum confidence must be between 0.0 and 1.0, got {0}")]
    MinConfidence(f64),
}

/// What a tick does when detection could not produce an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InconclusivePolicy {
    /// Skip the tick; presence state is left untouched (fail-open).
    #[default]
    Ignore,
    /// Count the tick as "no face" (fail-closed).
    TreatAsAbsent,
}

/// Where the face detection model comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSource {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub bundled_dir: Option<PathBuf>,
}

impl Default for ModelSource {
    fn default() -> Self {
        Self {
            name: YOLO_MODEL_NAME.to_string(),
            url: YOLO_MODEL_URL.to_string(),
            bundled_dir: None,
        }
    }
}

/// Per-session presence tracking configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub missing_threshold_seconds: f64,
    pub warning_threshold_seconds: f64,
    pub detection_interval_ms: u64,
    /// Upper bound on a single detection call. Defaults to the interval.
    pub detection_timeout_ms: Option<u64>,
    pub min_confidence: f64,
    pub inconclusive_policy: InconclusivePolicy,
    pub locale: Locale,
    pub model_source: ModelSource,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            missing_threshold_seconds: DEFAULT_MISSING_THRESHOLD_SECS,
            warning_threshold_seconds: DEFAULT_WARNING_THRESHOLD_SECS,
            detection_interval_ms: DEFAULT_DETECTION_INTERVAL_MS,
            detection_timeout_ms: None,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            inconclusive_policy: InconclusivePolicy::Ignore,
            locale: Locale::English,
            model_source: ModelSource::default(),
        }
    }
}

impl PresenceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing = self.missing_threshold_seconds;
        let warning = self.warning_threshold_seconds;
        if !is_positive_duration(missing) {
            return Err(ConfigError::MissingThreshold(missing));
        }
        if !is_positive_duration(warning) {
            return Err(ConfigError::WarningThreshold(warning));
        }
        if warning >= missing {
            return Err(ConfigError::ThresholdOrder { warning, missing });
        }
        if self.detection_interval_ms == 0 {
            return Err(ConfigError::DetectionInterval);
        }
        if self.detection_timeout_ms == Some(0) {
            return Err(ConfigError::DetectionTimeout);
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::MinConfidence(self.min_confidence));
        }
        Ok(())
    }

    pub fn missing_threshold(&self) -> Duration {
        Duration::from_secs_f64(self.missing_threshold_seconds)
    }

    pub fn warning_threshold(&self) -> Duration {
        Duration::from_secs_f64(self.warning_threshold_seconds)
    }

    pub fn detection_interval(&self) -> Duration {
        Duration::from_millis(self.detection_interval_ms)
    }

    pub fn detection_timeout(&self) -> Duration {
        Duration::from_millis(
            self.detection_timeout_ms
                .unwrap_or(self.detection_interval_ms),
        )
    }

    /// Returns a copy with every set field of `overrides` applied.
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(v) = overrides.missing_threshold_seconds {
            self.missing_threshold_seconds = v;
        }
        if let Some(v) = overrides.warning_threshold_seconds {
            self.warning_threshold_seconds = v;
        }
        if let Some(v) = overrides.detection_interval_ms {
            self.detection_interval_ms = v;
        }
        if let Some(v) = overrides.detection_timeout_ms {
            self.detection_timeout_ms = Some(v);
        }
        if let Some(v) = overrides.min_confidence {
            self.min_confidence = v;
        }
        if let Some(v) = overrides.inconclusive_policy {
            self.inconclusive_policy = v;
        }
        if let Some(v) = overrides.locale {
            self.locale = v;
        }
        if let Some(ref v) = overrides.model_source {
            self.model_source = v.clone();
        }
        self
    }
}

/// Positive and small enough to convert to a `Duration` without panicking.
fn is_positive_duration(seconds: f64) -> bool {
    seconds > 0.0 && Duration::try_from_secs_f64(seconds).is_ok()
}

/// Partial configuration supplied at initialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub missing_threshold_seconds: Option<f64>,
    pub warning_threshold_seconds: Option<f64>,
    pub detection_interval_ms: Option<u64>,
    pub detection_timeout_ms: Option<u64>,
    pub min_confidence: Option<f64>,
    pub inconclusive_policy: Option<InconclusivePolicy>,
    pub locale: Option<Locale>,
    pub model_source: Option<ModelSource>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn config(missing: f64, warning: f64, interval_ms: u64, confidence: f64) -> PresenceConfig {
        PresenceConfig {
            missing_threshold_seconds: missing,
            warning_threshold_seconds: warning,
            detection_interval_ms: interval_ms,
            min_confidence: confidence,
            ..PresenceConfig::default()
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let cfg = PresenceConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.missing_threshold(), Duration::from_secs(10));
        assert_eq!(cfg.warning_threshold(), Duration::from_secs(5));
        assert_eq!(cfg.detection_interval(), Duration::from_millis(2000));
    }

    #[rstest]
    #[case::zero_missing(config(0.0, 5.0, 2000, 0.5), ConfigError::MissingThreshold(0.0))]
    #[case::negative_warning(config(10.0, -1.0, 2000, 0.5), ConfigError::WarningThreshold(-1.0))]
    #[case::warning_equals_missing(
        config(10.0, 10.0, 2000, 0.5),
        ConfigError::ThresholdOrder { warning: 10.0, missing: 10.0 }
    )]
    #[case::warning_above_missing(
        config(5.0, 8.0, 2000, 0.5),
        ConfigError::ThresholdOrder { warning: 8.0, missing: 5.0 }
    )]
    #[case::huge_missing(config(1e20, 5.0, 2000, 0.5), ConfigError::MissingThreshold(1e20))]
    #[case::huge_warning(config(10.0, 1e20, 2000, 0.5), ConfigError::WarningThreshold(1e20))]
    #[case::infinite_missing(
        config(f64::INFINITY, 5.0, 2000, 0.5),
        ConfigError::MissingThreshold(f64::INFINITY)
    )]
    #[case::zero_interval(config(10.0, 5.0, 0, 0.5), ConfigError::DetectionInterval)]
    #[case::confidence_above_one(config(10.0, 5.0, 2000, 1.5), ConfigError::MinConfidence(1.5))]
    fn test_validate_rejects(#[case] cfg: PresenceConfig, #[case] expected: ConfigError) {
        assert_eq!(cfg.validate(), Err(expected));
    }

    #[test]
    fn test_validate_rejects_nan_threshold() {
        let cfg = config(f64::NAN, 5.0, 2000, 0.5);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MissingThreshold(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let cfg = PresenceConfig {
            detection_timeout_ms: Some(0),
            ..PresenceConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::DetectionTimeout));
    }

    #[test]
    fn test_timeout_defaults_to_interval() {
        let cfg = config(10.0, 5.0, 750, 0.5);
        assert_eq!(cfg.detection_timeout(), Duration::from_millis(750));

        let cfg = PresenceConfig {
            detection_timeout_ms: Some(300),
            ..cfg
        };
        assert_eq!(cfg.detection_timeout(), Duration::from_millis(300));
    }

    #[test]
    fn test_overrides_replace_only_set_fields() {
        let overrides = ConfigOverrides {
            missing_threshold_seconds: Some(30.0),
            inconclusive_policy: Some(InconclusivePolicy::TreatAsAbsent),
            ..ConfigOverrides::default()
        };
        let cfg = PresenceConfig::default().with_overrides(&overrides);
        assert_eq!(cfg.missing_threshold_seconds, 30.0);
        assert_eq!(cfg.warning_threshold_seconds, DEFAULT_WARNING_THRESHOLD_SECS);
        assert_eq!(cfg.inconclusive_policy, InconclusivePolicy::TreatAsAbsent);
        assert_eq!(cfg.detection_interval_ms, DEFAULT_DETECTION_INTERVAL_MS);
    }

    #[test]
    fn test_empty_overrides_are_identity() {
        let cfg = PresenceConfig::default().with_overrides(&ConfigOverrides::default());
        assert_eq!(cfg, PresenceConfig::default());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let json = r#"{ "warning_threshold_seconds": 3.0, "locale": "id" }"#;
        let cfg: PresenceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.warning_threshold_seconds, 3.0);
        assert_eq!(cfg.missing_threshold_seconds, DEFAULT_MISSING_THRESHOLD_SECS);
        assert_eq!(cfg.locale, Locale::Indonesian);
        assert_eq!(cfg.model_source, ModelSource::default());
    }

    #[test]
    fn test_policy_serializes_snake_case() {
        let json = serde_json::to_string(&InconclusivePolicy::TreatAsAbsent).unwrap();
        assert_eq!(json, "\"treat_as_absent\"");
    }
}
