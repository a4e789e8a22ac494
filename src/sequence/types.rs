//! Keyframe input types
//!
//! A keyframe is one timed pose sample for one named part. The wire shape
//! matches what animator clients already send: `time`, `part`, a 12-value
//! `transform` (legacy name `c0`) and an optional `easing` name.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Number of values in a pose transform: position (3) + row-major 3x3 rotation (9)
pub const TRANSFORM_LEN: usize = 12;

/// Largest accepted keyframe time in seconds. Whole hundredths of any time up
/// to this bound fit exactly in both `i64` and `f64`.
pub const MAX_TIME: f64 = 9.0e13;

/// Interpolation style between consecutive poses of the same part.
///
/// Unknown, non-string or missing values deserialize to `Linear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "String")]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    Bounce,
}

impl Easing {
    /// Look up an easing by its wire name, falling back to `Linear`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Linear" => Self::Linear,
            "EaseIn" => Self::EaseIn,
            "EaseOut" => Self::EaseOut,
            "EaseInOut" => Self::EaseInOut,
            "Bounce" => Self::Bounce,
            _ => Self::Linear,
        }
    }

    /// Wire name of this easing
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "Linear",
            Self::EaseIn => "EaseIn",
            Self::EaseOut => "EaseOut",
            Self::EaseInOut => "EaseInOut",
            Self::Bounce => "Bounce",
        }
    }

    /// Engine `EasingStyle` token code
    pub fn style_code(&self) -> u8 {
        match self {
            Self::Linear => 0,
            Self::Bounce => 3,
            Self::EaseIn => 6,
            Self::EaseOut => 7,
            Self::EaseInOut => 8,
        }
    }
}

impl std::fmt::Display for Easing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<serde_json::Value> for Easing {
    fn from(value: serde_json::Value) -> Self {
        value.as_str().map(Self::from_name).unwrap_or_default()
    }
}

impl From<Easing> for String {
    fn from(easing: Easing) -> Self {
        easing.name().to_string()
    }
}

/// One sample of one part's pose at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Seconds from the start of the sequence
    pub time: f64,
    /// Name of the rigid part this pose applies to
    pub part: String,
    /// Position followed by row-major orientation matrix
    #[serde(alias = "c0")]
    pub transform: Vec<f64>,
    #[serde(default)]
    pub easing: Easing,
}

impl Keyframe {
    /// Create a keyframe from a fixed-size transform
    pub fn new(
        time: f64,
        part: impl Into<String>,
        transform: [f64; TRANSFORM_LEN],
        easing: Easing,
    ) -> Self {
        Self {
            time,
            part: part.into(),
            transform: transform.to_vec(),
            easing,
        }
    }

    /// Check that this record is syntactically well formed.
    pub fn validate(&self) -> Result<()> {
        if !self.time.is_finite() || self.time < 0.0 {
            return Err(Error::InvalidInput(format!(
                "time must be a non-negative number, got {}",
                self.time
            )));
        }
        if self.time > MAX_TIME {
            return Err(Error::InvalidInput(format!(
                "time must not exceed {} seconds, got {}",
                MAX_TIME, self.time
            )));
        }
        if self.part.trim().is_empty() {
            return Err(Error::InvalidInput("part must not be empty".to_string()));
        }
        if self.transform.len() != TRANSFORM_LEN {
            return Err(Error::InvalidInput(format!(
                "transform must have {} values, got {}",
                TRANSFORM_LEN,
                self.transform.len()
            )));
        }
        if let Some(pos) = self.transform.iter().position(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "transform value {} is not a finite number",
                pos
            )));
        }
        Ok(())
    }
}

/// Validate a keyframe payload before it reaches the encoder.
///
/// Rejects an empty collection and reports the index of the first bad record.
pub fn validate_keyframes(keyframes: &[Keyframe]) -> Result<()> {
    if keyframes.is_empty() {
        return Err(Error::InvalidInput("no keyframes provided".to_string()));
    }
    for (index, keyframe) in keyframes.iter().enumerate() {
        keyframe.validate().map_err(|e| match e {
            Error::InvalidInput(msg) => Error::InvalidInput(format!("keyframe {}: {}", index, msg)),
            other => other,
        })?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub const IDENTITY: [f64; TRANSFORM_LEN] =
        [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

    pub fn keyframe(time: f64, part: &str, easing: Easing) -> Keyframe {
        Keyframe::new(time, part, IDENTITY, easing)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_style_codes() {
        assert_eq!(Easing::Linear.style_code(), 0);
        assert_eq!(Easing::EaseIn.style_code(), 6);
        assert_eq!(Easing::EaseOut.style_code(), 7);
        assert_eq!(Easing::EaseInOut.style_code(), 8);
        assert_eq!(Easing::Bounce.style_code(), 3);
    }

    #[test]
    fn test_easing_fallback() {
        assert_eq!(Easing::from_name("Elastic"), Easing::Linear);
        assert_eq!(Easing::from_name("bounce"), Easing::Linear);
        assert_eq!(Easing::from(serde_json::json!(7)), Easing::Linear);
        assert_eq!(Easing::from(serde_json::Value::Null), Easing::Linear);
        assert_eq!(Easing::from(serde_json::json!("EaseOut")), Easing::EaseOut);
    }

    #[test]
    fn test_keyframe_deserialize() {
        let kf: Keyframe = serde_json::from_value(serde_json::json!({
            "time": 1,
            "part": "Head",
            "transform": [0, 1, 2, 1, 0, 0, 0, 1, 0, 0, 0, 1],
            "easing": "Bounce"
        }))
        .unwrap();
        assert_eq!(kf.time, 1.0);
        assert_eq!(kf.transform[2], 2.0);
        assert_eq!(kf.easing, Easing::Bounce);
    }

    #[test]
    fn test_keyframe_deserialize_legacy_c0_and_missing_easing() {
        let kf: Keyframe = serde_json::from_value(serde_json::json!({
            "time": 0.5,
            "part": "Torso",
            "c0": [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1]
        }))
        .unwrap();
        assert_eq!(kf.transform.len(), TRANSFORM_LEN);
        assert_eq!(kf.easing, Easing::Linear);
    }

    #[test]
    fn test_unknown_easing_does_not_fail() {
        let kf: Keyframe = serde_json::from_value(serde_json::json!({
            "time": 0.5,
            "part": "Torso",
            "transform": IDENTITY,
            "easing": {"style": "weird"}
        }))
        .unwrap();
        assert_eq!(kf.easing, Easing::Linear);
    }

    #[test]
    fn test_easing_serializes_as_name() {
        let json = serde_json::to_value(keyframe(0.0, "Head", Easing::EaseInOut)).unwrap();
        assert_eq!(json["easing"], "EaseInOut");
    }

    #[test]
    fn test_validate_keyframes_empty() {
        let err = validate_keyframes(&[]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_validate_reports_index() {
        let mut bad = keyframe(0.1, "Arm", Easing::Linear);
        bad.transform.pop();
        let err = validate_keyframes(&[keyframe(0.0, "Head", Easing::Linear), bad]).unwrap_err();
        match err {
            Error::InvalidInput(msg) => {
                assert!(msg.starts_with("keyframe 1:"));
                assert!(msg.contains("got 11"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_times_past_limit() {
        assert!(keyframe(MAX_TIME, "Head", Easing::Linear).validate().is_ok());

        let err = validate_keyframes(&[
            keyframe(1e17, "Head", Easing::Linear),
            keyframe(5e17, "Torso", Easing::Linear),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg.starts_with("keyframe 0:")));
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        assert!(keyframe(-0.5, "Head", Easing::Linear).validate().is_err());
        assert!(keyframe(f64::NAN, "Head", Easing::Linear).validate().is_err());
        assert!(keyframe(0.0, "  ", Easing::Linear).validate().is_err());

        let mut inf = keyframe(0.0, "Head", Easing::Linear);
        inf.transform[4] = f64::INFINITY;
        assert!(inf.validate().is_err());

        assert!(keyframe(0.0, "Head", Easing::Linear).validate().is_ok());
    }
}
