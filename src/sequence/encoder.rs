//! Keyframe sequence encoder
//!
//! Groups keyframes by time rounded to hundredths of a second and builds a
//! [`Document`] with one time node per group. Grouping uses integer
//! hundredths (`round(time * 100)`, ties away from zero) as an ordered map
//! key, so node order is numeric and independent of input order, while poses
//! inside a node keep their input order.

use super::document::{
    Document, PoseNode, TimeNode, DEFAULT_SEQUENCE_NAME, EASING_DIRECTION, POSE_WEIGHT,
};
use super::types::{Keyframe, MAX_TIME, TRANSFORM_LEN};
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Grouping key of a time: whole hundredths of a second.
pub fn time_key(time: f64) -> i64 {
    (time * 100.0).round() as i64
}

/// Time value emitted for a grouping key
pub fn key_time(key: i64) -> f64 {
    key as f64 / 100.0
}

/// Encode keyframes into a keyframe sequence document.
pub fn encode(sequence_name: &str, keyframes: &[Keyframe]) -> Result<Document> {
    if keyframes.is_empty() {
        return Err(Error::InvalidInput("no keyframes provided".to_string()));
    }

    let mut groups: BTreeMap<i64, Vec<PoseNode>> = BTreeMap::new();
    for (index, keyframe) in keyframes.iter().enumerate() {
        if !keyframe.time.is_finite() || keyframe.time < 0.0 || keyframe.time > MAX_TIME {
            return Err(Error::EncodingFailure(format!(
                "keyframe {} has unusable time {}",
                index, keyframe.time
            )));
        }
        let cframe: [f64; TRANSFORM_LEN] =
            keyframe.transform.as_slice().try_into().map_err(|_| {
                Error::EncodingFailure(format!(
                    "keyframe {} transform has {} values, expected {}",
                    index,
                    keyframe.transform.len(),
                    TRANSFORM_LEN
                ))
            })?;

        groups
            .entry(time_key(keyframe.time))
            .or_default()
            .push(PoseNode {
                part: keyframe.part.clone(),
                cframe,
                easing_direction: EASING_DIRECTION,
                easing_style: keyframe.easing.style_code(),
                weight: POSE_WEIGHT,
            });
    }

    let name = if sequence_name.trim().is_empty() {
        DEFAULT_SEQUENCE_NAME
    } else {
        sequence_name
    };

    let document = Document {
        name: name.to_string(),
        keyframes: groups
            .into_iter()
            .map(|(key, poses)| TimeNode {
                time: key_time(key),
                poses,
            })
            .collect(),
    };

    tracing::debug!(
        name = %document.name,
        time_nodes = document.keyframes.len(),
        poses = document.pose_count(),
        "Encoded keyframe sequence"
    );

    Ok(document)
}

/// Encode with the originating rig type.
///
/// The rig type does not influence the output; every rig encodes through
/// the same part-name based pose layout.
pub fn encode_with_rig(
    sequence_name: &str,
    rig_type: Option<&str>,
    keyframes: &[Keyframe],
) -> Result<Document> {
    if let Some(rig) = rig_type {
        tracing::trace!(rig_type = %rig, "Rig type accepted, encoding is rig independent");
    }
    encode(sequence_name, keyframes)
}
