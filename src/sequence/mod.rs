//! Keyframe sequence encoding
//!
//! Turns a flat list of per-part pose samples into the hierarchical
//! keyframe sequence document read by the engine. Encoding is pure: no I/O
//! and no shared state, so it is safe to call from any number of request
//! handlers at once.

pub mod document;
pub mod encoder;
pub mod types;

pub use document::{Document, PoseNode, TimeNode, DEFAULT_SEQUENCE_NAME};
pub use encoder::{encode, encode_with_rig};
pub use types::{validate_keyframes, Easing, Keyframe, MAX_TIME, TRANSFORM_LEN};
