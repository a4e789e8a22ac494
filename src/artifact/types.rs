//! Artifact identifiers and data types

use crate::sequence::Keyframe;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

/// File extension of generated documents
pub const DOCUMENT_EXTENSION: &str = "rbxm";

/// Longest name stem kept in a file name
pub const MAX_FILE_STEM: usize = 100;

/// Opaque artifact identifier.
///
/// Ids are millisecond timestamps of the creation instant, bumped past the
/// last issued id when the clock has not advanced, so they are unique and
/// strictly increasing within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ArtifactId(u64);

impl ArtifactId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ArtifactId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| format!("invalid artifact id: {}", s))
    }
}

impl From<u64> for ArtifactId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<ArtifactId> for String {
    fn from(id: ArtifactId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for ArtifactId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Issues unique, strictly increasing artifact ids
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id: the current millisecond timestamp, or `last + 1` if that
    /// timestamp was already issued.
    pub fn next_id(&self) -> ArtifactId {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return ArtifactId(candidate),
                Err(actual) => current = actual,
            }
        }
    }
}

/// A stored document and its metadata, as handed to callers.
///
/// This is a copy; the store keeps ownership of the backing storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub id: ArtifactId,
    /// Display name of the sequence
    pub name: String,
    /// Originating rig type, kept as supplied
    pub rig_type: Option<String>,
    /// Raw keyframe payload the document was encoded from
    pub keyframes: Vec<Keyframe>,
    /// Suggested download file name
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    /// Rendered document
    pub document: Bytes,
}

/// Build the download file name for an artifact.
///
/// Every character outside `[A-Za-z0-9]` becomes `_`, and the stem is cut
/// to [`MAX_FILE_STEM`] characters so the name stays within file system
/// limits.
pub fn artifact_file_name(name: &str, id: ArtifactId) -> String {
    static UNSAFE: OnceLock<Option<Regex>> = OnceLock::new();
    let mut stem: String = match UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9]").ok()) {
        Some(re) => re.replace_all(name, "_").into_owned(),
        None => name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect(),
    };
    // The stem is ASCII here, so truncating on a byte index is safe.
    stem.truncate(MAX_FILE_STEM);
    format!("{}_{}.{}", stem, id, DOCUMENT_EXTENSION)
}
