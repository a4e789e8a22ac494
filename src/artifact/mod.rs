//! Artifact store, a short-lived holding area for encoded documents
//!
//! Documents are stored under fresh ids, served until they expire, then
//! destroyed by a deferred delete after download or by the periodic sweep.

pub mod blob;
pub mod store;
pub mod types;

pub use blob::{BlobHandle, BlobStorage};
pub use store::ArtifactStore;
pub use types::{artifact_file_name, Artifact, ArtifactId, IdGenerator};
