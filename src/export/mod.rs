//! Export API: encode keyframe payloads, then serve or publish the documents
//!
//! Clients post keyframes to `/export` and receive a download link; the
//! stored document is then fetched from `/download/:id`. `/publish` encodes
//! the same payload and hands it to an external [`Publisher`] instead of
//! storing it.

pub mod handler;
pub mod publish;
pub mod service;
pub mod types;

pub use handler::{export_router, ExportState};
pub use publish::{
    publisher_from_config, AssetReference, HttpPublisher, PublishMetadata, Publisher,
    UnconfiguredPublisher,
};
pub use service::{Download, ExportService, StoredExport};
pub use types::{ApiError, ExportReceipt, ExportRequest, PublishRequest, PublishResponse};
