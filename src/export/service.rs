//! Export service
//!
//! Ties the encoder, the artifact store and the publisher together. Handlers
//! only translate HTTP to calls on [`ExportService`].

use super::publish::{PublishMetadata, Publisher};
use super::types::{ExportRequest, PublishRequest, PublishResponse};
use crate::artifact::{artifact_file_name, ArtifactId, ArtifactStore};
use crate::config::KfseqConfig;
use crate::error::{Error, Result};
use crate::sequence::encode_with_rig;
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// A freshly stored export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredExport {
    pub id: ArtifactId,
    pub file_name: String,
}

/// Document bytes handed out by a download
#[derive(Debug, Clone)]
pub struct Download {
    pub file_name: String,
    pub document: Bytes,
}

/// Encodes keyframe payloads, stores and serves the resulting documents
pub struct ExportService {
    store: Arc<ArtifactStore>,
    publisher: Arc<dyn Publisher>,
    download_grace: Duration,
    public_base_url: Option<String>,
    default_description: String,
}

impl ExportService {
    pub fn new(store: Arc<ArtifactStore>, publisher: Arc<dyn Publisher>, config: &KfseqConfig) -> Self {
        Self {
            store,
            publisher,
            download_grace: config.retention.download_grace(),
            public_base_url: config
                .server
                .public_base_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
            default_description: config.publish.default_description.clone(),
        }
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    pub fn publisher_name(&self) -> &str {
        self.publisher.name()
    }

    /// Validate, encode and store a keyframe payload
    pub async fn export(&self, request: ExportRequest) -> Result<StoredExport> {
        request.validate()?;

        let name = request.display_name().to_string();
        let document = encode_with_rig(&name, request.rig_type.as_deref(), &request.keyframes)?;
        tracing::info!(
            name = %name,
            keyframes = request.keyframes.len(),
            time_nodes = document.keyframes.len(),
            "Encoded keyframe sequence"
        );

        let id = self
            .store
            .put(name.clone(), request.rig_type, request.keyframes, document.to_bytes())
            .await?;

        Ok(StoredExport {
            id,
            file_name: artifact_file_name(&name, id),
        })
    }

    /// Serve a stored document and schedule its deletion after the
    /// download grace period
    pub async fn download(&self, id: &str) -> Result<Download> {
        let id: ArtifactId = id
            .parse()
            .map_err(|_| Error::NotFound(format!("Artifact {} not found", id)))?;

        let artifact = self.store.get(&id).await?;
        self.store.schedule_deferred_delete(id, self.download_grace);

        tracing::info!(artifact_id = %id, file_name = %artifact.file_name, "Serving artifact download");
        Ok(Download {
            file_name: artifact.file_name,
            document: artifact.document,
        })
    }

    /// Encode a payload and hand it to the publisher. Nothing is stored.
    pub async fn publish(&self, request: PublishRequest) -> Result<PublishResponse> {
        request.export.validate()?;

        let name = request.export.display_name().to_string();
        let document = encode_with_rig(
            &name,
            request.export.rig_type.as_deref(),
            &request.export.keyframes,
        )?;

        let metadata = PublishMetadata {
            file_name: artifact_file_name(
                &name,
                ArtifactId::from(Utc::now().timestamp_millis().max(0) as u64),
            ),
            name,
            description: request
                .description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| self.default_description.clone()),
            rig_type: request.export.rig_type,
            price: request.price,
            for_sale: request.for_sale,
        };

        let reference = self
            .publisher
            .publish(document.to_bytes(), &metadata)
            .await?;

        let marketplace_url = reference.marketplace_url();
        let message = match &reference.asset_id {
            Some(asset_id) => format!("Published '{}' as asset {}", metadata.name, asset_id),
            None => format!(
                "Uploaded '{}' but the asset id could not be determined",
                metadata.name
            ),
        };
        tracing::info!(publisher = self.publisher.name(), "{}", message);

        Ok(PublishResponse {
            success: true,
            asset_id: reference.asset_id,
            marketplace_url,
            message,
        })
    }

    /// Absolute or relative download link for `id`.
    ///
    /// Uses the configured public base URL, then the request host with the
    /// forwarded scheme (`http` when absent), and falls back to a relative
    /// path.
    pub fn download_url(&self, id: ArtifactId, host: Option<&str>, scheme: Option<&str>) -> String {
        let path = format!("/download/{}", id);
        match (&self.public_base_url, host) {
            (Some(base), _) => format!("{}{}", base, path),
            (None, Some(host)) if !host.is_empty() => {
                format!("{}://{}{}", request_scheme(scheme), host, path)
            }
            _ => path,
        }
    }
}

/// Scheme named by an `X-Forwarded-Proto` value. Only the first hop counts,
/// and anything other than `https` is treated as `http`.
fn request_scheme(forwarded: Option<&str>) -> &'static str {
    match forwarded.and_then(|v| v.split(',').next()).map(str::trim) {
        Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    }
}
