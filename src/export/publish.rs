//! Publisher seam for pushing documents to an external asset platform
//!
//! Publishing is an opaque collaborator: it takes document bytes plus
//! metadata and may hand back an asset reference. It can fail for reasons
//! outside this service, so every failure maps to `Error::Publish`.

use crate::config::PublishConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Marketplace page prefix for published assets
pub const MARKETPLACE_URL_PREFIX: &str = "https://create.roblox.com/store/asset/";

/// Metadata sent alongside a published document
#[derive(Debug, Clone, Serialize)]
pub struct PublishMetadata {
    pub name: String,
    pub description: String,
    pub rig_type: Option<String>,
    pub price: Option<u64>,
    pub for_sale: bool,
    pub file_name: String,
}

/// Reference to an asset created by a publisher
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetReference {
    /// Platform asset id, when the publisher could capture one
    pub asset_id: Option<String>,
}

impl AssetReference {
    /// Public marketplace page of the asset
    pub fn marketplace_url(&self) -> Option<String> {
        self.asset_id
            .as_ref()
            .map(|id| format!("{}{}", MARKETPLACE_URL_PREFIX, id))
    }
}

/// External asset publisher
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publisher name for logs
    fn name(&self) -> &str;

    /// Upload a document and return the created asset reference
    async fn publish(&self, document: Bytes, metadata: &PublishMetadata) -> Result<AssetReference>;
}

/// Publisher used when no endpoint is configured
pub struct UnconfiguredPublisher;

#[async_trait]
impl Publisher for UnconfiguredPublisher {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn publish(&self, _document: Bytes, _metadata: &PublishMetadata) -> Result<AssetReference> {
        Err(Error::Publish("no publisher configured".to_string()))
    }
}

#[derive(Serialize)]
struct UploadPayload<'a> {
    #[serde(flatten)]
    metadata: &'a PublishMetadata,
    document_base64: String,
}

#[derive(Deserialize)]
struct UploadReply {
    #[serde(default)]
    asset_id: Option<serde_json::Value>,
}

/// Publisher that posts documents to an HTTP upload endpoint
pub struct HttpPublisher {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpPublisher {
    /// Create a publisher for `endpoint` with a request timeout
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build publisher HTTP client: {}", e)))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    fn name(&self) -> &str {
        "http"
    }

    async fn publish(&self, document: Bytes, metadata: &PublishMetadata) -> Result<AssetReference> {
        let payload = UploadPayload {
            metadata,
            document_base64: base64::engine::general_purpose::STANDARD.encode(&document),
        };

        tracing::info!(
            endpoint = %self.endpoint,
            name = %metadata.name,
            bytes = document.len(),
            "Publishing keyframe sequence"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Publish(format!("Upload request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Publish(format!("Upload endpoint returned {}", status)));
        }

        let reply: UploadReply = response
            .json()
            .await
            .map_err(|e| Error::Publish(format!("Failed to parse upload response: {}", e)))?;

        let asset_id = match reply.asset_id {
            Some(serde_json::Value::String(id)) if !id.is_empty() => Some(id),
            Some(serde_json::Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };

        if asset_id.is_none() {
            tracing::warn!(name = %metadata.name, "Upload succeeded but no asset id was returned");
        }
        Ok(AssetReference { asset_id })
    }
}

/// Build the publisher named by configuration
pub fn publisher_from_config(config: &PublishConfig) -> Result<Arc<dyn Publisher>> {
    match &config.endpoint {
        Some(endpoint) => Ok(Arc::new(HttpPublisher::new(
            endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => Ok(Arc::new(UnconfiguredPublisher)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};

    fn metadata() -> PublishMetadata {
        PublishMetadata {
            name: "Wave".to_string(),
            description: "A wave".to_string(),
            rig_type: Some("R15".to_string()),
            price: None,
            for_sale: false,
            file_name: "Wave_1.rbxm".to_string(),
        }
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/upload", addr)
    }

    #[test]
    fn test_marketplace_url() {
        let reference = AssetReference {
            asset_id: Some("123".to_string()),
        };
        assert_eq!(
            reference.marketplace_url().as_deref(),
            Some("https://create.roblox.com/store/asset/123")
        );
        assert!(AssetReference::default().marketplace_url().is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_publisher_fails() {
        let err = UnconfiguredPublisher
            .publish(Bytes::from_static(b"doc"), &metadata())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Publish(_)));
    }

    #[test]
    fn test_publisher_from_config() {
        let mut config = PublishConfig::default();
        assert_eq!(publisher_from_config(&config).unwrap().name(), "unconfigured");
        config.endpoint = Some("http://127.0.0.1:9/upload".to_string());
        assert_eq!(publisher_from_config(&config).unwrap().name(), "http");
    }

    #[tokio::test]
    async fn test_http_publisher_sends_document() {
        let app = Router::new().route(
            "/upload",
            post(|Json(body): Json<serde_json::Value>| async move {
                let doc = base64::engine::general_purpose::STANDARD
                    .decode(body["document_base64"].as_str().unwrap_or_default())
                    .unwrap_or_default();
                if body["name"] == "Wave" && doc == b"<roblox/>" {
                    Json(serde_json::json!({"asset_id": 987654}))
                } else {
                    Json(serde_json::json!({}))
                }
            }),
        );
        let endpoint = serve(app).await;

        let publisher = HttpPublisher::new(endpoint, Duration::from_secs(5)).unwrap();
        let reference = publisher
            .publish(Bytes::from_static(b"<roblox/>"), &metadata())
            .await
            .unwrap();
        assert_eq!(reference.asset_id.as_deref(), Some("987654"));
    }

    #[tokio::test]
    async fn test_http_publisher_without_asset_id() {
        let app = Router::new().route(
            "/upload",
            post(|| async { Json(serde_json::json!({"status": "queued"})) }),
        );
        let endpoint = serve(app).await;

        let publisher = HttpPublisher::new(endpoint, Duration::from_secs(5)).unwrap();
        let reference = publisher
            .publish(Bytes::from_static(b"doc"), &metadata())
            .await
            .unwrap();
        assert!(reference.asset_id.is_none());
    }

    #[tokio::test]
    async fn test_http_publisher_error_status() {
        let app = Router::new().route(
            "/upload",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let endpoint = serve(app).await;

        let publisher = HttpPublisher::new(endpoint, Duration::from_secs(5)).unwrap();
        let err = publisher
            .publish(Bytes::from_static(b"doc"), &metadata())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Publish(msg) if msg.contains("500")));
    }
}
