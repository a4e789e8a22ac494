//! kfseq - Keyframe Sequence Export Service
//!
//! kfseq turns timed pose keyframes produced by a web animator into Roblox
//! `KeyframeSequence` XML documents. Documents are kept in a short-lived
//! artifact store so the client can download them, or handed to an external
//! publisher.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         HTTP API (axum)                       │
//! │   /health      /export      /download/:id      /publish       │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │
//! ┌──────────────────────────────▼───────────────────────────────┐
//! │                        ExportService                          │
//! │  validate ─▶ encode ─▶ store                 encode ─▶ publish │
//! └───────┬──────────────────────┬──────────────────────┬────────┘
//!         │                      │                      │
//! ┌───────▼────────┐   ┌─────────▼─────────┐   ┌────────▼────────┐
//! │    Encoder     │   │   ArtifactStore   │   │    Publisher    │
//! │ group by 1/100s│   │ ids, expiry sweep │   │ HTTP upload     │
//! │ render XML     │   │ deferred deletes  │   │                 │
//! └────────────────┘   └───────────────────┘   └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`sequence`]: Keyframe types, grouping and document rendering
//! - [`artifact`]: Time-bounded artifact store and its storage backends
//! - [`export`]: Export service, publisher seam and HTTP handlers
//! - [`api`]: Unified HTTP router
//! - [`server`]: Server lifecycle
//! - [`config`]: Configuration management

pub mod api;
pub mod artifact;
pub mod config;
pub mod error;
pub mod export;
pub mod sequence;
pub mod server;

pub use config::KfseqConfig;
pub use error::{Error, Result};
