//! Akamai TF EdgeGrid
//!
//! Credentials loading and request signing for Akamai's EdgeGrid
//! authentication scheme, plus a small JSON client on top of `reqwest`.
//!
//! # Overview
//!
//! - **EdgeGridConfig**: host and client credentials, read from an `.edgerc`
//!   section with `AKAMAI_*` environment overrides
//! - **Signer**: computes the `Authorization` header for one request
//! - **EdgeGridClient**: signs, sends and decodes JSON requests
//!
//! # Example
//!
//! ```ignore
//! use akamai_tf_edgegrid::{EdgeGridClient, EdgeGridConfig};
//!
//! let config = EdgeGridConfig::load(Some("~/.edgerc".as_ref()), "default")?;
//! let client = EdgeGridClient::new(config)?;
//!
//! let activations: serde_json::Value = client
//!     .get("/papi/v1/properties/prp_1/activations", &[])
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod signer;

pub use client::EdgeGridClient;
pub use config::{EdgeGridConfig, ProviderConfig};
pub use error::{EdgeGridError, EdgeGridResult};
pub use signer::Signer;
