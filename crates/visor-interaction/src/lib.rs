//! HTTP interaction layer for the Visor client core.
//!
//! Provides [`ApiClient`], the production implementation of the core's
//! gateway traits against the remote service's REST API, plus the wire DTOs
//! it decodes.

pub mod api_client;
pub mod dto;

pub use api_client::ApiClient;
