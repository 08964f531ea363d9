//! Client configuration and presentation context.

use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_LANGUAGE: &str = "Vietnamese";

/// Configuration handed to the client core by the embedding application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the remote service, without a trailing slash.
    pub base_url: String,
    /// Target language for translated product fields.
    pub target_language: String,
}

impl ClientConfig {
    /// Loads configuration from `VISOR_BASE_URL` / `VISOR_LANGUAGE`,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("VISOR_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            target_language: env::var("VISOR_LANGUAGE")
                .unwrap_or_else(|_| DEFAULT_LANGUAGE.to_string()),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.target_language = language.into();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            target_language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Presentation theme. Carried for the host UI, never interpreted by the core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Presentation-layer state threaded through by the embedding UI.
///
/// The core stores and returns this verbatim; no orchestration decision
/// depends on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiContext {
    pub theme: Theme,
    pub sidebar_open: bool,
}
