//! Model selection and sampling parameters.

use serde::{Deserialize, Serialize};
use spark_common::ModelVersion;

/// Model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Protocol version; selects the domain tag and endpoint URL.
    pub version: ModelVersion,
    /// Sampling temperature (valid range: 0.0-1.0).
    pub temperature: f64,
    /// Maximum reply length in tokens (valid range: 1-8192).
    pub max_tokens: u32,
    /// Top-k sampling (valid range: 1-6).
    pub top_k: u32,
    /// Overrides the domain tag derived from `version`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Overrides the endpoint URL derived from `version`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            version: ModelVersion::V3_0,
            temperature: 0.5,
            max_tokens: 4096,
            top_k: 4,
            domain: None,
            url: None,
        }
    }
}
