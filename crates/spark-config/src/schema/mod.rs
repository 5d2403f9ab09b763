//! Configuration schema types for spark.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Missing fields fall back to the service defaults.

mod credentials;
mod logging;
mod model;
mod session;

pub use credentials::*;
pub use logging::*;
pub use model::*;
pub use session::*;

use serde::{Deserialize, Serialize};

/// Root configuration for spark.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SparkConfig {
    pub credentials: CredentialsConfig,
    pub model: ModelConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// Tests
// =============================================================================
