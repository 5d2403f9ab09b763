use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Supported protocol versions of the chat service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelVersion {
    #[serde(rename = "1.5")]
    V1_5,
    #[serde(rename = "2.0")]
    V2_0,
    #[default]
    #[serde(rename = "3.0")]
    V3_0,
    #[serde(rename = "3.5")]
    V3_5,
}

impl ModelVersion {
    pub const ALL: [ModelVersion; 4] = [
        ModelVersion::V1_5,
        ModelVersion::V2_0,
        ModelVersion::V3_0,
        ModelVersion::V3_5,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelVersion::V1_5 => "1.5",
            ModelVersion::V2_0 => "2.0",
            ModelVersion::V3_0 => "3.0",
            ModelVersion::V3_5 => "3.5",
        }
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "unsupported model version '{s}' (expected one of 1.5, 2.0, 3.0, 3.5)"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_supported_version() {
        for v in ModelVersion::ALL {
            assert_eq!(v.as_str().parse::<ModelVersion>().unwrap(), v);
        }
    }

    #[test]
    fn rejects_unknown_version() {
        let err = "4.0".parse::<ModelVersion>().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("4.0"));
    }

    #[test]
    fn default_is_three_point_oh() {
        assert_eq!(ModelVersion::default(), ModelVersion::V3_0);
    }

    #[test]
    fn serializes_as_version_string() {
        let json = serde_json::to_string(&ModelVersion::V3_5).unwrap();
        assert_eq!(json, "\"3.5\"");
        let parsed: ModelVersion = serde_json::from_str("\"1.5\"").unwrap();
        assert_eq!(parsed, ModelVersion::V1_5);
    }
}
