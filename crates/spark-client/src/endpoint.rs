//! Service endpoints per protocol version.

use spark_common::ModelVersion;

const API_HOST: &str = "wss://spark-api.xf-yun.com";

/// A resolved endpoint: the domain tag sent with every request and the
/// WebSocket URL to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub domain: String,
    pub url: String,
}

impl Endpoint {
    pub fn for_version(version: ModelVersion) -> Self {
        let (domain, path) = match version {
            ModelVersion::V1_5 => ("general", "v1.1"),
            ModelVersion::V2_0 => ("generalv2", "v2.1"),
            ModelVersion::V3_0 => ("generalv3", "v3.1"),
            ModelVersion::V3_5 => ("generalv3.5", "v3.5"),
        };
        Self {
            domain: domain.to_string(),
            url: format!("{API_HOST}/{path}/chat"),
        }
    }

    /// An endpoint not in the built-in table (self-hosted gateway, test server).
    pub fn custom(domain: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            url: url.into(),
        }
    }
}

impl From<ModelVersion> for Endpoint {
    fn from(version: ModelVersion) -> Self {
        Self::for_version(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_version_has_distinct_domain_and_url() {
        let endpoints: Vec<Endpoint> = ModelVersion::ALL
            .into_iter()
            .map(Endpoint::for_version)
            .collect();
        for (i, a) in endpoints.iter().enumerate() {
            for b in &endpoints[i + 1..] {
                assert_ne!(a.domain, b.domain);
                assert_ne!(a.url, b.url);
            }
        }
    }

    #[test]
    fn version_table() {
        let v15 = Endpoint::for_version(ModelVersion::V1_5);
        assert_eq!(v15.domain, "general");
        assert_eq!(v15.url, "wss://spark-api.xf-yun.com/v1.1/chat");

        let v35 = Endpoint::from(ModelVersion::V3_5);
        assert_eq!(v35.domain, "generalv3.5");
        assert_eq!(v35.url, "wss://spark-api.xf-yun.com/v3.5/chat");
    }
}
