//! Sampling tunables and endpoint overrides.

use crate::schema::SparkConfig;

use super::check_range;

pub(super) fn validate_model(errors: &mut Vec<String>, config: &SparkConfig) {
    let model = &config.model;
    check_range(errors, "model.temperature", model.temperature, 0.0..=1.0);
    check_range(errors, "model.max_tokens", model.max_tokens, 1..=8192);
    check_range(errors, "model.top_k", model.top_k, 1..=6);

    if let Some(url) = &model.url {
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            errors.push(format!("model.url = {url} must be a ws:// or wss:// URL"));
        }
    }
    if matches!(&model.domain, Some(d) if d.trim().is_empty()) {
        errors.push("model.domain must not be empty".into());
    }
}
