use crate::schema::SparkConfig;

use super::check_range;

pub(super) fn validate_session(errors: &mut Vec<String>, config: &SparkConfig) {
    let session = &config.session;
    if session.history_budget == 0 {
        errors.push("session.history_budget must be at least 1".into());
    }
    check_range(
        errors,
        "session.response_timeout_secs",
        session.response_timeout_secs,
        1..=3600,
    );
    check_range(
        errors,
        "session.connect_timeout_secs",
        session.connect_timeout_secs,
        1..=300,
    );
    if session.exit_keyword.trim().is_empty() {
        errors.push("session.exit_keyword must not be empty".into());
    }
}
