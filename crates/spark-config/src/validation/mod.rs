//! Config validation.
//!
//! Every check runs and every failure is reported, so one pass of setup
//! or editing can fix them all.

mod model;
mod session;


use std::fmt::Display;
use std::ops::RangeInclusive;

use crate::schema::SparkConfig;
use spark_common::ConfigError;

/// Validate `config`, joining all failures into one `ValidationError`.
pub fn validate(config: &SparkConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    for field in config.credentials.missing_fields() {
        errors.push(format!("credentials.{field} is required"));
    }
    model::validate_model(&mut errors, config);
    session::validate_session(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

/// Record `name` as out of range unless `range` contains `value`.
/// NaN is never contained.
fn check_range<T>(errors: &mut Vec<String>, name: &str, value: T, range: RangeInclusive<T>)
where
    T: PartialOrd + Display,
{
    if !range.contains(&value) {
        errors.push(format!(
            "{name} = {value} is out of range [{}, {}]",
            range.start(),
            range.end()
        ));
    }
}
