//! Validation for configuration values
//!
//! Each config section implements `ConfigSection`; `Validator` holds the
//! shared field checks.

pub use crate::error::ValidationError;

/// A named, self-validating group of settings
pub trait ConfigSection: Default {
    /// Returns every invalid field, or Ok when the section is usable
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Replaces this section's values with `other`'s
    fn merge(&mut self, other: Self);

    fn section_name(&self) -> &'static str;
}

/// Common validators for config values
pub struct Validator;

impl Validator {
    /// Validates that a numeric value is within a range (inclusive)
    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        // Written so NaN fails too
        if value >= min && value <= max {
            Ok(())
        } else {
            Err(ValidationError::with_value(
                field,
                format!("must be between {} and {}", min, max),
                value,
            ))
        }
    }

    pub fn not_empty(value: &str, field: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            Err(ValidationError::new(field, "must not be empty"))
        } else {
            Ok(())
        }
    }

    /// Validates that a string looks like an absolute http(s) URL
    pub fn http_url(value: &str, field: &str) -> Result<(), ValidationError> {
        let rest = value
            .strip_prefix("https://")
            .or_else(|| value.strip_prefix("http://"));
        match rest {
            Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(()),
            _ => Err(ValidationError::with_value(
                field,
                "must be an http:// or https:// URL",
                value,
            )),
        }
    }

    /// Collects multiple validation results into a single result
    pub fn collect_errors(
        results: Vec<Result<(), ValidationError>>,
    ) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = results.into_iter().filter_map(|r| r.err()).collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
