//! Validation for configuration values

pub use crate::error::ValidationError;

/// A config section that validates and merges itself
pub trait ConfigSection: Default {
    /// Returns every problem found; `Ok` when valid
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Merges `other` into this section, preferring its values
    fn merge(&mut self, other: Self);

    fn section_name(&self) -> &'static str;
}

/// Common validators for config values
pub struct Validator;

impl Validator {
    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            Err(ValidationError::with_value(
                field,
                format!("must be between {} and {}", min, max),
                value,
            ))
        } else {
            Ok(())
        }
    }

    pub fn not_empty(value: &str, field: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            Err(ValidationError::new(field, "must not be empty"))
        } else {
            Ok(())
        }
    }

    pub fn one_of<T>(value: &T, allowed: &[T], field: &str) -> Result<(), ValidationError>
    where
        T: PartialEq + std::fmt::Display,
    {
        if !allowed.contains(value) {
            let allowed_str = allowed
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            Err(ValidationError::with_value(
                field,
                format!("must be one of: {}", allowed_str),
                value,
            ))
        } else {
            Ok(())
        }
    }

    /// Requires an `http://` or `https://` URL
    pub fn http_url(value: &str, field: &str) -> Result<(), ValidationError> {
        let trimmed = value.trim();
        let has_host = |rest: &str| !rest.is_empty() && !rest.starts_with('/');
        match trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
        {
            Some(rest) if has_host(rest) => Ok(()),
            _ => Err(ValidationError::with_value(
                field,
                "must be an http(s) URL",
                value,
            )),
        }
    }

    /// Environment variable names: letters, digits and underscores, not starting with a digit
    pub fn env_var_name(value: &str, field: &str) -> Result<(), ValidationError> {
        let valid = !value.is_empty()
            && !value.starts_with(|c: char| c.is_ascii_digit())
            && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(())
        } else {
            Err(ValidationError::with_value(
                field,
                "must be a valid environment variable name",
                value,
            ))
        }
    }

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range() {
        assert!(Validator::in_range(50, 0, 100, "test").is_ok());
        assert!(Validator::in_range(100, 0, 100, "test").is_ok());
        assert!(Validator::in_range(101, 0, 100, "test").is_err());
    }

    #[test]
    fn test_not_empty() {
        assert!(Validator::not_empty("Puck", "test").is_ok());
        assert!(Validator::not_empty("   ", "test").is_err());
    }

    #[test]
    fn test_one_of() {
        assert!(Validator::one_of(&1.25, &[1.0, 1.25], "test").is_ok());
        assert!(Validator::one_of(&1.3, &[1.0, 1.25], "test").is_err());
    }

    #[test]
    fn test_http_url() {
        assert!(Validator::http_url("https://generativelanguage.googleapis.com/v1beta", "t").is_ok());
        assert!(Validator::http_url("http://localhost:9000", "t").is_ok());
        assert!(Validator::http_url("ftp://example.com", "t").is_err());
        assert!(Validator::http_url("https://", "t").is_err());
    }

    #[test]
    fn test_env_var_name() {
        assert!(Validator::env_var_name("GEMINI_API_KEY", "t").is_ok());
        assert!(Validator::env_var_name("1KEY", "t").is_err());
        assert!(Validator::env_var_name("MY-KEY", "t").is_err());
        assert!(Validator::env_var_name("", "t").is_err());
    }

    #[test]
    fn test_collect_errors() {
        let results = vec![
            Ok(()),
            Err(ValidationError::new("field1", "error1")),
            Err(ValidationError::new("field2", "error2")),
        ];
        assert_eq!(Validator::collect_errors(results).unwrap_err().len(), 2);
    }
}
