//! Environment variable expansion for configuration strings.
//!
//! Supports:
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default

use crate::ConfigError;

/// Expand environment variable references in a string.
///
/// Returns the original string unchanged if no `${}` patterns are present.
/// Bare `$VAR` syntax is not expanded (only `${VAR}` with braces).
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, LookupError> {
        match std::env::var(var) {
            Ok(val) => Ok(Some(val)),
            Err(_) => Err(LookupError {
                var_name: var.to_owned(),
            }),
        }
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{0}}} not set", e.cause.var_name),
    })
}

/// Expand an optional string in place.
pub(crate) fn expand_opt(value: &mut Option<String>, field: &str) -> Result<(), ConfigError> {
    if let Some(inner) = value.as_deref() {
        let expanded = expand_env(inner, field)?;
        *value = Some(expanded).filter(|v| !v.is_empty());
    }
    Ok(())
}

/// Error returned when environment variable lookup fails.
struct LookupError {
    var_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_simple_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("RECSITE_TEST_SIMPLE", "meetings");
        }
        let result = expand_env("${RECSITE_TEST_SIMPLE}", "catalog.table").unwrap();
        assert_eq!(result, "meetings");
        unsafe {
            std::env::remove_var("RECSITE_TEST_SIMPLE");
        }
    }

    #[test]
    fn test_expand_with_default_uses_default() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("RECSITE_TEST_UNSET");
        }
        let result = expand_env("${RECSITE_TEST_UNSET:-us-east-1}", "aws.region").unwrap();
        assert_eq!(result, "us-east-1");
    }

    #[test]
    fn test_expand_missing_var_error() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("RECSITE_TEST_MISSING");
        }
        let err = expand_env("${RECSITE_TEST_MISSING}", "site.bucket").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("RECSITE_TEST_MISSING"));
        assert!(err.to_string().contains("site.bucket"));
    }

    #[test]
    fn test_expand_embedded_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("RECSITE_TEST_ACCOUNT", "123456789012");
        }
        let result = expand_env(
            "arn:aws:sqs:us-east-1:${RECSITE_TEST_ACCOUNT}:webbuilder",
            "queue.arn",
        )
        .unwrap();
        assert_eq!(result, "arn:aws:sqs:us-east-1:123456789012:webbuilder");
        unsafe {
            std::env::remove_var("RECSITE_TEST_ACCOUNT");
        }
    }

    #[test]
    fn test_expand_opt_empty_becomes_none() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("RECSITE_TEST_ENDPOINT");
        }
        let mut value = Some("${RECSITE_TEST_ENDPOINT:-}".to_owned());
        expand_opt(&mut value, "aws.endpoint").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_literal_unchanged() {
        assert_eq!(expand_env("$VAR", "x").unwrap(), "$VAR");
        assert_eq!(expand_env("plain", "x").unwrap(), "plain");
    }
}
