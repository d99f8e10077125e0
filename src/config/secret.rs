// ABOUTME: Secret values that may be read from the environment.
// ABOUTME: Keeps passwords out of config files and out of Debug output.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SecretValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl SecretValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            SecretValue::Literal(s) => Ok(s.clone()),
            SecretValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretValue::Literal(_) => f.write_str("Literal(<redacted>)"),
            SecretValue::FromEnv { var, .. } => f.debug_struct("FromEnv").field("env", var).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_resolves_to_itself() {
        let value = SecretValue::Literal("hunter2".to_string());
        assert_eq!(value.resolve().unwrap(), "hunter2");
    }

    #[test]
    fn env_reference_reads_variable() {
        let value = SecretValue::FromEnv {
            var: "SSHPROBE_TEST_SECRET".to_string(),
            default: None,
        };
        temp_env::with_var("SSHPROBE_TEST_SECRET", Some("from-env"), || {
            assert_eq!(value.resolve().unwrap(), "from-env");
        });
    }

    #[test]
    fn env_reference_falls_back_to_default() {
        let value = SecretValue::FromEnv {
            var: "SSHPROBE_TEST_UNSET".to_string(),
            default: Some("fallback".to_string()),
        };
        temp_env::with_var_unset("SSHPROBE_TEST_UNSET", || {
            assert_eq!(value.resolve().unwrap(), "fallback");
        });
    }

    #[test]
    fn missing_env_without_default_errors() {
        let value = SecretValue::FromEnv {
            var: "SSHPROBE_TEST_MISSING".to_string(),
            default: None,
        };
        temp_env::with_var_unset("SSHPROBE_TEST_MISSING", || {
            let err = value.resolve().unwrap_err();
            assert!(matches!(err, Error::MissingEnvVar(ref v) if v == "SSHPROBE_TEST_MISSING"));
        });
    }

    #[test]
    fn debug_hides_literal() {
        let value = SecretValue::Literal("hunter2".to_string());
        assert!(!format!("{:?}", value).contains("hunter2"));
    }
}
