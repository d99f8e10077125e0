// ABOUTME: Authentication method selector for probes.
// ABOUTME: Parses password, key, and combined selectors into an explicit enum.

use serde::de::{self, Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Which credentials the server is expected to accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Password,
    Key,
    Both,
}

impl AuthMethod {
    pub fn uses_password(self) -> bool {
        matches!(self, AuthMethod::Password | AuthMethod::Both)
    }

    pub fn uses_key(self) -> bool {
        matches!(self, AuthMethod::Key | AuthMethod::Both)
    }
}

impl FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user-pass" | "user-pass-only" | "password" => Ok(AuthMethod::Password),
            "key" | "key-only" | "public-key" => Ok(AuthMethod::Key),
            "user-pass-key" | "key-user-pass" | "both" => Ok(AuthMethod::Both),
            other => Err(format!(
                "unknown auth method: {} (expected user-pass, key, or user-pass-key)",
                other
            )),
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::Password => write!(f, "user-pass"),
            AuthMethod::Key => write!(f, "key"),
            AuthMethod::Both => write!(f, "user-pass-key"),
        }
    }
}

impl<'de> Deserialize<'de> for AuthMethod {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
