// ABOUTME: SSH-specific error types.
// ABOUTME: Covers connection, authentication, identity loading, channel and timeout failures.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The blocking step that ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Authenticate,
    ChannelOpen,
    ChannelClose,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Connect => write!(f, "connect"),
            Stage::Authenticate => write!(f, "authentication"),
            Stage::ChannelOpen => write!(f, "channel open"),
            Stage::ChannelClose => write!(f, "channel close"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },

    #[error("authentication failed: server rejected {method} credentials")]
    AuthenticationFailed { method: &'static str },

    #[error("session is not authenticated")]
    NotAuthenticated,

    #[error("no identity found in {0}")]
    NoIdentityFound(PathBuf),

    #[error("failed to load key from {path}: {reason}")]
    KeyLoadFailed { path: PathBuf, reason: String },

    #[error("failed to open exec channel: {0}")]
    ChannelOpen(String),

    #[error("exec request failed: {0}")]
    ExecRequest(String),

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),
}

impl Error {
    /// Whether this error came from a bounded wait expiring.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
