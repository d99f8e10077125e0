// ABOUTME: SSH client module for probing servers.
// ABOUTME: Supports password and key-based authentication with bounded waits on every step.

mod client;
mod error;
mod identity;

pub use client::{
    CloseTimeoutPolicy, CommandOutput, Credential, DEFAULT_TIMEOUT, HostKeyPolicy, Session,
    SessionConfig,
};
pub use error::{Error, Result, Stage};
pub use identity::load_identity;
