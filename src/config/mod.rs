// ABOUTME: Configuration types and parsing for sshprobe.yml.
// ABOUTME: Handles YAML parsing, validation, secret resolution, and CLI overrides.

mod auth_method;
mod deserialize;
mod init;
mod secret;
mod target;
mod timeouts;

pub use auth_method::AuthMethod;
pub use init::init_config;
pub use secret::SecretValue;
pub use target::Target;
pub use timeouts::TimeoutsConfig;

use crate::error::{Error, Result};
use crate::ssh::{CloseTimeoutPolicy, Credential, HostKeyPolicy, SessionConfig};
use deserialize::deserialize_commands;
use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "sshprobe.yml";
pub const CONFIG_FILENAME_ALT: &str = "sshprobe.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".sshprobe/config.yml";

pub const GREETING_COMMAND: &str = "echo Hello, World!";
pub const GREETING_EXPECTED: &str = "Hello, World!";
pub const CONTROL_CHARS_COMMAND: &str = r"echo -e 'Line1\nLine2\tTabbed'";
pub const CONTROL_CHARS_EXPECTED: &str = "Line1\nLine2\tTabbed";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub username: String,

    #[serde(default)]
    pub password: Option<SecretValue>,

    #[serde(default, alias = "server_private_key")]
    pub private_key: Option<PathBuf>,

    #[serde(default)]
    pub key_passphrase: Option<SecretValue>,

    pub auth_method: AuthMethod,

    #[serde(default)]
    pub host_key: HostKeyPolicy,

    #[serde(default)]
    pub known_hosts: Option<PathBuf>,

    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    #[serde(default)]
    pub on_close_timeout: CloseTimeoutPolicy,

    #[serde(default = "default_commands", deserialize_with = "deserialize_commands")]
    pub commands: NonEmpty<ProbeCommand>,
}

/// A command to run on the server and the output it should produce.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProbeCommand {
    pub command: String,
    /// Expected output after trailing whitespace is trimmed.
    /// `None` only requires a zero exit status.
    #[serde(default)]
    pub expected: Option<String>,
}

impl ProbeCommand {
    pub fn new(command: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            expected: Some(expected.into()),
        }
    }
}

/// Expand `~/` and make relative paths relative to the config file's directory.
fn resolve_path(path: &Path, base: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME") {
            return Path::new(&home).join(rest);
        }
    }
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    22
}

pub fn default_commands() -> NonEmpty<ProbeCommand> {
    let mut commands = NonEmpty::new(ProbeCommand::new(GREETING_COMMAND, GREETING_EXPECTED));
    commands.push(ProbeCommand::new(
        CONTROL_CHARS_COMMAND,
        CONTROL_CHARS_EXPECTED,
    ));
    commands
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.private_key = config.private_key.map(|key| resolve_path(&key, base));
        config.known_hosts = config.known_hosts.map(|path| resolve_path(&path, base));
        Ok(config)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Check the values that YAML types alone cannot enforce.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::InvalidConfig("username cannot be empty".to_string()));
        }

        if self.host.trim().is_empty() {
            return Err(Error::InvalidConfig("host cannot be empty".to_string()));
        }

        if self.port == 0 {
            return Err(Error::InvalidConfig("port must be between 1 and 65535".to_string()));
        }

        if self.auth_method.uses_password() && self.password.is_none() {
            return Err(Error::InvalidConfig(format!(
                "auth_method {} requires a password",
                self.auth_method
            )));
        }

        if self.auth_method.uses_key() && self.private_key.is_none() {
            return Err(Error::InvalidConfig(format!(
                "auth_method {} requires private_key",
                self.auth_method
            )));
        }

        if let Some(name) = self.timeouts.first_zero() {
            return Err(Error::InvalidConfig(format!(
                "timeouts.{} must be greater than zero",
                name
            )));
        }

        Ok(())
    }

    /// Apply a `[user@]host[:port]` override.
    pub fn with_target(mut self, target: &Target) -> Self {
        self.host = target.host.clone();
        if let Some(port) = target.port {
            self.port = port;
        }
        if let Some(user) = &target.user {
            self.username = user.clone();
        }
        self
    }

    /// Probe with a different method; the config must still carry its credentials.
    pub fn with_auth_method(mut self, method: AuthMethod) -> Result<Self> {
        self.auth_method = method;
        self.validate()?;
        Ok(self)
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::new(&self.host, &self.username)
            .port(self.port)
            .host_key_policy(self.host_key)
            .connect_timeout(self.timeouts.connect)
            .auth_timeout(self.timeouts.auth)
            .channel_open_timeout(self.timeouts.channel_open)
            .close_timeout(self.timeouts.channel_close)
            .close_timeout_policy(self.on_close_timeout);
        if let Some(path) = &self.known_hosts {
            config = config.known_hosts_path(path);
        }
        config
    }

    /// Credentials to probe, password first, resolving env-backed secrets.
    pub fn credentials(&self) -> Result<Vec<Credential>> {
        let mut credentials = Vec::new();

        if self.auth_method.uses_password() {
            let password = self
                .password
                .as_ref()
                .ok_or_else(|| Error::InvalidConfig("password is not configured".to_string()))?;
            credentials.push(Credential::Password(password.resolve()?));
        }

        if self.auth_method.uses_key() {
            let path = self
                .private_key
                .clone()
                .ok_or_else(|| Error::InvalidConfig("private_key is not configured".to_string()))?;
            let passphrase = self
                .key_passphrase
                .as_ref()
                .map(SecretValue::resolve)
                .transpose()?;
            credentials.push(Credential::Key { path, passphrase });
        }

        Ok(credentials)
    }
}
