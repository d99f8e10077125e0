// ABOUTME: SSH session management using russh.
// ABOUTME: Handles bounded connect, password/key authentication, and merged-output command execution.

use super::error::{Error, Result, Stage};
use super::identity::load_identity;
use russh::client::{self, Config, Handle, Msg};
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, ssh_key};
use russh::{Channel, ChannelMsg, Disconnect};
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default bound for every blocking step.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How the server's host key is verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    /// Accept any host key without checking.
    #[default]
    AcceptAny,
    /// Accept and learn unknown keys, reject changed keys.
    AcceptNew,
    /// Only accept keys already present in known_hosts.
    Strict,
}

/// What to do when a command's channel does not close in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CloseTimeoutPolicy {
    /// Fail with a channel-close timeout.
    #[default]
    Fail,
    /// Return whatever output was captured before the deadline.
    ReturnPartial,
}

/// Configuration for establishing an SSH session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Remote host to connect to.
    pub host: String,
    /// SSH port (default: 22).
    pub port: u16,
    /// Username for authentication.
    pub user: String,
    pub host_key_policy: HostKeyPolicy,
    /// Optional path to known_hosts file.
    /// If None, uses the default ~/.ssh/known_hosts.
    pub known_hosts_path: Option<PathBuf>,
    pub connect_timeout: Duration,
    pub auth_timeout: Duration,
    pub channel_open_timeout: Duration,
    pub close_timeout: Duration,
    pub close_timeout_policy: CloseTimeoutPolicy,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            host_key_policy: HostKeyPolicy::default(),
            known_hosts_path: None,
            connect_timeout: DEFAULT_TIMEOUT,
            auth_timeout: DEFAULT_TIMEOUT,
            channel_open_timeout: DEFAULT_TIMEOUT,
            close_timeout: DEFAULT_TIMEOUT,
            close_timeout_policy: CloseTimeoutPolicy::default(),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = policy;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    pub fn channel_open_timeout(mut self, timeout: Duration) -> Self {
        self.channel_open_timeout = timeout;
        self
    }

    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    pub fn close_timeout_policy(mut self, policy: CloseTimeoutPolicy) -> Self {
        self.close_timeout_policy = policy;
        self
    }
}

/// Identity presented during authentication.
#[derive(Clone)]
pub enum Credential {
    Password(String),
    Key {
        path: PathBuf,
        passphrase: Option<String>,
    },
}

impl Credential {
    pub fn key(path: impl Into<PathBuf>) -> Self {
        Credential::Key {
            path: path.into(),
            passphrase: None,
        }
    }

    /// Short name of the authentication method, for logs and reports.
    pub fn method(&self) -> &'static str {
        match self {
            Credential::Password(_) => "password",
            Credential::Key { .. } => "public key",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password(_) => f.debug_tuple("Password").field(&"<redacted>").finish(),
            Credential::Key { path, passphrase } => f
                .debug_struct("Key")
                .field("path", path)
                .field("passphrase", &passphrase.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

/// Output captured from a remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output and standard error, merged in arrival order.
    pub output: String,
    /// Exit status, if the server reported one before the channel closed.
    pub exit_code: Option<u32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
    known_hosts_path: Option<PathBuf>,
}

impl SshHandler {
    fn new(config: &SessionConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            policy: config.host_key_policy,
            known_hosts_path: config.known_hosts_path.clone(),
        }
    }

    fn learn(&self, server_public_key: &ssh_key::PublicKey) {
        let learn_result = match &self.known_hosts_path {
            Some(path) => learn_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => learn_known_hosts(&self.host, self.port, server_public_key),
        };
        if let Err(e) = learn_result {
            tracing::warn!("Failed to save host key to known_hosts: {}", e);
        }
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        if self.policy == HostKeyPolicy::AcceptAny {
            return Ok(true);
        }

        let check_result = match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match check_result {
            Ok(true) => Ok(true),
            Ok(false) if self.policy == HostKeyPolicy::AcceptNew => {
                tracing::warn!(
                    "Trust-On-First-Use: accepting unknown host key for {}:{}",
                    self.host,
                    self.port
                );
                self.learn(server_public_key);
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(russh::keys::Error::KeyChanged { .. }) => {
                tracing::warn!("host key for {}:{} changed", self.host, self.port);
                Ok(false)
            }
            Err(e) => {
                tracing::debug!("known_hosts check failed: {}", e);
                Ok(self.policy == HostKeyPolicy::AcceptNew)
            }
        }
    }
}

/// Run `fut` under a deadline, reporting expiry as a timeout of `stage`.
async fn bounded<T>(
    stage: Stage,
    after: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout { stage, after }),
    }
}

/// An SSH session, authenticated once [`Session::authenticate`] succeeds.
///
/// Dropping the session tears the connection down; [`Session::disconnect`]
/// does the same with an orderly SSH disconnect message.
pub struct Session {
    config: SessionConfig,
    handle: Handle<SshHandler>,
    authenticated: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("handle", &"<russh::Handle>")
            .field("authenticated", &self.authenticated)
            .finish()
    }
}

impl Session {
    /// Open the transport to the remote host.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let russh_config = Config {
            inactivity_timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        let handler = SshHandler::new(&config);

        tracing::debug!(host = %config.host, port = config.port, user = %config.user, "connecting");

        let connect = async {
            client::connect(
                Arc::new(russh_config),
                (config.host.as_str(), config.port),
                handler,
            )
            .await
            .map_err(|e| connection_error(&config, e))
        };
        let handle = bounded(Stage::Connect, config.connect_timeout, connect).await?;

        Ok(Self {
            config,
            handle,
            authenticated: false,
        })
    }

    /// Connect and authenticate in one step.
    pub async fn open(config: SessionConfig, credential: &Credential) -> Result<Self> {
        let mut session = Self::connect(config).await?;
        session.authenticate(credential).await?;
        Ok(session)
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Authenticate the session with a password or key pair.
    ///
    /// Key pairs are loaded before anything is sent to the server, so a key
    /// file without identities fails without an authentication attempt.
    pub async fn authenticate(&mut self, credential: &Credential) -> Result<()> {
        let user = self.config.user.clone();
        let timeout = self.config.auth_timeout;
        let handle = &mut self.handle;

        let accepted = match credential {
            Credential::Password(password) => {
                bounded(Stage::Authenticate, timeout, async {
                    let result = handle.authenticate_password(user, password.as_str()).await?;
                    Ok::<_, Error>(result.success())
                })
                .await?
            }
            Credential::Key { path, passphrase } => {
                let key = Arc::new(load_identity(path, passphrase.as_deref())?);
                bounded(Stage::Authenticate, timeout, async {
                    let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
                    let result = handle
                        .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key, hash_alg))
                        .await?;
                    Ok::<_, Error>(result.success())
                })
                .await?
            }
        };

        if !accepted {
            tracing::debug!(method = credential.method(), "authentication rejected");
            return Err(Error::AuthenticationFailed {
                method: credential.method(),
            });
        }

        tracing::debug!(method = credential.method(), "authenticated");
        self.authenticated = true;
        Ok(())
    }

    /// Execute a command on the remote host, waiting the configured close timeout.
    pub async fn exec(&self, command: &str) -> Result<CommandOutput> {
        self.exec_with_timeout(command, self.config.close_timeout)
            .await
    }

    /// Execute a command with a custom close timeout.
    pub async fn exec_with_timeout(
        &self,
        command: &str,
        close_timeout: Duration,
    ) -> Result<CommandOutput> {
        if !self.authenticated {
            return Err(Error::NotAuthenticated);
        }

        let open = async {
            self.handle
                .channel_open_session()
                .await
                .map_err(|e| Error::ChannelOpen(e.to_string()))
        };
        let mut channel = bounded(Stage::ChannelOpen, self.config.channel_open_timeout, open).await?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::ExecRequest(e.to_string()))?;

        tracing::debug!(command, "exec request sent");

        let mut capture = Capture::default();
        let drained = tokio::time::timeout(close_timeout, capture.drain(&mut channel)).await;

        if drained.is_err() {
            match self.config.close_timeout_policy {
                CloseTimeoutPolicy::Fail => {
                    return Err(Error::Timeout {
                        stage: Stage::ChannelClose,
                        after: close_timeout,
                    });
                }
                CloseTimeoutPolicy::ReturnPartial => {
                    tracing::warn!(
                        command,
                        captured = capture.buffer.len(),
                        "channel did not close within {:?}, returning partial output",
                        close_timeout
                    );
                }
            }
        }

        Ok(capture.into_output())
    }

    /// Disconnect the session.
    pub async fn disconnect(self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(Error::Protocol)?;
        Ok(())
    }
}

fn connection_error(config: &SessionConfig, e: russh::Error) -> Error {
    match e {
        russh::Error::UnknownKey => Error::Connection(format!(
            "host key for {}:{} was rejected",
            config.host, config.port
        )),
        russh::Error::IO(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
            Error::Connection(format!(
                "connection refused to {}:{}",
                config.host, config.port
            ))
        }
        e => Error::Connection(e.to_string()),
    }
}

/// Shared buffer that stdout and stderr are both written into.
#[derive(Default)]
struct Capture {
    buffer: Vec<u8>,
    exit_code: Option<u32>,
}

impl Capture {
    /// Read channel messages until the channel closes.
    async fn drain(&mut self, channel: &mut Channel<Msg>) {
        let mut got_eof = false;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { data } => {
                    self.buffer.extend_from_slice(&data);
                }
                ChannelMsg::ExtendedData { data, ext } => {
                    if ext == 1 {
                        // stderr
                        self.buffer.extend_from_slice(&data);
                    }
                }
                ChannelMsg::ExitStatus { exit_status } => {
                    self.exit_code = Some(exit_status);
                    if got_eof {
                        break;
                    }
                }
                ChannelMsg::Eof => {
                    got_eof = true;
                    if self.exit_code.is_some() {
                        break;
                    }
                }
                ChannelMsg::Close => break,
                _ => {}
            }
        }
    }

    fn into_output(self) -> CommandOutput {
        CommandOutput {
            output: String::from_utf8_lossy(&self.buffer).into_owned(),
            exit_code: self.exit_code,
        }
    }
}
