// ABOUTME: Probe runner: connect, authenticate, run commands, compare output, disconnect.
// ABOUTME: One probe per configured auth method, each on a fresh connection.

use crate::config::{Config, ProbeCommand};
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::Result;
use crate::ssh::{self, CommandOutput, Credential, Session};
use async_trait::async_trait;
use tracing::Instrument;

/// Something that can run a command and hand back its merged output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> ssh::Result<CommandOutput>;
}

#[async_trait]
impl CommandRunner for Session {
    async fn run(&self, command: &str) -> ssh::Result<CommandOutput> {
        self.exec(command).await
    }
}

/// Result of running one probe command.
#[derive(Debug, Clone)]
pub struct CommandCheck {
    pub command: String,
    pub expected: Option<String>,
    pub output: CommandOutput,
}

impl CommandCheck {
    /// Output with trailing whitespace removed, as compared against `expected`.
    pub fn actual(&self) -> &str {
        self.output.output.trim_end()
    }

    pub fn passed(&self) -> bool {
        match &self.expected {
            Some(expected) => self.actual() == expected,
            None => self.output.success(),
        }
    }
}

/// Result of one connect/authenticate/execute cycle.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub method: &'static str,
    pub checks: Vec<CommandCheck>,
    pub error: Option<ssh::Error>,
}

impl ProbeOutcome {
    fn new(method: &'static str) -> Self {
        Self {
            method,
            checks: Vec::new(),
            error: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.error.is_none() && self.checks.iter().all(CommandCheck::passed)
    }
}

/// Results of every probe for one target.
#[derive(Debug)]
pub struct ProbeReport {
    pub target: String,
    pub outcomes: Vec<ProbeOutcome>,
    pub diagnostics: Diagnostics,
}

impl ProbeReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(ProbeOutcome::passed)
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.passed()).count()
    }
}

/// Probe every credential the config's auth method selects.
///
/// Each probe runs on its own connection and is independent of the others.
/// Only credential resolution errors are returned; everything else is
/// recorded in the report.
pub async fn run(config: &Config) -> Result<ProbeReport> {
    let credentials = config.credentials()?;
    let mut diagnostics = Diagnostics::default();
    let mut outcomes = Vec::with_capacity(credentials.len());

    for credential in &credentials {
        let span = tracing::info_span!("probe", method = credential.method());
        let outcome = probe(config, credential, &mut diagnostics)
            .instrument(span)
            .await;
        outcomes.push(outcome);
    }

    Ok(ProbeReport {
        target: format!("{}@{}:{}", config.username, config.host, config.port),
        outcomes,
        diagnostics,
    })
}

async fn probe(
    config: &Config,
    credential: &Credential,
    diagnostics: &mut Diagnostics,
) -> ProbeOutcome {
    let mut outcome = ProbeOutcome::new(credential.method());

    let mut session = match Session::connect(config.session_config()).await {
        Ok(session) => session,
        Err(e) => {
            tracing::info!("connect failed: {}", e);
            outcome.error = Some(e);
            return outcome;
        }
    };

    let result = match session.authenticate(credential).await {
        Ok(()) => run_commands(&session, &config.commands, &mut outcome.checks, diagnostics).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        if e.is_timeout() {
            tracing::warn!("probe timed out: {}", e);
        } else {
            tracing::info!("probe failed: {}", e);
        }
        outcome.error = Some(e);
    }

    if let Err(e) = session.disconnect().await {
        diagnostics.warn(Warning::ssh_disconnect(format!(
            "failed to disconnect after {} probe: {}",
            outcome.method, e
        )));
    }

    outcome
}

/// Run commands in order, stopping at the first error or mismatch.
///
/// Checks completed before a stop stay in `checks`.
pub async fn run_commands<'c, R, I>(
    runner: &R,
    commands: I,
    checks: &mut Vec<CommandCheck>,
    diagnostics: &mut Diagnostics,
) -> ssh::Result<()>
where
    R: CommandRunner + ?Sized,
    I: IntoIterator<Item = &'c ProbeCommand>,
{
    for probe in commands {
        let output = runner.run(&probe.command).await?;

        match output.exit_code {
            Some(0) => {}
            Some(code) => diagnostics.warn(Warning::nonzero_exit(&probe.command, code)),
            None => diagnostics.warn(Warning::missing_exit_status(&probe.command)),
        }

        let check = CommandCheck {
            command: probe.command.clone(),
            expected: probe.expected.clone(),
            output,
        };
        let passed = check.passed();
        tracing::debug!(command = %check.command, passed, "command checked");
        checks.push(check);

        if !passed {
            break;
        }
    }

    Ok(())
}

/// Open a session with the first configured credential and run one command.
pub async fn exec_once(config: &Config, command: &str) -> Result<CommandOutput> {
    let credentials = config.credentials()?;
    let credential = credentials.first().ok_or_else(|| {
        crate::error::Error::InvalidConfig("no credentials configured".to_string())
    })?;

    let session = Session::open(config.session_config(), credential).await?;
    let result = session.exec(command).await;

    if let Err(e) = session.disconnect().await {
        tracing::warn!("failed to disconnect: {}", e);
    }

    Ok(result?)
}
