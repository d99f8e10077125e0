// ABOUTME: Diagnostics accumulator for non-fatal warnings during probes.
// ABOUTME: Collects warnings that shouldn't fail a probe but should be shown to users.

use serde::Serialize;

/// Collects non-fatal warnings during probe runs.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during a probe.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Create an SSH disconnect warning.
    pub fn ssh_disconnect(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SshDisconnect,
            message: message.into(),
        }
    }

    /// Create a warning for a command that matched but exited non-zero.
    pub fn nonzero_exit(command: &str, exit_code: u32) -> Self {
        Self {
            kind: WarningKind::NonZeroExit,
            message: format!("`{}` exited with status {}", command, exit_code),
        }
    }

    /// Create a warning for a channel that closed without an exit status.
    pub fn missing_exit_status(command: &str) -> Self {
        Self {
            kind: WarningKind::MissingExitStatus,
            message: format!("`{}` finished without reporting an exit status", command),
        }
    }
}

/// Categories of warnings that can occur during a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Failed to cleanly disconnect SSH session.
    SshDisconnect,
    /// Output matched but the command exited non-zero.
    NonZeroExit,
    /// Channel closed before an exit status arrived.
    MissingExitStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::ssh_disconnect("connection reset"));
        diag.warn(Warning::nonzero_exit("false", 1));

        assert!(diag.has_warnings());
        assert_eq!(diag.warnings().len(), 2);
    }

    #[test]
    fn warning_constructors_set_correct_kind() {
        assert_eq!(
            Warning::ssh_disconnect("test").kind,
            WarningKind::SshDisconnect
        );
        assert_eq!(Warning::nonzero_exit("x", 2).kind, WarningKind::NonZeroExit);
        assert_eq!(
            Warning::missing_exit_status("x").kind,
            WarningKind::MissingExitStatus
        );
    }

    #[test]
    fn nonzero_exit_names_command_and_status() {
        let warning = Warning::nonzero_exit("grep foo", 1);
        assert!(warning.message.contains("grep foo"));
        assert!(warning.message.contains('1'));
    }
}
