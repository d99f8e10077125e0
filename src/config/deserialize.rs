// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles the probe command list in short and detailed forms.

use nonempty::NonEmpty;
use serde::Deserialize;

use super::ProbeCommand;

pub fn deserialize_commands<'de, D>(deserializer: D) -> Result<NonEmpty<ProbeCommand>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<CommandEntry> = Vec::deserialize(deserializer)?;
    let commands = values
        .into_iter()
        .map(|entry| entry.into_probe_command())
        .collect::<Result<Vec<_>, _>>()
        .map_err(serde::de::Error::custom)?;

    NonEmpty::from_vec(commands)
        .ok_or_else(|| serde::de::Error::custom("at least one probe command is required"))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommandEntry {
    /// A bare command string only requires a zero exit status.
    Simple(String),
    Detailed(ProbeCommand),
}

impl CommandEntry {
    fn into_probe_command(self) -> Result<ProbeCommand, String> {
        let command = match self {
            CommandEntry::Simple(command) => ProbeCommand {
                command,
                expected: None,
            },
            CommandEntry::Detailed(command) => command,
        };
        if command.command.trim().is_empty() {
            return Err("probe command cannot be empty".to_string());
        }
        Ok(command)
    }
}
