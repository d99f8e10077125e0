// ABOUTME: Config scaffolding for new probe setups.
// ABOUTME: Creates sshprobe.yml template files.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, template_yaml())?;
    tracing::debug!(path = %config_path.display(), "wrote config template");

    Ok(())
}

fn template_yaml() -> String {
    let user = std::env::var("USER").unwrap_or_else(|_| "admin".to_string());
    format!(
        r#"host: localhost
port: 22
username: {user}
# Read the password from the environment instead of storing it here.
password:
  env: SSHPROBE_PASSWORD
private_key: ~/.ssh/id_ed25519
# user-pass, key, or user-pass-key
auth_method: user-pass-key
# accept-any, accept-new, or strict
host_key: accept-any
timeouts:
  connect: 5s
  auth: 5s
  channel_open: 5s
  channel_close: 5s
# fail or return-partial
on_close_timeout: fail
"#
    )
}
