use anyhow::{Context, Result, bail};

use crate::config::{self, InstallPaths, StoredConfig};
use crate::console::Console;
use crate::secrets;

/// `owner/name` with both parts non-empty.
pub fn validate_repo(repo: &str) -> Result<()> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(())
        }
        _ => bail!("repository must look like 'owner/name', got '{repo}'"),
    }
}

/// Interactive setup. The key file is written first so a half-finished
/// setup never leaves a config without its key.
pub fn run_setup(paths: &InstallPaths, console: &mut dyn Console) -> Result<()> {
    console.say("bold", "Setting up the error reporter...");

    let key_path = paths.key_file();
    let key = secrets::generate_key(&key_path).context("writing encryption key")?;
    console.say("", &format!("Encryption key saved to '{}'.", key_path.display()));

    let token = console.prompt_secret("Enter your GitHub token")?;
    let repo = console.prompt("cyan", "Enter the GitHub repository (format: username/repo)")?;
    let app_name = console.prompt("cyan", "Enter the app name")?;
    let (token, repo, app_name) = (token.trim(), repo.trim(), app_name.trim());

    if token.is_empty() {
        bail!("a GitHub token is required");
    }
    validate_repo(repo)?;

    let sealed = secrets::encrypt(token, &key).context("encrypting token")?;
    let config_path = paths.config_file();
    config::write_stored_config(&config_path, &StoredConfig::initial(app_name, repo, sealed))
        .context("writing configuration")?;
    tracing::info!(path = %config_path.display(), %repo, "configuration written");

    console.say("", &format!("Configuration file saved to '{}'.", config_path.display()));
    console.say("green", "Setup complete!");
    Ok(())
}
