use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{ReporterError, Result};
use crate::secrets;

pub const KEY_FILE: &str = "key.key";
pub const CONFIG_FILE: &str = "errorconfig.json";
pub const SETTINGS_FILE: &str = "reporter.toml";

// --- Paths ---------------------------------------------------------------

/// Where the key, config and fallback reports live.
#[derive(Debug, Clone)]
pub struct InstallPaths {
    root: PathBuf,
}

impl InstallPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory containing the running executable.
    pub fn beside_executable() -> anyhow::Result<Self> {
        use anyhow::Context;

        let exe = std::env::current_exe().context("locating the running executable")?;
        let dir = exe
            .parent()
            .context("executable path has no parent directory")?;
        Ok(Self::new(dir))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn key_file(&self) -> PathBuf {
        self.root.join(KEY_FILE)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }
}

// --- Stored config -------------------------------------------------------

/// Style tokens for the themed console output, e.g. `"bold red"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiColors {
    #[serde(default = "default_title_style")]
    pub title: String,
    #[serde(default = "default_text_style")]
    pub text: String,
    #[serde(default = "default_input_style")]
    pub input: String,
}

fn default_title_style() -> String {
    "bold red".to_string()
}

fn default_text_style() -> String {
    "yellow".to_string()
}

fn default_input_style() -> String {
    "cyan".to_string()
}

impl Default for UiColors {
    fn default() -> Self {
        Self {
            title: default_title_style(),
            text: default_text_style(),
            input: default_input_style(),
        }
    }
}

/// On-disk shape of `errorconfig.json`. `github_token` is ciphertext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredConfig {
    pub app_name: String,
    #[serde(default = "default_app_version")]
    pub app_version: String,
    #[serde(default = "default_error_screen_text")]
    pub error_screen_text: String,
    #[serde(default)]
    pub enable_standalone: bool,
    #[serde(default)]
    pub github_repo: String,
    #[serde(default)]
    pub github_token: String,
    #[serde(default)]
    pub ui_colors: UiColors,
}

fn default_app_version() -> String {
    "Unknown".to_string()
}

pub fn default_error_screen_text() -> String {
    "Oops! Something went wrong. Please report this issue.".to_string()
}

impl StoredConfig {
    /// The config written by the setup flow.
    pub fn initial(app_name: &str, github_repo: &str, encrypted_token: String) -> Self {
        Self {
            app_name: app_name.to_string(),
            app_version: "1.0.0".to_string(),
            error_screen_text: default_error_screen_text(),
            enable_standalone: true,
            github_repo: github_repo.to_string(),
            github_token: encrypted_token,
            ui_colors: UiColors::default(),
        }
    }
}

pub fn write_stored_config(path: &Path, config: &StoredConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| ReporterError::InvalidConfiguration(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| ReporterError::io(path, e))
}

// --- Settings ------------------------------------------------------------

/// Optional `reporter.toml` tuning. Every key may be omitted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base: String,
    pub timeout_secs: u64,
    pub env_allow_list: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            timeout_secs: 15,
            env_allow_list: vec!["PATH".to_string(), "LD_LIBRARY_PATH".to_string()],
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn load_settings(path: &Path) -> Result<Settings> {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).map_err(|e| {
            ReporterError::InvalidConfiguration(format!("parsing {}: {e}", path.display()))
        }),
        Err(_) => Ok(Settings::default()),
    }
}

// --- Runtime config ------------------------------------------------------

/// Decrypted tracker token. Never printed.
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

impl Drop for Token {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Validated configuration, built once by [`load`] and read-only afterwards.
#[derive(Debug)]
pub struct ReporterConfig {
    pub app_name: String,
    pub app_version: String,
    pub error_screen_text: String,
    pub enable_standalone: bool,
    pub github_repo: String,
    pub token: Token,
    pub ui_colors: UiColors,
    pub settings: Settings,
}

/// Load the key and config, decrypt the token and validate.
///
/// Fails closed: any missing file, decryption failure or empty required
/// field is an error and nothing else should run.
pub fn load(paths: &InstallPaths) -> Result<ReporterConfig> {
    let key_path = paths.key_file();
    let config_path = paths.config_file();

    let missing: Vec<PathBuf> = [&key_path, &config_path]
        .into_iter()
        .filter(|p| !p.exists())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ReporterError::ConfigurationMissing { missing });
    }

    let key = secrets::load_key(&key_path)?;
    let contents =
        std::fs::read_to_string(&config_path).map_err(|e| ReporterError::io(&config_path, e))?;
    let stored: StoredConfig = serde_json::from_str(&contents).map_err(|e| {
        ReporterError::InvalidConfiguration(format!("parsing {}: {e}", config_path.display()))
    })?;

    if stored.github_token.trim().is_empty() {
        return Err(ReporterError::InvalidConfiguration(format!(
            "GitHub token is not configured in '{CONFIG_FILE}'"
        )));
    }
    let token = Token::new(secrets::decrypt(&stored.github_token, &key)?);

    if token.expose().trim().is_empty() || stored.github_repo.trim().is_empty() {
        return Err(ReporterError::InvalidConfiguration(format!(
            "GitHub token or repository is not configured in '{CONFIG_FILE}'"
        )));
    }

    let settings = load_settings(&paths.settings_file())?;
    tracing::debug!(
        app = %stored.app_name,
        repo = %stored.github_repo,
        api_base = %settings.api_base,
        "configuration loaded"
    );

    Ok(ReporterConfig {
        app_name: stored.app_name,
        app_version: stored.app_version,
        error_screen_text: stored.error_screen_text,
        enable_standalone: stored.enable_standalone,
        github_repo: stored.github_repo.trim().to_string(),
        token,
        ui_colors: stored.ui_colors,
        settings,
    })
}
