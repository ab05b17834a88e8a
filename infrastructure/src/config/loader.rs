//! Configuration file loader with multi-source merging

use super::file_config::{BackendKind, ConfigError, FileConfig};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::Deserialize;
use std::path::PathBuf;

/// Directory name under the platform config dir.
const APP_DIR: &str = "crs-store";

/// Project-level config file names, checked in order.
const PROJECT_FILES: [&str; 2] = ["crs.toml", ".crs.toml"];

/// Environment variables that override file configuration.
pub const ENV_VARS: [&str; 6] = [
    "DATABASE_BACKEND",
    "DATABASE_URL",
    "GOOGLE_APPLICATION_CREDENTIALS",
    "GOOGLE_CLOUD_PROJECT",
    "SESSION_TIMEOUT",
    "MAX_CONVERSATION_HISTORY",
];

/// Values figment may hand back for a string setting once it has parsed the
/// raw environment text (`GOOGLE_CLOUD_PROJECT=1234` arrives as a number).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EnvText {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl EnvText {
    fn into_string(self) -> String {
        match self {
            EnvText::Text(s) => s,
            EnvText::Int(i) => i.to_string(),
            EnvText::Float(f) => f.to_string(),
            EnvText::Bool(b) => b.to_string(),
        }
    }
}

/// Environment overrides, keyed by lowercased variable name.
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    database_backend: Option<EnvText>,
    database_url: Option<EnvText>,
    google_application_credentials: Option<EnvText>,
    google_cloud_project: Option<EnvText>,
    session_timeout: Option<u64>,
    max_conversation_history: Option<usize>,
}

impl EnvOverrides {
    fn apply(self, config: &mut FileConfig) -> Result<(), Box<figment::Error>> {
        if let Some(backend) = self.database_backend {
            let backend: BackendKind = backend
                .into_string()
                .parse()
                .map_err(|e: ConfigError| Box::new(figment::Error::from(e.to_string())))?;
            config.storage.backend = backend;
        }
        // DATABASE_URL wins over the legacy credentials variable
        if let Some(url) = self
            .database_url
            .or(self.google_application_credentials)
        {
            config.storage.credentials = Some(url.into_string());
        }
        if let Some(project) = self.google_cloud_project {
            config.storage.project_id = project.into_string();
        }
        if let Some(timeout) = self.session_timeout {
            config.session.timeout_secs = timeout;
        }
        if let Some(max) = self.max_conversation_history {
            config.conversation.max_history = max;
        }
        Ok(())
    }
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables ([`ENV_VARS`])
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./crs.toml` or `./.crs.toml`
    /// 4. Global: `$XDG_CONFIG_HOME/crs-store/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(&path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        let mut config: FileConfig = figment.extract().map_err(Box::new)?;
        Self::apply_env(&mut config)?;
        Ok(config)
    }

    /// Defaults plus environment overrides, ignoring every file (for --no-config)
    pub fn load_defaults() -> Result<FileConfig, Box<figment::Error>> {
        let mut config = FileConfig::default();
        Self::apply_env(&mut config)?;
        Ok(config)
    }

    fn apply_env(config: &mut FileConfig) -> Result<(), Box<figment::Error>> {
        let overrides: EnvOverrides = Figment::from(Env::raw().only(&ENV_VARS))
            .extract()
            .map_err(Box::new)?;
        overrides.apply(config)
    }

    /// Get the global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources(explicit: Option<&PathBuf>) {
        println!("Configuration sources (in priority order):");

        let set: Vec<&str> = ENV_VARS
            .iter()
            .copied()
            .filter(|var| std::env::var_os(var).is_some())
            .collect();
        if set.is_empty() {
            println!("  [     ] Env:     none of {}", ENV_VARS.join(", "));
        } else {
            println!("  [FOUND] Env:     {}", set.join(", "));
        }

        if let Some(path) = explicit {
            let mark = if path.exists() { "FOUND" } else { "     " };
            println!("  [{mark}] Explicit: {}", path.display());
        }

        if let Some(path) = Self::project_config_path() {
            println!("  [FOUND] Project: {}", path.display());
        } else {
            println!("  [     ] Project: ./crs.toml or ./.crs.toml");
        }

        if let Some(path) = Self::global_config_path() {
            let mark = if path.exists() { "FOUND" } else { "     " };
            println!("  [{mark}] Global:  {}", path.display());
        }

        println!("  [     ] Default: built-in defaults");
    }
}
