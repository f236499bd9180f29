use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_FILE: &str = ".pr-lifetime.toml";
const ENDPOINT_VAR: &str = "PR_LIFETIME_ENDPOINT";
const USER_VAR: &str = "PR_LIFETIME_USER";
const PASSWORD_VAR: &str = "PR_LIFETIME_PASSWORD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("API endpoint not configured (set [api].endpoint or {ENDPOINT_VAR})")]
    MissingEndpoint,
}

/// Top-level configuration loaded from .pr-lifetime.toml.
/// All fields are optional; every stage runs with defaults except a live
/// harvest, which needs an endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base of the REST API, e.g. `https://host/rest/api/1.0/`.
    pub endpoint: Option<String>,
    /// Basic-auth user. PR_LIFETIME_USER overrides it.
    pub user: Option<String>,
    /// Basic-auth password. PR_LIFETIME_PASSWORD overrides it.
    pub password: Option<String>,
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            user: None,
            password: None,
            page_limit: default_page_limit(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Where raw pull requests come from for the harvest stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSourceKind {
    #[default]
    Fetch,
    Cache,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub source: RecordSourceKind,
    #[serde(default = "default_raw_path")]
    pub raw: PathBuf,
    #[serde(default = "default_training_path")]
    pub training: PathBuf,
    #[serde(default = "default_test_path")]
    pub test: PathBuf,
    /// Shuffle seed. None draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source: RecordSourceKind::default(),
            raw: default_raw_path(),
            training: default_training_path(),
            test: default_test_path(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
    #[serde(default = "default_l2")]
    pub l2: f64,
    #[serde(default = "default_max_epochs")]
    pub max_epochs: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            l2: default_l2(),
            max_epochs: default_max_epochs(),
            tolerance: default_tolerance(),
        }
    }
}

fn default_page_limit() -> u32 {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_raw_path() -> PathBuf {
    PathBuf::from("raw.json")
}

fn default_training_path() -> PathBuf {
    PathBuf::from("trainingdata.csv")
}

fn default_test_path() -> PathBuf {
    PathBuf::from("testdata.csv")
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model.json")
}

fn default_l2() -> f64 {
    1e-3
}

fn default_max_epochs() -> usize {
    200
}

fn default_tolerance() -> f64 {
    1e-6
}

/// Resolved basic-auth credentials for the API.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: Option<String>,
}

impl Config {
    /// Load configuration from .pr-lifetime.toml in the current directory.
    /// Returns default config if the file doesn't exist, then applies
    /// environment overrides.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        let config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };
        Ok(config.with_env_overrides())
    }

    /// Apply PR_LIFETIME_ENDPOINT, PR_LIFETIME_USER and PR_LIFETIME_PASSWORD
    /// over whatever the file set.
    pub fn with_env_overrides(self) -> Config {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Environment overrides read through `lookup`, so tests need not touch
    /// the process environment.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Config {
        if let Some(endpoint) = lookup(ENDPOINT_VAR) {
            self.api.endpoint = Some(endpoint);
        }
        if let Some(user) = lookup(USER_VAR) {
            self.api.user = Some(user);
        }
        if let Some(password) = lookup(PASSWORD_VAR) {
            self.api.password = Some(password);
        }
        self
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// The API base with a guaranteed trailing slash, so resource paths can
    /// be appended directly.
    pub fn endpoint(&self) -> Result<String, ConfigError> {
        let endpoint = self
            .api
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or(ConfigError::MissingEndpoint)?;
        if endpoint.ends_with('/') {
            Ok(endpoint.to_string())
        } else {
            Ok(format!("{}/", endpoint))
        }
    }

    /// Basic-auth credentials, if a user is configured.
    pub fn credentials(&self) -> Option<Credentials> {
        self.api.user.clone().map(|user| Credentials {
            user,
            password: self.api.password.clone(),
        })
    }
}
