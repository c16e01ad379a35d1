use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Path to the SQLite database
    pub database_path: PathBuf,
    /// Shared code required to pair a device. Pairing is open when unset.
    pub pairing_code: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("babysync")
                .join("babysync.db"),
            pairing_code: None,
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    ///
    /// The file is `config_path` if given, then `BABYSYNC_CONFIG`, then
    /// [`Config::default_config_path`]. A missing file is not an error.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var("BABYSYNC_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// Applies `BABYSYNC_*` overrides read through `var`.
    fn apply_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = var("BABYSYNC_HOST") {
            self.host = host;
        }
        if let Some(port) = var("BABYSYNC_PORT") {
            self.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "BABYSYNC_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(db_path) = var("BABYSYNC_DATABASE_PATH") {
            self.database_path = PathBuf::from(db_path);
        }
        if let Some(code) = var("BABYSYNC_PAIRING_CODE") {
            self.pairing_code = Some(code).filter(|c| !c.is_empty());
        }
        Ok(())
    }

    /// Default config file path: <config_dir>/babysync/config.yaml
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("babysync")
            .join("config.yaml")
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue { key: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    e
                )
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "Invalid value for {}: '{}'", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
