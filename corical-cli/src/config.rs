use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use corical::{ModelCatalog, NormalizationPolicy, Proba};
use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::Level;

const MAX_TOLERANCE: Proba = 1e-2;

/// Service configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// Model name to `.xdsl` file.
    pub models: IndexMap<String, PathBuf>,
    #[serde(default)]
    pub tolerance: Option<Proba>,
    #[serde(default)]
    pub normalization: Option<NormalizationPolicy>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Load configuration from a YAML file on disk. Relative model paths are resolved against
    /// the directory of the configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: ServiceConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        if let Some(base) = path.parent() {
            cfg.resolve_paths(base);
        }
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        if self.models.is_empty() {
            return Err(ValidationError::InvalidField {
                field: "models".to_string(),
                message: "at least one model must be specified".to_string(),
            });
        }
        for (name, path) in &self.models {
            if name.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: "models".to_string(),
                    message: "model name must not be empty".to_string(),
                });
            }
            if path.as_os_str().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: format!("models.{name}"),
                    message: "path must not be empty".to_string(),
                });
            }
        }
        if let Some(tolerance) = self.tolerance {
            if !(tolerance > 0.0 && tolerance <= MAX_TOLERANCE) {
                return Err(ValidationError::InvalidField {
                    field: "tolerance".to_string(),
                    message: format!("tolerance must be in (0, {MAX_TOLERANCE}], got {tolerance}"),
                });
            }
        }
        self.logging.normalize();
        if self.logging.level().is_none() {
            return Err(ValidationError::InvalidField {
                field: "logging.level".to_string(),
                message: format!("unknown level '{}'", self.logging.level),
            });
        }
        Ok(())
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        for path in self.models.values_mut() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Engine configuration shared by every model.
    pub fn engine_config(&self) -> corical::Config {
        let mut config = corical::Config::default();
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(normalization) = self.normalization {
            config.normalization = normalization;
        }
        config
    }

    /// Load every configured model. Any model defect is fatal.
    pub fn load_catalog(&self) -> corical::Result<ModelCatalog> {
        ModelCatalog::load(
            self.models.iter().map(|(n, p)| (n.as_str(), p.as_path())),
            &self.engine_config(),
        )
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.level.trim().is_empty() {
            self.level = default_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
