//! Configuration loading from `.env` and the process environment.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::config::schema::{AppConfig, RawEnv};
use crate::config::validation::{validate, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    DotEnv {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("failed to decode environment: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Something that can produce a validated configuration.
///
/// The orchestrator blocks on this before registering anything else.
pub trait ConfigSource {
    fn load(&self) -> Result<AppConfig, ConfigError>;
}

/// Reads an optional `.env` file, then overlays the process environment.
///
/// The process environment is never mutated; variables already set in the
/// environment win over the file.
#[derive(Debug, Clone)]
pub struct EnvSource {
    dotenv_path: Option<PathBuf>,
}

impl EnvSource {
    /// Use `.env` in the working directory.
    pub fn new() -> Self {
        Self::with_dotenv(".env")
    }

    pub fn with_dotenv(path: impl Into<PathBuf>) -> Self {
        Self {
            dotenv_path: Some(path.into()),
        }
    }

    /// Ignore any `.env` file.
    pub fn process_only() -> Self {
        Self { dotenv_path: None }
    }

    fn read_dotenv(path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
        let iter = match dotenvy::from_path_iter(path) {
            Ok(iter) => iter,
            Err(e) if e.not_found() => {
                tracing::debug!(path = %path.display(), "No .env file found");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(ConfigError::DotEnv {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        iter.collect::<Result<Vec<_>, _>>()
            .map_err(|source| ConfigError::DotEnv {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigSource for EnvSource {
    fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut vars: HashMap<String, String> = match &self.dotenv_path {
            Some(path) => Self::read_dotenv(path)?.into_iter().collect(),
            None => HashMap::new(),
        };
        vars.extend(unicode_vars(std::env::vars_os())?);

        load_from_vars(vars)
    }
}

/// Keep the UTF-8 entries of an OS environment.
///
/// Unrelated entries that are not valid Unicode are skipped. A configuration
/// key whose value is not valid Unicode is rejected.
fn unicode_vars<I>(vars: I) -> Result<Vec<(String, String)>, ConfigError>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut decoded = Vec::new();
    let mut errors = Vec::new();

    for (key, value) in vars {
        let Ok(key) = key.into_string() else {
            tracing::debug!("Skipping environment variable with a non-Unicode name");
            continue;
        };
        match value.into_string() {
            Ok(value) => decoded.push((key, value)),
            Err(_) => match RawEnv::KEYS.iter().find(|known| **known == key) {
                Some(known) => errors.push(ValidationError::NotUnicode { key: *known }),
                None => tracing::debug!(key = %key, "Skipping non-Unicode environment variable"),
            },
        }
    }

    if errors.is_empty() {
        Ok(decoded)
    } else {
        Err(ConfigError::Validation(errors))
    }
}

/// A fixed set of key/value pairs, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    vars: HashMap<String, String>,
}

impl StaticSource {
    pub fn new<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ConfigSource for StaticSource {
    fn load(&self) -> Result<AppConfig, ConfigError> {
        load_from_vars(self.vars.clone())
    }
}

/// An already-validated config is its own source.
impl ConfigSource for AppConfig {
    fn load(&self) -> Result<AppConfig, ConfigError> {
        Ok(self.clone())
    }
}

/// Decode and validate a set of environment variables.
pub fn load_from_vars<I>(vars: I) -> Result<AppConfig, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let map: Map<String, Value> = vars
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    let raw: RawEnv = serde_json::from_value(Value::Object(map))?;

    validate(&raw).map_err(ConfigError::Validation)
}
