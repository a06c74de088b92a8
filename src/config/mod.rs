//! Connection configuration for the backup and restore commands.
//!
//! Values are layered, highest precedence first:
//! - Command-line flags and their environment variables
//! - An optional YAML config file (`--config`)
//! - The `project_id` recorded in the service-account file
//!
//! The resulting [`ConnectionConfig`] is built once and opens one store handle.

use firestore_tree::{InMemoryStore, StoreError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable holding the service-account path.
pub const SERVICE_ACCOUNT_ENV: &str = "FIREBASE_SERVICE_ACCOUNT_PATH";
/// Environment variable holding the project ID.
pub const PROJECT_ID_ENV: &str = "FIREBASE_PROJECT_ID";
/// Environment variable holding the datastore file path.
pub const DATASTORE_ENV: &str = "FIRESTORE_DATASTORE_PATH";

pub const DEFAULT_DATASTORE: &str = "firestore-datastore.json";
pub const DEFAULT_BACKUP_DIR: &str = "backups";

/// Configuration failures. All of them are raised before any store access.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Service account path must be provided via --service-account or the FIREBASE_SERVICE_ACCOUNT_PATH environment variable"
    )]
    MissingServiceAccount,

    #[error("Service account file not found: {}", path.display())]
    ServiceAccountNotFound { path: PathBuf },

    #[error("Invalid service account file {}: {reason}", path.display())]
    InvalidServiceAccount { path: PathBuf, reason: String },

    #[error(
        "Project ID must be provided via --project-id, FIREBASE_PROJECT_ID, a config file, or the service account file"
    )]
    MissingProjectId,

    #[error("Failed to load config file {}: {reason}", path.display())]
    InvalidConfigFile { path: PathBuf, reason: String },
}

/// Values given on the command line (or through their environment variables).
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub service_account: Option<PathBuf>,
    pub project_id: Option<String>,
    pub datastore: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
}

/// Optional YAML config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub service_account_path: Option<PathBuf>,
    pub project_id: Option<String>,
    pub datastore: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
    pub batch_size: Option<usize>,
}

impl FileConfig {
    /// Load the config file, or the empty config when no path is given.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfigFile` if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let invalid = |reason: String| ConfigError::InvalidConfigFile {
            path: path.to_path_buf(),
            reason,
        };
        let text = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&text).map_err(|e| invalid(e.to_string()))?;
        debug!("Loaded config file: {}", path.display());
        Ok(config)
    }
}

/// The parts of a service-account key file this tool reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceAccount {
    #[serde(default)]
    pub project_id: Option<String>,
}

impl ServiceAccount {
    /// Read a service-account key file.
    ///
    /// # Errors
    ///
    /// Returns `ServiceAccountNotFound` if the file is missing, or
    /// `InvalidServiceAccount` if it is not a JSON object.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::ServiceAccountNotFound {
                path: path.to_path_buf(),
            });
        }
        let invalid = |reason: String| ConfigError::InvalidServiceAccount {
            path: path.to_path_buf(),
            reason,
        };
        let text = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))
    }
}

/// Fully resolved connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub service_account_path: PathBuf,
    pub project_id: String,
    pub datastore_path: PathBuf,
}

impl ConnectionConfig {
    /// Resolve connection settings from overrides and a loaded config file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the credential file is missing or unreadable,
    /// or no project ID can be determined.
    pub fn resolve(overrides: &ConnectionOverrides, file: &FileConfig) -> Result<Self, ConfigError> {
        let service_account_path = overrides
            .service_account
            .clone()
            .or_else(|| file.service_account_path.clone())
            .ok_or(ConfigError::MissingServiceAccount)?;

        let account = ServiceAccount::load(&service_account_path)?;
        let service_account_path =
            dunce::canonicalize(&service_account_path).unwrap_or(service_account_path);

        let project_id = overrides
            .project_id
            .clone()
            .or_else(|| file.project_id.clone())
            .or(account.project_id)
            .filter(|id| !id.trim().is_empty())
            .ok_or(ConfigError::MissingProjectId)?;

        let datastore_path = overrides
            .datastore
            .clone()
            .or_else(|| file.datastore.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASTORE));

        Ok(Self {
            service_account_path,
            project_id,
            datastore_path,
        })
    }

    /// Load the config file named in `overrides` and resolve against it.
    ///
    /// # Errors
    ///
    /// As [`FileConfig::load`] and [`ConnectionConfig::resolve`].
    pub fn from_overrides(overrides: &ConnectionOverrides) -> Result<(Self, FileConfig), ConfigError> {
        let file = FileConfig::load(overrides.config_file.as_deref())?;
        let config = Self::resolve(overrides, &file)?;
        Ok((config, file))
    }

    /// Open the store handle.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the datastore file cannot be read.
    pub fn connect(&self) -> Result<InMemoryStore, StoreError> {
        let store = InMemoryStore::open(&self.datastore_path, self.project_id.as_str())?;
        info!("Connected to Firestore database: {}", self.project_id);
        Ok(store)
    }
}
