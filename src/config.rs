//! Application settings loaded from a TOML file
use crate::error::ConfigError;
use crate::workflow::TripStateMachine;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Directory of the sled database holding trips, activity and notifications.
    pub database_path: PathBuf,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct WorkflowConfig {
    /// Shown as the deleting party in trip-deleted notifications.
    #[serde(default = "default_admin_display_name")]
    pub admin_display_name: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            admin_display_name: default_admin_display_name(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_admin_display_name() -> String {
    "Admin".to_string()
}

impl AppConfig {
    pub fn open_database(&self) -> anyhow::Result<Arc<sled::Db>> {
        tracing::info!(path = ?self.database_path, "opening trip database");
        Ok(Arc::new(sled::open(&self.database_path)?))
    }

    pub fn state_machine(&self) -> TripStateMachine {
        TripStateMachine::new().with_admin_display_name(&self.workflow.admin_display_name)
    }

    /// Installs the fmt subscriber with `log_filter` unless `RUST_LOG` is set.
    pub fn init_tracing(&self) {
        crate::utils::init_tracing(&self.log_filter);
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
        path: path_ref.display().to_string(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path_ref.display().to_string(),
        source,
    })
}
