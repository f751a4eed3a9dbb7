//! Persistence for alarm panel state across restarts
//!
//! Implements the hosting framework's `.storage/` directory pattern:
//! one versioned JSON file per panel, written atomically via a temp
//! file and rename. Persistence is advisory: it exists so a panel can
//! restore its last stable state after a restart, with last-write-wins
//! semantics and no transactional guarantees.

use acp_core::{AlarmState, PanelId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Current major version of the persisted layout
pub const STORE_VERSION: u32 = 1;

/// Current minor version of the persisted layout
pub const STORE_MINOR_VERSION: u32 = 1;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("version mismatch for {key}: expected {expected}, found {found}")]
    VersionMismatch {
        key: String,
        expected: u32,
        found: u32,
    },
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// The persisted state of one panel
///
/// `state` and `previous_state` are always stable states; the derived
/// `arming`/`pending` presentation is reconstructed from
/// `transition_started_at` on restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPanelState {
    /// The stable state at the time of the last write
    pub state: AlarmState,

    /// The stable state held before the current transition began
    pub previous_state: AlarmState,

    /// When the current transition began, if one was in progress
    pub transition_started_at: Option<DateTime<Utc>>,
}

/// Versioned on-disk wrapper
///
/// JSON format:
/// ```json
/// {
///   "version": 1,
///   "minor_version": 1,
///   "key": "acp.house",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StorageFile<T> {
    version: u32,
    minor_version: u32,
    key: String,
    data: T,
}

/// Store for panel state files in a `.storage/` directory
#[derive(Debug, Clone)]
pub struct PanelStore {
    storage_dir: PathBuf,
}

impl PanelStore {
    /// Create a new store rooted at the given config directory
    ///
    /// Files live under `<config_dir>/.storage/`.
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            storage_dir: config_dir.as_ref().join(".storage"),
        }
    }

    /// Get the storage directory path
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Get the file path for a panel's state
    pub fn file_path(&self, panel: &PanelId) -> PathBuf {
        self.storage_dir.join(panel.storage_key())
    }

    /// Check whether persisted state exists for a panel
    pub async fn exists(&self, panel: &PanelId) -> bool {
        self.file_path(panel).exists()
    }

    /// Load the persisted state for a panel
    ///
    /// Returns `Ok(None)` when no state has been persisted yet.
    pub async fn load(&self, panel: &PanelId) -> StoreResult<Option<StoredPanelState>> {
        let path = self.file_path(panel);

        if !path.exists() {
            debug!(panel = %panel, "no persisted panel state");
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let file: StorageFile<StoredPanelState> = serde_json::from_str(&content)?;

        if file.version != STORE_VERSION {
            return Err(StoreError::VersionMismatch {
                key: file.key,
                expected: STORE_VERSION,
                found: file.version,
            });
        }

        debug!(panel = %panel, state = %file.data.state, "loaded persisted panel state");
        Ok(Some(file.data))
    }

    /// Save the state for a panel
    ///
    /// Writes atomically: serialize to a temp file, then rename.
    pub async fn save(&self, panel: &PanelId, state: &StoredPanelState) -> StoreResult<()> {
        if !self.storage_dir.exists() {
            fs::create_dir_all(&self.storage_dir).await?;
            debug!("created storage directory: {:?}", self.storage_dir);
        }

        let file = StorageFile {
            version: STORE_VERSION,
            minor_version: STORE_MINOR_VERSION,
            key: panel.storage_key(),
            data: state.clone(),
        };

        let path = self.file_path(panel);
        let temp_path = self.storage_dir.join(format!("{}.tmp", panel.storage_key()));

        let content = serde_json::to_string_pretty(&file)?;
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &path).await?;

        debug!(panel = %panel, state = %state.state, "saved panel state");
        Ok(())
    }

    /// Delete the persisted state for a panel
    pub async fn delete(&self, panel: &PanelId) -> StoreResult<()> {
        let path = self.file_path(panel);
        if path.exists() {
            fs::remove_file(&path).await?;
            debug!(panel = %panel, "deleted persisted panel state");
        }
        Ok(())
    }
}
