use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::LabError;
use crate::lab::window::ClockTime;

/// Opening hours and capacity of the lab, persisted as a small JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabConfiguration {
    #[schema(value_type = String, example = "08:30")]
    pub inicial_hour: ClockTime,
    #[schema(value_type = String, example = "17:30")]
    pub final_hour: ClockTime,
    #[schema(example = 10)]
    pub max_capacity: u32,
    #[schema(value_type = String, format = "date-time")]
    pub last_updated: DateTime<Utc>,
    #[schema(example = "admin@lab.test", nullable = true)]
    pub updated_by: Option<String>,
}

impl Default for LabConfiguration {
    fn default() -> Self {
        Self {
            inicial_hour: ClockTime::new(8, 30).unwrap_or_default(),
            final_hour: ClockTime::new(17, 30).unwrap_or_default(),
            max_capacity: 10,
            last_updated: Utc::now(),
            updated_by: Some("system".to_string()),
        }
    }
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[schema(example = "08:30")]
    pub inicial_hour: Option<String>,
    #[schema(example = "17:30")]
    pub final_hour: Option<String>,
    #[schema(example = 12)]
    pub max_capacity: Option<i64>,
    #[schema(example = "admin@lab.test")]
    pub updated_by: Option<String>,
}

impl LabConfiguration {
    /// Checks the merged values: a positive capacity and opening before closing.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        if self.max_capacity < 1 {
            problems.push("maxCapacity must be a whole number of at least 1".to_string());
        }
        if self.inicial_hour >= self.final_hour {
            problems.push("inicialHour must be earlier than finalHour".to_string());
        }

        if problems.is_empty() { Ok(()) } else { Err(problems) }
    }

    /// Merges `update` onto this configuration, collecting every problem.
    pub fn apply(&self, update: &ConfigUpdate, now: DateTime<Utc>) -> Result<Self, LabError> {
        let mut errors = Vec::new();
        let mut next = self.clone();

        if let Some(raw) = &update.inicial_hour {
            match raw.parse() {
                Ok(t) => next.inicial_hour = t,
                Err(_) => errors.push("inicialHour must use the HH:MM format (e.g. 08:30)".to_string()),
            }
        }

        if let Some(raw) = &update.final_hour {
            match raw.parse() {
                Ok(t) => next.final_hour = t,
                Err(_) => errors.push("finalHour must use the HH:MM format (e.g. 17:30)".to_string()),
            }
        }

        if let Some(capacity) = update.max_capacity {
            match u32::try_from(capacity) {
                Ok(c) if c >= 1 => next.max_capacity = c,
                _ => errors.push("maxCapacity must be a whole number of at least 1".to_string()),
            }
        }

        if errors.is_empty() {
            if let Err(problems) = next.validate() {
                errors.extend(problems);
            }
        }

        if !errors.is_empty() {
            return Err(LabError::Validation(errors));
        }

        if update.updated_by.is_some() {
            next.updated_by = update.updated_by.clone();
        }
        next.last_updated = now;

        Ok(next)
    }
}

/// Process-wide holder of the current [`LabConfiguration`].
///
/// Readers take an `Arc` snapshot; an update is persisted first and then
/// swapped in whole, so no reader ever sees a half-applied change.
pub struct SettingsStore {
    path: Option<PathBuf>,
    current: RwLock<Arc<LabConfiguration>>,
    writer: Mutex<()>,
}

impl SettingsStore {
    /// Loads the persisted document, creating it with defaults when missing.
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();

        let config = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let config: LabConfiguration = serde_json::from_str(&raw)
                    .map_err(|e| anyhow::anyhow!("Invalid lab settings in {}: {}", path.display(), e))?;
                info!(path = %path.display(), "Lab settings loaded");
                if let Err(problems) = config.validate() {
                    warn!(
                        path = %path.display(),
                        ?problems,
                        "Persisted lab settings are inconsistent"
                    );
                }
                config
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Lab settings not found, writing defaults");
                let config = LabConfiguration::default();
                persist(&path, &config).await?;
                config
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self::with_path(Some(path), config))
    }

    /// A store that never touches disk.
    #[cfg(test)]
    pub fn ephemeral(config: LabConfiguration) -> Self {
        Self::with_path(None, config)
    }

    fn with_path(path: Option<PathBuf>, config: LabConfiguration) -> Self {
        Self {
            path,
            current: RwLock::new(Arc::new(config)),
            writer: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Arc<LabConfiguration> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn update(&self, update: &ConfigUpdate) -> Result<Arc<LabConfiguration>, LabError> {
        // one writer at a time
        let _guard = self.writer.lock().await;

        let next = Arc::new(self.snapshot().apply(update, Utc::now())?);

        if let Some(path) = &self.path {
            persist(path, &next)
                .await
                .map_err(|e| LabError::Internal(format!("Failed to persist lab settings: {e}")))?;
        }

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next.clone();

        info!(
            inicial_hour = %next.inicial_hour,
            final_hour = %next.final_hour,
            max_capacity = next.max_capacity,
            updated_by = ?next.updated_by,
            "Lab settings updated"
        );

        Ok(next)
    }
}

// write-then-rename
async fn persist(path: &Path, config: &LabConfiguration) -> anyhow::Result<()> {
    let raw = serde_json::to_string_pretty(config)?;
    let tmp = path.with_extension("json.tmp");

    tokio::fs::write(&tmp, raw).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
