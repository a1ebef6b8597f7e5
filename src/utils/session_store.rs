use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Instructions are shown again once this many days have passed.
pub const INSTRUCTION_REPEAT_DAYS: f64 = 30.0;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store I/O failed on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("session store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub instructions_seen: BTreeMap<String, DateTime<Utc>>,
}

/// Upstream credentials and per-user UI flags, kept in one JSON file.
/// Loaded once at start-up and written back on every change.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    data: RwLock<SessionData>,
}

impl SessionStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No session store yet, starting empty");
                SessionData::default()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> SessionData {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn token(&self) -> Option<String> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .auth_token
            .clone()
    }

    pub fn set_token(&self, token: String, username: Option<String>) -> Result<(), StoreError> {
        self.update(|d| {
            d.auth_token = Some(token);
            d.username = username;
        })
    }

    pub fn clear_token(&self) -> Result<(), StoreError> {
        self.update(|d| {
            d.auth_token = None;
            d.username = None;
        })
    }

    pub fn instruction_last_seen(&self, key: &str) -> Option<DateTime<Utc>> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .instructions_seen
            .get(key)
            .copied()
    }

    pub fn mark_instruction_seen(&self, key: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.update(|d| {
            d.instructions_seen.insert(key.to_string(), at);
        })
    }

    /// True when never seen, or when the elapsed time rounded up to whole
    /// days reaches [`INSTRUCTION_REPEAT_DAYS`].
    pub fn should_show_instruction(&self, key: &str, now: DateTime<Utc>) -> bool {
        match self.instruction_last_seen(key) {
            None => true,
            Some(last) => {
                let elapsed_days = (now - last).num_milliseconds() as f64 / 86_400_000.0;
                elapsed_days.ceil() >= INSTRUCTION_REPEAT_DAYS
            }
        }
    }

    fn update(&self, f: impl FnOnce(&mut SessionData)) -> Result<(), StoreError> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut data);
        self.save(&data)
    }

    fn save(&self, data: &SessionData) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(data)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "Session store saved");
        Ok(())
    }
}
