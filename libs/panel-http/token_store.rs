//! Bearer token persistence

use crate::error::{HttpError, Result};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Storage key of the persisted token
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Durable home of the auth token
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;

    /// Persist `token`, or clear the stored copy with `None`
    fn save(&self, token: Option<&str>) -> Result<()>;
}

/// Keeps the token in memory only
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.token.lock().clone())
    }

    fn save(&self, token: Option<&str>) -> Result<()> {
        *self.token.lock() = token.map(str::to_string);
        Ok(())
    }
}

/// JSON file holding `{"auth_token": "..."}`
///
/// Other keys in the file are preserved.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(storage_error(&self.path, e)),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(HttpError::Storage(format!(
                "{}: expected a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(storage_error(&self.path, e)),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>> {
        let map = self.read_map()?;
        Ok(map
            .get(AUTH_TOKEN_KEY)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn save(&self, token: Option<&str>) -> Result<()> {
        let mut map = self.read_map()?;
        match token {
            Some(token) => {
                map.insert(AUTH_TOKEN_KEY.to_string(), Value::String(token.to_string()));
            }
            None => {
                map.remove(AUTH_TOKEN_KEY);
            }
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| storage_error(parent, e))?;
        }
        let content = serde_json::to_string_pretty(&Value::Object(map))?;
        std::fs::write(&self.path, content).map_err(|e| storage_error(&self.path, e))?;
        debug!("Auth token persisted to {}", self.path.display());
        Ok(())
    }
}

fn storage_error(path: &Path, err: impl std::fmt::Display) -> HttpError {
    HttpError::Storage(format!("{}: {}", path.display(), err))
}
