use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{AppError, AppResult};

/// Keys of the persisted client state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    UserToken,
    AdminToken,
    /// Cached user profile as JSON.
    User,
    /// Page to return to after signing in.
    ReturnUrl,
}

impl StoreKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::UserToken => "token",
            StoreKey::AdminToken => "adminToken",
            StoreKey::User => "user",
            StoreKey::ReturnUrl => "returnUrl",
        }
    }
}

/// Persistent key/value storage for tokens and the cached profile.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: StoreKey) -> AppResult<Option<String>>;
    fn set(&self, key: StoreKey, value: &str) -> AppResult<()>;
    fn remove(&self, key: StoreKey) -> AppResult<()>;

    /// Read and remove in one step.
    fn take(&self, key: StoreKey) -> AppResult<Option<String>> {
        let value = self.get(key)?;
        if value.is_some() {
            self.remove(key)?;
        }
        Ok(value)
    }
}

fn lock_error<T>(_: T) -> AppError {
    AppError::Storage("token store lock poisoned".to_string())
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    values: Mutex<HashMap<StoreKey, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: StoreKey) -> AppResult<Option<String>> {
        Ok(self.values.lock().map_err(lock_error)?.get(&key).cloned())
    }

    fn set(&self, key: StoreKey, value: &str) -> AppResult<()> {
        self.values
            .lock()
            .map_err(lock_error)?
            .insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> AppResult<()> {
        self.values.lock().map_err(lock_error)?.remove(&key);
        Ok(())
    }
}

/// JSON file store, one object keyed like the browser's local storage.
/// Every write rewrites the whole file.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> AppResult<HashMap<String, String>> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, values: &HashMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        // Readers only ever see a complete file.
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, serde_json::to_vec_pretty(values)?)?;
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: StoreKey) -> AppResult<Option<String>> {
        let _guard = self.guard.lock().map_err(lock_error)?;
        Ok(self.load()?.remove(key.as_str()))
    }

    fn set(&self, key: StoreKey, value: &str) -> AppResult<()> {
        let _guard = self.guard.lock().map_err(lock_error)?;
        let mut values = self.load()?;
        values.insert(key.as_str().to_string(), value.to_string());
        self.save(&values)
    }

    fn remove(&self, key: StoreKey) -> AppResult<()> {
        let _guard = self.guard.lock().map_err(lock_error)?;
        let mut values = self.load()?;
        if values.remove(key.as_str()).is_some() {
            self.save(&values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("car-rental-{}", uuid::Uuid::new_v4()))
            .join("session.json")
    }

    #[test]
    fn test_memory_store_take() {
        let store = MemoryTokenStore::new();
        store.set(StoreKey::ReturnUrl, "/user/mybooking").unwrap();

        assert_eq!(
            store.take(StoreKey::ReturnUrl).unwrap().as_deref(),
            Some("/user/mybooking")
        );
        assert_eq!(store.get(StoreKey::ReturnUrl).unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let path = temp_path();
        {
            let store = FileTokenStore::new(&path);
            store.set(StoreKey::UserToken, "u-token").unwrap();
            store.set(StoreKey::AdminToken, "a-token").unwrap();
            store.remove(StoreKey::UserToken).unwrap();
        }

        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.get(StoreKey::UserToken).unwrap(), None);
        assert_eq!(
            reopened.get(StoreKey::AdminToken).unwrap().as_deref(),
            Some("a-token")
        );

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["adminToken"], "a-token");

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_file_store_replaces_file_whole() {
        let path = temp_path();
        let store = FileTokenStore::new(&path);
        store.set(StoreKey::UserToken, "u-token").unwrap();
        std::fs::write(path.with_extension("json.tmp"), b"{\"token\": \"trunc").unwrap();
        store.set(StoreKey::AdminToken, "a-token").unwrap();

        let dir = path.parent().unwrap();
        let names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["session.json".to_string()]);
        assert_eq!(store.get(StoreKey::UserToken).unwrap().as_deref(), Some("u-token"));
        assert_eq!(store.get(StoreKey::AdminToken).unwrap().as_deref(), Some("a-token"));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let store = FileTokenStore::new(temp_path());
        assert_eq!(store.get(StoreKey::User).unwrap(), None);
        store.remove(StoreKey::User).unwrap();
    }
}
