//! Durable slot holding the session token across restarts.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::Context;

/// Single key-value slot for the current token.
pub trait TokenStore: Send + Sync {
    /// Persisted token, if any. Empty content counts as absent.
    fn load(&self) -> anyhow::Result<Option<String>>;
    fn save(&self, token: &str) -> anyhow::Result<()>;
    /// Erase the slot. Succeeds when nothing is stored.
    fn clear(&self) -> anyhow::Result<()>;
}

impl<S> TokenStore for Arc<S>
where
    S: TokenStore + ?Sized,
{
    fn load(&self) -> anyhow::Result<Option<String>> {
        (**self).load()
    }

    fn save(&self, token: &str) -> anyhow::Result<()> {
        (**self).save(token)
    }

    fn clear(&self) -> anyhow::Result<()> {
        (**self).clear()
    }
}

/// File-backed token slot.
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
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> anyhow::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed to read token file {:?}", self.path)),
        }
    }

    fn save(&self, token: &str) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create token directory at {:?}", parent))?;
        }

        // Write then rename so a crash never leaves a truncated token behind.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, token).with_context(|| format!("failed to write token file {:?}", tmp))?;
        restrict_permissions(&tmp)?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to move token file into place at {:?}", self.path))?;
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("failed to remove token file {:?}", self.path)),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("failed to restrict permissions of {:?}", path))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

/// In-memory token slot for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    inner: RwLock<Option<String>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(Some(token.into())),
        }
    }

    /// Current content, without going through the trait.
    pub fn peek(&self) -> Option<String> {
        self.inner.read().ok().and_then(|t| t.clone())
    }
}

impl TokenStore for InMemoryTokenStore {
    fn load(&self) -> anyhow::Result<Option<String>> {
        let slot = self
            .inner
            .read()
            .map_err(|_| anyhow::anyhow!("token slot lock poisoned"))?;
        Ok(slot.clone().filter(|t| !t.is_empty()))
    }

    fn save(&self, token: &str) -> anyhow::Result<()> {
        let mut slot = self
            .inner
            .write()
            .map_err(|_| anyhow::anyhow!("token slot lock poisoned"))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        let mut slot = self
            .inner
            .write()
            .map_err(|_| anyhow::anyhow!("token slot lock poisoned"))?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("octoops-token-test-{}-{}", std::process::id(), name))
            .join("token")
    }

    #[test]
    fn file_store_round_trip_and_idempotent_clear() {
        let path = scratch_path("roundtrip");
        let store = FileTokenStore::new(&path);

        assert_eq!(store.load().unwrap(), None);
        store.save("abc").unwrap();
        assert_eq!(store.load().unwrap(), Some("abc".to_string()));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn whitespace_only_file_is_absent() {
        let path = scratch_path("blank");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, " \n").unwrap();

        assert_eq!(FileTokenStore::new(&path).load().unwrap(), None);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn in_memory_store_treats_empty_as_absent() {
        let store = InMemoryTokenStore::with_token("");
        assert_eq!(store.load().unwrap(), None);
        store.save("t").unwrap();
        assert_eq!(store.peek(), Some("t".to_string()));
        store.clear().unwrap();
        assert_eq!(store.peek(), None);
    }
}
