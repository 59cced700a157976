use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context as _;

use crate::model::ViewerIdentity;

pub const USER_ID_KEY: &str = "userId";
pub const USERNAME_KEY: &str = "username";

pub trait SessionStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> anyhow::Result<BTreeMap<String, String>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("parse {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e).with_context(|| format!("read {}", self.path.display())),
        }
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_vec_pretty(entries).context("encode session")?;
        std::fs::write(&self.path, json).with_context(|| format!("write {}", self.path.display()))
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.read()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        // A corrupt file is replaced rather than blocking a login.
        let mut entries = self.read().unwrap_or_default();
        entries.insert(key.to_string(), value.to_string());
        self.write(&entries)
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self.read().unwrap_or_default();
        if entries.remove(key).is_none() && !self.path.exists() {
            return Ok(());
        }
        self.write(&entries)
    }
}

pub struct Session<S> {
    store: S,
    viewer: Option<ViewerIdentity>,
}

impl<S: SessionStore> Session<S> {
    // Anything other than both keys or neither is cleared.
    pub fn restore(store: S) -> Self {
        let viewer = match load_viewer(&store) {
            Ok(viewer) => viewer,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "stored session is unusable; clearing it");
                if let Err(e) = clear(&store) {
                    tracing::warn!(error = %format!("{e:#}"), "failed to clear stored session");
                }
                None
            }
        };
        if let Some(v) = &viewer {
            tracing::debug!(user_id = v.user_id, username = %v.username, "session restored");
        }
        Self { store, viewer }
    }

    pub fn viewer(&self) -> Option<&ViewerIdentity> {
        self.viewer.as_ref()
    }

    pub fn login(&mut self, viewer: ViewerIdentity) -> anyhow::Result<()> {
        self.store
            .set(USER_ID_KEY, &viewer.user_id.to_string())
            .context("save user id")?;
        self.store
            .set(USERNAME_KEY, &viewer.username)
            .context("save username")?;
        tracing::info!(user_id = viewer.user_id, username = %viewer.username, "logged in");
        self.viewer = Some(viewer);
        Ok(())
    }

    pub fn logout(&mut self) -> anyhow::Result<()> {
        clear(&self.store)?;
        if let Some(v) = self.viewer.take() {
            tracing::info!(username = %v.username, "logged out");
        }
        Ok(())
    }
}

fn load_viewer<S: SessionStore>(store: &S) -> anyhow::Result<Option<ViewerIdentity>> {
    let user_id = store.get(USER_ID_KEY)?;
    let username = store.get(USERNAME_KEY)?;
    match (user_id, username) {
        (None, None) => Ok(None),
        (Some(id), Some(username)) => {
            let user_id = id
                .trim()
                .parse()
                .with_context(|| format!("stored user id {id:?} is not a number"))?;
            Ok(Some(ViewerIdentity { user_id, username }))
        }
        _ => anyhow::bail!("only one of {USER_ID_KEY}/{USERNAME_KEY} is stored"),
    }
}

fn clear<S: SessionStore>(store: &S) -> anyhow::Result<()> {
    store.remove(USER_ID_KEY).context("remove user id")?;
    store.remove(USERNAME_KEY).context("remove username")?;
    Ok(())
}
