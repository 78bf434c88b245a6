//! Persisted session tokens
//!
//! Tokens live in the same flat `KEY=value` env file the configuration is
//! loaded from, one `ASP_SESSION_ID_<VENUE>` line per venue.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};

/// Durable key/value storage for session tokens
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read a persisted value; `None` when the key is absent or empty
    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one under the same key
    async fn save(&self, key: &str, value: &str) -> Result<()>;
}

/// Store backed by a dotenv-style file
///
/// Lookups read the file first and fall back to the process environment, so
/// a value exported in the shell still works without a file entry.
#[derive(Debug, Clone)]
pub struct EnvFileSessionStore {
    path: PathBuf,
}

impl EnvFileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(&self) -> Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(Error::persist(
                self.path.display().to_string(),
                format!("read failed: {e}"),
            )),
        }
    }
}

#[async_trait]
impl SessionStore for EnvFileSessionStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        let content = self.read_file().await?;

        for item in dotenvy::from_read_iter(content.as_bytes()) {
            let (name, value) = item.map_err(|e| {
                Error::persist(key, format!("{} is malformed: {e}", self.path.display()))
            })?;
            if name == key {
                return Ok(Some(value).filter(|v| !v.is_empty()));
            }
        }

        Ok(std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        let line = format!("{key}={}", quote_value(key, value)?);
        let content = self.read_file().await?;

        let mut replaced = false;
        let mut lines: Vec<String> = content
            .lines()
            .map(|existing| {
                if !replaced && assigns_key(existing, key) {
                    replaced = true;
                    line.clone()
                } else {
                    existing.to_string()
                }
            })
            .collect();

        if !replaced {
            lines.push(line);
        }

        let mut output = lines.join("\n");
        output.push('\n');

        tokio::fs::write(&self.path, output)
            .await
            .map_err(|e| Error::persist(key, format!("write to {} failed: {e}", self.path.display())))?;

        tracing::info!(key, path = %self.path.display(), "Session token persisted");
        Ok(())
    }
}

/// Whether an env-file line assigns `key` (optionally `export`-prefixed)
fn assigns_key(line: &str, key: &str) -> bool {
    let line = line.trim_start();
    let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
    line.strip_prefix(key)
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}

/// Double-quote a value so that dotenv parsing gives it back unchanged
fn quote_value(key: &str, value: &str) -> Result<String> {
    if value.contains(['\n', '\r']) {
        return Err(Error::persist(key, "value contains a line break"));
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Ok(quoted)
}

/// Store kept in memory; nothing survives the process
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    values: RwLock<HashMap<String, String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one value
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            values: RwLock::new(HashMap::from([(key.into(), value.into())])),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().await;
        Ok(values.get(key).filter(|v| !v.is_empty()).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
