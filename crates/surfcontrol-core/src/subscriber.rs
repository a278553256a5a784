// ── Subscriber directory ──
//
// Display names and groups for subscriber identities. The observation
// engine only ever looks entries up; managing them is someone else's job.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::model::Imsi;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("cannot read subscriber file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid subscriber file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[async_trait]
pub trait SubscriberDirectory: Send + Sync {
    async fn find_by_identity(
        &self,
        imsi: &Imsi,
    ) -> Result<Option<SubscriberProfile>, DirectoryError>;
}

// ── In-memory ───────────────────────────────────────────────────────

/// Fixed map of profiles. Empty when no directory is configured.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    entries: HashMap<Imsi, SubscriberProfile>,
}

impl StaticDirectory {
    pub fn new(entries: impl IntoIterator<Item = (Imsi, SubscriberProfile)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }
}

#[async_trait]
impl SubscriberDirectory for StaticDirectory {
    async fn find_by_identity(
        &self,
        imsi: &Imsi,
    ) -> Result<Option<SubscriberProfile>, DirectoryError> {
        Ok(self.entries.get(imsi).cloned())
    }
}

// ── YAML file ───────────────────────────────────────────────────────

/// File layout:
///
/// ```yaml
/// subscribers:
///   - imsi: "315010000000042"
///     name: Camera North
///     group: video
/// ```
#[derive(Debug, Deserialize)]
struct SubscriberFile {
    #[serde(default)]
    subscribers: Vec<SubscriberEntry>,
}

#[derive(Debug, Deserialize)]
struct SubscriberEntry {
    imsi: Imsi,
    #[serde(flatten)]
    profile: SubscriberProfile,
}

/// Directory backed by a YAML file, re-read whenever its modification time
/// changes.
#[derive(Debug)]
pub struct YamlFileDirectory {
    path: PathBuf,
    cache: Mutex<Option<(SystemTime, HashMap<Imsi, SubscriberProfile>)>>,
}

impl YamlFileDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    fn io_err(&self, source: std::io::Error) -> DirectoryError {
        DirectoryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl SubscriberDirectory for YamlFileDirectory {
    async fn find_by_identity(
        &self,
        imsi: &Imsi,
    ) -> Result<Option<SubscriberProfile>, DirectoryError> {
        let modified = tokio::fs::metadata(&self.path)
            .await
            .and_then(|m| m.modified())
            .map_err(|e| self.io_err(e))?;

        let mut cache = self.cache.lock().await;
        let stale = cache.as_ref().is_none_or(|(at, _)| *at != modified);
        if stale {
            let text = tokio::fs::read(&self.path)
                .await
                .map_err(|e| self.io_err(e))?;
            let file: SubscriberFile =
                serde_yaml::from_slice(&text).map_err(|source| DirectoryError::Parse {
                    path: self.path.clone(),
                    source,
                })?;
            debug!(path = %self.path.display(), count = file.subscribers.len(), "loaded subscriber directory");
            let entries = file
                .subscribers
                .into_iter()
                .map(|e| (e.imsi, e.profile))
                .collect();
            *cache = Some((modified, entries));
        }
        Ok(cache
            .as_ref()
            .and_then(|(_, entries)| entries.get(imsi).cloned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn yaml_directory_lookup() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("subscribers.yaml");
        std::fs::write(
            &path,
            "subscribers:\n  - imsi: \"315010000000042\"\n    name: Camera North\n    group: video\n",
        )
        .unwrap();

        let dir = YamlFileDirectory::new(&path);
        let hit = dir
            .find_by_identity(&Imsi::new("315010000000042").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.name.as_deref(), Some("Camera North"));
        assert_eq!(hit.group.as_deref(), Some("video"));

        let miss = dir
            .find_by_identity(&Imsi::new("315010000000043").unwrap())
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn malformed_file_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("subscribers.yaml");
        std::fs::write(&path, "subscribers:\n  - imsi: \"12\"\n").unwrap();
        let dir = YamlFileDirectory::new(&path);
        let err = dir
            .find_by_identity(&Imsi::new("315010000000042").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Parse { .. }));
    }
}
