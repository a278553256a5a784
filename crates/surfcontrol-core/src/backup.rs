// ── Backup store ──
//
// Timestamped copies of the artifact directory. Each snapshot lives in its
// own directory under the backup root:
//
//   <root>/<id>/MANIFEST   JSON: id, creation time, per-file SHA-256
//   <root>/<id>/files/...  exact copy of the artifact directory
//
// Snapshots are assembled under a `.tmp-*` name and renamed into place, so
// a listed snapshot is always complete.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::fsutil::{self, TreeDigest};
use crate::model::BackupId;

const MANIFEST: &str = "MANIFEST";
const FILES: &str = "files";
const TMP_PREFIX: &str = ".tmp-";

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup I/O failed at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("backup {0} not found")]
    NotFound(BackupId),

    #[error("backup {id} is corrupt: {detail}")]
    Corrupt { id: BackupId, detail: String },

    #[error("backup task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

trait IoContext<T> {
    fn at(self, path: &Path) -> Result<T, BackupError>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T, BackupError> {
        self.map_err(|source| BackupError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    id: BackupId,
    created_at: DateTime<Utc>,
    files: TreeDigest,
}

/// Summary of one stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    pub id: BackupId,
    pub created_at: DateTime<Utc>,
    pub files: usize,
}

/// Snapshot store for one artifact directory.
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
    source: PathBuf,
}

impl BackupStore {
    /// `root` holds the snapshots; `source` is the directory being backed up.
    pub fn new(root: impl Into<PathBuf>, source: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            source: source.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy the current source directory into a new snapshot. A missing
    /// source directory yields an empty snapshot.
    pub fn snapshot(&self) -> Result<BackupId, BackupError> {
        fs::create_dir_all(&self.root).at(&self.root)?;

        let created_at = Utc::now();
        let id = self.fresh_id(created_at);
        let tmp = self
            .root
            .join(format!("{TMP_PREFIX}{}", Uuid::new_v4().simple()));

        if let Err(e) = self.build_snapshot(&tmp, &id, created_at) {
            let _ = fs::remove_dir_all(&tmp);
            return Err(e);
        }
        info!(backup = %id, "snapshot created");
        Ok(id)
    }

    fn build_snapshot(
        &self,
        tmp: &Path,
        id: &BackupId,
        created_at: DateTime<Utc>,
    ) -> Result<(), BackupError> {
        let files_dir = tmp.join(FILES);
        if self.source.exists() {
            fsutil::copy_tree(&self.source, &files_dir).at(&self.source)?;
        } else {
            fs::create_dir_all(&files_dir).at(&files_dir)?;
        }
        let manifest = Manifest {
            id: id.clone(),
            created_at,
            files: fsutil::tree_digest(&files_dir).at(&files_dir)?,
        };
        let manifest_path = tmp.join(MANIFEST);
        let text = serde_json::to_vec_pretty(&manifest)
            .map_err(io::Error::other)
            .at(&manifest_path)?;
        fs::write(&manifest_path, text).at(&manifest_path)?;
        let dest = self.root.join(id.as_str());
        fs::rename(tmp, &dest).at(&dest)
    }

    fn fresh_id(&self, at: DateTime<Utc>) -> BackupId {
        let base = at.format("%Y%m%dT%H%M%S%.6fZ").to_string();
        let mut candidate = base.clone();
        let mut n = 1u32;
        while self.root.join(&candidate).exists() {
            candidate = format!("{base}-{n:03}");
            n += 1;
        }
        BackupId::new(candidate)
    }

    /// Make the source directory an exact copy of snapshot `id`. Files not
    /// in the snapshot are removed. The snapshot's digests are checked
    /// first; a mismatch leaves the source untouched.
    pub fn restore(&self, id: &BackupId) -> Result<(), BackupError> {
        let dir = self.snapshot_dir(id)?;
        let manifest = read_manifest(&dir, id)?;
        let files_dir = dir.join(FILES);
        let actual = fsutil::tree_digest(&files_dir).at(&files_dir)?;
        if actual != manifest.files {
            return Err(BackupError::Corrupt {
                id: id.clone(),
                detail: describe_mismatch(&manifest.files, &actual),
            });
        }

        let staging = fsutil::staging_path(&self.source);
        let result = fsutil::copy_tree(&files_dir, &staging)
            .and_then(|()| fsutil::swap_dir(&self.source, &staging))
            .at(&self.source);
        if result.is_err() {
            let _ = fs::remove_dir_all(&staging);
        }
        result?;
        info!(backup = %id, "snapshot restored");
        Ok(())
    }

    /// Stored snapshots, newest first. Directories without a readable
    /// manifest are skipped.
    pub fn list(&self) -> Result<Vec<BackupInfo>, BackupError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.root).at(&self.root)? {
            let entry = entry.at(&self.root)?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            let id = BackupId::new(name);
            match read_manifest(&entry.path(), &id) {
                Ok(m) => out.push(BackupInfo {
                    id,
                    created_at: m.created_at,
                    files: m.files.len(),
                }),
                Err(e) => warn!(path = %entry.path().display(), error = %e, "skipping unreadable backup"),
            }
        }
        out.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(out)
    }

    /// Keep the newest `keep` snapshots, delete the rest, and sweep
    /// abandoned temporary directories. Returns the removed ids.
    pub fn prune(&self, keep: usize) -> Result<Vec<BackupId>, BackupError> {
        let mut removed = Vec::new();
        for info in self.list()?.into_iter().skip(keep) {
            let dir = self.root.join(info.id.as_str());
            fs::remove_dir_all(&dir).at(&dir)?;
            debug!(backup = %info.id, "pruned snapshot");
            removed.push(info.id);
        }
        if self.root.exists() {
            for entry in fs::read_dir(&self.root).at(&self.root)? {
                let entry = entry.at(&self.root)?;
                if entry.file_name().to_string_lossy().starts_with(TMP_PREFIX) {
                    fs::remove_dir_all(entry.path()).at(&entry.path())?;
                }
            }
        }
        Ok(removed)
    }

    fn snapshot_dir(&self, id: &BackupId) -> Result<PathBuf, BackupError> {
        let valid = !id.as_str().is_empty()
            && !id.as_str().starts_with('.')
            && !id.as_str().contains(['/', '\\']);
        let dir = self.root.join(id.as_str());
        if valid && dir.is_dir() {
            Ok(dir)
        } else {
            Err(BackupError::NotFound(id.clone()))
        }
    }
}

fn read_manifest(dir: &Path, id: &BackupId) -> Result<Manifest, BackupError> {
    let path = dir.join(MANIFEST);
    let text = fs::read(&path).at(&path)?;
    serde_json::from_slice(&text).map_err(|e| BackupError::Corrupt {
        id: id.clone(),
        detail: format!("unreadable manifest: {e}"),
    })
}

fn describe_mismatch(expected: &TreeDigest, actual: &TreeDigest) -> String {
    let changed = expected
        .iter()
        .filter(|(path, digest)| actual.get(*path) != Some(*digest))
        .map(|(path, _)| path.as_str());
    let extra = actual
        .keys()
        .filter(|path| !expected.contains_key(*path))
        .map(String::as_str);
    let paths: Vec<&str> = changed.chain(extra).collect();
    format!("content differs from manifest: {}", paths.join(", "))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn setup() -> (tempfile::TempDir, BackupStore) {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("artifacts");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("mme.yaml"), "mme: v1\n").unwrap();
        let store = BackupStore::new(tmp.path().join("backups"), &source);
        (tmp, store)
    }

    #[test]
    fn snapshot_then_restore_is_exact() {
        let (tmp, store) = setup();
        let source = tmp.path().join("artifacts");
        let before = fsutil::tree_digest(&source).unwrap();
        let id = store.snapshot().unwrap();

        fs::write(source.join("mme.yaml"), "mme: v2\n").unwrap();
        fs::write(source.join("stray.yaml"), "x").unwrap();
        store.restore(&id).unwrap();

        assert_eq!(fsutil::tree_digest(&source).unwrap(), before);
    }

    #[test]
    fn ids_are_unique_and_listed_newest_first() {
        let (_tmp, store) = setup();
        let a = store.snapshot().unwrap();
        let b = store.snapshot().unwrap();
        let c = store.snapshot().unwrap();
        assert!(a < b && b < c);

        let ids: Vec<_> = store.list().unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![c, b, a]);
    }

    #[test]
    fn same_instant_ids_sort_in_creation_order() {
        let (_tmp, store) = setup();
        let at = Utc::now();
        let mut made = Vec::new();
        for _ in 0..12 {
            let id = store.fresh_id(at);
            fs::create_dir_all(store.root().join(id.as_str())).unwrap();
            made.push(id);
        }
        assert!(made[10].as_str().ends_with("-010"));

        let mut sorted = made.clone();
        sorted.sort();
        assert_eq!(sorted, made);
    }

    #[test]
    fn prune_keeps_newest_and_is_idempotent() {
        let (_tmp, store) = setup();
        let ids: Vec<_> = (0..5).map(|_| store.snapshot().unwrap()).collect();
        let removed = store.prune(2).unwrap();
        assert_eq!(removed, vec![ids[2].clone(), ids[1].clone(), ids[0].clone()]);
        assert!(store.prune(2).unwrap().is_empty());
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn prune_sweeps_temporary_directories() {
        let (_tmp, store) = setup();
        store.snapshot().unwrap();
        let abandoned = store.root().join(".tmp-abandoned");
        fs::create_dir_all(abandoned.join(FILES)).unwrap();
        store.prune(10).unwrap();
        assert!(!abandoned.exists());
    }

    #[test]
    fn restore_rejects_tampered_snapshot() {
        let (tmp, store) = setup();
        let id = store.snapshot().unwrap();
        fs::write(
            store.root().join(id.as_str()).join(FILES).join("mme.yaml"),
            "tampered",
        )
        .unwrap();
        fs::write(tmp.path().join("artifacts/mme.yaml"), "current").unwrap();

        assert!(matches!(store.restore(&id), Err(BackupError::Corrupt { .. })));
        assert_eq!(
            fs::read_to_string(tmp.path().join("artifacts/mme.yaml")).unwrap(),
            "current"
        );
    }

    #[test]
    fn unknown_or_escaping_ids_are_not_found() {
        let (_tmp, store) = setup();
        store.snapshot().unwrap();
        for raw in ["20990101T000000.000000Z", "../artifacts", ".tmp-x", ""] {
            assert!(matches!(
                store.restore(&BackupId::new(raw)),
                Err(BackupError::NotFound(_))
            ));
        }
    }

    #[test]
    fn missing_source_snapshots_as_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = BackupStore::new(tmp.path().join("b"), tmp.path().join("absent"));
        let id = store.snapshot().unwrap();
        assert_eq!(store.list().unwrap()[0].files, 0);
        store.restore(&id).unwrap();
        assert!(tmp.path().join("absent").is_dir());
    }
}
