// ── Directory helpers ──
//
// Synchronous filesystem primitives shared by the backup store and the
// orchestrator: recursive copy, content digests and rename-based directory
// replacement. Callers run these on the blocking pool.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

const STAGING_MARK: &str = ".staging-";
const RETIRED_MARK: &str = ".old-";

/// Relative path (with `/` separators) → hex SHA-256 of the file content.
pub type TreeDigest = BTreeMap<String, String>;

/// Copy every directory and regular file under `src` into `dst`, creating
/// `dst` if needed. Symlinks are followed.
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        let meta = fs::metadata(entry.path())?;
        if meta.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else if meta.is_file() {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Digest every regular file under `root`.
pub fn tree_digest(root: &Path) -> io::Result<TreeDigest> {
    let mut out = TreeDigest::new();
    digest_into(root, root, &mut out)?;
    Ok(out)
}

fn digest_into(root: &Path, dir: &Path, out: &mut TreeDigest) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let meta = fs::metadata(&path)?;
        if meta.is_dir() {
            digest_into(root, &path, out)?;
        } else if meta.is_file() {
            let bytes = fs::read(&path)?;
            out.insert(relative_name(root, &path), hex::encode(Sha256::digest(&bytes)));
        }
    }
    Ok(())
}

fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ── Directory swap ──────────────────────────────────────────────────

fn sibling(live: &Path, mark: &str) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(live.file_name().unwrap_or_default());
    name.push(mark);
    name.push(Uuid::new_v4().simple().to_string());
    live.with_file_name(name)
}

/// Fresh sibling path to build a replacement for `live` in. Lives on the
/// same filesystem, so the final rename is atomic.
pub fn staging_path(live: &Path) -> PathBuf {
    sibling(live, STAGING_MARK)
}

/// Replace `live` with `staging`.
///
/// `live` is first renamed aside, then `staging` is renamed into place and
/// the old tree is deleted. At every instant either the old or the new
/// tree is reachable, at `live` or at its retired name; [`recover`] puts
/// things right after a crash between the two renames.
pub fn swap_dir(live: &Path, staging: &Path) -> io::Result<()> {
    let retired = sibling(live, RETIRED_MARK);
    let had_live = live.exists();
    if had_live {
        fs::rename(live, &retired)?;
    }
    if let Err(e) = fs::rename(staging, live) {
        if had_live {
            fs::rename(&retired, live)?;
        }
        return Err(e);
    }
    if had_live {
        if let Err(e) = fs::remove_dir_all(&retired) {
            warn!(path = %retired.display(), error = %e, "could not remove retired directory");
        }
    }
    Ok(())
}

/// Clean up after an interrupted [`swap_dir`]: if `live` is missing, the
/// retired tree is moved back; leftover staging and retired trees are
/// removed. Returns `true` when a retired tree was reinstated.
pub fn recover(live: &Path) -> io::Result<bool> {
    let Some(parent) = live.parent().filter(|p| p.exists()) else {
        return Ok(false);
    };
    let mut prefix = OsString::from(".");
    prefix.push(live.file_name().unwrap_or_default());
    let prefix = prefix.to_string_lossy().into_owned();

    let mut reinstated = false;
    for entry in fs::read_dir(parent)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(rest) = name.strip_prefix(&prefix) else {
            continue;
        };
        if rest.starts_with(RETIRED_MARK) && !live.exists() {
            debug!(path = %entry.path().display(), "reinstating retired directory");
            fs::rename(entry.path(), live)?;
            reinstated = true;
        } else if rest.starts_with(RETIRED_MARK) || rest.starts_with(STAGING_MARK) {
            debug!(path = %entry.path().display(), "removing leftover directory");
            fs::remove_dir_all(entry.path())?;
        }
    }
    Ok(reinstated)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn write(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn copy_and_digest_agree() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        write(&src.join("mme.yaml"), "a");
        write(&src.join("nested/extra.yaml"), "b");

        let dst = tmp.path().join("dst");
        copy_tree(&src, &dst).unwrap();

        let digest = tree_digest(&src).unwrap();
        assert_eq!(digest, tree_digest(&dst).unwrap());
        assert!(digest.contains_key("nested/extra.yaml"));
    }

    #[test]
    fn swap_replaces_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let live = tmp.path().join("live");
        write(&live.join("old.yaml"), "old");

        let staging = staging_path(&live);
        write(&staging.join("new.yaml"), "new");

        swap_dir(&live, &staging).unwrap();
        assert!(live.join("new.yaml").exists());
        assert!(!live.join("old.yaml").exists());
        assert!(!staging.exists());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn recover_reinstates_retired_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let live = tmp.path().join("live");
        let retired = tmp.path().join(".live.old-deadbeef");
        write(&retired.join("mme.yaml"), "old");
        write(&tmp.path().join(".live.staging-cafe/mme.yaml"), "half");

        assert!(recover(&live).unwrap());
        assert_eq!(fs::read_to_string(live.join("mme.yaml")).unwrap(), "old");
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn recover_with_live_present_only_cleans() {
        let tmp = tempfile::tempdir().unwrap();
        let live = tmp.path().join("live");
        write(&live.join("mme.yaml"), "new");
        write(&tmp.path().join(".live.old-1/mme.yaml"), "old");

        assert!(!recover(&live).unwrap());
        assert_eq!(fs::read_to_string(live.join("mme.yaml")).unwrap(), "new");
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }
}
