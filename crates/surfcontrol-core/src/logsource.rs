// ── Log sources ──
//
// Incremental readers over the core's log output. Each read returns only
// the complete lines written since the previous read, capped to the most
// recent `tail_lines`.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::model::Component;

/// Rough upper bound on line length, used to cap how much is read from a
/// file that grew a lot between cycles.
const APPROX_LINE_BYTES: u64 = 512;

#[derive(Debug, Error)]
#[error("cannot read log {}: {source}", .path.display())]
pub struct LogSourceError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

#[async_trait]
pub trait LogSource: Send + Sync {
    /// Component whose log this is. An unreadable source marks it down.
    fn component(&self) -> Component;

    /// Complete lines appended since the last call.
    async fn read_new(&mut self) -> Result<Vec<String>, LogSourceError>;
}

// ── File tail ───────────────────────────────────────────────────────

/// Tails a log file by byte offset. Truncation (the file shrinking below
/// the offset) or replacement (a different file at the path, as after
/// rotation) restarts from the beginning.
#[derive(Debug)]
pub struct FileLogSource {
    component: Component,
    path: PathBuf,
    position: Position,
    tail_lines: usize,
}

/// Device and inode of the file last read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileId {
    dev: u64,
    ino: u64,
}

#[cfg(unix)]
fn file_id(meta: &std::fs::Metadata) -> Option<FileId> {
    use std::os::unix::fs::MetadataExt;
    Some(FileId {
        dev: meta.dev(),
        ino: meta.ino(),
    })
}

#[cfg(not(unix))]
fn file_id(_meta: &std::fs::Metadata) -> Option<FileId> {
    None
}

#[derive(Debug, Clone, Copy, Default)]
struct Position {
    offset: u64,
    file: Option<FileId>,
}

impl FileLogSource {
    pub fn new(component: Component, path: impl Into<PathBuf>, tail_lines: usize) -> Self {
        Self {
            component,
            path: path.into(),
            position: Position::default(),
            tail_lines: tail_lines.max(1),
        }
    }

    /// Source for the component's default log file inside `log_dir`.
    pub fn in_dir(component: Component, log_dir: &Path, tail_lines: usize) -> Self {
        Self::new(component, log_dir.join(component.log_file_name()), tail_lines)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LogSource for FileLogSource {
    fn component(&self) -> Component {
        self.component
    }

    async fn read_new(&mut self) -> Result<Vec<String>, LogSourceError> {
        let path = self.path.clone();
        let position = self.position;
        let tail = self.tail_lines;
        let (lines, next) = tokio::task::spawn_blocking(move || read_tail(&path, position, tail))
            .await
            .map_err(io::Error::from)
            .and_then(|r| r)
            .map_err(|source| LogSourceError {
                path: self.path.clone(),
                source,
            })?;
        self.position = next;
        Ok(lines)
    }
}

/// Read complete lines from the previous position on. Returns the lines
/// and the position just past the last newline consumed.
fn read_tail(path: &Path, prev: Position, tail_lines: usize) -> io::Result<(Vec<String>, Position)> {
    let mut file = File::open(path)?;
    let meta = file.metadata()?;
    let len = meta.len();
    let id = file_id(&meta);
    let at = |offset: u64| Position { offset, file: id };

    let replaced = matches!((prev.file, id), (Some(old), Some(new)) if old != new);
    let mut start = if replaced {
        debug!(path = %path.display(), "log replaced, reading from the start");
        0
    } else if len < prev.offset {
        debug!(path = %path.display(), "log shrank, assuming rotation");
        0
    } else {
        prev.offset
    };
    let budget = u64::try_from(tail_lines)
        .unwrap_or(u64::MAX)
        .saturating_mul(APPROX_LINE_BYTES);
    // Skipped ahead: the first line read is probably partial.
    let skipped = len - start > budget;
    if skipped {
        start = len - budget;
    }
    if start == len {
        return Ok((Vec::new(), at(len)));
    }

    file.seek(SeekFrom::Start(start))?;
    let mut buf = Vec::new();
    file.take(len - start).read_to_end(&mut buf)?;

    // Only whole lines; the remainder is read again next time.
    let Some(last_nl) = buf.iter().rposition(|b| *b == b'\n') else {
        return Ok((Vec::new(), at(start)));
    };
    let complete = &buf[..=last_nl];
    let next = start + u64::try_from(complete.len()).unwrap_or(0);

    let text = String::from_utf8_lossy(complete);
    let mut lines: Vec<String> = text.lines().map(str::to_owned).collect();
    if skipped && !lines.is_empty() {
        lines.remove(0);
    }
    if lines.len() > tail_lines {
        lines.drain(..lines.len() - tail_lines);
    }
    Ok((lines, at(next)))
}
