use std::borrow::Cow;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::store::{validate_record, EmbeddingRecord, EmbeddingStore, Scan};
use crate::{Error, Result};

/// Durable embedding store backed by a JSON Lines file.
///
/// One [`EmbeddingRecord`] per line. Inserts append and flush immediately, so
/// a crash loses at most the record being written. `scan` streams the file
/// and never holds more than one record in memory.
///
/// A store created with [`JsonlStore::staged`] writes to a sibling file and
/// only replaces the target on [`commit`](JsonlStore::commit). Use that for
/// rebuilds that other processes may be reading.
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    target: Option<PathBuf>,
    file: File,
    len: usize,
    dimension: Option<usize>,
}

impl JsonlStore {
    /// Open the store at `path`, creating an empty one if missing.
    ///
    /// Existing contents are validated line by line.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        ensure_parent(&path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;
        Self::load(path, file)
    }

    /// Open the store at `path`, failing if it does not exist.
    ///
    /// Nothing is created on disk. Use this for readers, where a missing
    /// store means ingestion never ran.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(Error::Store(format!("{}: no store found", path.display())));
        }

        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;
        Self::load(path, file)
    }

    fn load(path: PathBuf, file: File) -> Result<Self> {
        let mut len = 0;
        let mut dimension = None;
        for record in read_records(&path)? {
            let record = record?;
            validate_record(&record, dimension)
                .map_err(|e| Error::Store(format!("{}: {e}", path.display())))?;
            dimension = Some(record.embedding.len());
            len += 1;
        }

        debug!(path = %path.display(), len, ?dimension, "opened store");
        Ok(Self {
            path,
            target: None,
            file,
            len,
            dimension,
        })
    }

    /// Start an empty store that will replace `path` once committed.
    ///
    /// Until then readers opening `path` keep seeing the previous contents.
    pub fn staged(path: impl AsRef<Path>) -> Result<Self> {
        let target = path.as_ref().to_path_buf();
        ensure_parent(&target)?;

        let staging = staging_path(&target);
        // append mode so that `clear` followed by writes never leaves a hole
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&staging)
            .map_err(|e| io_error(&staging, e))?;
        file.set_len(0).map_err(|e| io_error(&staging, e))?;

        debug!(path = %staging.display(), target = %target.display(), "staging store");
        Ok(Self {
            path: staging,
            target: Some(target),
            file,
            len: 0,
            dimension: None,
        })
    }

    /// Atomically move a staged store over its target path.
    ///
    /// A no-op for stores opened directly.
    pub fn commit(mut self) -> Result<Self> {
        let Some(target) = self.target.take() else {
            return Ok(self);
        };

        self.file.sync_all().map_err(|e| io_error(&self.path, e))?;
        fs::rename(&self.path, &target).map_err(|e| io_error(&target, e))?;

        let file = OpenOptions::new()
            .append(true)
            .open(&target)
            .map_err(|e| io_error(&target, e))?;

        info!(path = %target.display(), records = self.len, "committed store");
        Ok(Self {
            path: target,
            target: None,
            file,
            len: self.len,
            dimension: self.dimension,
        })
    }

    /// Drop a staged store and delete its staging file.
    ///
    /// The target is left untouched. A no-op for stores opened directly.
    pub fn discard(self) -> Result<()> {
        let Self {
            path, target, file, ..
        } = self;
        drop(file);

        if let Some(target) = target {
            fs::remove_file(&path).map_err(|e| io_error(&path, e))?;
            debug!(path = %path.display(), target = %target.display(), "discarded staged store");
        }
        Ok(())
    }

    /// The file currently being read and written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if this store has not been committed yet.
    #[must_use]
    pub fn is_staged(&self) -> bool {
        self.target.is_some()
    }
}

impl EmbeddingStore for JsonlStore {
    fn clear(&mut self) -> Result<()> {
        self.file.set_len(0).map_err(|e| io_error(&self.path, e))?;
        self.len = 0;
        self.dimension = None;
        Ok(())
    }

    fn insert(&mut self, record: EmbeddingRecord) -> Result<()> {
        validate_record(&record, self.dimension)?;

        let mut line = serde_json::to_string(&record)
            .map_err(|e| Error::Store(format!("{}: {e}", record.source_id)))?;
        line.push('\n');
        append_or_rollback(&mut self.file, |file| {
            file.write_all(line.as_bytes())?;
            file.flush()
        })
        .map_err(|e| io_error(&self.path, e))?;

        debug!(source_id = %record.source_id, dim = record.embedding.len(), "insert");
        self.dimension = Some(record.embedding.len());
        self.len += 1;
        Ok(())
    }

    fn scan(&self) -> Result<Scan<'_>> {
        Ok(Box::new(read_records(&self.path)?.map(|r| r.map(Cow::Owned))))
    }

    fn len(&self) -> usize {
        self.len
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

fn read_records(path: &Path) -> Result<impl Iterator<Item = Result<EmbeddingRecord>>> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let path = path.to_path_buf();

    Ok(BufReader::new(file)
        .lines()
        .enumerate()
        .filter_map(move |(i, line)| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(
                serde_json::from_str(&line)
                    .map_err(|e| Error::Store(format!("{}:{}: {e}", path.display(), i + 1))),
            ),
            Err(e) => Some(Err(io_error(&path, e))),
        }))
}

/// Run `write` against `file`, truncating back to the prior length on error
/// so the file never ends in a partial line.
fn append_or_rollback<F>(file: &mut File, write: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let offset = file.metadata()?.len();
    write(&mut *file).inspect_err(|e| {
        if let Err(truncate) = file.set_len(offset) {
            warn!(error = %e, %truncate, offset, "could not roll back partial write");
        }
    })
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".staging");
    target.with_file_name(name)
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))
        }
        _ => Ok(()),
    }
}

fn io_error(path: &Path, e: io::Error) -> Error {
    Error::Store(format!("{}: {e}", path.display()))
}
