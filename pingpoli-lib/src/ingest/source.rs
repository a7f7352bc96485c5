use std::fs;
use std::path::{Path, PathBuf};
use std::vec;

use tracing::debug;

use crate::ingest::SourceUnit;
use crate::{Error, Result};

/// Source units read from the regular files of one directory.
///
/// One unit per file, identified by its file name. Subdirectories and other
/// non-file entries are skipped. Files are visited in name order so repeated
/// runs insert in the same sequence. Contents are read lazily, one file per
/// call to `next`, and must be UTF-8.
#[derive(Debug)]
pub struct SourceDir {
    dir: PathBuf,
    files: vec::IntoIter<PathBuf>,
}

impl SourceDir {
    /// List the regular files in `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let dir_id = dir.display().to_string();

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| Error::ingestion(&dir_id, e))? {
            let path = entry.map_err(|e| Error::ingestion(&dir_id, e))?.path();
            // follows symlinks, so a link to a regular file counts
            if path.is_file() {
                files.push(path);
            } else {
                debug!(path = %path.display(), "skipping non-file entry");
            }
        }
        files.sort();

        debug!(dir = %dir_id, files = files.len(), "listed source directory");
        Ok(Self {
            dir,
            files: files.into_iter(),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Iterator for SourceDir {
    type Item = Result<SourceUnit>;

    fn next(&mut self) -> Option<Self::Item> {
        self.files.next().map(|path| read_unit(&path))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.files.size_hint()
    }
}

impl ExactSizeIterator for SourceDir {}

fn read_unit(path: &Path) -> Result<SourceUnit> {
    let id = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let bytes = fs::read(path).map_err(|e| Error::ingestion(&id, e))?;
    let text = String::from_utf8(bytes).map_err(|e| Error::ingestion(&id, e))?;

    Ok(SourceUnit { id, text })
}
