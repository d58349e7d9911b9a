//! File-backed datastore for local runs.

use crate::error::{StorageError, StorageResult};
use crate::memory::{MemoryDatastore, Snapshot};
use docstore_core::{
    CommitMode, CommitResult, Datastore, Entity, Key, LookupResult, Mutation, Query, ReadOptions,
    StoreResult, TransactionToken,
};
use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Snapshot format version written by this build.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotFile<'a> {
    format_version: u32,
    snapshot: &'a Snapshot,
}

#[derive(Deserialize)]
struct StoredSnapshot {
    format_version: u32,
    snapshot: Snapshot,
}

/// A [`MemoryDatastore`] persisted to a single CBOR file.
///
/// The whole store is rewritten after every commit that applied mutations:
/// the snapshot goes to `<path>.tmp`, is synced, then renamed over `<path>`.
/// A reader therefore sees either the old or the new file, never a mix.
/// A commit whose snapshot cannot be written is undone and fails with
/// `INTERNAL`.
///
/// While open, the store holds an exclusive advisory lock on `<path>.lock`.
///
/// # Example
///
/// ```no_run
/// use docstore_core::BookRepository;
/// use docstore_core::Book;
/// use docstore_storage::FileDatastore;
/// use std::path::Path;
///
/// let store = FileDatastore::open(Path::new("books.cbor")).unwrap();
/// BookRepository::new(&store).save(Book::new("Mostly Harmless", "Douglas Adams", 1992)).unwrap();
/// ```
#[derive(Debug)]
pub struct FileDatastore {
    path: PathBuf,
    inner: MemoryDatastore,
    persist: Mutex<()>,
    _lock_file: File,
}

impl FileDatastore {
    /// Opens the store at `path`, creating an empty one if the file is absent.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Locked`] if another handle holds the lock
    /// - [`StorageError::Codec`] or [`StorageError::UnsupportedFormat`] if the
    ///   file is not a snapshot this build can read
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let lock_path = sibling(path, "lock");
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                path: path.to_path_buf(),
            });
        }

        let snapshot = read_snapshot(path)?;
        info!(
            path = %path.display(),
            entities = snapshot.entities.len(),
            "file datastore opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            inner: MemoryDatastore::from_snapshot(snapshot),
            persist: Mutex::new(()),
            _lock_file: lock_file,
        })
    }

    /// Returns the snapshot file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the in-memory view.
    #[must_use]
    pub fn memory(&self) -> &MemoryDatastore {
        &self.inner
    }

    /// Writes the current content to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the temp file cannot be written or renamed.
    pub fn flush(&self) -> StorageResult<()> {
        let _guard = self.persist.lock();
        write_snapshot(&self.path, &self.inner.snapshot())
    }
}

fn write_snapshot(path: &Path, snapshot: &Snapshot) -> StorageResult<()> {
    let file = SnapshotFile {
        format_version: FORMAT_VERSION,
        snapshot,
    };

    let tmp_path = sibling(path, "tmp");
    {
        let tmp = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(tmp);
        ciborium::into_writer(&file, &mut writer).map_err(StorageError::codec)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    debug!(
        path = %path.display(),
        entities = snapshot.entities.len(),
        "snapshot written"
    );
    Ok(())
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

fn read_snapshot(path: &Path) -> StorageResult<Snapshot> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Snapshot::default()),
        Err(e) => return Err(e.into()),
    };
    if file.metadata()?.len() == 0 {
        return Ok(Snapshot::default());
    }

    let decoded: StoredSnapshot =
        ciborium::from_reader(BufReader::new(file)).map_err(StorageError::codec)?;
    if decoded.format_version != FORMAT_VERSION {
        return Err(StorageError::UnsupportedFormat {
            found: decoded.format_version,
            expected: FORMAT_VERSION,
        });
    }
    Ok(decoded.snapshot)
}

impl Datastore for FileDatastore {
    fn begin_transaction(&self) -> StoreResult<TransactionToken> {
        self.inner.begin_transaction()
    }

    fn lookup(&self, read: ReadOptions<'_>, keys: &[Key]) -> StoreResult<LookupResult> {
        self.inner.lookup(read, keys)
    }

    fn run_query(&self, read: ReadOptions<'_>, query: &Query) -> StoreResult<Vec<Entity>> {
        self.inner.run_query(read, query)
    }

    fn commit(&self, mode: CommitMode, mutations: Vec<Mutation>) -> StoreResult<CommitResult> {
        let _guard = self.persist.lock();
        self.inner
            .commit_persisted(mode, mutations, &|snapshot| write_snapshot(&self.path, snapshot))
    }

    fn rollback(&self, token: TransactionToken) -> StoreResult<()> {
        self.inner.rollback(token)
    }
}
