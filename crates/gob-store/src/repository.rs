//! # Repository
//!
//! A versioned, sharded, content-addressed block store on the local
//! filesystem:
//!
//! ```text
//! <root>/
//!   version          4-byte big-endian format version
//!   <2 hex chars>/   one shard per first digest byte, created on demand
//!     <62 hex chars> one file per block, named by the digest's hex tail
//! ```
//!
//! ## Integrity Invariant
//!
//! A block file only ever appears under its final name once its content is
//! fully written. `put` writes to a create-exclusive temporary file inside
//! the shard and then moves it into place without clobbering. A crash leaves
//! at most an orphaned `*.tmp` file, which is never addressable and which
//! `fsck` reports.
//!
//! Reads do not re-verify digests; that is the scanner's job.
//!
//! ## Concurrency
//!
//! The shard cache is private to one `Repository` value. Several processes
//! may share one store on disk: every mutation relies on filesystem
//! atomicity (exclusive create, no-clobber rename) rather than locks, and
//! two writers racing on identical content both end in the same state.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use gob_core::{Digest, ShardId, HASH_LEN, SHARD_COUNT};
use tempfile::NamedTempFile;

use crate::config::MAX_BLOCK_LEN;
use crate::error::StoreError;

/// The on-disk format version this build reads and writes.
pub const STORE_VERSION: u32 = 1;

/// Name of the version file in the store root.
pub const VERSION_FILE: &str = "version";

/// A content-addressed block store rooted at a directory.
#[derive(Debug)]
pub struct Repository {
    root: PathBuf,
    version: u32,
    /// Shard directories known to exist, indexed by [`ShardId::index`].
    shards: Box<[Option<PathBuf>; SHARD_COUNT]>,
}

impl Repository {
    /// Create a new, empty store at `path`.
    ///
    /// The directory is created together with its version file. No shard
    /// directories are created; they appear on the first write into them.
    ///
    /// # Errors
    ///
    /// [`StoreError::AlreadyExists`] if anything exists at `path`.
    pub fn init(path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        if fs::symlink_metadata(path).is_ok() {
            return Err(StoreError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }

        match fs::create_dir(path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(StoreError::io_at(path)(e)),
        }

        let version_path = path.join(VERSION_FILE);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&version_path)
            .map_err(StoreError::io_at(&version_path))?;
        file.write_all(&STORE_VERSION.to_be_bytes())
            .and_then(|()| file.sync_all())
            .map_err(StoreError::io_at(&version_path))?;

        tracing::info!(
            root = %path.display(),
            version = STORE_VERSION,
            hash_len = HASH_LEN,
            "initialized store"
        );
        Ok(())
    }

    /// Open an existing store.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if `path` does not exist.
    /// - [`StoreError::NotADirectory`] if it is not a directory.
    /// - [`StoreError::MissingVersion`] / [`StoreError::CorruptVersion`] if
    ///   the version file is absent or not four bytes.
    /// - [`StoreError::VersionMismatch`] if the version is not
    ///   [`STORE_VERSION`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        let meta = match fs::metadata(&root) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound { path: root });
            }
            Err(e) => return Err(StoreError::io_at(root)(e)),
        };
        if !meta.is_dir() {
            return Err(StoreError::NotADirectory { path: root });
        }

        let version = read_version(&root.join(VERSION_FILE))?;
        if version != STORE_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: STORE_VERSION,
                found: version,
            });
        }

        tracing::info!(root = %root.display(), version, "opened store");
        Ok(Self {
            root,
            version,
            shards: Box::new(std::array::from_fn(|_| None)),
        })
    }

    /// Store a block and return its digest.
    ///
    /// Storing content that is already present is a successful no-op: names
    /// are derived from content, so an existing file already holds the same
    /// bytes.
    pub fn put(&mut self, data: &[u8]) -> Result<Digest, StoreError> {
        let digest = Digest::compute(data);
        if data.len() > MAX_BLOCK_LEN {
            return Err(StoreError::BlockTooLarge {
                digest,
                len: data.len() as u64,
                max: MAX_BLOCK_LEN as u64,
            });
        }

        let shard_dir = self.shard_dir(digest.shard(), true)?;
        let final_path = shard_dir.join(digest.tail());

        if fs::symlink_metadata(&final_path).is_ok() {
            tracing::debug!(block = %digest, "block already stored");
            return Ok(digest);
        }

        let tmp = write_temporary(&shard_dir, &digest, data)?;
        persist_block(tmp, &final_path, &digest)?;
        Ok(digest)
    }

    /// Read a block's full contents.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ShardNotFound`] if the block's shard does not exist.
    /// - [`StoreError::BlockNotFound`] if the shard has no such block.
    /// - [`StoreError::BlockTooLarge`] if the file exceeds
    ///   [`MAX_BLOCK_LEN`].
    pub fn get(&mut self, digest: &Digest) -> Result<Vec<u8>, StoreError> {
        let shard_dir = self.shard_dir(digest.shard(), false)?;
        let path = shard_dir.join(digest.tail());

        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::BlockNotFound {
                    digest: digest.clone(),
                });
            }
            Err(e) => return Err(StoreError::io_at(path)(e)),
        };

        let len = file
            .metadata()
            .map_err(StoreError::io_at(&path))?
            .len();
        if len > MAX_BLOCK_LEN as u64 {
            return Err(StoreError::BlockTooLarge {
                digest: digest.clone(),
                len,
                max: MAX_BLOCK_LEN as u64,
            });
        }

        let mut data = Vec::with_capacity(len as usize);
        file.read_to_end(&mut data)
            .map_err(StoreError::io_at(&path))?;

        tracing::debug!(block = %digest, len = data.len(), "fetched block");
        Ok(data)
    }

    /// Whether a block with this digest is present.
    pub fn contains(&self, digest: &Digest) -> bool {
        fs::symlink_metadata(self.block_path(digest)).is_ok()
    }

    /// Where the block with this digest lives (or would live).
    pub fn block_path(&self, digest: &Digest) -> PathBuf {
        self.root
            .join(digest.shard().name())
            .join(digest.tail())
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Format version read from the store's version file.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Number of shard directories currently held in the cache.
    pub fn cached_shards(&self) -> usize {
        self.shards.iter().filter(|s| s.is_some()).count()
    }

    /// Release the shard cache and close the store.
    pub fn close(self) {
        tracing::info!(
            root = %self.root.display(),
            cached_shards = self.cached_shards(),
            "closed store"
        );
    }

    /// Look up a shard directory, consulting the cache first.
    ///
    /// With `create`, a missing shard directory is created; otherwise it is
    /// reported as [`StoreError::ShardNotFound`].
    fn shard_dir(&mut self, shard: ShardId, create: bool) -> Result<PathBuf, StoreError> {
        if let Some(dir) = &self.shards[shard.index()] {
            return Ok(dir.clone());
        }

        let dir = self.root.join(shard.name());
        match fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(StoreError::ShardNotADirectory { shard }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if !create {
                    return Err(StoreError::ShardNotFound { shard });
                }
                match fs::create_dir(&dir) {
                    Ok(()) => tracing::debug!(%shard, "created shard"),
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                    Err(e) => return Err(StoreError::io_at(dir)(e)),
                }
            }
            Err(e) => return Err(StoreError::io_at(dir)(e)),
        }

        self.shards[shard.index()] = Some(dir.clone());
        Ok(dir)
    }
}

/// Write `data` to a fresh create-exclusive temporary file in `shard_dir`.
fn write_temporary(
    shard_dir: &Path,
    digest: &Digest,
    data: &[u8],
) -> Result<NamedTempFile, StoreError> {
    let prefix = format!("{}.", digest.tail());
    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix).suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o644));
    }

    let mut tmp = builder
        .tempfile_in(shard_dir)
        .map_err(StoreError::io_at(shard_dir))?;
    tmp.write_all(data)
        .map_err(StoreError::io_at(tmp.path().to_path_buf()))?;
    Ok(tmp)
}

/// Move a written temporary file to its final name without clobbering.
///
/// Losing the race to another writer is success: the existing file holds
/// the same content, and the temporary file is removed.
fn persist_block(tmp: NamedTempFile, final_path: &Path, digest: &Digest) -> Result<(), StoreError> {
    match tmp.persist_noclobber(final_path) {
        Ok(_) => {
            tracing::debug!(block = %digest, "stored block");
            Ok(())
        }
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
            // `e.file` drops here, deleting the temporary file.
            tracing::debug!(block = %digest, "block stored concurrently");
            Ok(())
        }
        Err(e) => Err(StoreError::io_at(final_path)(e.error)),
    }
}

fn read_version(path: &Path) -> Result<u32, StoreError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StoreError::MissingVersion {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(StoreError::io_at(path)(e)),
    };

    let len = file.metadata().map_err(StoreError::io_at(path))?.len();
    if len != 4 {
        return Err(StoreError::CorruptVersion {
            path: path.to_path_buf(),
            len,
        });
    }

    let mut buf = [0u8; 4];
    file.read_exact(&mut buf).map_err(StoreError::io_at(path))?;
    Ok(u32::from_be_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_store() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        Repository::init(&root).unwrap();
        let repo = Repository::open(&root).unwrap();
        (dir, repo)
    }

    fn shard_entries(repo: &Repository, digest: &Digest) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(repo.root().join(digest.shard().name()))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn init_writes_big_endian_version() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        Repository::init(&root).unwrap();

        assert_eq!(fs::read(root.join(VERSION_FILE)).unwrap(), [0, 0, 0, 1]);
        // No shards until something is written.
        assert_eq!(fs::read_dir(&root).unwrap().count(), 1);
        assert_eq!(Repository::open(&root).unwrap().version(), STORE_VERSION);
    }

    #[test]
    fn init_refuses_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = Repository::init(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }), "got: {err}");
    }

    #[test]
    fn init_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            Repository::init(&file),
            Err(StoreError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn open_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = Repository::open(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }), "got: {err}");
    }

    #[test]
    fn open_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, b"x").unwrap();
        let err = Repository::open(&file).unwrap_err();
        assert!(matches!(err, StoreError::NotADirectory { .. }), "got: {err}");
    }

    #[test]
    fn open_without_version_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Repository::open(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::MissingVersion { .. }), "got: {err}");
    }

    #[test]
    fn open_with_wrong_version() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(VERSION_FILE), 2u32.to_be_bytes()).unwrap();
        let err = Repository::open(dir.path()).unwrap_err();
        assert!(
            matches!(err, StoreError::VersionMismatch { expected: 1, found: 2 }),
            "got: {err}"
        );
    }

    #[test]
    fn open_with_little_endian_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(VERSION_FILE), 1u32.to_le_bytes()).unwrap();
        assert!(matches!(
            Repository::open(dir.path()),
            Err(StoreError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn open_with_truncated_version() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(VERSION_FILE), [0, 1]).unwrap();
        let err = Repository::open(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::CorruptVersion { len: 2, .. }), "got: {err}");
    }

    #[test]
    fn put_then_get_roundtrip() {
        let (_dir, mut repo) = new_store();
        let digest = repo.put(b"hello block").unwrap();

        assert_eq!(digest, Digest::compute(b"hello block"));
        assert_eq!(repo.get(&digest).unwrap(), b"hello block");
    }

    #[test]
    fn put_lays_out_shard_and_tail() {
        let (_dir, mut repo) = new_store();
        let digest = repo.put(b"layout").unwrap();

        let expected = repo
            .root()
            .join(&digest.as_hex()[..2])
            .join(&digest.as_hex()[2..]);
        assert_eq!(repo.block_path(&digest), expected);
        assert_eq!(fs::read(expected).unwrap(), b"layout");
    }

    #[test]
    fn put_leaves_no_temporary_files() {
        let (_dir, mut repo) = new_store();
        let digest = repo.put(b"tidy").unwrap();
        assert_eq!(shard_entries(&repo, &digest), vec![digest.tail().to_string()]);
    }

    #[test]
    fn put_is_idempotent() {
        let (_dir, mut repo) = new_store();
        let first = repo.put(b"twice").unwrap();
        let second = repo.put(b"twice").unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read(repo.block_path(&first)).unwrap(), b"twice");
        assert_eq!(shard_entries(&repo, &first).len(), 1);
    }

    #[test]
    fn put_does_not_rewrite_existing_block() {
        let (_dir, mut repo) = new_store();
        let digest = Digest::compute(b"original");
        let shard = repo.root().join(digest.shard().name());
        fs::create_dir(&shard).unwrap();
        fs::write(shard.join(digest.tail()), b"sentinel").unwrap();

        assert_eq!(repo.put(b"original").unwrap(), digest);
        assert_eq!(fs::read(repo.block_path(&digest)).unwrap(), b"sentinel");
    }

    #[test]
    fn losing_the_rename_race_keeps_the_winner() {
        let (_dir, mut repo) = new_store();
        let digest = Digest::compute(b"contended");
        let shard = repo.shard_dir(digest.shard(), true).unwrap();
        let final_path = shard.join(digest.tail());

        let tmp = write_temporary(&shard, &digest, b"contended").unwrap();
        // Another writer finishes first.
        fs::write(&final_path, b"sentinel").unwrap();

        persist_block(tmp, &final_path, &digest).unwrap();
        assert_eq!(fs::read(&final_path).unwrap(), b"sentinel");
        assert_eq!(shard_entries(&repo, &digest), vec![digest.tail().to_string()]);
    }

    #[test]
    fn put_empty_block() {
        let (_dir, mut repo) = new_store();
        let digest = repo.put(b"").unwrap();
        assert_eq!(repo.get(&digest).unwrap(), b"");
    }

    #[test]
    fn put_rejects_oversized_block() {
        let (_dir, mut repo) = new_store();
        let big = vec![0u8; MAX_BLOCK_LEN + 1];
        let err = repo.put(&big).unwrap_err();
        assert!(matches!(err, StoreError::BlockTooLarge { .. }), "got: {err}");
    }

    #[test]
    fn get_from_missing_shard() {
        let (_dir, mut repo) = new_store();
        let digest = Digest::compute(b"never stored");
        let err = repo.get(&digest).unwrap_err();
        assert!(matches!(err, StoreError::ShardNotFound { .. }), "got: {err}");
    }

    #[test]
    fn get_missing_block_in_existing_shard() {
        let (_dir, mut repo) = new_store();
        let stored = repo.put(b"present").unwrap();

        // Same first byte, different tail.
        let mut bytes = *stored.as_bytes();
        bytes[HASH_LEN - 1] ^= 0xff;
        let sibling = Digest::from_bytes(bytes);

        let err = repo.get(&sibling).unwrap_err();
        assert!(matches!(err, StoreError::BlockNotFound { .. }), "got: {err}");
    }

    #[test]
    fn shard_that_is_a_file_is_rejected() {
        let (_dir, mut repo) = new_store();
        let digest = Digest::compute(b"blocked");
        fs::write(repo.root().join(digest.shard().name()), b"not a dir").unwrap();

        let err = repo.put(b"blocked").unwrap_err();
        assert!(matches!(err, StoreError::ShardNotADirectory { .. }), "got: {err}");
    }

    #[test]
    fn shard_cache_fills_on_demand() {
        let (_dir, mut repo) = new_store();
        assert_eq!(repo.cached_shards(), 0);

        let digest = repo.put(b"cached").unwrap();
        assert_eq!(repo.cached_shards(), 1);

        repo.get(&digest).unwrap();
        assert_eq!(repo.cached_shards(), 1);
        repo.close();
    }

    #[test]
    fn contains_reflects_store_contents() {
        let (_dir, mut repo) = new_store();
        let digest = repo.put(b"here").unwrap();
        assert!(repo.contains(&digest));
        assert!(!repo.contains(&Digest::compute(b"not here")));
    }

    #[test]
    fn reopen_sees_previous_blocks() {
        let (dir, mut repo) = new_store();
        let digest = repo.put(b"persistent").unwrap();
        repo.close();

        let mut reopened = Repository::open(dir.path().join("store")).unwrap();
        assert_eq!(reopened.get(&digest).unwrap(), b"persistent");
    }
}
