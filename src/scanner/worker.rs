//! Worker threads for the parallel scan
//!
//! Each worker:
//! - Pulls a directory path from the task channel
//! - Stats the directory and lists its immediate entries
//! - Stats every regular file found
//! - Sends the listing (or the reason it could not be listed) back on the
//!   result channel
//!
//! Workers never touch the database and never schedule work themselves. The
//! coordinator decides which subdirectories become new tasks.

use crate::error::{ScanError, ScanResult};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

/// Size of one `st_blocks` unit
const BLOCK_SIZE: u64 = 512;

/// Metadata of one regular file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    /// Raw entry name, not necessarily UTF-8
    pub name: OsString,
    pub uid: u32,
    pub gid: u32,
    pub allocated_size: u64,
    pub apparent_size: u64,
    pub mtime: i64,
    pub num_links: u64,
}

impl FileStat {
    fn from_metadata(name: OsString, meta: &fs::Metadata) -> Self {
        Self {
            name,
            uid: meta.uid(),
            gid: meta.gid(),
            allocated_size: meta.blocks() * BLOCK_SIZE,
            apparent_size: meta.size(),
            mtime: meta.mtime(),
            num_links: meta.nlink(),
        }
    }
}

/// Everything learned from visiting one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirListing {
    pub path: PathBuf,
    pub mtime: i64,
    pub files: Vec<FileStat>,
    pub subdirs: Vec<PathBuf>,
}

/// Result of visiting one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirOutcome {
    /// Stat and listing succeeded
    Listed(DirListing),
    /// The directory or one of its entries could not be read
    PermissionDenied(PathBuf),
}

/// Visit one directory.
///
/// Permission errors become [`DirOutcome::PermissionDenied`]; any other
/// filesystem error is returned as [`ScanError::Io`].
pub fn process_dir(path: &Path) -> ScanResult<DirOutcome> {
    classify(path, read_listing(path))
}

/// Absorb permission failures, pass everything else through
pub fn classify(path: &Path, result: ScanResult<DirListing>) -> ScanResult<DirOutcome> {
    match result {
        Ok(listing) => Ok(DirOutcome::Listed(listing)),
        Err(ScanError::Io { source, .. }) if source.kind() == io::ErrorKind::PermissionDenied => {
            debug!(path = %path.display(), "Permission denied");
            Ok(DirOutcome::PermissionDenied(path.to_path_buf()))
        }
        Err(e) => Err(e),
    }
}

fn read_listing(path: &Path) -> ScanResult<DirListing> {
    let meta = fs::symlink_metadata(path).map_err(|e| ScanError::io(path, e))?;

    let mut files = Vec::new();
    let mut subdirs = Vec::new();

    for entry in fs::read_dir(path).map_err(|e| ScanError::io(path, e))? {
        let entry = entry.map_err(|e| ScanError::io(path, e))?;
        let entry_path = entry.path();

        // Does not follow symlinks
        let file_type = entry.file_type().map_err(|e| ScanError::io(&entry_path, e))?;

        if file_type.is_dir() {
            subdirs.push(entry_path);
        } else if file_type.is_file() {
            let entry_meta = entry.metadata().map_err(|e| ScanError::io(&entry_path, e))?;
            files.push(FileStat::from_metadata(entry.file_name(), &entry_meta));
        }
    }

    trace!(
        path = %path.display(),
        files = files.len(),
        subdirs = subdirs.len(),
        "Directory listed"
    );

    Ok(DirListing {
        path: path.to_path_buf(),
        mtime: meta.mtime(),
        files,
        subdirs,
    })
}

/// A finished task as delivered to the coordinator
#[derive(Debug)]
pub struct TaskResult {
    pub path: PathBuf,
    pub outcome: ScanResult<DirOutcome>,
}

/// Fixed pool of scanning threads fed through channels
pub struct WorkerPool {
    task_tx: Option<Sender<PathBuf>>,
    result_rx: Receiver<TaskResult>,
    handles: Vec<(usize, JoinHandle<()>)>,
}

impl WorkerPool {
    /// Spawn `count` worker threads
    pub fn spawn(count: usize) -> ScanResult<Self> {
        let (task_tx, task_rx) = unbounded::<PathBuf>();
        let (result_tx, result_rx) = unbounded::<TaskResult>();

        let mut handles = Vec::with_capacity(count);
        for id in 0..count {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("fdu-scan-{}", id))
                .spawn(move || worker_loop(id, task_rx, result_tx))
                .map_err(|e| ScanError::SpawnFailed {
                    id,
                    reason: e.to_string(),
                })?;
            handles.push((id, handle));
        }

        debug!(count, "Workers spawned");

        Ok(Self {
            task_tx: Some(task_tx),
            result_rx,
            handles,
        })
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Queue a directory for scanning
    pub fn submit(&self, path: PathBuf) -> ScanResult<()> {
        let tx = self
            .task_tx
            .as_ref()
            .ok_or(ScanError::ChannelClosed { outstanding: 0 })?;
        tx.send(path)
            .map_err(|_| ScanError::ChannelClosed { outstanding: 0 })
    }

    /// Block until at least one task has finished
    pub fn recv(&self, outstanding: usize) -> ScanResult<TaskResult> {
        self.result_rx
            .recv()
            .map_err(|_| ScanError::ChannelClosed { outstanding })
    }

    /// Take an already finished task without blocking
    pub fn try_recv(&self) -> Option<TaskResult> {
        match self.result_rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Close the task channel and wait for every worker to exit
    pub fn shutdown(mut self) -> ScanResult<()> {
        self.task_tx.take();

        for (id, handle) in std::mem::take(&mut self.handles) {
            handle.join().map_err(|_| ScanError::WorkerPanicked { id })?;
        }
        Ok(())
    }
}

fn worker_loop(id: usize, task_rx: Receiver<PathBuf>, result_tx: Sender<TaskResult>) {
    trace!(worker = id, "Worker starting");

    while let Ok(path) = task_rx.recv() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| process_dir(&path)))
            .unwrap_or(Err(ScanError::WorkerPanicked { id }));

        // Receiver gone means the scan was abandoned
        if result_tx.send(TaskResult { path, outcome }).is_err() {
            break;
        }
    }

    trace!(worker = id, "Worker shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn sample_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let mut f = File::create(dir.path().join("data.bin")).unwrap();
        f.write_all(&[0u8; 5000]).unwrap();
        File::create(dir.path().join("empty.txt")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("sub"), dir.path().join("link")).unwrap();
        dir
    }

    #[test]
    fn test_process_dir_lists_files_and_subdirs() {
        let dir = sample_dir();
        let outcome = process_dir(dir.path()).unwrap();

        let DirOutcome::Listed(mut listing) = outcome else {
            panic!("expected a listing");
        };
        listing.files.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(listing.path, dir.path());
        assert_eq!(listing.subdirs, vec![dir.path().join("sub")]);
        assert_eq!(listing.files.len(), 2);
        assert_eq!(listing.files[0].name, "data.bin");
        assert_eq!(listing.files[0].apparent_size, 5000);
        assert_eq!(listing.files[0].allocated_size % BLOCK_SIZE, 0);
        assert_eq!(listing.files[1].name, "empty.txt");
        assert_eq!(listing.files[1].apparent_size, 0);
    }

    #[test]
    fn test_non_utf8_names_are_kept() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        for name in [&b"\xff"[..], &b"\xfe"[..]] {
            File::create(dir.path().join(OsStr::from_bytes(name))).unwrap();
        }

        let DirOutcome::Listed(listing) = process_dir(dir.path()).unwrap() else {
            panic!("expected a listing");
        };
        let mut names: Vec<OsString> = listing.files.into_iter().map(|f| f.name).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                OsStr::from_bytes(b"\xfe").to_os_string(),
                OsStr::from_bytes(b"\xff").to_os_string(),
            ]
        );
    }

    #[test]
    fn test_classify_permission_denied() {
        let path = Path::new("/scratch/locked");
        let denied = Err(ScanError::io(
            path,
            io::Error::from(io::ErrorKind::PermissionDenied),
        ));
        assert_eq!(
            classify(path, denied).unwrap(),
            DirOutcome::PermissionDenied(path.to_path_buf())
        );
    }

    #[test]
    fn test_classify_other_errors_are_fatal() {
        let path = Path::new("/scratch/broken");
        let failed = Err(ScanError::io(path, io::Error::from(io::ErrorKind::NotFound)));
        assert!(matches!(classify(path, failed), Err(ScanError::Io { .. })));
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = process_dir(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ScanError::Io { .. }));
    }

    #[test]
    fn test_pool_round_trip() {
        let dir = sample_dir();
        let pool = WorkerPool::spawn(2).unwrap();
        assert_eq!(pool.size(), 2);

        pool.submit(dir.path().to_path_buf()).unwrap();
        pool.submit(dir.path().join("sub")).unwrap();

        let mut paths = vec![pool.recv(2).unwrap().path, pool.recv(1).unwrap().path];
        paths.sort();
        assert_eq!(paths, vec![dir.path().to_path_buf(), dir.path().join("sub")]);
        assert!(pool.try_recv().is_none());

        pool.shutdown().unwrap();
    }
}
