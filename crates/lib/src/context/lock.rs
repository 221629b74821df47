//! Cross-process exclusion for the shared build context.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::LOCK_FILENAME;

#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub command: String,
  pub context: PathBuf,
}

#[derive(Debug, Error)]
pub enum ContextLockError {
  #[error(
    "build context is locked by another build: {command} (PID {pid}, started {started_at})\n\
     If you're sure no lampbuild process is running, remove the lock file:\n  {lock_path}"
  )]
  Contention {
    command: String,
    pid: u32,
    started_at: String,
    lock_path: PathBuf,
  },

  #[error(
    "build context is locked (could not read lock metadata)\n\
     If you're sure no lampbuild process is running, remove the lock file:\n  {lock_path}"
  )]
  ContentionUnknown { lock_path: PathBuf },

  #[error("failed to create build context directory")]
  CreateDir(#[source] io::Error),

  #[error("failed to open lock file")]
  OpenFile(#[source] io::Error),

  #[error("failed to write lock metadata")]
  WriteMetadata(#[source] io::Error),

  #[error("failed to acquire lock")]
  LockFailed(#[source] io::Error),
}

/// Exclusive advisory lock on a build-context directory, held for a whole build.
///
/// Released when dropped.
#[derive(Debug)]
pub struct ContextLock {
  file: File,
  lock_path: PathBuf,
}

impl ContextLock {
  /// Take the lock for `context`, failing immediately if another process holds it.
  pub fn acquire(context: &Path, command: &str) -> Result<Self, ContextLockError> {
    if !context.exists() {
      std::fs::create_dir_all(context).map_err(ContextLockError::CreateDir)?;
    }
    let lock_path = context.join(LOCK_FILENAME);

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&lock_path)
      .map_err(ContextLockError::OpenFile)?;

    if let Err(err) = try_lock(&file) {
      if err.kind() == io::ErrorKind::WouldBlock {
        return Err(contention_error(&lock_path));
      }
      return Err(ContextLockError::LockFailed(err));
    }

    write_metadata(&file, command, context)?;
    debug!(path = %lock_path.display(), "acquired build context lock");

    Ok(Self { file, lock_path })
  }

  /// Read the metadata through the held handle.
  ///
  /// Opening a second handle would fail on Windows, where the lock is mandatory.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    use std::io::{Seek, SeekFrom};

    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }
}

fn write_metadata(file: &File, command: &str, context: &Path) -> Result<(), ContextLockError> {
  let metadata = LockMetadata {
    version: 1,
    pid: std::process::id(),
    started_at_unix: SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .unwrap_or_default()
      .as_secs(),
    command: command.to_string(),
    context: context.to_path_buf(),
  };

  file.set_len(0).map_err(ContextLockError::WriteMetadata)?;
  let mut writer = io::BufWriter::new(file);
  serde_json::to_writer_pretty(&mut writer, &metadata)
    .map_err(|e| ContextLockError::WriteMetadata(io::Error::other(e)))?;
  writer.flush().map_err(ContextLockError::WriteMetadata)?;

  Ok(())
}

fn contention_error(lock_path: &Path) -> ContextLockError {
  if let Ok(mut file) = File::open(lock_path) {
    let mut contents = String::new();
    if file.read_to_string(&mut contents).is_ok()
      && let Ok(metadata) = serde_json::from_str::<LockMetadata>(&contents)
    {
      return ContextLockError::Contention {
        command: metadata.command,
        pid: metadata.pid,
        started_at: format!("Unix timestamp {}", metadata.started_at_unix),
        lock_path: lock_path.to_path_buf(),
      };
    }
  }

  ContextLockError::ContentionUnknown {
    lock_path: lock_path.to_path_buf(),
  }
}

#[cfg(unix)]
fn try_lock(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive)
    .map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn try_lock(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: OVERLAPPED is plain data and valid when zeroed; the handle is owned by `file`.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(
      handle,
      LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
      0,
      1,
      0,
      &mut overlapped,
    )
  };

  if result == 0 {
    Err(io::Error::last_os_error())
  } else {
    Ok(())
  }
}
