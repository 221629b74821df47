use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::consts::{IGNORE_BACKUP_FILENAME, IGNORE_FILENAME};

use super::rules::IgnoreRules;

#[derive(Debug, Error)]
pub enum ContextScopeError {
  #[error("a narrowed build context is already open in {dir}")]
  AlreadyOpen { dir: PathBuf },

  #[error("build context {dir} is untrusted: a previous restore of .dockerignore failed")]
  Untrusted { dir: PathBuf },

  #[error("failed to read {path}")]
  Capture {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write {path}")]
  Narrow {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to restore {path}")]
  Restore {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Content of the ignore-list before narrowing. `None` means no file existed.
#[derive(Debug, Serialize, Deserialize)]
struct Backup {
  original: Option<Vec<u8>>,
}

/// The shared build-context directory and its ignore-list.
///
/// At most one [`ContextScope`] may be open at a time. A failed restore marks
/// the context untrusted and every later narrowing is refused.
#[derive(Debug)]
pub struct SharedContext {
  dir: PathBuf,
  ignore_path: PathBuf,
  backup_path: PathBuf,
  open: AtomicBool,
  tainted: AtomicBool,
}

impl SharedContext {
  /// Open the context rooted at `dir`.
  ///
  /// A backup left behind by an interrupted run is restored first.
  pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ContextScopeError> {
    let dir = dir.into();
    let context = Self {
      ignore_path: dir.join(IGNORE_FILENAME),
      backup_path: dir.join(IGNORE_BACKUP_FILENAME),
      dir,
      open: AtomicBool::new(false),
      tainted: AtomicBool::new(false),
    };
    context.recover()?;
    Ok(context)
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn ignore_path(&self) -> &Path {
    &self.ignore_path
  }

  pub fn backup_path(&self) -> &Path {
    &self.backup_path
  }

  pub fn is_open(&self) -> bool {
    self.open.load(Ordering::SeqCst)
  }

  pub fn is_tainted(&self) -> bool {
    self.tainted.load(Ordering::SeqCst)
  }

  fn recover(&self) -> Result<(), ContextScopeError> {
    let raw = match std::fs::read_to_string(&self.backup_path) {
      Ok(raw) => raw,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
      Err(source) => {
        return Err(ContextScopeError::Capture {
          path: self.backup_path.clone(),
          source,
        });
      }
    };
    let backup: Backup = serde_json::from_str(&raw).map_err(|e| ContextScopeError::Capture {
      path: self.backup_path.clone(),
      source: io::Error::new(io::ErrorKind::InvalidData, e),
    })?;

    warn!(
      path = %self.ignore_path.display(),
      "restoring ignore-list left behind by an interrupted build"
    );
    self.write_original(backup.original.as_deref())
  }

  /// Rewrite the ignore-list with `rules` and return the guard that restores it.
  pub fn narrow(&self, rules: &IgnoreRules) -> Result<ContextScope<'_>, ContextScopeError> {
    if self.is_tainted() {
      return Err(ContextScopeError::Untrusted { dir: self.dir.clone() });
    }
    if self
      .open
      .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
      .is_err()
    {
      return Err(ContextScopeError::AlreadyOpen { dir: self.dir.clone() });
    }

    let original = match std::fs::read(&self.ignore_path) {
      Ok(content) => Some(content),
      Err(e) if e.kind() == io::ErrorKind::NotFound => None,
      Err(source) => {
        self.open.store(false, Ordering::SeqCst);
        return Err(ContextScopeError::Capture {
          path: self.ignore_path.clone(),
          source,
        });
      }
    };

    if let Err(source) = self.write_backup(&original) {
      self.open.store(false, Ordering::SeqCst);
      return Err(ContextScopeError::Narrow {
        path: self.backup_path.clone(),
        source,
      });
    }

    // From here on the guard owns restoration, including on a failed write.
    let scope = ContextScope {
      context: self,
      original,
      closed: false,
    };

    let narrowed = rules.render(scope.original.as_deref());
    debug!(
      path = %self.ignore_path.display(),
      rules = %String::from_utf8_lossy(&narrowed).trim_end(),
      "narrowed build context"
    );
    std::fs::write(&self.ignore_path, narrowed).map_err(|source| ContextScopeError::Narrow {
      path: self.ignore_path.clone(),
      source,
    })?;

    Ok(scope)
  }

  /// Run `body` with the context narrowed to `rules`.
  ///
  /// The ignore-list is restored whether `body` succeeds, fails, or its future
  /// is dropped. A restore failure never masks an error returned by `body`.
  pub async fn with_narrowed_context<T, E, F, Fut>(&self, rules: &IgnoreRules, body: F) -> Result<T, E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<ContextScopeError>,
  {
    let scope = self.narrow(rules)?;
    let result = body().await;
    match (result, scope.close()) {
      (Ok(value), Ok(())) => Ok(value),
      (Ok(_), Err(restore)) => Err(restore.into()),
      (Err(e), _) => Err(e),
    }
  }

  fn write_backup(&self, original: &Option<Vec<u8>>) -> io::Result<()> {
    let backup = Backup {
      original: original.clone(),
    };
    let json = serde_json::to_string(&backup).map_err(io::Error::other)?;
    std::fs::write(&self.backup_path, json)
  }

  fn write_original(&self, original: Option<&[u8]>) -> Result<(), ContextScopeError> {
    let restored = match original {
      Some(content) => std::fs::write(&self.ignore_path, content),
      None => match std::fs::remove_file(&self.ignore_path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
      },
    };
    restored.map_err(|source| ContextScopeError::Restore {
      path: self.ignore_path.clone(),
      source,
    })?;

    match std::fs::remove_file(&self.backup_path) {
      Err(e) if e.kind() != io::ErrorKind::NotFound => Err(ContextScopeError::Restore {
        path: self.backup_path.clone(),
        source: e,
      }),
      _ => Ok(()),
    }
  }
}

/// An open narrowing of a [`SharedContext`].
///
/// Restores the original ignore-list when closed or dropped.
#[derive(Debug)]
pub struct ContextScope<'a> {
  context: &'a SharedContext,
  original: Option<Vec<u8>>,
  closed: bool,
}

impl ContextScope<'_> {
  /// Restore the ignore-list and report whether that worked.
  pub fn close(mut self) -> Result<(), ContextScopeError> {
    self.restore()
  }

  fn restore(&mut self) -> Result<(), ContextScopeError> {
    if self.closed {
      return Ok(());
    }
    self.closed = true;

    let result = self.context.write_original(self.original.as_deref());
    if let Err(e) = &result {
      self.context.tainted.store(true, Ordering::SeqCst);
      error!(error = %e, dir = %self.context.dir.display(), "failed to restore build context");
    } else {
      debug!(path = %self.context.ignore_path.display(), "restored build context");
    }
    self.context.open.store(false, Ordering::SeqCst);
    result
  }
}

impl Drop for ContextScope<'_> {
  fn drop(&mut self) {
    let _ = self.restore();
  }
}
