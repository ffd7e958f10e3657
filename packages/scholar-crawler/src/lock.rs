//! Exclusive lock over an output directory.
//!
//! The record logs assume a single writer. The lock file is created with
//! exclusive-create semantics and removed when the guard drops, so every exit
//! path releases it. A crashed process leaves the file behind; remove it with
//! [`remove_stale_lock`] once no other run is active.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::OutputLayout;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockMeta {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub command: String,
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("output directory is locked by {path:?} ({holder})")]
    Held { path: PathBuf, holder: String },

    #[error("io error on lock {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
pub struct OutputLock {
    path: PathBuf,
    meta: LockMeta,
    released: bool,
}

impl OutputLock {
    /// Take the lock for `layout`, recording which command holds it.
    pub fn acquire(layout: &OutputLayout, command: &str) -> Result<Self, LockError> {
        let path = layout.lock_path();
        let meta = LockMeta {
            pid: std::process::id(),
            started_at: Utc::now(),
            command: command.to_string(),
        };

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                let holder = match read_meta(&path) {
                    Ok(meta) => format!(
                        "pid {} running `{}` since {}",
                        meta.pid, meta.command, meta.started_at
                    ),
                    Err(err) => format!("unreadable lock metadata: {err}"),
                };
                return Err(LockError::Held { path, holder });
            }
            Err(source) => return Err(LockError::Io { path, source }),
        };

        let body = serde_json::to_vec(&meta).map_err(|err| LockError::Io {
            path: path.clone(),
            source: err.into(),
        })?;
        file.write_all(&body)
            .and_then(|_| file.sync_all())
            .map_err(|source| LockError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = ?path, pid = meta.pid, "Acquired output lock");

        Ok(Self {
            path,
            meta,
            released: false,
        })
    }

    pub fn meta(&self) -> &LockMeta {
        &self.meta
    }

    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        fs::remove_file(&self.path).map_err(|source| LockError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl Drop for OutputLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Remove a lock left behind by a dead process. Returns whether one existed.
pub fn remove_stale_lock(layout: &OutputLayout) -> Result<bool, LockError> {
    let path = layout.lock_path();
    match fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(LockError::Io { path, source }),
    }
}

fn read_meta(path: &Path) -> io::Result<LockMeta> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(io::Error::from)
}
