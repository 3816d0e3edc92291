use std::{
    fs::{File, OpenOptions},
    path::PathBuf,
};

use fs2::FileExt;

use crate::infra::{
    error::AppError, session_files::FileSessionStore, storage_layout::StorageLayout,
};

/// Exclusive hold on the session directory; released on drop.
#[derive(Debug)]
pub struct SessionLockGuard {
    file: File,
    path: PathBuf,
}

impl Drop for SessionLockGuard {
    fn drop(&mut self) {
        if let Err(error) = self.file.unlock() {
            tracing::debug!(path = %self.path.display(), error = %error, "session lock release failed");
        }
    }
}

pub struct SessionStoreHandle {
    pub store: FileSessionStore,
    pub lock_guard: SessionLockGuard,
}

/// Opens the durable session store, refusing to share it with another process.
pub fn open_session_store(layout: &StorageLayout) -> Result<SessionStoreHandle, AppError> {
    let lock_guard = acquire_session_lock(layout.session_lock_file())?;

    Ok(SessionStoreHandle {
        store: FileSessionStore::new(&layout.session_dir),
        lock_guard,
    })
}

fn acquire_session_lock(path: PathBuf) -> Result<SessionLockGuard, AppError> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .map_err(|source| AppError::SessionLockCreate {
            path: path.clone(),
            source,
        })?;

    match file.try_lock_exclusive() {
        Ok(()) => Ok(SessionLockGuard { file, path }),
        Err(error) if error.kind() == fs2::lock_contended_error().kind() => {
            Err(AppError::SessionStoreBusy { path })
        }
        Err(source) => Err(AppError::SessionLockCreate { path, source }),
    }
}
