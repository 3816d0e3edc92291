//! File-backed [`SessionStore`]: one small file per durable key.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    infra::error::AppError,
    usecases::contracts::{SessionStore, StoredSession},
};

const SESSION_FILE: &str = "session.json";
const TRANSCRIPT_FILE: &str = "transcript.json";
const BUSINESS_NAME_FILE: &str = "business_name";

const SESSION_RECORD_CORRUPT: &str = "SESSION_RECORD_CORRUPT";
const STORED_FILE_NOT_UTF8: &str = "STORED_FILE_NOT_UTF8";
const STORED_FILE_UNREADABLE: &str = "STORED_FILE_UNREADABLE";

#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    session_id: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn read_optional(&self, name: &str) -> Result<Option<String>, AppError> {
        let path = self.path(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(AppError::SessionStoreIo { path, source }),
        };

        match String::from_utf8(bytes) {
            Ok(raw) => Ok(Some(raw)),
            Err(error) => {
                tracing::warn!(
                    code = STORED_FILE_NOT_UTF8,
                    file = name,
                    error = %error,
                    "stored file is not valid UTF-8; treating it as absent"
                );
                Ok(None)
            }
        }
    }

    /// Reads a key that depends on the session record. Failures are logged
    /// and read as absent so they never hide a valid id and timestamp.
    fn read_dependent(&self, name: &str) -> Option<String> {
        self.read_optional(name).unwrap_or_else(|error| {
            tracing::warn!(
                code = STORED_FILE_UNREADABLE,
                file = name,
                error = %error,
                "stored file could not be read; treating it as absent"
            );
            None
        })
    }

    fn load_record(&self) -> Result<Option<SessionRecord>, AppError> {
        let Some(raw) = self.read_optional(SESSION_FILE)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(error) => {
                tracing::warn!(
                    code = SESSION_RECORD_CORRUPT,
                    error = %error,
                    "stored session record is unreadable; treating it as absent"
                );
                Ok(None)
            }
        }
    }

    fn write_atomic(&self, name: &str, contents: &[u8]) -> Result<(), AppError> {
        let path = self.path(name);
        let tmp_path = self.path(&format!("{name}.tmp"));

        fs::write(&tmp_path, contents).map_err(|source| AppError::SessionStoreIo {
            path: tmp_path.clone(),
            source,
        })?;

        fs::rename(&tmp_path, &path).map_err(|source| AppError::SessionStoreIo { path, source })
    }

    fn remove_if_exists(&self, name: &str) -> Result<(), AppError> {
        remove_file_if_exists(&self.path(name))
    }
}

fn remove_file_if_exists(path: &Path) -> Result<(), AppError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(source) if source.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(AppError::SessionStoreIo {
            path: path.to_path_buf(),
            source,
        }),
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<StoredSession> {
        let record = self.load_record()?;
        let transcript = self.read_dependent(TRANSCRIPT_FILE);
        let business_name = self
            .read_dependent(BUSINESS_NAME_FILE)
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty());

        let (session_id, created_at) = match record {
            Some(record) => (Some(record.session_id), Some(record.created_at)),
            None => (None, None),
        };

        Ok(StoredSession {
            session_id,
            created_at,
            transcript,
            business_name,
        })
    }

    fn save_session(&mut self, session_id: &str, created_at: DateTime<Utc>) -> Result<()> {
        let record = SessionRecord {
            session_id: session_id.to_owned(),
            created_at,
        };
        let encoded = serde_json::to_vec(&record).map_err(AppError::SessionEncode)?;

        self.write_atomic(SESSION_FILE, &encoded)?;
        Ok(())
    }

    fn save_transcript(&mut self, raw: &str) -> Result<()> {
        self.write_atomic(TRANSCRIPT_FILE, raw.as_bytes())?;
        Ok(())
    }

    fn save_business_name(&mut self, business_name: Option<&str>) -> Result<()> {
        match business_name {
            Some(name) => self.write_atomic(BUSINESS_NAME_FILE, name.as_bytes())?,
            None => self.remove_if_exists(BUSINESS_NAME_FILE)?,
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        for name in [SESSION_FILE, TRANSCRIPT_FILE, BUSINESS_NAME_FILE] {
            self.remove_if_exists(name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 2, 18, 30, 0)
            .single()
            .expect("fixture time should be valid")
    }

    #[test]
    fn empty_directory_loads_as_no_session() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let store = FileSessionStore::new(temp_dir.path());

        let stored = store.load().expect("load");

        assert_eq!(stored, StoredSession::default());
    }

    #[test]
    fn round_trips_every_key() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let mut store = FileSessionStore::new(temp_dir.path());

        store.save_session("s-42", created_at()).expect("save session");
        store.save_transcript("[]").expect("save transcript");
        store
            .save_business_name(Some("Eko Bites"))
            .expect("save business name");

        let reopened = FileSessionStore::new(temp_dir.path());
        let stored = reopened.load().expect("load");

        assert_eq!(stored.session_id.as_deref(), Some("s-42"));
        assert_eq!(stored.created_at, Some(created_at()));
        assert_eq!(stored.transcript.as_deref(), Some("[]"));
        assert_eq!(stored.business_name.as_deref(), Some("Eko Bites"));
        assert!(!temp_dir.path().join("session.json.tmp").exists());
    }

    #[test]
    fn clear_removes_all_keys_and_tolerates_missing_files() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let mut store = FileSessionStore::new(temp_dir.path());
        store.save_session("s-1", created_at()).expect("save session");
        store.save_transcript("[]").expect("save transcript");

        store.clear().expect("first clear");
        store.clear().expect("second clear");

        assert_eq!(store.load().expect("load"), StoredSession::default());
    }

    #[test]
    fn clearing_business_name_removes_its_file() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let mut store = FileSessionStore::new(temp_dir.path());
        store
            .save_business_name(Some("Eko Bites"))
            .expect("save business name");

        store.save_business_name(None).expect("clear business name");

        assert_eq!(store.load().expect("load").business_name, None);
    }

    #[test]
    fn corrupt_session_record_reads_as_absent_but_keeps_other_keys() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        fs::write(temp_dir.path().join(SESSION_FILE), "{\"session_id\":").expect("write");
        fs::write(temp_dir.path().join(TRANSCRIPT_FILE), "[]").expect("write");
        let store = FileSessionStore::new(temp_dir.path());

        let stored = store.load().expect("load");

        assert_eq!(stored.session_id, None);
        assert_eq!(stored.created_at, None);
        assert_eq!(stored.transcript.as_deref(), Some("[]"));
    }

    #[test]
    fn non_utf8_transcript_and_business_name_read_as_absent_but_keep_session() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let mut store = FileSessionStore::new(temp_dir.path());
        store.save_session("s-keep", created_at()).expect("save session");
        fs::write(temp_dir.path().join(TRANSCRIPT_FILE), [0xff, 0xfe, b'[', b']']).expect("write");
        fs::write(temp_dir.path().join(BUSINESS_NAME_FILE), [0xc3, 0x28]).expect("write");

        let stored = store.load().expect("load must not fail");

        assert_eq!(stored.session_id.as_deref(), Some("s-keep"));
        assert_eq!(stored.created_at, Some(created_at()));
        assert_eq!(stored.transcript, None);
        assert_eq!(stored.business_name, None);
    }

    #[test]
    fn unreadable_transcript_does_not_fail_load() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let mut store = FileSessionStore::new(temp_dir.path());
        store.save_session("s-keep", created_at()).expect("save session");
        fs::create_dir(temp_dir.path().join(TRANSCRIPT_FILE)).expect("create dir");

        let stored = store.load().expect("load must not fail");

        assert_eq!(stored.session_id.as_deref(), Some("s-keep"));
        assert_eq!(stored.transcript, None);
    }

    #[test]
    fn non_utf8_session_record_reads_as_absent() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        fs::write(temp_dir.path().join(SESSION_FILE), [0xff, 0xff]).expect("write");
        let store = FileSessionStore::new(temp_dir.path());

        let stored = store.load().expect("load");

        assert_eq!(stored.session_id, None);
    }

    #[test]
    fn created_at_is_stored_as_rfc3339() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let mut store = FileSessionStore::new(temp_dir.path());

        store.save_session("s-1", created_at()).expect("save session");

        let raw = fs::read_to_string(temp_dir.path().join(SESSION_FILE)).expect("read");
        assert!(raw.contains("\"created_at\":\"2026-04-02T18:30:00Z\""), "{raw}");
    }
}
