use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::TokenStoreError;
use crate::paths::credential_path;
use crate::record::CredentialRecord;

/// File-backed holder of the single process-wide bearer token.
///
/// At most one live token exists at a time. `clear` is terminal for the
/// stored value: a cleared token is never handed out again, and any
/// stream opened with it is considered doomed by the caller.
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
    cached: Mutex<Option<String>>,
}

impl TokenStore {
    /// Opens the store rooted at `root`, reading any persisted token.
    pub fn open(root: &Path) -> Result<Self, TokenStoreError> {
        let path = credential_path(root);
        let cached = read_persisted_token(&path)?;

        Ok(Self {
            path,
            cached: Mutex::new(cached),
        })
    }

    /// Persists and caches a freshly issued token.
    pub fn save(&self, token: impl Into<String>) -> Result<(), TokenStoreError> {
        let token = token.into();
        let saved_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(TokenStoreError::ClockFormat)?;
        let record = CredentialRecord::new(token.clone(), saved_at);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| TokenStoreError::io("creating credential dir", parent, source))?;
        }

        let body = serde_json::to_string(&record)
            .map_err(|source| TokenStoreError::json_serialize(&self.path, source))?;
        fs::write(&self.path, body)
            .map_err(|source| TokenStoreError::io("writing credential file", &self.path, source))?;

        *lock_unpoisoned(&self.cached) = Some(token);
        Ok(())
    }

    /// Returns the live token, if any.
    #[must_use]
    pub fn load(&self) -> Option<String> {
        lock_unpoisoned(&self.cached).clone()
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        lock_unpoisoned(&self.cached).is_some()
    }

    /// Invalidates the token. Idempotent; a missing file is fine.
    pub fn clear(&self) -> Result<(), TokenStoreError> {
        lock_unpoisoned(&self.cached).take();

        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(TokenStoreError::io(
                "removing credential file",
                &self.path,
                source,
            )),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_persisted_token(path: &Path) -> Result<Option<String>, TokenStoreError> {
    let body = match fs::read_to_string(path) {
        Ok(body) => body,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(TokenStoreError::io("reading credential file", path, source));
        }
    };

    let record = serde_json::from_str::<CredentialRecord>(&body)
        .map_err(|source| TokenStoreError::json_parse(path, source))?;
    Ok(Some(record.token))
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
