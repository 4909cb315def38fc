//! Title storage: small named blobs kept by the backend per title.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::instrument;
use xlive_core::{Result, XliveError};

use crate::client::{BackendClient, Outcome};
use crate::types::{StorageBlob, StorageEntry, StorageQuery};

/// Longest accepted storage path.
pub const MAX_PATH_LEN: usize = 256;

fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() || path.len() > MAX_PATH_LEN {
        return Err(XliveError::invalid_parameter(format!(
            "storage path must be 1..={MAX_PATH_LEN} bytes"
        )));
    }
    if path.starts_with('/') || path.split('/').any(|part| part == "..") {
        return Err(XliveError::invalid_parameter(format!(
            "storage path {path:?} escapes the title root"
        )));
    }
    Ok(())
}

impl BackendClient {
    fn storage_path(&self, path: &str) -> String {
        self.title_path(&format!("storage/{path}"))
    }

    /// Store `data` at `path`, replacing what was there.
    #[instrument(skip_all, fields(path = %path, len = data.len()))]
    pub fn upload(&self, path: &str, data: &[u8]) -> Result<()> {
        validate_path(path)?;
        let body = StorageBlob {
            data: STANDARD.encode(data),
        };
        let url = self.storage_path(path);
        self.post(&url, &body).into_result(&url).map(drop)
    }

    /// Contents of `path`.
    #[instrument(skip_all, fields(path = %path))]
    pub fn download(&self, path: &str) -> Result<Vec<u8>> {
        validate_path(path)?;
        let url = self.storage_path(path);
        let blob: StorageBlob = self.get(&url).into_typed(path)?;
        STANDARD
            .decode(blob.data.as_bytes())
            .map_err(|e| XliveError::MalformedPayload(format!("storage {path}: {e}")))
    }

    /// Remove `path`. Returns `false` if it did not exist.
    #[instrument(skip_all, fields(path = %path))]
    pub fn delete_file(&self, path: &str) -> Result<bool> {
        validate_path(path)?;
        let url = self.storage_path(path);
        let response = self.delete(&url);
        if response.outcome == Outcome::NotFound {
            return Ok(false);
        }
        response.into_result(path).map(|_| true)
    }

    /// Entries whose path starts with `prefix`.
    #[instrument(skip_all, fields(prefix = %prefix))]
    pub fn enumerate(&self, prefix: &str) -> Result<Vec<StorageEntry>> {
        let url = self.title_path("storage/enumerate");
        let query = StorageQuery {
            prefix: prefix.to_string(),
        };
        self.post(&url, &query).into_typed(&url)
    }
}
