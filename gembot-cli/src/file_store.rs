//! Directory-backed player store: one JSON document per user.
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use gembot_economy::{PlayerRecord, PlayerStore, StoreError};

const RECORD_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, user_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{RECORD_EXTENSION}", encode_user_id(user_id)))
    }

    fn parse(user_id: &str, raw: &str) -> Result<PlayerRecord, StoreError> {
        serde_json::from_str(raw).map_err(|err| StoreError::Corrupt {
            user_id: user_id.to_string(),
            reason: err.to_string(),
        })
    }
}

impl PlayerStore for JsonFileStore {
    fn read(&self, user_id: &str) -> Result<Option<PlayerRecord>, StoreError> {
        match fs::read_to_string(self.record_path(user_id)) {
            Ok(raw) => Self::parse(user_id, &raw).map(Some),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Unavailable(err.to_string())),
        }
    }

    fn write(
        &self,
        user_id: &str,
        record: &PlayerRecord,
        expected_revision: Option<u64>,
    ) -> Result<(), StoreError> {
        let actual = self.read(user_id)?.map(|stored| stored.revision);
        if actual != expected_revision {
            return Err(StoreError::Conflict {
                user_id: user_id.to_string(),
                expected: expected_revision,
                actual,
            });
        }

        fs::create_dir_all(&self.dir).map_err(|err| StoreError::Unavailable(err.to_string()))?;
        let target = self.record_path(user_id);
        let staging = target.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(record)
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        fs::write(&staging, body).map_err(|err| StoreError::Unavailable(err.to_string()))?;
        fs::rename(&staging, &target).map_err(|err| {
            let _ = fs::remove_file(&staging);
            StoreError::Unavailable(err.to_string())
        })?;
        log::debug!("stored {} (revision {})", target.display(), record.revision);
        Ok(())
    }

    fn list(&self) -> Result<Vec<(String, PlayerRecord)>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::Unavailable(err.to_string())),
        };

        let mut records = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|err| StoreError::Unavailable(err.to_string()))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(user_id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(decode_user_id)
            else {
                log::warn!("skipping unrecognized record file {}", path.display());
                continue;
            };
            let raw =
                fs::read_to_string(&path).map_err(|err| StoreError::Unavailable(err.to_string()))?;
            match Self::parse(&user_id, &raw) {
                Ok(record) => records.push((user_id, record)),
                Err(err) => log::warn!("skipping {}: {err}", path.display()),
            }
        }
        Ok(records)
    }
}

/// File-name-safe form of a user id: `[A-Za-z0-9_-]` pass through, every
/// other byte becomes `%XX`.
fn encode_user_id(user_id: &str) -> String {
    let mut encoded = String::with_capacity(user_id.len());
    for byte in user_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

fn decode_user_id(encoded: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(encoded.len());
    let mut rest = encoded.as_bytes();
    while let Some((&first, tail)) = rest.split_first() {
        if first == b'%' {
            let hex = std::str::from_utf8(tail.get(..2)?).ok()?;
            bytes.push(u8::from_str_radix(hex, 16).ok()?);
            rest = &tail[2..];
        } else {
            bytes.push(first);
            rest = tail;
        }
    }
    String::from_utf8(bytes).ok()
}
