use std::path::PathBuf;

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 4;
pub const MAX_POST_LENGTH: usize = 5000;

/// Which store backend holds the data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    Json,
    Sqlite,
}

pub fn token_expiration_hours() -> i64 {
    std::env::var("TEXTS_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}

pub fn listen_addr() -> String {
    std::env::var("TEXTS_LISTEN").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}

pub fn storage_kind() -> anyhow::Result<StorageKind> {
    match std::env::var("TEXTS_STORAGE").as_deref() {
        Err(_) | Ok("json") => Ok(StorageKind::Json),
        Ok("sqlite") => Ok(StorageKind::Sqlite),
        Ok(other) => anyhow::bail!("unknown TEXTS_STORAGE value: {other:?} (expected json or sqlite)"),
    }
}

pub fn database_file(kind: StorageKind) -> PathBuf {
    match std::env::var("TEXTS_DB_FILE") {
        Ok(path) => PathBuf::from(path),
        Err(_) => PathBuf::from(match kind {
            StorageKind::Json => "database.json",
            StorageKind::Sqlite => "database.db",
        }),
    }
}
