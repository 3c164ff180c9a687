//! Per-connection REPL history, one `FileBackedHistory` file per
//! host/port/user/database combination, grounded on the teacher's session
//! history manager but trimmed to the single MongoDB connection shape this
//! crate has (no docker/vault/sqlite session variants).

use reedline::FileBackedHistory;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Identifies a connection for the purpose of naming its history file.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionId {
    identifier: String,
}

impl SessionId {
    pub fn new(host: &str, port: Option<u16>, user: &str, database: &str) -> Self {
        let port = port.unwrap_or(27017);
        SessionId {
            identifier: format!("{user}@{host}:{port}/{database}"),
        }
    }

    fn to_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.identifier.as_bytes());
        let result = hasher.finalize();
        format!("{result:x}")[..16].to_string()
    }

    fn history_filename(&self) -> String {
        format!("history_{}", self.to_hash())
    }
}

/// Loads (and lazily creates) the history file for a session under the
/// platform config directory.
pub fn load_history(session_id: &SessionId) -> FileBackedHistory {
    let dir = dirs::config_dir()
        .map(|d| d.join("mongosql"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&dir);
    let path = dir.join(session_id.history_filename());

    debug!(?path, "loading session history");
    FileBackedHistory::with_file(1000, path).unwrap_or_else(|e| {
        warn!("failed to open history file: {e}, falling back to in-memory history");
        FileBackedHistory::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_connection_details_hash_identically() {
        let a = SessionId::new("localhost", Some(27017), "root", "app");
        let b = SessionId::new("localhost", Some(27017), "root", "app");
        assert_eq!(a.history_filename(), b.history_filename());
    }

    #[test]
    fn different_databases_hash_differently() {
        let a = SessionId::new("localhost", Some(27017), "root", "app");
        let b = SessionId::new("localhost", Some(27017), "root", "other");
        assert_ne!(a.history_filename(), b.history_filename());
    }
}
