//! Journal persistence: snapshot shape and workspace identity

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::operation::Operation;

/// Serialized form of a full journal
///
/// Secondary indexes are stored as ordered pair lists so the on-disk file is
/// stable across saves of the same state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalSnapshot {
    /// Every retained operation, keyed by id
    pub operations: HashMap<String, Operation>,
    /// Message index as (message id, operation ids) pairs
    pub operations_by_message: Vec<(String, Vec<String>)>,
    /// Session index as (session bucket, operation ids) pairs
    pub operations_by_session: Vec<(String, Vec<String>)>,
    /// Session active at save time
    pub current_session_id: Option<String>,
    /// Identity tag of the workspace the journal belongs to
    pub workspace_id: String,
}

/// Stable identity tag for a workspace root
///
/// Hex-truncated SHA-256 of the root path string. Distinct paths hashing to
/// the same tag is an accepted risk; the tag only has to be deterministic and
/// filename-safe.
pub fn workspace_id(root: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(root.to_string_lossy().as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..16].to_string()
}

/// File name the journal persists under for a given workspace identity
pub fn journal_file_name(workspace_id: &str) -> String {
    format!("journal-{}.json", workspace_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_workspace_id_is_deterministic() {
        let a = workspace_id(&PathBuf::from("/home/user/project"));
        let b = workspace_id(&PathBuf::from("/home/user/project"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_workspace_id_differs_across_roots() {
        let a = workspace_id(&PathBuf::from("/home/user/project"));
        let b = workspace_id(&PathBuf::from("/home/user/other"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_journal_file_name() {
        assert_eq!(journal_file_name("abc123"), "journal-abc123.json");
    }
}
