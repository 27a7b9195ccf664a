//! Content hashing for integrity records.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// SHA-256 of a file, streamed in 4 KiB chunks, as a lowercase hex string.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex_string(&hasher.finalize()))
}

/// SHA-256 of an in-memory JSON document (canonical serde_json rendering).
pub fn hash_json(value: &serde_json::Value) -> Result<String> {
    let bytes = serde_json::to_vec(value)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex_string(&hasher.finalize()))
}

fn hex_string(digest: &[u8]) -> String {
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_hash_file_deterministic() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"HEADER    TEST STRUCTURE\n").unwrap();
        let a = hash_file(f.path()).unwrap();
        let b = hash_file(f.path()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_hash_json_differs_on_content() {
        let a = hash_json(&serde_json::json!({"pdb_id": "1ABC"})).unwrap();
        let b = hash_json(&serde_json::json!({"pdb_id": "2DEF"})).unwrap();
        assert_ne!(a, b);
    }
}
