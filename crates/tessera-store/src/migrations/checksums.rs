//! Migration checksums
//!
//! A migration's checksum is the hex SHA-256 of its SQL with line endings
//! normalised, so a CRLF checkout of the same file still verifies.

use sha2::{Digest, Sha256};

pub fn compute_checksum(sql: &str) -> String {
    let normalised = sql.replace("\r\n", "\n");
    hex::encode(Sha256::digest(normalised.as_bytes()))
}
