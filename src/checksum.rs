use std::fs::File;
use std::io::{Seek, SeekFrom};

use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// SHA-256 of the remaining file contents as lowercase hex. The handle is
/// rewound to the start afterwards so the caller can read it again.
pub fn file_digest(file: &mut File) -> Result<String> {
    let mut hasher = Sha256::new();
    std::io::copy(file, &mut hasher)?;
    file.seek(SeekFrom::Start(0))?;
    Ok(hex::encode(hasher.finalize()))
}

/// The digest recorded for `name` by the last successful import, if any.
pub fn stored_digest(conn: &Connection, name: &str) -> Result<Option<String>> {
    let hash = conn
        .query_row("SELECT hash FROM files WHERE name = ?1", [name], |r| r.get(0))
        .optional()?;
    Ok(hash)
}

/// A file is (re)processed when it was never recorded or its content changed.
/// "No record" is `None`, never an empty string.
pub fn should_process(stored: Option<&str>, digest: &str) -> bool {
    match stored {
        None => true,
        Some(previous) => previous != digest,
    }
}
