//! File probing primitives.
//!
//! Pure functions of a path used for change detection: content hashing, size,
//! modification time, text classification, and best-effort reads.
//!
//! Every failure degrades to a defined sentinel (empty hash, zero size,
//! minimum timestamp, empty string) instead of propagating. Downstream logic
//! treats an empty hash as "file absent/unknown", so a single unreadable file
//! never aborts a whole-project scan.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Extensions classified as text for diff and search purposes.
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "py", "js", "ts", "html", "css", "json", "xml", "yml", "yaml",
    "toml", "ini", "cfg", "conf", "log", "sql", "csv", "c", "cpp", "h", "java",
    "cs", "php", "rb", "go", "rs", "kt", "swift", "scala", "sh", "bat", "ps1",
];

/// Chunk size for streamed hashing. Keeps memory bounded for large files.
const HASH_CHUNK: usize = 8192;

/// Compute the SHA-256 digest of a file's content as lowercase hex.
///
/// The file is read in fixed-size chunks. Returns an empty string if the
/// file is missing or unreadable.
pub fn file_hash(path: &Path) -> String {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return String::new(),
    };

    let mut hasher = Sha256::new();
    let mut buf = [0u8; HASH_CHUNK];
    loop {
        match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buf[..n]),
            Err(_) => return String::new(),
        }
    }

    format!("{:x}", hasher.finalize())
}

/// Get a file's size in bytes, or 0 if it cannot be read.
pub fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Get a file's modification time.
///
/// Returns the minimum representable timestamp if the file is missing or the
/// platform cannot report a modification time.
pub fn file_mtime(path: &Path) -> DateTime<Utc> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Classify a path as text or binary by its extension.
///
/// This is an allow-list check on the display path only; the file does not
/// need to exist.
pub fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            TEXT_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Read a file as text, tolerating encoding errors.
///
/// Invalid UTF-8 sequences are replaced rather than rejected. Returns an
/// empty string if the file is missing or unreadable.
pub fn read_text(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}
