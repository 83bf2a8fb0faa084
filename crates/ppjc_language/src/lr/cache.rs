//! The on-disk parse-table cache.
//!
//! Building the canonical LR(1) table for the full grammar takes the bulk
//! of compiler start-up, and the grammar file almost never changes. The
//! table is therefore serialized next to the working directory, tagged
//! with a format version and an FNV-1a hash of the grammar file bytes. A
//! later run loads the table only when both match; any mismatch (edited
//! grammar, older cache layout, corrupt file) falls back to a rebuild that
//! rewrites the cache.
//!
//! The cache file is replaced by writing a temporary sibling and renaming
//! it over the old file, so a concurrent reader never observes a partial
//! write.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::lr::table::ParseTable;

/// Bumped whenever the serialized layout changes.
pub const CACHE_VERSION: u32 = 1;

/// Default cache file path, relative to the working directory.
pub const DEFAULT_CACHE_PATH: &str = ".ppjc-cache/parse_table.json";

#[derive(Serialize, Deserialize)]
struct TableCache {
    version: u32,
    grammar_hash: u64,
    table: ParseTable,
}

/// FNV-1a, 64-bit, over the raw grammar file bytes.
pub fn grammar_hash(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Loads a cached table if the file exists, parses, and matches both the
/// format version and the grammar hash. Any failure is a cache miss, never
/// an error.
pub fn load(path: &Path, expected_hash: u64) -> Option<ParseTable> {
    let text = fs::read_to_string(path).ok()?;
    let cache: TableCache = serde_json::from_str(&text).ok()?;
    if cache.version != CACHE_VERSION || cache.grammar_hash != expected_hash {
        return None;
    }
    Some(cache.table)
}

/// Writes the cache file atomically (temp sibling + rename), creating the
/// cache directory on demand.
pub fn store(path: &Path, grammar_hash: u64, table: &ParseTable) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let cache = TableCache {
        version: CACHE_VERSION,
        grammar_hash,
        table: table.clone(),
    };
    let json = serde_json::to_string(&cache)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
