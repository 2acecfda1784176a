//! Disk-backed parse cache.
//!
//! Parsing is a pure function of the grammar and the source text, so a
//! parsed [`Program`] can be memoized across runs: hash the grammar together
//! with the source, and if a prior run already parsed that exact pair, load
//! its `bincode`-encoded result back instead of re-running the grammar.
//! Mirrors `~/.basscache`, the original assembler's scheme keyed the same
//! way (`original_source/src/parser.cpp`), generalized onto `directories` so
//! the cache directory follows each platform's convention rather than
//! assuming a Unix home directory.

use crate::ast::Program;
use crate::error::Error;
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Written before the grammar hash in every cache file; a stand-in for the
/// original's `0xba55a570` sentinel, guarding against truncated or
/// foreign-format files left over from an interrupted write.
const MAGIC: u32 = 0xba55_a570;
const GRAMMAR_SOURCE: &str = include_str!("grammar.pest");

fn cache_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "badass").map(|d| d.cache_dir().to_path_buf())
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parses `source` via `parse`, consulting (and populating) the on-disk
/// cache first. Any cache I/O failure is treated as a miss: caching is an
/// optimization, never a correctness requirement, so it never surfaces as
/// an `Err` of its own.
pub fn parse_cached(source: &str, parse: impl FnOnce(&str) -> Result<Program, Error>) -> Result<Program, Error> {
    let dir = match cache_dir() {
        Some(d) => d,
        None => return parse(source),
    };
    let path = dir.join(hex_encode(&sha256(source.as_bytes())));

    if let Some(program) = read_cached(&path) {
        tracing::debug!(path = %path.display(), "parse cache hit");
        return Ok(program);
    }

    let program = parse(source)?;
    if let Err(e) = write_cached(&dir, &path, &program) {
        tracing::debug!(error = %e, "failed to write parse cache entry");
    }
    Ok(program)
}

fn read_cached(path: &Path) -> Option<Program> {
    let mut file = std::fs::File::open(path).ok()?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).ok()?;
    if buf.len() < 36 {
        return None;
    }
    if u32::from_le_bytes(buf[0..4].try_into().ok()?) != MAGIC {
        return None;
    }
    if buf[4..36] != sha256(GRAMMAR_SOURCE.as_bytes()) {
        return None;
    }
    bincode::deserialize(&buf[36..]).ok()
}

fn write_cached(dir: &Path, path: &Path, program: &Program) -> Result<(), Error> {
    std::fs::create_dir_all(dir)?;
    let mut buf = Vec::with_capacity(36);
    buf.extend_from_slice(&MAGIC.to_le_bytes());
    buf.extend_from_slice(&sha256(GRAMMAR_SOURCE.as_bytes()));
    buf.extend_from_slice(&bincode::serialize(program).map_err(|e| Error::Io(e.to_string()))?);
    std::fs::File::create(path)?.write_all(&buf)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::Stmt;

    #[test]
    fn round_trips_through_a_temp_cache_dir() {
        let dir = std::env::temp_dir().join(format!("badass-asm-cache-test-{:x}", sha256(b"seed")[0]));
        let path = dir.join(hex_encode(&sha256(b"start: nop\n")));
        let program: Program = vec![Stmt::Label("start".into())];
        write_cached(&dir, &path, &program).unwrap();
        let loaded = read_cached(&path).unwrap();
        assert_eq!(loaded, program);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn a_grammar_hash_mismatch_is_a_cache_miss() {
        let dir = std::env::temp_dir().join("badass-asm-cache-test-stale");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("stale");
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC.to_le_bytes());
        buf.extend_from_slice(&[0u8; 32]);
        std::fs::write(&path, &buf).unwrap();
        assert!(read_cached(&path).is_none());
        std::fs::remove_dir_all(&dir).ok();
    }
}
