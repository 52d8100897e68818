//! On-disk snapshot artifact.
//!
//! `snapshot.bin` layout: `[magic "PSIX"][format version u32 LE][bincode payload][CRC32 u32 BE]`.
//! The CRC covers the payload only. Both `snapshot.bin` and `meta.json` are
//! written to a temp file that is renamed into place, so readers see either
//! the old file or the new one.

use crate::error::{LoadError, SaveError};
use crate::index::Snapshot;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const MAGIC: &[u8; 4] = b"PSIX";
pub const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8;
const FOOTER_LEN: usize = 4;

/// Informational sidecar written next to the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    pub format_version: u32,
    pub num_docs: usize,
    pub num_terms: usize,
    /// CRC32 of the artifact payload, matching the footer of `snapshot.bin`.
    pub checksum: u32,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn snapshot(&self) -> PathBuf { self.root.join("snapshot.bin") }
    fn snapshot_tmp(&self) -> PathBuf { self.root.join("snapshot.bin.tmp") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    fn meta_tmp(&self) -> PathBuf { self.root.join("meta.json.tmp") }
}

/// Serialize a snapshot into artifact bytes. Same snapshot, same bytes.
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>, SaveError> {
    let payload = bincode::serialize(snapshot)?;
    let crc = crc32fast::hash(&payload);
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + FOOTER_LEN);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&crc.to_be_bytes());
    Ok(out)
}

/// Parse artifact bytes. The version tag is checked before the checksum.
pub fn decode_snapshot(raw: &[u8]) -> Result<Snapshot, LoadError> {
    if raw.len() < HEADER_LEN + FOOTER_LEN {
        return Err(LoadError::Corrupt(format!("artifact too short ({} bytes)", raw.len())));
    }
    if &raw[..4] != MAGIC {
        return Err(LoadError::Corrupt("bad magic bytes".into()));
    }
    let found = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
    if found != FORMAT_VERSION {
        return Err(LoadError::VersionMismatch { found, expected: FORMAT_VERSION });
    }

    let payload = &raw[HEADER_LEN..raw.len() - FOOTER_LEN];
    let footer = &raw[raw.len() - FOOTER_LEN..];
    let stored_crc = u32::from_be_bytes([footer[0], footer[1], footer[2], footer[3]]);
    let computed_crc = crc32fast::hash(payload);
    if stored_crc != computed_crc {
        return Err(LoadError::Corrupt(format!(
            "checksum mismatch: stored {stored_crc:#010x}, computed {computed_crc:#010x}"
        )));
    }

    let snapshot: Snapshot =
        bincode::deserialize(payload).map_err(|e| LoadError::Corrupt(format!("undecodable payload: {e}")))?;
    snapshot.check_postings().map_err(|e| LoadError::Corrupt(e.to_string()))?;
    Ok(snapshot)
}

/// Atomically publish `snapshot` as `snapshot.bin`. Returns the payload checksum.
pub fn save_snapshot(paths: &IndexPaths, snapshot: &Snapshot) -> Result<u32, SaveError> {
    let bytes = encode_snapshot(snapshot)?;
    let checksum = u32::from_be_bytes([
        bytes[bytes.len() - 4],
        bytes[bytes.len() - 3],
        bytes[bytes.len() - 2],
        bytes[bytes.len() - 1],
    ]);

    fs::create_dir_all(&paths.root)?;
    publish(&paths.snapshot_tmp(), &paths.snapshot(), &bytes)?;

    tracing::info!(path = %paths.snapshot().display(), bytes = bytes.len(), checksum = %format!("{checksum:#010x}"), "snapshot saved");
    Ok(checksum)
}

/// Write `bytes` to `tmp`, sync, then rename over `dest`. On failure the temp
/// file is removed and `dest` is untouched.
fn publish(tmp: &Path, dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let res = write_synced(tmp, bytes).and_then(|_| fs::rename(tmp, dest));
    if res.is_err() {
        let _ = fs::remove_file(tmp);
    }
    res
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut f = File::create(path)?;
    f.write_all(bytes)?;
    f.sync_all()
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<Snapshot, LoadError> {
    let path = paths.snapshot();
    let raw = match fs::read(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(LoadError::NotFound(path)),
        Err(e) => return Err(LoadError::Io(e)),
    };
    let snapshot = decode_snapshot(&raw)?;
    let stats = snapshot.stats();
    tracing::info!(path = %path.display(), num_docs = stats.num_docs, num_terms = stats.num_terms, "snapshot loaded");
    Ok(snapshot)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<(), SaveError> {
    fs::create_dir_all(&paths.root)?;
    let json = serde_json::to_vec_pretty(meta).map_err(io::Error::from)?;
    publish(&paths.meta_tmp(), &paths.meta(), &json)?;
    Ok(())
}

/// `Ok(None)` when no sidecar exists.
pub fn load_meta(paths: &IndexPaths) -> Result<Option<MetaFile>, LoadError> {
    let buf = match fs::read_to_string(paths.meta()) {
        Ok(buf) => buf,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(LoadError::Io(e)),
    };
    let meta = serde_json::from_str(&buf).map_err(|e| LoadError::Corrupt(format!("meta.json: {e}")))?;
    Ok(Some(meta))
}
