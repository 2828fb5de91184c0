//! Snapshot files: one per indexed folder, written atomically.
//!
//! Frame layout: `b"LSIX"` | format version (u32 LE) | bincode payload |
//! CRC32 of the payload (u32 BE). A sidecar `index_<key>.json` carries
//! human-readable metadata and is never read back by `load_snapshot`.

use crate::error::{EngineError, Result};
use crate::index::{Document, DocumentRegistry, IndexState, InvertedIndex, TermStats};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;
const SNAPSHOT_MAGIC: &[u8; 4] = b"LSIX";
const HEADER_LEN: usize = 8;
const FOOTER_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    pub key: String,
    pub folder: Option<String>,
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
}

/// Version 1 payload. A new version gets its own struct and a decode arm in
/// `decode_payload`.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotV1 {
    folder: Option<String>,
    created_at: String,
    total_docs: u32,
    documents: Vec<Document>,
    term_stats: Vec<TermStats>,
    doc_freq: HashMap<String, u32>,
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn snapshot(&self, key: &str) -> PathBuf { self.root.join(format!("index_{key}.bin")) }
    pub fn meta(&self, key: &str) -> PathBuf { self.root.join(format!("index_{key}.json")) }
    fn snapshot_tmp(&self, key: &str) -> PathBuf { self.root.join(format!("index_{key}.bin.tmp")) }
}

/// Normalizes a folder path for keying: canonical when the folder exists,
/// `/` separators, no trailing separator.
pub fn normalize_folder(folder: &Path) -> String {
    let resolved = fs::canonicalize(folder).unwrap_or_else(|_| folder.to_path_buf());
    let unified = resolved.to_string_lossy().replace('\\', "/");
    match unified.trim_end_matches('/') {
        "" if unified.starts_with('/') => "/".to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// Hex SHA-1 of the normalized folder path. Distinct folders could collide;
/// that risk is accepted.
pub fn folder_key(folder: &Path) -> String { identity_key(&normalize_folder(folder)) }

/// Key for a folder identity that is already normalized, as stored in
/// `IndexState::folder`.
pub fn identity_key(identity: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(identity.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A state built from a folder may only live under that folder's key.
fn check_owner(key: &str, state: &IndexState) -> Result<()> {
    match &state.folder {
        Some(folder) if identity_key(folder) != key => {
            Err(EngineError::FolderMismatch { key: key.to_string(), folder: folder.clone() })
        }
        _ => Ok(()),
    }
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

/// Serializes `state` under `key`. The previous snapshot, if any, stays
/// intact unless the new one is completely written.
pub fn save_snapshot(paths: &IndexPaths, key: &str, state: &IndexState) -> Result<MetaFile> {
    check_owner(key, state)?;
    fs::create_dir_all(&paths.root)?;
    let created_at = now_rfc3339();
    let payload = SnapshotV1 {
        folder: state.folder.clone(),
        created_at: created_at.clone(),
        total_docs: state.total_docs(),
        documents: state.registry.clone().into_vec(),
        term_stats: state.index.term_stats.clone(),
        doc_freq: state.index.df.clone(),
    };
    let bytes = bincode::serialize(&payload)?;
    let crc = crc32fast::hash(&bytes);

    let mut output = Vec::with_capacity(HEADER_LEN + bytes.len() + FOOTER_LEN);
    output.extend_from_slice(SNAPSHOT_MAGIC);
    output.extend_from_slice(&SNAPSHOT_FORMAT_VERSION.to_le_bytes());
    output.extend_from_slice(&bytes);
    output.extend_from_slice(&crc.to_be_bytes());

    let tmp = paths.snapshot_tmp(key);
    let target = paths.snapshot(key);
    if let Err(e) = fs::write(&tmp, &output).and_then(|_| fs::rename(&tmp, &target)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    let meta = MetaFile {
        key: key.to_string(),
        folder: state.folder.clone(),
        num_docs: state.total_docs(),
        created_at,
        version: SNAPSHOT_FORMAT_VERSION,
    };
    if let Err(e) = save_meta(paths, &meta) {
        tracing::warn!(key, error = %e, "snapshot saved but metadata sidecar could not be written");
    }
    tracing::info!(key, bytes = output.len(), num_docs = meta.num_docs, crc = %format!("{crc:#010x}"), "saved snapshot");
    Ok(meta)
}

/// Reads the snapshot stored under `key`. Any problem with the file is an
/// error; a partially decoded state is never returned.
pub fn load_snapshot(paths: &IndexPaths, key: &str) -> Result<IndexState> {
    let path = paths.snapshot(key);
    let raw = match fs::read(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(EngineError::NoIndex { key: key.to_string() }),
        Err(e) => return Err(e.into()),
    };
    let state = decode_frame(&path, &raw)?;
    check_owner(key, &state)?;
    tracing::info!(key, num_docs = state.total_docs(), "loaded snapshot");
    Ok(state)
}

fn decode_frame(path: &Path, raw: &[u8]) -> Result<IndexState> {
    if raw.len() < HEADER_LEN + FOOTER_LEN {
        return Err(EngineError::corrupt(path, format!("file too short ({} bytes)", raw.len())));
    }
    if &raw[..4] != SNAPSHOT_MAGIC {
        return Err(EngineError::corrupt(path, "bad magic"));
    }
    let version = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
    let (payload, footer) = raw[HEADER_LEN..].split_at(raw.len() - HEADER_LEN - FOOTER_LEN);
    let stored = u32::from_be_bytes([footer[0], footer[1], footer[2], footer[3]]);
    let computed = crc32fast::hash(payload);
    if stored != computed {
        return Err(EngineError::corrupt(
            path,
            format!("checksum mismatch (stored {stored:#010x}, computed {computed:#010x})"),
        ));
    }
    decode_payload(path, version, payload)
}

fn decode_payload(path: &Path, version: u32, payload: &[u8]) -> Result<IndexState> {
    match version {
        1 => {
            let snap: SnapshotV1 = bincode::deserialize(payload)
                .map_err(|e| EngineError::corrupt(path, format!("decode failed: {e}")))?;
            state_from_v1(path, snap)
        }
        found => Err(EngineError::UnsupportedVersion { found, expected: SNAPSHOT_FORMAT_VERSION }),
    }
}

fn state_from_v1(path: &Path, snap: SnapshotV1) -> Result<IndexState> {
    if snap.total_docs as usize != snap.documents.len() {
        return Err(EngineError::corrupt(
            path,
            format!("total_docs {} but {} documents", snap.total_docs, snap.documents.len()),
        ));
    }
    let state = IndexState {
        registry: DocumentRegistry::from_vec(snap.documents),
        index: InvertedIndex { df: snap.doc_freq, term_stats: snap.term_stats },
        folder: snap.folder,
    };
    state.validate().map_err(|reason| EngineError::corrupt(path, reason))?;
    Ok(state)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    fs::create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta).map_err(io::Error::from)?;
    fs::write(paths.meta(&meta.key), json)?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths, key: &str) -> Result<MetaFile> {
    let buf = fs::read_to_string(paths.meta(key))?;
    let meta: MetaFile = serde_json::from_str(&buf).map_err(io::Error::from)?;
    Ok(meta)
}

/// Metadata for every snapshot under the index root, newest first.
/// Unreadable sidecars are skipped.
pub fn list_indexes(paths: &IndexPaths) -> Result<Vec<MetaFile>> {
    let entries = match fs::read_dir(&paths.root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut metas = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(key) = name.strip_prefix("index_").and_then(|n| n.strip_suffix(".json")) else { continue };
        match load_meta(paths, key) {
            Ok(meta) => metas.push(meta),
            Err(e) => tracing::warn!(file = %name, error = %e, "skipping unreadable index metadata"),
        }
    }
    metas.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.key.cmp(&b.key)));
    Ok(metas)
}
