//! Opaque key → blob storage.
//!
//! Keys are `/`-separated relative paths. Stores never interpret blob
//! contents; they only carry the bytes plus the two metadata fields a static
//! host needs to serve them.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

const CONTENT_VERSION_PREFIX: &str = "cv1_";

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    #[error("{key}: I/O error: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}: file name is not valid UTF-8")]
    NonUtf8Name(String),

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            key: key.into(),
            source,
        }
    }
}

/// Bytes plus serving metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub cache_control: String,
}

impl Blob {
    /// Build a blob with metadata derived from the key it will live under.
    pub fn for_key(key: &str, bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: content_type_for_key(key).to_string(),
            cache_control: cache_control_for_key(key).to_string(),
        }
    }
}

pub fn content_type_for_key(key: &str) -> &'static str {
    if key.ends_with(".json") {
        "application/json"
    } else {
        "application/octet-stream"
    }
}

/// Cache policy by key shape: pointers never cache, listings cache briefly,
/// leaf entries cache long.
pub fn cache_control_for_key(key: &str) -> &'static str {
    if key.starts_with("manifests/") {
        "no-cache"
    } else if key.ends_with("/catalog.json")
        || key.ends_with("/index.json")
        || key.contains("/pages/")
    {
        "public, max-age=300"
    } else {
        "public, max-age=86400"
    }
}

/// The storage seam. Implementations must return `list` results sorted.
pub trait BlobStore: Send + Sync {
    /// Name of this store (for diagnostics).
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Result<Option<Blob>, StoreError>;

    fn put(&self, key: &str, blob: Blob) -> Result<(), StoreError>;

    /// All keys beginning with `prefix`, sorted lexicographically.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// In-memory store for tests and pre-loaded content.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<String, Blob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert raw bytes with key-derived metadata.
    pub fn insert(&self, key: &str, bytes: impl Into<Vec<u8>>) -> Result<(), StoreError> {
        self.put(key, Blob::for_key(key, bytes.into()))
    }

    /// Insert a JSON value rendered compactly.
    pub fn insert_json(&self, key: &str, value: &serde_json::Value) -> Result<(), StoreError> {
        self.insert(key, value.to_string())
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<Blob>, StoreError> {
        validate_key(key)?;
        let blobs = self.blobs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(blobs.get(key).cloned())
    }

    fn put(&self, key: &str, blob: Blob) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut blobs = self.blobs.write().map_err(|_| StoreError::Poisoned)?;
        blobs.insert(key.to_string(), blob);
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let blobs = self.blobs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(blobs
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Directory-backed store. Writes are atomic (temp file, fsync, rename).
///
/// File names that are not valid UTF-8 are listed under their lossy key
/// (with U+FFFD), and `get` on such a key fails with
/// [`StoreError::NonUtf8Name`].
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    name: String,
    /// Key prefix (`{workspace}/`) that maps onto `root` itself.
    mount: Option<String>,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = format!("fs:{}", root.display());
        Self {
            root,
            name,
            mount: None,
        }
    }

    /// Serve one workspace directory as if it sat under `{workspace}/` in a
    /// content root. Keys outside that prefix are invalid.
    pub fn mounted(root: impl Into<PathBuf>, workspace: &str) -> Self {
        let root = root.into();
        let name = format!("fs:{} as {workspace}/", root.display());
        Self {
            root,
            name,
            mount: Some(format!("{workspace}/")),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        let rel = match &self.mount {
            Some(mount) => key
                .strip_prefix(mount.as_str())
                .ok_or_else(|| StoreError::InvalidKey(key.to_string()))?,
            None => key,
        };
        let mut path = self.root.clone();
        for seg in rel.split('/') {
            path.push(seg);
        }
        Ok(path)
    }

    fn collect_keys(&self, dir: &Path, out: &mut Vec<String>) -> Result<(), StoreError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(StoreError::io(dir.display().to_string(), err)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(dir.display().to_string(), e))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|e| StoreError::io(path.display().to_string(), e))?;
            if file_type.is_dir() {
                self.collect_keys(&path, out)?;
            } else if file_type.is_file() {
                if let Some(key) = self.key_for(&path)
                    && !is_temp_key(&key)
                {
                    out.push(key);
                }
            }
        }
        Ok(())
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let mut segments = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(seg) => segments.push(seg.to_string_lossy().into_owned()),
                _ => return None,
            }
        }
        let key = segments.join("/");
        Some(match &self.mount {
            Some(mount) => format!("{mount}{key}"),
            None => key,
        })
    }
}

fn is_temp_key(key: &str) -> bool {
    key.rsplit('/')
        .next()
        .is_some_and(|name| name.contains(".tmp."))
}

impl BlobStore for FsBlobStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Result<Option<Blob>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(Blob::for_key(key, bytes))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                if key.contains(char::REPLACEMENT_CHARACTER) {
                    return Err(StoreError::NonUtf8Name(key.to_string()));
                }
                Ok(None)
            }
            Err(err) => Err(StoreError::io(key, err)),
        }
    }

    fn put(&self, key: &str, blob: Blob) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        write_atomic(&path, &blob.bytes).map_err(|e| StoreError::io(key, e))
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        self.collect_keys(&self.root, &mut keys)?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()
    })();
    if let Err(err) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

/// Deterministic identifier for everything stored under `{workspace}/`.
///
/// Hashes sorted `(key, sha256(bytes))` pairs, so the ID changes iff some
/// document was added, removed, renamed, or edited.
pub fn content_version_id(store: &dyn BlobStore, workspace: &str) -> Result<String, StoreError> {
    let prefix = format!("{workspace}/");
    let mut hasher = Sha256::new();
    for key in store.list(&prefix)? {
        let Some(blob) = store.get(&key)? else {
            continue;
        };
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(format!("{:x}", Sha256::digest(&blob.bytes)).as_bytes());
        hasher.update([0u8]);
    }
    Ok(format!("{CONTENT_VERSION_PREFIX}{:x}", hasher.finalize()))
}
