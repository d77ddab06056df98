// src/watch/hash.rs

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, info};

use crate::fs::FileSystem;

/// Relative path (from the project root) to the hashes file.
///
/// The effective path on disk is `<root>/.modbuild/hashes`.
pub const HASH_FILE_PATH: &str = ".modbuild/hashes";

/// Compute the blake3 hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut reader = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Last seen content hash per watched path.
pub trait HashStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, hash: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Stores hashes in `<root>/.modbuild/hashes`, one `<hash> <path>` per line.
pub struct FileHashStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileHashStore {
    pub fn new(root: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { root, fs }
    }

    fn path(&self) -> PathBuf {
        self.root.join(HASH_FILE_PATH)
    }

    fn load_all(&self) -> Result<BTreeMap<String, String>> {
        let path = self.path();
        let mut map = BTreeMap::new();
        if !self.fs.exists(&path) {
            return Ok(map);
        }

        let text = self
            .fs
            .read_to_string(&path)
            .with_context(|| format!("reading hash file at {:?}", path))?;
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some((hash, key)) = trimmed.split_once(char::is_whitespace) {
                map.insert(key.trim().to_string(), hash.to_string());
            }
        }
        Ok(map)
    }

    fn save_all(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let mut out = String::new();
        for (key, hash) in map {
            out.push_str(hash);
            out.push(' ');
            out.push_str(key);
            out.push('\n');
        }
        self.fs.write_atomic(&self.path(), out.as_bytes())
    }
}

impl HashStore for FileHashStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load_all()?.get(key).cloned())
    }

    fn save(&mut self, key: &str, hash: &str) -> Result<()> {
        let mut map = self.load_all()?;
        map.insert(key.to_string(), hash.to_string());
        self.save_all(&map)?;
        debug!(path = %key, hash = %hash, "stored content hash (file)");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut map = self.load_all()?;
        if map.remove(key).is_some() {
            self.save_all(&map)?;
            info!(path = %key, "dropped content hash (file)");
        }
        Ok(())
    }
}

/// Stores hashes in memory only.
#[derive(Default)]
pub struct MemoryHashStore {
    map: HashMap<String, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.get(key).cloned())
    }

    fn save(&mut self, key: &str, hash: &str) -> Result<()> {
        self.map.insert(key.to_string(), hash.to_string());
        debug!(path = %key, hash = %hash, "stored content hash (memory)");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }
}
