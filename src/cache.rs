//! Content-addressed cache of compiled stroke maps.
//!
//! Entries live as JSON documents named `<image-hash>_<settings-hash>.json`
//! in the cache directory. Nothing in here is fatal to compilation: an
//! unreadable, stale or mismatched entry is simply a miss.

use crate::error::Result;
use crate::settings::{DrawFlags, DrawMode, Settings};
use crate::strokes::{CanvasRect, StrokeMap};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const HASH_LEN: usize = 16;

/// First `HASH_LEN` hex digits of the SHA-256 of `bytes`.
pub fn short_hash(bytes: &[u8]) -> String {
    let mut hex = format!("{:x}", Sha256::digest(bytes));
    hex.truncate(HASH_LEN);
    hex
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub image_hash: String,
    pub settings_hash: String,
}

impl CacheKey {
    pub fn file_name(&self) -> String {
        format!("{}_{}.json", self.image_hash, self.settings_hash)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.image_hash, self.settings_hash)
    }
}

#[derive(Serialize)]
struct KeyMaterial<'a> {
    settings: &'a Settings,
    flags: DrawFlags,
    mode: DrawMode,
    canvas: &'a CanvasRect,
}

/// One persisted compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub image_hash: String,
    pub settings_hash: String,
    pub strokes: StrokeMap,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
    pub canvas: CanvasRect,
    pub settings: serde_json::Value,
    pub flags: DrawFlags,
    pub mode: DrawMode,
}

#[derive(Debug, Clone)]
pub struct StrokeCache {
    dir: PathBuf,
    ttl: Duration,
}

impl StrokeCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key(
        image_bytes: &[u8],
        settings: &Settings,
        flags: DrawFlags,
        mode: DrawMode,
        canvas: &CanvasRect,
    ) -> CacheKey {
        let material = KeyMaterial {
            settings,
            flags,
            mode,
            canvas,
        };
        // Serializing plain structs of numbers cannot fail.
        let encoded = serde_json::to_vec(&material).unwrap_or_default();
        CacheKey {
            image_hash: short_hash(image_bytes),
            settings_hash: short_hash(&encoded),
        }
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    pub fn load(&self, key: &CacheKey, settings: &Settings, canvas: &CanvasRect) -> Option<StrokeMap> {
        self.load_at(key, settings, canvas, now_secs())
    }

    /// [`load`](Self::load) evaluated as if the current time were `now`.
    pub fn load_at(
        &self,
        key: &CacheKey,
        settings: &Settings,
        canvas: &CanvasRect,
        now: u64,
    ) -> Option<StrokeMap> {
        let path = self.path_for(key);
        if !path.exists() {
            tracing::debug!(%key, "cache miss");
            return None;
        }
        let entry = match read_entry(&path) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(%key, error = %err, "ignoring unreadable cache entry");
                return None;
            }
        };
        match self.rejection(&entry, key, settings, canvas, now) {
            Some(reason) => {
                tracing::debug!(%key, reason, "cache entry rejected");
                None
            }
            None => {
                tracing::info!(%key, strokes = entry.strokes.total_strokes(), "cache hit");
                Some(entry.strokes)
            }
        }
    }

    /// Whether a usable entry exists for `key`.
    pub fn status(&self, key: &CacheKey, settings: &Settings, canvas: &CanvasRect) -> bool {
        self.load(key, settings, canvas).is_some()
    }

    fn rejection(
        &self,
        entry: &CacheEntry,
        key: &CacheKey,
        settings: &Settings,
        canvas: &CanvasRect,
        now: u64,
    ) -> Option<&'static str> {
        if entry.image_hash != key.image_hash || entry.settings_hash != key.settings_hash {
            return Some("key mismatch");
        }
        if now.saturating_sub(entry.created_at) > self.ttl.as_secs() {
            return Some("expired");
        }
        match serde_json::to_value(settings) {
            Ok(current) if current == entry.settings => {}
            _ => return Some("settings changed"),
        }
        if entry.canvas != *canvas {
            return Some("canvas changed");
        }
        None
    }

    pub fn store(
        &self,
        key: &CacheKey,
        strokes: &StrokeMap,
        settings: &Settings,
        flags: DrawFlags,
        mode: DrawMode,
        canvas: &CanvasRect,
    ) -> Result<PathBuf> {
        self.store_at(key, strokes, settings, flags, mode, canvas, now_secs())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn store_at(
        &self,
        key: &CacheKey,
        strokes: &StrokeMap,
        settings: &Settings,
        flags: DrawFlags,
        mode: DrawMode,
        canvas: &CanvasRect,
        created_at: u64,
    ) -> Result<PathBuf> {
        let entry = CacheEntry {
            image_hash: key.image_hash.clone(),
            settings_hash: key.settings_hash.clone(),
            strokes: strokes.clone(),
            created_at,
            canvas: *canvas,
            settings: serde_json::to_value(settings)?,
            flags,
            mode,
        };
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&entry)?)?;
        fs::rename(&tmp, &path)?;
        tracing::debug!(%key, path = %path.display(), "cache entry stored");
        Ok(path)
    }

    /// Remove the whole cache directory.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete expired or unreadable entries; returns how many were removed.
    pub fn purge_stale(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let now = now_secs();
        let mut removed = 0;
        for dirent in entries {
            let path = dirent?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let stale = read_entry(&path)
                .map(|entry| now.saturating_sub(entry.created_at) > self.ttl.as_secs())
                .unwrap_or(true);
            if stale {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn read_entry(path: &Path) -> anyhow::Result<CacheEntry> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}
