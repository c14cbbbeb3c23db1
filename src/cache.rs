// 🗃️ Record Cache - load the unified table once, reload when the file changes
//
// The cache key is a fingerprint of the external file (absent, or
// mtime + size + SHA-256). mtime and size are checked on every call; the
// hash only when they move. Synthetic data is deterministic, so a reload
// with unchanged content would produce the same table anyway.

use crate::config::AnalyticsConfig;
use crate::records::CostRecord;
use crate::source::load_table;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

/// Cheap identity of a file: modification time and size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl FileStat {
    /// None when the file does not exist
    pub fn of(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?;

        Ok(Some(FileStat {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFingerprint {
    Absent,
    Present { stat: FileStat, sha256: String },
}

impl SourceFingerprint {
    pub fn of(path: &Path) -> Result<Self> {
        let stat = FileStat::of(path)?;
        Self::with_stat(path, stat)
    }

    fn with_stat(path: &Path, stat: Option<FileStat>) -> Result<Self> {
        let Some(stat) = stat else {
            return Ok(SourceFingerprint::Absent);
        };

        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);

        Ok(SourceFingerprint::Present {
            stat,
            sha256: format!("{:x}", hasher.finalize()),
        })
    }

    /// True when mtime and size still match. Without an mtime the content must be hashed.
    fn stat_unchanged(&self, current: Option<FileStat>) -> bool {
        match (self, current) {
            (SourceFingerprint::Absent, None) => true,
            (SourceFingerprint::Present { stat, .. }, Some(current)) => {
                current.modified.is_some() && *stat == current
            }
            _ => false,
        }
    }

    /// Same bytes on disk, whatever the mtime says
    fn same_content(&self, other: &SourceFingerprint) -> bool {
        match (self, other) {
            (SourceFingerprint::Absent, SourceFingerprint::Absent) => true,
            (
                SourceFingerprint::Present { stat: a, sha256: x },
                SourceFingerprint::Present { stat: b, sha256: y },
            ) => a.len == b.len && x == y,
            _ => false,
        }
    }
}

struct CacheEntry {
    fingerprint: SourceFingerprint,
    table: Arc<[CostRecord]>,
    loaded_at: DateTime<Utc>,
}

/// Explicit, caller-owned cache of the resolved table
pub struct RecordCache {
    config: AnalyticsConfig,
    entry: Option<CacheEntry>,
}

impl RecordCache {
    pub fn new(config: AnalyticsConfig) -> Self {
        RecordCache {
            config,
            entry: None,
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Cached table, reloaded first if the external file changed.
    ///
    /// The file is only hashed when its mtime or size moved.
    pub fn get(&mut self) -> Result<Arc<[CostRecord]>> {
        let stat = FileStat::of(&self.config.data_path)?;

        if let Some(entry) = &self.entry {
            if entry.fingerprint.stat_unchanged(stat) {
                return Ok(Arc::clone(&entry.table));
            }
        }

        let current = SourceFingerprint::with_stat(&self.config.data_path, stat)?;

        if let Some(entry) = &mut self.entry {
            if entry.fingerprint.same_content(&current) {
                tracing::debug!("external cost file touched, content unchanged");
                entry.fingerprint = current;
                return Ok(Arc::clone(&entry.table));
            }
            tracing::info!("external cost file changed, reloading table");
        }

        let table: Arc<[CostRecord]> = Arc::from(load_table(&self.config)?);

        self.entry = Some(CacheEntry {
            fingerprint: current,
            table: Arc::clone(&table),
            loaded_at: Utc::now(),
        });

        Ok(table)
    }

    /// Drop the cached table; the next `get` reloads
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.entry.as_ref().map(|e| e.loaded_at)
    }

    pub fn is_loaded(&self) -> bool {
        self.entry.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config_for(path: &Path) -> AnalyticsConfig {
        let mut config = AnalyticsConfig::default();
        config.data_path = path.to_path_buf();
        config.synthetic.record_count = 20;
        config
    }

    #[test]
    fn test_fingerprint_absent() {
        let dir = tempfile::tempdir().unwrap();
        let fp = SourceFingerprint::of(&dir.path().join("missing.csv")).unwrap();
        assert_eq!(fp, SourceFingerprint::Absent);
    }

    #[test]
    fn test_cache_reuses_table_until_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custos.csv");
        let mut cache = RecordCache::new(config_for(&path));

        let first = cache.get().unwrap();
        let second = cache.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second), "unchanged source must hit the cache");
        assert_eq!(first.len(), 20);

        std::fs::write(
            &path,
            "facility_id,total_value,clinic,period\n2480666,100,Médica,2024-01\n",
        )
        .unwrap();

        let third = cache.get().unwrap();
        assert!(!Arc::ptr_eq(&second, &third));
        assert_eq!(third.len(), 21);
        assert_eq!(third[0].total_value, 100.0);
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        std::fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    fn mtime(path: &Path) -> SystemTime {
        std::fs::metadata(path).unwrap().modified().unwrap()
    }

    #[test]
    fn test_unchanged_stat_skips_hashing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custos.csv");
        std::fs::write(&path, "facility_id,total_value\n2480666,100\n").unwrap();

        let mut cache = RecordCache::new(config_for(&path));
        let first = cache.get().unwrap();
        let original = mtime(&path);

        // Same size, same mtime, different bytes: only a hash would notice
        std::fs::write(&path, "facility_id,total_value\n2480666,200\n").unwrap();
        set_mtime(&path, original);

        let second = cache.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second), "matching mtime and size must not rehash");
        assert_eq!(second[0].total_value, 100.0);

        cache.invalidate();
        assert_eq!(cache.get().unwrap()[0].total_value, 200.0);
    }

    #[test]
    fn test_touched_file_with_same_content_keeps_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custos.csv");
        let content = "facility_id,total_value\n2480666,100\n";
        std::fs::write(&path, content).unwrap();

        let mut cache = RecordCache::new(config_for(&path));
        let first = cache.get().unwrap();

        std::fs::write(&path, content).unwrap();
        set_mtime(&path, mtime(&path) + Duration::from_secs(60));

        let second = cache.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second), "identical bytes must not reload");

        // The refreshed stat is remembered: a second call stays on the cheap path
        let third = cache.get().unwrap();
        assert!(Arc::ptr_eq(&second, &third));
    }

    #[test]
    fn test_invalidate_forces_reload_with_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = RecordCache::new(config_for(&dir.path().join("absent.csv")));

        let first = cache.get().unwrap();
        assert!(cache.is_loaded());

        cache.invalidate();
        assert!(!cache.is_loaded());
        assert!(cache.loaded_at().is_none());

        let second = cache.get().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(&*first, &*second, "reload must be deterministic");
    }
}
