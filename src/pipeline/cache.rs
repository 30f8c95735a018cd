//! Кеш результатов конвейера с ключом по отпечатку входных файлов

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::PreparedData;
use crate::types::ModelResults;

/// SHA-256 от путей источников, их размеров и времени изменения
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceFingerprint(String);

impl SourceFingerprint {
    pub fn compute<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut hasher = Sha256::new();

        for path in paths {
            let path = path.as_ref();
            hasher.update(path.to_string_lossy().as_bytes());
            hasher.update([0u8]);

            match std::fs::metadata(path) {
                Ok(metadata) => {
                    let modified = metadata
                        .modified()
                        .ok()
                        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                        .map(|d| d.as_nanos())
                        .unwrap_or_default();
                    hasher.update(metadata.len().to_le_bytes());
                    hasher.update(modified.to_le_bytes());
                }
                Err(_) => hasher.update(b"missing"),
            }
        }

        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0[..12.min(self.0.len())])
    }
}

/// Подготовленная таблица и результаты модели, привязанные к отпечатку.
/// Результаты модели живут не дольше таблицы, на которой они посчитаны.
#[derive(Debug, Default)]
pub struct PipelineCache {
    prepared: Option<Arc<PreparedData>>,
    results: Option<Arc<ModelResults>>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Таблица, если она посчитана по тем же файлам
    pub fn lookup(&self, fingerprint: &SourceFingerprint) -> Option<Arc<PreparedData>> {
        self.prepared
            .as_ref()
            .filter(|p| &p.fingerprint == fingerprint)
            .cloned()
    }

    pub fn store_prepared(&mut self, prepared: PreparedData) -> Arc<PreparedData> {
        let prepared = Arc::new(prepared);
        self.prepared = Some(Arc::clone(&prepared));
        self.results = None;
        prepared
    }

    pub fn store_results(&mut self, results: ModelResults) -> Arc<ModelResults> {
        let results = Arc::new(results);
        self.results = Some(Arc::clone(&results));
        results
    }

    pub fn prepared(&self) -> Option<Arc<PreparedData>> {
        self.prepared.clone()
    }

    pub fn results(&self) -> Option<Arc<ModelResults>> {
        self.results.clone()
    }

    pub fn invalidate(&mut self) {
        if self.prepared.is_some() || self.results.is_some() {
            tracing::info!("Pipeline cache invalidated");
        }
        self.prepared = None;
        self.results = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, SystemTime};

    #[test]
    fn fingerprint_is_stable_for_unchanged_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(&path, "x\n1\n").unwrap();

        let first = SourceFingerprint::compute(&[&path]);
        let second = SourceFingerprint::compute(&[&path]);
        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), 64);
    }

    #[test]
    fn fingerprint_changes_with_content_or_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(&path, "x\n1\n").unwrap();
        let before = SourceFingerprint::compute(&[&path]);

        fs::write(&path, "x\n1\n2\n").unwrap();
        let grown = SourceFingerprint::compute(&[&path]);
        assert_ne!(before, grown);

        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000)).unwrap();
        let touched = SourceFingerprint::compute(&[&path]);
        assert_ne!(grown, touched);
    }

    #[test]
    fn missing_file_differs_from_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        let missing = SourceFingerprint::compute(&[&path]);
        fs::write(&path, "").unwrap();
        assert_ne!(missing, SourceFingerprint::compute(&[&path]));
    }
}
