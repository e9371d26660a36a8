//! Snapshot Writer - persists the snapshot and its names projection
//!
//! Each artifact is written to a hidden temp file next to its target and
//! renamed into place, so a failed write never leaves a complete-looking
//! file. The two artifacts succeed or fail independently.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::{debug, info, warn};

use crate::error::{ConfigError, WriteError};
use crate::types::Snapshot;

/// Outcome of writing both artifacts
#[derive(Debug)]
pub struct WriteReport {
    pub markets: Result<PathBuf, WriteError>,
    pub names: Result<PathBuf, WriteError>,
}

impl WriteReport {
    pub fn is_ok(&self) -> bool {
        self.markets.is_ok() && self.names.is_ok()
    }
}

/// JSON snapshot writer
#[derive(Clone, Debug)]
pub struct SnapshotWriter {
    indent: usize,
}

impl Default for SnapshotWriter {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

impl SnapshotWriter {
    /// `indent == 0` writes compact JSON
    pub fn new(indent: usize) -> Self {
        Self { indent }
    }

    /// Write the snapshot to `markets_path` and its titles to `names_path`
    pub async fn write(&self, snapshot: &Snapshot, markets_path: &Path, names_path: &Path) -> WriteReport {
        let markets = self.write_json("markets", snapshot, markets_path).await;
        match &markets {
            Ok(path) => info!("Saved {} markets to {}", snapshot.total_markets, path.display()),
            Err(e) => warn!("Failed to write markets snapshot: {}", e),
        }

        let names = if names_path == markets_path {
            Err(WriteError::PathConflict { artifact: "market names", path: names_path.to_path_buf() })
        } else {
            self.write_json("market names", &snapshot.names(), names_path).await
        };
        match &names {
            Ok(path) => info!("Saved {} market names to {}", snapshot.markets.len(), path.display()),
            Err(e) => warn!("Failed to write market names: {}", e),
        }

        WriteReport { markets, names }
    }

    async fn write_json<T: Serialize + ?Sized>(
        &self,
        artifact: &'static str,
        value: &T,
        path: &Path,
    ) -> Result<PathBuf, WriteError> {
        let bytes = to_json(value, self.indent).map_err(|source| WriteError::Serialize { artifact, source })?;
        write_atomic(path, &bytes).await?;
        Ok(path.to_path_buf())
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T, indent: usize) -> Result<Vec<u8>, serde_json::Error> {
    if indent == 0 {
        return serde_json::to_vec(value);
    }

    let indent = " ".repeat(indent);
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent.as_bytes()));
    value.serialize(&mut serializer)?;
    out.push(b'\n');
    Ok(out)
}

/// Write to `.<name>.tmp` beside `path`, then rename over it
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| WriteError::Io { path, source }
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err(parent))?;
    }

    let temp_path = temp_path_for(path);
    debug!("Writing {} via {}", path.display(), temp_path.display());

    let result = match tokio::fs::write(&temp_path, bytes).await {
        Ok(()) => tokio::fs::rename(&temp_path, path).await.map_err(io_err(path)),
        Err(e) => Err(io_err(&temp_path)(e)),
    };

    if result.is_err() {
        let _ = tokio::fs::remove_file(&temp_path).await;
    }
    result
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

/// Reject output paths that can never be written as a file
pub fn validate_output_path(path: &Path) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidOutputPath { path: path.to_path_buf(), reason: reason.to_string() };

    if path.as_os_str().is_empty() {
        return Err(invalid("path is empty"));
    }
    if path.file_name().is_none() {
        return Err(invalid("path has no file name"));
    }
    if path.is_dir() {
        return Err(invalid("path is a directory"));
    }
    Ok(())
}

/// Validate both artifact paths and make sure they are distinct files
pub fn validate_output_paths(markets_path: &Path, names_path: &Path) -> Result<(), ConfigError> {
    validate_output_path(markets_path)?;
    validate_output_path(names_path)?;

    if names_path == markets_path {
        return Err(ConfigError::InvalidOutputPath {
            path: names_path.to_path_buf(),
            reason: "names output would overwrite the markets snapshot".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MarketRecord, StopReason};
    use serde_json::{json, Value};

    fn snapshot(markets: Vec<Value>) -> Snapshot {
        let markets: Vec<MarketRecord> = markets.into_iter().filter_map(MarketRecord::from_value).collect();
        Snapshot {
            timestamp: 1_700_000_000.5,
            mode: "all".to_string(),
            only_open_markets: false,
            total_markets: markets.len(),
            total_original_markets: None,
            total_asset_ids: 0,
            partial: true,
            stop_reason: StopReason::PageCeiling,
            pages_fetched: 1,
            duplicates_skipped: 0,
            started_at: "2026-10-18T00:00:00+00:00".to_string(),
            error: None,
            markets,
        }
    }

    #[tokio::test]
    async fn test_write_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let markets_path = dir.path().join("out/markets.json");
        let names_path = dir.path().join("out/market_names.json");
        let snap = snapshot(vec![
            json!({"question": "Will it rain?", "condition_id": "a"}),
            json!({"condition_id": "b"}),
            json!({"slug": "snow-day", "question": "Snow day? ✓"}),
        ]);

        let report = SnapshotWriter::new(2).write(&snap, &markets_path, &names_path).await;
        assert!(report.is_ok());

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&markets_path).unwrap()).unwrap();
        assert_eq!(written["mode"], "all");
        assert_eq!(written["total_markets"], 3);
        assert_eq!(written["partial"], true);
        assert_eq!(written["stop_reason"], "page_ceiling");
        assert!(written.get("total_original_markets").is_none());
        assert_eq!(written["markets"][1]["condition_id"], "b");

        let names: Vec<String> = serde_json::from_str(&std::fs::read_to_string(&names_path).unwrap()).unwrap();
        assert_eq!(names, vec!["Will it rain?", "", "Snow day? ✓"]);
    }

    #[tokio::test]
    async fn test_indent_controls_layout() {
        let dir = tempfile::tempdir().unwrap();
        let snap = snapshot(vec![json!({"question": "Q"})]);

        let compact = dir.path().join("compact.json");
        SnapshotWriter::new(0).write(&snap, &compact, &dir.path().join("n0.json")).await;
        assert!(!std::fs::read_to_string(&compact).unwrap().contains('\n'));

        let wide = dir.path().join("wide.json");
        SnapshotWriter::new(4).write(&snap, &wide, &dir.path().join("n4.json")).await;
        assert!(std::fs::read_to_string(&wide).unwrap().contains("\n    \"timestamp\""));
    }

    #[tokio::test]
    async fn test_artifacts_fail_independently() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let markets_path = dir.path().join("markets.json");
        let names_path = blocker.join("market_names.json");
        let report = SnapshotWriter::default().write(&snapshot(vec![]), &markets_path, &names_path).await;

        assert!(report.markets.is_ok());
        assert!(matches!(report.names, Err(WriteError::Io { .. })));
        assert!(markets_path.exists());
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("markets.json");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), b"x").unwrap();

        let result = write_atomic(&target, b"{}").await;

        assert!(result.is_err());
        assert!(target.is_dir());
        assert!(!temp_path_for(&target).exists());
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        assert_eq!(temp_path_for(Path::new("data/markets.json")), PathBuf::from("data/.markets.json.tmp"));
    }

    #[test]
    fn test_validate_output_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_output_path(&dir.path().join("markets.json")).is_ok());
        assert!(matches!(validate_output_path(dir.path()), Err(ConfigError::InvalidOutputPath { .. })));
        assert!(validate_output_path(Path::new("")).is_err());
        assert!(validate_output_path(Path::new("..")).is_err());
    }

    #[test]
    fn test_validate_output_paths_rejects_shared_file() {
        let dir = tempfile::tempdir().unwrap();
        let markets = dir.path().join("markets.json");
        let names = dir.path().join("market_names.json");

        assert!(validate_output_paths(&markets, &names).is_ok());
        let err = validate_output_paths(&markets, &markets).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOutputPath { ref path, .. } if *path == markets));
        assert!(err.to_string().contains("overwrite"));
    }

    #[tokio::test]
    async fn test_names_never_overwrite_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markets.json");
        let snap = snapshot(vec![json!({"question": "Q0"}), json!({"question": "Q1"})]);

        let report = SnapshotWriter::new(2).write(&snap, &path, &path).await;

        assert!(!report.is_ok());
        assert!(report.markets.is_ok());
        assert!(matches!(report.names, Err(WriteError::PathConflict { .. })));

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["total_markets"], 2);
        assert_eq!(written["markets"][1]["question"], "Q1");
    }
}
