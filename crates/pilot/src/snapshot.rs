//! Topology snapshot files
//!
//! Loads and saves desired or observed topologies as YAML or JSON, chosen by
//! file extension.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use topology::Topology;

/// Snapshot error
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("Unsupported snapshot format: {0}")]
    UnsupportedFormat(PathBuf),
}

/// Document format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Yaml,
    Json,
}

impl SnapshotFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, SnapshotError> {
        match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
            Some("yaml") | Some("yml") => Ok(SnapshotFormat::Yaml),
            Some("json") => Ok(SnapshotFormat::Json),
            _ => Err(SnapshotError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn parse(self, content: &str) -> Result<Topology, SnapshotError> {
        match self {
            SnapshotFormat::Yaml => serde_yaml::from_str(content).map_err(serialization),
            SnapshotFormat::Json => serde_json::from_str(content).map_err(serialization),
        }
    }

    pub fn render(self, topology: &Topology) -> Result<String, SnapshotError> {
        match self {
            SnapshotFormat::Yaml => serde_yaml::to_string(topology).map_err(serialization),
            SnapshotFormat::Json => serde_json::to_string_pretty(topology).map_err(serialization),
        }
    }
}

fn serialization(e: impl std::fmt::Display) -> SnapshotError {
    SnapshotError::Serialization(e.to_string())
}

/// Load a topology snapshot
pub async fn load(path: impl AsRef<Path>) -> Result<Topology, SnapshotError> {
    let path = path.as_ref();
    let format = SnapshotFormat::from_path(path)?;
    if !path.exists() {
        return Err(SnapshotError::NotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).await?;
    let topology = format.parse(&content)?;

    info!(
        "Loaded topology {:?}: {} node groups, {} shards, {} entities total",
        path,
        topology.node_groups.len(),
        topology.shards.len(),
        topology.len()
    );
    Ok(topology)
}

/// Save a topology snapshot
pub async fn save(path: impl AsRef<Path>, topology: &Topology) -> Result<(), SnapshotError> {
    let path = path.as_ref();
    let format = SnapshotFormat::from_path(path)?;
    let content = format.render(topology)?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).await?;
    }

    // Write to temp file first, then atomically rename
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, &content).await?;
    fs::rename(&temp_path, path).await?;

    info!("Saved topology {:?}: {} entities", path, topology.len());
    Ok(())
}
