use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::models::{Coordinate, YearLabel};

pub static MANIFEST_FILE_NAME: &str = "manifest.jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Saved,
    AlreadyExists,
    NoPanorama,
    DownloadFailed,
    SaveFailed,
}

/// What happened to one output artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub point_index: usize,
    pub point: Coordinate,
    pub year: Option<YearLabel>,
    pub panorama_id: Option<String>,
    pub path: Option<PathBuf>,
    pub status: Status,
    /// seahash of the JPEG bytes written, for `Saved` entries.
    pub content_hash: Option<u64>,
    pub recorded_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(point_index: usize, point: Coordinate, status: Status) -> Self {
        Entry {
            point_index,
            point,
            year: None,
            panorama_id: None,
            path: None,
            status,
            content_hash: None,
            recorded_at: Utc::now(),
        }
    }
}

/// Append-only JSON lines log of every artifact outcome in an output folder.
pub struct Manifest {
    path: PathBuf,
    file: File,
}

impl Manifest {
    #[instrument]
    pub async fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open manifest {}", path.display()))?;
        Ok(Manifest { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn record(&mut self, entry: &Entry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .await
            .context("Failed to append to manifest")?;
        self.file.flush().await?;
        debug!(point_index = entry.point_index, status = ?entry.status, "recorded manifest entry");
        Ok(())
    }
}

/// Reads every entry back out of a manifest file.
pub async fn load(path: &Path) -> Result<Vec<Entry>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(n, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Malformed manifest entry on line {}", n + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn appends_across_reopens() {
        let dir = tempdir().unwrap();
        let mut saved = Entry::new(0, Coordinate::new(1.0, 2.0), Status::Saved);
        saved.year = Some(YearLabel::Year("2019".to_string()));
        saved.panorama_id = Some("sid".to_string());
        saved.path = Some(dir.path().join("00000_2019.jpg"));
        saved.content_hash = Some(42);

        {
            let mut manifest = Manifest::open(dir.path()).await.unwrap();
            manifest.record(&saved).await.unwrap();
        }
        let mut manifest = Manifest::open(dir.path()).await.unwrap();
        let missing = Entry::new(1, Coordinate::new(3.0, 4.0), Status::NoPanorama);
        manifest.record(&missing).await.unwrap();

        let entries = load(manifest.path()).await.unwrap();
        assert_eq!(entries, vec![saved, missing]);
    }

    #[tokio::test]
    async fn rejects_corrupt_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);
        tokio::fs::write(&path, "{not json}\n").await.unwrap();
        assert!(load(&path).await.is_err());
    }
}
