use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::baidu_api::StreetViewApi;
use crate::coordinates::{convert_batch, load_batches};
use crate::manifest::{self, Entry, Manifest, Status};
use crate::models::{Coordinate, ZoomLevel, BATCH_SIZE};
use crate::pacing::Pacing;
use crate::pano_processor::download_and_save;

/// Everything a batch run needs besides the API client and pacing.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// CSV of WGS84 `x,y` points.
    pub points_path: PathBuf,
    pub output_dir: PathBuf,
    pub zoom: ZoomLevel,
    /// Only used by snapshot runs.
    pub year: Option<String>,
    /// `YYYYMMDD` date stamp sent with current-panorama lookups.
    pub udt: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub points: usize,
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Saved => self.saved += 1,
            Status::AlreadyExists => self.skipped += 1,
            Status::NoPanorama | Status::DownloadFailed | Status::SaveFailed => self.failed += 1,
        }
    }

    /// Artifacts that exist on disk after the run, whether written now or by an earlier run.
    pub fn succeeded(&self) -> usize {
        self.saved + self.skipped
    }
}

/// Years come from the command line or the API, so keep anything odd in them out of paths.
pub fn file_safe(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// A BD09MC point paired with its zero-based row in the input file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedPoint {
    pub index: usize,
    pub point: Coordinate,
}

/// Loads the points file and converts it to BD09MC batch by batch. Points of a batch that fails to
/// convert, or converts to the wrong number of points, are dropped without renumbering the points
/// after them.
pub async fn project_points<A: StreetViewApi + ?Sized>(
    api: &A,
    pacing: &Pacing,
    points_path: &Path,
) -> Vec<IndexedPoint> {
    let mut points = Vec::new();
    for (batch_index, batch) in load_batches(points_path).iter().enumerate() {
        let mut converted = convert_batch(api, batch).await;
        let sent = batch.split(';').count();
        if !converted.is_empty() && converted.len() != sent {
            warn!(
                batch_index,
                sent,
                received = converted.len(),
                "geoconv API returned a different number of points than sent, dropping batch"
            );
            converted.clear();
        }
        let ok = !converted.is_empty();
        points.extend(
            converted
                .into_iter()
                .enumerate()
                .map(|(offset, point)| IndexedPoint {
                    index: batch_index * BATCH_SIZE + offset,
                    point,
                }),
        );
        pacing.conversion_done(ok).await;
    }
    info!(num_points = points.len(), "projected points to BD09MC");
    points
}

/// Creates the output folder and opens its manifest, reporting what earlier runs recorded there.
pub async fn prepare_folder(dir: &Path) -> Result<Manifest> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output folder {}", dir.display()))?;
    let opened = Manifest::open(dir).await?;
    match manifest::load(opened.path()).await {
        Ok(entries) if !entries.is_empty() => {
            let mut previous = RunSummary::default();
            for entry in entries.iter() {
                previous.record(entry.status);
            }
            info!(
                saved = previous.saved,
                skipped = previous.skipped,
                failed = previous.failed,
                manifest = %opened.path().display(),
                "resuming in folder with earlier runs"
            );
        }
        Ok(_) => {}
        Err(err) => warn!(error = ?err, "could not read earlier manifest entries"),
    }
    Ok(opened)
}

/// Produces one artifact at `path` unless it already exists. The returned entry describes what
/// happened.
pub async fn produce_artifact<A: StreetViewApi + ?Sized>(
    api: &A,
    zoom: ZoomLevel,
    mut entry: Entry,
    sid: &str,
    path: &Path,
) -> Entry {
    entry.panorama_id = Some(sid.to_string());
    entry.path = Some(path.to_path_buf());
    if path.exists() {
        info!(path = %path.display(), "file already exists, skipping");
        entry.status = Status::AlreadyExists;
        return entry;
    }
    entry.status = match download_and_save(api, sid, zoom, path).await {
        Ok(Some(hash)) => {
            entry.content_hash = Some(hash);
            Status::Saved
        }
        Ok(None) => Status::DownloadFailed,
        Err(err) => {
            warn!(error = ?err, "failed to save panorama");
            Status::SaveFailed
        }
    };
    entry
}

pub async fn record(manifest: &mut Manifest, summary: &mut RunSummary, entry: &Entry) {
    summary.record(entry.status);
    if let Err(err) = manifest.record(entry).await {
        warn!(error = %err, "failed to record manifest entry");
    }
}
