use anyhow::Result;
use tracing::{info, info_span, warn, Instrument};

use crate::baidu_api::StreetViewApi;
use crate::batch::{
    file_safe, prepare_folder, produce_artifact, project_points, record, DownloadOptions, RunSummary,
};
use crate::locator::timeline;
use crate::manifest::{Entry, Status};
use crate::pacing::Pacing;

pub static HISTORY_FOLDER_NAME: &str = "all_historical_views";

/// Downloads every historical capture of every point into
/// `<output>/all_historical_views/<index>_<year>.jpg`. The current capture is not downloaded.
pub async fn download_history<A: StreetViewApi + ?Sized>(
    api: &A,
    pacing: &Pacing,
    options: &DownloadOptions,
) -> Result<RunSummary> {
    let folder = options.output_dir.join(HISTORY_FOLDER_NAME);
    let mut manifest = prepare_folder(&folder).await?;

    let points = project_points(api, pacing, &options.points_path).await;
    let mut summary = RunSummary {
        points: points.len(),
        ..RunSummary::default()
    };
    if points.is_empty() {
        warn!("no points to download, check the points file and access token");
        return Ok(summary);
    }

    for (n, indexed) in points.iter().enumerate() {
        let point_span = info_span!(
            "point",
            index = indexed.index,
            x = indexed.point.x,
            y = indexed.point.y
        );
        async {
            info!(progress = %format!("{}/{}", n + 1, points.len()), "processing point");
            let records = timeline(api, indexed.point, &options.udt).await;
            if records.is_empty() {
                let entry = Entry::new(indexed.index, indexed.point, Status::NoPanorama);
                record(&mut manifest, &mut summary, &entry).await;
                pacing.point_done(false).await;
                return;
            }
            info!(num_records = records.len(), "found panoramas for point");

            let mut point_ok = true;
            for panorama in records.iter().filter(|panorama| !panorama.year.is_current()) {
                let year_span = info_span!("year", year = %panorama.year, id = %panorama.id);
                async {
                    let year = file_safe(&panorama.year.to_string());
                    let path = folder.join(format!("{:05}_{}.jpg", indexed.index, year));
                    let mut entry = Entry::new(indexed.index, indexed.point, Status::NoPanorama);
                    entry.year = Some(panorama.year.clone());
                    let entry = produce_artifact(api, options.zoom, entry, &panorama.id, &path).await;
                    record(&mut manifest, &mut summary, &entry).await;
                    match entry.status {
                        Status::AlreadyExists => {}
                        Status::Saved => {
                            info!(path = %path.display(), "saved historical panorama");
                            pacing.panorama_done(true).await;
                        }
                        _ => {
                            point_ok = false;
                            pacing.panorama_done(false).await;
                        }
                    }
                }
                .instrument(year_span)
                .await;
            }
            pacing.point_done(point_ok).await;
        }
        .instrument(point_span)
        .await;
    }

    info!(
        points = summary.points,
        saved = summary.saved,
        skipped = summary.skipped,
        failed = summary.failed,
        "finished downloading historical panoramas, {} images present",
        summary.succeeded()
    );
    Ok(summary)
}
