use anyhow::Result;
use tracing::{info, info_span, warn, Instrument};

use crate::baidu_api::StreetViewApi;
use crate::batch::{
    file_safe, prepare_folder, produce_artifact, project_points, record, DownloadOptions, RunSummary,
};
use crate::locator::panorama_for_year;
use crate::manifest::{Entry, Status};
use crate::pacing::Pacing;

/// Downloads one panorama per point, the capture from `options.year` when there is one, into
/// `<output>/street_view[_<year>]/<index>.jpg`.
pub async fn download_snapshots<A: StreetViewApi + ?Sized>(
    api: &A,
    pacing: &Pacing,
    options: &DownloadOptions,
) -> Result<RunSummary> {
    let year = options.year.as_deref().map(str::trim).filter(|year| !year.is_empty());
    let folder_name = match year {
        Some(year) => format!("street_view_{}", file_safe(year)),
        None => "street_view".to_string(),
    };
    let folder = options.output_dir.join(folder_name);
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
            let path = folder.join(format!("{:05}.jpg", indexed.index));
            if path.exists() {
                info!(path = %path.display(), "file already exists, skipping");
                let mut entry = Entry::new(indexed.index, indexed.point, Status::AlreadyExists);
                entry.path = Some(path);
                record(&mut manifest, &mut summary, &entry).await;
                return;
            }

            info!(progress = %format!("{}/{}", n + 1, points.len()), "processing point");
            let entry = Entry::new(indexed.index, indexed.point, Status::NoPanorama);
            let entry = match panorama_for_year(api, indexed.point, year, &options.udt).await {
                Some(sid) => produce_artifact(api, options.zoom, entry, &sid, &path).await,
                None => entry,
            };
            if entry.status == Status::Saved {
                info!(path = %path.display(), "saved panorama");
            }
            record(&mut manifest, &mut summary, &entry).await;
            pacing.point_done(entry.status == Status::Saved).await;
        }
        .instrument(point_span)
        .await;
    }

    info!(
        points = summary.points,
        saved = summary.saved,
        skipped = summary.skipped,
        failed = summary.failed,
        "finished downloading panoramas, {} of {} points have an image",
        summary.succeeded(),
        summary.points
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{self, MANIFEST_FILE_NAME};
    use crate::models::ZoomLevel;
    use crate::test_support::{record as timeline_record, MockApi};
    use std::io::Write;
    use std::path::Path;
    use tempfile::{tempdir, NamedTempFile};

    fn three_points() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"116.404,39.915\n116.41,39.92\n116.5,40\n").unwrap();
        file
    }

    fn options(points: &Path, output: &Path, year: Option<&str>) -> DownloadOptions {
        DownloadOptions {
            points_path: points.to_path_buf(),
            output_dir: output.to_path_buf(),
            zoom: ZoomLevel::Two,
            year: year.map(|year| year.to_string()),
            udt: "20240101".to_string(),
        }
    }

    #[tokio::test]
    async fn end_to_end_three_points_at_zoom_two() {
        let points = three_points();
        let output = tempdir().unwrap();
        let api = MockApi::new();

        let summary = download_snapshots(&api, &Pacing::disabled(), &options(points.path(), output.path(), None))
            .await
            .unwrap();

        assert_eq!(
            summary,
            RunSummary { points: 3, saved: 3, skipped: 0, failed: 0 }
        );
        assert_eq!(
            api.converted_batches(),
            vec!["116.404,39.915;116.41,39.92;116.5,40".to_string()]
        );
        assert_eq!(api.tile_requests().len(), 3 * 2);
        assert!(api.metadata_requests().is_empty());

        let folder = output.path().join("street_view");
        let (tile_width, tile_height) = MockApi::TILE_SIZE;
        for index in 0..3 {
            let path = folder.join(format!("{:05}.jpg", index));
            let image = image::open(&path).unwrap();
            assert_eq!((image.width(), image.height()), (tile_width * 2, tile_height));
        }
        assert!(!folder.join("00003.jpg").exists());

        let entries = manifest::load(&folder.join(MANIFEST_FILE_NAME)).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|entry| entry.status == Status::Saved && entry.content_hash.is_some()));
    }

    #[tokio::test]
    async fn second_run_skips_everything() {
        let points = three_points();
        let output = tempdir().unwrap();
        let options = options(points.path(), output.path(), None);

        let first = MockApi::new();
        download_snapshots(&first, &Pacing::disabled(), &options).await.unwrap();
        let folder = output.path().join("street_view");
        let before: Vec<Vec<u8>> = (0..3)
            .map(|index| std::fs::read(folder.join(format!("{:05}.jpg", index))).unwrap())
            .collect();

        let second = MockApi::new();
        let summary = download_snapshots(&second, &Pacing::disabled(), &options).await.unwrap();
        assert_eq!(
            summary,
            RunSummary { points: 3, saved: 0, skipped: 3, failed: 0 }
        );
        assert_eq!(summary.succeeded(), 3);
        assert!(second.tile_requests().is_empty());
        assert!(second.current_requests().is_empty());

        let after: Vec<Vec<u8>> = (0..3)
            .map(|index| std::fs::read(folder.join(format!("{:05}.jpg", index))).unwrap())
            .collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn year_selects_folder_and_capture() {
        let points = three_points();
        let output = tempdir().unwrap();
        let api = MockApi::new()
            .with_current_id("sid-now")
            .with_timeline(vec![timeline_record("2015", "sid-2015")]);

        let summary = download_snapshots(&api, &Pacing::disabled(), &options(points.path(), output.path(), Some("2015")))
            .await
            .unwrap();

        assert_eq!(summary.saved, 3);
        assert!(output.path().join("street_view_2015").join("00002.jpg").exists());
        assert!(api.tile_requests().iter().all(|(sid, _, _)| sid == "sid-2015"));
    }

    #[tokio::test]
    async fn year_is_sanitized_and_empty_year_means_current() {
        let points = three_points();
        let output = tempdir().unwrap();
        let api = MockApi::new().with_timeline(vec![timeline_record("2015", "sid-2015")]);
        let summary = download_snapshots(&api, &Pacing::disabled(), &options(points.path(), output.path(), Some("../x")))
            .await
            .unwrap();
        assert_eq!(summary.saved, 3);
        assert!(output.path().join("street_view____x").join("00000.jpg").exists());
        assert!(!output.path().join("x").exists());
        assert!(api.tile_requests().iter().all(|(sid, _, _)| sid == "sid-current"));

        let output = tempdir().unwrap();
        let api = MockApi::new().with_timeline(vec![timeline_record("2015", "sid-2015")]);
        let summary = download_snapshots(&api, &Pacing::disabled(), &options(points.path(), output.path(), Some("")))
            .await
            .unwrap();
        assert_eq!(summary.saved, 3);
        assert!(output.path().join("street_view").join("00002.jpg").exists());
        assert!(!output.path().join("street_view_").exists());
        assert!(api.metadata_requests().is_empty());
    }

    #[tokio::test]
    async fn points_without_imagery_or_tiles_fail_without_aborting() {
        let points = three_points();
        let output = tempdir().unwrap();
        let api = MockApi::new().without_imagery();
        let summary = download_snapshots(&api, &Pacing::disabled(), &options(points.path(), output.path(), None))
            .await
            .unwrap();
        assert_eq!(summary, RunSummary { points: 3, saved: 0, skipped: 0, failed: 3 });

        // Second tile of the first point fails; the other two points still succeed.
        let output = tempdir().unwrap();
        let api = MockApi::new().with_failing_tile(1);
        let summary = download_snapshots(&api, &Pacing::disabled(), &options(points.path(), output.path(), None))
            .await
            .unwrap();
        assert_eq!(summary, RunSummary { points: 3, saved: 2, skipped: 0, failed: 1 });
        let folder = output.path().join("street_view");
        assert!(!folder.join("00000.jpg").exists());
        assert!(folder.join("00001.jpg").exists());
    }

    #[tokio::test]
    async fn failed_conversion_produces_nothing() {
        let points = three_points();
        let output = tempdir().unwrap();
        let api = MockApi::new().with_failing_conversion();
        let summary = download_snapshots(&api, &Pacing::disabled(), &options(points.path(), output.path(), None))
            .await
            .unwrap();
        assert_eq!(summary, RunSummary::default());
        assert!(api.current_requests().is_empty());
    }
}
