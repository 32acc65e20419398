use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

use crate::assembler::assemble;
use crate::baidu_api::StreetViewApi;
use crate::models::ZoomLevel;
use crate::tile_fetcher::fetch_tiles;

pub const JPEG_QUALITY: u8 = 90;

/// Downloads and stitches one panorama. `None` if any tile failed to download or none decoded.
#[instrument(skip(api))]
pub async fn download_panorama<A: StreetViewApi + ?Sized>(
    api: &A,
    sid: &str,
    zoom: ZoomLevel,
) -> Option<RgbImage> {
    let tiles = fetch_tiles(api, sid, zoom).await;
    if tiles.is_empty() {
        return None;
    }
    assemble(&tiles, zoom.grid().tiles_per_row)
}

pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
        .encode_image(image)
        .context("Failed to encode panorama as JPEG")?;
    Ok(buf)
}

/// Writes the panorama to `path` as a JPEG and returns the seahash of the written bytes. The file
/// only appears under its final name once it is complete.
#[instrument(skip(image))]
pub async fn save_jpeg(path: &Path, image: &RgbImage) -> Result<u64> {
    let buf = encode_jpeg(image)?;
    let hash = seahash::hash(&buf);
    let partial_path = path.with_extension("jpg.part");
    fs::write(&partial_path, &buf)
        .await
        .with_context(|| format!("Failed to write {}", partial_path.display()))?;
    fs::rename(&partial_path, path)
        .await
        .with_context(|| format!("Failed to move panorama into place at {}", path.display()))?;
    info!(bytes = buf.len(), hash, "saved panorama to disk");
    Ok(hash)
}

/// Downloads a panorama and writes it to `path`. `Ok(None)` if the panorama couldn't be
/// downloaded; errors are reserved for failures to write it.
pub async fn download_and_save<A: StreetViewApi + ?Sized>(
    api: &A,
    sid: &str,
    zoom: ZoomLevel,
    path: &Path,
) -> Result<Option<u64>> {
    match download_panorama(api, sid, zoom).await {
        Some(image) => Ok(Some(save_jpeg(path, &image).await?)),
        None => Ok(None),
    }
}
