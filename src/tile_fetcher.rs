use tracing::{debug, info, instrument, warn};

use crate::baidu_api::StreetViewApi;
use crate::models::ZoomLevel;

fn sniff_mime_type(bytes: &[u8]) -> &'static str {
    infer::get(bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or("unknown")
}

/// Downloads every tile of a panorama in stitching order. All or nothing: if any tile fails the
/// whole panorama is abandoned and nothing is returned.
#[instrument(skip(api))]
pub async fn fetch_tiles<A: StreetViewApi + ?Sized>(
    api: &A,
    sid: &str,
    zoom: ZoomLevel,
) -> Vec<Vec<u8>> {
    let grid = zoom.grid();
    let mut tiles = Vec::with_capacity(grid.tile_count());
    for pos in grid.positions() {
        match api.tile(sid, pos, zoom).await {
            Ok(bytes) => {
                debug!(%pos, bytes = bytes.len(), mime_type = sniff_mime_type(&bytes), "downloaded tile");
                tiles.push(bytes);
            }
            Err(err) => {
                warn!(%pos, error = %err, "failed to download tile, abandoning panorama");
                return Vec::new();
            }
        }
    }
    info!(num_tiles = tiles.len(), "downloaded all tiles");
    tiles
}
