use anyhow::Result;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::models::{TilePosition, ZoomLevel};

/// Client tag the tile endpoint expects in its `from` parameter.
pub static CLIENT_TAG: &str = "PC";

#[instrument(skip(client))]
pub async fn get(
    client: &Client,
    base_url: &str,
    sid: &str,
    pos: TilePosition,
    zoom: ZoomLevel,
) -> Result<Vec<u8>> {
    let pos = pos.to_string();
    let zoom = zoom.to_string();
    let res = client
        .get(base_url)
        .query(&[
            ("qt", "pdata"),
            ("sid", sid),
            ("pos", pos.as_str()),
            ("z", zoom.as_str()),
            ("from", CLIENT_TAG),
        ])
        .send()
        .await?
        .error_for_status()?;

    debug!(status = %res.status(), "fetched panorama tile");
    let bytes = res.bytes().await?;
    Ok(bytes.to_vec())
}
