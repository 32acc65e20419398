use anyhow::{anyhow, bail, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::{info, instrument};

use crate::models::{Coordinate, CoordinateSystem};

pub struct GeoconvResponse {
    json: Value,
}

#[instrument(skip(client, ak))]
pub async fn get(client: &Client, base_url: &str, coords: &str, ak: &str) -> Result<GeoconvResponse> {
    let from = CoordinateSystem::Wgs84.code().to_string();
    let to = CoordinateSystem::Bd09mc.code().to_string();
    let res = client
        .get(base_url)
        .query(&[
            ("coords", coords),
            ("from", from.as_str()),
            ("to", to.as_str()),
            ("ak", ak),
        ])
        .send()
        .await?
        .error_for_status()?;

    info!(status = %res.status(), "fetched coordinate conversion from API");
    let json = res.json::<Value>().await?;

    Ok(GeoconvResponse::from_json(json))
}

impl GeoconvResponse {
    pub fn from_json(json: Value) -> Self {
        GeoconvResponse { json }
    }

    /// The converted points, in the order they were sent. Fails if the API reported a non-zero
    /// status.
    #[instrument(skip(self))]
    pub fn points(&self) -> Result<Vec<Coordinate>> {
        let status = self
            .json
            .get("status")
            .ok_or_else(|| anyhow!("Missing status key in geoconv API response"))?
            .as_i64()
            .ok_or_else(|| anyhow!("status value in geoconv API response is not a number"))?;
        if status != 0 {
            bail!("geoconv API returned status {}: {}", status, self.json);
        }
        let result = self
            .json
            .get("result")
            .ok_or_else(|| anyhow!("Missing result key in geoconv API response"))?
            .as_array()
            .ok_or_else(|| anyhow!("result value in geoconv API response is not an array"))?;
        let points = result
            .iter()
            .map(|point| {
                let x = point
                    .get("x")
                    .ok_or_else(|| anyhow!("Missing x key in point in geoconv API response"))?
                    .as_f64()
                    .ok_or_else(|| anyhow!("x value in geoconv API response is not a number"))?;
                let y = point
                    .get("y")
                    .ok_or_else(|| anyhow!("Missing y key in point in geoconv API response"))?
                    .as_f64()
                    .ok_or_else(|| anyhow!("y value in geoconv API response is not a number"))?;
                Ok(Coordinate::new(x, y))
            })
            .collect::<Result<Vec<Coordinate>>>()?;
        info!(num_points = points.len(), "parsed points out of geoconv API response");
        Ok(points)
    }
}
