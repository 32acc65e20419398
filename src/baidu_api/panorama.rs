use anyhow::Result;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::models::{Coordinate, PanoramaRecord, YearLabel};

pub struct CurrentResponse {
    json: Value,
}

pub struct MetadataResponse {
    json: Value,
}

#[instrument(skip(client))]
pub async fn get_current(
    client: &Client,
    base_url: &str,
    point: Coordinate,
    udt: &str,
) -> Result<CurrentResponse> {
    let x = point.x.to_string();
    let y = point.y.to_string();
    let res = client
        .get(base_url)
        .query(&[
            ("qt", "qsdata"),
            ("x", x.as_str()),
            ("y", y.as_str()),
            ("udt", udt),
        ])
        .send()
        .await?
        .error_for_status()?;

    info!(status = %res.status(), "fetched current panorama from API");
    let json = res.json::<Value>().await?;

    Ok(CurrentResponse::from_json(json))
}

#[instrument(skip(client))]
pub async fn get_metadata(client: &Client, base_url: &str, sid: &str) -> Result<MetadataResponse> {
    let res = client
        .get(base_url)
        .query(&[("qt", "sdata"), ("sid", sid)])
        .send()
        .await?
        .error_for_status()?;

    info!(status = %res.status(), "fetched panorama metadata from API");
    let json = res.json::<Value>().await?;

    Ok(MetadataResponse::from_json(json))
}

impl CurrentResponse {
    pub fn from_json(json: Value) -> Self {
        CurrentResponse { json }
    }

    /// `content.id`, or `None` when the point has no imagery.
    pub fn panorama_id(&self) -> Option<&str> {
        self.json
            .get("content")
            .and_then(|content| content.get("id"))
            .and_then(|id| id.as_str())
            .filter(|id| !id.is_empty())
    }
}

impl MetadataResponse {
    pub fn from_json(json: Value) -> Self {
        MetadataResponse { json }
    }

    /// Historical captures listed under `content.TimeLine`. `content` is either the metadata
    /// object itself or a list whose first element is. Anything unexpected reads as no history.
    #[instrument(skip(self))]
    pub fn timeline(&self) -> Vec<PanoramaRecord> {
        let content = match self.json.get("content") {
            Some(Value::Array(items)) => items.first(),
            Some(content) => Some(content),
            None => None,
        };
        let entries = match content
            .and_then(|content| content.get("TimeLine"))
            .and_then(|timeline| timeline.as_array())
        {
            Some(entries) => entries,
            None => {
                debug!("no TimeLine in panorama metadata");
                return Vec::new();
            }
        };

        let records: Vec<PanoramaRecord> = entries
            .iter()
            .filter_map(|entry| {
                let id = entry.get("ID").and_then(|id| id.as_str())?;
                let year = match entry.get("Year") {
                    Some(Value::String(year)) => YearLabel::Year(year.clone()),
                    Some(Value::Number(year)) => YearLabel::Year(year.to_string()),
                    _ => YearLabel::Unknown,
                };
                let timeline = match entry.get("TimeLine") {
                    Some(Value::String(timeline)) => Some(timeline.clone()),
                    Some(Value::Number(timeline)) => Some(timeline.to_string()),
                    _ => None,
                };
                Some(PanoramaRecord {
                    year,
                    id: id.to_string(),
                    timeline,
                })
            })
            .collect();
        info!(num_records = records.len(), "parsed timeline out of panorama metadata");
        records
    }
}
