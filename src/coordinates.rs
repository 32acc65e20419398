use anyhow::{anyhow, bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::baidu_api::StreetViewApi;
use crate::models::{Coordinate, BATCH_SIZE};

fn parse_record(record: &StringRecord) -> Result<Coordinate> {
    if record.len() != 2 {
        bail!("expected 2 columns, found {}", record.len());
    }
    let x = record[0]
        .parse::<f64>()
        .with_context(|| format!("x value {:?} is not a number", &record[0]))?;
    let y = record[1]
        .parse::<f64>()
        .with_context(|| format!("y value {:?} is not a number", &record[1]))?;
    Ok(Coordinate::new(x, y))
}

/// Reads every coordinate pair in the file. A first row that doesn't parse is taken to be a header.
pub fn read_points(path: &Path) -> Result<Vec<Coordinate>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open points file {}", path.display()))?;
    let mut points = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read row {}", row + 1))?;
        match parse_record(&record) {
            Ok(point) => points.push(point),
            Err(_) if row == 0 => info!(header = ?record, "skipping header row"),
            Err(err) => return Err(err.context(format!("Malformed row {}", row + 1))),
        }
    }
    Ok(points)
}

/// Joins points into `x,y;x,y;...` strings of at most `BATCH_SIZE` points each.
pub fn batch_points(points: &[Coordinate]) -> Vec<String> {
    points
        .chunks(BATCH_SIZE)
        .map(|chunk| {
            chunk
                .iter()
                .map(|point| point.to_string())
                .collect::<Vec<String>>()
                .join(";")
        })
        .collect()
}

/// Loads the points file as conversion batches. Returns nothing if any part of the file is
/// unreadable.
#[instrument]
pub fn load_batches(path: &Path) -> Vec<String> {
    match read_points(path) {
        Ok(points) => {
            let batches = batch_points(&points);
            info!(
                num_points = points.len(),
                num_batches = batches.len(),
                "loaded points file"
            );
            batches
        }
        Err(err) => {
            warn!(error = ?err, "failed to read points file");
            Vec::new()
        }
    }
}

/// Converts one batch of WGS84 points to BD09MC. An empty result means the batch should be
/// skipped.
#[instrument(skip(api, batch), fields(batch_len = batch.split(';').count()))]
pub async fn convert_batch<A: StreetViewApi + ?Sized>(api: &A, batch: &str) -> Vec<Coordinate> {
    let coords: String = batch.chars().filter(|c| !c.is_whitespace()).collect();
    let converted = api
        .convert_coords(&coords)
        .await
        .and_then(|points| {
            if points.is_empty() {
                Err(anyhow!("geoconv API returned no points"))
            } else {
                Ok(points)
            }
        });
    match converted {
        Ok(points) => {
            info!(num_points = points.len(), "converted batch to BD09MC");
            points
        }
        Err(err) => {
            warn!(error = %err, "failed to convert coordinate batch");
            Vec::new()
        }
    }
}
