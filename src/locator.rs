use tracing::{debug, info, instrument, warn};

use crate::baidu_api::StreetViewApi;
use crate::models::{Coordinate, PanoramaRecord};

async fn current_id<A: StreetViewApi + ?Sized>(
    api: &A,
    point: Coordinate,
    udt: &str,
) -> Option<String> {
    match api.current_panorama_id(point, udt).await {
        Ok(Some(id)) => {
            info!(%id, "found current panorama");
            Some(id)
        }
        Ok(None) => {
            info!("no street view imagery at point");
            None
        }
        Err(err) => {
            warn!(error = %err, "failed to look up current panorama");
            None
        }
    }
}

async fn history<A: StreetViewApi + ?Sized>(api: &A, sid: &str) -> Vec<PanoramaRecord> {
    match api.panorama_timeline(sid).await {
        Ok(records) => {
            info!(num_records = records.len(), "found historical panoramas");
            for record in records.iter() {
                debug!(year = %record.year, id = %record.id, timeline = ?record.timeline, "historical panorama");
            }
            records
        }
        Err(err) => {
            warn!(error = %err, "failed to fetch panorama metadata, treating as no history");
            Vec::new()
        }
    }
}

/// Every capture known at a point: the current panorama first, then its historical captures.
/// Empty if the point has no imagery.
#[instrument(skip(api))]
pub async fn timeline<A: StreetViewApi + ?Sized>(
    api: &A,
    point: Coordinate,
    udt: &str,
) -> Vec<PanoramaRecord> {
    let current = match current_id(api, point, udt).await {
        Some(id) => id,
        None => return Vec::new(),
    };
    let mut records = vec![PanoramaRecord::current(&current)];
    records.extend(history(api, &current).await);
    records
}

/// The panorama captured in `year` at a point, falling back to the current one when there's no
/// capture for that year. Without a year this is just the current panorama. `None` only if the
/// point has no imagery at all.
#[instrument(skip(api))]
pub async fn panorama_for_year<A: StreetViewApi + ?Sized>(
    api: &A,
    point: Coordinate,
    year: Option<&str>,
    udt: &str,
) -> Option<String> {
    let current = current_id(api, point, udt).await?;
    let year = match year {
        Some(year) => year,
        None => return Some(current),
    };
    match history(api, &current)
        .await
        .into_iter()
        .find(|record| record.year.matches(year))
    {
        Some(record) => {
            info!(id = %record.id, "matched panorama for year");
            Some(record.id)
        }
        None => {
            info!("no panorama for year, using current panorama");
            Some(current)
        }
    }
}
