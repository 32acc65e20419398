use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::models::{Coordinate, PanoramaRecord, TilePosition, ZoomLevel};

pub mod geoconv;
pub mod panorama;
pub mod tile;

pub static USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// The remote calls the scraper depends on. `BaiduClient` talks to the real endpoints; tests
/// substitute an in-memory implementation.
#[async_trait]
pub trait StreetViewApi {
    /// Reprojects a `;`-joined batch of WGS84 `x,y` pairs into BD09MC.
    async fn convert_coords(&self, coords: &str) -> Result<Vec<Coordinate>>;

    /// Looks up the id of the panorama currently shown at a BD09MC point. `Ok(None)` means the
    /// provider has no imagery there.
    async fn current_panorama_id(&self, point: Coordinate, udt: &str) -> Result<Option<String>>;

    /// Lists the historical captures linked from a panorama's metadata.
    async fn panorama_timeline(&self, sid: &str) -> Result<Vec<PanoramaRecord>>;

    /// Downloads the raw bytes of one tile. Any non-success status is an error.
    async fn tile(&self, sid: &str, pos: TilePosition, zoom: ZoomLevel) -> Result<Vec<u8>>;
}

/// Timeout and header settings shared by every request.
#[derive(Debug, Clone)]
pub struct TransportPolicy {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportPolicy {
    fn default() -> Self {
        TransportPolicy {
            timeout: REQUEST_TIMEOUT,
            connect_timeout: CONNECT_TIMEOUT,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl TransportPolicy {
    pub fn build_client(&self) -> Result<Client> {
        Ok(Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.as_str())
            .build()?)
    }
}

/// Base URLs of the endpoints, overridable so the client can be pointed at a local stand-in.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub panorama_data: String,
    pub panorama_tiles: String,
    pub geoconv: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            panorama_data: "https://mapsv0.bdimg.com/".to_string(),
            panorama_tiles: "https://mapsv1.bdimg.com/".to_string(),
            geoconv: "http://api.map.baidu.com/geoconv/v1/".to_string(),
        }
    }
}

pub struct BaiduClient {
    client: Client,
    endpoints: Endpoints,
    ak: String,
}

impl BaiduClient {
    pub fn new(ak: &str, policy: &TransportPolicy, endpoints: Endpoints) -> Result<Self> {
        Ok(BaiduClient {
            client: policy.build_client()?,
            endpoints,
            ak: ak.to_string(),
        })
    }
}

#[async_trait]
impl StreetViewApi for BaiduClient {
    async fn convert_coords(&self, coords: &str) -> Result<Vec<Coordinate>> {
        let res = geoconv::get(&self.client, &self.endpoints.geoconv, coords, &self.ak).await?;
        res.points()
    }

    async fn current_panorama_id(&self, point: Coordinate, udt: &str) -> Result<Option<String>> {
        let res =
            panorama::get_current(&self.client, &self.endpoints.panorama_data, point, udt).await?;
        Ok(res.panorama_id().map(|id| id.to_string()))
    }

    async fn panorama_timeline(&self, sid: &str) -> Result<Vec<PanoramaRecord>> {
        let res = panorama::get_metadata(&self.client, &self.endpoints.panorama_data, sid).await?;
        Ok(res.timeline())
    }

    async fn tile(&self, sid: &str, pos: TilePosition, zoom: ZoomLevel) -> Result<Vec<u8>> {
        tile::get(&self.client, &self.endpoints.panorama_tiles, sid, pos, zoom).await
    }
}
