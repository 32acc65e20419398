//! In-memory stand-in for the Baidu endpoints, recording every call it receives.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Mutex;

use crate::baidu_api::StreetViewApi;
use crate::models::{Coordinate, PanoramaRecord, TilePosition, YearLabel, ZoomLevel};

pub fn png_tile(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let tile = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(tile)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

pub fn record(year: &str, id: &str) -> PanoramaRecord {
    PanoramaRecord {
        year: YearLabel::Year(year.to_string()),
        id: id.to_string(),
        timeline: None,
    }
}

#[derive(Default)]
struct Calls {
    converted: Vec<String>,
    current: Vec<(Coordinate, String)>,
    metadata: Vec<String>,
    tiles: Vec<(String, TilePosition, ZoomLevel)>,
}

pub struct MockApi {
    current_id: Option<String>,
    fail_current: bool,
    timeline: Vec<PanoramaRecord>,
    fail_metadata: bool,
    fail_conversion: bool,
    failing_batch: Option<usize>,
    short_batch: Option<usize>,
    failing_tile: Option<usize>,
    calls: Mutex<Calls>,
}

impl MockApi {
    pub const TILE_SIZE: (u32, u32) = (8, 6);

    pub fn new() -> Self {
        MockApi {
            current_id: Some("sid-current".to_string()),
            fail_current: false,
            timeline: Vec::new(),
            fail_metadata: false,
            fail_conversion: false,
            failing_batch: None,
            short_batch: None,
            failing_tile: None,
            calls: Mutex::new(Calls::default()),
        }
    }

    pub fn with_current_id(mut self, id: &str) -> Self {
        self.current_id = Some(id.to_string());
        self
    }

    pub fn without_imagery(mut self) -> Self {
        self.current_id = None;
        self
    }

    pub fn with_failing_current(mut self) -> Self {
        self.fail_current = true;
        self
    }

    pub fn with_timeline(mut self, timeline: Vec<PanoramaRecord>) -> Self {
        self.timeline = timeline;
        self
    }

    pub fn with_failing_metadata(mut self) -> Self {
        self.fail_metadata = true;
        self
    }

    pub fn with_failing_conversion(mut self) -> Self {
        self.fail_conversion = true;
        self
    }

    /// Fails only the `n`th conversion request (zero-based).
    pub fn with_failing_batch(mut self, n: usize) -> Self {
        self.failing_batch = Some(n);
        self
    }

    /// Answers the `n`th conversion request (zero-based) with its last point missing.
    pub fn with_short_batch(mut self, n: usize) -> Self {
        self.short_batch = Some(n);
        self
    }

    /// Fails the `n`th tile request (zero-based, counted across the mock's lifetime).
    pub fn with_failing_tile(mut self, n: usize) -> Self {
        self.failing_tile = Some(n);
        self
    }

    pub fn converted_batches(&self) -> Vec<String> {
        self.calls.lock().unwrap().converted.clone()
    }

    pub fn current_requests(&self) -> Vec<(Coordinate, String)> {
        self.calls.lock().unwrap().current.clone()
    }

    pub fn metadata_requests(&self) -> Vec<String> {
        self.calls.lock().unwrap().metadata.clone()
    }

    pub fn tile_requests(&self) -> Vec<(String, TilePosition, ZoomLevel)> {
        self.calls.lock().unwrap().tiles.clone()
    }
}

#[async_trait]
impl StreetViewApi for MockApi {
    /// Shifts every point by 1000 in both axes.
    async fn convert_coords(&self, coords: &str) -> Result<Vec<Coordinate>> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.converted.push(coords.to_string());
            calls.converted.len() - 1
        };
        if self.fail_conversion || self.failing_batch == Some(n) {
            return Err(anyhow!("geoconv API returned status 24"));
        }
        let mut points = coords
            .split(';')
            .map(|pair| {
                let (x, y) = pair
                    .split_once(',')
                    .ok_or_else(|| anyhow!("bad pair {:?}", pair))?;
                Ok(Coordinate::new(x.parse::<f64>()? + 1000.0, y.parse::<f64>()? + 1000.0))
            })
            .collect::<Result<Vec<Coordinate>>>()?;
        if self.short_batch == Some(n) {
            points.pop();
        }
        Ok(points)
    }

    async fn current_panorama_id(&self, point: Coordinate, udt: &str) -> Result<Option<String>> {
        self.calls
            .lock()
            .unwrap()
            .current
            .push((point, udt.to_string()));
        if self.fail_current {
            return Err(anyhow!("connection reset"));
        }
        Ok(self.current_id.clone())
    }

    async fn panorama_timeline(&self, sid: &str) -> Result<Vec<PanoramaRecord>> {
        self.calls.lock().unwrap().metadata.push(sid.to_string());
        if self.fail_metadata {
            return Err(anyhow!("expected value at line 1 column 1"));
        }
        Ok(self.timeline.clone())
    }

    async fn tile(&self, sid: &str, pos: TilePosition, zoom: ZoomLevel) -> Result<Vec<u8>> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.tiles.push((sid.to_string(), pos, zoom));
            calls.tiles.len() - 1
        };
        if self.failing_tile == Some(n) {
            return Err(anyhow!("HTTP status server error (503 Service Unavailable)"));
        }
        let (width, height) = Self::TILE_SIZE;
        Ok(png_tile(width, height, [(pos.x * 40) as u8, (pos.y * 30) as u8, 0]))
    }
}
