use anyhow::{anyhow, Error, Result};
use std::convert::TryFrom;
use std::fmt::{self, Display};
use std::str::FromStr;

/// Zoom levels served by the panorama tile endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomLevel {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
}

/// Fixed partition of a panorama into tiles at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub columns: u32,
    pub rows: u32,
    /// How many tiles sit side by side when the panorama is stitched back together.
    pub tiles_per_row: u32,
}

/// A cell in the tile grid, as the endpoint names it in its `pos` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilePosition {
    pub x: u32,
    pub y: u32,
}

impl ZoomLevel {
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn grid(self) -> TileGrid {
        match self {
            ZoomLevel::One => TileGrid {
                columns: 1,
                rows: 1,
                tiles_per_row: 1,
            },
            ZoomLevel::Two => TileGrid {
                columns: 1,
                rows: 2,
                tiles_per_row: 2,
            },
            ZoomLevel::Three => TileGrid {
                columns: 2,
                rows: 4,
                tiles_per_row: 4,
            },
            ZoomLevel::Four => TileGrid {
                columns: 4,
                rows: 8,
                tiles_per_row: 8,
            },
        }
    }
}

impl TryFrom<u8> for ZoomLevel {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(ZoomLevel::One),
            2 => Ok(ZoomLevel::Two),
            3 => Ok(ZoomLevel::Three),
            4 => Ok(ZoomLevel::Four),
            other => Err(anyhow!("zoom level must be between 1 and 4, got {}", other)),
        }
    }
}

impl FromStr for ZoomLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| anyhow!("zoom level must be a number between 1 and 4, got {:?}", s))?;
        ZoomLevel::try_from(value)
    }
}

impl Display for ZoomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl TileGrid {
    pub fn tile_count(&self) -> usize {
        (self.columns * self.rows) as usize
    }

    /// Every cell of the grid, x outer and y inner. This is also the order tiles are stitched in.
    pub fn positions(&self) -> Vec<TilePosition> {
        let mut positions = Vec::with_capacity(self.tile_count());
        for x in 0..self.columns {
            for y in 0..self.rows {
                positions.push(TilePosition { x, y });
            }
        }
        positions
    }
}

impl Display for TilePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.x, self.y)
    }
}
