pub mod coordinate;
pub mod panorama;
pub mod tile_grid;

pub use coordinate::{Coordinate, CoordinateSystem};
pub use panorama::{PanoramaRecord, YearLabel};
pub use tile_grid::{TilePosition, ZoomLevel};

/// Maximum number of coordinates the geoconv endpoint accepts in one request.
pub const BATCH_SIZE: usize = 100;
