use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Coordinate reference systems understood by the Baidu geoconv endpoint. The discriminant is the
/// code the endpoint expects in its `from` and `to` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSystem {
    Wgs84 = 1,
    Bd09mc = 6,
}

impl CoordinateSystem {
    pub fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Coordinate { x, y }
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}
