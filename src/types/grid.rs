//! Grid geometry types

use serde::{Deserialize, Serialize};

/// Geographic point in decimal degrees.
///
/// Serialized as `{ "lat": .., "lng": .. }` to match the request body shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a coordinate from untrusted input, rejecting non-finite or
    /// out-of-range values.
    pub fn validated(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self::new(latitude, longitude))
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

/// Compass position of a tile within the 3x3 grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridLabel {
    #[serde(rename = "NW")]
    NorthWest,
    #[serde(rename = "N")]
    North,
    #[serde(rename = "NE")]
    NorthEast,
    #[serde(rename = "W")]
    West,
    #[serde(rename = "CENTER")]
    Center,
    #[serde(rename = "E")]
    East,
    #[serde(rename = "SW")]
    SouthWest,
    #[serde(rename = "S")]
    South,
    #[serde(rename = "SE")]
    SouthEast,
}

impl GridLabel {
    /// All labels in row-major order, north-west to south-east.
    pub const ROW_MAJOR: [GridLabel; 9] = [
        GridLabel::NorthWest,
        GridLabel::North,
        GridLabel::NorthEast,
        GridLabel::West,
        GridLabel::Center,
        GridLabel::East,
        GridLabel::SouthWest,
        GridLabel::South,
        GridLabel::SouthEast,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            GridLabel::NorthWest => "NW",
            GridLabel::North => "N",
            GridLabel::NorthEast => "NE",
            GridLabel::West => "W",
            GridLabel::Center => "CENTER",
            GridLabel::East => "E",
            GridLabel::SouthWest => "SW",
            GridLabel::South => "S",
            GridLabel::SouthEast => "SE",
        }
    }
}

impl std::fmt::Display for GridLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cell of the sample grid, consumed once by a grid worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridTask {
    pub coordinate: Coordinate,
    pub weight: f64,
    pub label: GridLabel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_serializes_as_lat_lng() {
        let json = serde_json::to_value(Coordinate::new(34.05, -118.25)).unwrap();
        assert_eq!(json, serde_json::json!({"lat": 34.05, "lng": -118.25}));
    }

    #[test]
    fn test_validated_rejects_out_of_range() {
        assert!(Coordinate::validated(34.05, -118.25).is_ok());
        assert_eq!(
            Coordinate::validated(91.0, 0.0),
            Err(CoordinateError::Latitude(91.0))
        );
        assert!(matches!(
            Coordinate::validated(0.0, f64::NAN),
            Err(CoordinateError::Longitude(_))
        ));
    }

    #[test]
    fn test_label_wire_names() {
        let names: Vec<String> = GridLabel::ROW_MAJOR
            .iter()
            .map(|l| serde_json::to_value(l).unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["NW", "N", "NE", "W", "CENTER", "E", "SW", "S", "SE"]);
        assert_eq!(GridLabel::Center.to_string(), "CENTER");
    }
}
