//! Module with GPS specific structures and great-circle math
use crate::Error;
use std::char;
use std::fmt;
use std::str::FromStr;

/// Mean radius of the earth used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Stores a single geospatial point
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    /// latitude coordinate in degrees
    latitude: f64,
    /// longitude coordinate in degrees
    longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, returns None when either value is not finite or out of range
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let loc = Coordinate {
            latitude,
            longitude,
        };
        if loc.is_valid() {
            Some(loc)
        } else {
            None
        }
    }

    /// Create a coordinate from values known to be in range
    pub(crate) const fn new_unchecked(latitude: f64, longitude: f64) -> Self {
        Coordinate {
            latitude,
            longitude,
        }
    }

    /// Return latitude in degrees
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Return longitude in degrees
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Rectangular extent in degrees, antimeridian crossing boxes are not supported
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    south: f64,
    west: f64,
    north: f64,
    east: f64,
}

impl BoundingBox {
    /// Create a bounding box, south must not exceed north and west must not exceed east
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Result<Self, Error> {
        for (name, value, limit) in &[
            ("south", south, 90.0),
            ("north", north, 90.0),
            ("west", west, 180.0),
            ("east", east, 180.0),
        ] {
            if !value.is_finite() || value.abs() > *limit {
                return Err(Error::InvalidInput(format!(
                    "{} edge of bounding box out of range: {}",
                    name, value
                )));
            }
        }
        if south > north {
            return Err(Error::UnsupportedBoundingBox(format!(
                "south ({}) is above north ({})",
                south, north
            )));
        }
        if west > east {
            return Err(Error::UnsupportedBoundingBox(format!(
                "west ({}) is east of east ({}), boxes crossing the antimeridian are unsupported",
                west, east
            )));
        }
        Ok(BoundingBox {
            south,
            west,
            north,
            east,
        })
    }

    /// Smallest box containing every point of the path, None for an empty path
    pub fn from_path(path: &[Coordinate]) -> Option<Self> {
        let first = path.first()?;
        let mut bbox = BoundingBox {
            south: first.latitude(),
            west: first.longitude(),
            north: first.latitude(),
            east: first.longitude(),
        };
        for loc in &path[1..] {
            bbox.south = bbox.south.min(loc.latitude());
            bbox.north = bbox.north.max(loc.latitude());
            bbox.west = bbox.west.min(loc.longitude());
            bbox.east = bbox.east.max(loc.longitude());
        }
        Some(bbox)
    }

    pub fn south(&self) -> f64 {
        self.south
    }

    pub fn west(&self) -> f64 {
        self.west
    }

    pub fn north(&self) -> f64 {
        self.north
    }

    pub fn east(&self) -> f64 {
        self.east
    }

    pub fn contains(&self, loc: &Coordinate) -> bool {
        (self.south..=self.north).contains(&loc.latitude())
            && (self.west..=self.east).contains(&loc.longitude())
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.south, self.west, self.north, self.east)
    }
}

impl FromStr for BoundingBox {
    type Err = Error;

    /// Parse "south,west,north,east" in degrees
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|_| {
                Error::InvalidInput(format!("expected south,west,north,east got: {}", s))
            })?;
        match values[..] {
            [south, west, north, east] => BoundingBox::new(south, west, north, east),
            _ => Err(Error::InvalidInput(format!(
                "expected south,west,north,east got: {}",
                s
            ))),
        }
    }
}

/// Great-circle distance between two points in kilometers using the haversine formula
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let dlat = (b.latitude() - a.latitude()).to_radians();
    let dlng = (b.longitude() - a.longitude()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Total haversine length of a path in kilometers
pub fn path_length(path: &[Coordinate]) -> f64 {
    path.windows(2)
        .map(|pair| haversine_distance(&pair[0], &pair[1]))
        .sum()
}

/// Encodes a slice of coordinates into Google Encoded Polyline format.
///
/// This code was extracted and simplified for our use case from:
/// https://github.com/georust/polyline
/// https://developers.google.com/maps/documentation/utilities/polylinealgorithm
pub fn encode_coordinates(coordinates: &[Coordinate]) -> Result<String, Error> {
    let mut output = String::new();
    let mut b = (0, 0);

    for a in coordinates {
        let a = (scale(a.latitude), scale(a.longitude));
        encode(a.0, b.0, &mut output)?;
        encode(a.1, b.1, &mut output)?;
        b = a;
    }

    Ok(output)
}

/// Scale a floating point value into an integer at the given precision
#[inline]
fn scale(n: f64) -> i64 {
    static FACTOR: f64 = 100_000.0; // use 5 digits of precision
    (FACTOR * n).round() as i64
}

/// Encode a single latitude or longitude delta into the polyline format
fn encode(current: i64, previous: i64, output: &mut String) -> Result<(), Error> {
    let mut value = (current - previous) << 1;
    if (current - previous) < 0 {
        value = !value;
    }
    while value >= 0x20 {
        let from_char = char::from_u32(((0x20 | (value & 0x1f)) + 63) as u32)
            .ok_or_else(|| Error::Other("Couldn't convert character".to_string()))?;
        output.push(from_char);
        value >>= 5;
    }
    let from_char = char::from_u32((value + 63) as u32)
        .ok_or_else(|| Error::Other("Couldn't convert character".to_string()))?;
    output.push(from_char);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    #[test]
    fn coordinate_range_is_enforced() {
        assert!(Coordinate::new(90.0, 180.0).is_some());
        assert!(Coordinate::new(-90.0, -180.0).is_some());
        assert!(Coordinate::new(90.5, 0.0).is_none());
        assert!(Coordinate::new(0.0, -181.0).is_none());
        assert!(Coordinate::new(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn distance_to_self_is_zero() {
        let a = loc(37.78, -122.43);
        assert_eq!(haversine_distance(&a, &a), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = loc(37.78, -122.43);
        let b = loc(34.05, -118.24);
        let ab = haversine_distance(&a, &b);
        let ba = haversine_distance(&b, &a);
        assert!((ab - ba).abs() < 1e-9);
        // San Francisco to Los Angeles is roughly 560 km
        assert!(ab > 540.0 && ab < 580.0, "{}", ab);
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_distance(&loc(0.0, 0.0), &loc(1.0, 0.0));
        let expected = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;
        assert!((d - expected).abs() < 1e-9);
    }

    #[test]
    fn path_length_sums_segments() {
        let path = [loc(0.0, 0.0), loc(1.0, 0.0), loc(2.0, 0.0)];
        let single = haversine_distance(&path[0], &path[1]);
        assert!((path_length(&path) - 2.0 * single).abs() < 1e-9);
        assert_eq!(path_length(&path[..1]), 0.0);
    }

    #[test]
    fn bounding_box_rejects_antimeridian_and_inverted() {
        assert!(matches!(
            BoundingBox::new(10.0, 170.0, 20.0, -170.0),
            Err(Error::UnsupportedBoundingBox(_))
        ));
        assert!(matches!(
            BoundingBox::new(20.0, 0.0, 10.0, 1.0),
            Err(Error::UnsupportedBoundingBox(_))
        ));
        assert!(matches!(
            BoundingBox::new(0.0, 0.0, 95.0, 1.0),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn bounding_box_from_path_covers_every_point() {
        let path = [loc(37.0, -122.0), loc(38.5, -121.0), loc(36.5, -123.5)];
        let bbox = BoundingBox::from_path(&path).unwrap();
        assert_eq!(bbox.south(), 36.5);
        assert_eq!(bbox.north(), 38.5);
        assert_eq!(bbox.west(), -123.5);
        assert_eq!(bbox.east(), -121.0);
        assert!(path.iter().all(|l| bbox.contains(l)));
        assert!(BoundingBox::from_path(&[]).is_none());
    }

    #[test]
    fn bounding_box_parses_from_str() {
        let bbox: BoundingBox = "37.7, -122.5, 37.8, -122.4".parse().unwrap();
        assert_eq!(bbox.south(), 37.7);
        assert_eq!(bbox.east(), -122.4);
        assert!("37.7,-122.5,37.8".parse::<BoundingBox>().is_err());
        assert!("a,b,c,d".parse::<BoundingBox>().is_err());
    }

    #[test]
    fn polyline_encoding_matches_reference() {
        // reference example from the polyline algorithm documentation
        let path = [loc(38.5, -120.2), loc(40.7, -120.95), loc(43.252, -126.453)];
        assert_eq!(encode_coordinates(&path).unwrap(), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
    }
}
