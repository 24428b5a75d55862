//! Access routing, geocoding, elevation, places, weather and traffic data from a mapping API
use crate::config::{FromServiceConfig, ServiceConfig};
use crate::gps::{BoundingBox, Coordinate};
use crate::places::{Place, WeatherSnapshot};
use crate::routing::Route;
use crate::traffic::TrafficIncident;
use crate::Error;
mod sierra_maps;
pub use sierra_maps::SierraMaps;
#[cfg(test)]
pub mod testing;

/// trait that defines the remote lookups every pipeline is built from
///
/// Implementations map absent data to `None` or an empty `Vec`, errors are reserved for
/// transport and decoding failures.
pub trait MapApi: Send + Sync {
    /// Resolve free text into the first result carrying geo-coordinates
    fn geocode(&self, query: &str) -> Result<Option<Coordinate>, Error>;

    /// Find a route between two points
    fn route(&self, start: Coordinate, end: Coordinate) -> Result<Option<Route>, Error>;

    /// Sea level elevation in meters for each point, in the same order
    fn elevations(&self, points: &[Coordinate]) -> Result<Vec<f64>, Error>;

    /// Up to `top` places inside the bounding box ordered by relevance
    fn places(&self, bbox: &BoundingBox, top: usize) -> Result<Vec<Place>, Error>;

    /// Current weather at a point
    fn weather(&self, location: Coordinate) -> Result<WeatherSnapshot, Error>;

    /// Traffic incidents reported inside the bounding box
    fn traffic(&self, bbox: &BoundingBox) -> Result<Vec<TrafficIncident>, Error>;
}

pub fn new_map_api_handler(config: &ServiceConfig) -> Result<Box<dyn MapApi>, Error> {
    match config.handler() {
        "sierra_maps" => Ok(Box::new(SierraMaps::from_config(config)?.validate()?)),
        _ => Err(Error::UnknownServiceHandler(format!(
            "no map api handler exists for: {}",
            config.handler()
        ))),
    }
}
