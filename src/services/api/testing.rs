//! In-memory MapApi used by the pipeline tests
use super::MapApi;
use crate::gps::{BoundingBox, Coordinate};
use crate::places::{Place, WeatherSnapshot};
use crate::routing::Route;
use crate::traffic::TrafficIncident;
use crate::Error;
use std::collections::HashMap;
use std::sync::Mutex;

/// One recorded request
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Geocode(String),
    Route(Coordinate, Coordinate),
    Elevations(usize),
    Places(BoundingBox, usize),
    Weather(Coordinate),
    Traffic(BoundingBox),
}

/// Canned responses, fields left at their defaults mean "no data"
#[derive(Debug, Default)]
pub struct FakeApi {
    pub geocode: HashMap<String, Coordinate>,
    pub route: Option<Route>,
    pub elevations: Option<Vec<f64>>,
    pub places: Vec<Place>,
    pub weather: HashMap<String, WeatherSnapshot>,
    pub traffic: Vec<TrafficIncident>,
    pub fail_route: bool,
    pub fail_traffic: bool,
    pub fail_weather: bool,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count<F: Fn(&Call) -> bool>(&self, f: F) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| f(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn transport_failure() -> Error {
    Error::RequestError(
        reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        "fake failure".to_string(),
    )
}

impl MapApi for FakeApi {
    fn geocode(&self, query: &str) -> Result<Option<Coordinate>, Error> {
        self.record(Call::Geocode(query.to_string()));
        Ok(self.geocode.get(query).copied())
    }

    fn route(&self, start: Coordinate, end: Coordinate) -> Result<Option<Route>, Error> {
        self.record(Call::Route(start, end));
        if self.fail_route {
            return Err(transport_failure());
        }
        Ok(self.route.clone())
    }

    fn elevations(&self, points: &[Coordinate]) -> Result<Vec<f64>, Error> {
        self.record(Call::Elevations(points.len()));
        Ok(match &self.elevations {
            Some(values) => values.clone(),
            // one value per point rising by 10m
            None => (0..points.len()).map(|i| 100.0 + 10.0 * i as f64).collect(),
        })
    }

    fn places(&self, bbox: &BoundingBox, top: usize) -> Result<Vec<Place>, Error> {
        self.record(Call::Places(*bbox, top));
        Ok(self.places.iter().take(top).cloned().collect())
    }

    fn weather(&self, location: Coordinate) -> Result<WeatherSnapshot, Error> {
        self.record(Call::Weather(location));
        if self.fail_weather {
            return Err(transport_failure());
        }
        Ok(self
            .weather
            .get(&location.to_string())
            .cloned()
            .unwrap_or_default())
    }

    fn traffic(&self, bbox: &BoundingBox) -> Result<Vec<TrafficIncident>, Error> {
        self.record(Call::Traffic(*bbox));
        if self.fail_traffic {
            return Err(transport_failure());
        }
        Ok(self.traffic.clone())
    }
}
