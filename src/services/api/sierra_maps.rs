//! Fetch map data from the SierraMaps REST API
use super::MapApi;
use crate::gps::{BoundingBox, Coordinate};
use crate::places::{Place, WeatherSnapshot};
use crate::routing::Route;
use crate::traffic::{parse_date_token, TrafficIncident};
use crate::Error;
use log::{debug, trace, warn};
use mapdash_derive::FromServiceConfig;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Longest error body echoed back in a RequestError
const MAX_ERROR_BODY: usize = 200;

/// A null field is read the same as a missing one
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default, rename = "resourceSet", deserialize_with = "null_as_default")]
    resource_set: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Resources<T> {
    #[serde(default, deserialize_with = "null_as_default")]
    resources: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Geo {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl Geo {
    fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::new(self.latitude?, self.longitude?)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Address {
    geo: Option<Geo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GeocodeResult {
    geo: Option<Geo>,
    address: Option<Address>,
}

impl GeocodeResult {
    fn coordinate(&self) -> Option<Coordinate> {
        self.geo
            .as_ref()
            .and_then(Geo::coordinate)
            .or_else(|| self.address.as_ref()?.geo.as_ref()?.coordinate())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Line {
    #[serde(deserialize_with = "null_as_default")]
    coordinates: Vec<Vec<f64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RoutePath {
    line: Option<Line>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RouteResource {
    route_path: Option<RoutePath>,
    bbox: Option<Vec<f64>>,
    travel_distance: Option<f64>,
    travel_duration_in_seconds: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ElevationResource {
    #[serde(deserialize_with = "null_as_default")]
    elevations: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct PlaceResult {
    display_name: Option<String>,
    address_line: Option<String>,
    locality: Option<String>,
    admin_district: Option<String>,
    phone: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Condition {
    icon: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CurrentWeather {
    temp: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    weather: Vec<Condition>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WeatherData {
    current: Option<CurrentWeather>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WeatherResponse {
    weather_data: Option<WeatherData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Point {
    #[serde(deserialize_with = "null_as_default")]
    coordinates: Vec<f64>,
}

impl Point {
    fn coordinate(&self) -> Option<Coordinate> {
        match self.coordinates[..] {
            [lat, lng, ..] => Coordinate::new(lat, lng),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct IncidentResult {
    title: Option<String>,
    description: Option<String>,
    severity: Option<serde_json::Value>,
    start: Option<String>,
    point: Option<Point>,
    to_point: Option<Point>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TrafficResponse {
    #[serde(deserialize_with = "null_as_default")]
    traffic_incidents: Vec<IncidentResult>,
}

/// Take the first resource of the first resource set, absent levels are "no data"
fn first_resource<T>(envelope: Envelope<Resources<T>>) -> Option<T> {
    envelope
        .resource_set
        .into_iter()
        .next()?
        .resources
        .into_iter()
        .next()
}

fn decode_geocode(envelope: Envelope<GeocodeResult>) -> Option<Coordinate> {
    envelope
        .resource_set
        .iter()
        .find_map(GeocodeResult::coordinate)
}

fn decode_route(envelope: Envelope<Resources<RouteResource>>) -> Option<Route> {
    let resource = first_resource(envelope)?;
    let raw_path = resource.route_path?.line?.coordinates;
    let mut path = Vec::with_capacity(raw_path.len());
    for point in &raw_path {
        match point[..] {
            [lat, lng, ..] => match Coordinate::new(lat, lng) {
                Some(loc) => path.push(loc),
                None => warn!("skipping invalid route coordinate: {:?}", point),
            },
            _ => warn!("skipping malformed route coordinate: {:?}", point),
        }
    }
    if path.is_empty() {
        return None;
    }

    let bbox = match resource.bbox.as_deref() {
        Some(&[south, west, north, east]) => match BoundingBox::new(south, west, north, east) {
            Ok(bbox) => Some(bbox),
            Err(e) => {
                warn!("ignoring route bounding box: {}", e);
                None
            }
        },
        _ => None,
    };

    Route::new(
        path,
        bbox,
        resource.travel_distance,
        resource.travel_duration_in_seconds,
    )
}

fn decode_elevations(envelope: Envelope<Resources<ElevationResource>>) -> Vec<f64> {
    first_resource(envelope)
        .map(|r| r.elevations)
        .unwrap_or_default()
}

fn decode_places(envelope: Envelope<PlaceResult>) -> Vec<Place> {
    envelope
        .resource_set
        .into_iter()
        .filter_map(|p| {
            let location = match (p.latitude, p.longitude) {
                (Some(lat), Some(lng)) => Coordinate::new(lat, lng),
                _ => None,
            };
            match location {
                Some(location) => Some(Place {
                    name: p.display_name.unwrap_or_else(|| "Unnamed place".to_string()),
                    address_line: p.address_line,
                    locality: p.locality,
                    admin_district: p.admin_district,
                    phone: p.phone,
                    location,
                }),
                None => {
                    warn!("skipping place without coordinates: {:?}", p.display_name);
                    None
                }
            }
        })
        .collect()
}

fn decode_weather(response: WeatherResponse) -> WeatherSnapshot {
    let current = match response.weather_data.and_then(|d| d.current) {
        Some(current) => current,
        None => return WeatherSnapshot::default(),
    };
    let condition = current.weather.into_iter().next().unwrap_or_default();
    WeatherSnapshot {
        temperature: current.temp,
        condition: condition.description,
        icon: condition.icon,
    }
}

fn decode_traffic(response: TrafficResponse) -> Vec<TrafficIncident> {
    response
        .traffic_incidents
        .into_iter()
        .map(|i| {
            let point = i.point.as_ref().and_then(Point::coordinate);
            if point.is_none() {
                debug!("traffic incident without a location: {:?}", i.title);
            }
            let severity = match i.severity {
                Some(serde_json::Value::String(s)) => s,
                Some(serde_json::Value::Null) | None => "unknown".to_string(),
                Some(other) => other.to_string(),
            };
            TrafficIncident {
                title: i.title.unwrap_or_default(),
                description: i.description.unwrap_or_default(),
                severity,
                start_epoch: i.start.as_deref().map(parse_date_token).unwrap_or(0),
                point,
                to_point: i.to_point.as_ref().and_then(Point::coordinate),
            }
        })
        .collect()
}

/// Percent encode a single URL path segment
fn encode_path_segment(segment: &str) -> String {
    // byte_serialize already escapes a literal '+', so any '+' left is an encoded space
    form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Defines the connection parameters used to request data from the SierraMaps API
#[derive(Clone, Debug, FromServiceConfig)]
pub struct SierraMaps {
    base_url: String,
    api_key: String,
    timeout_secs: u64,
}

impl SierraMaps {
    pub fn new(base_url: String, api_key: String, timeout_secs: u64) -> Self {
        SierraMaps {
            base_url,
            api_key,
            timeout_secs,
        }
    }

    /// Reject settings that would make every request fail
    pub(super) fn validate(self) -> Result<Self, Error> {
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfigurationValue(
                "invalid value for sierra_maps.timeout_secs, expected a positive number of seconds: 0"
                    .to_string(),
            ));
        }
        Ok(self)
    }

    fn request_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Issue a GET request and decode the JSON body, the api key is added to every query
    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;
        let request_url = self.request_url(path);
        trace!("GET {} {:?}", request_url, query);
        let resp = client
            .get(&request_url)
            .query(query)
            .query(&[("api_key", &self.api_key)])
            .send()?;
        if resp.status().is_success() {
            let body = resp.text()?;
            Ok(serde_json::from_str(&body)?)
        } else {
            // keep a short piece of the body to explain why the request failed
            let code = resp.status();
            let mut body = resp.text().unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            Err(Error::RequestError(code, body))
        }
    }
}

impl Default for SierraMaps {
    fn default() -> Self {
        SierraMaps {
            base_url: "https://sierramaps.ftp.sh/api".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

impl MapApi for SierraMaps {
    fn geocode(&self, query: &str) -> Result<Option<Coordinate>, Error> {
        let path = format!("geocoding/{}/", encode_path_segment(query));
        let envelope: Envelope<GeocodeResult> = self.get(&path, &[])?;
        Ok(decode_geocode(envelope))
    }

    fn route(&self, start: Coordinate, end: Coordinate) -> Result<Option<Route>, Error> {
        let path = format!("route/{}/{}/1/", start, end);
        let envelope: Envelope<Resources<RouteResource>> = self.get(&path, &[])?;
        let route = decode_route(envelope);
        if let Some(route) = &route {
            debug!("route from {} to {} has {} points", start, end, route.path().len());
        }
        Ok(route)
    }

    fn elevations(&self, points: &[Coordinate]) -> Result<Vec<f64>, Error> {
        let points_param = points
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<String>>()
            .join(",");
        let envelope: Envelope<Resources<ElevationResource>> = self.get(
            "elevation/polyline/",
            &[
                ("points", points_param),
                ("samples", points.len().to_string()),
                ("heights", "sealevel".to_string()),
            ],
        )?;
        Ok(decode_elevations(envelope))
    }

    fn places(&self, bbox: &BoundingBox, top: usize) -> Result<Vec<Place>, Error> {
        let envelope: Envelope<PlaceResult> = self.get(
            "spatialdata/",
            &[
                ("south", bbox.south().to_string()),
                ("west", bbox.west().to_string()),
                ("north", bbox.north().to_string()),
                ("east", bbox.east().to_string()),
                ("top", top.to_string()),
            ],
        )?;
        Ok(decode_places(envelope))
    }

    fn weather(&self, location: Coordinate) -> Result<WeatherSnapshot, Error> {
        let path = format!(
            "weather/{}/{}/metric/",
            location.latitude(),
            location.longitude()
        );
        let response: WeatherResponse = self.get(&path, &[])?;
        Ok(decode_weather(response))
    }

    fn traffic(&self, bbox: &BoundingBox) -> Result<Vec<TrafficIncident>, Error> {
        let path = format!(
            "traffic/{}/{}/{}/{}/",
            bbox.south(),
            bbox.west(),
            bbox.north(),
            bbox.east()
        );
        let response: TrafficResponse = self.get(&path, &[])?;
        Ok(decode_traffic(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geocode_takes_first_result_with_coordinates() {
        let json = r#"{"resourceSet": [
            {"name": "no geo"},
            {"address": {"geo": {"latitude": 37.5, "longitude": -122.1}}},
            {"geo": {"latitude": 1.0, "longitude": 2.0}}
        ]}"#;
        let loc = decode_geocode(serde_json::from_str(json).unwrap()).unwrap();
        assert_eq!(loc.latitude(), 37.5);
        assert_eq!(loc.longitude(), -122.1);
    }

    #[test]
    fn geocode_without_results_is_not_found() {
        assert!(decode_geocode(serde_json::from_str("{}").unwrap()).is_none());
        let json = r#"{"resourceSet": [{"geo": {"latitude": 12.0}}]}"#;
        assert!(decode_geocode(serde_json::from_str(json).unwrap()).is_none());
    }

    #[test]
    fn route_decodes_path_bbox_and_totals() {
        let json = r#"{"resourceSet": [{"resources": [{
            "bbox": [37.0, -122.5, 38.0, -122.0],
            "travelDistance": 12.3456,
            "travelDurationInSeconds": 1290,
            "routePath": {"line": {"coordinates": [[37.0, -122.5], [37.5, -122.2], [38.0, -122.0]]}}
        }]}]}"#;
        let route = decode_route(serde_json::from_str(json).unwrap()).unwrap();
        assert_eq!(route.path().len(), 3);
        assert_eq!(route.bbox().north(), 38.0);
        assert_eq!(route.summary().to_string(), "Route Found: 12.35 km | 22 minutes");
    }

    #[test]
    fn route_without_path_is_not_found() {
        let json = r#"{"resourceSet": [{"resources": [{"travelDistance": 3.0}]}]}"#;
        assert!(decode_route(serde_json::from_str(json).unwrap()).is_none());
        let json = r#"{"resourceSet": [{"resources": [{"routePath": {"line": {"coordinates": []}}}]}]}"#;
        assert!(decode_route(serde_json::from_str(json).unwrap()).is_none());
        let json = r#"{"resourceSet": []}"#;
        assert!(decode_route(serde_json::from_str(json).unwrap()).is_none());
    }

    #[test]
    fn elevations_decode_or_default_to_empty() {
        let json = r#"{"resourceSet": [{"resources": [{"elevations": [10, 20.5, 30]}]}]}"#;
        assert_eq!(
            decode_elevations(serde_json::from_str(json).unwrap()),
            vec![10.0, 20.5, 30.0]
        );
        let json = r#"{"resourceSet": [{"resources": []}]}"#;
        assert!(decode_elevations(serde_json::from_str(json).unwrap()).is_empty());
    }

    #[test]
    fn places_skip_entries_without_coordinates() {
        let json = r#"{"resourceSet": [
            {"DisplayName": "Cafe", "Locality": "Oakland", "Latitude": 37.8, "Longitude": -122.27},
            {"DisplayName": "Nowhere"}
        ]}"#;
        let places = decode_places(serde_json::from_str(json).unwrap());
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].name, "Cafe");
        assert_eq!(places[0].locality.as_deref(), Some("Oakland"));
        assert!(places[0].phone.is_none());
    }

    #[test]
    fn weather_defaults_when_fields_are_missing() {
        let json = r#"{"weather_data": {"current": {"temp": 18.2,
            "weather": [{"icon": "04d", "description": "broken clouds"}]}}}"#;
        let weather = decode_weather(serde_json::from_str(json).unwrap());
        assert_eq!(weather.temperature, Some(18.2));
        assert_eq!(weather.icon.as_deref(), Some("04d"));
        assert_eq!(weather.condition.as_deref(), Some("broken clouds"));

        let weather = decode_weather(serde_json::from_str("{}").unwrap());
        assert_eq!(weather, WeatherSnapshot::default());
    }

    #[test]
    fn traffic_incidents_decode_date_tokens_and_points() {
        let json = r#"{"trafficIncidents": [
            {"title": "Crash", "description": "Lane closed", "severity": 3,
             "start": "/Date(1700000000000)/",
             "point": {"coordinates": [37.7, -122.4]},
             "toPoint": {"coordinates": [37.71, -122.41]}},
            {"title": "Works", "start": "garbage", "point": {"coordinates": [37.6, -122.3]}},
            {"title": "Lost"}
        ]}"#;
        let incidents = decode_traffic(serde_json::from_str(json).unwrap());
        assert_eq!(incidents.len(), 3);
        assert_eq!(incidents[0].severity, "3");
        assert_eq!(incidents[0].start_epoch, 1_700_000_000_000);
        assert!(incidents[0].to_point.is_some());
        assert_eq!(incidents[1].start_epoch, 0);
        assert_eq!(incidents[1].severity, "unknown");
        assert!(incidents[1].to_point.is_none());
        assert_eq!(incidents[2].title, "Lost");
        assert!(incidents[2].point.is_none());
    }

    #[test]
    fn null_fields_read_as_no_data() {
        let json = r#"{"trafficIncidents": null}"#;
        assert!(decode_traffic(serde_json::from_str(json).unwrap()).is_empty());

        let json = r#"{"resourceSet": [{"resources": [{"elevations": null}]}]}"#;
        assert!(decode_elevations(serde_json::from_str(json).unwrap()).is_empty());

        let json = r#"{"resourceSet": [{"resources": [{"routePath": {"line": {"coordinates": null}}}]}]}"#;
        assert!(decode_route(serde_json::from_str(json).unwrap()).is_none());

        let json = r#"{"resourceSet": null}"#;
        assert!(decode_geocode(serde_json::from_str(json).unwrap()).is_none());
        let json = r#"{"resourceSet": [{"resources": null}]}"#;
        assert!(decode_route(serde_json::from_str(json).unwrap()).is_none());

        let json = r#"{"weather_data": {"current": {"temp": 4.0, "weather": null}}}"#;
        let weather = decode_weather(serde_json::from_str(json).unwrap());
        assert_eq!(weather.temperature, Some(4.0));
        assert!(weather.condition.is_none());
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        assert_eq!(encode_path_segment("San Jose, CA"), "San%20Jose%2C%20CA");
        assert_eq!(encode_path_segment("a+b"), "a%2Bb");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        use crate::config::ServiceConfig;
        use crate::services::new_map_api_handler;
        let config: ServiceConfig = serde_yaml::from_str(
            "handler: sierra_maps\nconfiguration: {api_key: abc, timeout_secs: 0}",
        )
        .unwrap();
        assert!(matches!(
            new_map_api_handler(&config),
            Err(Error::InvalidConfigurationValue(_))
        ));

        let config: ServiceConfig = serde_yaml::from_str(
            "handler: sierra_maps\nconfiguration: {api_key: abc, timeout_secs: 5}",
        )
        .unwrap();
        assert!(new_map_api_handler(&config).is_ok());
    }

    #[test]
    fn request_url_joins_base_and_path() {
        let api = SierraMaps::new("http://localhost:8000/api/".to_string(), String::new(), 5);
        assert_eq!(
            api.request_url("route/1,2/3,4/1/"),
            "http://localhost:8000/api/route/1,2/3,4/1/"
        );
    }
}
