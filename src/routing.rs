//! Route between two locations, draw it and pull traffic incidents for its extent
use crate::geocode::resolve;
use crate::gps::{path_length, BoundingBox, Coordinate};
use crate::services::MapApi;
use crate::session::{begin_run, with_view, LineStyle, Marker, Pipeline, Polyline, ViewState};
use crate::traffic::fetch_traffic;
use crate::Error;
use chrono::Local;
use log::{debug, info};
use std::fmt;
use std::sync::Mutex;

/// A route returned by the routing service
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    path: Vec<Coordinate>,
    bbox: BoundingBox,
    distance_km: Option<f64>,
    duration_secs: Option<f64>,
}

impl Route {
    /// Build a route from its path in travel order, returns None for an empty path
    ///
    /// The bounding box falls back to the extent of the path when the service didn't send one.
    pub fn new(
        path: Vec<Coordinate>,
        bbox: Option<BoundingBox>,
        distance_km: Option<f64>,
        duration_secs: Option<f64>,
    ) -> Option<Self> {
        let bbox = match bbox {
            Some(bbox) => bbox,
            None => BoundingBox::from_path(&path)?,
        };
        Some(Route {
            path,
            bbox,
            distance_km,
            duration_secs,
        })
    }

    pub fn path(&self) -> &[Coordinate] {
        &self.path
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Travel distance in km, the haversine length of the path if the service omitted it
    pub fn distance_km(&self) -> f64 {
        self.distance_km
            .unwrap_or_else(|| path_length(&self.path))
    }

    pub fn summary(&self) -> RouteSummary {
        RouteSummary::new(self.distance_km(), self.duration_secs.unwrap_or(0.0))
    }
}

/// Distance and travel time shown above the traffic list
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteSummary {
    distance_km: f64,
    duration_min: i64,
}

impl RouteSummary {
    pub fn new(distance_km: f64, duration_secs: f64) -> Self {
        RouteSummary {
            distance_km,
            duration_min: (duration_secs / 60.0).round() as i64,
        }
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    pub fn duration_min(&self) -> i64 {
        self.duration_min
    }
}

impl fmt::Display for RouteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Route Found: {:.2} km | {} minutes",
            self.distance_km, self.duration_min
        )
    }
}

/// Resolve both inputs, draw the route between them and load traffic along it
///
/// Previous route and incident overlays are removed before the new route is drawn. Traffic
/// failures never fail the route, they only add a notice to the traffic panel.
pub fn run_routing(
    api: &dyn MapApi,
    view: &Mutex<ViewState>,
    start_input: &str,
    end_input: &str,
) -> Result<Route, Error> {
    if start_input.trim().is_empty() || end_input.trim().is_empty() {
        return Err(Error::InvalidInput(
            "Please enter both start and end locations.".to_string(),
        ));
    }
    let token = begin_run(view, Pipeline::Routing)?;

    let start = resolve(api, start_input);
    let end = resolve(api, end_input);
    let (start, end) = match (start, end) {
        (Some(start), Some(end)) => (start, end),
        (None, _) => return Err(Error::LocationNotFound(start_input.to_string())),
        (_, None) => return Err(Error::LocationNotFound(end_input.to_string())),
    };

    let route = api.route(start, end)?.ok_or(Error::RouteNotFound)?;
    let summary = route.summary();
    info!("{} ({} points)", summary, route.path().len());

    with_view(view, &token, |v| {
        v.clear_route_overlays();
        let line = Polyline::new(route.path().to_vec(), LineStyle::ROUTE);
        let markers = vec![
            Marker::new(start, "Start".to_string()),
            Marker::new(end, "End".to_string()),
        ];
        v.set_route(line, markers, summary);
        v.fit_bounds(route.bbox());
    })?;

    debug!("requesting traffic incidents inside {}", route.bbox());
    fetch_traffic(api, view, &token, &route.bbox(), Local::now().date_naive())?;
    Ok(route)
}
