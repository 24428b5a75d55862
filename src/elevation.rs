//! Build an elevation profile along a route from a fixed number of sampled points
use crate::geocode::resolve;
use crate::gps::{haversine_distance, Coordinate};
use crate::services::MapApi;
use crate::session::{begin_run, with_view, LineStyle, Pipeline, Polyline, Tab, ViewState};
use crate::Error;
use log::{debug, info};
use std::fmt;
use std::sync::Mutex;

/// Number of points sampled from a route for the elevation request
pub const SAMPLE_COUNT: usize = 20;

/// Zoom level used when centring the map on the start of the profile
const START_ZOOM: u8 = 8;

/// Fraction of the elevation range added above and below the chart data
const Y_PADDING: f64 = 0.1;

/// Pick at most `count` points from the path at a fixed index stride
///
/// The stride is `len / count` rounded down, paths shorter than `count` use a stride of one
/// and keep every point.
pub fn downsample(path: &[Coordinate], count: usize) -> Vec<Coordinate> {
    if count == 0 {
        return Vec::new();
    }
    let step = (path.len() / count).max(1);
    path.iter().step_by(step).take(count).copied().collect()
}

/// Running great-circle distance in km, the first entry is always 0
pub fn cumulative_distances(points: &[Coordinate]) -> Vec<f64> {
    let mut distances = Vec::with_capacity(points.len());
    let mut total = 0.0;
    for (i, point) in points.iter().enumerate() {
        if i > 0 {
            total += haversine_distance(&points[i - 1], point);
        }
        distances.push(total);
    }
    distances
}

/// Padded y-axis bounds for a set of elevations, None if there are no values
pub fn y_bounds(values: &[f64]) -> Option<[f64; 2]> {
    let first = *values.first()?;
    let (min, max) = values
        .iter()
        .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let padding = (max - min) * Y_PADDING;
    Some([min - padding, max + padding])
}

/// A sampled route point and its distance from the start of the route
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampledPoint {
    pub location: Coordinate,
    pub distance_km: f64,
}

/// Pair sampled points with their running distance
pub fn sample_route(path: &[Coordinate], count: usize) -> Vec<SampledPoint> {
    let points = downsample(path, count);
    let distances = cumulative_distances(&points);
    points
        .into_iter()
        .zip(distances)
        .map(|(location, distance_km)| SampledPoint {
            location,
            distance_km,
        })
        .collect()
}

/// Elevation against distance along the route
#[derive(Clone, Debug, PartialEq)]
pub struct ElevationChart {
    samples: Vec<SampledPoint>,
    /// (distance km, elevation m) pairs in route order
    series: Vec<(f64, f64)>,
    y_bounds: [f64; 2],
}

impl ElevationChart {
    /// Combine samples with elevations, both must have the same non-zero length
    pub fn new(samples: Vec<SampledPoint>, elevations: &[f64]) -> Result<Self, Error> {
        if elevations.is_empty() {
            return Err(Error::ElevationNotFound);
        }
        if samples.len() != elevations.len() {
            return Err(Error::Other(format!(
                "requested elevation for {} points but received {} values",
                samples.len(),
                elevations.len()
            )));
        }
        let y_bounds = y_bounds(elevations).ok_or(Error::ElevationNotFound)?;
        let series = samples
            .iter()
            .zip(elevations)
            .map(|(s, &e)| (s.distance_km, e))
            .collect();
        Ok(ElevationChart {
            samples,
            series,
            y_bounds,
        })
    }

    pub fn samples(&self) -> &[SampledPoint] {
        &self.samples
    }

    pub fn series(&self) -> &[(f64, f64)] {
        &self.series
    }

    /// Suggested y-axis range, padded so a flat-ish profile doesn't fill the chart
    pub fn y_bounds(&self) -> [f64; 2] {
        self.y_bounds
    }

    pub fn total_distance_km(&self) -> f64 {
        self.series.last().map(|(x, _)| *x).unwrap_or(0.0)
    }

    /// X-axis labels, one per sample
    pub fn x_labels(&self) -> Vec<String> {
        self.series
            .iter()
            .map(|(x, _)| format!("{:.2} km", x))
            .collect()
    }
}

impl fmt::Display for ElevationChart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Elevation profile: {} samples over {:.2} km",
            self.series.len(),
            self.total_distance_km()
        )?;
        for (label, (_, elevation)) in self.x_labels().iter().zip(&self.series) {
            writeln!(f, "  {:>10}  {:>8.1} m", label, elevation)?;
        }
        Ok(())
    }
}

/// Resolve both inputs, route between them and chart the elevation along the route
pub fn run_elevation(
    api: &dyn MapApi,
    view: &Mutex<ViewState>,
    start_input: &str,
    end_input: &str,
) -> Result<ElevationChart, Error> {
    if start_input.trim().is_empty() || end_input.trim().is_empty() {
        return Err(Error::InvalidInput(
            "Please enter both start and end locations.".to_string(),
        ));
    }
    let token = begin_run(view, Pipeline::Elevation)?;

    let start = resolve(api, start_input);
    let end = resolve(api, end_input);
    let (start, end) = match (start, end) {
        (Some(start), Some(end)) => (start, end),
        (None, _) => return Err(Error::LocationNotFound(start_input.to_string())),
        (_, None) => return Err(Error::LocationNotFound(end_input.to_string())),
    };
    with_view(view, &token, |v| v.set_view(start, START_ZOOM))?;

    let route = api.route(start, end)?.ok_or(Error::RouteNotFound)?;
    let samples = sample_route(route.path(), SAMPLE_COUNT);
    debug!(
        "sampled {} of {} route points for elevation",
        samples.len(),
        route.path().len()
    );

    let points: Vec<Coordinate> = samples.iter().map(|s| s.location).collect();
    let elevations = api.elevations(&points)?;
    let chart = ElevationChart::new(samples, &elevations)?;
    info!(
        "elevation profile over {:.2} km, {:.1} m to {:.1} m",
        chart.total_distance_km(),
        chart.y_bounds()[0],
        chart.y_bounds()[1]
    );

    let line = Polyline::new(route.path().to_vec(), LineStyle::ELEVATION_ROUTE);
    let result = chart.clone();
    with_view(view, &token, |v| {
        v.set_elevation(line, chart);
        v.fit_bounds(route.bbox());
        v.show_tab(Tab::Elevation);
    })?;
    Ok(result)
}
