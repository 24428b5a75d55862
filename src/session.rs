//! Explicit view state shared by every pipeline, replaces map layers held in globals
use crate::elevation::ElevationChart;
use crate::gps::{BoundingBox, Coordinate};
use crate::places::PlacesPanel;
use crate::routing::RouteSummary;
use crate::traffic::TrafficPanel;
use crate::Error;
use log::debug;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Mutex, MutexGuard};

/// Initial map centre (San Francisco) and zoom level
const DEFAULT_CENTER: Coordinate = Coordinate::new_unchecked(37.78, -122.43);
const DEFAULT_ZOOM: u8 = 13;

/// Pipelines that own overlay state, each has its own run generation
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Pipeline {
    Routing,
    Elevation,
    Places,
}

/// Identifies a single run of a pipeline, only the newest run may write view state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunToken {
    pipeline: Pipeline,
    generation: u64,
}

/// Tabs of the dashboard
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tab {
    Map,
    Elevation,
    Places,
}

/// What part of the map is on screen
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Viewport {
    Center(Coordinate, u8),
    Bounds(BoundingBox),
}

/// Stroke style applied to a polyline overlay
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineStyle {
    pub color: &'static str,
    pub weight: u32,
    pub dashed: bool,
}

impl LineStyle {
    pub const ROUTE: LineStyle = LineStyle {
        color: "blue",
        weight: 5,
        dashed: false,
    };
    pub const ELEVATION_ROUTE: LineStyle = LineStyle {
        color: "green",
        weight: 4,
        dashed: false,
    };
    pub const INCIDENT: LineStyle = LineStyle {
        color: "red",
        weight: 4,
        dashed: true,
    };
}

/// A line drawn on the map
#[derive(Clone, Debug, PartialEq)]
pub struct Polyline {
    path: Vec<Coordinate>,
    style: LineStyle,
}

impl Polyline {
    pub fn new(path: Vec<Coordinate>, style: LineStyle) -> Self {
        Polyline { path, style }
    }

    pub fn path(&self) -> &[Coordinate] {
        &self.path
    }

    pub fn style(&self) -> LineStyle {
        self.style
    }
}

/// A labelled point drawn on the map
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    location: Coordinate,
    label: String,
    popup: Option<String>,
}

impl Marker {
    pub fn new(location: Coordinate, label: String) -> Self {
        Marker {
            location,
            label,
            popup: None,
        }
    }

    pub fn with_popup(mut self, popup: String) -> Self {
        self.popup = Some(popup);
        self
    }

    pub fn location(&self) -> Coordinate {
        self.location
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn popup(&self) -> Option<&str> {
        self.popup.as_deref()
    }

    pub fn latitude(&self) -> f64 {
        self.location.latitude()
    }

    pub fn longitude(&self) -> f64 {
        self.location.longitude()
    }
}

/// Everything the dashboard currently displays
#[derive(Debug)]
pub struct ViewState {
    generations: HashMap<Pipeline, u64>,
    viewport: Viewport,
    active_tab: Tab,
    drawn_box: Option<BoundingBox>,
    route_line: Option<Polyline>,
    // start/end markers are torn down together with the incident lines
    route_markers: Vec<Marker>,
    traffic_lines: Vec<Polyline>,
    route_summary: Option<RouteSummary>,
    traffic: TrafficPanel,
    elevation_line: Option<Polyline>,
    elevation_chart: Option<ElevationChart>,
    place_markers: Vec<Marker>,
    places: PlacesPanel,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            generations: HashMap::new(),
            viewport: Viewport::Center(DEFAULT_CENTER, DEFAULT_ZOOM),
            active_tab: Tab::Map,
            drawn_box: None,
            route_line: None,
            route_markers: Vec::new(),
            traffic_lines: Vec::new(),
            route_summary: None,
            traffic: TrafficPanel::default(),
            elevation_line: None,
            elevation_chart: None,
            place_markers: Vec::new(),
            places: PlacesPanel::default(),
        }
    }
}

impl ViewState {
    /// Start a new run of a pipeline, any older run of it becomes stale
    pub fn begin(&mut self, pipeline: Pipeline) -> RunToken {
        let generation = self.generations.entry(pipeline).or_insert(0);
        *generation += 1;
        debug!("starting {:?} run #{}", pipeline, generation);
        RunToken {
            pipeline,
            generation: *generation,
        }
    }

    /// True if no newer run of the token's pipeline has started
    pub fn is_current(&self, token: &RunToken) -> bool {
        self.generations.get(&token.pipeline) == Some(&token.generation)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn fit_bounds(&mut self, bbox: BoundingBox) {
        self.viewport = Viewport::Bounds(bbox);
    }

    pub fn set_view(&mut self, center: Coordinate, zoom: u8) {
        self.viewport = Viewport::Center(center, zoom);
    }

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn show_tab(&mut self, tab: Tab) {
        self.active_tab = tab;
    }

    pub fn drawn_box(&self) -> Option<BoundingBox> {
        self.drawn_box
    }

    /// Replace the user drawn rectangle, only one exists at a time
    pub fn draw_box(&mut self, bbox: BoundingBox) {
        self.drawn_box = Some(bbox);
    }

    pub fn clear_box(&mut self) {
        self.drawn_box = None;
    }

    /// Remove the route, its markers and every incident overlay
    pub fn clear_route_overlays(&mut self) {
        self.route_line = None;
        self.route_markers.clear();
        self.traffic_lines.clear();
    }

    pub fn set_route(&mut self, line: Polyline, markers: Vec<Marker>, summary: RouteSummary) {
        self.route_line = Some(line);
        self.route_markers = markers;
        self.route_summary = Some(summary);
        self.traffic = TrafficPanel::default();
    }

    pub fn route_line(&self) -> Option<&Polyline> {
        self.route_line.as_ref()
    }

    pub fn route_markers(&self) -> &[Marker] {
        &self.route_markers
    }

    pub fn route_summary(&self) -> Option<&RouteSummary> {
        self.route_summary.as_ref()
    }

    pub fn add_traffic_line(&mut self, line: Polyline) {
        self.traffic_lines.push(line);
    }

    pub fn traffic_lines(&self) -> &[Polyline] {
        &self.traffic_lines
    }

    pub fn traffic(&self) -> &TrafficPanel {
        &self.traffic
    }

    pub fn traffic_mut(&mut self) -> &mut TrafficPanel {
        &mut self.traffic
    }

    pub fn set_elevation(&mut self, line: Polyline, chart: ElevationChart) {
        self.elevation_line = Some(line);
        self.elevation_chart = Some(chart);
    }

    pub fn elevation_line(&self) -> Option<&Polyline> {
        self.elevation_line.as_ref()
    }

    pub fn elevation_chart(&self) -> Option<&ElevationChart> {
        self.elevation_chart.as_ref()
    }

    /// Drop every place card and marker
    pub fn clear_places(&mut self) {
        self.places = PlacesPanel::default();
        self.place_markers.clear();
    }

    pub fn places(&self) -> &PlacesPanel {
        &self.places
    }

    pub fn places_mut(&mut self) -> &mut PlacesPanel {
        &mut self.places
    }

    pub fn add_place_marker(&mut self, marker: Marker) {
        self.place_markers.push(marker);
    }

    pub fn place_markers(&self) -> &[Marker] {
        &self.place_markers
    }

    /// Render the panels of the active tab as plain text
    pub fn render(&self) -> String {
        let mut out = String::new();
        match self.active_tab {
            Tab::Map => {
                if let Some(summary) = &self.route_summary {
                    let _ = writeln!(out, "{}", summary);
                }
                let _ = write!(out, "{}", self.traffic);
            }
            Tab::Elevation => {
                if let Some(chart) = &self.elevation_chart {
                    let _ = write!(out, "{}", chart);
                }
            }
            Tab::Places => {
                let _ = write!(out, "{}", self.places);
            }
        }
        out
    }
}

/// Lock the view state, a poisoned lock is reported as an error
pub fn lock(view: &Mutex<ViewState>) -> Result<MutexGuard<'_, ViewState>, Error> {
    view.lock()
        .map_err(|_| Error::Other("view state lock poisoned".to_string()))
}

/// Start a new run of the pipeline on shared view state
pub fn begin_run(view: &Mutex<ViewState>, pipeline: Pipeline) -> Result<RunToken, Error> {
    Ok(lock(view)?.begin(pipeline))
}

/// Apply a mutation to the view state if the run is still the newest one
pub fn with_view<F, R>(view: &Mutex<ViewState>, token: &RunToken, f: F) -> Result<R, Error>
where
    F: FnOnce(&mut ViewState) -> R,
{
    let mut state = lock(view)?;
    if !state.is_current(token) {
        debug!("discarding output of stale {:?} run", token.pipeline);
        return Err(Error::StaleRun);
    }
    Ok(f(&mut state))
}
