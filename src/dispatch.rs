//! Map dashboard actions onto pipeline runs and turn their failures into user alerts
use crate::elevation::run_elevation;
use crate::gps::BoundingBox;
use crate::places::{run_places, FetchStrategy};
use crate::routing::run_routing;
use crate::services::MapApi;
use crate::session::{lock, Tab, ViewState};
use crate::Error;
use log::{debug, error, info};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// Commands understood by the dashboard
pub const HELP: &str = "\
route START | END       draw a route and list traffic incidents along it
elevation START | END   chart the elevation profile between two locations
box S,W,N,E             draw a bounding box for the places search
clear-box               remove the drawn bounding box
places                  list places and weather inside the drawn box
focus N                 centre the map on place card N
show [TAB]              print a tab (map, elevation or places)
help                    print this message
quit                    leave the dashboard";

/// A user action the dashboard can perform
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Route { start: String, end: String },
    Elevation { start: String, end: String },
    DrawBox(BoundingBox),
    ClearBox,
    Places,
    /// centre the map on the n-th place card, counting from 1
    Focus(usize),
    Show(Option<Tab>),
    Help,
    Quit,
}

fn parse_tab(name: &str) -> Result<Tab, Error> {
    match name {
        "map" => Ok(Tab::Map),
        "elevation" => Ok(Tab::Elevation),
        "places" => Ok(Tab::Places),
        _ => Err(Error::InvalidInput(format!("Unknown tab: {}", name))),
    }
}

/// Split "START | END" into its two trimmed halves
fn parse_pair(args: &str) -> Result<(String, String), Error> {
    match args.split_once('|') {
        Some((start, end)) => Ok((start.trim().to_string(), end.trim().to_string())),
        None => Err(Error::InvalidInput(
            "Please enter both start and end locations.".to_string(),
        )),
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, args) = match line.split_once(char::is_whitespace) {
            Some((command, args)) => (command, args.trim()),
            None => (line, ""),
        };
        match command {
            "route" => {
                let (start, end) = parse_pair(args)?;
                Ok(Action::Route { start, end })
            }
            "elevation" => {
                let (start, end) = parse_pair(args)?;
                Ok(Action::Elevation { start, end })
            }
            "box" => Ok(Action::DrawBox(args.parse()?)),
            "clear-box" => Ok(Action::ClearBox),
            "places" => Ok(Action::Places),
            "focus" => args
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map(Action::Focus)
                .ok_or_else(|| Error::InvalidInput(format!("Invalid place number: {}", args))),
            "show" if args.is_empty() => Ok(Action::Show(None)),
            "show" => Ok(Action::Show(Some(parse_tab(args)?))),
            "help" => Ok(Action::Help),
            "quit" | "exit" => Ok(Action::Quit),
            _ => Err(Error::InvalidInput(format!(
                "Unknown command: {}, type help for a list of commands",
                command
            ))),
        }
    }
}

/// What the user sees after an action finishes
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// text of the panel the action updated
    Rendered(String),
    /// the single alert raised for a failed action
    Alert(String),
    /// a newer run of the same pipeline replaced this one, nothing to show
    Superseded,
    Quit,
}

/// Alert text for a failed pipeline, None when the run was only superseded
pub fn alert_for(err: &Error, generic: &str) -> Option<String> {
    match err {
        Error::StaleRun => None,
        e if e.is_input_error() || e.is_not_found() => Some(e.to_string()),
        _ => Some(generic.to_string()),
    }
}

/// Shared state behind every action: the map API, the view and the weather fetch strategy
pub struct Dashboard {
    api: Arc<dyn MapApi>,
    view: Mutex<ViewState>,
    strategy: FetchStrategy,
}

impl Dashboard {
    pub fn new(api: Arc<dyn MapApi>, strategy: FetchStrategy) -> Self {
        Dashboard {
            api,
            view: Mutex::new(ViewState::default()),
            strategy,
        }
    }

    pub fn api(&self) -> &dyn MapApi {
        self.api.as_ref()
    }

    pub fn view(&self) -> &Mutex<ViewState> {
        &self.view
    }

    /// Run an action to completion, every failure yields exactly one alert
    pub fn dispatch(&self, action: &Action) -> Outcome {
        let (result, generic) = match action {
            Action::Route { start, end } => (
                run_routing(self.api(), &self.view, start, end).and_then(|_| self.show(Tab::Map)),
                "Failed to get route.",
            ),
            Action::Elevation { start, end } => (
                run_elevation(self.api(), &self.view, start, end).and_then(|_| self.render()),
                "Failed to get elevation data.",
            ),
            Action::Places => (
                run_places(self.api(), &self.view, self.strategy).and_then(|_| self.render()),
                "Failed to get nearby places.",
            ),
            Action::DrawBox(bbox) => (self.draw_box(*bbox), "Failed to draw bounding box."),
            Action::ClearBox => (self.clear_box(), "Failed to clear bounding box."),
            Action::Focus(n) => (self.focus(*n), "Failed to focus place."),
            Action::Show(Some(tab)) => (self.show(*tab), "Failed to show tab."),
            Action::Show(None) => (self.render(), "Failed to show tab."),
            Action::Help => return Outcome::Rendered(HELP.to_string()),
            Action::Quit => return Outcome::Quit,
        };

        match result {
            Ok(text) => Outcome::Rendered(text),
            Err(e) => match alert_for(&e, generic) {
                Some(alert) => {
                    error!("{:?} failed: {}", action, e);
                    Outcome::Alert(alert)
                }
                None => {
                    debug!("{:?} superseded by a newer run", action);
                    Outcome::Superseded
                }
            },
        }
    }

    fn render(&self) -> Result<String, Error> {
        Ok(lock(&self.view)?.render())
    }

    fn show(&self, tab: Tab) -> Result<String, Error> {
        let mut state = lock(&self.view)?;
        state.show_tab(tab);
        Ok(state.render())
    }

    fn draw_box(&self, bbox: BoundingBox) -> Result<String, Error> {
        lock(&self.view)?.draw_box(bbox);
        info!("bounding box set to {}", bbox);
        Ok(format!("Bounding box: {}", bbox))
    }

    fn clear_box(&self) -> Result<String, Error> {
        lock(&self.view)?.clear_box();
        Ok("Bounding box cleared.".to_string())
    }

    fn focus(&self, n: usize) -> Result<String, Error> {
        let mut state = lock(&self.view)?;
        let card = n
            .checked_sub(1)
            .and_then(|i| state.places().cards().get(i))
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("No place card numbered {}", n)))?;
        let (center, zoom) = card.focus();
        state.set_view(center, zoom);
        state.show_tab(Tab::Map);
        let mut text = format!(
            "Map centred on {} ({}) at zoom {}\n",
            card.place().name,
            center,
            zoom
        );
        if let Some(popup) = card.marker().popup() {
            text.push_str(popup);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::Coordinate;
    use crate::places::Place;
    use crate::routing::Route;
    use crate::services::api::testing::{Call, FakeApi};
    use crate::session::Viewport;

    fn loc(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    fn dashboard(api: FakeApi) -> (Arc<FakeApi>, Dashboard) {
        let api = Arc::new(api);
        let dash = Dashboard::new(api.clone(), FetchStrategy::Sequential);
        (api, dash)
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            "route Oakland, CA | 37.8,-122.4".parse::<Action>().unwrap(),
            Action::Route {
                start: "Oakland, CA".to_string(),
                end: "37.8,-122.4".to_string()
            }
        );
        assert_eq!(
            "box 37,-123,38,-122".parse::<Action>().unwrap(),
            Action::DrawBox(BoundingBox::new(37.0, -123.0, 38.0, -122.0).unwrap())
        );
        assert_eq!("  places ".parse::<Action>().unwrap(), Action::Places);
        assert_eq!("show".parse::<Action>().unwrap(), Action::Show(None));
        assert_eq!(
            "show elevation".parse::<Action>().unwrap(),
            Action::Show(Some(Tab::Elevation))
        );
        assert_eq!("focus 2".parse::<Action>().unwrap(), Action::Focus(2));
        assert_eq!("exit".parse::<Action>().unwrap(), Action::Quit);
    }

    #[test]
    fn rejects_malformed_commands() {
        for line in ["route Oakland", "focus 0", "focus x", "show sky", "fly away", "box 1,2,3"] {
            let err = line.parse::<Action>().unwrap_err();
            assert!(err.is_input_error(), "{}", line);
        }
        assert!(matches!(
            "box 10,170,20,-170".parse::<Action>(),
            Err(Error::UnsupportedBoundingBox(_))
        ));
    }

    #[test]
    fn alerts_by_error_kind() {
        assert_eq!(
            alert_for(&Error::RouteNotFound, "generic"),
            Some("Route not found.".to_string())
        );
        assert_eq!(
            alert_for(&Error::MissingBoundingBox, "generic"),
            Some("Draw a bounding box on the map first.".to_string())
        );
        assert_eq!(
            alert_for(&Error::Other("socket closed".to_string()), "generic"),
            Some("generic".to_string())
        );
        assert_eq!(alert_for(&Error::StaleRun, "generic"), None);
    }

    #[test]
    fn route_action_renders_map_tab() {
        let mut api = FakeApi::default();
        api.route = Route::new(vec![loc(1.0, 1.0), loc(2.0, 2.0)], None, Some(3.0), Some(600.0));
        let (_, dash) = dashboard(api);
        let action = "route 1,1 | 2,2".parse().unwrap();
        match dash.dispatch(&action) {
            Outcome::Rendered(text) => {
                assert!(text.starts_with("Route Found: 3.00 km | 10 minutes"))
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn transport_failure_is_one_generic_alert() {
        let mut api = FakeApi::default();
        api.fail_route = true;
        let (_, dash) = dashboard(api);
        let action = "route 1,1 | 2,2".parse().unwrap();
        assert_eq!(
            dash.dispatch(&action),
            Outcome::Alert("Failed to get route.".to_string())
        );
        let action = "elevation 1,1 | 2,2".parse().unwrap();
        assert_eq!(
            dash.dispatch(&action),
            Outcome::Alert("Failed to get elevation data.".to_string())
        );
    }

    #[test]
    fn places_need_a_box_and_focus_needs_a_card() {
        let mut api = FakeApi::default();
        api.places = vec![Place {
            name: "Cafe".to_string(),
            address_line: None,
            locality: None,
            admin_district: None,
            phone: None,
            location: loc(37.5, -122.5),
        }];
        let (api, dash) = dashboard(api);
        assert_eq!(
            dash.dispatch(&Action::Places),
            Outcome::Alert("Draw a bounding box on the map first.".to_string())
        );
        assert!(api.calls().is_empty());

        dash.dispatch(&"box 37,-123,38,-122".parse().unwrap());
        assert!(matches!(dash.dispatch(&Action::Places), Outcome::Rendered(_)));
        assert_eq!(api.count(|c| matches!(c, Call::Weather(_))), 1);

        assert!(matches!(dash.dispatch(&Action::Focus(2)), Outcome::Alert(_)));
        match dash.dispatch(&Action::Focus(1)) {
            Outcome::Rendered(text) => {
                assert!(text.starts_with("Map centred on Cafe"));
                assert!(text.contains("\nCafe\n"));
                assert!(text.ends_with("N/A"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        let state = lock(dash.view()).unwrap();
        assert_eq!(state.viewport(), Viewport::Center(loc(37.5, -122.5), 17));
        assert_eq!(state.active_tab(), Tab::Map);
    }

    #[test]
    fn clearing_the_box_blocks_places() {
        let (_, dash) = dashboard(FakeApi::default());
        dash.dispatch(&"box 37,-123,38,-122".parse().unwrap());
        dash.dispatch(&Action::ClearBox);
        assert!(matches!(dash.dispatch(&Action::Places), Outcome::Alert(_)));
        assert_eq!(dash.dispatch(&Action::Quit), Outcome::Quit);
    }
}
