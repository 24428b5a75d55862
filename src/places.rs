//! Look up places inside the drawn bounding box together with the current weather at each
use crate::gps::{BoundingBox, Coordinate};
use crate::services::MapApi;
use crate::session::{begin_run, lock, with_view, Marker, Pipeline, Tab, ViewState};
use crate::Error;
use log::{debug, error, info};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::thread;

/// Maximum number of places requested for a bounding box
pub const MAX_PLACES: usize = 15;

/// Zoom level used when focusing the map on a single place
pub const PLACE_ZOOM: u8 = 17;

const DEFAULT_ICON: &str = "01d";
const NO_PLACES_MESSAGE: &str = "No places found in the selected area. Try a different location.";

/// A point of interest returned by the places service
#[derive(Clone, Debug, PartialEq)]
pub struct Place {
    pub name: String,
    pub address_line: Option<String>,
    pub locality: Option<String>,
    pub admin_district: Option<String>,
    pub phone: Option<String>,
    pub location: Coordinate,
}

/// Current conditions at a place, every field is optional
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeatherSnapshot {
    /// degrees celsius
    pub temperature: Option<f64>,
    pub condition: Option<String>,
    pub icon: Option<String>,
}

impl WeatherSnapshot {
    pub fn temperature_label(&self) -> String {
        match self.temperature {
            Some(t) => format!("{}°C", t),
            None => "N/A".to_string(),
        }
    }

    pub fn condition_label(&self) -> &str {
        self.condition.as_deref().unwrap_or("Unknown")
    }

    pub fn icon_url(&self) -> String {
        format!(
            "https://openweathermap.org/img/wn/{}.png",
            self.icon.as_deref().unwrap_or(DEFAULT_ICON)
        )
    }
}

/// How the weather for each place is requested
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchStrategy {
    /// one request at a time in place order
    Sequential,
    /// at most n requests in flight, results still rendered in place order
    BoundedParallel(NonZeroUsize),
}

impl FetchStrategy {
    /// 0 or 1 concurrent requests mean sequential fetching
    pub fn from_concurrency(n: usize) -> Self {
        match NonZeroUsize::new(n) {
            Some(n) if n.get() > 1 => FetchStrategy::BoundedParallel(n),
            _ => FetchStrategy::Sequential,
        }
    }

    fn batch_size(&self) -> usize {
        match self {
            FetchStrategy::Sequential => 1,
            FetchStrategy::BoundedParallel(n) => n.get(),
        }
    }
}

impl Default for FetchStrategy {
    fn default() -> Self {
        FetchStrategy::Sequential
    }
}

/// Card shown in the places tab
#[derive(Clone, Debug, PartialEq)]
pub struct PlaceCard {
    place: Place,
    weather: WeatherSnapshot,
}

impl PlaceCard {
    pub fn new(place: Place, weather: WeatherSnapshot) -> Self {
        PlaceCard { place, weather }
    }

    pub fn place(&self) -> &Place {
        &self.place
    }

    pub fn weather(&self) -> &WeatherSnapshot {
        &self.weather
    }

    pub fn address(&self) -> String {
        let parts: Vec<&str> = [
            self.place.address_line.as_deref(),
            self.place.locality.as_deref(),
            self.place.admin_district.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .collect();
        if parts.is_empty() {
            "N/A".to_string()
        } else {
            parts.join(", ")
        }
    }

    pub fn phone(&self) -> &str {
        self.place.phone.as_deref().unwrap_or("N/A")
    }

    /// Where "view on map" centres the map
    pub fn focus(&self) -> (Coordinate, u8) {
        (self.place.location, PLACE_ZOOM)
    }

    /// Map marker with a short popup for this place
    pub fn marker(&self) -> Marker {
        let area: Vec<&str> = [
            self.place.locality.as_deref(),
            self.place.admin_district.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        let popup = format!(
            "{}\n{}\n{} {}",
            self.place.name,
            area.join(", "),
            self.weather.icon_url(),
            self.weather.temperature_label()
        );
        Marker::new(self.place.location, self.place.name.clone()).with_popup(popup)
    }
}

impl fmt::Display for PlaceCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.place.name)?;
        writeln!(f, "  {}", self.address())?;
        writeln!(f, "  Phone: {}", self.phone())?;
        writeln!(
            f,
            "  Weather: {} {} {}",
            self.weather.condition_label(),
            self.weather.icon_url(),
            self.weather.temperature_label()
        )
    }
}

/// Contents of the places tab
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlacesPanel {
    cards: Vec<PlaceCard>,
    placeholder: Option<String>,
}

impl PlacesPanel {
    pub fn cards(&self) -> &[PlaceCard] {
        &self.cards
    }

    pub fn push(&mut self, card: PlaceCard) {
        self.cards.push(card);
    }

    pub fn set_placeholder(&mut self, message: &str) {
        self.cards.clear();
        self.placeholder = Some(message.to_string());
    }
}

impl fmt::Display for PlacesPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.placeholder {
            writeln!(f, "{}", message)?;
        }
        for card in &self.cards {
            write!(f, "{}", card)?;
        }
        Ok(())
    }
}

/// Weather for a place, failures are logged and shown as unknown
fn weather_or_default(api: &dyn MapApi, location: Coordinate) -> WeatherSnapshot {
    match api.weather(location) {
        Ok(weather) => weather,
        Err(e) => {
            error!("Weather error for {}: {}", location, e);
            WeatherSnapshot::default()
        }
    }
}

/// Fetch weather for a batch of places, output order matches input order
fn fetch_batch(api: &dyn MapApi, batch: &[Place]) -> Vec<WeatherSnapshot> {
    if batch.len() == 1 {
        return vec![weather_or_default(api, batch[0].location)];
    }
    thread::scope(|s| {
        let handles: Vec<_> = batch
            .iter()
            .map(|p| s.spawn(move || weather_or_default(api, p.location)))
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join().unwrap_or_else(|_| {
                    error!("weather request thread panicked");
                    WeatherSnapshot::default()
                })
            })
            .collect()
    })
}

/// List places inside the drawn box with a card and marker for each one
///
/// Previously rendered cards and markers are replaced. No weather requests are made when the
/// box contains no places.
pub fn run_places(
    api: &dyn MapApi,
    view: &Mutex<ViewState>,
    strategy: FetchStrategy,
) -> Result<usize, Error> {
    let bbox: BoundingBox = lock(view)?.drawn_box().ok_or(Error::MissingBoundingBox)?;
    let token = begin_run(view, Pipeline::Places)?;

    let places = api.places(&bbox, MAX_PLACES)?;
    info!("found {} places inside {}", places.len(), bbox);
    with_view(view, &token, |v| v.clear_places())?;
    if places.is_empty() {
        with_view(view, &token, |v| {
            v.places_mut().set_placeholder(NO_PLACES_MESSAGE);
            v.show_tab(Tab::Places);
        })?;
        return Ok(0);
    }

    debug!("fetching weather with {:?}", strategy);
    for batch in places.chunks(strategy.batch_size()) {
        let weather = fetch_batch(api, batch);
        let cards: Vec<PlaceCard> = batch
            .iter()
            .cloned()
            .zip(weather)
            .map(|(place, weather)| PlaceCard::new(place, weather))
            .collect();
        with_view(view, &token, |v| {
            for card in cards {
                v.add_place_marker(card.marker());
                v.places_mut().push(card);
            }
        })?;
    }
    with_view(view, &token, |v| v.show_tab(Tab::Places))?;

    Ok(places.len())
}
