//! Fetch traffic incidents along a route and split them into today's and older reports
use crate::gps::{BoundingBox, Coordinate};
use crate::services::MapApi;
use crate::session::{with_view, LineStyle, Polyline, RunToken, ViewState};
use crate::Error;
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use log::{debug, error, info};
use std::fmt;
use std::sync::Mutex;

/// A single incident reported by the traffic feed
#[derive(Clone, Debug, PartialEq)]
pub struct TrafficIncident {
    pub title: String,
    pub description: String,
    pub severity: String,
    /// start time in milliseconds since the unix epoch, 0 when the feed's token was unreadable
    pub start_epoch: i64,
    /// where the incident starts, older reports may come without one
    pub point: Option<Coordinate>,
    pub to_point: Option<Coordinate>,
}

impl TrafficIncident {
    /// Start time in the local timezone
    pub fn start_time(&self) -> Option<DateTime<Local>> {
        Local.timestamp_millis_opt(self.start_epoch).single()
    }

    /// True when the incident started on the given local calendar day
    pub fn started_on(&self, day: NaiveDate) -> bool {
        self.start_time()
            .map(|t| t.date_naive() == day)
            .unwrap_or(false)
    }

    /// Dashed line from the start point to the end point (or the start point again)
    ///
    /// Incidents without a start point are listed but not drawn.
    pub fn overlay_line(&self) -> Option<Polyline> {
        let start = self.point?;
        let end = self.to_point.unwrap_or(start);
        Some(Polyline::new(vec![start, end], LineStyle::INCIDENT))
    }
}

/// Extract the epoch milliseconds out of a "/Date(<millis>)/" token, anything else is 0
pub fn parse_date_token(token: &str) -> i64 {
    let start = match token.find("/Date(") {
        Some(idx) => idx + "/Date(".len(),
        None => return 0,
    };
    let rest = &token[start..];
    let digits = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits == 0 || !rest[digits..].starts_with(")/") {
        return 0;
    }
    rest[..digits].parse().unwrap_or(0)
}

/// Order incidents most recent first, ties keep their feed order
pub fn sort_by_recency(incidents: &mut [TrafficIncident]) {
    incidents.sort_by(|a, b| b.start_epoch.cmp(&a.start_epoch));
}

/// An incident as listed in the traffic panel
#[derive(Clone, Debug, PartialEq)]
pub struct IncidentEntry {
    incident: TrafficIncident,
    today: bool,
}

impl IncidentEntry {
    pub fn incident(&self) -> &TrafficIncident {
        &self.incident
    }

    pub fn is_today(&self) -> bool {
        self.today
    }
}

impl fmt::Display for IncidentEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let when = match self.incident.start_time() {
            Some(t) => t.format("%a %b %d %Y, %H:%M:%S").to_string(),
            None => "unknown time".to_string(),
        };
        let flag = if self.today { "[today] " } else { "" };
        writeln!(f, "  {}{}", flag, self.incident.title)?;
        if !self.incident.description.is_empty() {
            writeln!(f, "    {}", self.incident.description)?;
        }
        writeln!(f, "    Severity: {} | {}", self.incident.severity, when)
    }
}

/// Sort incidents and flag the ones that started today
pub fn partition_by_day(mut incidents: Vec<TrafficIncident>, today: NaiveDate) -> Vec<IncidentEntry> {
    sort_by_recency(&mut incidents);
    incidents
        .into_iter()
        .map(|incident| IncidentEntry {
            today: incident.started_on(today),
            incident,
        })
        .collect()
}

/// Traffic section shown under the route summary
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrafficPanel {
    entries: Option<Vec<IncidentEntry>>,
    fetch_failed: bool,
}

impl TrafficPanel {
    pub fn entries(&self) -> Option<&[IncidentEntry]> {
        self.entries.as_deref()
    }

    pub fn fetch_failed(&self) -> bool {
        self.fetch_failed
    }

    pub fn set_entries(&mut self, entries: Vec<IncidentEntry>) {
        self.entries = Some(entries);
    }

    /// Add a failure notice below whatever is already shown
    pub fn mark_failed(&mut self) {
        self.fetch_failed = true;
    }
}

impl fmt::Display for TrafficPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entries {
            Some(entries) if entries.is_empty() => {
                writeln!(f, "No traffic incidents found in this area.")?
            }
            Some(entries) => {
                writeln!(f, "Found {} traffic incidents:", entries.len())?;
                for entry in entries {
                    write!(f, "{}", entry)?;
                }
            }
            None => {}
        }
        if self.fetch_failed {
            writeln!(f, "Failed to fetch traffic data.")?;
        }
        Ok(())
    }
}

/// Fetch incidents inside the box, list them and draw lines for today's incidents
///
/// Request failures only add a notice to the traffic panel, the route stays on screen. The
/// only error returned is a stale run token.
pub fn fetch_traffic(
    api: &dyn MapApi,
    view: &Mutex<ViewState>,
    token: &RunToken,
    bbox: &BoundingBox,
    today: NaiveDate,
) -> Result<(), Error> {
    let incidents = match api.traffic(bbox) {
        Ok(incidents) => incidents,
        Err(e) => {
            error!("Traffic error: {}", e);
            return with_view(view, token, |v| v.traffic_mut().mark_failed());
        }
    };

    if incidents.is_empty() {
        info!("no traffic incidents inside {}", bbox);
        return with_view(view, token, |v| v.traffic_mut().set_entries(Vec::new()));
    }

    let entries = partition_by_day(incidents, today);
    let lines: Vec<Polyline> = entries
        .iter()
        .filter(|e| e.is_today())
        .filter_map(|e| e.incident().overlay_line())
        .collect();
    debug!(
        "{} traffic incidents, {} reported today",
        entries.len(),
        lines.len()
    );
    with_view(view, token, |v| {
        for line in lines {
            v.add_traffic_line(line);
        }
        v.traffic_mut().set_entries(entries);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::api::testing::FakeApi;
    use crate::session::{begin_run, lock, Pipeline};
    use chrono::Duration;

    fn incident(title: &str, start_epoch: i64) -> TrafficIncident {
        TrafficIncident {
            title: title.to_string(),
            description: String::new(),
            severity: "2".to_string(),
            start_epoch,
            point: Coordinate::new(37.7, -122.4),
            to_point: None,
        }
    }

    fn bbox() -> BoundingBox {
        BoundingBox::new(37.0, -123.0, 38.0, -122.0).unwrap()
    }

    #[test]
    fn date_tokens() {
        assert_eq!(parse_date_token("/Date(1700000000000)/"), 1_700_000_000_000);
        assert_eq!(parse_date_token("\\/Date(42)\\/"), 0);
        assert_eq!(parse_date_token("x/Date(42)/y"), 42);
        assert_eq!(parse_date_token("/Date(42+0100)/"), 0);
        assert_eq!(parse_date_token("/Date()/"), 0);
        assert_eq!(parse_date_token("2024-01-01"), 0);
    }

    #[test]
    fn most_recent_first() {
        let mut incidents = vec![incident("a", 100), incident("b", 500), incident("c", 300)];
        sort_by_recency(&mut incidents);
        let epochs: Vec<i64> = incidents.iter().map(|i| i.start_epoch).collect();
        assert_eq!(epochs, vec![500, 300, 100]);
    }

    #[test]
    fn unreadable_dates_sort_last() {
        let mut incidents = vec![incident("bad", 0), incident("ok", 10)];
        sort_by_recency(&mut incidents);
        assert_eq!(incidents[1].title, "bad");
    }

    #[test]
    fn today_and_older_incidents() {
        let now = Local::now();
        let today = now.date_naive();
        let old = (now - Duration::days(3)).timestamp_millis();
        let entries = partition_by_day(
            vec![incident("old", old), incident("new", now.timestamp_millis())],
            today,
        );
        assert_eq!(entries[0].incident().title, "new");
        assert!(entries[0].is_today());
        assert!(!entries[1].is_today());
    }

    #[test]
    fn overlay_line_falls_back_to_start_point() {
        let mut i = incident("a", 0);
        let start = i.point.unwrap();
        let line = i.overlay_line().unwrap();
        assert_eq!(line.path(), &[start, start]);
        assert!(line.style().dashed);

        let end = Coordinate::new(37.8, -122.5).unwrap();
        i.to_point = Some(end);
        assert_eq!(i.overlay_line().unwrap().path(), &[start, end]);

        i.point = None;
        assert!(i.overlay_line().is_none());
    }

    #[test]
    fn incidents_without_a_point_are_listed_but_not_drawn() {
        let now = Local::now();
        let mut unplaced = incident("unplaced", now.timestamp_millis());
        unplaced.point = None;
        let mut api = FakeApi::default();
        api.traffic = vec![unplaced, incident("new", now.timestamp_millis() - 1)];
        let view = Mutex::new(ViewState::default());
        let token = begin_run(&view, Pipeline::Routing).unwrap();
        fetch_traffic(&api, &view, &token, &bbox(), now.date_naive()).unwrap();

        let state = lock(&view).unwrap();
        assert_eq!(state.traffic_lines().len(), 1);
        let rendered = state.traffic().to_string();
        assert!(rendered.starts_with("Found 2 traffic incidents:"));
        assert!(rendered.contains("[today] unplaced"));
    }

    #[test]
    fn only_todays_incidents_are_drawn() {
        let now = Local::now();
        let mut api = FakeApi::default();
        api.traffic = vec![
            incident("old", (now - Duration::days(2)).timestamp_millis()),
            incident("new", now.timestamp_millis()),
        ];
        let view = Mutex::new(ViewState::default());
        let token = begin_run(&view, Pipeline::Routing).unwrap();
        fetch_traffic(&api, &view, &token, &bbox(), now.date_naive()).unwrap();

        let state = lock(&view).unwrap();
        assert_eq!(state.traffic_lines().len(), 1);
        let rendered = state.traffic().to_string();
        assert!(rendered.starts_with("Found 2 traffic incidents:"));
        assert!(rendered.contains("[today] new"));
        assert!(!rendered.contains("[today] old"));
    }

    #[test]
    fn empty_feed_shows_message() {
        let api = FakeApi::default();
        let view = Mutex::new(ViewState::default());
        let token = begin_run(&view, Pipeline::Routing).unwrap();
        fetch_traffic(&api, &view, &token, &bbox(), Local::now().date_naive()).unwrap();
        assert_eq!(
            lock(&view).unwrap().traffic().to_string(),
            "No traffic incidents found in this area.\n"
        );
    }

    #[test]
    fn failure_appends_notice() {
        let mut api = FakeApi::default();
        api.fail_traffic = true;
        let view = Mutex::new(ViewState::default());
        let token = begin_run(&view, Pipeline::Routing).unwrap();
        assert!(fetch_traffic(&api, &view, &token, &bbox(), Local::now().date_naive()).is_ok());
        let state = lock(&view).unwrap();
        assert!(state.traffic().fetch_failed());
        assert!(state.traffic_lines().is_empty());
    }

    #[test]
    fn stale_run_does_not_draw() {
        let mut api = FakeApi::default();
        api.traffic = vec![incident("new", Local::now().timestamp_millis())];
        let view = Mutex::new(ViewState::default());
        let stale = begin_run(&view, Pipeline::Routing).unwrap();
        let _newer = begin_run(&view, Pipeline::Routing).unwrap();
        let result = fetch_traffic(&api, &view, &stale, &bbox(), Local::now().date_naive());
        assert!(matches!(result, Err(Error::StaleRun)));
        assert!(lock(&view).unwrap().traffic_lines().is_empty());
    }
}
