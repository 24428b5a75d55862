//! Resolve free text or literal "lat,lng" input into a coordinate
use crate::gps::Coordinate;
use crate::services::MapApi;
use log::{debug, error, warn};

/// Parse input of the form "number, number" as a latitude/longitude pair
///
/// Returns `None` when the text isn't two comma separated finite numbers. Two numbers that are
/// out of range are still recognised as a literal, the inner `None` marks them invalid.
pub fn parse_literal(input: &str) -> Option<Option<Coordinate>> {
    let mut parts = input.split(',');
    let (lat, lng) = match (parts.next(), parts.next(), parts.next()) {
        (Some(lat), Some(lng), None) => (lat.trim(), lng.trim()),
        _ => return None,
    };
    let lat = lat.parse::<f64>().ok().filter(|v| v.is_finite())?;
    let lng = lng.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(Coordinate::new(lat, lng))
}

/// Turn user input into a coordinate, `None` means "not found"
///
/// Literal coordinates never touch the network. Lookup failures are logged and reported as
/// not found, the caller decides how to tell the user.
pub fn resolve(api: &dyn MapApi, input: &str) -> Option<Coordinate> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Some(literal) = parse_literal(input) {
        if literal.is_none() {
            warn!("coordinates out of range: {}", input);
        }
        return literal;
    }

    match api.geocode(input) {
        Ok(Some(loc)) => {
            debug!("resolved '{}' to {}", input, loc);
            Some(loc)
        }
        Ok(None) => {
            debug!("no geocoding result for '{}'", input);
            None
        }
        Err(e) => {
            error!("Geocoding error: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::api::testing::{Call, FakeApi};

    #[test]
    fn literal_coordinates_skip_the_network() {
        let api = FakeApi::default();
        let loc = resolve(&api, "37.7749, -122.4194").unwrap();
        assert_eq!(loc.latitude(), 37.7749);
        assert_eq!(loc.longitude(), -122.4194);
        assert!(api.calls().is_empty());
    }

    #[test]
    fn out_of_range_literal_is_not_found() {
        let api = FakeApi::default();
        assert!(resolve(&api, "123.0,10").is_none());
        assert!(api.calls().is_empty());
    }

    #[test]
    fn text_goes_through_geocoding() {
        let mut api = FakeApi::default();
        let oakland = Coordinate::new(37.80, -122.27).unwrap();
        api.geocode.insert("Oakland, CA".to_string(), oakland);
        // a comma alone does not make a literal pair
        assert_eq!(resolve(&api, "Oakland, CA"), Some(oakland));
        assert!(resolve(&api, "Atlantis").is_none());
        assert_eq!(
            api.calls(),
            vec![
                Call::Geocode("Oakland, CA".to_string()),
                Call::Geocode("Atlantis".to_string())
            ]
        );
    }

    #[test]
    fn literal_parsing_rules() {
        assert!(parse_literal("1,2,3").is_none());
        assert!(parse_literal("north, 2").is_none());
        assert!(parse_literal("12").is_none());
        assert!(parse_literal("inf, 3").is_none());
        assert!(parse_literal("NaN,1").is_none());
        assert!(parse_literal("1, -infinity").is_none());
        assert_eq!(
            parse_literal(" -33.9 ,18.4 "),
            Some(Coordinate::new(-33.9, 18.4))
        );
    }

    #[test]
    fn non_finite_words_are_geocoded() {
        let api = FakeApi::default();
        assert!(resolve(&api, "inf, 3").is_none());
        assert_eq!(api.calls(), vec![Call::Geocode("inf, 3".to_string())]);
    }

    #[test]
    fn blank_input_is_not_found() {
        let api = FakeApi::default();
        assert!(resolve(&api, "   ").is_none());
        assert!(api.calls().is_empty());
    }
}
