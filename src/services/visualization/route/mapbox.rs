//! Use the MapBox static images API to draw a route with its incident lines and markers
use super::RouteDrawingService;
use crate::gps::encode_coordinates;
use crate::session::{Marker, Polyline};
use crate::Error;
use log::{debug, warn};
use mapdash_derive::FromServiceConfig;
use reqwest::blocking::Client;

/// MapBox rejects request URLs longer than this many bytes
const MAX_URL_LENGTH: usize = 8192;

/// Defines parameters to interact with the MapBox API
#[derive(Debug, FromServiceConfig)]
pub struct MapBox {
    base_url: String,
    api_version: String,
    username: String,
    style: String,
    image_width: u32,
    image_height: u32,
    marker_color: String,
    marker_style: String,
    stroke_opacity: f32,
    access_token: String,
}

impl MapBox {
    /// Map the named overlay colors onto hex values MapBox understands
    fn hex_color(name: &str) -> &str {
        match name {
            "blue" => "3b82f6",
            "green" => "22c55e",
            "red" => "ef4444",
            other => other,
        }
    }

    fn path_overlay(&self, line: &Polyline) -> Result<String, Error> {
        // the encoded polyline has to be url encoded on its own, it may contain '?' or '@'
        let encoded: String =
            form_urlencoded::byte_serialize(encode_coordinates(line.path())?.as_bytes()).collect();
        let style = line.style();
        Ok(format!(
            "path-{}+{}-{}({})",
            style.weight,
            Self::hex_color(style.color),
            self.stroke_opacity,
            encoded
        ))
    }

    fn marker_overlay(&self, marker: &Marker) -> String {
        // pin labels are limited to a single alphanumeric character
        let label = marker
            .label()
            .chars()
            .find(|c| c.is_ascii_alphanumeric())
            .map(|c| format!("-{}", c.to_ascii_lowercase()))
            .unwrap_or_default();
        format!(
            "pin-{}{}+{}({},{})",
            self.marker_style,
            label,
            self.marker_color,
            marker.longitude(),
            marker.latitude()
        )
    }

    fn request_url(
        &self,
        route: &Polyline,
        overlays: &[Polyline],
        markers: &[Marker],
    ) -> Result<String, Error> {
        let mut layers = vec![self.path_overlay(route)?];
        for line in overlays {
            layers.push(self.path_overlay(line)?);
        }
        layers.extend(markers.iter().map(|m| self.marker_overlay(m)));
        let url = format!(
            "{}/styles/{}/{}/{}/static/{}/auto/{}x{}",
            self.base_url,
            self.api_version,
            self.username,
            self.style,
            layers.join(","),
            self.image_width,
            self.image_height,
        );

        // the access_token=[..] part in the query takes up around 100 bytes by itself
        if url.len() > MAX_URL_LENGTH {
            warn!(
                "URL length exceeds 8KB due to a long route, request may fail (size={:.2}KB).",
                url.len() as f32 / 1024.0
            );
        }
        Ok(url)
    }
}

impl Default for MapBox {
    fn default() -> Self {
        MapBox {
            base_url: "https://api.mapbox.com".to_string(),
            api_version: "v1".to_string(),
            username: "mapbox".to_string(),
            style: "streets-v11".to_string(),
            image_width: 1280,
            image_height: 1280,
            marker_color: "f07272".to_string(),
            marker_style: "l".to_string(),
            stroke_opacity: 0.75,
            access_token: String::new(),
        }
    }
}

impl RouteDrawingService for MapBox {
    fn draw_route(
        &self,
        route: &Polyline,
        overlays: &[Polyline],
        markers: &[Marker],
    ) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let request_url = self.request_url(route, overlays, markers)?;
        debug!(
            "requesting route image with {} overlays and {} markers",
            overlays.len(),
            markers.len()
        );
        let client = Client::new();
        let resp = client
            .get(&request_url)
            .query(&[("access_token", &self.access_token)])
            .send()?;
        if resp.status().is_success() {
            // return image data
            Ok(resp.bytes()?.to_vec())
        } else {
            let code = resp.status();
            Err(Box::new(Error::RequestError(
                code,
                "MapBox drawing failed".to_string(),
            )))
        }
    }
}
