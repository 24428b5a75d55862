//! Render a route and its overlays to a static map image
use crate::config::{FromServiceConfig, ServiceConfig};
use crate::session::{Marker, Polyline};
use crate::Error;
mod mapbox;
pub use mapbox::MapBox;

/// trait that defines how to turn route overlays into a map image
pub trait RouteDrawingService {
    /// Draw the route line with extra overlay lines and markers on top, returns image data
    fn draw_route(
        &self,
        route: &Polyline,
        overlays: &[Polyline],
        markers: &[Marker],
    ) -> Result<Vec<u8>, Box<dyn std::error::Error>>;
}

pub fn new_route_visualization_handler(
    config: &ServiceConfig,
) -> Result<Box<dyn RouteDrawingService>, Error> {
    match config.handler() {
        "mapbox" => Ok(Box::new(MapBox::from_config(config)?)),
        _ => Err(Error::UnknownServiceHandler(format!(
            "no route visualization handler exists for: {}",
            config.handler()
        ))),
    }
}
