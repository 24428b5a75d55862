//! Service module that exports interfaces to external applications, APIs, etc.

pub mod api;
pub mod visualization;

// rexport some traits and utilty functions
pub use api::{new_map_api_handler, MapApi};
pub use visualization::plotting::{
    new_plotting_visualization_handler, DataPlottingService, DataSeries, Plot,
};
pub use visualization::route::{new_route_visualization_handler, RouteDrawingService};
