//! Route planning, traffic, elevation profiles and nearby places on a shared map view
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod elevation;
mod error;
pub mod geocode;
pub mod gps;
pub mod places;
pub mod routing;
pub mod services;
pub mod session;
pub mod traffic;

pub use error::Error;
pub use gps::{BoundingBox, Coordinate};
