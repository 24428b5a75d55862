//! Turn pipeline results into charts and map images
pub mod plotting;
pub mod route;
