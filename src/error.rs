//! Defines the general error type for the crate and various conversions into it
use std::convert;
use std::fmt;

/// General error type for the crate
#[derive(Debug)]
pub enum Error {
    /// user input was missing or malformed, no request was attempted
    InvalidInput(String),
    /// places lookup requested without a drawn bounding box
    MissingBoundingBox,
    /// bounding box crosses the antimeridian or is inverted
    UnsupportedBoundingBox(String),
    /// one or more locations could not be resolved to a coordinate
    LocationNotFound(String),
    RouteNotFound,
    ElevationNotFound,
    /// a newer run of the same pipeline superseded this one
    StaleRun,
    InvalidConfigurationValue(String),
    UnknownServiceHandler(String),
    RequestError(reqwest::StatusCode, String),
    Io(std::io::Error),
    Json(serde_json::Error),
    Reqwest(reqwest::Error),
    Yaml(serde_yaml::Error),
    Other(String),
}

impl Error {
    /// True for errors caused by user input, reported before any network request
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::MissingBoundingBox | Error::UnsupportedBoundingBox(_)
        )
    }

    /// True when a well formed request came back without usable data
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::LocationNotFound(_) | Error::RouteNotFound | Error::ElevationNotFound
        )
    }
}

impl convert::From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl convert::From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Error {
        Error::Reqwest(err)
    }
}

impl convert::From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Json(err)
    }
}

impl convert::From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Error {
        Error::Yaml(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidInput(msg) => write!(f, "{}", msg),
            Error::MissingBoundingBox => write!(f, "Draw a bounding box on the map first."),
            Error::UnsupportedBoundingBox(msg) => {
                write!(f, "Unsupported bounding box: {}", msg)
            }
            Error::LocationNotFound(input) => write!(f, "Location not found: {}", input),
            Error::RouteNotFound => write!(f, "Route not found."),
            Error::ElevationNotFound => write!(f, "Elevation data not found."),
            Error::StaleRun => write!(f, "A newer request replaced this one"),
            Error::InvalidConfigurationValue(msg) => write!(f, "{}", msg),
            Error::UnknownServiceHandler(msg) => write!(f, "{}", msg),
            Error::RequestError(code, msg) => {
                write!(f, "Request failed with code: {} - {}", code, msg)
            }
            Error::Io(e) => write!(f, "{}", e),
            Error::Json(e) => write!(f, "{}", e),
            Error::Reqwest(e) => write!(f, "{}", e),
            Error::Yaml(e) => write!(f, "{}", e),
            Error::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}
