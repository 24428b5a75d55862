//! Store application configuration that gets read from disk
use crate::places::FetchStrategy;
use crate::services::{
    new_map_api_handler, new_plotting_visualization_handler, new_route_visualization_handler,
    DataPlottingService, MapApi, RouteDrawingService,
};
use crate::Error;
use log::debug;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;
use simplelog::LevelFilter;
use std::collections::HashMap;
use std::fs::File;
use std::io::prelude::*;
use std::iter::Iterator;
use std::path::{Path, PathBuf};
use std::str::FromStr;

static CONFIG_DIR_NAME: &str = "mapdash";
static CONFIG_FILE_NAME: &str = "config.yml";

/// Default location of the config file, e.g. ~/.config/mapdash/config.yml
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Defines the allowed keys under the services map
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    DataPlotting,
    MapApi,
    RouteVisualization,
}

/// Type alias for clarity
pub type ServiceParameters = HashMap<String, Value>;

/// Configuration options for a single service of any type
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    handler: String,
    #[serde(default)]
    configuration: ServiceParameters,
}

impl ServiceConfig {
    pub fn new(handler: String, configuration: ServiceParameters) -> Self {
        ServiceConfig {
            handler,
            configuration,
        }
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn parameters(&self) -> impl Iterator<Item = &String> + '_ {
        self.configuration.keys()
    }

    pub fn get_parameter(&self, key: &str) -> Option<&Value> {
        self.configuration.get(key)
    }

    pub fn get_parameter_as_string(&self, key: &str) -> Option<Result<String, Error>> {
        self.configuration.get(key).map(|value| {
            value
                .as_str()
                .map(|v| v.to_string())
                .ok_or_else(|| self.invalid_value(key, "a string", value))
        })
    }

    pub fn get_parameter_as_i64(&self, key: &str) -> Option<Result<i64, Error>> {
        self.configuration.get(key).map(|value| {
            value
                .as_i64()
                .ok_or_else(|| self.invalid_value(key, "an integer", value))
        })
    }

    pub fn get_parameter_as_f64(&self, key: &str) -> Option<Result<f64, Error>> {
        self.configuration.get(key).map(|value| {
            value
                .as_f64()
                .ok_or_else(|| self.invalid_value(key, "a floating point value", value))
        })
    }

    pub fn get_parameter_as_bool(&self, key: &str) -> Option<Result<bool, Error>> {
        self.configuration.get(key).map(|value| {
            value
                .as_bool()
                .ok_or_else(|| self.invalid_value(key, "a boolean", value))
        })
    }

    fn invalid_value(&self, key: &str, expected: &str, value: &Value) -> Error {
        Error::InvalidConfigurationValue(format!(
            "invalid value for {}.{}, expected {}: {:?}",
            &self.handler, key, expected, value
        ))
    }
}

/// Build a service instance from its configuration entry
pub trait FromServiceConfig: Sized {
    fn from_config(config: &ServiceConfig) -> Result<Self, Error>;
}

/// Configuration struct that we can create from the config file used
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(
        deserialize_with = "deserialize_level_filter",
        serialize_with = "serialize_level_filter",
        default = "default_level_filter"
    )]
    log_level: LevelFilter,
    /// number of weather requests allowed in flight, 1 fetches sequentially
    #[serde(default = "default_weather_concurrency")]
    weather_concurrency: usize,
    #[serde(default)]
    services: HashMap<ServiceType, ServiceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: default_level_filter(),
            weather_concurrency: default_weather_concurrency(),
            services: HashMap::new(),
        }
    }
}

impl Config {
    pub fn load<T: Read>(source: &mut T) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_reader(source)
    }

    /// Read the config file, a missing default file falls back to built in values
    pub fn from_path(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(path) => {
                let mut fp = File::open(path)?;
                Ok(Config::load(&mut fp)?)
            }
            None => match default_config_path() {
                Some(path) if path.exists() => {
                    let mut fp = File::open(&path)?;
                    Ok(Config::load(&mut fp)?)
                }
                _ => {
                    debug!("no config file found, using defaults");
                    Ok(Config::default())
                }
            },
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn fetch_strategy(&self) -> FetchStrategy {
        FetchStrategy::from_concurrency(self.weather_concurrency)
    }

    pub fn get_map_api_handler(&self) -> Result<Box<dyn MapApi>, Error> {
        match self.services.get(&ServiceType::MapApi) {
            Some(cfg) => new_map_api_handler(cfg),
            // the public SierraMaps host is always available
            None => new_map_api_handler(&ServiceConfig::new(
                "sierra_maps".to_string(),
                HashMap::new(),
            )),
        }
    }

    pub fn get_route_visualization_handler(&self) -> Result<Box<dyn RouteDrawingService>, Error> {
        match self.services.get(&ServiceType::RouteVisualization) {
            Some(cfg) => new_route_visualization_handler(cfg),
            None => Err(Error::UnknownServiceHandler(
                "no service configuration defined for route visualization".to_string(),
            )),
        }
    }

    pub fn get_plotting_visualization_handler(
        &self,
    ) -> Result<Box<dyn DataPlottingService>, Error> {
        match self.services.get(&ServiceType::DataPlotting) {
            Some(cfg) => new_plotting_visualization_handler(cfg),
            None => {
                // use terminal as default plotter since we always have that
                new_plotting_visualization_handler(&ServiceConfig::new(
                    "tui".to_string(),
                    HashMap::new(),
                ))
            }
        }
    }
}

fn deserialize_level_filter<'de, D>(deserializer: D) -> Result<LevelFilter, D::Error>
where
    D: Deserializer<'de>,
{
    let buf = String::deserialize(deserializer)?;
    LevelFilter::from_str(&buf)
        .map_err(|_| serde::de::Error::custom(format!("invalid level value: {}", buf)))
}

fn serialize_level_filter<S>(level: &LevelFilter, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&level.to_string())
}

fn default_level_filter() -> LevelFilter {
    LevelFilter::Info
}

fn default_weather_concurrency() -> usize {
    1
}
