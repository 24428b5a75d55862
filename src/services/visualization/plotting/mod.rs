//! Plot elevation profiles and other x/y data using a plotting backend
use crate::config::{FromServiceConfig, ServiceConfig};
use crate::Error;
mod tui;
pub use self::tui::TerminalPlotter;

/// Maximum number of tick labels drawn along an axis
const MAX_TICKS: usize = 6;

/// A vector of (x, y) coordinate pairs and a name
#[derive(Debug)]
pub struct DataSeries<'a> {
    name: &'a str,
    data: &'a [(f64, f64)],
}

impl<'a> DataSeries<'a> {
    pub fn new(name: &'a str, data: &'a [(f64, f64)]) -> Self {
        DataSeries { name, data }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn data(&self) -> &'a [(f64, f64)] {
        self.data
    }
}

/// Defines the labels, bounds and data of a single plot
#[derive(Debug)]
pub struct Plot<'a> {
    title: String,
    x_axis: String,
    y_axis: String,
    /// Fixed y-axis range, computed from the data when unset
    pub y_bounds: Option<[f64; 2]>,
    /// Labels placed along the x axis, numeric ticks are used when empty
    pub x_labels: Vec<String>,
    series: Vec<DataSeries<'a>>,
}

impl<'a> Plot<'a> {
    pub fn new(title: String, x_axis: String, y_axis: String) -> Self {
        Plot {
            series: Vec::new(),
            y_bounds: None,
            x_labels: Vec::new(),
            x_axis,
            y_axis,
            title,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn x(&self) -> &str {
        &self.x_axis
    }

    pub fn y(&self) -> &str {
        &self.y_axis
    }

    pub fn series(&self) -> &[DataSeries<'a>] {
        &self.series
    }

    pub fn add_series(&mut self, data: DataSeries<'a>) {
        self.series.push(data);
    }

    fn points(&self) -> impl Iterator<Item = &(f64, f64)> + '_ {
        self.series.iter().flat_map(|s| s.data().iter())
    }

    /// Range of x values across every series
    pub fn x_bounds(&self) -> [f64; 2] {
        min_max(self.points().map(|(x, _)| *x))
    }

    /// Explicit y bounds if set, otherwise the range of y values across every series
    pub fn y_bounds(&self) -> [f64; 2] {
        self.y_bounds
            .unwrap_or_else(|| min_max(self.points().map(|(_, y)| *y)))
    }

    /// Evenly spaced subset of the x labels, or numeric ticks when no labels were given
    pub fn xticks(&self) -> Vec<String> {
        if self.x_labels.is_empty() {
            return numeric_ticks(self.x_bounds(), MAX_TICKS);
        }
        let n = self.x_labels.len();
        if n <= MAX_TICKS {
            return self.x_labels.clone();
        }
        (0..MAX_TICKS)
            .map(|i| self.x_labels[i * (n - 1) / (MAX_TICKS - 1)].clone())
            .collect()
    }

    pub fn yticks(&self, count: usize) -> Vec<String> {
        numeric_ticks(self.y_bounds(), count)
    }
}

fn min_max<I: Iterator<Item = f64>>(values: I) -> [f64; 2] {
    let bounds = values.fold(None, |acc: Option<[f64; 2]>, v| match acc {
        Some([lo, hi]) => Some([lo.min(v), hi.max(v)]),
        None => Some([v, v]),
    });
    match bounds {
        Some([lo, hi]) if hi > lo => [lo, hi],
        Some([lo, _]) => [lo, lo + 1.0],
        None => [0.0, 1.0],
    }
}

fn numeric_ticks(bounds: [f64; 2], count: usize) -> Vec<String> {
    let count = count.max(2);
    let [lo, hi] = bounds;
    (0..count)
        .map(|n| format!("{:.1}", lo + (hi - lo) * n as f64 / (count - 1) as f64))
        .collect()
}

/// trait that defines how to plot a set of data series
pub trait DataPlottingService {
    /// Draw a plot of data to display to the user
    fn plot(&self, plots: &[&Plot]) -> Result<Vec<u8>, Box<dyn std::error::Error>>;
}

pub fn new_plotting_visualization_handler(
    config: &ServiceConfig,
) -> Result<Box<dyn DataPlottingService>, Error> {
    match config.handler() {
        "tui" => Ok(Box::new(TerminalPlotter::from_config(config)?)),
        _ => Err(Error::UnknownServiceHandler(format!(
            "no plotting visualization handler exists for: {}",
            config.handler()
        ))),
    }
}
