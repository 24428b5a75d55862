//! Use the tui crate to draw plots directly on the terminal
use super::{DataPlottingService, Plot};
use mapdash_derive::FromServiceConfig;
use std::cmp::max;
use std::io;
use tui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Terminal,
};

/// Draws charts into the current terminal screen
#[derive(Debug, Default, FromServiceConfig)]
pub struct TerminalPlotter {}

impl DataPlottingService for TerminalPlotter {
    fn plot(&self, plots: &[&Plot]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        if plots.is_empty() {
            return Ok(Vec::new());
        }
        let stdout = io::stdout();
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        terminal.clear()?;
        terminal.draw(|f| {
            let constraints = vec![Constraint::Ratio(1, plots.len() as u32); plots.len()];
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints(constraints)
                .split(f.size());
            let y_nticks = max(2, 7 - plots.len().min(5)); // reduce ticks if less vertical space
            for (chunk, plot) in chunks.into_iter().zip(plots) {
                let datasets = plot
                    .series()
                    .iter()
                    .map(|s| {
                        Dataset::default()
                            .name(s.name())
                            .marker(symbols::Marker::Braille)
                            .graph_type(GraphType::Line)
                            .style(Style::default().fg(Color::Green))
                            .data(s.data())
                    })
                    .collect();
                let chart = Chart::new(datasets)
                    .block(Block::default().title(plot.title()).borders(Borders::ALL))
                    .x_axis(
                        Axis::default()
                            .title(Span::styled(plot.x(), Style::default().fg(Color::Red)))
                            .style(Style::default().fg(Color::White))
                            .bounds(plot.x_bounds())
                            .labels(plot.xticks().into_iter().map(Span::from).collect()),
                    )
                    .y_axis(
                        Axis::default()
                            .title(Span::styled(plot.y(), Style::default().fg(Color::Red)))
                            .style(Style::default().fg(Color::White))
                            .bounds(plot.y_bounds())
                            .labels(plot.yticks(y_nticks).into_iter().map(Span::from).collect()),
                    );
                f.render_widget(chart, chunk);
            }
        })?;

        // we plot to the terminal so there isn't anything to return
        Ok(Vec::new())
    }
}
