pub mod csv_sink;
pub mod plot_geometry;
#[cfg(feature = "gui")]
pub mod spectrum_plot;

pub use csv_sink::{export_series_csv, CsvRenderer};
pub use plot_geometry::{nice_ticks, PlotArea, PlotFrame, Segment};
#[cfg(feature = "gui")]
pub use spectrum_plot::SpectrumPlot;
