pub mod params;
pub mod plot_config;
pub mod spectrum;

pub use params::{ParamField, ParamSpec, ParameterSet, SliderValues, AMPLITUDE_SCALE};
pub use plot_config::{PlotConfig, MAX_ELL};
pub use spectrum::{DisplaySeries, RawSpectrum, SpectrumPoint};
