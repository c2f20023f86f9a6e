use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, warn};

use crate::data::{
    DisplaySeries, ParameterSet, PlotConfig, SliderValues, SpectrumPoint, MAX_ELL,
};
use crate::engine::{EngineConfig, EngineFactory, EngineHandle, SpectrumEngine};
use crate::processing::transform::transform;

/// Plot-side collaborator: one persistent drawing surface.
pub trait Renderer {
    /// Clear and redraw the line series inside the fixed frame.
    fn render(&mut self, series: &DisplaySeries, plot: &PlotConfig) -> Result<()>;

    /// Show `message` in place of the plot.
    fn report_error(&mut self, message: &str);
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render(&mut self, series: &DisplaySeries, plot: &PlotConfig) -> Result<()> {
        (**self).render(series, plot)
    }

    fn report_error(&mut self, message: &str) {
        (**self).report_error(message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Rendered {
        points: usize,
        first_peak: Option<SpectrumPoint>,
    },
    Failed {
        message: String,
    },
}

impl CycleOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, CycleOutcome::Rendered { .. })
    }
}

/// First peak search ignores the Sachs-Wolfe plateau below this height (μK²)
const PEAK_FLOOR: f64 = 2000.0;

/// Runs one recompute-and-render cycle per settled parameter change.
///
/// `&mut self` on [`UpdateController::on_parameters_changed`] is what keeps
/// cycles single-flight: a second cycle cannot start while one holds the
/// controller, so at most one [`EngineHandle`] is ever live.
pub struct UpdateController<F: EngineFactory, R: Renderer> {
    factory: F,
    renderer: R,
    plot: PlotConfig,
    l_max: usize,
    cycles: u64,
}

impl<F: EngineFactory, R: Renderer> UpdateController<F, R> {
    pub fn new(factory: F, renderer: R) -> Self {
        Self {
            factory,
            renderer,
            plot: PlotConfig::default(),
            l_max: MAX_ELL,
            cycles: 0,
        }
    }

    pub fn with_l_max(mut self, l_max: usize) -> Self {
        self.l_max = l_max;
        self
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn into_parts(self) -> (F, R) {
        (self.factory, self.renderer)
    }

    /// Build the parameter set, run the engine, transform and render.
    ///
    /// Never returns an error and never lets an engine panic escape: any
    /// failure is reported to the renderer as `Error: ...` and returned as
    /// [`CycleOutcome::Failed`]. The engine handle is released on every path.
    pub fn on_parameters_changed(&mut self, values: &SliderValues) -> CycleOutcome {
        self.cycles += 1;
        let cycle = self.cycles;
        let started = Instant::now();

        let params = ParameterSet::from_slider_values(values);
        for (field, value) in params.out_of_bounds() {
            let spec = field.spec();
            warn!(
                cycle,
                param = spec.key,
                value,
                min = spec.min,
                max = spec.max,
                "parameter outside slider range, passing it to the engine anyway"
            );
        }
        let config = EngineConfig::for_parameters(&params);
        debug!(cycle, ?params, "recompute started");

        let l_max = self.l_max;
        let factory = &mut self.factory;
        let renderer = &mut self.renderer;
        let plot = &self.plot;
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| -> Result<DisplaySeries> {
            let mut handle = EngineHandle::acquire(factory)?;
            handle.configure(&config)?;
            handle.compute()?;
            let raw = handle.lensed_cl(l_max)?;
            let series = transform(&raw);
            renderer.render(&series, plot)?;
            Ok(series)
            // handle released here, and on every `?` above
        }));

        let result = match attempt {
            Ok(result) => result.map_err(|e| format!("Error: {e:#}")),
            Err(payload) => Err(format!("Error: engine panicked: {}", panic_message(&payload))),
        };

        match result {
            Ok(series) => {
                let first_peak = series.first_peak_above(PEAK_FLOOR);
                debug!(
                    cycle,
                    points = series.len(),
                    peak_ell = first_peak.map(|p| p.ell),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "recompute finished"
                );
                CycleOutcome::Rendered {
                    points: series.len(),
                    first_peak,
                }
            }
            Err(message) => {
                warn!(cycle, %message, "recompute failed");
                self.renderer.report_error(&message);
                CycleOutcome::Failed { message }
            }
        }
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
