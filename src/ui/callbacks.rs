use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use fltk::{app, dialog, enums::Event, frame::Frame, prelude::*};
use tracing::{info, warn};

use crate::data::SliderValues;
use crate::engine::Backend;
use crate::processing::{CycleOutcome, SettleGate, UpdateController};
use crate::rendering::{export_series_csv, SpectrumPlot};
use crate::settings::Settings;
use crate::ui::layout::{ParamSlider, Widgets};
use crate::ui::theme;

/// How often the settle gate is polled (seconds)
const SETTLE_POLL_SECS: f64 = 0.03;

// ─── App State ─────────────────────────────────────────────────────────────────

pub struct AppState {
    pub controller: UpdateController<Backend, SpectrumPlot>,
    pub gate: SettleGate<SliderValues>,
    /// Slider positions as last reported, settled or not
    pub values: SliderValues,
    pub settings: Settings,
    pub settings_path: PathBuf,
}

impl AppState {
    pub fn new(settings: Settings, settings_path: PathBuf, plot: SpectrumPlot) -> Self {
        let controller = UpdateController::new(settings.backend(), plot);
        Self {
            controller,
            gate: SettleGate::from_millis(settings.settle_ms),
            values: settings.slider_values(),
            settings,
            settings_path,
        }
    }
}

fn status_text(outcome: &CycleOutcome) -> String {
    match outcome {
        CycleOutcome::Rendered { points, first_peak: Some(p) } => format!(
            "{} multipoles | first peak at l = {} ({:.0} uK^2)",
            points, p.ell, p.d_ell
        ),
        CycleOutcome::Rendered { points, first_peak: None } => {
            format!("{} multipoles | no acoustic peak in range", points)
        }
        CycleOutcome::Failed { message } => message.clone(),
    }
}

/// Recompute for `values` and report the outcome in the status bar.
pub fn run_cycle(state: &Rc<RefCell<AppState>>, values: &SliderValues, status_bar: &mut Frame) {
    let outcome = {
        let mut st = state.borrow_mut();
        st.values = *values;
        st.controller.on_parameters_changed(values)
    };
    let color = if outcome.is_rendered() {
        theme::ACCENT_GREEN
    } else {
        theme::ACCENT_RED
    };
    status_bar.set_label_color(theme::color(color));
    status_bar.set_label(&status_text(&outcome));
}

// ═══════════════════════════════════════════════════════════════════════════
//  SLIDER CALLBACKS
// ═══════════════════════════════════════════════════════════════════════════

pub fn setup_slider_callbacks(widgets: &Widgets, state: &Rc<RefCell<AppState>>) {
    for ps in &widgets.sliders {
        let field = ps.field;

        // Value changes feed the gate; nothing is computed here
        {
            let state = state.clone();
            let mut value_label = ps.value_label.clone();

            let mut slider = ps.slider.clone();
            slider.set_callback(move |s| {
                let spec = field.spec();
                let v = spec.snap(s.value());
                value_label.set_label(&spec.format_value(v));

                let mut st = state.borrow_mut();
                st.values.set(field, v);
                let values = st.values;
                st.gate.note_change(values, Instant::now());
            });
        }

        // Press starts a drag, letting go of the knob ends it
        {
            let state = state.clone();

            let mut slider = ps.slider.clone();
            slider.handle(move |_, ev| {
                if let Ok(mut st) = state.try_borrow_mut() {
                    match ev {
                        Event::Push => st.gate.note_press(),
                        Event::Released => st.gate.note_release(),
                        _ => {}
                    }
                }
                false
            });
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  BUTTON CALLBACKS
// ═══════════════════════════════════════════════════════════════════════════

fn jump_to(
    values: SliderValues,
    sliders: &mut [ParamSlider],
    state: &Rc<RefCell<AppState>>,
    status_bar: &mut Frame,
) {
    for ps in sliders.iter_mut() {
        ps.show_value(values.get(ps.field));
    }
    state.borrow_mut().gate.clear();
    run_cycle(state, &values, status_bar);
}

pub fn setup_button_callbacks(widgets: &Widgets, state: &Rc<RefCell<AppState>>) {
    // Reset
    {
        let state = state.clone();
        let mut sliders = widgets.sliders.clone();
        let mut status_bar = widgets.status_bar.clone();

        let mut btn_reset = widgets.btn_reset.clone();
        btn_reset.set_callback(move |_| {
            jump_to(SliderValues::default(), &mut sliders, &state, &mut status_bar);
        });
    }

    // Randomize
    {
        let state = state.clone();
        let mut sliders = widgets.sliders.clone();
        let mut status_bar = widgets.status_bar.clone();

        let mut btn_randomize = widgets.btn_randomize.clone();
        btn_randomize.set_callback(move |_| {
            let values = SliderValues::random_within_bounds(&mut rand::rng());
            info!(?values, "randomized parameters");
            jump_to(values, &mut sliders, &state, &mut status_bar);
        });
    }

    // Save spectrum CSV
    {
        let state = state.clone();
        let mut status_bar = widgets.status_bar.clone();

        let mut btn_save_csv = widgets.btn_save_csv.clone();
        btn_save_csv.set_callback(move |_| {
            let Some(series) = state.borrow().controller.renderer().last_series() else {
                dialog::alert_default("No spectrum to save!");
                return;
            };

            let mut chooser =
                dialog::NativeFileChooser::new(dialog::NativeFileChooserType::BrowseSaveFile);
            chooser.set_filter("*.csv");
            chooser.set_preset_file("cmb_spectrum.csv");
            chooser.show();

            let filename = chooser.filename();
            if filename.as_os_str().is_empty() {
                return;
            }

            match export_series_csv(&series, &filename) {
                Ok(()) => {
                    status_bar.set_label(&format!(
                        "Spectrum saved ({} rows) to {}",
                        series.len(),
                        filename.display()
                    ));
                }
                Err(e) => {
                    warn!("{:#}", e);
                    dialog::alert_default(&format!("Error saving CSV:\n{:#}", e));
                }
            }
        });
    }

    // Save As Default
    {
        let state = state.clone();
        let mut status_bar = widgets.status_bar.clone();

        let mut btn_save_defaults = widgets.btn_save_defaults.clone();
        btn_save_defaults.set_callback(move |_| {
            let mut st = state.borrow_mut();
            let values = st.values;
            st.settings.set_slider_values(&values);
            match st.settings.save(&st.settings_path) {
                Ok(()) => status_bar.set_label(&format!(
                    "Defaults saved to {}",
                    st.settings_path.display()
                )),
                Err(e) => dialog::alert_default(&format!("{:#}", e)),
            }
        });
    }

    // Tooltips toggle
    {
        let state = state.clone();

        let mut check_tooltips = widgets.check_tooltips.clone();
        check_tooltips.set_callback(move |c| {
            let enabled = c.is_checked();
            theme::set_tooltips_enabled(enabled);
            state.borrow_mut().settings.show_tooltips = enabled;
        });
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  SETTLE POLL
// ═══════════════════════════════════════════════════════════════════════════

/// Timer that turns settled slider values into recompute cycles.
pub fn start_settle_poll(widgets: &Widgets, state: &Rc<RefCell<AppState>>) {
    let state = state.clone();
    let mut status_bar = widgets.status_bar.clone();

    app::add_timeout3(SETTLE_POLL_SECS, move |handle| {
        let settled = match state.try_borrow_mut() {
            Ok(mut st) => st.gate.poll(Instant::now()),
            Err(_) => None,
        };
        if let Some(values) = settled {
            run_cycle(&state, &values, &mut status_bar);
        }
        app::repeat_timeout3(SETTLE_POLL_SECS, handle);
    });
}
