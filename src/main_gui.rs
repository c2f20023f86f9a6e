use std::cell::RefCell;
use std::rc::Rc;

use fltk::{app, prelude::*};
use tracing::{info, warn};

use cmb_explorer::logging;
use cmb_explorer::rendering::SpectrumPlot;
use cmb_explorer::settings::Settings;
use cmb_explorer::ui::callbacks::{self, AppState};
use cmb_explorer::ui::{layout, theme};

fn main() {
    if let Err(e) = logging::init_logging(logging::DEFAULT_LEVEL) {
        eprintln!("{e:#}");
    }

    let app = app::App::default();

    // Apply dark theme
    theme::apply_dark_theme();
    app::set_visual(fltk::enums::Mode::Rgb8).ok();

    let settings_path = Settings::default_path();
    let settings = Settings::load_or_create(&settings_path);
    theme::set_tooltips_enabled(settings.show_tooltips);

    let backend = settings.backend();
    info!(engine = backend.name(), path = %settings_path.display(), "starting explorer");

    let (mut win, mut widgets) = layout::build_ui(&settings, backend.name());
    let plot = SpectrumPlot::new(widgets.plot.clone());
    let initial = settings.slider_values();

    let state = Rc::new(RefCell::new(AppState::new(settings, settings_path, plot)));

    callbacks::setup_slider_callbacks(&widgets, &state);
    callbacks::setup_button_callbacks(&widgets, &state);
    callbacks::start_settle_poll(&widgets, &state);

    win.show();

    // First frame with the starting parameters
    callbacks::run_cycle(&state, &initial, &mut widgets.status_bar);

    if let Err(e) = app.run() {
        warn!("event loop ended with error: {e}");
    }
}
