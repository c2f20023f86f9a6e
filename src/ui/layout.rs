use fltk::{
    button::{Button, CheckButton},
    enums::{Align, FrameType},
    frame::Frame,
    group::Flex,
    prelude::*,
    valuator::HorNiceSlider,
    widget::Widget,
    window::Window,
};

use crate::data::ParamField;
use crate::settings::Settings;
use crate::ui::theme;

// ─── Window Layout Constants ────────────────────────────────────────────────────
const STATUS_H: i32 = 25;
const SIDEBAR_W: i32 = 260;
const MIN_W: i32 = 640;
const MIN_H: i32 = 420;

// ─── Widgets struct ─────────────────────────────────────────────────────────────
// Holds cloneable handles to every widget that callbacks need to access.

#[derive(Clone)]
pub struct ParamSlider {
    pub field: ParamField,
    pub slider: HorNiceSlider,
    pub value_label: Frame,
}

impl ParamSlider {
    /// Move the knob and readout without firing the slider callback.
    pub fn show_value(&mut self, value: f64) {
        self.slider.set_value(value);
        self.value_label.set_label(&self.field.spec().format_value(value));
    }
}

pub struct Widgets {
    pub sliders: Vec<ParamSlider>,
    pub plot: Widget,
    pub btn_reset: Button,
    pub btn_randomize: Button,
    pub btn_save_csv: Button,
    pub btn_save_defaults: Button,
    pub check_tooltips: CheckButton,
    pub status_bar: Frame,
}

fn sidebar_button(label: &str, tip: &str) -> Button {
    let mut btn = Button::default().with_label(label);
    btn.set_color(theme::color(theme::BG_WIDGET));
    btn.set_label_color(theme::color(theme::TEXT_PRIMARY));
    btn.set_tooltip(tip);
    btn
}

fn section_header(text: &str) -> Frame {
    let mut lbl = Frame::default().with_label(text);
    lbl.set_label_color(theme::section_header_color());
    lbl.set_label_size(11);
    lbl.set_align(Align::Inside | Align::Left);
    lbl
}

fn slider_tooltip(field: ParamField) -> &'static str {
    match field {
        ParamField::H => "Reduced Hubble constant, H0 / (100 km/s/Mpc).\nMoves the peaks sideways.",
        ParamField::OmegaB => "Physical baryon density omega_b = Omega_b h^2.\nRaises odd peaks over even ones.",
        ParamField::OmegaCdm => "Physical cold dark matter density omega_cdm = Omega_c h^2.\nLowers the peak heights.",
        ParamField::NS => "Scalar spectral index.\nTilts the spectrum around l ~ 550.",
        ParamField::AS1e9 => "Primordial amplitude, shown times 1e9.\nScales the whole curve.",
    }
}

// ─── Build UI ───────────────────────────────────────────────────────────────────

pub fn build_ui(settings: &Settings, engine_name: &str) -> (Window, Widgets) {
    let win_w = settings.window_width.max(MIN_W);
    let win_h = settings.window_height.max(MIN_H);
    let mut win = Window::new(50, 50, win_w, win_h, "CMB Power Spectrum Explorer");
    win.make_resizable(true);
    win.set_color(theme::color(theme::BG_DARK));

    let mut root = Flex::default()
        .with_pos(0, 0)
        .with_size(win_w, win_h - STATUS_H)
        .row();

    // ─── LEFT PANEL (Controls) ─────────────────────────────────────────────────

    let mut left = Flex::default().column();
    left.set_margin(8);
    left.set_pad(3);
    left.set_frame(FrameType::FlatBox);
    left.set_color(theme::color(theme::BG_PANEL));
    root.fixed(&left, SIDEBAR_W);

    let mut title = Frame::default().with_label("CMB Explorer");
    title.set_label_size(15);
    title.set_label_color(theme::color(theme::ACCENT_BLUE));
    left.fixed(&title, 28);

    let header = section_header("PARAMETERS");
    left.fixed(&header, 18);

    let initial = settings.slider_values();
    let mut sliders = Vec::with_capacity(ParamField::ALL.len());
    for field in ParamField::ALL {
        let spec = field.spec();

        let mut name = Frame::default().with_label(spec.label);
        name.set_label_color(theme::color(theme::TEXT_PRIMARY));
        name.set_label_size(12);
        name.set_align(Align::Inside | Align::Left);
        left.fixed(&name, 16);

        let mut slider = HorNiceSlider::default();
        slider.set_minimum(spec.min);
        slider.set_maximum(spec.max);
        slider.set_step(spec.step, 1);
        slider.set_color(theme::color(theme::BG_WIDGET));
        slider.set_selection_color(theme::accent_color());
        slider.set_tooltip(slider_tooltip(field));
        left.fixed(&slider, 22);

        let mut value_label = Frame::default();
        value_label.set_label_color(theme::color(theme::TEXT_SECONDARY));
        value_label.set_label_size(11);
        value_label.set_align(Align::Inside | Align::Right);
        left.fixed(&value_label, 14);

        let mut ps = ParamSlider { field, slider, value_label };
        ps.show_value(initial.get(field));
        sliders.push(ps);
    }

    let header = section_header("ACTIONS");
    left.fixed(&header, 22);

    let btn_reset = sidebar_button("Reset", "Put every slider back to its default and recompute.");
    left.fixed(&btn_reset, 26);
    let btn_randomize = sidebar_button(
        "Randomize",
        "Pick random values inside every slider's range and recompute.",
    );
    left.fixed(&btn_randomize, 26);
    let btn_save_csv = sidebar_button("Save Spectrum CSV", "Write the plotted D_l values to a CSV file.");
    left.fixed(&btn_save_csv, 26);
    let btn_save_defaults = sidebar_button(
        "Save As Default",
        "Store the current slider positions in the settings file.",
    );
    left.fixed(&btn_save_defaults, 26);

    let header = section_header("ENGINE");
    left.fixed(&header, 22);

    let mut lbl_engine = Frame::default().with_label(&format!("Backend: {engine_name}"));
    lbl_engine.set_label_color(theme::color(theme::TEXT_SECONDARY));
    lbl_engine.set_label_size(11);
    lbl_engine.set_align(Align::Inside | Align::Left);
    left.fixed(&lbl_engine, 16);

    let mut check_tooltips = CheckButton::default().with_label("Show tooltips");
    check_tooltips.set_label_color(theme::color(theme::TEXT_SECONDARY));
    check_tooltips.set_label_size(11);
    check_tooltips.set_checked(settings.show_tooltips);
    left.fixed(&check_tooltips, 20);

    // Spacer to push everything up
    Frame::default();

    left.end();

    // ─── RIGHT PANEL (Plot) ────────────────────────────────────────────────────

    let mut plot = Widget::default();
    plot.set_frame(FrameType::FlatBox);
    plot.set_color(theme::color(theme::BG_DARK));

    root.end();

    // ─── STATUS BAR ───────────────────────────────────────────────────────────

    let mut status_bar = Frame::default()
        .with_pos(0, win_h - STATUS_H)
        .with_size(win_w, STATUS_H)
        .with_label("Ready");
    status_bar.set_frame(FrameType::FlatBox);
    status_bar.set_color(theme::color(theme::BG_PANEL));
    status_bar.set_label_color(theme::color(theme::TEXT_SECONDARY));
    status_bar.set_label_size(11);
    status_bar.set_align(Align::Inside | Align::Left);

    win.end();
    win.resizable(&root);
    win.size_range(MIN_W, MIN_H, 0, 0);

    let widgets = Widgets {
        sliders,
        plot,
        btn_reset,
        btn_randomize,
        btn_save_csv,
        btn_save_defaults,
        check_tooltips,
        status_bar,
    };

    (win, widgets)
}
