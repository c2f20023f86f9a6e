use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use fltk::{
    draw,
    enums::{Align, Color, Font, LineStyle},
    prelude::*,
    widget::Widget,
};

use crate::data::{DisplaySeries, PlotConfig};
use crate::processing::Renderer;
use crate::rendering::plot_geometry::{nice_ticks, PlotArea, PlotFrame};
use crate::ui::theme;

// ─── Margins around the data frame (pixels) ────────────────────────────────────
const MARGIN_LEFT: i32 = 72;
const MARGIN_RIGHT: i32 = 24;
const MARGIN_TOP: i32 = 36;
const MARGIN_BOTTOM: i32 = 52;
const TICK_LEN: i32 = 5;
const TICK_TARGET: usize = 6;

/// What the plot widget shows. Either the last series or an error, never both.
#[derive(Debug, Default)]
pub struct PlotState {
    pub config: PlotConfig,
    pub series: Option<DisplaySeries>,
    pub error: Option<String>,
}

/// The persistent plot surface. Cloning shares the same widget and state.
#[derive(Clone)]
pub struct SpectrumPlot {
    widget: Widget,
    state: Rc<RefCell<PlotState>>,
}

impl SpectrumPlot {
    /// Take over drawing of `widget`.
    pub fn new(mut widget: Widget) -> Self {
        let state = Rc::new(RefCell::new(PlotState::default()));
        {
            let state = state.clone();
            widget.draw(move |w| {
                if !w.visible_r() || w.w() <= 0 || w.h() <= 0 {
                    return;
                }
                let Ok(st) = state.try_borrow() else { return; };
                draw_plot(&st, w.x(), w.y(), w.w(), w.h());
            });
        }
        Self { widget, state }
    }

    /// Clone of the series currently on screen, if any.
    pub fn last_series(&self) -> Option<DisplaySeries> {
        self.state.borrow().series.clone()
    }
}

impl Renderer for SpectrumPlot {
    fn render(&mut self, series: &DisplaySeries, plot: &PlotConfig) -> Result<()> {
        {
            let mut st = self.state.borrow_mut();
            st.config = plot.clone();
            st.series = Some(series.clone());
            st.error = None;
        }
        self.widget.redraw();
        Ok(())
    }

    fn report_error(&mut self, message: &str) {
        {
            let mut st = self.state.borrow_mut();
            st.series = None;
            st.error = Some(message.to_string());
        }
        self.widget.redraw();
    }
}

fn plot_area(x: i32, y: i32, w: i32, h: i32) -> Option<PlotArea> {
    let area = PlotArea {
        x: x + MARGIN_LEFT,
        y: y + MARGIN_TOP,
        w: w - MARGIN_LEFT - MARGIN_RIGHT,
        h: h - MARGIN_TOP - MARGIN_BOTTOM,
    };
    (area.w > 10 && area.h > 10).then_some(area)
}

fn draw_plot(st: &PlotState, x: i32, y: i32, w: i32, h: i32) {
    let background = theme::color(theme::BG_DARK);
    draw::set_draw_color(background);
    draw::draw_rectf(x, y, w, h);

    if let Some(msg) = &st.error {
        draw::set_draw_color(theme::color(theme::ACCENT_RED));
        draw::set_font(Font::Helvetica, 14);
        draw::draw_text2(msg, x + 20, y, w - 40, h, Align::Center | Align::Wrap);
        return;
    }

    let Some(area) = plot_area(x, y, w, h) else { return; };
    let cfg = &st.config;
    let frame = PlotFrame::new(cfg, area);
    let x_ticks = nice_ticks(cfg.x_min, cfg.x_max, TICK_TARGET);
    let y_ticks = nice_ticks(cfg.y_min, cfg.y_max, TICK_TARGET);

    // ── Grid ──
    let grid = Color::color_average(
        theme::color(theme::TEXT_SECONDARY),
        background,
        cfg.grid_alpha,
    );
    draw::set_draw_color(grid);
    draw::set_line_style(LineStyle::Dot, 1);
    for &t in &x_ticks {
        let px = frame.x_to_px(t);
        draw::draw_line(px, area.y, px, area.y + area.h);
    }
    for &t in &y_ticks {
        let py = frame.y_to_px(t);
        draw::draw_line(area.x, py, area.x + area.w, py);
    }
    draw::set_line_style(LineStyle::Solid, 0);

    // ── Frame and ticks ──
    draw::set_draw_color(theme::color(theme::BORDER));
    draw::draw_rect(area.x, area.y, area.w + 1, area.h + 1);

    draw::set_font(Font::Helvetica, 10);
    draw::set_draw_color(theme::color(theme::TEXT_SECONDARY));
    for &t in &x_ticks {
        let px = frame.x_to_px(t);
        let bottom = area.y + area.h;
        draw::draw_line(px, bottom, px, bottom + TICK_LEN);
        let label = format!("{}", t as i64);
        let tw = draw::width(&label) as i32;
        draw::draw_text(&label, px - tw / 2, bottom + TICK_LEN + 12);
    }
    for &t in &y_ticks {
        let py = frame.y_to_px(t);
        draw::draw_line(area.x - TICK_LEN, py, area.x, py);
        let label = format!("{}", t as i64);
        let tw = draw::width(&label) as i32;
        draw::draw_text(&label, area.x - TICK_LEN - tw - 3, py + 4);
    }

    // ── Title and axis labels ──
    draw::set_draw_color(theme::color(theme::TEXT_PRIMARY));
    draw::set_font(Font::HelveticaBold, 14);
    let tw = draw::width(cfg.title) as i32;
    draw::draw_text(cfg.title, area.x + (area.w - tw) / 2, y + MARGIN_TOP - 12);

    draw::set_font(Font::Helvetica, 12);
    let tw = draw::width(cfg.x_label) as i32;
    draw::draw_text(cfg.x_label, area.x + (area.w - tw) / 2, y + h - 10);
    let tw = draw::width(cfg.y_label) as i32;
    draw::draw_text_angled(90, cfg.y_label, x + 16, area.y + (area.h + tw) / 2);

    // ── Curve ──
    let Some(series) = &st.series else { return; };
    draw::push_clip(area.x, area.y, area.w + 1, area.h + 1);
    draw::set_draw_color(Color::from_hex(cfg.line_color));
    draw::set_line_style(LineStyle::Solid, cfg.line_width);
    for ((x0, y0), (x1, y1)) in frame.segments(series) {
        draw::draw_line(x0, y0, x1, y1);
    }
    draw::set_line_style(LineStyle::Solid, 0);
    draw::pop_clip();
}
