//! Data-to-pixel mapping for the fixed spectrum frame.
//!
//! Kept free of any toolkit so the clipping rules can be tested headless.

use crate::data::{DisplaySeries, PlotConfig};

/// Pixel rectangle the data frame is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotArea {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl PlotArea {
    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }
}

/// Line segment in pixel coordinates.
pub type Segment = ((i32, i32), (i32, i32));

pub struct PlotFrame<'a> {
    pub config: &'a PlotConfig,
    pub area: PlotArea,
}

impl<'a> PlotFrame<'a> {
    pub fn new(config: &'a PlotConfig, area: PlotArea) -> Self {
        Self { config, area }
    }

    pub fn x_to_px(&self, x: f64) -> i32 {
        let t = (x - self.config.x_min) / self.config.x_span();
        (self.area.x as f64 + t * self.area.w as f64).round() as i32
    }

    /// Screen y grows downward, so y_max maps to the top edge.
    pub fn y_to_px(&self, y: f64) -> i32 {
        let t = (y - self.config.y_min) / self.config.y_span();
        (self.area.y as f64 + (1.0 - t) * self.area.h as f64).round() as i32
    }

    /// The series as line segments clipped to the fixed frame.
    ///
    /// Parts of the curve above `y_max` (or outside the ℓ range) are cut at
    /// the frame edge. Non-finite points break the line.
    pub fn segments(&self, series: &DisplaySeries) -> Vec<Segment> {
        let mut out = Vec::with_capacity(series.len());
        for w in series.points.windows(2) {
            let a = (w[0].ell as f64, w[0].d_ell);
            let b = (w[1].ell as f64, w[1].d_ell);
            if !(a.1.is_finite() && b.1.is_finite()) {
                continue;
            }
            if let Some((p, q)) = clip_segment(self.config, a, b) {
                out.push((
                    (self.x_to_px(p.0), self.y_to_px(p.1)),
                    (self.x_to_px(q.0), self.y_to_px(q.1)),
                ));
            }
        }
        out
    }
}

/// Liang-Barsky clip of the data-space segment a→b against the config frame.
fn clip_segment(cfg: &PlotConfig, a: (f64, f64), b: (f64, f64)) -> Option<((f64, f64), (f64, f64))> {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    let edges = [
        (-dx, a.0 - cfg.x_min),
        (dx, cfg.x_max - a.0),
        (-dy, a.1 - cfg.y_min),
        (dy, cfg.y_max - a.1),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    Some((
        (a.0 + t0 * dx, a.1 + t0 * dy),
        (a.0 + t1 * dx, a.1 + t1 * dy),
    ))
}

/// Round tick positions (1, 2 or 5 times a power of ten) inside `[min, max]`.
pub fn nice_ticks(min: f64, max: f64, target: usize) -> Vec<f64> {
    if !(max > min) || target == 0 {
        return Vec::new();
    }
    let raw = (max - min) / target as f64;
    let magnitude = 10f64.powi(raw.log10().floor() as i32);
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude);

    let mut ticks = Vec::new();
    let mut v = (min / step).ceil() * step;
    while v <= max + step * 1e-9 {
        ticks.push(v);
        v += step;
    }
    ticks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SpectrumPoint;
    use proptest::prelude::*;

    const AREA: PlotArea = PlotArea { x: 60, y: 40, w: 800, h: 500 };

    fn series(points: &[(usize, f64)]) -> DisplaySeries {
        DisplaySeries {
            points: points
                .iter()
                .map(|&(ell, d_ell)| SpectrumPoint { ell, d_ell })
                .collect(),
        }
    }

    #[test]
    fn test_corners_map_to_area_edges() {
        let cfg = PlotConfig::default();
        let frame = PlotFrame::new(&cfg, AREA);
        assert_eq!(frame.x_to_px(2.0), 60);
        assert_eq!(frame.x_to_px(2500.0), 860);
        assert_eq!(frame.y_to_px(0.0), 540);
        assert_eq!(frame.y_to_px(6000.0), 40);
    }

    #[test]
    fn test_peak_above_frame_is_clipped_at_top() {
        let cfg = PlotConfig::default();
        let frame = PlotFrame::new(&cfg, AREA);
        let segs = frame.segments(&series(&[(200, 5000.0), (220, 7000.0), (240, 5000.0)]));
        assert_eq!(segs.len(), 2);
        // Both halves stop at the top edge
        assert_eq!(segs[0].1.1, 40);
        assert_eq!(segs[1].0.1, 40);
    }

    #[test]
    fn test_segment_fully_outside_dropped() {
        let cfg = PlotConfig::default();
        let frame = PlotFrame::new(&cfg, AREA);
        let segs = frame.segments(&series(&[(300, 9000.0), (301, 9500.0), (302, 100.0)]));
        assert_eq!(segs.len(), 1);
    }

    #[test]
    fn test_nan_breaks_line() {
        let cfg = PlotConfig::default();
        let frame = PlotFrame::new(&cfg, AREA);
        let segs = frame.segments(&series(&[(10, 1.0), (11, f64::NAN), (12, 1.0), (13, 2.0)]));
        assert_eq!(segs.len(), 1);
    }

    #[test]
    fn test_nice_ticks() {
        assert_eq!(nice_ticks(0.0, 6000.0, 6), vec![0.0, 1000.0, 2000.0, 3000.0, 4000.0, 5000.0, 6000.0]);
        assert_eq!(nice_ticks(2.0, 2500.0, 5), vec![500.0, 1000.0, 1500.0, 2000.0, 2500.0]);
        assert!(nice_ticks(5.0, 5.0, 4).is_empty());
    }

    proptest! {
        #[test]
        fn prop_segments_stay_inside_area(
            values in proptest::collection::vec(-2000.0f64..12000.0, 2..200),
            start in 0usize..2600,
        ) {
            let cfg = PlotConfig::default();
            let frame = PlotFrame::new(&cfg, AREA);
            let s = DisplaySeries {
                points: values
                    .iter()
                    .enumerate()
                    .map(|(i, &d)| SpectrumPoint { ell: start + i * 7, d_ell: d })
                    .collect(),
            };
            for (p, q) in frame.segments(&s) {
                prop_assert!(AREA.contains(p.0, p.1), "{:?}", p);
                prop_assert!(AREA.contains(q.0, q.1), "{:?}", q);
            }
        }
    }
}
