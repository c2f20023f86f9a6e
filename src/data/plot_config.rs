/// Fixed frame the spectrum is drawn into.
///
/// The ranges never follow the data so curve shapes stay comparable
/// between slider moves; spectra peaking above `y_max` get clipped.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotConfig {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub line_color: u32,
    pub line_width: i32,
    /// Grid line opacity over the plot background, 0..1
    pub grid_alpha: f32,
}

pub const MAX_ELL: usize = 2500;

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            x_min: 2.0,
            x_max: MAX_ELL as f64,
            y_min: 0.0,
            y_max: 6000.0,
            title: "Interactive CMB Power Spectrum",
            x_label: "Multipole moment ℓ",
            y_label: "ℓ(ℓ+1)C_ℓ^TT / 2π [μK²]",
            line_color: 0xb22222, // firebrick
            line_width: 2,
            grid_alpha: 0.3,
        }
    }
}

impl PlotConfig {
    pub fn x_span(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn y_span(&self) -> f64 {
        self.y_max - self.y_min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_frame() {
        let cfg = PlotConfig::default();
        assert_eq!((cfg.x_min, cfg.x_max), (2.0, 2500.0));
        assert_eq!((cfg.y_min, cfg.y_max), (0.0, 6000.0));
        assert_eq!(cfg.x_span(), 2498.0);
        assert_eq!(cfg.y_span(), 6000.0);
    }
}
