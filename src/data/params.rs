use rand::Rng;

/// UI amplitude control is `A_s * 1e9`; the engine wants natural units.
pub const AMPLITUDE_SCALE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamField {
    H,
    OmegaB,
    OmegaCdm,
    NS,
    AS1e9,
}

impl ParamField {
    pub const ALL: [ParamField; 5] = [
        ParamField::H,
        ParamField::OmegaB,
        ParamField::OmegaCdm,
        ParamField::NS,
        ParamField::AS1e9,
    ];

    pub fn spec(self) -> &'static ParamSpec {
        &PARAM_SPECS[self as usize]
    }
}

/// Slider bounds, defaults and display text for one tunable input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub field: ParamField,
    /// Name used for the UI callback and the settings file.
    pub key: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub step: f64,
    /// Decimals shown next to the slider
    pub precision: usize,
}

impl ParamSpec {
    /// True when `value` lies inside `[min, max]`, allowing for float noise
    /// picked up by the 1e9 amplitude rescale. NaN is never in range.
    pub fn contains(&self, value: f64) -> bool {
        let tol = (self.max - self.min) * 1e-9;
        value >= self.min - tol && value <= self.max + tol
    }

    /// Round to the nearest slider step and clamp into range.
    pub fn snap(&self, value: f64) -> f64 {
        let steps = ((value - self.min) / self.step).round();
        let snapped = self.min + steps * self.step;
        // Re-round to the display precision so 0.1 + 0.2 noise doesn't leak into labels
        let scale = 10f64.powi(self.precision as i32);
        ((snapped * scale).round() / scale).clamp(self.min, self.max)
    }

    pub fn format_value(&self, value: f64) -> String {
        format!("{:.*}", self.precision, value)
    }
}

pub const PARAM_SPECS: [ParamSpec; 5] = [
    ParamSpec {
        field: ParamField::H,
        key: "h",
        label: "h (Hubble)",
        min: 0.5,
        max: 0.9,
        default: 0.67,
        step: 0.01,
        precision: 2,
    },
    ParamSpec {
        field: ParamField::OmegaB,
        key: "omega_b",
        label: "omega_b (Baryons)",
        min: 0.015,
        max: 0.035,
        default: 0.022,
        step: 0.001,
        precision: 3,
    },
    ParamSpec {
        field: ParamField::OmegaCdm,
        key: "omega_cdm",
        label: "omega_cdm (CDM)",
        min: 0.05,
        max: 0.25,
        default: 0.12,
        step: 0.01,
        precision: 2,
    },
    ParamSpec {
        field: ParamField::NS,
        key: "n_s",
        label: "n_s (Spectral Index)",
        min: 0.8,
        max: 1.2,
        default: 0.96,
        step: 0.01,
        precision: 2,
    },
    ParamSpec {
        field: ParamField::AS1e9,
        key: "A_s_1e9",
        label: "10^9 * A_s (Amplitude)",
        min: 1.0,
        max: 4.0,
        default: 2.1,
        step: 0.1,
        precision: 1,
    },
];

// ─── Slider values ─────────────────────────────────────────────────────────────

/// The five raw numbers the UI hands over on every change event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderValues {
    pub h: f64,
    pub omega_b: f64,
    pub omega_cdm: f64,
    pub n_s: f64,
    pub a_s_1e9: f64,
}

impl Default for SliderValues {
    fn default() -> Self {
        Self {
            h: ParamField::H.spec().default,
            omega_b: ParamField::OmegaB.spec().default,
            omega_cdm: ParamField::OmegaCdm.spec().default,
            n_s: ParamField::NS.spec().default,
            a_s_1e9: ParamField::AS1e9.spec().default,
        }
    }
}

impl SliderValues {
    pub fn get(&self, field: ParamField) -> f64 {
        match field {
            ParamField::H => self.h,
            ParamField::OmegaB => self.omega_b,
            ParamField::OmegaCdm => self.omega_cdm,
            ParamField::NS => self.n_s,
            ParamField::AS1e9 => self.a_s_1e9,
        }
    }

    pub fn set(&mut self, field: ParamField, value: f64) {
        match field {
            ParamField::H => self.h = value,
            ParamField::OmegaB => self.omega_b = value,
            ParamField::OmegaCdm => self.omega_cdm = value,
            ParamField::NS => self.n_s = value,
            ParamField::AS1e9 => self.a_s_1e9 = value,
        }
    }

    /// Draw every field uniformly inside its bounds, snapped to the slider step.
    pub fn random_within_bounds<R: Rng>(rng: &mut R) -> Self {
        let mut values = Self::default();
        for field in ParamField::ALL {
            let spec = field.spec();
            let raw = rng.random_range(spec.min..=spec.max);
            values.set(field, spec.snap(raw));
        }
        values
    }
}

// ─── Parameter set ─────────────────────────────────────────────────────────────

/// Immutable snapshot of the cosmology handed to one compute cycle.
///
/// Construction never fails: bounds are the UI's job and the engine is the
/// validation boundary. [`ParameterSet::out_of_bounds`] lets callers log
/// values that slipped past the sliders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSet {
    h: f64,
    omega_b: f64,
    omega_cdm: f64,
    n_s: f64,
    a_s: f64,
}

impl ParameterSet {
    pub fn from_slider_values(values: &SliderValues) -> Self {
        Self {
            h: values.h,
            omega_b: values.omega_b,
            omega_cdm: values.omega_cdm,
            n_s: values.n_s,
            a_s: values.a_s_1e9 * AMPLITUDE_SCALE,
        }
    }

    pub fn h(&self) -> f64 {
        self.h
    }

    pub fn omega_b(&self) -> f64 {
        self.omega_b
    }

    pub fn omega_cdm(&self) -> f64 {
        self.omega_cdm
    }

    pub fn n_s(&self) -> f64 {
        self.n_s
    }

    /// Primordial amplitude in natural units.
    pub fn a_s(&self) -> f64 {
        self.a_s
    }

    /// Value of `field` in the UI's units (amplitude rescaled by 1e9).
    pub fn ui_value(&self, field: ParamField) -> f64 {
        match field {
            ParamField::H => self.h,
            ParamField::OmegaB => self.omega_b,
            ParamField::OmegaCdm => self.omega_cdm,
            ParamField::NS => self.n_s,
            ParamField::AS1e9 => self.a_s / AMPLITUDE_SCALE,
        }
    }

    /// Fields outside their documented slider range, with the offending value.
    pub fn out_of_bounds(&self) -> Vec<(ParamField, f64)> {
        ParamField::ALL
            .iter()
            .map(|&field| (field, self.ui_value(field)))
            .filter(|&(field, value)| !field.spec().contains(value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= b.abs() * 1e-12
    }

    #[test]
    fn test_amplitude_descaling() {
        let values = SliderValues {
            a_s_1e9: 2.1,
            ..Default::default()
        };
        let params = ParameterSet::from_slider_values(&values);
        assert!(close(params.a_s(), 2.1e-9));
    }

    #[test]
    fn test_other_fields_pass_through() {
        let values = SliderValues {
            h: 0.7,
            omega_b: 0.02,
            omega_cdm: 0.1,
            n_s: 1.0,
            a_s_1e9: 3.0,
        };
        let params = ParameterSet::from_slider_values(&values);
        assert_eq!(params.h(), 0.7);
        assert_eq!(params.omega_b(), 0.02);
        assert_eq!(params.omega_cdm(), 0.1);
        assert_eq!(params.n_s(), 1.0);
    }

    #[test]
    fn test_defaults_match_slider_table() {
        let values = SliderValues::default();
        assert_eq!(values.h, 0.67);
        assert_eq!(values.omega_b, 0.022);
        assert_eq!(values.omega_cdm, 0.12);
        assert_eq!(values.n_s, 0.96);
        assert_eq!(values.a_s_1e9, 2.1);
    }

    #[test]
    fn test_boundary_values_construct() {
        for field in ParamField::ALL {
            let spec = field.spec();
            for edge in [spec.min, spec.max] {
                let mut values = SliderValues::default();
                values.set(field, edge);
                let params = ParameterSet::from_slider_values(&values);
                assert!(params.out_of_bounds().is_empty(), "{} at {}", spec.key, edge);
            }
        }
    }

    #[test]
    fn test_out_of_range_still_constructs() {
        let values = SliderValues {
            h: 1.5,
            omega_cdm: -0.1,
            ..Default::default()
        };
        let params = ParameterSet::from_slider_values(&values);
        assert_eq!(params.h(), 1.5);
        let bad = params.out_of_bounds();
        assert_eq!(bad.len(), 2);
        assert_eq!(bad[0].0, ParamField::H);
        assert_eq!(bad[1], (ParamField::OmegaCdm, -0.1));
    }

    #[test]
    fn test_nan_reported_out_of_bounds() {
        let values = SliderValues {
            n_s: f64::NAN,
            ..Default::default()
        };
        let params = ParameterSet::from_slider_values(&values);
        let bad = params.out_of_bounds();
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].0, ParamField::NS);
    }

    #[test]
    fn test_snap_to_step() {
        let spec = ParamField::OmegaB.spec();
        assert_eq!(spec.snap(0.02249), 0.022);
        assert_eq!(spec.snap(0.0226), 0.023);
        assert_eq!(spec.snap(1.0), 0.035);
        assert_eq!(ParamField::AS1e9.spec().snap(2.14), 2.1);
    }

    #[test]
    fn test_random_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let values = SliderValues::random_within_bounds(&mut rng);
            let params = ParameterSet::from_slider_values(&values);
            assert!(params.out_of_bounds().is_empty(), "{:?}", values);
        }
    }

    #[test]
    fn test_spec_table_order_matches_enum() {
        for (i, field) in ParamField::ALL.iter().enumerate() {
            assert_eq!(PARAM_SPECS[i].field, *field);
        }
    }
}
