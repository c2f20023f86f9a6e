//! Built-in phenomenological engine.
//!
//! Not a Boltzmann solver: the spectrum is a damped acoustic-peak template
//! whose peak spacing, odd/even contrast, damping tail and amplitude respond
//! to the five inputs in the right direction. Good enough to drive the
//! sliders without an external solver installed.

use std::f64::consts::PI;

use tracing::debug;

use super::{
    EngineConfig, EngineError, SpectrumEngine, KEY_A_S, KEY_H, KEY_LENSING, KEY_N_S,
    KEY_OMEGA_B, KEY_OMEGA_CDM, KEY_OUTPUT,
};
use crate::data::{RawSpectrum, MAX_ELL};

const KNOWN_KEYS: [&str; 7] = [
    KEY_OUTPUT,
    KEY_LENSING,
    KEY_H,
    KEY_OMEGA_B,
    KEY_OMEGA_CDM,
    KEY_N_S,
    KEY_A_S,
];

// Reference cosmology the template is normalised to
const REF_OMEGA_B: f64 = 0.022;
const REF_OMEGA_M: f64 = 0.142;
const REF_H: f64 = 0.67;
const REF_A_S: f64 = 2.1e-9;

/// Pivot multipole for the primordial tilt
const ELL_PIVOT: f64 = 550.0;
/// Where the Sachs-Wolfe plateau hands over to the acoustic regime
const ELL_PLATEAU: f64 = 90.0;
const ACOUSTIC_PHASE: f64 = 0.267;
/// H0 = 1000 km/s/Mpc; the template means nothing far beyond this
const H_MAX: f64 = 10.0;
const DOPPLER_FILL: f64 = 0.3;

#[derive(Debug, Clone, Copy)]
struct Cosmology {
    h: f64,
    omega_b: f64,
    omega_cdm: f64,
    n_s: f64,
    a_s: f64,
    lensing: bool,
}

impl Cosmology {
    fn from_config(cfg: &EngineConfig) -> Result<Self, EngineError> {
        Ok(Self {
            h: cfg.get_f64(KEY_H)?,
            omega_b: cfg.get_f64(KEY_OMEGA_B)?,
            omega_cdm: cfg.get_f64(KEY_OMEGA_CDM)?,
            n_s: cfg.get_f64(KEY_N_S)?,
            a_s: cfg.get_f64(KEY_A_S)?,
            lensing: cfg.get_flag(KEY_LENSING)?,
        })
    }

    fn check_physical(&self) -> Result<(), EngineError> {
        let fields = [
            (KEY_H, self.h),
            (KEY_OMEGA_B, self.omega_b),
            (KEY_OMEGA_CDM, self.omega_cdm),
            (KEY_N_S, self.n_s),
            (KEY_A_S, self.a_s),
        ];
        if let Some((key, v)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(EngineError::NonPhysical(format!("{key} = {v} is not finite")));
        }
        if self.h <= 0.0 {
            return Err(EngineError::NonPhysical(format!("h = {} must be positive", self.h)));
        }
        if self.h > H_MAX {
            return Err(EngineError::NonPhysical(format!(
                "h = {} is above the supported maximum {H_MAX}",
                self.h
            )));
        }
        if self.omega_b <= 0.0 {
            return Err(EngineError::NonPhysical(format!(
                "omega_b = {} must be positive",
                self.omega_b
            )));
        }
        if self.omega_cdm < 0.0 {
            return Err(EngineError::NonPhysical(format!(
                "omega_cdm = {} is negative",
                self.omega_cdm
            )));
        }
        if self.n_s <= 0.0 {
            return Err(EngineError::NonPhysical(format!("n_s = {} must be positive", self.n_s)));
        }
        if self.a_s <= 0.0 {
            return Err(EngineError::NonPhysical(format!("A_s = {} must be positive", self.a_s)));
        }
        let big_omega_m = self.omega_m() / self.h / self.h;
        if big_omega_m >= 1.0 {
            return Err(EngineError::NonPhysical(format!(
                "Omega_m = {big_omega_m:.3} >= 1 leaves no room for dark energy in a flat universe"
            )));
        }
        Ok(())
    }

    fn omega_m(&self) -> f64 {
        self.omega_b + self.omega_cdm
    }

    /// ℓ(ℓ+1)C_ℓ/2π in μK² at multipole `ell`.
    fn d_ell(&self, ell: f64) -> f64 {
        let wb = self.omega_b / REF_OMEGA_B;
        let wm = self.omega_m() / REF_OMEGA_M;
        let hr = self.h / REF_H;

        let ell_acoustic = 301.0 * hr.powf(0.19) * wm.powf(0.1) * wb.powf(-0.02);
        let ell_damping = 1400.0 * wb.powf(0.1) * wm.powf(0.1) * hr.powf(0.2);
        let baryon_load = 0.1 * wb;
        let first_peak = 6500.0 * wm.powf(-0.5) * wb.powf(0.3);
        let plateau = 1050.0 * wm.powf(-0.2);

        let theta = PI * (ell / ell_acoustic + ACOUSTIC_PHASE);
        let norm = (1.0 + baryon_load).powi(2);
        let mut acoustic = ((theta.cos() - baryon_load).powi(2)
            + DOPPLER_FILL * theta.sin().powi(2))
            / norm;
        if self.lensing {
            // Lensing smears the peaks toward their mean
            let smear = 0.2 * ell / (ell + 1500.0);
            let mean = (0.5 + baryon_load * baryon_load + 0.5 * DOPPLER_FILL) / norm;
            acoustic = acoustic * (1.0 - smear) + mean * smear;
        }

        let ell_first = ell_acoustic * (1.0 - ACOUSTIC_PHASE);
        let envelope = (ell_first / ell.max(ell_first)).powf(0.45);
        let damping = (-(ell / ell_damping).powf(1.8)).exp();
        let blend = ell * ell / (ell * ell + ELL_PLATEAU * ELL_PLATEAU);
        let tilt = (ell / ELL_PIVOT).powf(self.n_s - 1.0);

        (self.a_s / REF_A_S)
            * tilt
            * (plateau * (1.0 - blend) + blend * first_peak * acoustic * envelope * damping)
    }
}

#[derive(Debug, Default)]
pub struct AnalyticEngine {
    config: Option<EngineConfig>,
    cosmology: Option<Cosmology>,
    /// C_ℓ^TT in K² for ℓ = 0..=MAX_ELL, filled by compute()
    cl_tt: Vec<f64>,
    wants_lensed: bool,
}

impl AnalyticEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpectrumEngine for AnalyticEngine {
    fn configure(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        if let Some((key, _)) = config.iter().find(|(k, _)| !KNOWN_KEYS.contains(k)) {
            return Err(EngineError::UnknownParameter(key.to_string()));
        }
        self.wants_lensed = config.wants_lensed_cl()?;
        self.config = Some(config.clone());
        Ok(())
    }

    fn compute(&mut self) -> Result<(), EngineError> {
        let config = self.config.as_ref().ok_or(EngineError::NotConfigured)?;
        let cosmo = Cosmology::from_config(config)?;
        cosmo.check_physical()?;

        let mut cl_tt = vec![0.0; MAX_ELL + 1];
        for (ell, cl) in cl_tt.iter_mut().enumerate().skip(2) {
            let l = ell as f64;
            *cl = cosmo.d_ell(l) * 2.0 * PI / (l * (l + 1.0)) * 1e-12;
        }
        if let Some((ell, cl)) = cl_tt.iter().enumerate().find(|(_, cl)| !cl.is_finite()) {
            return Err(EngineError::NonPhysical(format!(
                "spectrum is not finite at l = {ell} (C_l = {cl})"
            )));
        }
        debug!(h = cosmo.h, omega_m = cosmo.omega_m(), "analytic spectrum computed");

        self.cl_tt = cl_tt;
        self.cosmology = Some(cosmo);
        Ok(())
    }

    fn lensed_cl(&self, l_max: usize) -> Result<RawSpectrum, EngineError> {
        if self.cosmology.is_none() {
            return Err(EngineError::NotComputed);
        }
        if !self.wants_lensed {
            return Err(EngineError::LensingNotRequested);
        }
        if l_max > MAX_ELL {
            return Err(EngineError::LmaxTooHigh {
                requested: l_max,
                available: MAX_ELL,
            });
        }
        Ok(RawSpectrum::new(
            (0..=l_max).collect(),
            self.cl_tt[..=l_max].to_vec(),
        ))
    }

    fn struct_cleanup(&mut self) {
        self.cl_tt = Vec::new();
        self.cosmology = None;
    }

    fn empty(&mut self) {
        self.config = None;
        self.wants_lensed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DisplaySeries, ParameterSet, SliderValues};
    use crate::processing::transform::transform;

    fn run(values: SliderValues) -> Result<DisplaySeries, EngineError> {
        let mut engine = AnalyticEngine::new();
        let params = ParameterSet::from_slider_values(&values);
        engine.configure(&EngineConfig::for_parameters(&params))?;
        engine.compute()?;
        Ok(transform(&engine.lensed_cl(MAX_ELL)?))
    }

    fn first_peak(values: SliderValues) -> (usize, f64) {
        let series = run(values).unwrap();
        let p = series.first_peak_above(2000.0).unwrap();
        (p.ell, p.d_ell)
    }

    #[test]
    fn test_default_first_peak_location() {
        let (ell, height) = first_peak(SliderValues::default());
        assert!((200..=240).contains(&ell), "first peak at {ell}");
        assert!(height > 5000.0 && height < 6500.0, "first peak height {height}");
    }

    #[test]
    fn test_output_shape() {
        let mut engine = AnalyticEngine::new();
        let params = ParameterSet::from_slider_values(&SliderValues::default());
        engine.configure(&EngineConfig::for_parameters(&params)).unwrap();
        engine.compute().unwrap();
        let raw = engine.lensed_cl(2500).unwrap();
        assert_eq!(raw.ell.len(), 2501);
        assert_eq!(raw.tt.len(), 2501);
        assert_eq!(raw.ell[0], 0);
        assert_eq!(raw.tt[0], 0.0);
        assert_eq!(raw.tt[1], 0.0);
        assert!(raw.tt[2..].iter().all(|c| c.is_finite() && *c > 0.0));
    }

    #[test]
    fn test_amplitude_scales_linearly() {
        let base = run(SliderValues::default()).unwrap();
        let doubled = run(SliderValues {
            a_s_1e9: 4.2,
            ..Default::default()
        })
        .unwrap();
        for (a, b) in base.points.iter().zip(&doubled.points).step_by(97) {
            assert!((b.d_ell / a.d_ell - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_more_cdm_lowers_first_peak() {
        let (_, low_cdm) = first_peak(SliderValues {
            omega_cdm: 0.08,
            ..Default::default()
        });
        let (_, high_cdm) = first_peak(SliderValues {
            omega_cdm: 0.2,
            ..Default::default()
        });
        assert!(low_cdm > high_cdm);
    }

    #[test]
    fn test_higher_h_shifts_peaks_right() {
        let (low_h, _) = first_peak(SliderValues {
            h: 0.55,
            ..Default::default()
        });
        let (high_h, _) = first_peak(SliderValues {
            h: 0.85,
            ..Default::default()
        });
        assert!(high_h > low_h);
    }

    #[test]
    fn test_negative_density_fails_compute() {
        let err = run(SliderValues {
            omega_cdm: -0.05,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::NonPhysical(_)));
    }

    #[test]
    fn test_slider_corner_without_dark_energy_fails() {
        // Omega_m = 0.285 / 0.25 > 1
        let err = run(SliderValues {
            h: 0.5,
            omega_b: 0.035,
            omega_cdm: 0.25,
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("Omega_m"));
    }

    #[test]
    fn test_overflowing_tilt_fails_compute() {
        let err = run(SliderValues {
            n_s: 1e6,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(&err, EngineError::NonPhysical(m) if m.contains("not finite")), "{err}");
    }

    #[test]
    fn test_huge_h_fails_compute() {
        // h * h would overflow and hide Omega_m
        let err = run(SliderValues {
            h: 1e200,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::NonPhysical(_)));

        let err = run(SliderValues {
            h: 10.5,
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("above the supported maximum"));
    }

    #[test]
    fn test_state_machine_order() {
        let mut engine = AnalyticEngine::new();
        assert!(matches!(engine.compute(), Err(EngineError::NotConfigured)));
        assert!(matches!(engine.lensed_cl(10), Err(EngineError::NotComputed)));

        let params = ParameterSet::from_slider_values(&SliderValues::default());
        engine.configure(&EngineConfig::for_parameters(&params)).unwrap();
        engine.compute().unwrap();
        assert!(matches!(
            engine.lensed_cl(3000),
            Err(EngineError::LmaxTooHigh { available: 2500, .. })
        ));

        engine.struct_cleanup();
        assert!(matches!(engine.lensed_cl(10), Err(EngineError::NotComputed)));
        engine.empty();
        assert!(matches!(engine.compute(), Err(EngineError::NotConfigured)));
        // Idempotent
        engine.struct_cleanup();
        engine.empty();
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut cfg = EngineConfig::for_parameters(&ParameterSet::from_slider_values(
            &SliderValues::default(),
        ));
        cfg.set("Omega_k", 0.1);
        let err = AnalyticEngine::new().configure(&cfg).unwrap_err();
        assert!(matches!(err, EngineError::UnknownParameter(k) if k == "Omega_k"));
    }

    #[test]
    fn test_unlensed_request_refused() {
        let mut cfg = EngineConfig::for_parameters(&ParameterSet::from_slider_values(
            &SliderValues::default(),
        ));
        cfg.set(KEY_LENSING, "no");
        let mut engine = AnalyticEngine::new();
        engine.configure(&cfg).unwrap();
        engine.compute().unwrap();
        assert!(matches!(engine.lensed_cl(100), Err(EngineError::LensingNotRequested)));
    }
}
