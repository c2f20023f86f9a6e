/// Lensed temperature spectrum as the engine hands it back.
///
/// `ell` runs 0, 1, 2, ... and `tt` is aligned index-for-index (K²).
/// The monopole and dipole entries are kept here and dropped by the transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSpectrum {
    pub ell: Vec<usize>,
    pub tt: Vec<f64>,
}

impl RawSpectrum {
    pub fn new(ell: Vec<usize>, tt: Vec<f64>) -> Self {
        Self { ell, tt }
    }

    pub fn len(&self) -> usize {
        self.ell.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ell.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumPoint {
    pub ell: usize,
    /// ℓ(ℓ+1)C_ℓ/2π in μK²
    pub d_ell: f64,
}

/// Plot-ready series in ascending ℓ.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplaySeries {
    pub points: Vec<SpectrumPoint>,
}

impl DisplaySeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First local maximum above `floor`, i.e. the first acoustic peak
    /// when the Sachs-Wolfe plateau sits below `floor`.
    pub fn first_peak_above(&self, floor: f64) -> Option<SpectrumPoint> {
        self.points.windows(3).find_map(|w| {
            let (prev, mid, next) = (w[0].d_ell, w[1].d_ell, w[2].d_ell);
            (mid > floor && mid >= prev && mid > next).then_some(w[1])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> DisplaySeries {
        DisplaySeries {
            points: values
                .iter()
                .enumerate()
                .map(|(i, &d_ell)| SpectrumPoint { ell: i + 2, d_ell })
                .collect(),
        }
    }

    #[test]
    fn test_no_peak_in_flat_or_empty_series() {
        assert!(series(&[100.0; 6]).first_peak_above(0.0).is_none());
        assert!(DisplaySeries::default().first_peak_above(0.0).is_none());
    }

    #[test]
    fn test_first_peak_above_floor() {
        let s = series(&[10.0, 12.0, 11.0, 50.0, 80.0, 60.0, 90.0, 10.0]);
        // The bump at 12 is below the floor, so the 80 wins
        let p = s.first_peak_above(20.0).unwrap();
        assert_eq!(p.d_ell, 80.0);
        assert_eq!(p.ell, 6);
    }

    #[test]
    fn test_raw_spectrum_accessors() {
        let raw = RawSpectrum::new(vec![0, 1, 2], vec![0.0, 0.0, 1.0]);
        assert_eq!(raw.len(), 3);
        assert!(RawSpectrum::default().is_empty());
    }
}
