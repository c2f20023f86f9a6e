use std::f64::consts::PI;

use crate::data::{DisplaySeries, RawSpectrum, SpectrumPoint};

/// K² → μK²
const MICRO_KELVIN_SQ: f64 = 1e12;

/// Turn raw C_ℓ^TT into D_ℓ = ℓ(ℓ+1)C_ℓ/2π in μK², dropping the monopole
/// and dipole entries.
///
/// Order is preserved and nothing is resampled. The engine has already
/// bounded the output to the requested ℓ_max, so no truncation happens here.
/// `ell` and `tt` are expected to have equal length.
pub fn transform(raw: &RawSpectrum) -> DisplaySeries {
    let points = raw
        .ell
        .iter()
        .zip(&raw.tt)
        .skip(2)
        .map(|(&ell, &cl)| {
            let l = ell as f64;
            SpectrumPoint {
                ell,
                d_ell: l * (l + 1.0) * cl / (2.0 * PI) * MICRO_KELVIN_SQ,
            }
        })
        .collect();
    DisplaySeries { points }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rel_close(a: f64, b: f64) -> bool {
        (a - b).abs() <= b.abs() * 1e-4
    }

    #[test]
    fn test_drops_monopole_and_dipole() {
        let raw = RawSpectrum::new(vec![0, 1, 2, 3, 4], vec![9.0, 9.0, 1e-10, 1e-10, 1e-10]);
        let series = transform(&raw);
        assert_eq!(series.len(), 3);
        assert_eq!(series.points[0].ell, 2);
        assert_eq!(series.points[2].ell, 4);
    }

    #[test]
    fn test_unit_conversion_ell_2() {
        let raw = RawSpectrum::new(vec![0, 1, 2], vec![0.0, 0.0, 1.0]);
        let d = transform(&raw).points[0].d_ell;
        // 2*3/(2π)*1e12
        assert!(rel_close(d, 9.549e11), "{d}");
    }

    #[test]
    fn test_unit_conversion_ell_100() {
        let ell: Vec<usize> = (0..=100).collect();
        let mut tt = vec![0.0; 101];
        tt[100] = 2.5e-10;
        let series = transform(&RawSpectrum::new(ell, tt));
        let last = series.points.last().unwrap();
        assert_eq!(last.ell, 100);
        // 100*101*2.5e-10/(2π)*1e12
        assert!(rel_close(last.d_ell, 4.0187e5), "{}", last.d_ell);
    }

    #[test]
    fn test_short_inputs() {
        assert!(transform(&RawSpectrum::default()).is_empty());
        assert!(transform(&RawSpectrum::new(vec![0], vec![1.0])).is_empty());
        assert!(transform(&RawSpectrum::new(vec![0, 1], vec![1.0, 1.0])).is_empty());
    }

    proptest! {
        #[test]
        fn prop_truncates_two_and_keeps_order(
            tt in proptest::collection::vec(0.0f64..1e-8, 2..600)
        ) {
            let n = tt.len();
            let raw = RawSpectrum::new((0..n).collect(), tt.clone());
            let series = transform(&raw);

            prop_assert_eq!(series.len(), n - 2);
            prop_assert_eq!(series.points.first().map(|p| p.ell), raw.ell.get(2).copied());
            prop_assert!(series.points.windows(2).all(|w| w[0].ell < w[1].ell));
            for (p, &cl) in series.points.iter().zip(&tt[2..]) {
                let l = p.ell as f64;
                prop_assert_eq!(p.d_ell, l * (l + 1.0) * cl / (2.0 * PI) * 1e12);
            }
        }
    }
}
