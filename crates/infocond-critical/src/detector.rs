// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Critical Point Detector
// ─────────────────────────────────────────────────────────────────────
//! Locates ρ_c = argmax_ρ |dM/dρ| on a metric-vs-coupling curve.
//!
//! Derivative stencil on (possibly non-uniform) ρ spacing:
//!   first point:   (M₁ − M₀) / (ρ₁ − ρ₀)
//!   interior:      (M_{i+1} − M_{i−1}) / (ρ_{i+1} − ρ_{i−1})
//!   last point:    (M_n − M_{n−1}) / (ρ_n − ρ_{n−1})
//!
//! Ties go to the smallest ρ.
//!
//! The susceptibility exponent γ is the negated slope of ln χ against
//! ln |ρ − ρ_c| over the points flanking the χ peak.

use infocond_types::{
    CriticalPointEstimate, LatticeError, LatticeResult, SusceptibilityExponent, SweepResult,
};

/// Stateless derivative-peak locator.
#[derive(Debug, Clone, Copy, Default)]
pub struct CriticalPointDetector;

impl CriticalPointDetector {
    /// Central differencing needs at least one interior point.
    pub const MIN_POINTS: usize = 3;

    pub fn new() -> Self {
        Self
    }

    /// Discrete derivative of an ascending `(ρ, M)` curve.
    pub fn derivative(&self, curve: &[(f64, f64)]) -> LatticeResult<Vec<f64>> {
        check_curve(curve, Self::MIN_POINTS)?;
        let n = curve.len();
        let slope = |a: usize, b: usize| (curve[b].1 - curve[a].1) / (curve[b].0 - curve[a].0);
        Ok((0..n)
            .map(|i| match i {
                0 => slope(0, 1),
                i if i == n - 1 => slope(n - 2, n - 1),
                i => slope(i - 1, i + 1),
            })
            .collect())
    }

    /// `(ρ_c, |dM/dρ|(ρ_c))` of an ascending curve.
    pub fn locate_curve(&self, curve: &[(f64, f64)]) -> LatticeResult<(f64, f64)> {
        let d = self.derivative(curve)?;
        let (idx, magnitude) = argmax_first(d.iter().map(|v| v.abs()));
        Ok((curve[idx].0, magnitude))
    }

    /// `(ρ, value)` at the maximum of the curve itself, e.g. a susceptibility peak.
    pub fn locate_peak(&self, curve: &[(f64, f64)]) -> LatticeResult<(f64, f64)> {
        check_curve(curve, 1)?;
        let (idx, value) = argmax_first(curve.iter().map(|p| p.1));
        Ok((curve[idx].0, value))
    }

    /// Critical point of `metric` in one sweep result (point estimate only).
    pub fn locate(&self, result: &SweepResult, metric: &str) -> LatticeResult<CriticalPointEstimate> {
        result.ensure_ordered()?;
        let curve = result.curve(metric)?;
        let (rho_c, derivative_magnitude) = self.locate_curve(&curve)?;
        Ok(CriticalPointEstimate {
            metric: metric.to_string(),
            lattice_size: result.lattice_size,
            rho_c,
            derivative_magnitude,
            ci_low: rho_c,
            ci_high: rho_c,
            resamples: 0,
        })
    }

    /// ρ of maximal susceptibility in one sweep result.
    pub fn locate_susceptibility_peak(&self, result: &SweepResult) -> LatticeResult<(f64, f64)> {
        result.ensure_ordered()?;
        self.locate_peak(&result.susceptibility_curve())
    }

    /// Fit γ in χ ∝ |ρ − ρ_c|^(−γ) over the `half_window` points on each
    /// side of the susceptibility peak. The peak itself and points with
    /// χ ≤ 0 are left out; at least three points must remain.
    pub fn susceptibility_exponent(
        &self,
        result: &SweepResult,
        half_window: usize,
    ) -> LatticeResult<SusceptibilityExponent> {
        if half_window == 0 {
            return Err(LatticeError::InvalidParameter(
                "susceptibility window needs at least one point per side".to_string(),
            ));
        }
        result.ensure_ordered()?;
        let curve = result.susceptibility_curve();
        let (rho_c, _) = self.locate_peak(&curve)?;
        let peak = curve.iter().position(|p| p.0 == rho_c).unwrap_or(0);
        let lo = peak.saturating_sub(half_window);
        let hi = (peak + half_window).min(curve.len() - 1);

        let (xs, ys): (Vec<f64>, Vec<f64>) = curve[lo..=hi]
            .iter()
            .enumerate()
            .filter(|(i, p)| lo + i != peak && p.1 > 0.0)
            .map(|(_, p)| ((p.0 - rho_c).abs().ln(), p.1.ln()))
            .unzip();
        if xs.len() < 3 {
            return Err(LatticeError::InsufficientData {
                required: 3,
                got: xs.len(),
            });
        }

        let n = xs.len() as f64;
        let mx = xs.iter().sum::<f64>() / n;
        let my = ys.iter().sum::<f64>() / n;
        let (mut sxx, mut sxy) = (0.0, 0.0);
        for (x, y) in xs.iter().zip(&ys) {
            sxx += (x - mx) * (x - mx);
            sxy += (x - mx) * (y - my);
        }
        if !(sxx > 0.0) {
            return Err(LatticeError::Numerical(
                "susceptibility points are equidistant from the peak".to_string(),
            ));
        }
        let slope = sxy / sxx;
        let rss: f64 = xs
            .iter()
            .zip(&ys)
            .map(|(x, y)| (y - my - slope * (x - mx)).powi(2))
            .sum();
        let standard_error = (rss / (n - 2.0) / sxx).sqrt();
        log::debug!(
            "susceptibility exponent L={}: ρ_c = {rho_c:.4}, γ = {:.4} ± {standard_error:.4} ({} points)",
            result.lattice_size,
            -slope,
            xs.len()
        );
        Ok(SusceptibilityExponent {
            lattice_size: result.lattice_size,
            rho_c,
            gamma: -slope,
            standard_error,
            n_points: xs.len(),
        })
    }
}

/// Index and value of the first maximum.
fn argmax_first(values: impl Iterator<Item = f64>) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, v) in values.enumerate() {
        if v > best.1 {
            best = (i, v);
        }
    }
    best
}

fn check_curve(curve: &[(f64, f64)], required: usize) -> LatticeResult<()> {
    if curve.len() < required {
        return Err(LatticeError::InsufficientData {
            required,
            got: curve.len(),
        });
    }
    if curve.windows(2).any(|w| !(w[1].0 > w[0].0)) {
        return Err(LatticeError::InvalidSweepRange(
            "curve must be strictly ascending in rho".to_string(),
        ));
    }
    if curve.iter().any(|p| !p.1.is_finite()) {
        return Err(LatticeError::Numerical(
            "curve contains non-finite metric values".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use infocond_types::{linspace, SweepPoint};

    fn chi_result(chi: impl Fn(f64) -> f64, n: usize) -> SweepResult {
        let points = linspace(0.0, 1.0, n)
            .into_iter()
            .map(|rho| SweepPoint {
                rho,
                susceptibility: chi(rho),
                ..SweepPoint::default()
            })
            .collect();
        SweepResult {
            lattice_size: 32,
            dimensions: 2,
            points,
        }
    }

    fn curve(ys: &[f64]) -> Vec<(f64, f64)> {
        linspace(0.0, 1.0, ys.len()).into_iter().zip(ys.iter().copied()).collect()
    }

    #[test]
    fn test_sharp_peak_at_index_three() {
        let c = curve(&[0.0, 0.01, 0.02, 0.5, 0.98, 0.99, 1.0]);
        let (rho_c, mag) = CriticalPointDetector::new().locate_curve(&c).unwrap();
        assert_eq!(rho_c, c[3].0);
        assert!((mag - (0.98 - 0.02) / (c[4].0 - c[2].0)).abs() < 1e-12);
    }

    #[test]
    fn test_negative_slope_uses_magnitude() {
        let c = curve(&[1.0, 0.99, 0.98, 0.1, 0.05, 0.04]);
        let (rho_c, _) = CriticalPointDetector::new().locate_curve(&c).unwrap();
        assert!(rho_c == c[2].0 || rho_c == c[3].0, "rho_c={rho_c}");
    }

    #[test]
    fn test_tie_breaks_to_smallest_rho() {
        let c = vec![(0.0, 0.0), (1.0, 2.0), (2.0, 4.0), (3.0, 6.0)];
        let (rho_c, mag) = CriticalPointDetector::new().locate_curve(&c).unwrap();
        assert_eq!(rho_c, 0.0);
        assert_eq!(mag, 2.0);
    }

    #[test]
    fn test_boundary_stencils() {
        let c = vec![(0.0, 0.0), (0.5, 1.0), (1.5, 1.0), (2.0, 3.0)];
        let d = CriticalPointDetector::new().derivative(&c).unwrap();
        assert_eq!(d, vec![2.0, 1.0 / 1.5, 2.0 / 1.5, 4.0]);
    }

    #[test]
    fn test_too_few_points() {
        let c = curve(&[0.0, 1.0]);
        assert_eq!(
            CriticalPointDetector::new().locate_curve(&c),
            Err(LatticeError::InsufficientData { required: 3, got: 2 })
        );
    }

    #[test]
    fn test_unordered_curve_rejected() {
        let c = vec![(0.0, 0.0), (0.5, 1.0), (0.4, 2.0)];
        assert!(matches!(
            CriticalPointDetector::new().derivative(&c),
            Err(LatticeError::InvalidSweepRange(_))
        ));
    }

    #[test]
    fn test_locate_on_sweep_result() {
        let ys = [0.1, 0.1, 0.2, 0.9, 0.95];
        let points = curve(&ys)
            .into_iter()
            .enumerate()
            .map(|(i, (rho, y))| {
                let mut p = SweepPoint {
                    rho,
                    susceptibility: if i == 1 { 3.0 } else { 1.0 },
                    ..SweepPoint::default()
                };
                p.values.insert("entropy".to_string(), y);
                p
            })
            .collect();
        let result = SweepResult {
            lattice_size: 16,
            dimensions: 2,
            points,
        };
        let det = CriticalPointDetector::new();
        let est = det.locate(&result, "entropy").unwrap();
        assert_eq!(est.rho_c, 0.5);
        assert_eq!(est.lattice_size, 16);
        assert_eq!(est.ci_width(), 0.0);
        assert!(det.locate(&result, "gradient").is_err());
        assert_eq!(det.locate_susceptibility_peak(&result).unwrap(), (0.25, 3.0));
    }

    #[test]
    fn test_susceptibility_exponent_recovers_power_law() {
        let result = chi_result(
            |rho| {
                let d = (rho - 0.5).abs();
                if d < 1e-9 {
                    1e6
                } else {
                    2.0 * d.powf(-1.5)
                }
            },
            21,
        );
        let gamma = CriticalPointDetector::new()
            .susceptibility_exponent(&result, 4)
            .unwrap();
        assert_eq!(gamma.rho_c, 0.5);
        assert_eq!(gamma.n_points, 8);
        assert!((gamma.gamma - 1.5).abs() < 1e-9, "gamma = {}", gamma.gamma);
        assert!(gamma.standard_error < 1e-6);
    }

    #[test]
    fn test_susceptibility_exponent_window_clipped_at_edge() {
        // peak at rho = 0.1, only one point to its left
        let result = chi_result(|rho| 1.0 / ((rho - 0.1).abs() + 0.05), 11);
        let gamma = CriticalPointDetector::new()
            .susceptibility_exponent(&result, 3)
            .unwrap();
        assert_eq!(gamma.rho_c, result.points[1].rho);
        assert_eq!(gamma.n_points, 4);
        assert!(gamma.gamma > 0.0);
    }

    #[test]
    fn test_susceptibility_exponent_needs_positive_points() {
        let det = CriticalPointDetector::new();
        let flat = chi_result(|_| 0.0, 9);
        assert!(matches!(
            det.susceptibility_exponent(&flat, 3),
            Err(LatticeError::InsufficientData { required: 3, got: 0 })
        ));
        let peaked = chi_result(|rho| 1.0 - (rho - 0.5).abs(), 9);
        assert!(matches!(
            det.susceptibility_exponent(&peaked, 0),
            Err(LatticeError::InvalidParameter(_))
        ));
    }
}
