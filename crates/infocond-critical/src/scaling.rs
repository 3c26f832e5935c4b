// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Finite-Size Scaling
// ─────────────────────────────────────────────────────────────────────
//! Least-squares fit of
//!
//!   ρ_c(L) = ρ_c(∞) + A · L^(−ω),   ω = 1/ν
//!
//! For fixed ω the model is linear in (ρ_c(∞), A), so the fit is a 1-D
//! search over ω (variable projection): a coarse grid on
//! [1/ν_max, 1/ν_min] followed by golden-section refinement around the
//! best grid point. Standard errors come from s²·(JᵀJ)⁻¹ at the optimum,
//! with J the Jacobian in (ρ_c(∞), A, ω); se(ν) = se(ω)/ω².
//!
//! Linear mode fixes ω = 1 (ρ_c(L) = ρ_c(∞) + A/L) and reports ν = 1.

use infocond_types::{
    CriticalPointEstimate, LatticeError, LatticeResult, ScalingConfig, ScalingEstimate,
    ScalingMode, StandardErrors,
};

const GOLDEN: f64 = 0.618_033_988_749_894_9;
const MAX_REFINE_ITERS: usize = 200;

/// ρ_c(L) predicted by a fitted estimate.
pub fn predict(estimate: &ScalingEstimate, lattice_size: usize) -> f64 {
    estimate.rho_c_infinite + estimate.amplitude * (lattice_size as f64).powf(-1.0 / estimate.nu)
}

/// Straight-line fit y = a + b·x at one exponent.
#[derive(Debug, Clone, Copy)]
struct LinearFit {
    intercept: f64,
    slope: f64,
    rss: f64,
}

fn fit_line(xs: &[f64], ys: &[f64]) -> LatticeResult<LinearFit> {
    let n = xs.len() as f64;
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;
    let (mut sxx, mut sxy) = (0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        sxx += (x - mx) * (x - mx);
        sxy += (x - mx) * (y - my);
    }
    if !(sxx > 0.0) {
        return Err(LatticeError::Numerical(
            "scaling regressor has no spread".to_string(),
        ));
    }
    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let rss = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (y - intercept - slope * x).powi(2))
        .sum();
    Ok(LinearFit {
        intercept,
        slope,
        rss,
    })
}

/// Lower Cholesky factor of a k×k SPD matrix; `None` if not positive definite.
fn cholesky(m: &[f64], k: usize) -> Option<Vec<f64>> {
    let mut l = vec![0.0; k * k];
    for i in 0..k {
        for j in 0..=i {
            let mut sum = m[i * k + j];
            for p in 0..j {
                sum -= l[i * k + p] * l[j * k + p];
            }
            if i == j {
                if !(sum > 1e-300) {
                    return None;
                }
                l[i * k + j] = sum.sqrt();
            } else {
                l[i * k + j] = sum / l[j * k + j];
            }
        }
    }
    Some(l)
}

/// Diagonal of M⁻¹ for SPD M, via k Cholesky solves.
fn inverse_diagonal(m: &[f64], k: usize) -> Option<Vec<f64>> {
    let l = cholesky(m, k)?;
    let mut diag = vec![0.0; k];
    for (col, d) in diag.iter_mut().enumerate() {
        // L·y = e_col
        let mut y = vec![0.0; k];
        for i in 0..k {
            let mut sum = if i == col { 1.0 } else { 0.0 };
            for j in 0..i {
                sum -= l[i * k + j] * y[j];
            }
            y[i] = sum / l[i * k + i];
        }
        // Lᵀ·x = y
        let mut x = vec![0.0; k];
        for i in (0..k).rev() {
            let mut sum = y[i];
            for j in (i + 1)..k {
                sum -= l[j * k + i] * x[j];
            }
            x[i] = sum / l[i * k + i];
        }
        *d = x[col];
    }
    Some(diag)
}

/// Standard errors from Jacobian rows, or `None` per parameter when
/// there are no residual degrees of freedom or JᵀJ is singular.
fn standard_errors(rows: &[Vec<f64>], rss: f64) -> Vec<Option<f64>> {
    let k = rows.first().map_or(0, Vec::len);
    let dof = rows.len().saturating_sub(k);
    if dof == 0 {
        return vec![None; k];
    }
    let mut jtj = vec![0.0; k * k];
    for row in rows {
        for a in 0..k {
            for b in 0..k {
                jtj[a * k + b] += row[a] * row[b];
            }
        }
    }
    let s2 = rss / dof as f64;
    match inverse_diagonal(&jtj, k) {
        Some(diag) => diag.into_iter().map(|v| Some((s2 * v).max(0.0).sqrt())).collect(),
        None => {
            log::warn!("scaling fit: singular normal matrix, standard errors unavailable");
            vec![None; k]
        }
    }
}

/// Finite-size extrapolation of critical points across lattice sizes.
#[derive(Debug, Clone)]
pub struct FiniteSizeScaling {
    config: ScalingConfig,
}

impl FiniteSizeScaling {
    pub fn new(config: ScalingConfig) -> LatticeResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Fit bootstrap/point estimates of one metric across sizes.
    pub fn fit_estimates(&self, estimates: &[CriticalPointEstimate]) -> LatticeResult<ScalingEstimate> {
        let metric = estimates.first().map(|e| e.metric.clone()).unwrap_or_default();
        if let Some(other) = estimates.iter().find(|e| e.metric != metric) {
            return Err(LatticeError::InvalidParameter(format!(
                "estimates mix metrics '{metric}' and '{}'",
                other.metric
            )));
        }
        let data: Vec<(usize, f64)> = estimates.iter().map(|e| (e.lattice_size, e.rho_c)).collect();
        self.fit(&metric, &data)
    }

    /// Fit `(L, ρ_c(L))` pairs. Repeated sizes are allowed; at least two
    /// distinct sizes are required, three for the full fit.
    pub fn fit(&self, metric: &str, data: &[(usize, f64)]) -> LatticeResult<ScalingEstimate> {
        if let Some(&(l, rho)) = data.iter().find(|(l, rho)| *l == 0 || !rho.is_finite()) {
            return Err(LatticeError::InvalidParameter(format!(
                "scaling data needs positive sizes and finite rho_c, got ({l}, {rho})"
            )));
        }
        let mut sizes: Vec<usize> = data.iter().map(|d| d.0).collect();
        sizes.sort_unstable();
        sizes.dedup();
        let distinct = sizes.len();
        if distinct < 2 {
            return Err(LatticeError::InsufficientSizes {
                required: 2,
                got: distinct,
            });
        }

        let mode = match self.config.mode {
            ScalingMode::Auto if distinct >= 3 => ScalingMode::Full,
            ScalingMode::Auto => ScalingMode::Linear,
            ScalingMode::Full if distinct < 3 => {
                return Err(LatticeError::InsufficientSizes {
                    required: 3,
                    got: distinct,
                })
            }
            mode => mode,
        };

        let ls: Vec<f64> = data.iter().map(|d| d.0 as f64).collect();
        let ys: Vec<f64> = data.iter().map(|d| d.1).collect();
        let estimate = match mode {
            ScalingMode::Full => self.fit_full(metric, &ls, &ys)?,
            _ => fit_linear(metric, &ls, &ys)?,
        };
        log::info!(
            "scaling fit '{}' ({:?}, {} points): ρ_c(∞) = {:.5}, ν = {:.4}, A = {:.4}",
            estimate.metric,
            estimate.mode,
            estimate.n_points,
            estimate.rho_c_infinite,
            estimate.nu,
            estimate.amplitude
        );
        Ok(estimate)
    }

    fn fit_full(&self, metric: &str, ls: &[f64], ys: &[f64]) -> LatticeResult<ScalingEstimate> {
        let at = |omega: f64| -> LatticeResult<LinearFit> {
            let xs: Vec<f64> = ls.iter().map(|l| l.powf(-omega)).collect();
            fit_line(&xs, ys)
        };

        // ── Coarse grid ──
        let lo = 1.0 / self.config.nu_max;
        let hi = 1.0 / self.config.nu_min;
        let n = self.config.grid_points;
        let grid: Vec<f64> = (0..n)
            .map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64)
            .collect();
        let mut best = (0, f64::INFINITY);
        for (i, &omega) in grid.iter().enumerate() {
            let rss = at(omega)?.rss;
            if rss < best.1 {
                best = (i, rss);
            }
        }

        // ── Golden-section refinement ──
        let (mut a, mut b) = (grid[best.0.saturating_sub(1)], grid[(best.0 + 1).min(n - 1)]);
        let mut c = b - GOLDEN * (b - a);
        let mut d = a + GOLDEN * (b - a);
        let mut fc = at(c)?.rss;
        let mut fd = at(d)?.rss;
        for _ in 0..MAX_REFINE_ITERS {
            if b - a < 1e-12 {
                break;
            }
            if fc < fd {
                b = d;
                d = c;
                fd = fc;
                c = b - GOLDEN * (b - a);
                fc = at(c)?.rss;
            } else {
                a = c;
                c = d;
                fc = fd;
                d = a + GOLDEN * (b - a);
                fd = at(d)?.rss;
            }
        }
        let mut omega = 0.5 * (a + b);
        let mut fit = at(omega)?;
        if fit.rss > best.1 {
            omega = grid[best.0];
            fit = at(omega)?;
        }
        if best.0 == 0 || best.0 == n - 1 {
            log::warn!("scaling fit '{metric}': optimum at the edge of the ν search interval");
        }

        let rows: Vec<Vec<f64>> = ls
            .iter()
            .map(|&l| {
                let x = l.powf(-omega);
                vec![1.0, x, -fit.slope * l.ln() * x]
            })
            .collect();
        let se = standard_errors(&rows, fit.rss);

        Ok(ScalingEstimate {
            metric: metric.to_string(),
            rho_c_infinite: fit.intercept,
            amplitude: fit.slope,
            nu: 1.0 / omega,
            standard_errors: StandardErrors {
                rho_c_infinite: se[0],
                amplitude: se[1],
                nu: se[2].map(|s| s / (omega * omega)),
            },
            residual_sum_squares: fit.rss,
            n_points: ls.len(),
            mode: ScalingMode::Full,
        })
    }
}

fn fit_linear(metric: &str, ls: &[f64], ys: &[f64]) -> LatticeResult<ScalingEstimate> {
    let xs: Vec<f64> = ls.iter().map(|l| 1.0 / l).collect();
    let fit = fit_line(&xs, ys)?;
    let rows: Vec<Vec<f64>> = xs.iter().map(|&x| vec![1.0, x]).collect();
    let se = standard_errors(&rows, fit.rss);
    Ok(ScalingEstimate {
        metric: metric.to_string(),
        rho_c_infinite: fit.intercept,
        amplitude: fit.slope,
        nu: 1.0,
        standard_errors: StandardErrors {
            rho_c_infinite: se[0],
            amplitude: se[1],
            nu: None,
        },
        residual_sum_squares: fit.rss,
        n_points: ls.len(),
        mode: ScalingMode::Linear,
    })
}
