// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Snapshot Metrics
// ─────────────────────────────────────────────────────────────────────
//! Pure reductions of one lattice snapshot to a scalar conductivity.
//!
//! Every function reads the lattice through its shape and strides, so
//! 2-D and 3-D grids share one formula and differ only in axis count.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use infocond_lattice::Lattice;
use infocond_types::record::{mean, variance as population_variance};
use infocond_types::{LatticeError, LatticeResult};

/// Mean activity ⟨x⟩.
pub fn simple(grid: &Lattice) -> f64 {
    mean(grid.values())
}

/// Population variance of the cell values.
pub fn variance(grid: &Lattice) -> f64 {
    population_variance(grid.values())
}

/// Shannon entropy (nats) of the cell values binned into `bins` equal-width
/// buckets over [0, 1]. Values outside the range fall into the edge buckets.
///
/// A single populated bucket gives 0; an even spread over all buckets gives ln(bins).
pub fn entropy(grid: &Lattice, bins: usize) -> LatticeResult<f64> {
    if bins == 0 {
        return Err(LatticeError::InvalidParameter(
            "entropy needs at least one bin".to_string(),
        ));
    }
    let mut counts = vec![0usize; bins];
    for &v in grid.values() {
        let b = (v * bins as f64).floor();
        let b = if b < 0.0 { 0 } else { (b as usize).min(bins - 1) };
        counts[b] += 1;
    }

    let n = grid.len() as f64;
    let h: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.ln()
        })
        .sum();
    Ok(h.max(0.0))
}

/// Differential entropy ½·ln(2πeσ²) of a Gaussian with the grid's variance,
/// clamped at 0. Zero variance gives 0.
pub fn gaussian_entropy(grid: &Lattice) -> f64 {
    let var = variance(grid);
    if var <= 0.0 {
        return 0.0;
    }
    let h = 0.5 * (2.0 * std::f64::consts::PI * std::f64::consts::E * var).ln();
    h.max(0.0)
}

/// Mean Euclidean norm of the discrete gradient.
///
/// Central differences in the interior, one-sided differences at the
/// edges, zero along axes of extent 1. The boundary policy is ignored.
pub fn gradient(grid: &Lattice) -> f64 {
    let shape = grid.shape();
    let values = grid.values();
    let total: f64 = (0..values.len())
        .map(|idx| {
            (0..shape.ndim())
                .map(|axis| axis_derivative(grid, idx, axis).powi(2))
                .sum::<f64>()
                .sqrt()
        })
        .sum();
    total / values.len() as f64
}

#[inline]
fn axis_derivative(grid: &Lattice, idx: usize, axis: usize) -> f64 {
    let shape = grid.shape();
    let values = grid.values();
    let extent = shape.dims()[axis];
    if extent < 2 {
        return 0.0;
    }
    let stride = shape.strides()[axis];
    let pos = shape.coord(idx, axis);
    if pos == 0 {
        values[idx + stride] - values[idx]
    } else if pos == extent - 1 {
        values[idx] - values[idx - stride]
    } else {
        0.5 * (values[idx + stride] - values[idx - stride])
    }
}

/// Downsample by averaging non-overlapping `scale^d` blocks.
///
/// Trailing cells that do not fill a whole block are dropped. Scale 1
/// returns a copy.
pub fn block_average(grid: &Lattice, scale: usize) -> LatticeResult<Lattice> {
    let dims = grid.shape().dims();
    if scale == 0 || dims.iter().any(|&d| scale > d) {
        return Err(LatticeError::InvalidParameter(format!(
            "block scale {scale} does not fit shape {dims:?}"
        )));
    }
    if scale == 1 {
        return Ok(grid.clone());
    }

    let coarse: Vec<usize> = dims.iter().map(|&d| d / scale).collect();
    let mut coarse_strides = vec![1usize; coarse.len()];
    for axis in (0..coarse.len() - 1).rev() {
        coarse_strides[axis] = coarse_strides[axis + 1] * coarse[axis + 1];
    }
    let n_coarse: usize = coarse.iter().product();
    let mut sums = vec![0.0; n_coarse];

    let shape = grid.shape();
    'cells: for (idx, &v) in grid.values().iter().enumerate() {
        let mut target = 0;
        for axis in 0..shape.ndim() {
            let block = shape.coord(idx, axis) / scale;
            if block >= coarse[axis] {
                continue 'cells;
            }
            target += block * coarse_strides[axis];
        }
        sums[target] += v;
    }

    let block_cells = scale.pow(shape.ndim() as u32) as f64;
    let values = sums.into_iter().map(|s| s / block_cells).collect();
    Lattice::from_values(&coarse, grid.boundary(), values)
}

/// Observables of one downsampled view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleMetrics {
    /// Shape after block averaging.
    pub shape: Vec<usize>,
    pub simple: f64,
    pub entropy: f64,
    pub gradient: f64,
}

/// Entropy and gradient of the grid at each block-averaging scale.
///
/// Scales of 0 or larger than the smallest extent are skipped with a warning.
pub fn multiscale(
    grid: &Lattice,
    scales: &[usize],
    bins: usize,
) -> LatticeResult<BTreeMap<usize, ScaleMetrics>> {
    let min_extent = grid.shape().dims().iter().copied().min().unwrap_or(0);
    let mut out = BTreeMap::new();
    for &scale in scales {
        if scale == 0 || scale > min_extent {
            log::warn!(
                "multiscale: skipping scale {scale} for shape {:?}",
                grid.shape().dims()
            );
            continue;
        }
        let coarse = block_average(grid, scale)?;
        out.insert(
            scale,
            ScaleMetrics {
                shape: coarse.shape().dims().to_vec(),
                simple: simple(&coarse),
                entropy: entropy(&coarse, bins)?,
                gradient: gradient(&coarse),
            },
        );
    }
    Ok(out)
}
