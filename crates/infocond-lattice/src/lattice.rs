// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Lattice State
// ─────────────────────────────────────────────────────────────────────
//! Dense row-major lattice of occupancy values over a 2-D or 3-D grid.
//!
//! Neighbourhood: face-adjacent cells only (4 in 2-D, 6 in 3-D).
//! Boundary conventions:
//!   - periodic:  index −1 wraps to n−1, index n wraps to 0
//!   - zero-flux: a missing neighbour is replaced by the cell itself
//!
//! Both conventions give a symmetric averaging operator, so the
//! synchronous update conserves the lattice sum.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Beta, Distribution, Normal};
use serde::{Deserialize, Serialize};

use infocond_types::{
    validate_shape, Boundary, FillPolicy, LatticeConfig, LatticeError, LatticeResult,
};

/// Axis extents with precomputed row-major strides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
    strides: Vec<usize>,
    len: usize,
}

impl Shape {
    /// Fails with `InvalidShape` unless rank is 2 or 3 and every extent is positive.
    pub fn new(dims: &[usize]) -> LatticeResult<Self> {
        validate_shape(dims)?;
        let mut strides = vec![1; dims.len()];
        for axis in (0..dims.len() - 1).rev() {
            strides[axis] = strides[axis + 1] * dims[axis + 1];
        }
        Ok(Self {
            dims: dims.to_vec(),
            strides,
            len: dims.iter().product(),
        })
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Position of flat index `idx` along `axis`.
    #[inline]
    pub fn coord(&self, idx: usize, axis: usize) -> usize {
        (idx / self.strides[axis]) % self.dims[axis]
    }

    /// Flat index of a coordinate tuple.
    #[inline]
    pub fn index(&self, coords: &[usize]) -> usize {
        coords
            .iter()
            .zip(self.strides.iter())
            .map(|(&c, &s)| c * s)
            .sum()
    }
}

/// Shape plus boundary policy: everything a stencil needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    shape: Shape,
    boundary: Boundary,
}

impl Geometry {
    pub fn new(shape: Shape, boundary: Boundary) -> Self {
        Self { shape, boundary }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// Number of face-adjacent neighbours (2·d).
    pub fn coordination(&self) -> usize {
        2 * self.shape.ndim()
    }

    /// Lower and upper neighbour of `idx` along `axis`.
    #[inline]
    pub fn neighbours(&self, idx: usize, axis: usize) -> (usize, usize) {
        let stride = self.shape.strides[axis];
        let extent = self.shape.dims[axis];
        let pos = (idx / stride) % extent;
        let wrap = (extent - 1) * stride;

        let lo = if pos > 0 {
            idx - stride
        } else {
            match self.boundary {
                Boundary::Periodic => idx + wrap,
                Boundary::ZeroFlux => idx,
            }
        };
        let hi = if pos + 1 < extent {
            idx + stride
        } else {
            match self.boundary {
                Boundary::Periodic => idx - wrap,
                Boundary::ZeroFlux => idx,
            }
        };
        (lo, hi)
    }

    /// Arithmetic mean of the face-adjacent neighbours of `idx`.
    ///
    /// Summation order is fixed (axis 0 first, lower before upper) so every
    /// backend produces bit-identical results.
    #[inline]
    pub fn neighbour_mean(&self, values: &[f64], idx: usize) -> f64 {
        let mut sum = 0.0;
        for axis in 0..self.shape.ndim() {
            let (lo, hi) = self.neighbours(idx, axis);
            sum += values[lo];
            sum += values[hi];
        }
        sum / self.coordination() as f64
    }
}

/// Lattice snapshot: geometry plus one value per cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    geometry: Geometry,
    values: Vec<f64>,
}

impl Lattice {
    /// Create a lattice of `shape`, filled by `fill` from a ChaCha stream keyed by `seed`.
    pub fn initialize(
        shape: &[usize],
        boundary: Boundary,
        fill: &FillPolicy,
        seed: u64,
    ) -> LatticeResult<Self> {
        let shape = Shape::new(shape)?;
        fill.validate()?;
        let n = shape.len();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let values = match fill {
            FillPolicy::Uniform => (0..n).map(|_| rng.random::<f64>()).collect(),
            FillPolicy::Constant { value } => vec![*value; n],
            FillPolicy::Normal { mean, std_dev } => {
                let dist = Normal::new(*mean, *std_dev)
                    .map_err(|e| LatticeError::InvalidParameter(format!("normal fill: {e}")))?;
                (0..n).map(|_| dist.sample(&mut rng).clamp(0.0, 1.0)).collect()
            }
            FillPolicy::Beta { alpha, beta } => {
                let dist = Beta::new(*alpha, *beta)
                    .map_err(|e| LatticeError::InvalidParameter(format!("beta fill: {e}")))?;
                (0..n).map(|_| dist.sample(&mut rng).clamp(0.0, 1.0)).collect()
            }
            FillPolicy::Values { values } => {
                if values.len() != n {
                    return Err(LatticeError::InvalidShape(format!(
                        "explicit fill has {} values, shape {:?} needs {n}",
                        values.len(),
                        shape.dims()
                    )));
                }
                values.clone()
            }
        };

        Ok(Self {
            geometry: Geometry::new(shape, boundary),
            values,
        })
    }

    pub fn from_config(config: &LatticeConfig) -> LatticeResult<Self> {
        Self::initialize(&config.shape, config.boundary, &config.fill, config.seed)
    }

    /// Wrap existing row-major values; values must be finite.
    pub fn from_values(shape: &[usize], boundary: Boundary, values: Vec<f64>) -> LatticeResult<Self> {
        let shape = Shape::new(shape)?;
        if values.len() != shape.len() {
            return Err(LatticeError::InvalidShape(format!(
                "{} values do not fill shape {:?} ({} cells)",
                values.len(),
                shape.dims(),
                shape.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(LatticeError::InvalidParameter(
                "lattice values must be finite".to_string(),
            ));
        }
        Ok(Self {
            geometry: Geometry::new(shape, boundary),
            values,
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn shape(&self) -> &Shape {
        &self.geometry.shape
    }

    pub fn boundary(&self) -> Boundary {
        self.geometry.boundary
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sum of all cells (the conserved mass).
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        self.total() / self.values.len() as f64
    }

    pub fn get(&self, coords: &[usize]) -> Option<f64> {
        if coords.len() != self.shape().ndim()
            || coords.iter().zip(self.shape().dims()).any(|(&c, &d)| c >= d)
        {
            return None;
        }
        Some(self.values[self.shape().index(coords)])
    }

    /// Swap the cell buffer with `next`; used by the double-buffered engine.
    pub(crate) fn swap_values(&mut self, next: &mut Vec<f64>) {
        std::mem::swap(&mut self.values, next);
    }
}
