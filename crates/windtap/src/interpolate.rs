//! Exact scattered-data interpolation with radial basis functions.
//!
//! Each tap reading is authoritative, so the interpolant passes exactly
//! through every sample: the dense basis system is solved as-is, with no
//! smoothing or regularization knob. A singular system (coincident taps)
//! is reported, not patched over.

use nalgebra::{DMatrix, DVector, Point3};
use rayon::prelude::*;
use tracing::debug;

use crate::error::InterpolationError;
use crate::types::{ScatteredField, SurfaceGrid, VertexField};

/// Minimum sample count for a stable fit.
pub const MIN_SAMPLES: usize = 4;

/// Basis function for the interpolant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RbfKernel {
    /// `sqrt((r/eps)^2 + 1)`. Smooth and globally supported; the default.
    #[default]
    Multiquadric,

    /// `1 / sqrt((r/eps)^2 + 1)`.
    InverseMultiquadric,

    /// `exp(-(r/eps)^2)`.
    Gaussian,

    /// `r^2 ln(r)`.
    ThinPlateSpline,
}

fn evaluate_kernel(kernel: RbfKernel, r: f64, eps: f64) -> f64 {
    match kernel {
        RbfKernel::Multiquadric => {
            let s = r / eps;
            (s * s + 1.0).sqrt()
        }
        RbfKernel::InverseMultiquadric => {
            let s = r / eps;
            1.0 / (s * s + 1.0).sqrt()
        }
        RbfKernel::Gaussian => {
            let s = r / eps;
            (-s * s).exp()
        }
        RbfKernel::ThinPlateSpline => {
            if r < 1e-12 {
                0.0
            } else {
                r * r * r.ln()
            }
        }
    }
}

/// A fitted radial-basis interpolant over a 3D scatter.
#[derive(Debug, Clone)]
pub struct Rbf {
    kernel: RbfKernel,
    epsilon: f64,
    centers: Vec<Point3<f64>>,
    weights: DVector<f64>,
}

impl Rbf {
    /// Fit with the default multiquadric kernel.
    pub fn fit(field: &ScatteredField) -> Result<Self, InterpolationError> {
        Self::fit_with_kernel(field, RbfKernel::default())
    }

    /// Fit the interpolant through every sample of `field`.
    pub fn fit_with_kernel(
        field: &ScatteredField,
        kernel: RbfKernel,
    ) -> Result<Self, InterpolationError> {
        let n = field.len();
        if n < MIN_SAMPLES {
            return Err(InterpolationError::TooFewSamples {
                found: n,
                required: MIN_SAMPLES,
            });
        }

        let centers: Vec<Point3<f64>> = field.samples.iter().map(|s| s.position).collect();

        // Shape parameter: mean distance over all sample pairs.
        let epsilon = mean_pairwise_distance(&centers);
        if epsilon <= 0.0 {
            return Err(InterpolationError::Singular {
                details: "all sample coordinates coincide".to_string(),
            });
        }

        let mut matrix = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                let r = (centers[i] - centers[j]).norm();
                matrix[(i, j)] = evaluate_kernel(kernel, r, epsilon);
            }
        }

        let rhs = DVector::from_iterator(n, field.samples.iter().map(|s| s.value));

        let weights = matrix
            .lu()
            .solve(&rhs)
            .ok_or_else(|| InterpolationError::Singular {
                details: "basis matrix is not invertible (duplicate tap coordinates?)"
                    .to_string(),
            })?;

        debug!(
            samples = n,
            kernel = format!("{:?}", kernel),
            epsilon = format!("{:.4}", epsilon),
            "Fitted RBF interpolant"
        );

        Ok(Self {
            kernel,
            epsilon,
            centers,
            weights,
        })
    }

    /// Evaluate the interpolant at each query point, one output per query.
    pub fn evaluate(&self, queries: &[Point3<f64>]) -> Vec<f64> {
        queries.par_iter().map(|q| self.evaluate_one(q)).collect()
    }

    /// Evaluate at every grid vertex, in vertex order.
    pub fn evaluate_on_grid(&self, grid: &SurfaceGrid) -> VertexField {
        VertexField::new(self.evaluate(&grid.points))
    }

    fn evaluate_one(&self, query: &Point3<f64>) -> f64 {
        self.centers
            .iter()
            .zip(self.weights.iter())
            .map(|(center, &w)| {
                w * evaluate_kernel(self.kernel, (query - center).norm(), self.epsilon)
            })
            .sum()
    }

    pub fn kernel(&self) -> RbfKernel {
        self.kernel
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

fn mean_pairwise_distance(points: &[Point3<f64>]) -> f64 {
    let n = points.len();
    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            total += (points[i] - points[j]).norm();
            pairs += 1;
        }
    }
    if pairs == 0 { 0.0 } else { total / pairs as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sample;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    // Side length 2: a unit tetrahedron has r = 1 pair distances, where
    // the thin-plate kernel vanishes and its basis matrix goes singular.
    fn tetra_field() -> ScatteredField {
        ScatteredField::new(vec![
            Sample { position: Point3::new(0.0, 0.0, 0.0), value: 1.0 },
            Sample { position: Point3::new(2.0, 0.0, 0.0), value: 2.0 },
            Sample { position: Point3::new(0.0, 2.0, 0.0), value: -3.0 },
            Sample { position: Point3::new(0.0, 0.0, 2.0), value: 0.5 },
        ])
    }

    #[test]
    fn test_exact_interpolation_at_samples() {
        let field = tetra_field();
        let rbf = Rbf::fit(&field).unwrap();
        let queries: Vec<Point3<f64>> = field.samples.iter().map(|s| s.position).collect();
        let values = rbf.evaluate(&queries);
        for (sample, value) in field.samples.iter().zip(values) {
            assert!(
                approx_eq(sample.value, value),
                "expected {} got {}",
                sample.value,
                value
            );
        }
    }

    #[test]
    fn test_exact_interpolation_all_kernels() {
        let field = tetra_field();
        for kernel in [
            RbfKernel::Multiquadric,
            RbfKernel::InverseMultiquadric,
            RbfKernel::Gaussian,
            RbfKernel::ThinPlateSpline,
        ] {
            let rbf = Rbf::fit_with_kernel(&field, kernel).unwrap();
            let values = rbf.evaluate(&[field.samples[2].position]);
            assert!(
                approx_eq(values[0], -3.0),
                "{:?}: expected -3.0 got {}",
                kernel,
                values[0]
            );
        }
    }

    #[test]
    fn test_too_few_samples() {
        let mut field = tetra_field();
        field.samples.truncate(3);
        let err = Rbf::fit(&field).unwrap_err();
        assert!(matches!(
            err,
            InterpolationError::TooFewSamples { found: 3, required: 4 }
        ));
    }

    #[test]
    fn test_coincident_samples_are_singular() {
        let mut field = tetra_field();
        field.samples[1].position = field.samples[0].position;
        let err = Rbf::fit(&field).unwrap_err();
        assert!(matches!(err, InterpolationError::Singular { .. }));
    }

    #[test]
    fn test_square_center_prediction_matches_closed_form() {
        // Equal values at the 4 corners of a unit square: by symmetry all
        // weights are equal, w = v0 / (phi(0) + 2 phi(1) + phi(sqrt 2)),
        // and the center prediction is 4 w phi(sqrt 2 / 2).
        let v0 = 2.0;
        let field = ScatteredField::new(vec![
            Sample { position: Point3::new(0.0, 0.0, 0.0), value: v0 },
            Sample { position: Point3::new(1.0, 0.0, 0.0), value: v0 },
            Sample { position: Point3::new(1.0, 1.0, 0.0), value: v0 },
            Sample { position: Point3::new(0.0, 1.0, 0.0), value: v0 },
        ]);
        let rbf = Rbf::fit(&field).unwrap();

        let sqrt2 = 2.0_f64.sqrt();
        let eps = (4.0 + 2.0 * sqrt2) / 6.0;
        let phi = |r: f64| ((r / eps).powi(2) + 1.0).sqrt();
        let expected = 4.0 * v0 * phi(sqrt2 / 2.0) / (phi(0.0) + 2.0 * phi(1.0) + phi(sqrt2));

        assert!(approx_eq(rbf.epsilon(), eps));
        let center = rbf.evaluate(&[Point3::new(0.5, 0.5, 0.0)]);
        assert!(
            approx_eq(center[0], expected),
            "expected {} got {}",
            expected,
            center[0]
        );
    }

    #[test]
    fn test_evaluate_output_per_query() {
        let rbf = Rbf::fit(&tetra_field()).unwrap();
        let queries = vec![
            Point3::new(0.2, 0.2, 0.2),
            Point3::new(0.8, 0.1, 0.0),
            Point3::new(0.0, 0.0, 0.0),
        ];
        assert_eq!(rbf.evaluate(&queries).len(), 3);
    }
}
