//! # Weighted least-squares solve
//!
//! Forms and solves the apriori-regularized weighted normal equations
//!
//! ```text
//! (JᵗWJ + P0⁻¹) Δx = JᵗW r
//! ```
//!
//! where `J` is the (normalized) design matrix, `W` the diagonal weight
//! matrix, `r` the residual vector and `P0⁻¹` the inverse apriori covariance
//! expressed in the same normalized units as `J`. The normal matrix is
//! symmetric positive definite whenever the system is solvable, so a
//! Cholesky factorization does the solve; its failure is the
//! rank-deficiency signal.

use nalgebra::{Cholesky, DMatrix, DVector};

use crate::podfit_errors::PodfitError;

/// Solve the weighted, apriori-regularized normal equations.
///
/// Arguments
/// -----------------
/// * `design`: design matrix `J`, one row per observation.
/// * `residuals`: residual vector `r`, same row order as `design`.
/// * `weights`: diagonal of `W`, same row order as `design`.
/// * `inverse_apriori`: `P0⁻¹` in the design matrix's (normalized) units;
///   all-zero for an unconstrained solve.
///
/// Return
/// ----------
/// * `(correction, normal_matrix)` where `normal_matrix = JᵗWJ + P0⁻¹` is the
///   inverse covariance of the correction in normalized units, or
///   [`PodfitError::SingularNormalEquations`] when the factorization fails.
pub fn solve_normal_equations(
    design: &DMatrix<f64>,
    residuals: &DVector<f64>,
    weights: &DVector<f64>,
    inverse_apriori: &DMatrix<f64>,
) -> Result<(DVector<f64>, DMatrix<f64>), PodfitError> {
    // W J by row scaling; avoids materializing the diagonal weight matrix.
    let mut weighted_design = design.clone();
    for (row_index, weight) in weights.iter().enumerate() {
        weighted_design.row_mut(row_index).scale_mut(*weight);
    }

    let normal_matrix = design.transpose() * &weighted_design + inverse_apriori;
    let right_hand_side = design.transpose() * weights.component_mul(residuals);

    let factorization =
        Cholesky::new(normal_matrix.clone()).ok_or(PodfitError::SingularNormalEquations)?;
    let correction = factorization.solve(&right_hand_side);

    Ok((correction, normal_matrix))
}

/// Root mean square of a residual vector.
pub fn residual_rms(residuals: &DVector<f64>) -> f64 {
    (residuals.norm_squared() / residuals.len() as f64).sqrt()
}
