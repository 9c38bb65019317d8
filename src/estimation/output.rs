//! # Estimation output
//!
//! [`EstimationOutput`] is the immutable snapshot of the **best** iteration
//! of a run: the iteration with the lowest RMS residual, which is not
//! necessarily the last one. It carries everything needed to interpret that
//! iterate — parameters, residuals, weights, normalization terms, the inverse
//! normalized covariance — plus the optional per-iteration histories the run
//! flags requested.
//!
//! Covariance accessors undo the column normalization, so
//! [`covariance`](EstimationOutput::covariance),
//! [`correlation_matrix`](EstimationOutput::correlation_matrix) and
//! [`formal_errors`](EstimationOutput::formal_errors) are all expressed in
//! physical parameter units.

use nalgebra::{DMatrix, DVector};

use crate::estimation::convergence::StopReason;
use crate::podfit_errors::PodfitError;
use crate::propagation::StateHistory;

/// Result of an estimation run: the best-iterate snapshot plus histories.
#[derive(Debug, Clone)]
pub struct EstimationOutput {
    /// Parameter estimate of the best iteration.
    pub parameters: DVector<f64>,
    /// Residual vector of the best iteration, in stacking order.
    pub residuals: DVector<f64>,
    /// RMS of `residuals`.
    pub rms: f64,
    /// Flat weight vector, same stacking order as `residuals`.
    pub weights: DVector<f64>,
    /// Column scale factors applied to the design matrix of the best iteration.
    pub normalization_terms: DVector<f64>,
    /// Normal-equations matrix `JᵗWJ + P0⁻¹` of the best iteration, in
    /// normalized units.
    pub inverse_normalized_covariance: DMatrix<f64>,
    /// Normalized design matrix of the best iteration, when retention was
    /// requested.
    pub information_matrix: Option<DMatrix<f64>>,
    /// Number of iterations the run performed.
    pub iterations: usize,
    /// Which stopping rule ended the run.
    pub stop_reason: StopReason,
    /// RMS residual of every iteration, in order.
    pub rms_history: Vec<f64>,
    /// Residual vector of every iteration, when retention was requested.
    pub residual_history: Vec<DVector<f64>>,
    /// Parameter vector per iteration (including the pre-update initial
    /// estimate), when retention was requested.
    pub parameter_history: Vec<DVector<f64>>,
    /// Propagated state history per iteration, when retention was requested.
    pub state_history_per_iteration: Vec<StateHistory>,
}

impl EstimationOutput {
    /// Covariance of the estimated parameters, in physical units.
    ///
    /// Inverts the normalized normal-equations matrix and divides entry
    /// `(i, j)` by `scale[i]·scale[j]` to undo the column normalization.
    ///
    /// Return
    /// ----------
    /// * The covariance matrix, or [`PodfitError::SingularNormalEquations`]
    ///   if the normal matrix cannot be inverted.
    pub fn covariance(&self) -> Result<DMatrix<f64>, PodfitError> {
        let normalized = self
            .inverse_normalized_covariance
            .clone()
            .try_inverse()
            .ok_or(PodfitError::SingularNormalEquations)?;
        let scale = &self.normalization_terms;
        Ok(DMatrix::from_fn(normalized.nrows(), normalized.ncols(), |i, j| {
            normalized[(i, j)] / (scale[i] * scale[j])
        }))
    }

    /// Correlation matrix of the estimated parameters.
    pub fn correlation_matrix(&self) -> Result<DMatrix<f64>, PodfitError> {
        let covariance = self.covariance()?;
        Ok(DMatrix::from_fn(
            covariance.nrows(),
            covariance.ncols(),
            |i, j| covariance[(i, j)] / (covariance[(i, i)] * covariance[(j, j)]).sqrt(),
        ))
    }

    /// Formal errors: square roots of the covariance diagonal.
    pub fn formal_errors(&self) -> Result<DVector<f64>, PodfitError> {
        let covariance = self.covariance()?;
        Ok(covariance.diagonal().map(f64::sqrt))
    }
}

#[cfg(test)]
mod output_test {
    use super::*;
    use approx::assert_relative_eq;

    fn output_with(normal: DMatrix<f64>, scale: DVector<f64>) -> EstimationOutput {
        EstimationOutput {
            parameters: DVector::zeros(scale.len()),
            residuals: DVector::zeros(1),
            rms: 0.0,
            weights: DVector::zeros(1),
            normalization_terms: scale,
            inverse_normalized_covariance: normal,
            information_matrix: None,
            iterations: 1,
            stop_reason: StopReason::MaximumIterationsReached,
            rms_history: vec![0.0],
            residual_history: Vec::new(),
            parameter_history: Vec::new(),
            state_history_per_iteration: Vec::new(),
        }
    }

    #[test]
    fn covariance_undoes_normalization() {
        // Normalized normal matrix diag([4, 16]) with scales [2, 4]:
        // covariance = diag([1/4 / 4, 1/16 / 16]).
        let output = output_with(
            DMatrix::from_diagonal(&DVector::from_vec(vec![4.0, 16.0])),
            DVector::from_vec(vec![2.0, 4.0]),
        );
        let covariance = output.covariance().unwrap();
        assert_relative_eq!(covariance[(0, 0)], 0.0625, epsilon = 1.0e-12);
        assert_relative_eq!(covariance[(1, 1)], 1.0 / 256.0, epsilon = 1.0e-12);

        let errors = output.formal_errors().unwrap();
        assert_relative_eq!(errors[0], 0.25, epsilon = 1.0e-12);
        assert_relative_eq!(errors[1], 0.0625, epsilon = 1.0e-12);
    }

    #[test]
    fn correlation_has_unit_diagonal() {
        let output = output_with(
            DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]),
            DVector::from_vec(vec![1.0, 3.0]),
        );
        let correlation = output.correlation_matrix().unwrap();
        assert_relative_eq!(correlation[(0, 0)], 1.0, epsilon = 1.0e-12);
        assert_relative_eq!(correlation[(1, 1)], 1.0, epsilon = 1.0e-12);
        assert!(correlation[(0, 1)].abs() <= 1.0);
    }

    #[test]
    fn singular_normal_matrix_is_reported() {
        let output = output_with(DMatrix::zeros(2, 2), DVector::from_vec(vec![1.0, 1.0]));
        assert_eq!(
            output.covariance().unwrap_err(),
            PodfitError::SingularNormalEquations
        );
    }
}
