//! # Estimation input
//!
//! [`EstimationInput`] bundles everything one estimation run consumes:
//! the tracking data, the per-observation weights, the optional inverse
//! apriori covariance, the initial parameter deviation, and the run flags.
//! Built through a fluent builder; `build` validates that the weights cover
//! every observation group before the loop ever starts.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::observations::tracking_data::TrackingDataSet;
use crate::observations::weights::ObservationWeights;
use crate::podfit_errors::PodfitError;

/// Bookkeeping and re-propagation switches for one estimation run.
///
/// None of these affect the numerical result except the re-propagation
/// triggers; the save flags only control which optional histories the output
/// retains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFlags {
    /// Re-propagate the dynamics before the first iteration as well.
    pub reintegrate_on_first_iteration: bool,
    /// Re-integrate the variational equations on every reset.
    pub reintegrate_variational_equations: bool,
    /// Retain the propagated state history of every iteration.
    pub save_state_history_per_iteration: bool,
    /// Retain residual and parameter vectors of every iteration.
    pub save_residuals_and_parameters: bool,
    /// Retain the (normalized) information matrix of the best iteration.
    pub save_information_matrix: bool,
    /// Print RMS and parameter updates per iteration to stderr.
    pub print_progress: bool,
}

impl Default for RunFlags {
    fn default() -> Self {
        Self {
            reintegrate_on_first_iteration: true,
            reintegrate_variational_equations: true,
            save_state_history_per_iteration: false,
            save_residuals_and_parameters: false,
            save_information_matrix: true,
            print_progress: false,
        }
    }
}

/// All measurement data and metadata consumed by one estimation run.
#[derive(Debug, Clone)]
pub struct EstimationInput {
    observations: TrackingDataSet,
    weights: ObservationWeights,
    inverse_apriori_covariance: Option<DMatrix<f64>>,
    initial_parameter_deviation: Option<DVector<f64>>,
    flags: RunFlags,
}

impl EstimationInput {
    /// Start building an input from tracking data and matching weights.
    pub fn builder(
        observations: TrackingDataSet,
        weights: ObservationWeights,
    ) -> EstimationInputBuilder {
        EstimationInputBuilder {
            observations,
            weights,
            inverse_apriori_covariance: None,
            initial_parameter_deviation: None,
            flags: RunFlags::default(),
        }
    }

    pub fn observations(&self) -> &TrackingDataSet {
        &self.observations
    }

    pub fn weights(&self) -> &ObservationWeights {
        &self.weights
    }

    /// Inverse apriori covariance, if any. Absent means no prior constraint
    /// (an all-zero matrix).
    pub fn inverse_apriori_covariance(&self) -> Option<&DMatrix<f64>> {
        self.inverse_apriori_covariance.as_ref()
    }

    /// Deviation added to the nominal parameter values before the first iteration.
    pub fn initial_parameter_deviation(&self) -> Option<&DVector<f64>> {
        self.initial_parameter_deviation.as_ref()
    }

    pub fn flags(&self) -> &RunFlags {
        &self.flags
    }
}

/// Fluent builder for [`EstimationInput`].
#[derive(Debug, Clone)]
pub struct EstimationInputBuilder {
    observations: TrackingDataSet,
    weights: ObservationWeights,
    inverse_apriori_covariance: Option<DMatrix<f64>>,
    initial_parameter_deviation: Option<DVector<f64>>,
    flags: RunFlags,
}

impl EstimationInputBuilder {
    pub fn inverse_apriori_covariance(mut self, matrix: DMatrix<f64>) -> Self {
        self.inverse_apriori_covariance = Some(matrix);
        self
    }

    pub fn initial_parameter_deviation(mut self, deviation: DVector<f64>) -> Self {
        self.initial_parameter_deviation = Some(deviation);
        self
    }

    pub fn flags(mut self, flags: RunFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn reintegrate_on_first_iteration(mut self, value: bool) -> Self {
        self.flags.reintegrate_on_first_iteration = value;
        self
    }

    pub fn reintegrate_variational_equations(mut self, value: bool) -> Self {
        self.flags.reintegrate_variational_equations = value;
        self
    }

    pub fn save_state_history_per_iteration(mut self, value: bool) -> Self {
        self.flags.save_state_history_per_iteration = value;
        self
    }

    pub fn save_residuals_and_parameters(mut self, value: bool) -> Self {
        self.flags.save_residuals_and_parameters = value;
        self
    }

    pub fn save_information_matrix(mut self, value: bool) -> Self {
        self.flags.save_information_matrix = value;
        self
    }

    pub fn print_progress(mut self, value: bool) -> Self {
        self.flags.print_progress = value;
        self
    }

    /// Finalize the input.
    ///
    /// Return
    /// ----------
    /// * The validated input, or a configuration error if the tracking data
    ///   is empty, a weight group is missing or mismatched, or the apriori
    ///   matrix is not square.
    pub fn build(self) -> Result<EstimationInput, PodfitError> {
        if self.observations.is_empty() || self.observations.total_observations() == 0 {
            return Err(PodfitError::EmptyTrackingData);
        }
        // Surface weight misconfiguration at build time, not mid-run.
        self.weights.concatenated(&self.observations)?;
        if let Some(apriori) = &self.inverse_apriori_covariance {
            if apriori.nrows() != apriori.ncols() {
                return Err(PodfitError::AprioriShapeMismatch {
                    expected: apriori.nrows(),
                    rows: apriori.nrows(),
                    cols: apriori.ncols(),
                });
            }
        }
        Ok(EstimationInput {
            observations: self.observations,
            weights: self.weights,
            inverse_apriori_covariance: self.inverse_apriori_covariance,
            initial_parameter_deviation: self.initial_parameter_deviation,
            flags: self.flags,
        })
    }
}
