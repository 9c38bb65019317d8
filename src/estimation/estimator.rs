//! # Estimator: the batch least-squares refinement loop
//!
//! This module defines the [`Estimator`], the central façade that wires
//! together:
//!
//! 1. **Parameter state** ([`ParameterSet`]) — nominal values and the
//!    dynamical split that decides whether resets re-propagate.
//! 2. **Observation models** ([`ObservationModels`]) — computed values and
//!    partials per observable type.
//! 3. **Propagation** ([`Propagator`]) — external re-integration of the
//!    dynamics and variational equations.
//!
//! ## The iteration
//!
//! [`Estimator::estimate`] runs a Gauss-Newton refinement with do-while
//! semantics: at least one full iteration always executes, and convergence is
//! only checked afterwards. Each iteration:
//!
//! 1. resets the parameter state to the working estimate (re-propagating the
//!    dynamics when dynamical parameters are estimated; skipped on the first
//!    pass unless requested),
//! 2. assembles residuals and the stacked partials matrix against the
//!    previous estimate's dynamics,
//! 3. normalizes the partials columns and expresses the inverse apriori
//!    covariance in the same normalized units,
//! 4. solves the weighted normal equations and un-normalizes the correction,
//! 5. applies the correction additively,
//! 6. records the RMS residual and, on strict improvement, replaces the
//!    best-iterate snapshot.
//!
//! ## Best-iterate tracking
//!
//! Later iterations may diverge; the run is tolerant of a non-monotonic RMS
//! history because each iteration produces a fresh immutable snapshot and the
//! returned result is simply the snapshot with the lowest RMS. No rollback of
//! shared state is ever needed, and the result is reproducible regardless of
//! how many iterations run.
//!
//! ## Failure model
//!
//! Configuration problems (missing observation model or weights, shape
//! mismatches), a degenerate partials column, and a singular normal-equations
//! matrix all abort the run immediately and surface as
//! [`PodfitError`](crate::podfit_errors::PodfitError); nothing is retried
//! internally. The loop itself cannot fail to terminate: the iteration
//! ceiling is an unconditional bound.
//!
//! ## Example
//!
//! ```rust,no_run
//! use nalgebra::DVector;
//! use podfit::{
//!     ConvergenceSettings, EstimationInput, Estimator, ObservationModels,
//!     ObservationWeights, ParameterSet, TrackingDataSet,
//! };
//!
//! # fn demo(data: TrackingDataSet, models: ObservationModels) -> Result<(), podfit::PodfitError> {
//! let weights = ObservationWeights::uniform(&data, 1.0);
//! let input = EstimationInput::builder(data, weights).build()?;
//! let mut estimator = Estimator::new(
//!     ParameterSet::statics(DVector::zeros(1)),
//!     models,
//!     None,
//! )?;
//! let output = estimator.estimate(&input, &ConvergenceSettings::default())?;
//! eprintln!("best rms: {:.6e}", output.rms);
//! # Ok(()) }
//! ```

use nalgebra::{DMatrix, DVector};

use crate::estimation::convergence::{ConvergenceSettings, StopReason};
use crate::estimation::input::EstimationInput;
use crate::estimation::least_squares::{residual_rms, solve_normal_equations};
use crate::estimation::normalization::normalize_design_matrix;
use crate::estimation::output::EstimationOutput;
use crate::estimation::residuals::compute_residuals_and_partials;
use crate::observation_model::ObservationModels;
use crate::podfit_errors::PodfitError;
use crate::propagation::{ParameterSet, Propagator, StateHistory};

/// Snapshot of one iteration, kept only while it is the best so far.
struct BestIterate {
    parameters: DVector<f64>,
    residuals: DVector<f64>,
    rms: f64,
    normalization_terms: DVector<f64>,
    inverse_normalized_covariance: DMatrix<f64>,
    information_matrix: Option<DMatrix<f64>>,
}

/// Top-level batch estimator.
///
/// Owns the parameter state, the observation-model registry, and the
/// optional propagation engine for the duration of a run; the parameter
/// vector and all assembly buffers are exclusively owned by the loop within
/// one iteration.
pub struct Estimator {
    parameters: ParameterSet,
    models: ObservationModels,
    propagator: Option<Box<dyn Propagator>>,
    current_estimate: DVector<f64>,
}

impl std::fmt::Debug for Estimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Estimator")
            .field("parameters", &self.parameters)
            .field("models", &self.models)
            .field(
                "propagator",
                &self.propagator.as_ref().map(|_| "dyn Propagator"),
            )
            .field("current_estimate", &self.current_estimate)
            .finish()
    }
}

impl Estimator {
    /// Create an estimator.
    ///
    /// Arguments
    /// -----------------
    /// * `parameters`: nominal parameter values and their dynamical split.
    /// * `models`: one observation model per observable type in the data.
    /// * `propagator`: propagation engine; required exactly when dynamical
    ///   parameters are estimated.
    ///
    /// Return
    /// ----------
    /// * The estimator, or [`PodfitError::InconsistentPropagation`] when the
    ///   propagator and the dynamical split disagree.
    pub fn new(
        parameters: ParameterSet,
        models: ObservationModels,
        propagator: Option<Box<dyn Propagator>>,
    ) -> Result<Self, PodfitError> {
        match (parameters.estimates_dynamics(), propagator.is_some()) {
            (true, false) => {
                return Err(PodfitError::InconsistentPropagation(
                    "dynamical parameters are estimated but no propagator was supplied".into(),
                ))
            }
            (false, true) => {
                return Err(PodfitError::InconsistentPropagation(
                    "a propagator was supplied but no dynamical parameter is estimated".into(),
                ))
            }
            _ => {}
        }
        let current_estimate = parameters.values().clone();
        Ok(Self {
            parameters,
            models,
            propagator,
            current_estimate,
        })
    }

    /// The parameter estimate the dynamical model currently reflects.
    pub fn current_parameter_estimate(&self) -> &DVector<f64> {
        &self.current_estimate
    }

    pub fn models(&self) -> &ObservationModels {
        &self.models
    }

    /// Apply a new parameter vector to the dynamical model.
    ///
    /// Re-integrates the equations of motion (and, if requested, the
    /// variational equations) when dynamical parameters are estimated;
    /// otherwise only overwrites the parameter values. The cached current
    /// estimate always follows. Calling twice with the same vector leaves
    /// the state unchanged after the second call.
    pub fn reset_parameter_estimate(
        &mut self,
        new_estimate: &DVector<f64>,
        reintegrate_variational: bool,
    ) -> Result<(), PodfitError> {
        if new_estimate.len() != self.parameters.len() {
            return Err(PodfitError::ParameterSizeMismatch {
                expected: self.parameters.len(),
                actual: new_estimate.len(),
            });
        }
        if self.parameters.estimates_dynamics() {
            if let Some(propagator) = self.propagator.as_mut() {
                propagator.reset_and_repropagate(new_estimate, reintegrate_variational)?;
            }
        }
        self.parameters.set_values(new_estimate);
        self.current_estimate.copy_from(new_estimate);
        Ok(())
    }

    /// Estimate the parameter vector from the supplied tracking data.
    ///
    /// Runs the refinement loop described in the module docs and returns the
    /// snapshot of the iteration with the lowest RMS residual.
    ///
    /// Arguments
    /// -----------------
    /// * `input`: observations, weights, apriori information, initial
    ///   deviation, and run flags.
    /// * `convergence`: stopping conditions, consulted after each iteration.
    ///
    /// Return
    /// ----------
    /// * The best-iterate [`EstimationOutput`], or the first error the run hit.
    pub fn estimate(
        &mut self,
        input: &EstimationInput,
        convergence: &ConvergenceSettings,
    ) -> Result<EstimationOutput, PodfitError> {
        let parameter_count = self.parameters.len();
        let flags = *input.flags();

        // Fail on configuration problems before any reset mutates state.
        for observable in input.observations().observable_types() {
            self.models.get(observable)?;
        }
        let weights = input.weights().concatenated(input.observations())?;
        let inverse_apriori = match input.inverse_apriori_covariance() {
            Some(matrix) => {
                if matrix.nrows() != parameter_count || matrix.ncols() != parameter_count {
                    return Err(PodfitError::AprioriShapeMismatch {
                        expected: parameter_count,
                        rows: matrix.nrows(),
                        cols: matrix.ncols(),
                    });
                }
                matrix.clone()
            }
            None => DMatrix::zeros(parameter_count, parameter_count),
        };
        let deviation = match input.initial_parameter_deviation() {
            Some(deviation) => {
                if deviation.len() != parameter_count {
                    return Err(PodfitError::ParameterSizeMismatch {
                        expected: parameter_count,
                        actual: deviation.len(),
                    });
                }
                deviation.clone()
            }
            None => DVector::zeros(parameter_count),
        };

        let mut new_estimate = &self.current_estimate + deviation;

        let mut best: Option<BestIterate> = None;
        let mut rms_history: Vec<f64> = Vec::new();
        let mut residual_history: Vec<DVector<f64>> = Vec::new();
        let mut parameter_history: Vec<DVector<f64>> = Vec::new();
        let mut state_history_per_iteration: Vec<StateHistory> = Vec::new();

        let mut iterations = 0;
        let stop_reason = loop {
            // Re-integrate dynamics and variational equations with the working
            // estimate; the first pass keeps the nominal propagation unless
            // the caller asked otherwise.
            if iterations > 0 || flags.reintegrate_on_first_iteration {
                self.reset_parameter_estimate(
                    &new_estimate,
                    flags.reintegrate_variational_equations,
                )?;
            }

            if flags.save_state_history_per_iteration {
                if let Some(propagator) = self.propagator.as_ref() {
                    state_history_per_iteration.push(propagator.state_history());
                }
            }

            let old_estimate = new_estimate.clone();

            if flags.print_progress {
                eprintln!(
                    "computing residuals and partials for {} observations",
                    input.observations().total_observations()
                );
            }
            // Residuals and partials reflect the dynamics of the estimate the
            // last reset applied; without a first-iteration reset that is the
            // nominal propagation.
            let (residuals, mut partials) = compute_residuals_and_partials(
                input.observations(),
                &self.models,
                &self.current_estimate,
            )?;

            let normalization_terms = normalize_design_matrix(&mut partials)?;
            let normalized_inverse_apriori =
                DMatrix::from_fn(parameter_count, parameter_count, |i, j| {
                    inverse_apriori[(i, j)] / (normalization_terms[i] * normalization_terms[j])
                });

            let (normalized_correction, inverse_normalized_covariance) = solve_normal_equations(
                &partials,
                &residuals,
                &weights,
                &normalized_inverse_apriori,
            )?;
            let correction = normalized_correction.component_div(&normalization_terms);

            new_estimate = &old_estimate + &correction;

            if flags.save_residuals_and_parameters {
                residual_history.push(residuals.clone());
                if iterations == 0 {
                    parameter_history.push(old_estimate.clone());
                }
                parameter_history.push(new_estimate.clone());
            }
            if flags.print_progress {
                eprintln!("parameter update: {}", correction.transpose());
            }

            let rms = residual_rms(&residuals);
            rms_history.push(rms);
            if flags.print_progress {
                eprintln!("iteration {iterations}: rms residual {rms:.6e}");
            }

            if best.as_ref().map_or(true, |b| rms < b.rms) {
                best = Some(BestIterate {
                    parameters: new_estimate.clone(),
                    residuals,
                    rms,
                    normalization_terms,
                    inverse_normalized_covariance,
                    information_matrix: flags.save_information_matrix.then(|| partials.clone()),
                });
            }

            iterations += 1;
            if let Some(reason) = convergence.check(iterations, &rms_history) {
                if flags.print_progress {
                    eprintln!("stopping: {reason}");
                }
                break reason;
            }
        };

        self.finalize(
            best,
            weights,
            iterations,
            stop_reason,
            rms_history,
            residual_history,
            parameter_history,
            state_history_per_iteration,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn finalize(
        &self,
        best: Option<BestIterate>,
        weights: DVector<f64>,
        iterations: usize,
        stop_reason: StopReason,
        rms_history: Vec<f64>,
        residual_history: Vec<DVector<f64>>,
        parameter_history: Vec<DVector<f64>>,
        state_history_per_iteration: Vec<StateHistory>,
    ) -> Result<EstimationOutput, PodfitError> {
        // The loop has do-while semantics, so a best iterate always exists.
        let best = best.ok_or(PodfitError::EmptyTrackingData)?;
        Ok(EstimationOutput {
            parameters: best.parameters,
            residuals: best.residuals,
            rms: best.rms,
            weights,
            normalization_terms: best.normalization_terms,
            inverse_normalized_covariance: best.inverse_normalized_covariance,
            information_matrix: best.information_matrix,
            iterations,
            stop_reason,
            rms_history,
            residual_history,
            parameter_history,
            state_history_per_iteration,
        })
    }
}
