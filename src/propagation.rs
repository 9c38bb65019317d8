//! # Propagation interface and parameter container
//!
//! The estimation core does not integrate equations of motion itself. When
//! dynamical (propagated) quantities are among the estimated parameters, the
//! loop hands each new parameter estimate to a [`Propagator`], which
//! re-integrates the dynamics and, on request, the variational equations so
//! that the observation models see refreshed state and sensitivity data on
//! the next residual pass.
//!
//! [`ParameterSet`] describes the estimated vector itself: the nominal values
//! and how many of its leading entries are propagated initial-state
//! components. That count decides whether a parameter reset must re-propagate
//! at all.

use nalgebra::DVector;

use crate::constants::MJD;
use crate::podfit_errors::PodfitError;

/// Propagated state snapshots, one per output epoch.
pub type StateHistory = Vec<(MJD, DVector<f64>)>;

/// External propagation engine for dynamics and variational equations.
pub trait Propagator {
    /// Apply a new parameter vector and re-integrate the equations of motion.
    ///
    /// Arguments
    /// -----------------
    /// * `parameters`: full parameter vector (leading entries are the
    ///   propagated initial state).
    /// * `reintegrate_variational`: whether the variational equations are
    ///   re-integrated alongside the dynamics, refreshing the sensitivity
    ///   data used by observation partials.
    fn reset_and_repropagate(
        &mut self,
        parameters: &DVector<f64>,
        reintegrate_variational: bool,
    ) -> Result<(), PodfitError>;

    /// State history of the most recent propagation.
    ///
    /// Consumed when per-iteration state history saving is enabled; the
    /// default implementation keeps nothing.
    fn state_history(&self) -> StateHistory {
        StateHistory::new()
    }
}

/// The estimated parameter vector and its dynamical split.
///
/// Fields are kept private: the estimation loop owns the values exclusively
/// during a run and updates them through resets only.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    values: DVector<f64>,
    dynamical_state_size: usize,
}

impl ParameterSet {
    /// Create a parameter set.
    ///
    /// Arguments
    /// -----------------
    /// * `values`: nominal parameter values.
    /// * `dynamical_state_size`: number of leading entries that are propagated
    ///   initial-state components (0 for a purely static parameter vector).
    ///
    /// Return
    /// ----------
    /// * The set, or [`PodfitError::InconsistentPropagation`] if the dynamical
    ///   split exceeds the vector length.
    pub fn new(values: DVector<f64>, dynamical_state_size: usize) -> Result<Self, PodfitError> {
        if dynamical_state_size > values.len() {
            return Err(PodfitError::InconsistentPropagation(format!(
                "dynamical state size {} exceeds parameter count {}",
                dynamical_state_size,
                values.len()
            )));
        }
        Ok(Self {
            values,
            dynamical_state_size,
        })
    }

    /// Parameter set with no propagated components.
    pub fn statics(values: DVector<f64>) -> Self {
        Self {
            values,
            dynamical_state_size: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    pub fn dynamical_state_size(&self) -> usize {
        self.dynamical_state_size
    }

    /// Whether any estimated parameter is a propagated quantity.
    pub fn estimates_dynamics(&self) -> bool {
        self.dynamical_state_size > 0
    }

    pub(crate) fn set_values(&mut self, values: &DVector<f64>) {
        self.values.copy_from(values);
    }
}
