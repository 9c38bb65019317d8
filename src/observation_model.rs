//! # Observation model interface
//!
//! The estimation core never looks inside an observable: for each
//! (observable type, link-end group) it asks a registered
//! [`ObservationModel`] for the computed values and the partials of those
//! values with respect to the full parameter vector. Range, angular, Doppler
//! and any other model all sit behind this one narrow trait; the core only
//! dispatches by [`ObservableType`] key.
//!
//! ## See also
//! ------------
//! * [`compute_residuals_and_partials`](crate::estimation::residuals::compute_residuals_and_partials) – Sole consumer of the trait.
//! * [`Estimator`](crate::estimation::estimator::Estimator) – Owns the registry for the duration of a run.

use std::collections::HashMap;

use ahash::RandomState;
use nalgebra::{DMatrix, DVector};

use crate::constants::MJD;
use crate::observations::{LinkEndType, LinkEnds, ObservableType};
use crate::podfit_errors::PodfitError;

/// Computes observable values and their parameter partials for one observable type.
///
/// One model serves every link-end group of its observable type; the group is
/// passed on each call. Implementations read the current dynamical state
/// (propagated externally) but must not mutate any estimation state.
pub trait ObservationModel {
    /// Compute observable values and partials at the given observation times.
    ///
    /// Arguments
    /// -----------------
    /// * `times`: observation time tags, referred to `reference_link_end`.
    /// * `link_ends`: the participating endpoints.
    /// * `reference_link_end`: endpoint the time tags are referred to.
    /// * `parameters`: the parameter estimate the dynamical state currently
    ///   reflects; models of propagated observables may instead read their
    ///   own sensitivity data and ignore it.
    ///
    /// Return
    /// ----------
    /// * `(values, partials)` where `values` has one entry per time tag and
    ///   `partials` is `times.len() × parameters.len()`.
    fn observations_with_partials(
        &self,
        times: &[MJD],
        link_ends: &LinkEnds,
        reference_link_end: LinkEndType,
        parameters: &DVector<f64>,
    ) -> Result<(DVector<f64>, DMatrix<f64>), PodfitError>;
}

/// Registry of observation models, one per observable type.
#[derive(Default)]
pub struct ObservationModels {
    models: HashMap<ObservableType, Box<dyn ObservationModel>, RandomState>,
}

impl ObservationModels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the model for an observable type, replacing any previous one.
    pub fn register(&mut self, observable: ObservableType, model: Box<dyn ObservationModel>) {
        self.models.insert(observable, model);
    }

    /// Look up the model for an observable type.
    ///
    /// Return
    /// ----------
    /// * The model, or [`PodfitError::MissingObservationModel`] naming the
    ///   offending observable type.
    pub fn get(&self, observable: ObservableType) -> Result<&dyn ObservationModel, PodfitError> {
        self.models
            .get(&observable)
            .map(Box::as_ref)
            .ok_or(PodfitError::MissingObservationModel(observable))
    }

    pub fn contains(&self, observable: ObservableType) -> bool {
        self.models.contains_key(&observable)
    }
}

impl std::fmt::Debug for ObservationModels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationModels")
            .field("observables", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}
