//! # Observation weights
//!
//! [`ObservationWeights`] mirrors the keying of
//! [`TrackingDataSet`](crate::observations::tracking_data::TrackingDataSet):
//! one weight scalar per observation, grouped by (observable type, link-end
//! group). [`ObservationWeights::concatenated`] flattens the groups into one
//! vector in the *same* order as residual stacking, so that `weight[i]`
//! applies to `residual[i]`.

use nalgebra::DVector;

use super::tracking_data::TrackingDataSet;
use super::{LinkEnds, ObservableType};
use crate::podfit_errors::PodfitError;

/// Per-observation weights, keyed like the tracking data.
#[derive(Debug, Clone, Default)]
pub struct ObservationWeights {
    sets: Vec<(ObservableType, Vec<(LinkEnds, DVector<f64>)>)>,
}

impl ObservationWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the weight vector for one (observable, link ends) pair.
    pub fn add_weights(
        &mut self,
        observable: ObservableType,
        link_ends: LinkEnds,
        weights: DVector<f64>,
    ) {
        let per_observable = match self.sets.binary_search_by_key(&observable, |(o, _)| *o) {
            Ok(index) => &mut self.sets[index].1,
            Err(index) => {
                self.sets.insert(index, (observable, Vec::new()));
                &mut self.sets[index].1
            }
        };
        match per_observable.binary_search_by(|(l, _)| l.cmp(&link_ends)) {
            Ok(index) => per_observable[index].1 = weights,
            Err(index) => per_observable.insert(index, (link_ends, weights)),
        }
    }

    /// Same weight for every observation in `data`.
    pub fn uniform(data: &TrackingDataSet, weight: f64) -> Self {
        let mut result = Self::new();
        for (observable, link_ends, set) in data.iter() {
            result.add_weights(
                observable,
                link_ends.clone(),
                DVector::from_element(set.len(), weight),
            );
        }
        result
    }

    /// Weight vector registered for one (observable, link ends) pair, if any.
    pub fn get(&self, observable: ObservableType, link_ends: &LinkEnds) -> Option<&DVector<f64>> {
        let per_observable = &self
            .sets
            .iter()
            .find(|(o, _)| *o == observable)?
            .1;
        per_observable
            .iter()
            .find(|(l, _)| l == link_ends)
            .map(|(_, w)| w)
    }

    /// Flatten the weights into one vector, in the stacking order of `data`.
    ///
    /// The result enumerates (observable type, link ends, observation index)
    /// in exactly the order used by residual/design-matrix assembly, which is
    /// what makes `weight[i]` apply to `residual[i]`.
    ///
    /// Return
    /// ----------
    /// * The concatenated weight vector, with one entry per observation in
    ///   `data`, or a configuration error if a group referenced by `data` has
    ///   no weights ([`PodfitError::MissingWeights`]) or a weight vector of
    ///   the wrong length ([`PodfitError::WeightSizeMismatch`]).
    pub fn concatenated(&self, data: &TrackingDataSet) -> Result<DVector<f64>, PodfitError> {
        let mut concatenated = DVector::zeros(data.total_observations());
        let mut index = 0;
        for (observable, link_ends, set) in data.iter() {
            let weights =
                self.get(observable, link_ends)
                    .ok_or_else(|| PodfitError::MissingWeights {
                        observable,
                        link_ends: link_ends.clone(),
                    })?;
            if weights.len() != set.len() {
                return Err(PodfitError::WeightSizeMismatch {
                    observable,
                    link_ends: link_ends.clone(),
                    expected: set.len(),
                    actual: weights.len(),
                });
            }
            concatenated.rows_mut(index, weights.len()).copy_from(weights);
            index += weights.len();
        }
        Ok(concatenated)
    }
}
