//! # Ordered tracking-data container
//!
//! [`TrackingDataSet`] holds every observation set of an estimation run,
//! keyed by (observable type, link-end group) and kept in a **fixed total
//! order**: observable types first, link-end groups within each type second.
//!
//! The container is deliberately an explicit ordered sequence of `(key, data)`
//! pairs rather than a hash map: the residual/design-matrix stacking and the
//! flat weight vector must enumerate observations in *identical* order, so the
//! iteration order is part of the contract, not an accident of hashing.
//!
//! ## See also
//! ------------
//! * [`ObservationWeights`](crate::observations::weights::ObservationWeights) – Mirrors this keying for weights.
//! * [`compute_residuals_and_partials`](crate::estimation::residuals::compute_residuals_and_partials) – Consumes the same order.

use super::{LinkEnds, ObservableType, ObservationSet};

/// All observation sets of an estimation run, in stacking order.
///
/// Insertion keeps the sequence sorted by `(ObservableType, LinkEnds)`;
/// inserting a key that is already present replaces its observation set.
#[derive(Debug, Clone, Default)]
pub struct TrackingDataSet {
    sets: Vec<(ObservableType, Vec<(LinkEnds, ObservationSet)>)>,
}

impl TrackingDataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the observation set for one (observable, link ends) pair.
    ///
    /// The internal sequence stays sorted regardless of insertion order, so
    /// callers never influence the stacking order.
    pub fn add_set(
        &mut self,
        observable: ObservableType,
        link_ends: LinkEnds,
        set: ObservationSet,
    ) {
        let per_observable = match self.sets.binary_search_by_key(&observable, |(o, _)| *o) {
            Ok(index) => &mut self.sets[index].1,
            Err(index) => {
                self.sets.insert(index, (observable, Vec::new()));
                &mut self.sets[index].1
            }
        };
        match per_observable.binary_search_by(|(l, _)| l.cmp(&link_ends)) {
            Ok(index) => per_observable[index].1 = set,
            Err(index) => per_observable.insert(index, (link_ends, set)),
        }
    }

    /// Iterate every observation set in stacking order.
    pub fn iter(&self) -> impl Iterator<Item = (ObservableType, &LinkEnds, &ObservationSet)> {
        self.sets.iter().flat_map(|(observable, groups)| {
            groups
                .iter()
                .map(move |(link_ends, set)| (*observable, link_ends, set))
        })
    }

    /// Total number of observations across all sets.
    pub fn total_observations(&self) -> usize {
        self.iter().map(|(_, _, set)| set.len()).sum()
    }

    /// Number of observations contributed by each observable type, in stacking order.
    pub fn observations_per_observable(&self) -> Vec<(ObservableType, usize)> {
        self.sets
            .iter()
            .map(|(observable, groups)| {
                (
                    *observable,
                    groups.iter().map(|(_, set)| set.len()).sum(),
                )
            })
            .collect()
    }

    /// Observable types present, in stacking order.
    pub fn observable_types(&self) -> impl Iterator<Item = ObservableType> + '_ {
        self.sets.iter().map(|(observable, _)| *observable)
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

#[cfg(test)]
mod tracking_data_test {
    use super::*;
    use crate::observations::LinkEndType;
    use nalgebra::DVector;

    fn set_of(values: &[f64]) -> ObservationSet {
        let times = (0..values.len()).map(|i| i as f64).collect();
        ObservationSet::new(DVector::from_row_slice(values), times, LinkEndType::Receiver).unwrap()
    }

    #[test]
    fn insertion_order_does_not_change_stacking_order() {
        let mut data = TrackingDataSet::new();
        data.add_set(
            ObservableType::Doppler,
            LinkEnds::one_way("B", "C"),
            set_of(&[5.0]),
        );
        data.add_set(
            ObservableType::Range,
            LinkEnds::one_way("B", "C"),
            set_of(&[2.0, 3.0]),
        );
        data.add_set(
            ObservableType::Range,
            LinkEnds::one_way("A", "C"),
            set_of(&[1.0]),
        );

        let keys: Vec<(ObservableType, String)> = data
            .iter()
            .map(|(o, l, _)| (o, l.to_string()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (ObservableType::Range, "transmitter=A, receiver=C".into()),
                (ObservableType::Range, "transmitter=B, receiver=C".into()),
                (ObservableType::Doppler, "transmitter=B, receiver=C".into()),
            ]
        );
        assert_eq!(data.total_observations(), 4);
    }

    #[test]
    fn reinsertion_replaces_existing_set() {
        let mut data = TrackingDataSet::new();
        let link = LinkEnds::one_way("A", "B");
        data.add_set(ObservableType::Range, link.clone(), set_of(&[1.0, 2.0]));
        data.add_set(ObservableType::Range, link, set_of(&[9.0]));
        assert_eq!(data.total_observations(), 1);
    }

    #[test]
    fn per_observable_counts() {
        let mut data = TrackingDataSet::new();
        data.add_set(
            ObservableType::Range,
            LinkEnds::one_way("A", "B"),
            set_of(&[1.0, 2.0]),
        );
        data.add_set(
            ObservableType::AngularPosition,
            LinkEnds::observation("S", "X"),
            set_of(&[0.1, 0.2, 0.3]),
        );
        assert_eq!(
            data.observations_per_observable(),
            vec![
                (ObservableType::Range, 2),
                (ObservableType::AngularPosition, 3)
            ]
        );
    }
}
