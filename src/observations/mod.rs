//! # Tracking observations: observables, link ends, and observation sets
//!
//! This module defines the building blocks used to describe a batch of
//! time-tagged tracking measurements:
//!
//! 1. **Observable types** ([`ObservableType`]) — the category of measurement
//!    (range, angular position, Doppler, …) sharing a single observation model.
//! 2. **Link ends** ([`LinkEndType`], [`LinkEnds`]) — the set of participating
//!    endpoints (transmitter, receiver, …) of a tracking measurement, with one
//!    endpoint designated as the time reference.
//! 3. **Observation sets** ([`ObservationSet`]) — an ordered sequence of
//!    (time, observed value) pairs for one (observable, link ends) pair.
//!
//! ## Ordering invariant
//!
//! Both [`ObservableType`] and [`LinkEnds`] carry a **fixed total order**
//! (`Ord`). The nested container [`TrackingDataSet`](crate::observations::tracking_data::TrackingDataSet)
//! and the weight container [`ObservationWeights`](crate::observations::weights::ObservationWeights)
//! enumerate their entries in that order, so that the flat weight vector and
//! the stacked residual/design-matrix rows always refer to the same
//! (observable, link ends, observation index) triple. This is a correctness
//! requirement of the estimation, not an implementation detail.
//!
//! ## See also
//! ------------
//! * [`TrackingDataSet`](crate::observations::tracking_data::TrackingDataSet) – Ordered container of observation sets.
//! * [`ObservationWeights`](crate::observations::weights::ObservationWeights) – Per-observation weights, same keying.
//! * [`ObservationModel`](crate::observation_model::ObservationModel) – Computes values and partials per observable type.

pub mod tracking_data;
pub mod weights;

use std::collections::BTreeMap;
use std::fmt;

use nalgebra::DVector;

use crate::constants::MJD;
use crate::podfit_errors::PodfitError;

/// Category of tracking measurement sharing one observation model.
///
/// The derive of `Ord` fixes the total order in which observable types are
/// visited when stacking residuals, partials, and weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObservableType {
    /// One-way or two-way range (distance between link ends)
    Range,
    /// Right ascension/declination or azimuth/elevation pair
    AngularPosition,
    /// Range-rate measurement
    Doppler,
    /// Direct (Cartesian) position observable
    Position,
}

impl fmt::Display for ObservableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservableType::Range => write!(f, "range"),
            ObservableType::AngularPosition => write!(f, "angular position"),
            ObservableType::Doppler => write!(f, "doppler"),
            ObservableType::Position => write!(f, "position"),
        }
    }
}

/// Role of a single endpoint inside a tracking link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LinkEndType {
    Transmitter,
    Reflector,
    Receiver,
    /// Body being observed (for angular/position observables)
    Observed,
    /// Observing station (for angular/position observables)
    Observer,
}

impl fmt::Display for LinkEndType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkEndType::Transmitter => write!(f, "transmitter"),
            LinkEndType::Reflector => write!(f, "reflector"),
            LinkEndType::Receiver => write!(f, "receiver"),
            LinkEndType::Observed => write!(f, "observed"),
            LinkEndType::Observer => write!(f, "observer"),
        }
    }
}

/// A link-end group: the named endpoints participating in one measurement.
///
/// Internally a `BTreeMap`, so two groups with the same endpoints compare
/// equal regardless of insertion order, and groups have a stable total order
/// (`Ord`) within an observable type.
///
/// Example
/// -----------------
/// ```rust
/// use podfit::observations::{LinkEnds, LinkEndType};
///
/// let link = LinkEnds::one_way("DSS-63", "GOLDSTONE");
/// assert_eq!(link.get(LinkEndType::Receiver), Some("GOLDSTONE"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LinkEnds(BTreeMap<LinkEndType, String>);

impl LinkEnds {
    /// Create an empty link-end group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of one endpoint.
    pub fn with(mut self, link_end_type: LinkEndType, id: impl Into<String>) -> Self {
        self.0.insert(link_end_type, id.into());
        self
    }

    /// Transmitter/receiver pair, the common case for range and Doppler links.
    pub fn one_way(transmitter: impl Into<String>, receiver: impl Into<String>) -> Self {
        Self::new()
            .with(LinkEndType::Transmitter, transmitter)
            .with(LinkEndType::Receiver, receiver)
    }

    /// Observer/observed pair, the common case for angular observables.
    pub fn observation(observer: impl Into<String>, observed: impl Into<String>) -> Self {
        Self::new()
            .with(LinkEndType::Observer, observer)
            .with(LinkEndType::Observed, observed)
    }

    /// Identifier registered for the given endpoint role, if any.
    pub fn get(&self, link_end_type: LinkEndType) -> Option<&str> {
        self.0.get(&link_end_type).map(String::as_str)
    }

    /// Number of endpoints in the group.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate endpoints in their fixed (role) order.
    pub fn iter(&self) -> impl Iterator<Item = (LinkEndType, &str)> {
        self.0.iter().map(|(t, id)| (*t, id.as_str()))
    }
}

impl fmt::Display for LinkEnds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (link_end_type, id) in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{link_end_type}={id}")?;
            first = false;
        }
        Ok(())
    }
}

/// Observed values and time tags for one (observable type, link ends) pair.
///
/// Immutable once supplied to an estimation run. The `reference_link_end`
/// designates which endpoint the time tags refer to (e.g. reception time at
/// the receiver).
///
/// Fields
/// -----------------
/// * `observations` – observed values, one per measurement.
/// * `times` – time tags, same length and order as `observations`.
/// * `reference_link_end` – endpoint the time tags are referred to.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSet {
    pub observations: DVector<f64>,
    pub times: Vec<MJD>,
    pub reference_link_end: LinkEndType,
}

impl ObservationSet {
    /// Create an observation set, validating that values and time tags pair up.
    ///
    /// Arguments
    /// -----------------
    /// * `observations`: observed values.
    /// * `times`: time tags, one per observed value.
    /// * `reference_link_end`: endpoint the time tags are referred to.
    ///
    /// Return
    /// ----------
    /// * The observation set, or [`PodfitError::ObservationSizeMismatch`] if
    ///   the lengths differ.
    pub fn new(
        observations: DVector<f64>,
        times: Vec<MJD>,
        reference_link_end: LinkEndType,
    ) -> Result<Self, PodfitError> {
        if observations.len() != times.len() {
            return Err(PodfitError::ObservationSizeMismatch {
                values: observations.len(),
                times: times.len(),
            });
        }
        Ok(Self {
            observations,
            times,
            reference_link_end,
        })
    }

    /// Build an observation set from `(time, value)` samples.
    ///
    /// Samples are sorted by time tag, so callers may supply them in any
    /// order (e.g. straight out of a time-keyed map).
    pub fn from_time_series(
        samples: impl IntoIterator<Item = (MJD, f64)>,
        reference_link_end: LinkEndType,
    ) -> Self {
        let mut samples: Vec<(MJD, f64)> = samples.into_iter().collect();
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        let times = samples.iter().map(|(t, _)| *t).collect();
        let observations = DVector::from_iterator(samples.len(), samples.iter().map(|(_, v)| *v));
        Self {
            observations,
            times,
            reference_link_end,
        }
    }

    /// Number of observations in the set.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

#[cfg(test)]
mod observations_test {
    use super::*;

    #[test]
    fn observation_set_rejects_mismatched_lengths() {
        let result = ObservationSet::new(
            DVector::from_vec(vec![1.0, 2.0]),
            vec![0.0, 1.0, 2.0],
            LinkEndType::Receiver,
        );
        assert_eq!(
            result,
            Err(PodfitError::ObservationSizeMismatch {
                values: 2,
                times: 3
            })
        );
    }

    #[test]
    fn from_time_series_sorts_by_time() {
        let set = ObservationSet::from_time_series(
            vec![(2.0, 20.0), (0.0, 0.0), (1.0, 10.0)],
            LinkEndType::Receiver,
        );
        assert_eq!(set.times, vec![0.0, 1.0, 2.0]);
        assert_eq!(set.observations, DVector::from_vec(vec![0.0, 10.0, 20.0]));
    }

    #[test]
    fn link_ends_order_is_insertion_independent() {
        let a = LinkEnds::new()
            .with(LinkEndType::Receiver, "B")
            .with(LinkEndType::Transmitter, "A");
        let b = LinkEnds::one_way("A", "B");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "transmitter=A, receiver=B");
    }
}
