//! Estimation coupled to a mock propagation engine: reset/re-propagation
//! triggers, idempotence of parameter resets, per-iteration state history
//! capture, and best-iterate selection on a diverging run.

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use nalgebra::{DMatrix, DVector};

use podfit::{
    ConvergenceSettings, EstimationInput, Estimator, LinkEndType, LinkEnds, ObservableType,
    ObservationModel, ObservationModels, ObservationSet, ObservationWeights, ParameterSet,
    PodfitError, Propagator, StateHistory, StopReason, TrackingDataSet, MJD,
};

/// State shared between the mock propagator and the observation model,
/// standing in for the propagated trajectory and its bookkeeping.
#[derive(Debug, Default)]
struct PropagatedState {
    x0: f64,
    resets: usize,
    variational_resets: usize,
}

type SharedState = Rc<RefCell<PropagatedState>>;

struct MockPropagator {
    state: SharedState,
}

impl Propagator for MockPropagator {
    fn reset_and_repropagate(
        &mut self,
        parameters: &DVector<f64>,
        reintegrate_variational: bool,
    ) -> Result<(), PodfitError> {
        let mut state = self.state.borrow_mut();
        state.x0 = parameters[0];
        state.resets += 1;
        if reintegrate_variational {
            state.variational_resets += 1;
        }
        Ok(())
    }

    fn state_history(&self) -> StateHistory {
        let state = self.state.borrow();
        vec![(0.0, DVector::from_element(1, state.x0))]
    }
}

/// Observes the propagated (constant) position; partial w.r.t. x0 is 1.
struct PositionModel {
    state: SharedState,
}

impl ObservationModel for PositionModel {
    fn observations_with_partials(
        &self,
        times: &[MJD],
        _link_ends: &LinkEnds,
        _reference_link_end: LinkEndType,
        parameters: &DVector<f64>,
    ) -> Result<(DVector<f64>, DMatrix<f64>), PodfitError> {
        let x0 = self.state.borrow().x0;
        Ok((
            DVector::from_element(times.len(), x0),
            DMatrix::from_element(times.len(), parameters.len(), 1.0),
        ))
    }
}

/// Same observable, but with a sign error in the partial: every correction
/// pushes the estimate the wrong way, so the RMS history diverges.
struct DivergingModel {
    state: SharedState,
}

impl ObservationModel for DivergingModel {
    fn observations_with_partials(
        &self,
        times: &[MJD],
        _link_ends: &LinkEnds,
        _reference_link_end: LinkEndType,
        parameters: &DVector<f64>,
    ) -> Result<(DVector<f64>, DMatrix<f64>), PodfitError> {
        let x0 = self.state.borrow().x0;
        Ok((
            DVector::from_element(times.len(), x0),
            DMatrix::from_element(times.len(), parameters.len(), -1.0),
        ))
    }
}

fn position_data() -> TrackingDataSet {
    let mut data = TrackingDataSet::new();
    data.add_set(
        ObservableType::Position,
        LinkEnds::observation("STATION", "SC"),
        ObservationSet::new(
            DVector::from_vec(vec![1.2, 0.8, 1.0]),
            vec![0.0, 1.0, 2.0],
            LinkEndType::Observer,
        )
        .unwrap(),
    );
    data
}

/// Estimator for a single dynamical parameter, with the observation model and
/// the mock propagator wired to the same shared trajectory state.
fn dynamic_estimator<M, F>(make_model: F) -> (Estimator, SharedState)
where
    M: ObservationModel + 'static,
    F: FnOnce(SharedState) -> M,
{
    let shared = SharedState::default();
    let mut models = ObservationModels::new();
    models.register(
        ObservableType::Position,
        Box::new(make_model(Rc::clone(&shared))),
    );
    let estimator = Estimator::new(
        ParameterSet::new(DVector::zeros(1), 1).unwrap(),
        models,
        Some(Box::new(MockPropagator {
            state: Rc::clone(&shared),
        })),
    )
    .unwrap();
    (estimator, shared)
}

#[test]
fn initial_state_estimate_converges_to_the_mean() {
    let (mut estimator, shared) = dynamic_estimator(|state| PositionModel { state });
    let data = position_data();
    let weights = ObservationWeights::uniform(&data, 1.0);
    let input = EstimationInput::builder(data, weights).build().unwrap();
    let convergence = ConvergenceSettings::builder().max_iterations(3).build();

    let output = estimator.estimate(&input, &convergence).unwrap();
    assert_relative_eq!(output.parameters[0], 1.0, epsilon = 1.0e-12);
    assert_relative_eq!(shared.borrow().x0, 1.0, epsilon = 1.0e-12);
}

#[test]
fn first_iteration_reset_is_optional() {
    let data = position_data();
    let weights = ObservationWeights::uniform(&data, 1.0);
    let convergence = ConvergenceSettings::builder().max_iterations(2).build();

    let (mut estimator, shared) = dynamic_estimator(|state| PositionModel { state });
    let input = EstimationInput::builder(data.clone(), weights.clone())
        .reintegrate_on_first_iteration(false)
        .build()
        .unwrap();
    estimator.estimate(&input, &convergence).unwrap();
    // Two iterations, but only the second one re-propagated.
    assert_eq!(shared.borrow().resets, 1);

    let (mut estimator, shared) = dynamic_estimator(|state| PositionModel { state });
    let input = EstimationInput::builder(data, weights).build().unwrap();
    estimator.estimate(&input, &convergence).unwrap();
    assert_eq!(shared.borrow().resets, 2);
}

#[test]
fn variational_reintegration_flag_is_forwarded() {
    let data = position_data();
    let weights = ObservationWeights::uniform(&data, 1.0);
    let convergence = ConvergenceSettings::builder().max_iterations(2).build();

    let (mut estimator, shared) = dynamic_estimator(|state| PositionModel { state });
    let input = EstimationInput::builder(data, weights)
        .reintegrate_variational_equations(false)
        .build()
        .unwrap();
    estimator.estimate(&input, &convergence).unwrap();

    let state = shared.borrow();
    assert_eq!(state.resets, 2);
    assert_eq!(state.variational_resets, 0);
}

#[test]
fn parameter_reset_is_idempotent() {
    let (mut estimator, shared) = dynamic_estimator(|state| PositionModel { state });

    let target = DVector::from_vec(vec![2.5]);
    estimator.reset_parameter_estimate(&target, true).unwrap();
    let after_first = estimator.current_parameter_estimate().clone();
    let x0_after_first = shared.borrow().x0;

    estimator.reset_parameter_estimate(&target, true).unwrap();
    assert_eq!(estimator.current_parameter_estimate(), &after_first);
    assert_relative_eq!(shared.borrow().x0, x0_after_first);
}

#[test]
fn reset_rejects_wrong_parameter_size() {
    let (mut estimator, _shared) = dynamic_estimator(|state| PositionModel { state });
    let err = estimator
        .reset_parameter_estimate(&DVector::zeros(3), true)
        .unwrap_err();
    assert_eq!(
        err,
        PodfitError::ParameterSizeMismatch {
            expected: 1,
            actual: 3
        }
    );
}

#[test]
fn state_history_is_captured_per_iteration() {
    let data = position_data();
    let weights = ObservationWeights::uniform(&data, 1.0);
    let convergence = ConvergenceSettings::builder().max_iterations(2).build();

    let (mut estimator, _shared) = dynamic_estimator(|state| PositionModel { state });
    let input = EstimationInput::builder(data, weights)
        .save_state_history_per_iteration(true)
        .build()
        .unwrap();
    let output = estimator.estimate(&input, &convergence).unwrap();

    assert_eq!(output.state_history_per_iteration.len(), output.iterations);
    // Second iteration's history reflects the once-corrected estimate.
    let (_, state) = &output.state_history_per_iteration[1][0];
    assert_relative_eq!(state[0], 1.0, epsilon = 1.0e-12);
}

#[test]
fn best_iterate_survives_later_divergence() {
    let data = position_data();
    let weights = ObservationWeights::uniform(&data, 1.0);
    let convergence = ConvergenceSettings::builder()
        .max_iterations(10)
        .iterations_without_improvement(1)
        .build();

    let (mut estimator, _shared) = dynamic_estimator(|state| DivergingModel { state });
    let input = EstimationInput::builder(data, weights).build().unwrap();
    let output = estimator.estimate(&input, &convergence).unwrap();

    assert_eq!(output.stop_reason, StopReason::NoRecentImprovement);
    assert!(output.rms_history.len() > 1);
    // The run diverged, yet the result is the first (lowest-RMS) iterate.
    assert_relative_eq!(output.rms, output.rms_history[0]);
    for rms in &output.rms_history {
        assert!(output.rms <= *rms);
    }
    assert_relative_eq!(output.parameters[0], -1.0, epsilon = 1.0e-12);
}

#[test]
fn propagator_without_dynamical_parameters_is_rejected() {
    let shared = SharedState::default();
    let mut models = ObservationModels::new();
    models.register(
        ObservableType::Position,
        Box::new(PositionModel {
            state: Rc::clone(&shared),
        }),
    );
    let err = Estimator::new(
        ParameterSet::statics(DVector::zeros(1)),
        models,
        Some(Box::new(MockPropagator { state: shared })),
    )
    .unwrap_err();
    assert!(matches!(err, PodfitError::InconsistentPropagation(_)));
}

#[test]
fn dynamical_parameters_require_a_propagator() {
    let err = Estimator::new(
        ParameterSet::new(DVector::zeros(2), 2).unwrap(),
        ObservationModels::new(),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, PodfitError::InconsistentPropagation(_)));
}
