pub mod constants;
pub mod estimation;
pub mod observation_model;
pub mod observations;
pub mod podfit_errors;
pub mod propagation;

pub use constants::MJD;
pub use estimation::{
    ConvergenceSettings, EstimationInput, EstimationOutput, Estimator, RunFlags, StopReason,
};
pub use observation_model::{ObservationModel, ObservationModels};
pub use observations::tracking_data::TrackingDataSet;
pub use observations::weights::ObservationWeights;
pub use observations::{LinkEndType, LinkEnds, ObservableType, ObservationSet};
pub use podfit_errors::PodfitError;
pub use propagation::{ParameterSet, Propagator, StateHistory};
