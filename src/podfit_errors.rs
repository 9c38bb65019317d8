use thiserror::Error;

use crate::observations::{LinkEnds, ObservableType};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PodfitError {
    #[error("No observation model registered for observable type: {0}")]
    MissingObservationModel(ObservableType),

    #[error("No weights supplied for {observable} / [{link_ends}]")]
    MissingWeights {
        observable: ObservableType,
        link_ends: LinkEnds,
    },

    #[error(
        "Weight vector for {observable} / [{link_ends}] has {actual} entries, expected {expected}"
    )]
    WeightSizeMismatch {
        observable: ObservableType,
        link_ends: LinkEnds,
        expected: usize,
        actual: usize,
    },

    #[error("Observation set has {values} values but {times} time tags")]
    ObservationSizeMismatch { values: usize, times: usize },

    #[error(
        "Observation model for {observable} / [{link_ends}] returned {rows}x{cols} partials \
         and {values} values, expected {expected_rows}x{expected_cols}"
    )]
    PartialsShapeMismatch {
        observable: ObservableType,
        link_ends: LinkEnds,
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
        values: usize,
    },

    #[error("Inverse apriori covariance is {rows}x{cols}, expected {expected}x{expected}")]
    AprioriShapeMismatch {
        expected: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Parameter vector has {actual} entries, expected {expected}")]
    ParameterSizeMismatch { expected: usize, actual: usize },

    #[error("Inconsistent propagation configuration: {0}")]
    InconsistentPropagation(String),

    #[error("No observations supplied for estimation")]
    EmptyTrackingData,

    #[error("Design matrix column {0} is identically zero; normalization is ill-defined")]
    DegenerateJacobianColumn(usize),

    #[error("Normal equations matrix is not invertible (rank-deficient system without apriori regularization?)")]
    SingularNormalEquations,
}
