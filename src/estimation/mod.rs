//! # Batch estimation engine
//!
//! Everything that turns a batch of weighted tracking observations into a
//! refined parameter estimate with an uncertainty statement:
//!
//! * [`convergence`] – stopping policy over the RMS residual history,
//! * [`input`] – run input (data, weights, apriori, flags) and its builder,
//! * [`residuals`] – residual vector and stacked partials assembly,
//! * [`normalization`] – design-matrix column scaling,
//! * [`least_squares`] – weighted normal-equations solve,
//! * [`output`] – the immutable best-iterate snapshot,
//! * [`estimator`] – the orchestrating refinement loop.
//!
//! The usual entry point is [`Estimator::estimate`](crate::estimation::estimator::Estimator::estimate).

pub mod convergence;
pub mod estimator;
pub mod input;
pub mod least_squares;
pub mod normalization;
pub mod output;
pub mod residuals;

pub use convergence::{ConvergenceSettings, ConvergenceSettingsBuilder, StopReason};
pub use estimator::Estimator;
pub use input::{EstimationInput, EstimationInputBuilder, RunFlags};
pub use output::EstimationOutput;
