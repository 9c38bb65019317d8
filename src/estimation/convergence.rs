//! # Convergence policy
//!
//! [`ConvergenceSettings`] decides when the estimation loop terminates. The
//! decision is a pure function of the iteration count and the RMS residual
//! history; the loop itself always runs at least one full iteration before
//! asking.
//!
//! The "iterations without improvement" rule is implemented as an explicit
//! *iterations since the last new minimum* count. The historical formulation
//! measured the distance from the **worst** iteration to the end of the
//! history, which stops at the wrong time on non-monotonic RMS sequences.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    DEFAULT_ITERATIONS_WITHOUT_IMPROVEMENT, DEFAULT_MAX_ITERATIONS, DEFAULT_MIN_RESIDUAL,
    DEFAULT_MIN_RESIDUAL_CHANGE,
};

/// Which stopping rule ended the estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The iteration-count ceiling was reached.
    MaximumIterationsReached,
    /// The latest RMS residual fell below the target level.
    ResidualBelowThreshold,
    /// Too many iterations passed since the last new lowest RMS.
    NoRecentImprovement,
    /// The RMS residual change between the last two iterations was negligible.
    ResidualChangeBelowThreshold,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::MaximumIterationsReached => write!(f, "maximum number of iterations reached"),
            StopReason::ResidualBelowThreshold => write!(f, "required residual level achieved"),
            StopReason::NoRecentImprovement => {
                write!(f, "too many iterations without residual improvement")
            }
            StopReason::ResidualChangeBelowThreshold => {
                write!(f, "residual change between iterations below threshold")
            }
        }
    }
}

/// Stopping conditions for the estimation loop. The loop stops as soon as
/// **any** of them holds.
///
/// Fields
/// -----------------
/// * `max_iterations` – unconditional iteration ceiling (the loop still runs
///   at least once, so 0 behaves like 1).
/// * `min_residual_change` – minimum required RMS change between two
///   consecutive iterations; only evaluable once two iterations exist.
/// * `min_residual` – RMS level below which the estimation is converged.
/// * `iterations_without_improvement` – how many iterations may pass since
///   the last new lowest RMS before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceSettings {
    pub max_iterations: usize,
    pub min_residual_change: f64,
    pub min_residual: f64,
    pub iterations_without_improvement: usize,
}

impl Default for ConvergenceSettings {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            min_residual_change: DEFAULT_MIN_RESIDUAL_CHANGE,
            min_residual: DEFAULT_MIN_RESIDUAL,
            iterations_without_improvement: DEFAULT_ITERATIONS_WITHOUT_IMPROVEMENT,
        }
    }
}

impl ConvergenceSettings {
    /// Fluent builder, starting from the defaults.
    pub fn builder() -> ConvergenceSettingsBuilder {
        ConvergenceSettingsBuilder::new()
    }

    /// Decide whether the estimation should stop.
    ///
    /// Pure function of its inputs; `rms_history` holds one entry per
    /// completed iteration, most recent last.
    ///
    /// Return
    /// ----------
    /// * `Some(reason)` naming the first stopping rule that holds, or `None`
    ///   to continue iterating.
    pub fn check(&self, iterations: usize, rms_history: &[f64]) -> Option<StopReason> {
        if iterations >= self.max_iterations {
            return Some(StopReason::MaximumIterationsReached);
        }
        let last = match rms_history.last() {
            Some(last) => *last,
            None => return None,
        };
        if last < self.min_residual {
            return Some(StopReason::ResidualBelowThreshold);
        }
        if self.iterations_since_best(rms_history) > self.iterations_without_improvement {
            return Some(StopReason::NoRecentImprovement);
        }
        if rms_history.len() > 1 {
            let previous = rms_history[rms_history.len() - 2];
            if (last - previous).abs() < self.min_residual_change {
                return Some(StopReason::ResidualChangeBelowThreshold);
            }
        }
        None
    }

    /// Iterations elapsed since the last *new* lowest RMS was recorded.
    ///
    /// An iteration only counts as an improvement when its RMS is strictly
    /// lower than everything before it; later ties do not reset the count.
    fn iterations_since_best(&self, rms_history: &[f64]) -> usize {
        let mut best = f64::MAX;
        let mut best_index = 0;
        for (index, rms) in rms_history.iter().enumerate() {
            if *rms < best {
                best = *rms;
                best_index = index;
            }
        }
        rms_history.len().saturating_sub(1) - best_index
    }
}

/// Fluent builder for [`ConvergenceSettings`].
#[derive(Debug, Clone, Default)]
pub struct ConvergenceSettingsBuilder {
    settings: ConvergenceSettings,
}

impl ConvergenceSettingsBuilder {
    pub fn new() -> Self {
        Self {
            settings: ConvergenceSettings::default(),
        }
    }

    pub fn max_iterations(mut self, value: usize) -> Self {
        self.settings.max_iterations = value;
        self
    }

    pub fn min_residual_change(mut self, value: f64) -> Self {
        self.settings.min_residual_change = value;
        self
    }

    pub fn min_residual(mut self, value: f64) -> Self {
        self.settings.min_residual = value;
        self
    }

    pub fn iterations_without_improvement(mut self, value: usize) -> Self {
        self.settings.iterations_without_improvement = value;
        self
    }

    pub fn build(self) -> ConvergenceSettings {
        self.settings
    }
}
