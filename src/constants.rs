//! # Constants and type definitions for podfit
//!
//! This module centralizes the **type aliases** and **default tuning constants**
//! used throughout the `podfit` library.
//!
//! ## Overview
//!
//! - Time tag alias ([`MJD`]) used by every observation container
//! - Default convergence thresholds, matching the classical batch
//!   orbit-determination defaults
//!
//! These definitions are used by all main modules, including the observation
//! containers, the convergence policy, and the estimation loop.

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Modified Julian Date (days)
pub type MJD = f64;

// -------------------------------------------------------------------------------------------------
// Default convergence thresholds
// -------------------------------------------------------------------------------------------------

/// Default ceiling on the number of estimation iterations
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Default minimum change in RMS residual between two iterations
pub const DEFAULT_MIN_RESIDUAL_CHANGE: f64 = 0.0;

/// Default RMS residual level below which the estimation is converged
pub const DEFAULT_MIN_RESIDUAL: f64 = 1.0e-20;

/// Default number of iterations tolerated without a new lowest RMS residual
pub const DEFAULT_ITERATIONS_WITHOUT_IMPROVEMENT: usize = 2;
