//! # Design-matrix column normalization
//!
//! Partials of heterogeneous observables with respect to heterogeneous
//! parameters can differ by many orders of magnitude; solving the normal
//! equations on the raw matrix loses precision. Each column is therefore
//! rescaled in place so its values lie in `[-1, 1]`, and the scale factors
//! are returned so the solved correction can be mapped back to physical
//! units (`correction / scale`).
//!
//! An identically-zero column makes the scale factor zero; this fails fast
//! with [`PodfitError::DegenerateJacobianColumn`] instead of silently
//! dividing by zero, so a parameter with no observability is reported by
//! column index rather than poisoning the solve with NaNs.

use itertools::Itertools;
use itertools::MinMaxResult;
use nalgebra::{DMatrix, DVector};

use crate::podfit_errors::PodfitError;

/// Normalize each column of `matrix` in place to the range `[-1, 1]`.
///
/// The scale factor of a column is whichever of its minimum and maximum has
/// the larger absolute value, sign preserved, so the extreme entry maps to
/// exactly ±1.
///
/// Return
/// ----------
/// * The per-column scale factors, or
///   [`PodfitError::DegenerateJacobianColumn`] for the first identically-zero
///   column.
pub fn normalize_design_matrix(matrix: &mut DMatrix<f64>) -> Result<DVector<f64>, PodfitError> {
    let mut scale = DVector::zeros(matrix.ncols());

    for column_index in 0..matrix.ncols() {
        let (minimum, maximum) = match matrix.column(column_index).iter().copied().minmax() {
            MinMaxResult::MinMax(minimum, maximum) => (minimum, maximum),
            MinMaxResult::OneElement(value) => (value, value),
            MinMaxResult::NoElements => (0.0, 0.0),
        };
        let factor = if minimum.abs() > maximum.abs() {
            minimum
        } else {
            maximum
        };
        if factor == 0.0 {
            return Err(PodfitError::DegenerateJacobianColumn(column_index));
        }
        scale[column_index] = factor;
        matrix.column_mut(column_index).unscale_mut(factor);
    }

    Ok(scale)
}

#[cfg(test)]
mod normalization_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn columns_land_in_unit_range() {
        let mut matrix = DMatrix::from_row_slice(3, 2, &[1.0, -40.0, 2.0, 10.0, 3.0, 25.0]);
        let scale = normalize_design_matrix(&mut matrix).unwrap();

        assert_relative_eq!(scale[0], 3.0);
        // -40 has the larger magnitude; the factor keeps its sign.
        assert_relative_eq!(scale[1], -40.0);
        for value in matrix.iter() {
            assert!((-1.0..=1.0).contains(value), "out of range: {value}");
        }
        assert_relative_eq!(matrix[(0, 1)], 1.0);
        assert_relative_eq!(matrix[(1, 1)], -0.25);
    }

    #[test]
    fn zero_column_fails_fast() {
        let mut matrix = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 2.0, 0.0]);
        let err = normalize_design_matrix(&mut matrix).unwrap_err();
        assert_eq!(err, PodfitError::DegenerateJacobianColumn(1));
    }

    #[test]
    fn unnormalizing_recovers_the_original_matrix() {
        let original = DMatrix::from_row_slice(3, 2, &[1.0, -4.0, 2.5, 1.0, -3.0, 2.0]);
        let mut matrix = original.clone();
        let scale = normalize_design_matrix(&mut matrix).unwrap();
        for j in 0..matrix.ncols() {
            matrix.column_mut(j).scale_mut(scale[j]);
        }
        assert_relative_eq!(matrix, original, epsilon = 1.0e-14);
    }
}
