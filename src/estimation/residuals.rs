//! # Residual and design-matrix assembly
//!
//! One pass over the tracking data in stacking order: for every
//! (observable type, link-end group), the registered observation model is
//! asked for computed values and partials at the group's time tags; the
//! residual segment (observed − computed) and the partials block land at the
//! group's row offset. Offsets accumulate monotonically, which is exactly the
//! ordering the flat weight vector follows.

use nalgebra::{DMatrix, DVector};

use crate::observation_model::ObservationModels;
use crate::observations::tracking_data::TrackingDataSet;
use crate::podfit_errors::PodfitError;

/// Assemble the residual vector and the stacked partials (design) matrix.
///
/// Arguments
/// -----------------
/// * `data`: tracking data, iterated in its fixed stacking order.
/// * `models`: observation-model registry, one model per observable type.
/// * `parameters`: the estimate the current dynamical state reflects; its
///   length fixes the design-matrix column count.
///
/// Return
/// ----------
/// * `(residuals, partials)` with one row per observation, or a configuration
///   error naming the offending observable/link-end group when a model is
///   missing or returns mismatched dimensions.
pub fn compute_residuals_and_partials(
    data: &TrackingDataSet,
    models: &ObservationModels,
    parameters: &DVector<f64>,
) -> Result<(DVector<f64>, DMatrix<f64>), PodfitError> {
    let parameter_count = parameters.len();
    let total_observations = data.total_observations();
    let mut residuals = DVector::zeros(total_observations);
    let mut partials = DMatrix::zeros(total_observations, parameter_count);

    let mut row = 0;
    for (observable, link_ends, set) in data.iter() {
        let model = models.get(observable)?;
        let (computed, block) = model.observations_with_partials(
            &set.times,
            link_ends,
            set.reference_link_end,
            parameters,
        )?;

        let group_size = set.len();
        if computed.len() != group_size
            || block.nrows() != group_size
            || block.ncols() != parameter_count
        {
            return Err(PodfitError::PartialsShapeMismatch {
                observable,
                link_ends: link_ends.clone(),
                expected_rows: group_size,
                expected_cols: parameter_count,
                rows: block.nrows(),
                cols: block.ncols(),
                values: computed.len(),
            });
        }

        residuals
            .rows_mut(row, group_size)
            .copy_from(&(&set.observations - &computed));
        partials
            .view_mut((row, 0), (group_size, parameter_count))
            .copy_from(&block);
        row += group_size;
    }

    Ok((residuals, partials))
}
