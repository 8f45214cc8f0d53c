//! Selectivity calibration from a target escape fraction.
//!
//! Under the pure exponential opportunity model, the probability that an
//! object finds no destination among `D` total opportunities is
//! `exp(-selectivity * D)`. Solving for the decay rate that reproduces an
//! observed escape fraction gives `selectivity = -ln(efs) / D`.

use crate::error::{ModelError, Result};

/// Derive the distance-decay parameter from an escape fraction `efs` in
/// (0, 1) and the total destination mass across all points.
pub fn escape_fraction_selectivity(efs: f64, destinations_total: f64) -> Result<f64> {
    if !(efs > 0.0 && efs < 1.0) {
        return Err(ModelError::Precondition(format!(
            "escape fraction must lie in (0, 1), got {efs}"
        )));
    }
    if destinations_total <= 0.0 {
        return Err(ModelError::Precondition(format!(
            "total destination mass must be positive, got {destinations_total}"
        )));
    }
    Ok(-efs.ln() / destinations_total)
}
