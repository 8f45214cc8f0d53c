//! Explicit per-origin ring layouts.
//!
//! A layout is an ordered list of ring sizes. It arrives either as a shared
//! sequence applied to every origin, or embedded in a point's JSON
//! description under a configurable field name. Expansion assigns 0-based
//! ring numbers and running prior sums; all validation happens here, before
//! anything is staged for writing.

use crate::error::{ModelError, Result};

/// One staged ring of an explicit layout.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutRing {
    pub od_id: i64,
    pub ring: i64,
    pub ring_size: f64,
    pub prior_rings_size: f64,
}

/// Expand a layout into staged rows with cumulative prior sizes.
/// `[10, 20, 5]` stages priors `[0, 10, 30]`.
pub fn expand_layout(od_id: i64, sizes: &[f64]) -> Result<Vec<LayoutRing>> {
    let mut rows = Vec::with_capacity(sizes.len());
    let mut prior = 0.0;
    for (ring, &size) in sizes.iter().enumerate() {
        if size < 0.0 {
            return Err(ModelError::Validation(format!(
                "point {od_id}: ring {ring} has negative size {size}"
            )));
        }
        rows.push(LayoutRing {
            od_id,
            ring: ring as i64,
            ring_size: size,
            prior_rings_size: prior,
        });
        prior += size;
    }
    Ok(rows)
}

/// Extract a ring layout from a point's JSON description.
///
/// The description must be an object whose `field_name` entry is an array of
/// non-negative numbers. A missing description, missing field, or wrong shape
/// is a validation error.
pub fn parse_layout(od_id: i64, description: Option<&str>, field_name: &str) -> Result<Vec<f64>> {
    let raw = description.ok_or_else(|| {
        ModelError::Validation(format!("point {od_id}: no description to read a layout from"))
    })?;

    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
        ModelError::Validation(format!("point {od_id}: description is not valid JSON: {e}"))
    })?;

    let sizes = value
        .get(field_name)
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            ModelError::Validation(format!(
                "point {od_id}: description has no '{field_name}' array"
            ))
        })?;

    sizes
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_f64().ok_or_else(|| {
                ModelError::Validation(format!(
                    "point {od_id}: '{field_name}' entry {i} is not a number"
                ))
            })
        })
        .collect()
}
