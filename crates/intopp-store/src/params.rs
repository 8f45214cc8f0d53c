//! Selectivity calibration and model-parameter snapshots.

use rusqlite::params;

use intopp_core::{SELECTIVITY_SCALE, escape_fraction_selectivity};

use crate::error::{Result, StoreError};
use crate::store::Store;

/// Field names of a model-parameters row, in column order. The valid targets
/// for `save_model_parameters`.
const PARAMETER_FIELDS: [&str; 7] = [
    "od_id",
    "origins",
    "destinations",
    "selectivity",
    "convolution_start",
    "convolution_size",
    "convolution_intensity",
];

impl Store {
    /// Calibrate selectivity from a target escape fraction and persist it to
    /// every parameter row, fixed-point scaled. Returns the unscaled value.
    pub fn create_escape_fraction_selectivity(&self, efs: f64) -> Result<f64> {
        let destinations_total = self.destinations_total()?;
        let selectivity = escape_fraction_selectivity(efs, destinations_total)?;
        self.conn().execute(
            "UPDATE model_parameters SET selectivity = ?1",
            params![selectivity * SELECTIVITY_SCALE],
        )?;
        tracing::info!("calibrated selectivity {selectivity} from efs {efs}");
        Ok(selectivity)
    }

    /// Snapshot the origins/destinations/selectivity columns into the named
    /// value store under suffixed names, for before/after comparison across
    /// model iterations.
    pub fn save_intopp_parameters(&self, suffix: &str) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;
        for column in ["origins", "destinations", "selectivity"] {
            tx.execute(
                &format!(
                    "INSERT OR REPLACE INTO od_value (od_id, name, value)
                     SELECT od_id, ?1, {column} FROM model_parameters"
                ),
                params![format!("{column}{suffix}")],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Extract one field of every parameter row into the named value store
    /// under `saved_name`, replacing any previous values with that name.
    pub fn save_model_parameters(&self, parameter: &str, saved_name: &str) -> Result<()> {
        if !PARAMETER_FIELDS.contains(&parameter) {
            return Err(StoreError::Model(
                intopp_core::ModelError::UnknownField(parameter.to_string()),
            ));
        }
        let tx = self.conn().unchecked_transaction()?;
        tx.execute("DELETE FROM od_value WHERE name = ?1", params![saved_name])?;
        // parameter is validated against the column list above, never caller
        // text interpolated blindly
        tx.execute(
            &format!(
                "INSERT INTO od_value (od_id, name, value)
                 SELECT od_id, ?1, {parameter} FROM model_parameters"
            ),
            params![saved_name],
        )?;
        tx.commit()?;
        Ok(())
    }
}
