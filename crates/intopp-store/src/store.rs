use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use intopp_core::{ModelConfig, ModelError};

use crate::error::Result;
use crate::schema;

/// Handle over the model database. All engine operations hang off this type;
/// ring construction lives in `rings`, the motion-exchange engine in
/// `exchange`, parameter persistence in `params`.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Points, values, distances ---

    pub fn insert_point(&self, id: i64, description: Option<&str>) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO od_point (id, description) VALUES (?1, ?2)",
            params![id, description],
        )?;
        Ok(())
    }

    pub fn set_value(&self, od_id: i64, name: &str, value: f64) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO od_value (od_id, name, value) VALUES (?1, ?2, ?3)",
            params![od_id, name, value],
        )?;
        Ok(())
    }

    pub fn get_value(&self, od_id: i64, name: &str) -> Result<Option<f64>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM od_value WHERE od_id = ?1 AND name = ?2",
                params![od_id, name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn insert_distance(&self, start: i64, end: i64, distance: f64) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO distance (od_start_id, od_end_id, distance)
             VALUES (?1, ?2, ?3)",
            params![start, end, distance],
        )?;
        Ok(())
    }

    pub fn point_count(&self) -> Result<i64> {
        let n = self
            .conn
            .query_row("SELECT count(*) FROM od_point", [], |row| row.get(0))?;
        Ok(n)
    }

    /// Maximum pairwise distance. Precondition error on an empty distance set.
    pub fn get_max_distance(&self) -> Result<f64> {
        let max: Option<f64> =
            self.conn
                .query_row("SELECT MAX(distance) FROM distance", [], |row| row.get(0))?;
        max.ok_or_else(|| {
            ModelError::Precondition("no distances loaded".to_string()).into()
        })
    }

    // --- Model parameters ---

    /// Recreate the parameter table from the named value store. Each column is
    /// read from the value whose name the config selects; missing values
    /// default to zero.
    pub fn init_model_parameters(&self, config: &ModelConfig) -> Result<()> {
        self.conn
            .execute_batch("DROP TABLE IF EXISTS model_parameters;")?;
        schema::create_model_parameters(&self.conn)?;
        self.conn.execute(
            "INSERT INTO model_parameters
                 (od_id, origins, destinations, selectivity,
                  convolution_start, convolution_size, convolution_intensity)
             SELECT p.id,
                    COALESCE(vo.value, 0),
                    COALESCE(vd.value, 0),
                    COALESCE(vs.value, 0),
                    COALESCE(va.value, 0),
                    COALESCE(vb.value, 0),
                    COALESCE(vi.value, 0)
             FROM od_point p
             LEFT JOIN od_value vo ON vo.od_id = p.id AND vo.name = ?1
             LEFT JOIN od_value vd ON vd.od_id = p.id AND vd.name = ?2
             LEFT JOIN od_value vs ON vs.od_id = p.id AND vs.name = ?3
             LEFT JOIN od_value va ON va.od_id = p.id AND va.name = ?4
             LEFT JOIN od_value vb ON vb.od_id = p.id AND vb.name = ?5
             LEFT JOIN od_value vi ON vi.od_id = p.id AND vi.name = ?6",
            params![
                config.origins_name,
                config.destinations_name,
                config.selectivity_name,
                config.convolution_start_name,
                config.convolution_size_name,
                config.convolution_intensity_name,
            ],
        )?;
        Ok(())
    }

    pub(crate) fn destinations_total(&self) -> Result<f64> {
        let total: Option<f64> = self.conn.query_row(
            "SELECT SUM(destinations) FROM model_parameters",
            [],
            |row| row.get(0),
        )?;
        Ok(total.unwrap_or(0.0))
    }
}
