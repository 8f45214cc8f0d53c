//! JSON dataset import/export: points with their named values, and the
//! pairwise distances between them.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::store::Store;

#[derive(Debug, Serialize, Deserialize)]
pub struct Dataset {
    pub points: Vec<PointRecord>,
    #[serde(default)]
    pub distances: Vec<DistanceRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PointRecord {
    pub id: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DistanceRecord {
    pub start: i64,
    pub end: i64,
    pub distance: f64,
}

impl Store {
    /// Load a JSON dataset file into the point, value, and distance tables.
    pub fn import_dataset_file(&self, path: &Path) -> Result<()> {
        let json = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        self.import_dataset_str(&json)
    }

    pub fn import_dataset_str(&self, json: &str) -> Result<()> {
        let dataset: Dataset = serde_json::from_str(json)
            .map_err(|e| StoreError::InvalidData(format!("invalid dataset JSON: {e}")))?;
        self.import_dataset(&dataset)
    }

    pub fn import_dataset(&self, dataset: &Dataset) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;
        {
            let mut insert_point = tx.prepare(
                "INSERT OR REPLACE INTO od_point (id, description) VALUES (?1, ?2)",
            )?;
            let mut insert_value = tx.prepare(
                "INSERT OR REPLACE INTO od_value (od_id, name, value) VALUES (?1, ?2, ?3)",
            )?;
            let mut insert_distance = tx.prepare(
                "INSERT OR REPLACE INTO distance (od_start_id, od_end_id, distance)
                 VALUES (?1, ?2, ?3)",
            )?;

            for point in &dataset.points {
                insert_point.execute(rusqlite::params![point.id, point.description])?;
                for (name, value) in &point.values {
                    insert_value.execute(rusqlite::params![point.id, name, value])?;
                }
            }
            for d in &dataset.distances {
                insert_distance.execute(rusqlite::params![d.start, d.end, d.distance])?;
            }
        }
        tx.commit()?;
        tracing::info!(
            "imported {} points, {} distances",
            dataset.points.len(),
            dataset.distances.len()
        );
        Ok(())
    }

    /// Export the point, value, and distance tables to a JSON dataset file.
    pub fn export_dataset_file(&self, path: &Path) -> Result<()> {
        let json = self.export_dataset_string()?;
        fs::write(path, json).map_err(|e| {
            StoreError::InvalidData(format!("failed to write {}: {e}", path.display()))
        })
    }

    pub fn export_dataset_string(&self) -> Result<String> {
        let dataset = self.export_dataset()?;
        serde_json::to_string_pretty(&dataset)
            .map_err(|e| StoreError::InvalidData(format!("dataset export failed: {e}")))
    }

    pub fn export_dataset(&self) -> Result<Dataset> {
        let point_rows: Vec<(i64, Option<String>)> = {
            let mut stmt = self
                .conn()
                .prepare("SELECT id, description FROM od_point ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<_, _>>()?;
            rows
        };

        let mut points = Vec::with_capacity(point_rows.len());
        for (id, description) in point_rows {
            let mut stmt = self
                .conn()
                .prepare("SELECT name, value FROM od_value WHERE od_id = ?1 ORDER BY name")?;
            let values: BTreeMap<String, f64> = stmt
                .query_map([id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<_, _>>()?;
            points.push(PointRecord {
                id,
                description,
                values,
            });
        }

        let mut stmt = self.conn().prepare(
            "SELECT od_start_id, od_end_id, distance FROM distance
             ORDER BY od_start_id, od_end_id",
        )?;
        let distances = stmt
            .query_map([], |row| {
                Ok(DistanceRecord {
                    start: row.get(0)?,
                    end: row.get(1)?,
                    distance: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<_, _>>()?;

        Ok(Dataset { points, distances })
    }
}
