//! Ring construction: partition every origin's destinations into ordered,
//! distance-based buckets.
//!
//! Three policies produce the ring dataset — uniform width over the observed
//! distance range, a caller-supplied width factor, or an explicit per-origin
//! layout. Rings are derived data: each policy drops and rebuilds the table.

use std::collections::HashMap;

use rusqlite::params;

use intopp_core::{MAX_DISTANCE_MARGIN, ModelConfig, ModelError, expand_layout, parse_layout};

use crate::error::Result;
use crate::schema;
use crate::store::Store;

impl Store {
    /// Build `n` rings per origin by uniform distance binning.
    ///
    /// The width factor is `n / (max_distance * MAX_DISTANCE_MARGIN)`; the
    /// margin guarantees the farthest pair bins into ring `n - 1`. Binning
    /// can still spill a ring `n` under floating-point edge effects, so the
    /// last two rings are merged as a correction.
    pub fn build_uniform_rings(&self, no_of_rings: i64) -> Result<()> {
        if no_of_rings < 1 {
            return Err(ModelError::Precondition(format!(
                "ring count must be at least 1, got {no_of_rings}"
            ))
            .into());
        }
        let max_distance = self.get_max_distance()?;
        let factor = no_of_rings as f64 / (max_distance * MAX_DISTANCE_MARGIN);
        tracing::info!("uniform rings: n={no_of_rings}, max_distance={max_distance}");

        schema::create_ring(self.conn(), true)?;
        self.insert_rings_by_factor(factor)?;
        self.merge_ring_with_next(no_of_rings)
    }

    /// Build rings with a caller-supplied width factor, without normalizing
    /// to the observed distance range.
    pub fn build_weighted_rings(&self, weight: f64) -> Result<()> {
        schema::create_ring(self.conn(), true)?;
        self.insert_rings_by_factor(weight)
    }

    fn insert_rings_by_factor(&self, factor: f64) -> Result<()> {
        self.conn().execute(
            "INSERT INTO ring (od_start_id, od_end_id, ring)
             SELECT od_start_id, od_end_id, CAST(distance * ?1 AS INTEGER)
             FROM distance",
            params![factor],
        )?;
        Ok(())
    }

    /// Reassign all rows at ring `n` into ring `n - 1`.
    pub fn merge_ring_with_next(&self, n: i64) -> Result<()> {
        if n < 1 {
            return Err(ModelError::Precondition(format!(
                "cannot merge ring {n} into ring {}",
                n - 1
            ))
            .into());
        }
        self.conn().execute(
            "UPDATE ring SET ring = ?1 - 1 WHERE ring = ?1",
            params![n],
        )?;
        Ok(())
    }

    /// Degenerate policy: every point sits alone in its own ring 0. All other
    /// memberships shift up one ring.
    pub fn only_origin_in_first_ring(&self) -> Result<()> {
        self.conn().execute_batch(
            "UPDATE ring SET ring = ring + 1 WHERE od_start_id <> od_end_id;
             INSERT OR REPLACE INTO ring (od_start_id, od_end_id, ring)
             SELECT id, id, 0 FROM od_point;",
        )?;
        Ok(())
    }

    /// Stage explicit ring layouts for every origin.
    ///
    /// With a shared layout every origin gets the same ring sizes; without
    /// one, each point's layout is parsed from its JSON description under the
    /// configured field name. Validation happens before any write.
    pub fn read_rings_layout(&self, config: &ModelConfig, shared: Option<&[f64]>) -> Result<()> {
        let mut staged = Vec::new();
        {
            let mut stmt = self
                .conn()
                .prepare("SELECT id, description FROM od_point ORDER BY id")?;
            let points: Vec<(i64, Option<String>)> = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<_, _>>()?;

            for (od_id, description) in points {
                let sizes = match shared {
                    Some(sizes) => sizes.to_vec(),
                    None => parse_layout(od_id, description.as_deref(), &config.fixed_rings_name)?,
                };
                staged.extend(expand_layout(od_id, &sizes)?);
            }
        }

        schema::create_ring_layout(self.conn(), true)?;
        let tx = self.conn().unchecked_transaction()?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO ring_layout (od_id, ring, ring_size, prior_rings_size)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for row in &staged {
                insert.execute(params![
                    row.od_id,
                    row.ring,
                    row.ring_size,
                    row.prior_rings_size
                ])?;
            }
        }
        tx.commit()?;
        tracing::info!("staged {} layout rows", staged.len());
        Ok(())
    }

    /// Materialize the ring dataset from staged layouts: per origin, the p-th
    /// nearest destination goes into the ring whose cumulative window
    /// `[prior, prior + size)` contains p. Destinations beyond the layout's
    /// total are left unassigned (see `snap_outstanding_od_to_last_ring`).
    pub fn build_rings_from_layout(&self) -> Result<()> {
        let mut layouts: HashMap<i64, Vec<(i64, f64, f64)>> = HashMap::new();
        {
            let mut stmt = self.conn().prepare(
                "SELECT od_id, ring, ring_size, prior_rings_size
                 FROM ring_layout ORDER BY od_id, ring",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?;
            for row in rows {
                let (od_id, ring, size, prior) = row?;
                layouts.entry(od_id).or_default().push((ring, size, prior));
            }
        }

        schema::create_ring(self.conn(), true)?;
        let tx = self.conn().unchecked_transaction()?;
        {
            let mut select = tx.prepare(
                "SELECT od_start_id, od_end_id FROM distance
                 ORDER BY od_start_id, distance, od_end_id",
            )?;
            let mut insert = tx.prepare(
                "INSERT INTO ring (od_start_id, od_end_id, ring) VALUES (?1, ?2, ?3)",
            )?;

            let mut current_origin: Option<i64> = None;
            let mut position = 0.0;
            let mut rows = select.query([])?;
            while let Some(row) = rows.next()? {
                let start: i64 = row.get(0)?;
                let end: i64 = row.get(1)?;
                if current_origin != Some(start) {
                    current_origin = Some(start);
                    position = 0.0;
                }
                if let Some(rings) = layouts.get(&start)
                    && let Some((ring, _, _)) = rings
                        .iter()
                        .find(|(_, size, prior)| position >= *prior && position < prior + size)
                {
                    insert.execute(params![start, end, ring])?;
                }
                position += 1.0;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Assign every distance pair not captured by any ring to the origin's
    /// final ring, so all destinations stay reachable.
    pub fn snap_outstanding_od_to_last_ring(&self) -> Result<()> {
        self.conn().execute(
            "INSERT INTO ring (od_start_id, od_end_id, ring)
             SELECT d.od_start_id, d.od_end_id,
                    COALESCE((SELECT MAX(r2.ring) FROM ring r2
                              WHERE r2.od_start_id = d.od_start_id), 0)
             FROM distance d
             WHERE NOT EXISTS (SELECT 1 FROM ring r
                               WHERE r.od_start_id = d.od_start_id
                                 AND r.od_end_id = d.od_end_id)",
            [],
        )?;
        Ok(())
    }

    /// Recompute per-ring destination mass and cumulative prior mass from the
    /// current ring dataset and model parameters. Rerun whenever rings change.
    pub fn ring_total(&self) -> Result<()> {
        schema::create_ring_total(self.conn(), true)?;
        self.conn().execute(
            "INSERT INTO ring_total (od_id, ring, destinations_in, destinations_prior)
             SELECT od_id, ring, destinations_in,
                    SUM(destinations_in) OVER
                        (PARTITION BY od_id ORDER BY ring) - destinations_in
             FROM (SELECT r.od_start_id AS od_id, r.ring AS ring,
                          SUM(mp.destinations) AS destinations_in
                   FROM ring r
                   JOIN model_parameters mp ON mp.od_id = r.od_end_id
                   GROUP BY r.od_start_id, r.ring)",
            [],
        )?;
        Ok(())
    }
}
