//! Motion exchange: the O(origins × destinations) batch computation.
//!
//! Every origin-destination-ring tuple from the ring × ring-total × parameter
//! join yields one exchange row. Peak memory stays bounded: results buffer in
//! memory and flush to the store every `EXCHANGE_BATCH` rows, with a single
//! commit after the final drain. Rows are always fully regenerated — a failed
//! run is recovered by rebuilding the inputs and rerunning, never by partial
//! repair.

use rusqlite::params;

use intopp_core::{EXCHANGE_BATCH, SELECTIVITY_SCALE, convolution_mix};

use crate::error::Result;
use crate::progress::ProgressSink;
use crate::schema;
use crate::store::Store;

struct ExchangeRow {
    od_start_id: i64,
    od_end_id: i64,
    fraction: f64,
    motion_exchange: f64,
}

const SELECT_FOR_MOTION_EXCHANGE: &str = "
    SELECT r.od_start_id, r.od_end_id, r.ring,
           rt.destinations_in, rt.destinations_prior,
           mps.origins, mpe.destinations,
           mps.selectivity, mps.convolution_start,
           mps.convolution_size, mps.convolution_intensity
    FROM ring r
    JOIN ring_total rt ON rt.od_id = r.od_start_id AND rt.ring = r.ring
    JOIN model_parameters mps ON mps.od_id = r.od_start_id
    JOIN model_parameters mpe ON mpe.od_id = r.od_end_id";

impl Store {
    /// Compute the exchange fraction and absolute flow for every
    /// origin-destination pair, ring by ring.
    ///
    /// Per row: the capture probability gained by this ring, redistributed
    /// over the destination's share of the ring's mass, times the origin's
    /// mass. Progress is reported against `point_count²`.
    pub fn motion_exchange(&self, progress: &mut dyn ProgressSink) -> Result<()> {
        schema::create_motion_exchange(self.conn(), true)?;

        let points = self.point_count()? as u64;
        progress.begin(points * points, "intervening opportunities");

        let mut done = 0u64;
        let tx = self.conn().unchecked_transaction()?;
        {
            let mut select = tx.prepare(SELECT_FOR_MOTION_EXCHANGE)?;
            let mut insert_exchange = tx.prepare(
                "INSERT INTO motion_exchange (od_start_id, od_end_id, motion_exchange)
                 VALUES (?1, ?2, ?3)",
            )?;
            let mut insert_fraction = tx.prepare(
                "INSERT INTO motion_exchange_fraction (od_start_id, od_end_id, fraction)
                 VALUES (?1, ?2, ?3)",
            )?;

            let mut buffer: Vec<ExchangeRow> = Vec::with_capacity(EXCHANGE_BATCH);
            let mut rows = select.query([])?;
            while let Some(row) = rows.next()? {
                let od_start_id: i64 = row.get(0)?;
                let od_end_id: i64 = row.get(1)?;
                let destinations_in: f64 = row.get(3)?;
                let destinations_prior: f64 = row.get(4)?;
                let origins: f64 = row.get(5)?;
                let destinations: f64 = row.get(6)?;
                let selectivity: f64 = row.get::<_, f64>(7)? / SELECTIVITY_SCALE;
                let conv_start: f64 = row.get(8)?;
                let conv_size: f64 = row.get(9)?;
                let conv_intensity: f64 = row.get(10)?;

                // capture probability before and after this ring's mass
                let before = convolution_mix(
                    destinations_prior,
                    selectivity,
                    conv_start,
                    conv_size,
                    conv_intensity,
                )?;
                let after = convolution_mix(
                    destinations_prior + destinations_in,
                    selectivity,
                    conv_start,
                    conv_size,
                    conv_intensity,
                )?;

                let fraction = if destinations_in != 0.0 {
                    (after - before) * destinations / destinations_in
                } else {
                    0.0
                };

                buffer.push(ExchangeRow {
                    od_start_id,
                    od_end_id,
                    fraction,
                    motion_exchange: origins * fraction,
                });
                done += 1;
                progress.advance(done);

                if buffer.len() >= EXCHANGE_BATCH {
                    flush(&mut insert_exchange, &mut insert_fraction, &mut buffer)?;
                }
            }
            flush(&mut insert_exchange, &mut insert_fraction, &mut buffer)?;
        }
        tx.commit()?;
        progress.finish(done);
        Ok(())
    }

    /// Renormalize so the objects that stayed in the network become the new
    /// 100%: each origin's fractions and absolute flows are divided by that
    /// origin's fraction total. Origins with a zero total are left untouched.
    pub fn normalize_motion_exchange(&self) -> Result<()> {
        self.conn().execute_batch(
            "
            DROP TABLE IF EXISTS temp.fraction_total;
            CREATE TEMP TABLE fraction_total AS
                SELECT od_start_id, SUM(fraction) AS total
                FROM motion_exchange_fraction GROUP BY od_start_id;

            UPDATE motion_exchange AS m
            SET motion_exchange = m.motion_exchange / t.total
            FROM fraction_total AS t
            WHERE t.od_start_id = m.od_start_id AND t.total <> 0;

            UPDATE motion_exchange_fraction AS f
            SET fraction = f.fraction / t.total
            FROM fraction_total AS t
            WHERE t.od_start_id = f.od_start_id AND t.total <> 0;

            DROP TABLE temp.fraction_total;
            ",
        )?;
        Ok(())
    }

    /// Subtract each origin's summed outflow from its origin mass.
    pub fn origins_shift(&self) -> Result<()> {
        self.conn().execute(
            "UPDATE model_parameters AS mp
             SET origins = mp.origins -
                 COALESCE((SELECT SUM(m.motion_exchange) FROM motion_exchange m
                           WHERE m.od_start_id = mp.od_id), 0)",
            [],
        )?;
        Ok(())
    }

    /// Subtract each destination's summed inflow from its capacity.
    pub fn destination_shift(&self) -> Result<()> {
        self.conn().execute(
            "UPDATE model_parameters AS mp
             SET destinations = mp.destinations -
                 COALESCE((SELECT SUM(m.motion_exchange) FROM motion_exchange m
                           WHERE m.od_end_id = mp.od_id), 0)",
            [],
        )?;
        Ok(())
    }

    /// Relocate mass: origins lose their outflow and gain their inflow.
    pub fn general_shift(&self) -> Result<()> {
        self.conn().execute(
            "UPDATE model_parameters AS mp
             SET origins = mp.origins
                 - COALESCE((SELECT SUM(m.motion_exchange) FROM motion_exchange m
                             WHERE m.od_start_id = mp.od_id), 0)
                 + COALESCE((SELECT SUM(m.motion_exchange) FROM motion_exchange m
                             WHERE m.od_end_id = mp.od_id), 0)",
            [],
        )?;
        Ok(())
    }
}

fn flush(
    insert_exchange: &mut rusqlite::Statement<'_>,
    insert_fraction: &mut rusqlite::Statement<'_>,
    buffer: &mut Vec<ExchangeRow>,
) -> Result<()> {
    for row in buffer.iter() {
        insert_exchange.execute(params![
            row.od_start_id,
            row.od_end_id,
            row.motion_exchange
        ])?;
        insert_fraction.execute(params![row.od_start_id, row.od_end_id, row.fraction])?;
    }
    buffer.clear();
    Ok(())
}
