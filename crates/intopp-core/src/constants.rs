/// Fixed-point scale for selectivity as stored in the parameter table.
/// Stored values are `selectivity * SELECTIVITY_SCALE`; divide before use.
pub const SELECTIVITY_SCALE: f64 = 1_000_000.0;

/// Safety margin applied to the maximum observed distance when deriving the
/// uniform ring-width factor, so the farthest pair lands inside the last ring.
pub const MAX_DISTANCE_MARGIN: f64 = 1.0001;

/// Motion-exchange rows buffered in memory before a flush to the store.
pub const EXCHANGE_BATCH: usize = 10_000;
