//! SQLite persistence and orchestration for the intervening-opportunities
//! model: ring construction, ring totals, the batched motion-exchange engine,
//! and parameter calibration/snapshots over the math in `intopp-core`.

pub mod dataset;
pub mod error;
pub mod exchange;
pub mod params;
pub mod progress;
pub mod rings;
pub mod schema;
pub mod store;

pub use dataset::{Dataset, DistanceRecord, PointRecord};
pub use error::{Result, StoreError};
pub use progress::{LogProgress, NullProgress, ProgressSink};
pub use store::Store;
