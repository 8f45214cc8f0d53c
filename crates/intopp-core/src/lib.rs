//! Intervening-opportunities spatial interaction model: the math.
//!
//! A traveler leaving an origin is intercepted by closer destinations before
//! reaching farther ones. This crate holds the analytical pieces of that
//! model: the recursive piecewise convolution CDF and its exponential blend,
//! escape-fraction selectivity calibration, explicit ring-layout expansion,
//! and the field-name configuration the parameter table is built from.
//!
//! Zero I/O — ring construction and the motion-exchange engine live in the
//! store crate.

pub mod config;
pub mod constants;
pub mod convolution;
pub mod error;
pub mod layout;
pub mod selectivity;

pub use config::ModelConfig;
pub use constants::{EXCHANGE_BATCH, MAX_DISTANCE_MARGIN, SELECTIVITY_SCALE};
pub use convolution::{convolution_cdf, convolution_mix};
pub use error::{ModelError, Result};
pub use layout::{LayoutRing, expand_layout, parse_layout};
pub use selectivity::escape_fraction_selectivity;
