//! Identifier and timestamp helpers.

mod ids;
pub mod timestamps;

pub use ids::{generate_run_id, input_digest};
pub use timestamps::{iso_timestamp, now_utc, Timestamp};
