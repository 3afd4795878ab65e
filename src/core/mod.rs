//! Core data types: segments, traces, features and time handling

pub mod data_link;
pub mod feature;
pub mod segment;
pub mod time;
pub mod trace;

pub use data_link::*;
pub use feature::*;
pub use segment::*;
pub use time::*;
pub use trace::*;
