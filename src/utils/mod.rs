//! Utility functions and helpers.

pub mod clock;
pub mod date;
pub mod fs;
pub mod http;

pub use clock::{Clock, FixedClock, SystemClock};
