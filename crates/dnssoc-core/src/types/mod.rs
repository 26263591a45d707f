//! Type definitions shared across the dnssoc crates.

mod indicator;
mod matched;
mod record;

pub use indicator::*;
pub use matched::*;
pub use record::*;
