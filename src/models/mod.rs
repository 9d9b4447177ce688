//! Core data models for postal code lookups.

pub mod record;
pub mod unit;

pub use record::{GeoPoint, PostalRecord};
pub use unit::{to_kilometers, to_miles, DistanceUnit};
