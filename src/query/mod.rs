//! Geospatial queries over a postal code store.
//!
//! Resolves codes to coordinates, computes great-circle distances between
//! codes and scans the store for every code within a radius.

mod error;
mod service;

pub use error::QueryError;
pub use service::{GeoQuery, RadiusHit};
