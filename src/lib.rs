//! zipgeo - postal code geospatial lookups
//!
//! This library provides the code store, distance and radius queries shared
//! by the query server and the dataset diff tool.

pub mod compare;
pub mod config;
pub mod distance;
pub mod models;
pub mod query;
pub mod store;

pub use models::{DistanceUnit, GeoPoint, PostalRecord};
pub use query::{GeoQuery, QueryError, RadiusHit};
pub use store::{CodeStore, MemoryStore};
