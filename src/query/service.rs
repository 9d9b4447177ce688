//! Query service resolving postal codes against an injected store.

use serde::Serialize;
use tracing::{debug, warn};

use super::QueryError;
use crate::distance::haversine_miles;
use crate::models::{DistanceUnit, PostalRecord};
use crate::store::CodeStore;

/// One match of a radius search
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RadiusHit<'a> {
    /// Bare postal code
    Code(&'a str),
    /// Full record for the code
    Record(&'a PostalRecord),
}

impl<'a> RadiusHit<'a> {
    pub fn code(&self) -> &'a str {
        match *self {
            RadiusHit::Code(code) => code,
            RadiusHit::Record(record) => &record.zip,
        }
    }
}

/// Geospatial query service
pub struct GeoQuery<S> {
    store: S,
}

impl<S: CodeStore> GeoQuery<S> {
    /// Create a new query service over a loaded store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Resolve a postal code, `None` if it is not in the store
    pub fn lookup(&self, code: &str) -> Option<&PostalRecord> {
        self.store.lookup(code)
    }

    /// Great-circle distance in miles between two codes.
    ///
    /// Returns `None` if either code is unknown.
    pub fn distance(&self, from: &str, to: &str) -> Option<f64> {
        let a = self.lookup(from)?;
        let b = self.lookup(to)?;
        Some(haversine_miles(a.point(), b.point()))
    }

    /// Same as [`GeoQuery::distance`], reported in `unit`
    pub fn distance_in(&self, from: &str, to: &str, unit: DistanceUnit) -> Option<f64> {
        self.distance(from, to).map(|miles| unit.from_miles(miles))
    }

    /// Every code within `miles` of `code`, the origin included.
    ///
    /// An unknown origin yields an empty result. Every key in the store is
    /// resolved; a key without a record aborts the scan with
    /// [`QueryError::CorruptStore`]. Results follow store iteration order.
    pub fn within_radius(
        &self,
        code: &str,
        miles: f64,
        full: bool,
    ) -> Result<Vec<RadiusHit<'_>>, QueryError> {
        let Some(origin) = self.lookup(code) else {
            debug!("Radius search from unknown code {:?}", code);
            return Ok(Vec::new());
        };
        let origin = origin.point();

        let mut hits = Vec::new();
        for candidate in self.store.codes() {
            let Some(record) = self.store.lookup(candidate) else {
                warn!("Code {:?} listed in store but has no record", candidate);
                return Err(QueryError::CorruptStore {
                    code: candidate.to_string(),
                });
            };

            if haversine_miles(origin, record.point()) <= miles {
                hits.push(if full {
                    RadiusHit::Record(record)
                } else {
                    RadiusHit::Code(candidate)
                });
            }
        }

        debug!(
            "Radius search {} mi from {}: {} of {} codes",
            miles,
            code,
            hits.len(),
            self.store.len()
        );

        Ok(hits)
    }

    /// Codes within `miles` of `code` as owned strings
    pub fn within_radius_codes(&self, code: &str, miles: f64) -> Result<Vec<String>, QueryError> {
        Ok(self
            .within_radius(code, miles, false)?
            .into_iter()
            .map(|hit| hit.code().to_string())
            .collect())
    }

    /// Records listed for a state (exact state code match)
    pub fn lookup_by_state(&self, state: &str) -> Vec<&PostalRecord> {
        self.store
            .codes_in_state(state)
            .iter()
            .filter_map(|code| self.store.lookup(code))
            .collect()
    }

    /// Records whose city and state match, ignoring case
    pub fn lookup_by_name(&self, city: &str, state: &str) -> Vec<&PostalRecord> {
        let city = city.to_lowercase();
        let state = state.to_lowercase();

        self.store
            .codes()
            .filter_map(|code| self.store.lookup(code))
            .filter(|r| r.city.to_lowercase() == city && r.state.to_lowercase() == state)
            .collect()
    }

    /// Get the underlying store (for stats/debugging)
    pub fn store(&self) -> &S {
        &self.store
    }
}
