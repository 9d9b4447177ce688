//! Postal code record as stored in the dataset.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Geographic point (lat/lon) in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(p: GeoPoint) -> Self {
        // geo uses x = longitude, y = latitude
        geo::Point::new(p.lon, p.lat)
    }
}

impl From<geo::Point<f64>> for GeoPoint {
    fn from(p: geo::Point<f64>) -> Self {
        Self {
            lat: p.y(),
            lon: p.x(),
        }
    }
}

impl From<GeoPoint> for geo_types::Coord<f64> {
    fn from(p: GeoPoint) -> Self {
        geo_types::Coord { x: p.lon, y: p.lat }
    }
}

/// One entry of the code table.
///
/// Records are immutable once loaded. Fields the dataset carries beyond the
/// ones modelled here are kept verbatim in `extra` so that dataset diffs see
/// them too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostalRecord {
    /// Postal code, exactly as keyed in the store
    #[serde(default)]
    pub zip: String,

    pub latitude: f64,

    pub longitude: f64,

    pub city: String,

    /// State / province code (e.g. "TN", "ON")
    pub state: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// Any other dataset fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PostalRecord {
    /// Create a record with the required fields
    pub fn new(
        zip: impl Into<String>,
        latitude: f64,
        longitude: f64,
        city: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            zip: zip.into(),
            latitude,
            longitude,
            city: city.into(),
            state: state.into(),
            country: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Flatten the record into field name -> JSON value, including `extra`.
    pub fn fields(&self) -> BTreeMap<String, Value> {
        let mut out = BTreeMap::new();
        out.insert("zip".to_string(), Value::from(self.zip.clone()));
        out.insert("latitude".to_string(), Value::from(self.latitude));
        out.insert("longitude".to_string(), Value::from(self.longitude));
        out.insert("city".to_string(), Value::from(self.city.clone()));
        out.insert("state".to_string(), Value::from(self.state.clone()));
        if let Some(country) = &self.country {
            out.insert("country".to_string(), Value::from(country.clone()));
        }
        for (k, v) in &self.extra {
            out.insert(k.clone(), v.clone());
        }
        out
    }
}
