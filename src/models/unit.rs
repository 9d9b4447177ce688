//! Distance units.

use serde::{Deserialize, Serialize};

const KM_PER_MILE: f64 = 1.609344;

/// Unit a distance is reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Miles,
    #[serde(alias = "km", alias = "kilometres")]
    Kilometers,
}

impl DistanceUnit {
    /// Convert a distance in miles into this unit
    pub fn from_miles(&self, miles: f64) -> f64 {
        match self {
            DistanceUnit::Miles => miles,
            DistanceUnit::Kilometers => to_kilometers(miles),
        }
    }
}

impl std::fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceUnit::Miles => write!(f, "miles"),
            DistanceUnit::Kilometers => write!(f, "kilometers"),
        }
    }
}

pub fn to_kilometers(miles: f64) -> f64 {
    miles * KM_PER_MILE
}

pub fn to_miles(kilometers: f64) -> f64 {
    kilometers / KM_PER_MILE
}
