//! HTTP handlers over the shared query service.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use zipgeo::distance::haversine_miles;
use zipgeo::{CodeStore, DistanceUnit, GeoQuery, MemoryStore, PostalRecord, RadiusHit};

/// Application state shared across handlers
pub struct AppState {
    pub query: GeoQuery<MemoryStore>,
    pub max_radius_miles: f64,
}

type HandlerError = (StatusCode, String);

fn not_found(code: &str) -> HandlerError {
    (StatusCode::NOT_FOUND, format!("Unknown postal code: {}", code))
}

/// Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let codes = state.query.store().len();
    Json(HealthResponse {
        status: if codes > 0 { "ok" } else { "empty" },
        codes,
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    codes: usize,
}

#[derive(Deserialize)]
pub struct LookupParams {
    zip: String,
}

/// Resolve a single postal code
pub async fn lookup_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LookupParams>,
) -> Result<Json<PostalRecord>, HandlerError> {
    state
        .query
        .lookup(&params.zip)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found(&params.zip))
}

#[derive(Deserialize)]
pub struct DistanceParams {
    from: String,
    to: String,
    /// "miles" (default) or "km"
    unit: Option<DistanceUnit>,
}

#[derive(Serialize)]
pub struct DistanceResponse {
    from: String,
    to: String,
    distance: f64,
    unit: DistanceUnit,
}

/// Resolve both codes once, reporting the first unknown one as 404
fn resolve_distance(
    query: &GeoQuery<MemoryStore>,
    from: &str,
    to: &str,
    unit: DistanceUnit,
) -> Result<f64, HandlerError> {
    match (query.lookup(from), query.lookup(to)) {
        (Some(a), Some(b)) => Ok(unit.from_miles(haversine_miles(a.point(), b.point()))),
        (None, _) => Err(not_found(from)),
        (_, None) => Err(not_found(to)),
    }
}

/// Great-circle distance between two codes
pub async fn distance_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DistanceParams>,
) -> Result<Json<DistanceResponse>, HandlerError> {
    let unit = params.unit.unwrap_or_default();
    let distance = resolve_distance(&state.query, &params.from, &params.to, unit)?;

    Ok(Json(DistanceResponse {
        from: params.from,
        to: params.to,
        distance,
        unit,
    }))
}

#[derive(Deserialize)]
pub struct RadiusParams {
    zip: String,
    miles: f64,
    /// Return full records instead of bare codes
    full: Option<bool>,
}

/// Owned form of [`RadiusHit`] for responses
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RadiusResult {
    Code(String),
    Record(PostalRecord),
}

impl From<RadiusHit<'_>> for RadiusResult {
    fn from(hit: RadiusHit<'_>) -> Self {
        match hit {
            RadiusHit::Code(code) => RadiusResult::Code(code.to_string()),
            RadiusHit::Record(record) => RadiusResult::Record(record.clone()),
        }
    }
}

#[derive(Serialize)]
pub struct RadiusResponse {
    zip: String,
    miles: f64,
    count: usize,
    results: Vec<RadiusResult>,
}

fn validate_radius(miles: f64, max: f64) -> Result<(), HandlerError> {
    if !miles.is_finite() || miles < 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Radius must be a non-negative number, got {}", miles),
        ));
    }
    if miles > max {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Radius {} exceeds the maximum of {} miles", miles, max),
        ));
    }
    Ok(())
}

/// All codes within a radius of a code
pub async fn radius_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RadiusParams>,
) -> Result<Json<RadiusResponse>, HandlerError> {
    validate_radius(params.miles, state.max_radius_miles)?;

    let hits = state
        .query
        .within_radius(&params.zip, params.miles, params.full.unwrap_or(false))
        .map_err(|e| {
            tracing::error!("Radius search failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    let results: Vec<RadiusResult> = hits.into_iter().map(RadiusResult::from).collect();

    Ok(Json(RadiusResponse {
        zip: params.zip,
        miles: params.miles,
        count: results.len(),
        results,
    }))
}

/// All records listed for a state
pub async fn state_handler(
    State(state): State<Arc<AppState>>,
    Path(region): Path<String>,
) -> Result<Json<Vec<PostalRecord>>, HandlerError> {
    let records: Vec<PostalRecord> = state
        .query
        .lookup_by_state(&region)
        .into_iter()
        .cloned()
        .collect();

    if records.is_empty() {
        return Err((
            StatusCode::NOT_FOUND,
            format!("No postal codes for state: {}", region),
        ));
    }

    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_radius() {
        assert!(validate_radius(0.0, 500.0).is_ok());
        assert!(validate_radius(500.0, 500.0).is_ok());
        assert_eq!(validate_radius(-1.0, 500.0).unwrap_err().0, StatusCode::BAD_REQUEST);
        assert_eq!(validate_radius(f64::NAN, 500.0).unwrap_err().0, StatusCode::BAD_REQUEST);
        assert_eq!(validate_radius(501.0, 500.0).unwrap_err().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_resolve_distance() {
        let query = GeoQuery::new(MemoryStore::from_records(vec![
            PostalRecord::new("37167", 35.9582, -86.5186, "Smyrna", "TN"),
            PostalRecord::new("37086", 36.0087, -86.5589, "La Vergne", "TN"),
        ]));

        let miles = resolve_distance(&query, "37167", "37086", DistanceUnit::Miles).unwrap();
        assert_eq!(Some(miles), query.distance("37167", "37086"));
        let km = resolve_distance(&query, "37167", "37086", DistanceUnit::Kilometers).unwrap();
        assert!((km / miles - 1.609344).abs() < 1e-9);

        let (status, message) =
            resolve_distance(&query, "00000", "37086", DistanceUnit::Miles).unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(message.contains("00000"));

        let (status, message) =
            resolve_distance(&query, "37167", "99999", DistanceUnit::Miles).unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(message.contains("99999"));
    }

    #[test]
    fn test_radius_result_from_hit() {
        let record = PostalRecord::new("37167", 35.9582, -86.5186, "Smyrna", "TN");
        let code = serde_json::to_value(RadiusResult::from(RadiusHit::Code("37167"))).unwrap();
        assert_eq!(code, serde_json::json!("37167"));

        let full = serde_json::to_value(RadiusResult::from(RadiusHit::Record(&record))).unwrap();
        assert_eq!(full["city"], "Smyrna");
    }
}
