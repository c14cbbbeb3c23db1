// Hospital Cost Analytics - Web Server
// JSON API over the cached cost table

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use cost_analytics::{
    available_periods, clinic_options, default_periods, facility_options, init_tracing,
    AnalyticsConfig, CostRecord, DashboardReport, RecordCache, Selection, StackedSegment,
};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

const ADDR_ENV: &str = "COST_ANALYTICS_ADDR";
const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Shared application state
#[derive(Clone)]
struct AppState {
    cache: Arc<Mutex<RecordCache>>,
    network_label: String,
}

impl AppState {
    /// Current table, reloaded by the cache when the source file changed
    fn table(&self) -> Result<Arc<[CostRecord]>, String> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| "record cache lock poisoned".to_string())?;

        cache.get().map_err(|e| format!("{:#}", e))
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

fn internal_error(context: &str, message: String) -> Response {
    tracing::error!(error = %message, "{}", context);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::failure(message)),
    )
        .into_response()
}

#[derive(Serialize)]
struct PeriodsResponse {
    periods: Vec<String>,
    default_a: Option<String>,
    default_b: Option<String>,
}

#[derive(Serialize)]
struct OptionsResponse {
    facilities: Vec<String>,
    clinics: Vec<String>,
}

#[derive(Serialize)]
struct FacilityResponse {
    facility: String,
    period: String,
    total: f64,
    segments: Vec<StackedSegment>,
}

#[derive(Serialize)]
struct ReloadResponse {
    records: usize,
    loaded_at: Option<String>,
}

/// Parsed `/api/report` query. Keys may repeat: `?facility=A&facility=B`.
#[derive(Debug, Default, PartialEq)]
struct ReportQuery {
    a: Option<String>,
    b: Option<String>,
    facilities: Vec<String>,
    clinics: Vec<String>,
}

impl ReportQuery {
    fn parse(raw: Option<&str>) -> Self {
        let mut query = ReportQuery::default();

        for pair in raw.unwrap_or("").split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode_component(value);
            if value.is_empty() {
                continue;
            }

            match key {
                "a" => query.a = Some(value),
                "b" => query.b = Some(value),
                "facility" => query.facilities.push(value),
                "clinic" => query.clinics.push(value),
                _ => {}
            }
        }

        query
    }

    /// Absent facility or clinic params mean "everything in the table"
    fn selection(&self, table: &[CostRecord]) -> Selection {
        let facilities = if self.facilities.is_empty() {
            facility_options(table)
        } else {
            self.facilities.clone()
        };
        let clinics = if self.clinics.is_empty() {
            clinic_options(table)
        } else {
            self.clinics.clone()
        };

        Selection::new(facilities, clinics)
    }

    /// Requested periods, falling back to the default pair
    fn periods(&self, table: &[CostRecord]) -> (String, String) {
        let (default_a, default_b) =
            default_periods(&available_periods(table)).unwrap_or_default();

        (
            self.a.clone().unwrap_or(default_a),
            self.b.clone().unwrap_or(default_b),
        )
    }
}

fn decode_component(value: &str) -> String {
    let spaced = value.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|v| v.into_owned())
        .unwrap_or(spaced)
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/periods - Available periods, most recent first, plus the default pair
async fn get_periods(State(state): State<AppState>) -> impl IntoResponse {
    match state.table() {
        Ok(table) => {
            let periods = available_periods(&table);
            let defaults = default_periods(&periods);

            let response = PeriodsResponse {
                default_a: defaults.as_ref().map(|(a, _)| a.clone()),
                default_b: defaults.map(|(_, b)| b),
                periods,
            };

            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => internal_error("Error loading periods", e),
    }
}

/// GET /api/options - Facility and clinic filter options
async fn get_options(State(state): State<AppState>) -> impl IntoResponse {
    match state.table() {
        Ok(table) => {
            let response = OptionsResponse {
                facilities: facility_options(&table),
                clinics: clinic_options(&table),
            };

            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => internal_error("Error loading filter options", e),
    }
}

/// GET /api/report?a=&b=&facility=&clinic= - Full dashboard report
async fn get_report(State(state): State<AppState>, RawQuery(raw): RawQuery) -> impl IntoResponse {
    let query = ReportQuery::parse(raw.as_deref());

    match state.table() {
        Ok(table) => {
            let selection = query.selection(&table);
            let (period_a, period_b) = query.periods(&table);

            let report = DashboardReport::build(
                &table,
                &selection,
                &period_a,
                &period_b,
                &state.network_label,
            );

            (StatusCode::OK, Json(ApiResponse::ok(report))).into_response()
        }
        Err(e) => internal_error("Error building report", e),
    }
}

/// GET /api/facilities/:name?b= - Period-B clinic breakdown for one facility
async fn get_facility(
    State(state): State<AppState>,
    Path(facility): Path<String>,
    RawQuery(raw): RawQuery,
) -> impl IntoResponse {
    let table = match state.table() {
        Ok(table) => table,
        Err(e) => return internal_error("Error loading facility", e),
    };

    if !facility_options(&table).contains(&facility) {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::failure(format!("unknown facility: {}", facility))),
        )
            .into_response();
    }

    let query = ReportQuery::parse(raw.as_deref());
    let (_, period_b) = query.periods(&table);
    let selection = Selection::new([facility.clone()], clinic_options(&table));
    let report = DashboardReport::build(&table, &selection, &period_b, &period_b, &state.network_label);

    let response = FacilityResponse {
        total: report.stacked.iter().map(|s| s.value).sum(),
        facility,
        period: period_b,
        segments: report.stacked,
    };

    (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
}

/// POST /api/reload - Drop the cached table and load it again
async fn reload(State(state): State<AppState>) -> impl IntoResponse {
    let mut cache = match state.cache.lock() {
        Ok(cache) => cache,
        Err(_) => {
            return internal_error("Error reloading", "record cache lock poisoned".to_string())
        }
    };

    cache.invalidate();

    match cache.get() {
        Ok(table) => {
            tracing::info!(records = table.len(), "table reloaded");
            let response = ReloadResponse {
                records: table.len(),
                loaded_at: cache.loaded_at().map(|t| t.to_rfc3339()),
            };

            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => internal_error("Error reloading", format!("{:#}", e)),
    }
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/periods", get(get_periods))
        .route("/options", get(get_options))
        .route("/report", get(get_report))
        .route("/facilities/:name", get(get_facility))
        .route("/reload", post(reload))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("cost_analytics=info,cost_server=info,tower_http=info");

    println!("🌐 Hospital Cost Analytics - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = AnalyticsConfig::load()?;
    let network_label = config.network_label.clone();

    // Warm the cache so a broken source fails at startup, not on first request
    let mut cache = RecordCache::new(config);
    let records = cache.get()?.len();
    println!("✓ Table loaded: {} records", records);

    let state = AppState {
        cache: Arc::new(Mutex::new(cache)),
        network_label,
    };

    let addr = std::env::var(ADDR_ENV).unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/report", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use cost_analytics::FacilityEntry;
    use tower::ServiceExt;

    fn table() -> Vec<CostRecord> {
        vec![
            CostRecord::new("1", "Hospital São Vicente", "Cirúrgica", "2025-01", 100.0),
            CostRecord::new("2", "Hospital do Coração", "Médica", "2025-02", 200.0),
        ]
    }

    #[test]
    fn test_parse_repeated_params() {
        let query = ReportQuery::parse(Some(
            "a=2025-01&b=2025-02&facility=Hospital+S%C3%A3o+Vicente&facility=Hospital%20do%20Cora%C3%A7%C3%A3o&clinic=M%C3%A9dica",
        ));

        assert_eq!(query.a.as_deref(), Some("2025-01"));
        assert_eq!(query.b.as_deref(), Some("2025-02"));
        assert_eq!(
            query.facilities,
            vec!["Hospital São Vicente", "Hospital do Coração"]
        );
        assert_eq!(query.clinics, vec!["Médica"]);
    }

    #[test]
    fn test_absent_params_use_defaults() {
        let records = table();
        let query = ReportQuery::parse(None);

        assert_eq!(query, ReportQuery::default());
        assert_eq!(query.selection(&records), Selection::everything(&records));
        assert_eq!(
            query.periods(&records),
            ("2025-01".to_string(), "2025-02".to_string())
        );
    }

    fn state_with(facilities: Vec<FacilityEntry>) -> AppState {
        let mut config = AnalyticsConfig::default();
        config.data_path = std::path::PathBuf::from("/nonexistent/custos.csv");
        config.synthetic.record_count = 300;
        config.facilities = facilities;

        AppState {
            cache: Arc::new(Mutex::new(RecordCache::new(config))),
            network_label: "Rede".to_string(),
        }
    }

    async fn get_json(state: AppState, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_facility_name_is_decoded_once() {
        let state = state_with(vec![
            FacilityEntry::new("2480666", "Hospital São Vicente"),
            FacilityEntry::new("9000001", "Ala 100% SUS"),
        ]);

        let (status, body) = get_json(state.clone(), "/api/facilities/Ala%20100%25%20SUS").await;
        assert_eq!(status, StatusCode::OK, "body: {}", body);
        assert_eq!(body["data"]["facility"], "Ala 100% SUS");

        let (status, body) =
            get_json(state, "/api/facilities/Hospital%20S%C3%A3o%20Vicente").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["facility"], "Hospital São Vicente");
    }

    #[tokio::test]
    async fn test_unknown_facility_is_not_found() {
        let state = state_with(vec![FacilityEntry::new("2480666", "Hospital São Vicente")]);

        let (status, body) = get_json(state, "/api/facilities/Nowhere").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[test]
    fn test_empty_and_unknown_keys_ignored() {
        let query = ReportQuery::parse(Some("a=&facility=&x=1&&b"));
        assert_eq!(query, ReportQuery::default());
    }
}
