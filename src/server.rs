// 🌐 Web Server - REST API with Axum
// Upload a CSV, get a session id, then pull summaries, chart data and the
// classified CSV for that session. Sessions live in memory only.

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::category::Category;
use crate::classifier::Classifier;
use crate::config::AppConfig;
use crate::error::{ExportError, ImportError};
use crate::export::{parse_columns, to_csv_string, ExportColumn, DEFAULT_FILE_NAME};
use crate::normalizer::SkippedRow;
use crate::session::{parse_category_filter, CategorizedTransaction, Session};
use crate::summary::{Report, Summary};

// ============================================================================
// State
// ============================================================================

/// In-memory sessions, oldest evicted first
pub struct SessionStore {
    sessions: HashMap<Uuid, Session>,
    order: VecDeque<Uuid>,
    capacity: usize,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        SessionStore {
            sessions: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn insert(&mut self, session: Session) -> Uuid {
        while self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.sessions.remove(&oldest);
                info!(%oldest, "evicted session");
            }
        }

        let id = Uuid::new_v4();
        self.sessions.insert(id, session);
        self.order.push_back(id);
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<Session> {
        self.order.retain(|existing| existing != id);
        self.sessions.remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    sessions: Arc<Mutex<SessionStore>>,
    classifier: Arc<Classifier>,
    config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, classifier: Classifier) -> Self {
        AppState {
            sessions: Arc::new(Mutex::new(SessionStore::new(config.server.max_sessions))),
            classifier: Arc::new(classifier),
            config: Arc::new(config),
        }
    }

    fn sessions(&self) -> Result<MutexGuard<'_, SessionStore>, ApiError> {
        self.sessions
            .lock()
            .map_err(|_| ApiError::Internal("session store lock poisoned".to_string()))
    }
}

// ============================================================================
// Responses
// ============================================================================

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unprocessable(String),
    Internal(String),
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Io(_) => ApiError::Internal(err.to_string()),
            // Everything else means the upload itself is unusable
            _ => ApiError::Unprocessable(err.to_string()),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::UnknownColumn(_) | ExportError::NoColumns => ApiError::BadRequest(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m),
            ApiError::Internal(m) => {
                error!("internal error: {}", m);
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(ApiResponse::err(message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Transaction response (flattened for the table view)
#[derive(Serialize, Deserialize)]
struct TransactionResponse {
    date: String,
    description: String,
    amount: f64,
    category: String,
    merchant: String,
    day_of_week: String,
    transaction_type: String,
    matched_keyword: Option<String>,
}

impl From<&CategorizedTransaction> for TransactionResponse {
    fn from(tx: &CategorizedTransaction) -> Self {
        let t = &tx.transaction;
        Self {
            date: t.date.format("%Y-%m-%d").to_string(),
            description: t.description.clone(),
            amount: t.amount,
            category: tx.category.label().to_string(),
            merchant: t.merchant.clone(),
            day_of_week: t.day_of_week.to_string(),
            transaction_type: t.kind.as_str().to_string(),
            matched_keyword: tx.matched_keyword.clone(),
        }
    }
}

#[derive(Serialize)]
struct CategoryInfo {
    label: &'static str,
    priority: usize,
    color: &'static str,
    keyword_count: usize,
}

#[derive(Serialize)]
struct UploadResponse {
    session_id: Uuid,
    source_name: String,
    header_row: usize,
    summary: Summary,
    skipped_count: usize,
    skipped: Vec<SkippedRow>,
}

// ============================================================================
// Query parameters
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct UploadParams {
    skip_rows: Option<usize>,
    auto_detect: Option<bool>,
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ViewParams {
    /// Comma-separated category labels
    categories: Option<String>,
    limit: Option<usize>,
    top: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ExportParams {
    columns: Option<String>,
    categories: Option<String>,
}

fn category_filter(raw: Option<&str>) -> Result<HashSet<Category>, ApiError> {
    match raw {
        Some(raw) => parse_category_filter(raw).map_err(|e| ApiError::BadRequest(e.to_string())),
        None => Ok(HashSet::new()),
    }
}

fn parse_session_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("Unknown session: {}", raw)))
}

fn unknown_session(id: &Uuid) -> ApiError {
    ApiError::NotFound(format!("Unknown session: {}", id))
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/categories - Labels in priority order
async fn get_categories(State(state): State<AppState>) -> ApiResult<Vec<CategoryInfo>> {
    let table = state.classifier.table();
    let categories = table
        .priority_order()
        .into_iter()
        .enumerate()
        .map(|(i, c)| CategoryInfo {
            label: c.label(),
            priority: i + 1,
            color: c.color(),
            keyword_count: table.keywords_for(c).len(),
        })
        .collect();
    Ok(Json(ApiResponse::ok(categories)))
}

/// POST /api/upload - Body is the raw CSV text
async fn upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: String,
) -> ApiResult<UploadResponse> {
    let mut options = state.config.normalize_options();
    if let Some(skip_rows) = params.skip_rows {
        options.skip_rows = skip_rows;
    }
    if let Some(auto_detect) = params.auto_detect {
        options.auto_detect_header = auto_detect;
    }
    let source_name = params.name.unwrap_or_else(|| "upload.csv".to_string());

    let session = Session::from_reader(&source_name, body.as_bytes(), &state.classifier, &options)?;

    let summary = Summary::compute(&session.transactions);
    let skipped = session.skipped.clone();
    let header_row = session.header_row;

    let session_id = state.sessions()?.insert(session);
    info!(%session_id, source = %source_name, "session created");

    Ok(Json(ApiResponse::ok(UploadResponse {
        session_id,
        source_name,
        header_row,
        summary,
        skipped_count: skipped.len(),
        skipped,
    })))
}

/// GET /api/sessions/:id/summary
async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ViewParams>,
) -> ApiResult<Summary> {
    let id = parse_session_id(&id)?;
    let filter = category_filter(params.categories.as_deref())?;

    let sessions = state.sessions()?;
    let session = sessions.get(&id).ok_or_else(|| unknown_session(&id))?;
    Ok(Json(ApiResponse::ok(Summary::compute(session.filtered(&filter)))))
}

/// GET /api/sessions/:id/transactions
async fn get_transactions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ViewParams>,
) -> ApiResult<Vec<TransactionResponse>> {
    let id = parse_session_id(&id)?;
    let filter = category_filter(params.categories.as_deref())?;

    let sessions = state.sessions()?;
    let session = sessions.get(&id).ok_or_else(|| unknown_session(&id))?;
    let response = session
        .filtered(&filter)
        .into_iter()
        .take(params.limit.unwrap_or(usize::MAX))
        .map(TransactionResponse::from)
        .collect();

    Ok(Json(ApiResponse::ok(response)))
}

/// GET /api/sessions/:id/charts - Everything the dashboard draws
async fn get_charts(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ViewParams>,
) -> ApiResult<Report> {
    let id = parse_session_id(&id)?;
    let filter = category_filter(params.categories.as_deref())?;
    let top = params.top.unwrap_or(state.config.analysis.top_merchants);

    let sessions = state.sessions()?;
    let session = sessions.get(&id).ok_or_else(|| unknown_session(&id))?;
    Ok(Json(ApiResponse::ok(Report::build(&session.filtered(&filter), top))))
}

/// GET /api/sessions/:id/skipped - Rows dropped during cleaning
async fn get_skipped(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<SkippedRow>> {
    let id = parse_session_id(&id)?;

    let sessions = state.sessions()?;
    let session = sessions.get(&id).ok_or_else(|| unknown_session(&id))?;
    Ok(Json(ApiResponse::ok(session.skipped.clone())))
}

/// GET /api/sessions/:id/export - CSV download
async fn export_csv(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ExportParams>,
) -> Result<Response, ApiError> {
    let id = parse_session_id(&id)?;
    let filter = category_filter(params.categories.as_deref())?;
    let columns = match params.columns.as_deref() {
        Some(raw) => parse_columns(raw)?,
        None => ExportColumn::defaults(),
    };

    let csv = {
        let sessions = state.sessions()?;
        let session = sessions.get(&id).ok_or_else(|| unknown_session(&id))?;
        to_csv_string(session.filtered(&filter), &columns)?
    };

    let disposition = format!("attachment; filename=\"{}\"", DEFAULT_FILE_NAME);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

/// DELETE /api/sessions/:id - End a session
async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<&'static str> {
    let id = parse_session_id(&id)?;
    state
        .sessions()?
        .remove(&id)
        .ok_or_else(|| unknown_session(&id))?;
    info!(%id, "session ended");
    Ok(Json(ApiResponse::ok("deleted")))
}

/// GET / - Serve the dashboard
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let max_upload_bytes = state.config.server.max_upload_bytes;

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/categories", get(get_categories))
        .route("/upload", post(upload))
        .route("/sessions/:id", delete(delete_session))
        .route("/sessions/:id/summary", get(get_summary))
        .route("/sessions/:id/transactions", get(get_transactions))
        .route("/sessions/:id/charts", get(get_charts))
        .route("/sessions/:id/skipped", get(get_skipped))
        .route("/sessions/:id/export", get(export_csv))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new(concat!(env!("CARGO_MANIFEST_DIR"), "/web")))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

// ============================================================================
// TESTS
// ============================================================================
