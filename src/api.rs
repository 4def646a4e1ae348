// 🌐 REST API (axum)
//
// Every body is an ApiResponse envelope. Handlers lock the shared connection,
// call a service, and map RiskError onto an HTTP status.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db;
use crate::engine::RuleSummary;
use crate::entities::{Account, AlertStatus, CreditScore, Customer, LoanApplication, RiskAlert, Transaction};
use crate::error::RiskError;
use crate::services::{AccountSummary, LoanDecision, RiskControl, RiskProfile, TransactionResult};

const DEFAULT_ALERT_LIMIT: usize = 50;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub control: RiskControl,
}

impl AppState {
    pub fn new(conn: Connection, control: RiskControl) -> Self {
        AppState {
            db: Arc::new(Mutex::new(conn)),
            control,
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|e| ApiError(RiskError::Lock(e.to_string())))
    }
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub struct ApiError(pub RiskError);

impl From<RiskError> for ApiError {
    fn from(err: RiskError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(RiskError::validation(rejection.body_text()))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            RiskError::Validation(_) => StatusCode::BAD_REQUEST,
            RiskError::NotFound { .. } => StatusCode::NOT_FOUND,
            RiskError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(status = status.as_u16(), error = %self.0, "request failed");
        (status, Json(ApiResponse::err(self.0.to_string()))).into_response()
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn build_router(state: AppState) -> Router {
    let risk_routes = Router::new()
        .route("/transactions/process", post(process_transaction))
        .route("/loans/apply", post(apply_loan))
        .route("/loans/:id", get(get_loan))
        .route("/customers", post(upsert_customer))
        .route("/customers/:id", get(get_customer))
        .route("/customers/:id/risk-profile", get(risk_profile))
        .route("/customers/:id/credit-score", get(credit_score))
        .route("/customers/:id/alerts", get(customer_alerts))
        .route("/accounts", post(upsert_account))
        .route("/accounts/:number", get(get_account))
        .route("/alerts/:id/status", post(update_alert_status))
        .route("/rules", get(list_rules));

    Router::new()
        .route("/api/health", get(health_check))
        .nest("/api/risk-control", risk_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /transactions/process - screen and book a transaction
async fn process_transaction(
    State(state): State<AppState>,
    payload: Result<Json<Transaction>, JsonRejection>,
) -> ApiResult<TransactionResult> {
    let Json(tx) = payload?;
    let conn = state.conn()?;
    let result = state.control.transactions().process(&conn, tx)?;
    Ok(Json(ApiResponse::ok(result)))
}

/// POST /loans/apply
async fn apply_loan(
    State(state): State<AppState>,
    payload: Result<Json<LoanApplication>, JsonRejection>,
) -> ApiResult<LoanDecision> {
    let Json(application) = payload?;
    let conn = state.conn()?;
    let decision = state.control.loans().apply(&conn, application)?;
    Ok(Json(ApiResponse::ok(decision)))
}

/// GET /loans/:id
async fn get_loan(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<LoanApplication> {
    let conn = state.conn()?;
    let application =
        db::get_loan_application(&conn, &id)?.ok_or_else(|| RiskError::not_found("Loan application", id))?;
    Ok(Json(ApiResponse::ok(application)))
}

/// GET /customers/:id/risk-profile
async fn risk_profile(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<RiskProfile> {
    let conn = state.conn()?;
    let profile = state.control.profiles().profile(&conn, &id)?;
    Ok(Json(ApiResponse::ok(profile)))
}

/// GET /customers/:id/credit-score
async fn credit_score(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<CreditScore> {
    let conn = state.conn()?;
    let score = state.control.credit().score_customer(&conn, &id)?;
    Ok(Json(ApiResponse::ok(score)))
}

/// POST /customers - create or replace
async fn upsert_customer(
    State(state): State<AppState>,
    payload: Result<Json<Customer>, JsonRejection>,
) -> ApiResult<Customer> {
    let Json(customer) = payload?;
    customer.validate()?;
    let conn = state.conn()?;
    db::upsert_customer(&conn, &customer)?;
    tracing::info!(customer_id = %customer.customer_id, "customer saved");
    Ok(Json(ApiResponse::ok(customer)))
}

async fn get_customer(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Customer> {
    let conn = state.conn()?;
    Ok(Json(ApiResponse::ok(db::require_customer(&conn, &id)?)))
}

/// POST /accounts - create or replace; the owner must exist
async fn upsert_account(
    State(state): State<AppState>,
    payload: Result<Json<Account>, JsonRejection>,
) -> ApiResult<AccountSummary> {
    let Json(account) = payload?;
    account.validate()?;
    let conn = state.conn()?;
    db::require_customer(&conn, &account.customer_id)?;
    db::upsert_account(&conn, &account)?;
    tracing::info!(account = %Account::mask_account_number(&account.account_number), "account saved");
    Ok(Json(ApiResponse::ok(AccountSummary::from(account))))
}

/// GET /accounts/:number - account with predicate flags
async fn get_account(State(state): State<AppState>, Path(number): Path<String>) -> ApiResult<AccountSummary> {
    let conn = state.conn()?;
    let account = db::get_account(&conn, &number)?.ok_or_else(|| RiskError::not_found("Account", number))?;
    Ok(Json(ApiResponse::ok(AccountSummary::from(account))))
}

#[derive(Debug, Deserialize)]
struct AlertQuery {
    status: Option<String>,
    limit: Option<usize>,
}

/// GET /customers/:id/alerts?status=OPEN&limit=10
async fn customer_alerts(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<AlertQuery>,
) -> ApiResult<Vec<RiskAlert>> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(
            AlertStatus::parse(raw)
                .ok_or_else(|| RiskError::validation(format!("Unknown alert status: {}", raw)))?,
        ),
        None => None,
    };

    let conn = state.conn()?;
    db::require_customer(&conn, &id)?;
    let alerts = db::alerts_for_customer(&conn, &id, status, query.limit.unwrap_or(DEFAULT_ALERT_LIMIT))?;
    Ok(Json(ApiResponse::ok(alerts)))
}

#[derive(Debug, Deserialize)]
struct StatusUpdate {
    status: AlertStatus,
}

/// POST /alerts/:id/status  {"status": "ACKNOWLEDGED"}
async fn update_alert_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> ApiResult<RiskAlert> {
    let Json(update) = payload?;
    let conn = state.conn()?;
    let alert = db::update_alert_status(&conn, &id, update.status)?;
    tracing::info!(alert_id = %id, status = alert.status.as_str(), "alert status updated");
    Ok(Json(ApiResponse::ok(alert)))
}

/// GET /rules - loaded rule summaries
async fn list_rules(State(state): State<AppState>) -> ApiResult<Vec<RuleSummary>> {
    Ok(Json(ApiResponse::ok(state.control.rules())))
}
