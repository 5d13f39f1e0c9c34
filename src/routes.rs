//! HTTP routes

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::db::{self, StoreError};
use crate::gemini::ContentGenerator;
use crate::intake::{self, IntakeError};
use crate::lifecycle::{LifecycleError, PackageTier, StatusFilter, Transition, DEFAULT_REVIEWER};
use crate::models::{
    AmbassadorApplication, AmbassadorPanel, ApplicationForm, BillingInfo, Language,
    StudentDataForReport,
};
use crate::report::{self, ReportFormat};

/// Application state shared across handlers
pub struct AppState {
    pub db: PgPool,
    pub generator: Arc<dyn ContentGenerator>,
}

#[derive(Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "success": false, "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        let status = match err {
            LifecycleError::MissingBilling(_) => StatusCode::BAD_REQUEST,
            LifecycleError::Terminal(_) | LifecycleError::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::Lifecycle(inner) => return ApiError::from(inner.clone()),
            StoreError::NotFound | StoreError::PanelNotFound => StatusCode::NOT_FOUND,
            StoreError::DuplicateEmail | StoreError::Conflict => StatusCode::CONFLICT,
            StoreError::InvalidRecord(_) | StoreError::Database(_) => {
                error!(error = %err, "store failure");
                return Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Internal server error".to_string(),
                };
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/ambassador-applications",
            get(list_applications).post(submit_application),
        )
        .route(
            "/ambassador-applications/:id",
            get(get_application).delete(delete_application),
        )
        .route("/ambassador-applications/:id/review", put(review_application))
        .route("/ambassador-applications/:id/payment", post(declare_payment))
        .route("/ambassador-applications/:id/activate", post(activate_application))
        .route("/ambassador-panel/:id", get(get_panel))
        .route("/student-report", post(student_report))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub async fn list_applications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Envelope<Vec<AmbassadorApplication>>>, ApiError> {
    let filter = query
        .status
        .as_deref()
        .filter(|status| !status.is_empty())
        .map(StatusFilter::parse)
        .transpose()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;

    let applications = db::list_applications(&state.db, filter).await?;
    Ok(Envelope::ok(applications))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedApplication {
    pub id: String,
    pub submitted_at: DateTime<Utc>,
}

pub async fn submit_application(
    State(state): State<Arc<AppState>>,
    Json(form): Json<ApplicationForm>,
) -> Result<(StatusCode, Json<Envelope<SubmittedApplication>>), ApiError> {
    let application = intake::build_application(&form, Utc::now(), &mut rand::thread_rng())?;
    db::insert_application(&state.db, &application).await?;

    Ok((
        StatusCode::CREATED,
        Envelope::ok(SubmittedApplication {
            id: application.id,
            submitted_at: application.submitted_at,
        }),
    ))
}

pub async fn get_application(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<AmbassadorApplication>>, ApiError> {
    let application = db::fetch_application(&state.db, &id).await?;
    Ok(Envelope::ok(application))
}

#[derive(Serialize)]
pub struct DeletedApplication {
    pub id: String,
}

pub async fn delete_application(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<DeletedApplication>>, ApiError> {
    db::delete_application(&state.db, &id).await?;
    Ok(Envelope::ok(DeletedApplication { id }))
}

pub async fn get_panel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<AmbassadorPanel>>, ApiError> {
    let panel = db::fetch_panel(&state.db, &id).await?;
    Ok(Envelope::ok(panel))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[serde(alias = "decision")]
    pub status: ReviewDecision,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn reviewer(reviewed_by: Option<String>) -> String {
    reviewed_by.unwrap_or_else(|| DEFAULT_REVIEWER.to_string())
}

pub async fn review_application(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<Envelope<AmbassadorApplication>>, ApiError> {
    let reviewed_by = reviewer(request.reviewed_by);
    let transition = match request.status {
        ReviewDecision::Approved => Transition::Approve {
            reviewed_by,
            notes: request.notes,
        },
        ReviewDecision::Rejected => Transition::Reject {
            reviewed_by,
            notes: request.notes,
        },
    };

    let application = db::apply_transition(&state.db, &id, &transition).await?;
    Ok(Envelope::ok(application))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDeclaration {
    pub package_name: String,
    pub billing_info: BillingInfo,
}

pub async fn declare_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<PaymentDeclaration>,
) -> Result<Json<Envelope<AmbassadorApplication>>, ApiError> {
    let package = PackageTier::parse(&request.package_name)
        .ok_or_else(|| ApiError::bad_request(format!("unknown package `{}`", request.package_name)))?;
    let transition = Transition::DeclarePayment {
        package,
        billing: request.billing_info,
    };

    let application = db::apply_transition(&state.db, &id, &transition).await?;
    Ok(Envelope::ok(application))
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateRequest {
    #[serde(default)]
    pub reviewed_by: Option<String>,
}

pub async fn activate_application(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Option<Json<ActivateRequest>>,
) -> Result<Json<Envelope<AmbassadorApplication>>, ApiError> {
    let Json(request) = request.unwrap_or_default();
    let transition = Transition::ConfirmPayment {
        reviewed_by: reviewer(request.reviewed_by),
    };

    let application = db::apply_transition(&state.db, &id, &transition).await?;
    Ok(Envelope::ok(application))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub student_data: StudentDataForReport,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub format: ReportFormat,
}

pub async fn student_report(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReportRequest>,
) -> Response {
    let language = Language::from_code(request.language.as_deref().unwrap_or_default());
    let generator = state.generator.as_ref();

    let result = match request.format {
        ReportFormat::Summary => {
            report::generate_student_report_summary(generator, &request.student_data, language)
                .await
                .map(|summary| serde_json::json!({ "summary": summary }))
        }
        ReportFormat::Json => {
            report::generate_student_report_json(generator, &request.student_data, language)
                .await
                .map(|report| serde_json::json!({ "report": report }))
        }
    };

    match result {
        Ok(body) => Json(body).into_response(),
        Err(err) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}
