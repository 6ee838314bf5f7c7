use crate::{
    api::data::{fetch_all_requests, fetch_all_users},
    auth::auth::AuthUser,
    services::summarizer::{ScheduleSummarizer, SummaryError},
};
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct AnalyzeResponse {
    pub analysis: String,
}

/// Generative coverage summary of the current schedule (manager only)
#[utoipa::path(
    post,
    path = "/api/v1/analyze",
    responses(
        (status = 200, description = "Schedule summary", body = AnalyzeResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 502, description = "Upstream summarizer failed"),
        (status = 503, description = "Summarizer not configured")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Analyze"
)]
pub async fn analyze_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    summarizer: web::Data<ScheduleSummarizer>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    if !summarizer.is_configured() {
        return Ok(HttpResponse::ServiceUnavailable().json(json!({
            "error": "Summarizer not configured"
        })));
    }

    let users = fetch_all_users(pool.get_ref()).await?;
    let requests = fetch_all_requests(pool.get_ref()).await?;

    match summarizer.analyze(&requests, &users).await {
        Ok(analysis) => Ok(HttpResponse::Ok().json(AnalyzeResponse { analysis })),
        Err(SummaryError::NotConfigured) => Ok(HttpResponse::ServiceUnavailable().json(json!({
            "error": "Summarizer not configured"
        }))),
        Err(e) => {
            error!(error = %e, "Schedule analysis failed");
            Ok(HttpResponse::BadGateway().json(json!({
                "error": "Schedule analysis failed"
            })))
        }
    }
}
