use crate::{auth::auth::AuthUser, services::mailer::Mailer};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct NotifyReq {
    #[schema(example = "luca@azienda.it", format = "email")]
    pub to: String,
    #[schema(example = "Coverage reminder")]
    pub subject: String,
    pub body: String,
}

/// Send an ad-hoc email (manager only)
#[utoipa::path(
    post,
    path = "/api/v1/notify",
    request_body = NotifyReq,
    responses(
        (status = 200, description = "Notification dispatched", body = Object, example = json!({
            "success": true
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Notify"
)]
pub async fn send_notification(
    auth: AuthUser,
    mailer: web::Data<Mailer>,
    payload: web::Json<NotifyReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    mailer
        .send(&payload.to, &payload.subject, &payload.body)
        .await;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
