use crate::{
    api::data::{fetch_all_requests, fetch_all_users},
    auth::auth::AuthUser,
    config::Config,
    conflict::{Conflict, ConflictError, ConflictPolicy, DateRange, Subject, find_conflicts},
    model::{
        leave_request::{LeaveKind, LeaveRequest, RequestStatus},
        user::User,
    },
    services::mailer::Mailer,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, warn};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-06-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-06-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    /// Defaults to a whole-day vacation.
    #[schema(example = "vacation")]
    pub kind: Option<LeaveKind>,
    #[schema(example = "09:00:00", value_type = Option<String>)]
    pub start_time: Option<NaiveTime>,
    #[schema(example = "12:00:00", value_type = Option<String>)]
    pub end_time: Option<NaiveTime>,
    #[schema(example = "Vacanza estiva")]
    pub reason: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CreateLeaveResponse {
    #[schema(example = "Leave request submitted")]
    pub message: String,
    #[schema(example = "pending")]
    pub status: RequestStatus,
    /// Non-blocking warning; the request is stored regardless.
    #[schema(example = "2 colleagues from HELPDESK are already away in this period")]
    pub advisory: Option<String>,
    #[schema(example = 2)]
    pub conflict_count: usize,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveResponse {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 2)]
    pub user_id: u64,
    #[schema(example = "Luca Bianchi")]
    pub user_name: String,
    #[schema(example = "HELPDESK")]
    pub department: String,
    #[schema(example = "2026-06-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-06-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub kind: LeaveKind,
    #[schema(value_type = Option<String>)]
    pub start_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>)]
    pub end_time: Option<NaiveTime>,
    pub status: RequestStatus,
    pub reason: String,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
    /// Colleagues from the same department whose active requests overlap
    /// this one. Always empty once this request is rejected.
    pub conflicts: Vec<Conflict>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveResponse>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by owning user (managers only)
    #[schema(example = 2)]
    pub user_id: Option<u64>,
    /// Filter by status
    #[schema(example = "pending")]
    pub status: Option<RequestStatus>,
    /// Pagination page number (starts at 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Items per page
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

/// Conflict lookup for a stored request, degrading to "no banner" when the
/// snapshot is inconsistent instead of failing a whole listing.
fn conflicts_for(
    request: &LeaveRequest,
    all_requests: &[LeaveRequest],
    all_users: &[User],
    policy: &ConflictPolicy,
) -> Vec<Conflict> {
    let subject = match Subject::existing(request) {
        Ok(s) => s,
        Err(e) => {
            warn!(request_id = request.id, error = %e, "Skipping conflict check");
            return Vec::new();
        }
    };
    match find_conflicts(&subject, all_requests, all_users, policy) {
        Ok(conflicts) => conflicts,
        Err(e) => {
            warn!(request_id = request.id, error = %e, "Skipping conflict check");
            Vec::new()
        }
    }
}

fn to_response(
    request: LeaveRequest,
    all_requests: &[LeaveRequest],
    all_users: &[User],
    policy: &ConflictPolicy,
) -> LeaveResponse {
    let conflicts = conflicts_for(&request, all_requests, all_users, policy);
    let owner = all_users.iter().find(|u| u.id == request.user_id);

    LeaveResponse {
        id: request.id,
        user_id: request.user_id,
        user_name: owner.map(|u| u.name.clone()).unwrap_or_default(),
        department: owner
            .map(|u| u.department.to_string())
            .unwrap_or_default(),
        start_date: request.start_date,
        end_date: request.end_date,
        kind: request.kind,
        start_time: request.start_time,
        end_time: request.end_time,
        status: request.status,
        reason: request.reason,
        created_at: request.created_at,
        conflicts,
    }
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/requests",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave request submitted", body = CreateLeaveResponse),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    mailer: web::Data<Mailer>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let kind = payload.kind.unwrap_or(LeaveKind::Vacation);

    if DateRange::new(payload.start_date, payload.end_date).is_err() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "start_date cannot be after end_date"
        })));
    }

    if kind == LeaveKind::Permit && payload.start_date != payload.end_date {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "A permit must start and end on the same day"
        })));
    }

    // Advisory pass over the current snapshot. It never blocks submission.
    let all_users = fetch_all_users(pool.get_ref()).await?;
    let all_requests = fetch_all_requests(pool.get_ref()).await?;
    let policy = config.conflict_policy();

    let subject = Subject::draft(auth.user_id, payload.start_date, payload.end_date)
        .map_err(actix_web::error::ErrorBadRequest)?;

    let conflicts = match find_conflicts(&subject, &all_requests, &all_users, &policy) {
        Ok(conflicts) => conflicts,
        Err(ConflictError::UnknownSubject { .. }) => {
            return Ok(HttpResponse::Forbidden().json(json!({
                "error": "No user profile"
            })));
        }
        Err(e) => return Err(actix_web::error::ErrorBadRequest(e)),
    };

    let advisory = (!conflicts.is_empty()).then(|| {
        format!(
            "{} colleagues from {} are already away in this period",
            conflicts.len(),
            auth.department
        )
    });

    sqlx::query(
        r#"
        INSERT INTO leave_requests
            (user_id, start_date, end_date, kind, start_time, end_time, status, reason)
        VALUES (?, ?, ?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(kind.as_str())
    .bind(payload.start_time)
    .bind(payload.end_time)
    .bind(payload.reason.as_deref().unwrap_or_default())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Failed to create leave request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let requester = all_users
        .iter()
        .find(|u| u.id == auth.user_id)
        .map(|u| u.name.clone())
        .unwrap_or_else(|| auth.email.clone());

    mailer
        .send(
            &config.manager_email,
            &format!("New leave request: {}", requester),
            &format!(
                "{} ({}) requested {} from {} to {}.\nReason: {}",
                requester,
                auth.department,
                kind.as_str(),
                payload.start_date,
                payload.end_date,
                payload.reason.as_deref().unwrap_or("none")
            ),
        )
        .await;

    Ok(HttpResponse::Ok().json(CreateLeaveResponse {
        message: "Leave request submitted".to_string(),
        status: RequestStatus::Pending,
        advisory,
        conflict_count: conflicts.len(),
    }))
}

/* =========================
List leave requests
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/requests",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated request list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause
    // -------------------------
    // Employees only ever see their own requests; managers see everything
    // and may filter.
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if auth.is_manager() {
        if let Some(user_id) = query.user_id {
            where_sql.push_str(" AND user_id = ?");
            args.push(FilterValue::U64(user_id));
        }
    } else {
        where_sql.push_str(" AND user_id = ?");
        args.push(FilterValue::U64(auth.user_id));
    }

    let status_str = query.status.map(|s| s.as_str());
    if let Some(status) = status_str {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count leave requests");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    // Managers triage: pending rows first, then newest.
    let order_sql = if auth.is_manager() {
        "ORDER BY (status = 'pending') DESC, created_at DESC"
    } else {
        "ORDER BY created_at DESC"
    };

    let data_sql = format!(
        r#"
        SELECT id, user_id, start_date, end_date, kind, start_time, end_time,
               status, reason, created_at
        FROM leave_requests
        {}
        {}
        LIMIT ? OFFSET ?
        "#,
        where_sql, order_sql
    );

    let mut data_q =
        sqlx::query_as::<_, crate::model::leave_request::LeaveRequestRow>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let rows = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch leave list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let page_requests: Vec<LeaveRequest> = rows
        .into_iter()
        .map(|row| {
            LeaveRequest::try_from(row).map_err(|e| {
                error!(error = %e, "Corrupt leave request row");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })
        })
        .collect::<Result<_, _>>()?;

    // Conflict banners need the full snapshot, not just the current page.
    let all_users = fetch_all_users(pool.get_ref()).await?;
    let all_requests = fetch_all_requests(pool.get_ref()).await?;
    let policy = config.conflict_policy();

    let data: Vec<LeaveResponse> = page_requests
        .into_iter()
        .map(|req| to_response(req, &all_requests, &all_users, &policy))
        .collect();

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

/* =========================
Get one leave request
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/requests/{request_id}",
    params(
        ("request_id" = u64, Path, description = "ID of the leave request")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request_id = path.into_inner();

    let all_users = fetch_all_users(pool.get_ref()).await?;
    let all_requests = fetch_all_requests(pool.get_ref()).await?;

    let Some(request) = all_requests.iter().find(|r| r.id == request_id).cloned() else {
        return Ok(HttpResponse::NotFound().json(json!({
            "error": "Leave request not found"
        })));
    };

    if !auth.is_manager() && request.user_id != auth.user_id {
        return Err(actix_web::error::ErrorForbidden("Not your request"));
    }

    let policy = config.conflict_policy();
    Ok(HttpResponse::Ok().json(to_response(request, &all_requests, &all_users, &policy)))
}

/* =========================
Conflicts for one request
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/requests/{request_id}/conflicts",
    params(
        ("request_id" = u64, Path, description = "ID of the leave request")
    ),
    responses(
        (status = 200, description = "Conflicting requests", body = [Conflict]),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Leave request not found"),
        (status = 422, description = "Request could not be evaluated")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn get_leave_conflicts(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request_id = path.into_inner();

    let all_users = fetch_all_users(pool.get_ref()).await?;
    let all_requests = fetch_all_requests(pool.get_ref()).await?;

    let Some(request) = all_requests.iter().find(|r| r.id == request_id) else {
        return Ok(HttpResponse::NotFound().json(json!({
            "error": "Leave request not found"
        })));
    };

    if !auth.is_manager() && request.user_id != auth.user_id {
        return Err(actix_web::error::ErrorForbidden("Not your request"));
    }

    // Here the caller asked for the evaluation itself, so a subject that
    // cannot be evaluated is an error, not an empty banner.
    let outcome = Subject::existing(request)
        .and_then(|subject| {
            find_conflicts(&subject, &all_requests, &all_users, &config.conflict_policy())
        });

    match outcome {
        Ok(conflicts) => Ok(HttpResponse::Ok().json(conflicts)),
        Err(e) => Ok(HttpResponse::UnprocessableEntity().json(json!({
            "error": e.to_string()
        }))),
    }
}

/* =========================
Approve leave (manager)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/requests/{request_id}/approve",
    params(
        ("request_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved", body = Object, example = json!({
            "message": "Leave approved"
        })),
        (status = 400, description = "Leave request not found or already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    mailer: web::Data<Mailer>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    update_status(auth, pool, mailer, path.into_inner(), RequestStatus::Approved).await
}

/* =========================
Reject leave (manager)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/requests/{request_id}/reject",
    params(
        ("request_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected", body = Object, example = json!({
            "message": "Leave rejected"
        })),
        (status = 400, description = "Leave request not found or already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    mailer: web::Data<Mailer>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    update_status(auth, pool, mailer, path.into_inner(), RequestStatus::Rejected).await
}

/// Shared pending → approved/rejected transition. Both outcomes are
/// terminal; only pending rows ever move.
async fn update_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    mailer: web::Data<Mailer>,
    leave_id: u64,
    new_status: RequestStatus,
) -> actix_web::Result<HttpResponse> {
    auth.require_manager()?;

    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = ?
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(new_status.as_str())
    .bind(leave_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, leave_id, "Status update failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Leave request not found or already processed"
        })));
    }

    // Tell the owner; a failed mail never undoes the transition.
    let owner: Option<(String, String, NaiveDate)> = sqlx::query_as(
        r#"
        SELECT u.name, u.email, r.start_date
        FROM leave_requests r
        JOIN users u ON u.id = r.user_id
        WHERE r.id = ?
        "#,
    )
    .bind(leave_id)
    .fetch_optional(pool.get_ref())
    .await
    .unwrap_or_else(|e| {
        error!(error = %e, leave_id, "Failed to load owner for notification");
        None
    });

    if let Some((name, email, start_date)) = owner {
        mailer
            .send(
                &email,
                &format!("Leave update: {}", new_status),
                &format!(
                    "Hi {}, your leave request starting {} has been {}.",
                    name, start_date, new_status
                ),
            )
            .await;
    }

    let message = match new_status {
        RequestStatus::Approved => "Leave approved",
        _ => "Leave rejected",
    };

    Ok(HttpResponse::Ok().json(json!({ "message": message })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::department::Department;
    use crate::model::role::Role;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn user(id: u64, name: &str, department: Department) -> User {
        User {
            id,
            name: name.to_string(),
            email: format!("{}@azienda.it", name.to_lowercase()),
            role: Role::Employee,
            department,
            avatar: None,
            password: None,
            last_login_at: None,
        }
    }

    fn request(id: u64, user_id: u64, start: u32, end: u32, status: RequestStatus) -> LeaveRequest {
        LeaveRequest {
            id,
            user_id,
            start_date: date(start),
            end_date: date(end),
            kind: LeaveKind::Vacation,
            start_time: None,
            end_time: None,
            status,
            reason: String::new(),
            created_at: None,
        }
    }

    #[test]
    fn response_carries_owner_and_conflicts() {
        let users = vec![
            user(1, "Luca", Department::Helpdesk),
            user(2, "Chiara", Department::Helpdesk),
        ];
        let requests = vec![
            request(10, 1, 1, 7, RequestStatus::Pending),
            request(11, 2, 5, 9, RequestStatus::Approved),
        ];
        let policy = ConflictPolicy::default();

        let response = to_response(requests[0].clone(), &requests, &users, &policy);
        assert_eq!(response.user_name, "Luca");
        assert_eq!(response.department, "HELPDESK");
        assert_eq!(response.conflicts.len(), 1);
        assert_eq!(response.conflicts[0].user_name, "Chiara");
    }

    #[test]
    fn rejected_request_renders_without_banner() {
        let users = vec![
            user(1, "Luca", Department::Helpdesk),
            user(2, "Chiara", Department::Helpdesk),
        ];
        let requests = vec![
            request(10, 1, 1, 7, RequestStatus::Rejected),
            request(11, 2, 5, 9, RequestStatus::Approved),
        ];
        let policy = ConflictPolicy::default();

        let response = to_response(requests[0].clone(), &requests, &users, &policy);
        assert!(response.conflicts.is_empty());
    }

    #[test]
    fn unknown_owner_degrades_to_empty_banner() {
        let users = vec![user(2, "Chiara", Department::Helpdesk)];
        let requests = vec![
            request(10, 99, 1, 7, RequestStatus::Pending),
            request(11, 2, 5, 9, RequestStatus::Approved),
        ];
        let policy = ConflictPolicy::default();

        let conflicts = conflicts_for(&requests[0], &requests, &users, &policy);
        assert!(conflicts.is_empty());
    }
}
