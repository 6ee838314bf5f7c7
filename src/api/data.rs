use actix_web::error::ErrorInternalServerError;
use sqlx::MySqlPool;
use tracing::error;

use crate::model::leave_request::{LeaveRequest, LeaveRequestRow};
use crate::model::user::{User, UserRow};

/// Fetch-all snapshots backing the conflict, calendar, report and summary
/// views. The detector only ever sees data loaded here; it never queries
/// storage itself.

pub async fn fetch_all_users(pool: &MySqlPool) -> actix_web::Result<Vec<User>> {
    let rows = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, name, email, role, department, avatar, password, last_login_at
        FROM users
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch users");
        ErrorInternalServerError("Database error")
    })?;

    rows.into_iter()
        .map(|row| {
            User::try_from(row).map_err(|e| {
                error!(error = %e, "Corrupt user row");
                ErrorInternalServerError("Database error")
            })
        })
        .collect()
}

/// Requests in insertion order; conflict output ordering depends on it.
pub async fn fetch_all_requests(pool: &MySqlPool) -> actix_web::Result<Vec<LeaveRequest>> {
    let rows = sqlx::query_as::<_, LeaveRequestRow>(
        r#"
        SELECT id, user_id, start_date, end_date, kind, start_time, end_time,
               status, reason, created_at
        FROM leave_requests
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch leave requests");
        ErrorInternalServerError("Database error")
    })?;

    rows.into_iter()
        .map(|row| {
            LeaveRequest::try_from(row).map_err(|e| {
                error!(error = %e, "Corrupt leave request row");
                ErrorInternalServerError("Database error")
            })
        })
        .collect()
}
