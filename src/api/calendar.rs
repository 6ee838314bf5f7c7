use crate::{
    api::data::{fetch_all_requests, fetch_all_users},
    auth::auth::AuthUser,
    conflict::coverage_on,
    model::leave_request::RequestStatus,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use super::user::UserResponse;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct CalendarQuery {
    #[schema(example = 2026)]
    pub year: i32,
    /// 1-based month
    #[schema(example = 6)]
    pub month: u32,
}

#[derive(Serialize, ToSchema)]
pub struct CalendarRow {
    pub user: UserResponse,
    /// One cell per day of the month: approved paints solid, pending
    /// muted, absent days stay empty.
    pub days: Vec<Option<RequestStatus>>,
}

#[derive(Serialize, ToSchema)]
pub struct CalendarResponse {
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 6)]
    pub month: u32,
    #[schema(example = 30)]
    pub days_in_month: u32,
    pub rows: Vec<CalendarRow>,
}

/// First day of the month plus its length, or `None` for an impossible
/// year/month.
fn month_span(year: i32, month: u32) -> Option<(NaiveDate, u32)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    }?;
    Some((
        first,
        next_month.signed_duration_since(first).num_days() as u32,
    ))
}

/// Month absence grid
///
/// Managers see the whole roster; employees only their own department,
/// which is what they need to coordinate cover.
#[utoipa::path(
    get,
    path = "/api/v1/calendar",
    params(CalendarQuery),
    responses(
        (status = 200, description = "Per-user per-day absence grid", body = CalendarResponse),
        (status = 400, description = "Invalid year/month"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Calendar"
)]
pub async fn month_view(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<CalendarQuery>,
) -> actix_web::Result<impl Responder> {
    let Some((first, days_in_month)) = month_span(query.year, query.month) else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Invalid year/month"
        })));
    };

    let all_users = fetch_all_users(pool.get_ref()).await?;
    let all_requests = fetch_all_requests(pool.get_ref()).await?;

    let visible_users: Vec<_> = if auth.is_manager() {
        all_users
    } else {
        all_users
            .into_iter()
            .filter(|u| u.department == auth.department)
            .collect()
    };

    let rows: Vec<CalendarRow> = visible_users
        .into_iter()
        .map(|user| {
            let days = (0..days_in_month)
                .map(|offset| {
                    let day = first + chrono::Duration::days(offset as i64);
                    coverage_on(user.id, day, &all_requests)
                })
                .collect();
            CalendarRow {
                user: UserResponse::from(user),
                days,
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(CalendarResponse {
        year: query.year,
        month: query.month,
        days_in_month,
        rows,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_span_handles_lengths_and_leap_years() {
        assert_eq!(month_span(2024, 6).unwrap().1, 30);
        assert_eq!(month_span(2024, 2).unwrap().1, 29);
        assert_eq!(month_span(2023, 2).unwrap().1, 28);
        assert_eq!(month_span(2024, 12).unwrap().1, 31);
    }

    #[test]
    fn month_span_rejects_impossible_months() {
        assert!(month_span(2024, 0).is_none());
        assert!(month_span(2024, 13).is_none());
    }
}
