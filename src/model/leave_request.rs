use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::model::ModelError;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    /// Pending and approved requests occupy calendar days and take part in
    /// conflict detection; rejected ones never do.
    pub fn is_active(self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Approved)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

/// Whole-day vacation spanning one or more days, or a same-day permit
/// carrying an optional clock-time window. The times are display only and
/// deliberately ignored by the overlap test.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LeaveKind {
    Vacation,
    Permit,
}

impl LeaveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LeaveKind::Vacation => "vacation",
            LeaveKind::Permit => "permit",
        }
    }
}

#[derive(Debug, FromRow)]
pub struct LeaveRequestRow {
    pub id: u64,
    pub user_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub kind: String,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub status: String,
    pub reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaveRequest {
    pub id: u64,
    pub user_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub kind: LeaveKind,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub status: RequestStatus,
    pub reason: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<LeaveRequestRow> for LeaveRequest {
    type Error = ModelError;

    fn try_from(row: LeaveRequestRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<RequestStatus>()
            .map_err(|_| ModelError::UnknownStatus(row.status.clone()))?;
        let kind = row
            .kind
            .parse::<LeaveKind>()
            .map_err(|_| ModelError::UnknownKind(row.kind.clone()))?;

        Ok(LeaveRequest {
            id: row.id,
            user_id: row.user_id,
            start_date: row.start_date,
            end_date: row.end_date,
            kind,
            start_time: row.start_time,
            end_time: row.end_time,
            status,
            reason: row.reason.unwrap_or_default(),
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> LeaveRequestRow {
        LeaveRequestRow {
            id: 1,
            user_id: 2,
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 7).unwrap(),
            kind: "vacation".to_string(),
            start_time: None,
            end_time: None,
            status: "approved".to_string(),
            reason: None,
            created_at: None,
        }
    }

    #[test]
    fn converts_row_to_domain_request() {
        let req = LeaveRequest::try_from(row()).unwrap();
        assert_eq!(req.status, RequestStatus::Approved);
        assert_eq!(req.kind, LeaveKind::Vacation);
        assert_eq!(req.reason, "");
    }

    #[test]
    fn rejects_unknown_status() {
        let mut bad = row();
        bad.status = "cancelled".to_string();
        assert!(matches!(
            LeaveRequest::try_from(bad),
            Err(ModelError::UnknownStatus(_))
        ));
    }

    #[test]
    fn active_statuses() {
        assert!(RequestStatus::Pending.is_active());
        assert!(RequestStatus::Approved.is_active());
        assert!(!RequestStatus::Rejected.is_active());
    }
}
