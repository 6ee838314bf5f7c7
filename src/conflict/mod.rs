//! Department-scoped overlap detection for leave requests.
//!
//! Pure functions over an in-memory snapshot of requests and users; the
//! caller fetches the snapshot, this module only reads it. Every view that
//! needs overlap information (pre-submission advisory, request-list banner,
//! dedicated conflicts endpoint) goes through [`find_conflicts`]; calendar
//! cell painting uses the simpler [`coverage_on`] and never the detector.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::department::Department;
use crate::model::leave_request::{LeaveRequest, RequestStatus};
use crate::model::user::User;

#[derive(Debug, Error)]
pub enum ConflictError {
    /// The subject's owner is not in the supplied roster. Surfaced as an
    /// error rather than an empty result so callers can tell "no conflicts"
    /// apart from "could not evaluate".
    #[error("request owner {user_id} is not a known user")]
    UnknownSubject { user_id: u64 },

    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

/// Closed interval of calendar days. Day granularity only; clock times on
/// same-day permits are not part of the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ConflictError> {
        if start > end {
            return Err(ConflictError::InvalidDateRange { start, end });
        }
        Ok(DateRange { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Closed-interval intersection: a range ending on day D overlaps one
    /// starting on day D.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && self.end >= other.start
    }
}

/// The request under examination: either an existing row or a draft that
/// has not been persisted yet (pre-submission advisory).
#[derive(Debug, Clone)]
pub struct Subject {
    pub request_id: Option<u64>,
    pub user_id: u64,
    pub range: DateRange,
    pub status: RequestStatus,
}

impl Subject {
    pub fn existing(request: &LeaveRequest) -> Result<Self, ConflictError> {
        Ok(Subject {
            request_id: Some(request.id),
            user_id: request.user_id,
            range: DateRange::new(request.start_date, request.end_date)?,
            status: request.status,
        })
    }

    /// A hypothetical pending request, used before anything is written.
    pub fn draft(user_id: u64, start: NaiveDate, end: NaiveDate) -> Result<Self, ConflictError> {
        Ok(Subject {
            request_id: None,
            user_id,
            range: DateRange::new(start, end)?,
            status: RequestStatus::Pending,
        })
    }
}

/// Which departments are excused from conflict checking. Keeping this as
/// one explicit value stops call sites from drifting apart on whether
/// MANAGEMENT is excused.
#[derive(Debug, Clone)]
pub struct ConflictPolicy {
    pub exempt_departments: HashSet<Department>,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        ConflictPolicy {
            exempt_departments: HashSet::from([Department::Management]),
        }
    }
}

impl ConflictPolicy {
    pub fn from_names<'a, I: IntoIterator<Item = &'a str>>(names: I) -> Self {
        ConflictPolicy {
            exempt_departments: names.into_iter().map(Department::parse).collect(),
        }
    }

    pub fn is_exempt(&self, department: &Department) -> bool {
        self.exempt_departments.contains(department)
    }
}

/// One colleague whose active request collides with the subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Conflict {
    pub request_id: u64,
    pub user_id: u64,
    pub user_name: String,
    pub status: RequestStatus,
}

/// Which other active requests from the subject owner's department overlap
/// the subject's date range.
///
/// Result order is the iteration order of `all_requests`. A rejected
/// subject yields an empty set, as does an owner in an exempt department.
/// Candidates are skipped when rejected, owned by the subject's owner, or
/// owned by someone outside the subject's department; a candidate whose
/// owner is missing from the roster is skipped rather than failing the
/// whole evaluation.
pub fn find_conflicts(
    subject: &Subject,
    all_requests: &[LeaveRequest],
    all_users: &[User],
    policy: &ConflictPolicy,
) -> Result<Vec<Conflict>, ConflictError> {
    let owner = all_users
        .iter()
        .find(|u| u.id == subject.user_id)
        .ok_or(ConflictError::UnknownSubject {
            user_id: subject.user_id,
        })?;

    if subject.status == RequestStatus::Rejected || policy.is_exempt(&owner.department) {
        return Ok(Vec::new());
    }

    let mut conflicts = Vec::new();
    for candidate in all_requests {
        if subject.request_id == Some(candidate.id) || candidate.user_id == subject.user_id {
            continue;
        }
        if !candidate.status.is_active() {
            continue;
        }
        let Some(colleague) = all_users.iter().find(|u| u.id == candidate.user_id) else {
            continue;
        };
        if colleague.department != owner.department {
            continue;
        }

        let range = DateRange::new(candidate.start_date, candidate.end_date)?;
        if subject.range.overlaps(&range) {
            conflicts.push(Conflict {
                request_id: candidate.id,
                user_id: colleague.id,
                user_name: colleague.name.clone(),
                status: candidate.status,
            });
        }
    }

    Ok(conflicts)
}

/// Calendar-cell primitive: does `user_id` have an active request covering
/// `day`? Returns the first matching request's status in insertion order.
/// Deliberately a direct range-membership test, not a conflict computation.
pub fn coverage_on(
    user_id: u64,
    day: NaiveDate,
    requests: &[LeaveRequest],
) -> Option<RequestStatus> {
    requests
        .iter()
        .find(|r| {
            r.user_id == user_id
                && r.status.is_active()
                && r.start_date <= day
                && day <= r.end_date
        })
        .map(|r| r.status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave_request::LeaveKind;
    use crate::model::role::Role;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn user(id: u64, name: &str, department: Department) -> User {
        User {
            id,
            name: name.to_string(),
            email: format!("{}@azienda.it", name.to_lowercase().replace(' ', ".")),
            role: Role::Employee,
            department,
            avatar: None,
            password: None,
            last_login_at: None,
        }
    }

    fn request(
        id: u64,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
        status: RequestStatus,
    ) -> LeaveRequest {
        LeaveRequest {
            id,
            user_id,
            start_date: start,
            end_date: end,
            kind: LeaveKind::Vacation,
            start_time: None,
            end_time: None,
            status,
            reason: String::new(),
            created_at: None,
        }
    }

    #[test]
    fn invalid_range_is_rejected() {
        let err = DateRange::new(date(2024, 6, 7), date(2024, 6, 1));
        assert!(matches!(err, Err(ConflictError::InvalidDateRange { .. })));
    }

    #[test]
    fn touching_endpoints_overlap() {
        let a = DateRange::new(date(2024, 6, 1), date(2024, 6, 5)).unwrap();
        let b = DateRange::new(date(2024, 6, 5), date(2024, 6, 9)).unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn disjoint_ranges_do_not_overlap() {
        let a = DateRange::new(date(2024, 6, 1), date(2024, 6, 4)).unwrap();
        let b = DateRange::new(date(2024, 6, 5), date(2024, 6, 9)).unwrap();
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn same_department_overlap_is_reported_both_ways() {
        // A (Helpdesk, approved, 06-01..06-07) and B (Helpdesk, pending,
        // 06-01..06-02) must see each other.
        let users = vec![
            user(1, "A", Department::Helpdesk),
            user(2, "B", Department::Helpdesk),
        ];
        let requests = vec![
            request(10, 1, date(2024, 6, 1), date(2024, 6, 7), RequestStatus::Approved),
            request(11, 2, date(2024, 6, 1), date(2024, 6, 2), RequestStatus::Pending),
        ];
        let policy = ConflictPolicy::default();

        let from_a = find_conflicts(
            &Subject::existing(&requests[0]).unwrap(),
            &requests,
            &users,
            &policy,
        )
        .unwrap();
        assert_eq!(from_a.len(), 1);
        assert_eq!(from_a[0].request_id, 11);
        assert_eq!(from_a[0].status, RequestStatus::Pending);

        let from_b = find_conflicts(
            &Subject::existing(&requests[1]).unwrap(),
            &requests,
            &users,
            &policy,
        )
        .unwrap();
        assert_eq!(from_b.len(), 1);
        assert_eq!(from_b[0].request_id, 10);
    }

    #[test]
    fn non_overlapping_colleague_is_excluded() {
        let users = vec![
            user(1, "A", Department::Helpdesk),
            user(2, "B", Department::Helpdesk),
        ];
        let requests = vec![
            request(10, 1, date(2024, 6, 1), date(2024, 6, 4), RequestStatus::Pending),
            request(11, 2, date(2024, 6, 10), date(2024, 6, 12), RequestStatus::Pending),
        ];
        let conflicts = find_conflicts(
            &Subject::existing(&requests[0]).unwrap(),
            &requests,
            &users,
            &ConflictPolicy::default(),
        )
        .unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn different_departments_never_conflict() {
        // Identical ranges, Commerciali vs Prevendita.
        let users = vec![
            user(3, "C", Department::Commerciali),
            user(4, "D", Department::Prevendita),
        ];
        let requests = vec![
            request(20, 3, date(2024, 6, 10), date(2024, 6, 20), RequestStatus::Pending),
            request(21, 4, date(2024, 6, 10), date(2024, 6, 20), RequestStatus::Pending),
        ];
        for req in &requests {
            let conflicts = find_conflicts(
                &Subject::existing(req).unwrap(),
                &requests,
                &users,
                &ConflictPolicy::default(),
            )
            .unwrap();
            assert!(conflicts.is_empty());
        }
    }

    #[test]
    fn a_request_never_conflicts_with_itself() {
        let users = vec![user(1, "A", Department::Helpdesk)];
        let requests = vec![request(
            10,
            1,
            date(2024, 6, 1),
            date(2024, 6, 7),
            RequestStatus::Pending,
        )];
        let conflicts = find_conflicts(
            &Subject::existing(&requests[0]).unwrap(),
            &requests,
            &users,
            &ConflictPolicy::default(),
        )
        .unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn rejected_requests_are_invisible_on_both_sides() {
        // E rejected 06-01..06-05, F pending 06-03..06-04.
        let users = vec![
            user(5, "E", Department::Helpdesk),
            user(6, "F", Department::Helpdesk),
        ];
        let requests = vec![
            request(30, 5, date(2024, 6, 1), date(2024, 6, 5), RequestStatus::Rejected),
            request(31, 6, date(2024, 6, 3), date(2024, 6, 4), RequestStatus::Pending),
        ];
        let policy = ConflictPolicy::default();

        // F's check: E is excluded as a rejected candidate.
        let from_f = find_conflicts(
            &Subject::existing(&requests[1]).unwrap(),
            &requests,
            &users,
            &policy,
        )
        .unwrap();
        assert!(from_f.is_empty());

        // E's own check: rejected subjects short-circuit to empty.
        let from_e = find_conflicts(
            &Subject::existing(&requests[0]).unwrap(),
            &requests,
            &users,
            &policy,
        )
        .unwrap();
        assert!(from_e.is_empty());
    }

    #[test]
    fn changing_department_removes_the_conflict() {
        let mut users = vec![
            user(1, "A", Department::Helpdesk),
            user(2, "B", Department::Helpdesk),
        ];
        let requests = vec![
            request(10, 1, date(2024, 6, 1), date(2024, 6, 7), RequestStatus::Pending),
            request(11, 2, date(2024, 6, 3), date(2024, 6, 9), RequestStatus::Pending),
        ];
        let policy = ConflictPolicy::default();
        let subject = Subject::existing(&requests[0]).unwrap();

        let before = find_conflicts(&subject, &requests, &users, &policy).unwrap();
        assert_eq!(before.len(), 1);

        users[1].department = Department::Prevendita;
        let after = find_conflicts(&subject, &requests, &users, &policy).unwrap();
        assert!(after.is_empty());
    }

    #[test]
    fn policy_from_names_normalizes() {
        let policy = ConflictPolicy::from_names(["management", " helpdesk "]);
        assert!(policy.is_exempt(&Department::Management));
        assert!(policy.is_exempt(&Department::Helpdesk));
        assert!(!policy.is_exempt(&Department::Prevendita));
    }

    #[test]
    fn exempt_department_short_circuits() {
        let users = vec![
            user(1, "Boss", Department::Management),
            user(2, "Deputy", Department::Management),
        ];
        let requests = vec![
            request(10, 1, date(2024, 6, 1), date(2024, 6, 7), RequestStatus::Pending),
            request(11, 2, date(2024, 6, 1), date(2024, 6, 7), RequestStatus::Pending),
        ];
        let conflicts = find_conflicts(
            &Subject::existing(&requests[0]).unwrap(),
            &requests,
            &users,
            &ConflictPolicy::default(),
        )
        .unwrap();
        assert!(conflicts.is_empty());

        // Same snapshot under an empty exemption set does conflict.
        let strict = ConflictPolicy {
            exempt_departments: HashSet::new(),
        };
        let conflicts = find_conflicts(
            &Subject::existing(&requests[0]).unwrap(),
            &requests,
            &users,
            &strict,
        )
        .unwrap();
        assert_eq!(conflicts.len(), 1);
    }

    #[test]
    fn unknown_owner_is_an_error_not_an_empty_set() {
        let users = vec![user(1, "A", Department::Helpdesk)];
        let requests = vec![request(
            10,
            99,
            date(2024, 6, 1),
            date(2024, 6, 7),
            RequestStatus::Pending,
        )];
        let result = find_conflicts(
            &Subject::existing(&requests[0]).unwrap(),
            &requests,
            &users,
            &ConflictPolicy::default(),
        );
        assert!(matches!(
            result,
            Err(ConflictError::UnknownSubject { user_id: 99 })
        ));
    }

    #[test]
    fn draft_subject_sees_existing_requests() {
        let users = vec![
            user(1, "A", Department::Commerciali),
            user(2, "B", Department::Commerciali),
        ];
        let requests = vec![request(
            10,
            2,
            date(2024, 6, 5),
            date(2024, 6, 10),
            RequestStatus::Approved,
        )];
        let draft = Subject::draft(1, date(2024, 6, 10), date(2024, 6, 12)).unwrap();
        let conflicts =
            find_conflicts(&draft, &requests, &users, &ConflictPolicy::default()).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].user_name, "B");
    }

    #[test]
    fn conflict_order_follows_request_iteration_order() {
        let users = vec![
            user(1, "A", Department::Helpdesk),
            user(2, "B", Department::Helpdesk),
            user(3, "C", Department::Helpdesk),
        ];
        let requests = vec![
            request(10, 1, date(2024, 6, 1), date(2024, 6, 7), RequestStatus::Pending),
            request(12, 3, date(2024, 6, 2), date(2024, 6, 3), RequestStatus::Approved),
            request(11, 2, date(2024, 6, 6), date(2024, 6, 8), RequestStatus::Pending),
        ];
        let conflicts = find_conflicts(
            &Subject::existing(&requests[0]).unwrap(),
            &requests,
            &users,
            &ConflictPolicy::default(),
        )
        .unwrap();
        let ids: Vec<u64> = conflicts.iter().map(|c| c.request_id).collect();
        assert_eq!(ids, vec![12, 11]);
    }

    #[test]
    fn coverage_reports_first_active_request_status() {
        let requests = vec![
            request(10, 1, date(2024, 6, 1), date(2024, 6, 7), RequestStatus::Rejected),
            request(11, 1, date(2024, 6, 1), date(2024, 6, 7), RequestStatus::Pending),
            request(12, 1, date(2024, 6, 5), date(2024, 6, 9), RequestStatus::Approved),
        ];
        // Rejected rows never paint a cell.
        assert_eq!(
            coverage_on(1, date(2024, 6, 2), &requests),
            Some(RequestStatus::Pending)
        );
        // Insertion order wins when two active requests cover the day.
        assert_eq!(
            coverage_on(1, date(2024, 6, 6), &requests),
            Some(RequestStatus::Pending)
        );
        assert_eq!(
            coverage_on(1, date(2024, 6, 9), &requests),
            Some(RequestStatus::Approved)
        );
        assert_eq!(coverage_on(1, date(2024, 6, 20), &requests), None);
        assert_eq!(coverage_on(2, date(2024, 6, 2), &requests), None);
    }
}
