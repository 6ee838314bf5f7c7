use crate::api::analyze::AnalyzeResponse;
use crate::api::calendar::{CalendarQuery, CalendarResponse, CalendarRow};
use crate::api::leave_request::{
    CreateLeave, CreateLeaveResponse, LeaveFilter, LeaveListResponse, LeaveResponse,
};
use crate::api::notify::NotifyReq;
use crate::api::user::{CreateUser, UserResponse};
use crate::conflict::Conflict;
use crate::model::leave_request::{LeaveKind, RequestStatus};
use crate::model::role::Role;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ferie Manager API",
        version = "1.0.0",
        description = r#"
## Leave-Request Management

This API powers a leave-request management system: employees submit
vacation and permit requests, managers approve or reject them, and a team
calendar shows who is away.

### 🔹 Key Features
- **Requests**
  - Submit, list and review leave requests with department conflict banners
- **Conflict Detection**
  - Department-scoped overlap detection with a pre-submission advisory
- **Calendar**
  - Per-user per-day absence grid for any month
- **Reports**
  - CSV export of the full request history

### 🔐 Security
Endpoints are protected with **JWT Bearer authentication**. Managers can
approve/reject requests and administer users.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::get_leave_conflicts,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,

        crate::api::user::list_users,
        crate::api::user::create_user,
        crate::api::user::update_user,

        crate::api::calendar::month_view,
        crate::api::report::export_leave_csv,
        crate::api::analyze::analyze_schedule,
        crate::api::notify::send_notification
    ),
    components(
        schemas(
            UserResponse,
            CreateUser,
            Role,
            CreateLeave,
            CreateLeaveResponse,
            LeaveResponse,
            LeaveListResponse,
            LeaveFilter,
            RequestStatus,
            LeaveKind,
            Conflict,
            CalendarQuery,
            CalendarRow,
            CalendarResponse,
            AnalyzeResponse,
            NotifyReq
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Requests", description = "Leave request APIs"),
        (name = "Users", description = "Roster management APIs"),
        (name = "Calendar", description = "Team absence calendar"),
        (name = "Reports", description = "CSV exports"),
        (name = "Analyze", description = "Generative schedule summary"),
        (name = "Notify", description = "Ad-hoc notifications"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
