use crate::{
    api::data::fetch_all_users,
    auth::{auth::AuthUser, password::hash_password},
    model::{department::Department, role::Role, user::User},
    utils::{
        db_utils::{build_update_sql, execute_update},
        email_cache, email_filter,
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

/// Columns a manager may touch through the generic update endpoint.
/// Role and password changes go through dedicated flows only.
const USER_UPDATABLE_COLUMNS: &[&str] = &["name", "email", "department", "avatar"];

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = 2)]
    pub id: u64,
    #[schema(example = "Luca Bianchi")]
    pub name: String,
    #[schema(example = "luca@azienda.it", format = "email")]
    pub email: String,
    #[schema(example = "employee")]
    pub role: Role,
    #[schema(example = "HELPDESK", value_type = String)]
    pub department: Department,
    pub avatar: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            department: user.department,
            avatar: user.avatar,
            last_login_at: user.last_login_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "Anna Neri")]
    pub name: String,
    #[schema(example = "anna@azienda.it", format = "email")]
    pub email: String,
    #[schema(example = "employee")]
    pub role: Role,
    #[schema(example = "PREVENDITA", value_type = String)]
    pub department: Department,
    pub avatar: Option<String>,
    /// Required for managers, ignored for employees.
    pub password: Option<String>,
}

/// true  => email AVAILABLE
/// false => email TAKEN
async fn is_email_available(email: &str, pool: &MySqlPool) -> bool {
    let email = email.trim().to_lowercase();

    // 1️⃣ Cuckoo filter — fast negative
    if !email_filter::might_exist(&email) {
        return true;
    }

    // 2️⃣ Moka cache — fast positive
    if email_cache::is_taken(&email).await {
        return false;
    }

    // 3️⃣ Database fallback
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)")
            .bind(&email)
            .fetch_one(pool)
            .await
            .unwrap_or(true); // fail-safe

    !exists
}

/// List the roster
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "All users", body = [UserResponse]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn list_users(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let users = fetch_all_users(pool.get_ref()).await?;
    let response: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// Create a user (manager only)
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = Object, example = json!({
            "message": "User created"
        })),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email already registered", body = Object, example = json!({
            "error": "Email already registered"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUser>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let name = payload.name.trim();
    let email = payload.email.trim().to_lowercase();

    if name.is_empty() || email.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Name and email must not be empty"
        })));
    }

    if payload.role == Role::Manager && payload.password.as_deref().unwrap_or_default().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Managers need a password"
        })));
    }

    if !is_email_available(&email, pool.get_ref()).await {
        return Ok(HttpResponse::Conflict().json(json!({
            "error": "Email already registered"
        })));
    }

    // Only managers carry a credential; anything sent for an employee is
    // dropped.
    let password_hash = match payload.role {
        Role::Manager => payload.password.as_deref().map(hash_password),
        Role::Employee => None,
    };

    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, role, department, avatar, password)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(&email)
    .bind(payload.role.as_str())
    .bind(payload.department.to_string())
    .bind(&payload.avatar)
    .bind(&password_hash)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => {
            // Keep the availability pipeline warm on the write path.
            email_filter::insert(&email);
            email_cache::mark_taken(&email).await;
            Ok(HttpResponse::Created().json(json!({
                "message": "User created"
            })))
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "error": "Email already registered"
                    })));
                }
            }

            error!(error = %e, "Failed to create user");
            Ok(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to create user"
            })))
        }
    }
}

/// Update a user (manager only)
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User updated"),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let user_id = path.into_inner();

    let update = build_update_sql("users", USER_UPDATABLE_COLUMNS, &body, "id", user_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().body("User not found"));
    }

    Ok(HttpResponse::Ok().body("User updated successfully"))
}
