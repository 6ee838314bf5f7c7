use crate::{
    api::user::UserResponse,
    auth::{
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
    },
    config::Config,
    model::{role::Role, user::{User, UserRow}},
    models::{LoginReqDto, TokenType},
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

#[derive(Serialize, Deserialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    user: UserResponse,
}

#[instrument(
    name = "auth_login",
    skip(pool, config, payload),
    fields(email = %payload.email)
)]
pub async fn login(
    payload: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    if payload.email.trim().is_empty() {
        info!("Validation failed: empty email");
        return HttpResponse::BadRequest().json(json!({"error": "Email required"}));
    }

    debug!("Fetching user from database");

    let row = match sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, name, email, role, department, avatar, password, last_login_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(payload.email.trim())
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(row)) => row,
        Ok(None) => {
            info!("Login failed: user not found");
            return HttpResponse::NotFound().json(json!({"error": "User not found"}));
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let user = match User::try_from(row) {
        Ok(user) => user,
        Err(e) => {
            error!(error = %e, "Corrupt user row");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if user.role != payload.role {
        info!("Login failed: role mismatch");
        return HttpResponse::Forbidden().json(json!({"error": "Role mismatch"}));
    }

    // Managers must prove the password against the stored argon2 hash.
    // Employees sign in by email + role alone.
    if user.role == Role::Manager {
        debug!("Verifying manager password");
        let presented = payload.password.as_deref().unwrap_or_default();
        let verified = user
            .password
            .as_deref()
            .is_some_and(|hash| verify_password(presented, hash).is_ok());
        if !verified {
            info!("Login failed: password mismatch");
            return HttpResponse::Unauthorized().json(json!({"error": "Invalid credentials"}));
        }
    }

    let department = user.department.to_string();

    debug!("Generating access token");
    let access_token = generate_access_token(
        user.id,
        user.email.clone(),
        user.role.id(),
        department.clone(),
        &config.jwt_secret,
        config.access_token_ttl,
    );

    debug!("Generating refresh token");
    let (refresh_token, refresh_claims) = generate_refresh_token(
        user.id,
        user.email.clone(),
        user.role.id(),
        department,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    debug!(user_id = user.id, jti = %refresh_claims.jti, "Storing refresh token");

    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(user.id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool.get_ref())
    .await
    {
        error!(error = %e, "Failed to store refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
        // intentionally not failing login
    }

    info!("Login successful");

    HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
        user: UserResponse::from(user),
    })
}

pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::Unauthorized().body("No token"),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::Unauthorized().body("Invalid token"),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::Unauthorized().finish(),
    };

    if claims.token_type != TokenType::Refresh {
        return HttpResponse::Unauthorized().finish();
    }

    let record: Option<(u64, u64, i8)> = match sqlx::query_as(
        r#"
        SELECT id, user_id, revoked
        FROM refresh_tokens
        WHERE jti = ?
        "#,
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Failed to look up refresh token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let (record_id, record_user_id) = match record {
        Some((id, user_id, revoked)) if revoked == 0 => (id, user_id),
        _ => return HttpResponse::Unauthorized().finish(),
    };

    // Rotate: revoke the old refresh token before issuing a new pair.
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    let (new_refresh_token, new_claims) = generate_refresh_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role,
        claims.department.clone(),
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(record_user_id)
    .bind(&new_claims.jti)
    .bind(new_claims.exp as i64)
    .execute(pool.get_ref())
    .await
    {
        error!(error = %e, "Failed to store rotated refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    let access_token = generate_access_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role,
        claims.department.clone(),
        &config.jwt_secret,
        config.access_token_ttl,
    );

    HttpResponse::Ok().json(json!({
        "access_token": access_token,
        "refresh_token": new_refresh_token
    }))
}

pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::NoContent().finish(),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::NoContent().finish(),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    // Only refresh tokens can log out.
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    // Revoke is idempotent; success even if the token never existed.
    let _ = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await;

    HttpResponse::NoContent().finish()
}
