use anyhow::Result;
use chrono::{Duration, Utc};
use sqlx::MySqlPool;
use tokio::sync::OnceCell;
use tracing::info;

use crate::auth::password::hash_password;

static SCHEMA_READY: OnceCell<()> = OnceCell::const_new();

pub async fn init_db(database_url: &str) -> MySqlPool {
    let pool = MySqlPool::connect(database_url)
        .await
        .expect("Failed to connect to database");

    ensure_schema(&pool)
        .await
        .expect("Failed to initialize database schema");

    pool
}

/// Idempotent one-time schema setup. Concurrent callers share a single
/// in-flight initialization instead of racing a checked-then-set flag.
pub async fn ensure_schema(pool: &MySqlPool) -> Result<()> {
    SCHEMA_READY
        .get_or_try_init(|| async {
            create_tables(pool).await?;
            seed_if_empty(pool).await
        })
        .await?;
    Ok(())
}

async fn create_tables(pool: &MySqlPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            email VARCHAR(100) NOT NULL UNIQUE,
            role VARCHAR(20) NOT NULL,
            department VARCHAR(50) NOT NULL,
            avatar TEXT NULL,
            password VARCHAR(255) NULL,
            last_login_at TIMESTAMP NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leave_requests (
            id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
            user_id BIGINT UNSIGNED NOT NULL,
            start_date DATE NOT NULL,
            end_date DATE NOT NULL,
            kind VARCHAR(20) NOT NULL DEFAULT 'vacation',
            start_time TIME NULL,
            end_time TIME NULL,
            status VARCHAR(20) NOT NULL DEFAULT 'pending',
            reason TEXT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CONSTRAINT fk_leave_user FOREIGN KEY (user_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS refresh_tokens (
            id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
            user_id BIGINT UNSIGNED NOT NULL,
            jti VARCHAR(64) NOT NULL,
            expires_at DATETIME NOT NULL,
            revoked TINYINT(1) NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Demo roster and a few requests, inserted only on a fresh database.
async fn seed_if_empty(pool: &MySqlPool) -> Result<()> {
    let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    if user_count > 0 {
        return Ok(());
    }

    info!("Empty database, seeding demo data");

    let admin_hash = hash_password("admin");
    let seed_users: &[(&str, &str, &str, &str, Option<&str>)] = &[
        ("Mario Rossi", "mario@azienda.it", "manager", "MANAGEMENT", Some(admin_hash.as_str())),
        ("Luca Bianchi", "luca@azienda.it", "employee", "HELPDESK", None),
        ("Giulia Verdi", "giulia@azienda.it", "employee", "PREVENDITA", None),
        ("Sofia Esposito", "sofia@azienda.it", "employee", "COMMERCIALI", None),
        ("Alessandro Romano", "ale@azienda.it", "employee", "HELPDESK", None),
        ("Francesca Colombo", "fra@azienda.it", "employee", "COMMERCIALI", None),
        ("Matteo Ricci", "matteo@azienda.it", "employee", "PREVENDITA", None),
        ("Chiara Marino", "chiara@azienda.it", "employee", "HELPDESK", None),
        ("Lorenzo Greco", "lorenzo@azienda.it", "employee", "COMMERCIALI", None),
        ("Alice Bruno", "alice@azienda.it", "employee", "PREVENDITA", None),
    ];

    let mut ids = Vec::with_capacity(seed_users.len());
    for (idx, (name, email, role, department, password)) in seed_users.iter().enumerate() {
        let avatar = format!("https://picsum.photos/seed/u{}/200", idx + 1);
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, role, department, avatar, password)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(role)
        .bind(department)
        .bind(avatar)
        .bind(password)
        .execute(pool)
        .await?;
        ids.push(result.last_insert_id());
    }

    let today = Utc::now().date_naive();
    let next_week = today + Duration::days(7);
    let two_weeks = today + Duration::days(14);

    // Luca and Alessandro overlap inside HELPDESK on purpose, so the
    // conflict banner shows something out of the box.
    let seed_requests = [
        (ids[1], today, next_week, "approved", "Vacanza estiva"),
        (ids[4], today, today + Duration::days(2), "pending", "Visita medica"),
        (ids[3], next_week, two_weeks, "pending", "Matrimonio sorella"),
    ];

    for (user_id, start, end, status, reason) in seed_requests {
        sqlx::query(
            r#"
            INSERT INTO leave_requests (user_id, start_date, end_date, kind, status, reason)
            VALUES (?, ?, ?, 'vacation', ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .bind(status)
        .bind(reason)
        .execute(pool)
        .await?;
    }

    Ok(())
}
