use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::model::{ModelError, department::Department, role::Role};

/// Row shape as stored; enum columns arrive as strings and are converted
/// once, via `TryFrom`, so handlers only ever see domain types.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub department: String,
    pub avatar: Option<String>,
    pub password: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department: Department,
    pub avatar: Option<String>,
    /// argon2 hash; present only for managers. Never serialized to clients,
    /// API responses use `UserResponse` instead.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = ModelError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|_| ModelError::UnknownRole(row.role.clone()))?;

        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            role,
            department: Department::parse(&row.department),
            avatar: row.avatar,
            password: row.password,
            last_login_at: row.last_login_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> UserRow {
        UserRow {
            id: 2,
            name: "Luca Bianchi".to_string(),
            email: "luca@azienda.it".to_string(),
            role: "employee".to_string(),
            department: "HELPDESK".to_string(),
            avatar: None,
            password: None,
            last_login_at: None,
        }
    }

    #[test]
    fn converts_row_to_domain_user() {
        let user = User::try_from(row()).unwrap();
        assert_eq!(user.role, Role::Employee);
        assert_eq!(user.department, Department::Helpdesk);
    }

    #[test]
    fn rejects_unknown_role() {
        let mut bad = row();
        bad.role = "intern".to_string();
        assert!(matches!(
            User::try_from(bad),
            Err(ModelError::UnknownRole(_))
        ));
    }
}
