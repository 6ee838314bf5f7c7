use serde::{Deserialize, Serialize};

use crate::model::role::Role;

#[derive(Deserialize)]
pub struct LoginReqDto {
    pub email: String,
    /// Required for managers; employees authenticate by email + role alone.
    pub password: Option<String>,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String, // email
    pub role: u8,    // role id
    pub department: String,
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
