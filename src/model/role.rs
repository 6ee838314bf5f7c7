use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    Manager = 1,
    Employee = 2,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Manager),
            2 => Some(Role::Employee),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::Employee => "employee",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ids_round_trip() {
        assert_eq!(Role::from_id(Role::Manager.id()), Some(Role::Manager));
        assert_eq!(Role::from_id(Role::Employee.id()), Some(Role::Employee));
        assert_eq!(Role::from_id(7), None);
    }

    #[test]
    fn parses_stored_form() {
        assert_eq!("manager".parse::<Role>().ok(), Some(Role::Manager));
        assert_eq!("Employee".parse::<Role>().ok(), Some(Role::Employee));
        assert!("hr".parse::<Role>().is_err());
    }
}
