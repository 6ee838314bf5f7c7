use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

/// Organizational grouping of users. Conflict detection is scoped per
/// department. The fixed set below is what the company runs with; anything
/// else found in storage is carried verbatim as `Other` so an unexpected
/// value never breaks a roster fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, EnumString)]
pub enum Department {
    #[strum(serialize = "PREVENDITA")]
    Prevendita,
    #[strum(serialize = "HELPDESK")]
    Helpdesk,
    #[strum(serialize = "COMMERCIALI")]
    Commerciali,
    #[strum(serialize = "MANAGEMENT")]
    Management,
    #[strum(default)]
    Other(String),
}

impl Department {
    /// Departments are stored and compared uppercase.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_uppercase();
        normalized
            .parse()
            .unwrap_or_else(|_| Department::Other(normalized))
    }
}

impl Serialize for Department {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Department {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Department::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_departments_case_insensitively() {
        assert_eq!(Department::parse("HELPDESK"), Department::Helpdesk);
        assert_eq!(Department::parse("helpdesk"), Department::Helpdesk);
        assert_eq!(Department::parse(" Commerciali "), Department::Commerciali);
    }

    #[test]
    fn unknown_department_falls_back_to_other() {
        assert_eq!(
            Department::parse("Logistica"),
            Department::Other("LOGISTICA".to_string())
        );
    }

    #[test]
    fn displays_as_stored_form() {
        assert_eq!(Department::Prevendita.to_string(), "PREVENDITA");
        assert_eq!(
            Department::Other("LOGISTICA".to_string()).to_string(),
            "LOGISTICA"
        );
    }
}
