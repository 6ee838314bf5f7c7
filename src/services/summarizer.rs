use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::model::leave_request::{LeaveRequest, RequestStatus};
use crate::model::user::User;

const CHAT_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions";
const MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("summarizer is not configured")]
    NotConfigured,
    #[error("summarizer upstream error: {0}")]
    Upstream(String),
}

/// One line of the digest handed to the model: an active absence joined
/// with its owner.
#[derive(Debug, PartialEq, Serialize)]
pub struct ScheduleEntry {
    pub employee: String,
    pub department: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub status: RequestStatus,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Asks a generative endpoint for a coverage summary of the current
/// schedule. The schedule digest and prompt are built locally; only the
/// final text generation is remote.
#[derive(Clone)]
pub struct ScheduleSummarizer {
    client: Client,
    api_key: Option<String>,
}

impl ScheduleSummarizer {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key: config.gemini_api_key.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Active requests joined with their owners; rejected rows and rows
    /// whose owner is missing from the roster are dropped.
    pub fn schedule_digest(requests: &[LeaveRequest], users: &[User]) -> Vec<ScheduleEntry> {
        requests
            .iter()
            .filter(|r| r.status.is_active())
            .filter_map(|r| {
                let user = users.iter().find(|u| u.id == r.user_id)?;
                Some(ScheduleEntry {
                    employee: user.name.clone(),
                    department: user.department.to_string(),
                    start: r.start_date,
                    end: r.end_date,
                    status: r.status,
                })
            })
            .collect()
    }

    fn build_prompt(entries: &[ScheduleEntry]) -> String {
        let data = serde_json::to_string_pretty(entries).unwrap_or_else(|_| "[]".to_string());
        format!(
            "You are an HR scheduling assistant. Analyze the following employee \
             leave data. Point out potential conflicts (too many people from the \
             same department away at the same time) and critical periods. Be \
             concise, professional and helpful.\n\nData:\n{}",
            data
        )
    }

    pub async fn analyze(
        &self,
        requests: &[LeaveRequest],
        users: &[User],
    ) -> Result<String, SummaryError> {
        let api_key = self.api_key.as_ref().ok_or(SummaryError::NotConfigured)?;

        let entries = Self::schedule_digest(requests, users);
        debug!(entries = entries.len(), "Requesting schedule summary");

        let request = ChatRequest {
            model: MODEL.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Self::build_prompt(&entries),
            }],
        };

        let response = self
            .client
            .post(CHAT_URL)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| SummaryError::Upstream(format!("network error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(SummaryError::Upstream(format!("({}) {}", status, text)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| SummaryError::Upstream(format!("bad response: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| SummaryError::Upstream("no completion returned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::department::Department;
    use crate::model::leave_request::LeaveKind;
    use crate::model::role::Role;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn user(id: u64, name: &str) -> User {
        User {
            id,
            name: name.to_string(),
            email: format!("{}@azienda.it", name.to_lowercase()),
            role: Role::Employee,
            department: Department::Helpdesk,
            avatar: None,
            password: None,
            last_login_at: None,
        }
    }

    fn request(id: u64, user_id: u64, status: RequestStatus) -> LeaveRequest {
        LeaveRequest {
            id,
            user_id,
            start_date: date(1),
            end_date: date(5),
            kind: LeaveKind::Vacation,
            start_time: None,
            end_time: None,
            status,
            reason: String::new(),
            created_at: None,
        }
    }

    #[test]
    fn digest_keeps_only_active_requests_with_known_owners() {
        let users = vec![user(1, "Luca")];
        let requests = vec![
            request(10, 1, RequestStatus::Approved),
            request(11, 1, RequestStatus::Rejected),
            request(12, 99, RequestStatus::Pending), // owner not in roster
        ];

        let digest = ScheduleSummarizer::schedule_digest(&requests, &users);
        assert_eq!(digest.len(), 1);
        assert_eq!(digest[0].employee, "Luca");
        assert_eq!(digest[0].department, "HELPDESK");
    }

    #[test]
    fn prompt_embeds_the_digest() {
        let users = vec![user(1, "Luca")];
        let requests = vec![request(10, 1, RequestStatus::Approved)];
        let digest = ScheduleSummarizer::schedule_digest(&requests, &users);
        let prompt = ScheduleSummarizer::build_prompt(&digest);
        assert!(prompt.contains("Luca"));
        assert!(prompt.contains("HELPDESK"));
    }
}
