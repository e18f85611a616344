use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::HasId;
use crate::error::{AppError, AppResult};
use crate::utils::validation::is_valid_email;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Unread,
    Read,
    Responded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub topic: Option<String>,
    pub message: String,
    #[serde(default)]
    pub status: MessageStatus,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl HasId for ContactMessage {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Public contact form.
#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub name: String,
    pub email: String,
    pub topic: String,
    pub message: String,
}

impl NewMessage {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() || self.message.trim().is_empty() {
            return Err(AppError::validation("Please fill all required fields"));
        }
        if !is_valid_email(&self.email) {
            return Err(AppError::validation("Please enter a valid email address"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct MessageStatusUpdate {
    pub status: MessageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}
