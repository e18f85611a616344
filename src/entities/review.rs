use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::User;
use super::{HasId, Ref, Upload};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub user: Option<Ref<User>>,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl HasId for Review {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Rating and comment for a car or a driver.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewRequest {
    pub rating: u8,
    pub comment: String,
}

impl ReviewRequest {
    pub fn new(rating: u8, comment: impl Into<String>) -> AppResult<Self> {
        let comment = comment.into();
        if rating == 0 || comment.trim().is_empty() {
            return Err(AppError::validation("Please provide both rating and comment"));
        }
        if rating > 5 {
            return Err(AppError::validation("Rating must be between 1 and 5"));
        }
        Ok(Self { rating, comment })
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanReviewResponse {
    #[serde(default)]
    pub can_review: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReviewSubmitted {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub review: Option<Review>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewSearchField {
    User,
    Car,
    Comment,
}

impl ReviewSearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewSearchField::User => "user",
            ReviewSearchField::Car => "car",
            ReviewSearchField::Comment => "comment",
        }
    }
}

// ============ Client testimonials ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientReview {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub review: String,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

impl HasId for ClientReview {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone)]
pub struct ClientReviewForm {
    pub name: String,
    pub review: String,
    pub rating: u8,
    pub logo: Option<Upload>,
}

impl ClientReviewForm {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() || self.review.trim().is_empty() {
            return Err(AppError::validation("Please fill all required fields"));
        }
        if !(1..=5).contains(&self.rating) {
            return Err(AppError::validation("Rating must be between 1 and 5"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_request_requires_rating_and_comment() {
        assert_eq!(
            ReviewRequest::new(0, "Great car").unwrap_err().to_string(),
            "Please provide both rating and comment"
        );
        assert!(ReviewRequest::new(4, "   ").is_err());
        assert!(ReviewRequest::new(6, "Too good").is_err());
        assert!(ReviewRequest::new(5, "Smooth ride").is_ok());
    }
}
