//! Core domain model for the service request marketplace.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod phone;
pub mod regions;

pub use phone::format_phone;

pub const CRATE_NAME: &str = "servmatch-core";

/// Display value used wherever a professional attribute is unknown.
pub const NOT_SPECIFIED: &str = "לא צוין";

/// Lifecycle status of a service request, assigned by the backend.
///
/// Values outside the recognised set round-trip through `Other` so a new
/// backend status never breaks decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestStatus {
    Active,
    WaitingForRating,
    Completed,
    Expired,
    Canceled,
    Other(String),
}

impl RequestStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::WaitingForRating => "waiting_for_rating",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Canceled => "canceled",
            Self::Other(raw) => raw,
        }
    }

    /// Display priority; higher sorts first.
    pub fn sort_priority(&self) -> u8 {
        match self {
            Self::WaitingForRating => 2,
            Self::Active => 1,
            Self::Completed | Self::Expired | Self::Canceled | Self::Other(_) => 0,
        }
    }
}

impl From<String> for RequestStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "active" => Self::Active,
            "waiting_for_rating" => Self::WaitingForRating,
            "completed" => Self::Completed,
            "expired" => Self::Expired,
            "canceled" => Self::Canceled,
            _ => Self::Other(value),
        }
    }
}

impl From<RequestStatus> for String {
    fn from(value: RequestStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuoteStatus {
    Pending,
    Accepted,
    Rejected,
    Other(String),
}

impl QuoteStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

impl From<String> for QuoteStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => Self::Pending,
            "accepted" => Self::Accepted,
            "rejected" => Self::Rejected,
            _ => Self::Other(value),
        }
    }
}

impl From<QuoteStatus> for String {
    fn from(value: QuoteStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's submitted service need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub location: String,
    pub status: RequestStatus,
    #[serde(default)]
    pub quotes_count: u32,
    #[serde(default)]
    pub timing: Option<String>,
}

/// Canonical professional profile shown to end users.
///
/// Every field is populated; unknown values carry [`NOT_SPECIFIED`] or a
/// fixed default rather than being left empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalView {
    pub id: Uuid,
    pub name: String,
    pub profession: String,
    pub rating: f64,
    pub review_count: u32,
    pub location: String,
    pub image: String,
    pub verified: bool,
    pub specialties: Vec<String>,
    pub region: String,
    pub company_name: String,
    pub work_hours: String,
    pub certifications: Vec<String>,
    pub experience_years: u32,
    pub phone: String,
}

/// A professional's priced response to a specific request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: Uuid,
    pub request_id: Uuid,
    pub professional: ProfessionalView,
    pub price: f64,
    pub estimated_time: String,
    pub description: String,
    pub status: QuoteStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_status_priorities_rank_waiting_above_active() {
        assert!(
            RequestStatus::WaitingForRating.sort_priority() > RequestStatus::Active.sort_priority()
        );
        assert!(RequestStatus::Active.sort_priority() > RequestStatus::Completed.sort_priority());
        assert_eq!(
            RequestStatus::Completed.sort_priority(),
            RequestStatus::Expired.sort_priority()
        );
        assert_eq!(RequestStatus::Expired.sort_priority(), RequestStatus::Canceled.sort_priority());
        assert_eq!(
            RequestStatus::Other("archived".into()).sort_priority(),
            RequestStatus::Canceled.sort_priority()
        );
    }

    #[test]
    fn unknown_statuses_survive_decoding() {
        let status: RequestStatus = serde_json::from_str("\"on_hold\"").unwrap();
        assert_eq!(status, RequestStatus::Other("on_hold".into()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"on_hold\"");

        let quote_status: QuoteStatus = serde_json::from_str("\"accepted\"").unwrap();
        assert!(quote_status.is_accepted());
    }

    #[test]
    fn service_request_defaults_missing_count_and_timing() {
        let json = r#"{
            "id": "6f1c1a4e-8a43-4c1e-9a55-0c4f2f1d2b10",
            "title": "Fix leaking sink",
            "description": "Kitchen sink drips",
            "date": "2024-03-01",
            "location": "חיפה",
            "status": "active"
        }"#;
        let request: ServiceRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.quotes_count, 0);
        assert_eq!(request.timing, None);
        assert_eq!(request.status, RequestStatus::Active);
    }
}
