use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value::{DeliveryStatus, MessageId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendSmsResponse {
    pub message: Option<String>,
    pub messages: Vec<AcceptedMessage>,
    pub credits_used: Option<u64>,
    pub balance: Option<String>,
}

/// Per-recipient entry of a send response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedMessage {
    pub id: Option<MessageId>,
    pub recipient: Option<String>,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageStatus {
    pub id: MessageId,
    pub recipient: Option<String>,
    pub status: DeliveryStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// A past message and its delivery state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: MessageId,
    pub recipient: String,
    pub message: String,
    pub sender_id: Option<String>,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub credits: Option<u64>,
}

/// One page of history, already narrowed to the query's filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPage {
    pub records: Vec<HistoryRecord>,
    pub page: u32,
    pub per_page: u32,
    pub total: Option<u64>,
    /// Whether the provider has records beyond this page.
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub balance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderIdInfo {
    pub id: Option<String>,
    pub name: String,
    pub status: Option<String>,
}

impl SenderIdInfo {
    /// Approved sender ids can be used in `sender_id`.
    pub fn is_approved(&self) -> bool {
        self.status.as_deref().is_some_and(|status| {
            matches!(
                status.trim().to_ascii_lowercase().as_str(),
                "approved" | "active"
            )
        })
    }
}
