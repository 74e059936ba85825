//! Support ticket threads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub subject: String,
    pub description: String,
    pub status: String,
    #[serde(default)]
    pub priority: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<TicketMessage>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketMessage {
    pub id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
