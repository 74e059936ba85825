//! Support ticket threads.

use crate::{Client, Result};
use gamba_types::Ticket;
use serde_json::json;

impl Client {
    /// `GET /ticket`: this user's tickets.
    pub async fn list_tickets(&self) -> Result<Vec<Ticket>> {
        self.get("ticket").await
    }

    /// `GET /ticket/:id`: a ticket with its message thread.
    pub async fn ticket(&self, id: &str) -> Result<Ticket> {
        self.get(&format!("ticket/{id}")).await
    }

    /// `POST /ticket`: open a ticket.
    pub async fn create_ticket(&self, subject: &str, description: &str) -> Result<()> {
        self.post_empty(
            "ticket",
            Some(json!({ "subject": subject, "description": description })),
        )
        .await
    }

    /// `POST /ticket/:id/messages`: reply on a ticket thread.
    pub async fn reply_ticket(&self, id: &str, content: &str) -> Result<()> {
        self.post_empty(
            &format!("ticket/{id}/messages"),
            Some(json!({ "content": content })),
        )
        .await
    }
}
