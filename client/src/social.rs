//! Conversations and the friend graph over REST.

use crate::{Client, Error, Result};
use gamba_types::{Chat, Friend, FriendRequest, Message};
use reqwest::StatusCode;
use serde_json::json;
use tracing::debug;

impl Client {
    // ---- chats ----

    /// `GET /chats`: conversation snapshots.
    pub async fn list_chats(&self) -> Result<Vec<Chat>> {
        self.get("chats").await
    }

    /// `POST /chats`: start a conversation with `user_id`.
    pub async fn create_chat(&self, user_id: &str) -> Result<Chat> {
        self.post("chats", json!({ "user_id": user_id })).await
    }

    /// Start a conversation, falling back to the existing one when the
    /// server reports it already exists.
    pub async fn open_chat(&self, user_id: &str) -> Result<Chat> {
        match self.create_chat(user_id).await {
            Ok(chat) => Ok(chat),
            Err(Error::Api { status, .. }) if status == StatusCode::CONFLICT => {
                debug!(user_id, "conversation already exists, re-fetching list");
                let chats = self.list_chats().await?;
                chats
                    .into_iter()
                    .find(|chat| chat.involves(user_id))
                    .ok_or(Error::Api {
                        status,
                        message: "conversation already exists but was not found".to_string(),
                    })
            }
            Err(err) => Err(err),
        }
    }

    /// `GET /chats/:id/messages`: full message snapshot for a conversation.
    pub async fn chat_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        self.get(&format!("chats/{chat_id}/messages")).await
    }

    /// `POST /chats/:id/read`: mark the conversation read for this user.
    pub async fn mark_chat_read(&self, chat_id: &str) -> Result<()> {
        self.post_empty(&format!("chats/{chat_id}/read"), None).await
    }

    // ---- friends ----

    /// `GET /friends`: accepted friendships.
    pub async fn list_friends(&self) -> Result<Vec<Friend>> {
        self.get("friends").await
    }

    /// `GET /friends/requests`: requests awaiting this user's decision.
    pub async fn incoming_requests(&self) -> Result<Vec<FriendRequest>> {
        self.get("friends/requests").await
    }

    /// `GET /friends/sent`: requests this user has sent.
    pub async fn sent_requests(&self) -> Result<Vec<FriendRequest>> {
        self.get("friends/sent").await
    }

    /// `POST /friends/request`.
    pub async fn send_friend_request(&self, user_id: &str) -> Result<()> {
        self.post_empty("friends/request", Some(json!({ "user_id": user_id })))
            .await
    }

    /// `POST /friends/:id/accept`.
    pub async fn accept_friend_request(&self, request_id: &str) -> Result<()> {
        self.post_empty(&format!("friends/{request_id}/accept"), None)
            .await
    }

    /// `POST /friends/:id/reject`.
    pub async fn reject_friend_request(&self, request_id: &str) -> Result<()> {
        self.post_empty(&format!("friends/{request_id}/reject"), None)
            .await
    }

    /// `DELETE /friends/:id`.
    pub async fn remove_friend(&self, friend_user_id: &str) -> Result<()> {
        self.delete(&format!("friends/{friend_user_id}")).await
    }
}
