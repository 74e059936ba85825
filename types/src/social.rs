//! Conversations, messages, and the friend graph.

use crate::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A direct conversation between two users. The server embeds both
/// participants so either side can resolve "the other one".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub user1_id: String,
    pub user2_id: String,
    pub user1: User,
    pub user2: User,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Chat {
    /// The participant that is not `my_id`.
    pub fn other_participant(&self, my_id: &str) -> &User {
        if self.user1_id == my_id {
            &self.user2
        } else {
            &self.user1
        }
    }

    /// Whether `user_id` is one of the two participants.
    pub fn involves(&self, user_id: &str) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sender: Option<User>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A friendship edge. `user` is the requester, `friend` the recipient;
/// which of the two to display depends on which one is "me".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Friend {
    pub id: String,
    pub user_id: String,
    pub friend_id: String,
    pub status: FriendStatus,
    pub user: User,
    pub friend: User,
}

impl Friend {
    /// The user on the far side of the edge from `my_id`.
    pub fn friend_of(&self, my_id: &str) -> &User {
        if self.user_id == my_id {
            &self.friend
        } else {
            &self.user
        }
    }
}

/// Friend requests share the edge shape; only the status lifecycle differs.
pub type FriendRequest = Friend;
