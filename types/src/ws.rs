//! Realtime channel envelopes.
//!
//! Every frame on the channel is a JSON `{"type": ..., "payload": ...}`
//! envelope. [`ServerEvent`] and [`ClientCommand`] are the typed views of the
//! envelopes this client understands; [`Envelope`] is the raw shape, kept so
//! unrecognized event types can be skipped instead of killing the stream.

use crate::social::Message;
use serde::{Deserialize, Serialize};

/// Raw `{type, payload}` wire unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Events pushed by the server over the channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A message was appended to a conversation. May echo a message this
    /// client inserted optimistically, under the same id.
    NewMessage(Message),
    /// The other participant read the conversation.
    MessageRead { chat_id: String },
    /// The other participant is typing.
    Typing { chat_id: String },
}

impl ServerEvent {
    /// Decode a raw envelope into a typed event. Returns `None` for event
    /// types this client does not understand.
    pub fn from_envelope(envelope: &Envelope) -> Option<Result<Self, serde_json::Error>> {
        let payload = envelope.payload.clone();
        match envelope.kind.as_str() {
            "new_message" => Some(serde_json::from_value(payload).map(ServerEvent::NewMessage)),
            "message_read" | "typing" => Some(
                serde_json::from_value::<ChatRef>(payload).map(|r| match envelope.kind.as_str() {
                    "message_read" => ServerEvent::MessageRead { chat_id: r.chat_id },
                    _ => ServerEvent::Typing { chat_id: r.chat_id },
                }),
            ),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct ChatRef {
    chat_id: String,
}

/// Fire-and-forget actions sent to the server over the channel.
///
/// `send_message` carries the client-generated message id so the server echo
/// can be matched against the optimistic local copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientCommand {
    SendMessage {
        id: String,
        chat_id: String,
        content: String,
    },
    Typing {
        chat_id: String,
    },
}
