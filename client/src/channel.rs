//! The realtime channel: one WebSocket per authenticated session.
//!
//! Inbound frames are decoded to [`ServerEvent`] and forwarded through a
//! bounded channel; a background reader owns the socket and is aborted when
//! the [`Channel`] drops, which is how views unsubscribe on teardown.
//! Outbound commands are fire-and-forget: no acknowledgment is awaited, and
//! callers reflect sent messages optimistically through the chat board.
//!
//! There is no automatic reconnect and no missed-event backfill after a
//! drop; callers that need a live feed again open a fresh channel and
//! re-fetch snapshots.

use crate::{Client, Error, Result};
use futures_util::{SinkExt, Stream as FutStream, StreamExt};
use gamba_types::{ClientCommand, Envelope, ServerEvent};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, warn};
use url::Url;

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

impl Client {
    /// Open the realtime channel for the current session, authenticating
    /// with the access token held at connect time.
    pub async fn connect_channel(&self) -> Result<Channel> {
        let token = self.session().access_token().ok_or(Error::Unauthenticated)?;
        let url = channel_url(&self.base_url, &token)?;
        Channel::connect(url).await
    }
}

/// `ws(s)://<host>/ws?token=<credential>`, derived from the API root.
fn channel_url(base: &Url, token: &str) -> Result<Url> {
    let mut url = base.clone();
    let scheme = if base.scheme() == "https" { "wss" } else { "ws" };
    url.set_scheme(scheme)
        .map_err(|_| Error::InvalidScheme(base.scheme().to_string()))?;
    url.set_path("/ws");
    url.query_pairs_mut().clear().append_pair("token", token);
    Ok(url)
}

/// A live channel connection.
pub struct Channel {
    outbound: mpsc::UnboundedSender<ClientCommand>,
    receiver: mpsc::Receiver<Result<ServerEvent>>,
    reader: tokio::task::JoinHandle<()>,
    writer: tokio::task::JoinHandle<()>,
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

impl Channel {
    pub(crate) async fn connect(url: Url) -> Result<Self> {
        let (ws, _) = connect_async(url.as_str()).await?;
        let (mut sink, mut stream) = ws.split();

        let (outbound, mut commands) = mpsc::unbounded_channel::<ClientCommand>();
        let writer = tokio::spawn(async move {
            while let Some(command) = commands.recv().await {
                let frame = match serde_json::to_string(&command) {
                    Ok(frame) => frame,
                    Err(err) => {
                        warn!(error = %err, "failed to encode channel command");
                        continue;
                    }
                };
                if let Err(err) = sink.send(Message::Text(frame)).await {
                    warn!(error = %err, "channel send failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let (tx, receiver) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        let envelope: Envelope = match serde_json::from_str(&text) {
                            Ok(envelope) => envelope,
                            Err(err) => {
                                warn!(error = %err, "malformed channel frame");
                                if tx.send(Err(err.into())).await.is_err() {
                                    break;
                                }
                                continue;
                            }
                        };
                        match ServerEvent::from_envelope(&envelope) {
                            Some(Ok(event)) => {
                                if tx.send(Ok(event)).await.is_err() {
                                    break; // Receiver dropped
                                }
                            }
                            Some(Err(err)) => {
                                warn!(
                                    kind = %envelope.kind,
                                    error = %err,
                                    "failed to decode channel payload"
                                );
                                if tx.send(Err(err.into())).await.is_err() {
                                    break;
                                }
                            }
                            None => {
                                debug!(kind = %envelope.kind, "ignoring unrecognized channel event");
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        debug!("channel closed by server");
                        let _ = tx.send(Err(Error::ConnectionClosed)).await;
                        break;
                    }
                    Ok(_) => {} // Ignore other frame types
                    Err(err) => {
                        error!(error = %err, "channel error");
                        let _ = tx.send(Err(err.into())).await;
                        break;
                    }
                }
            }
        });

        Ok(Self {
            outbound,
            receiver,
            reader,
            writer,
        })
    }

    /// Fire-and-forget send. A closed connection drops the command with a
    /// warning; delivery is reconciled later through snapshots.
    pub fn send(&self, command: ClientCommand) {
        if self.outbound.send(command).is_err() {
            warn!("channel writer gone, dropping command");
        }
    }

    /// Send a chat message under a caller-chosen (client-generated) id.
    pub fn send_message(&self, id: &str, chat_id: &str, content: &str) {
        self.send(ClientCommand::SendMessage {
            id: id.to_string(),
            chat_id: chat_id.to_string(),
            content: content.to_string(),
        });
    }

    /// Broadcast a typing notification for a conversation.
    pub fn typing(&self, chat_id: &str) {
        self.send(ClientCommand::Typing {
            chat_id: chat_id.to_string(),
        });
    }

    /// Receive the next event from the channel.
    pub async fn next(&mut self) -> Option<Result<ServerEvent>> {
        self.receiver.recv().await
    }
}

impl FutStream for Channel {
    type Item = Result<ServerEvent>;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
