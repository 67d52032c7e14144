//! One accepted websocket connection.

use std::collections::HashSet;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::bus::{ConnectionId, Delivery};
use super::dispatcher::Relay;
use super::envelope::Inbound;
use super::protocol::{ClientFrame, ServerFrame};
use super::topic::Channel;
use crate::services::{Admission, ConnectionIdentity};

/// Control reply produced by [`RelaySession::handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Confirmed(Channel),
    Rejected(Channel),
}

impl Reply {
    fn frame(self) -> ServerFrame<'static> {
        match self {
            Reply::Confirmed(channel) => ServerFrame::ConfirmSubscription { channel },
            Reply::Rejected(channel) => ServerFrame::RejectSubscription { channel },
        }
    }
}

/// Per-connection relay state, independent of the socket.
pub struct RelaySession {
    relay: Relay,
    identity: ConnectionIdentity,
    connection: ConnectionId,
    deliveries: mpsc::Sender<Delivery>,
    subscribed: HashSet<Channel>,
}

impl RelaySession {
    pub fn new(relay: Relay, identity: ConnectionIdentity, deliveries: mpsc::Sender<Delivery>) -> Self {
        Self {
            relay,
            identity,
            connection: Uuid::new_v4(),
            deliveries,
            subscribed: HashSet::new(),
        }
    }

    pub fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    pub fn is_subscribed(&self, channel: Channel) -> bool {
        self.subscribed.contains(&channel)
    }

    pub async fn handle(&mut self, frame: ClientFrame) -> Option<Reply> {
        match frame {
            ClientFrame::Subscribe { channel } => {
                let result = self
                    .relay
                    .subscribe(&self.identity, channel, self.connection, self.deliveries.clone())
                    .await;
                match result {
                    Ok(_) => {
                        self.subscribed.insert(channel);
                        Some(Reply::Confirmed(channel))
                    }
                    Err(_) => Some(Reply::Rejected(channel)),
                }
            }
            ClientFrame::Unsubscribe { channel } => {
                self.relay.unsubscribe(&self.identity, channel, self.connection);
                self.subscribed.remove(&channel);
                None
            }
            ClientFrame::Message { channel, data } => {
                if !self.subscribed.contains(&channel) {
                    debug!(connection = %self.connection, channel = %channel, "Message on unsubscribed channel ignored");
                    return None;
                }
                if let Err(e) = self
                    .relay
                    .dispatch(&self.identity, channel, Inbound::new(data))
                    .await
                {
                    error!(
                        connection = %self.connection,
                        user_id = %self.identity.user.id,
                        error = %e,
                        "Relay dispatch failed"
                    );
                }
                None
            }
        }
    }

    /// Removes every bus subscription of this connection.
    pub fn close(&mut self) {
        self.relay.disconnect(self.connection);
        self.subscribed.clear();
    }
}

impl Drop for RelaySession {
    fn drop(&mut self) {
        self.relay.disconnect(self.connection);
    }
}

fn encode(frame: &ServerFrame<'_>) -> Option<Message> {
    match serde_json::to_string(frame) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            error!(error = %e, "Failed to encode frame");
            None
        }
    }
}

/// Drives an upgraded socket until either side closes it.
pub async fn serve(socket: WebSocket, relay: Relay, admission: Admission, buffer: usize) {
    let Admission { identity, presence } = admission;
    let (mut sink, mut stream) = socket.split();
    let (delivery_tx, mut delivery_rx) = mpsc::channel::<Delivery>(buffer);
    let (control_tx, mut control_rx) = mpsc::channel::<Message>(16);

    let writer = tokio::spawn(async move {
        loop {
            let outgoing = tokio::select! {
                Some(message) = control_rx.recv() => message,
                Some(delivery) = delivery_rx.recv() => {
                    let frame = ServerFrame::Message {
                        channel: delivery.channel,
                        message: delivery.message.as_ref(),
                    };
                    match encode(&frame) {
                        Some(message) => message,
                        None => continue,
                    }
                }
                else => break,
            };
            if sink.send(outgoing).await.is_err() {
                break;
            }
        }
    });

    let mut session = RelaySession::new(relay, identity, delivery_tx);
    info!(
        user_id = %session.identity().user.id,
        role = %session.identity().role,
        "Relay connection open"
    );

    if let Some(welcome) = encode(&ServerFrame::Welcome) {
        let _ = control_tx.send(welcome).await;
    }

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => {
                    if let Some(reply) = session.handle(frame).await {
                        if let Some(message) = encode(&reply.frame()) {
                            if control_tx.send(message).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Unparseable client frame ignored");
                }
            },
            Message::Ping(payload) => {
                if control_tx.send(Message::Pong(payload)).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    info!(user_id = %session.identity().user.id, "Relay connection closed");
    session.close();
    drop(control_tx);
    writer.abort();
    presence.release().await;
}
