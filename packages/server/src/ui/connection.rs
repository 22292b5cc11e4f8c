//! Connection actor.
//!
//! One actor per WebSocket connection:
//!
//! - a receive task reads the socket and forwards [`Inbound`] events over a
//!   channel, enforcing the read idle deadline
//! - the control loop owns the write half and is the only writer. It selects
//!   over inbound events, the outbound queue fed by the registry, the close
//!   signal and the keepalive tick
//!
//! A connection starts unsynced and only accepts Synchronise/Resynchronise
//! until it is synced to a feed.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::ws::{CloseFrame, Message, WebSocket, close_code},
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use kakiko_shared::time::get_unix_timestamp;
use tokio::{
    sync::{Notify, mpsc},
    task::JoinHandle,
    time::{Instant, interval_at, timeout},
};

use crate::{
    domain::{ClientHandle, ClientId, ClientRegistry, FeedKey, Ident, Timestamp},
    infrastructure::dto::{
        codec::{decode, encode},
        websocket::{ClientMessage, MessageType, SyncRequest, SyncResponse},
    },
    usecase::PostComposer,
};

use super::{error::ConnectionError, state::AppState};

type WsSender = SplitSink<WebSocket, Message>;

/// What the receive task hands to the control loop
#[derive(Debug)]
enum Inbound {
    Frame(String),
    Unsupported(&'static str),
    Closed,
    Failed(axum::Error),
    TimedOut,
}

/// Sync state of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Unsynced,
    Synced(FeedKey),
}

/// Register a new client and run its actor until the connection ends
pub async fn serve(socket: WebSocket, state: Arc<AppState>, ident: Ident) {
    let id = ClientId::generate();
    let (tx, rx) = mpsc::unbounded_channel();
    let close = Arc::new(Notify::new());
    state
        .registry
        .register(
            id,
            ClientHandle {
                sender: tx,
                close: close.clone(),
                ident: ident.clone(),
                connected_at: Timestamp::new(get_unix_timestamp()),
            },
        )
        .await;
    tracing::info!(
        "Client '{}' connected from {} (session: {})",
        id,
        ident.ip,
        ident.is_logged_in()
    );

    let connection = Connection::new(id, state.clone(), state.composer(ident));
    connection.run(socket, rx, close).await;
}

pub struct Connection {
    id: ClientId,
    state: Arc<AppState>,
    composer: PostComposer,
    phase: Phase,
}

impl Connection {
    pub fn new(id: ClientId, state: Arc<AppState>, composer: PostComposer) -> Self {
        Self {
            id,
            state,
            composer,
            phase: Phase::Unsynced,
        }
    }

    /// Control loop. Returns once the connection is closed and deregistered.
    pub async fn run(
        mut self,
        socket: WebSocket,
        mut outbound: mpsc::UnboundedReceiver<String>,
        close: Arc<Notify>,
    ) {
        let (mut sender, receiver) = socket.split();
        let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
        let recv_task = receive_loop(receiver, inbound_tx, self.state.config.read_timeout);

        let ping_interval = self.state.config.ping_interval;
        let mut keepalive = interval_at(Instant::now() + ping_interval, ping_interval);

        let result = loop {
            tokio::select! {
                inbound = inbound_rx.recv() => match inbound {
                    Some(Inbound::Frame(text)) => {
                        let reply = match self.handle_frame(&text).await {
                            Ok(reply) => reply,
                            Err(e) => break Err(e),
                        };
                        if let Some(frame) = reply {
                            let message = Message::Text(frame.into());
                            if let Err(e) = self.write(&mut sender, message).await {
                                break Err(e);
                            }
                        }
                    }
                    Some(Inbound::Unsupported(kind)) => {
                        break Err(ConnectionError::UnsupportedFrameKind(kind));
                    }
                    Some(Inbound::Failed(e)) => break Err(ConnectionError::Transport(e)),
                    Some(Inbound::TimedOut) => break Err(ConnectionError::TransportTimeout),
                    Some(Inbound::Closed) | None => break Ok(()),
                },
                Some(frame) = outbound.recv() => {
                    if let Err(e) = self.write(&mut sender, Message::Text(frame.into())).await {
                        break Err(e);
                    }
                }
                _ = close.notified() => {
                    tracing::info!("Client '{}' asked to close", self.id);
                    break Ok(());
                }
                _ = keepalive.tick() => {
                    if let Err(e) = self.write(&mut sender, Message::Ping(Bytes::new())).await {
                        break Err(e);
                    }
                    if let Err(e) = self.composer.expire_if_stale().await {
                        tracing::error!("Failed to close expired post of '{}': {}", self.id, e);
                    }
                }
            }
        };

        self.teardown(sender, result).await;
        recv_task.abort();
    }

    /// Handle one text frame. Returns a frame to write straight back to the
    /// client, ahead of anything queued after it.
    async fn handle_frame(&mut self, text: &str) -> Result<Option<String>, ConnectionError> {
        let (tag, payload) = decode(text)?;

        if self.phase == Phase::Unsynced
            && !MessageType::try_from(tag).is_ok_and(MessageType::is_sync)
        {
            return Err(ConnectionError::OutOfSequence(tag));
        }

        let message = ClientMessage::parse(tag, payload)?;
        tracing::debug!("Client '{}' sent {:?}", self.id, message.message_type());
        match message {
            ClientMessage::Synchronise(request) => {
                self.synchronise(MessageType::Synchronise, request).await.map(Some)
            }
            ClientMessage::Resynchronise(request) => {
                self.synchronise(MessageType::Resynchronise, request).await.map(Some)
            }
            ClientMessage::InsertPost(request) => {
                let id = self.composer.begin(request.thread, request.board).await?;
                encode(MessageType::PostId, &id).map(Some).map_err(Into::into)
            }
            ClientMessage::Append(text) => {
                self.composer.append(text).await?;
                Ok(None)
            }
            ClientMessage::Backspace => {
                self.composer.backspace().await?;
                Ok(None)
            }
            ClientMessage::Splice(request) => {
                self.composer.splice(request).await?;
                Ok(None)
            }
            ClientMessage::ClosePost => {
                self.composer.close().await?;
                Ok(None)
            }
        }
    }

    async fn synchronise(
        &mut self,
        typ: MessageType,
        request: SyncRequest,
    ) -> Result<String, ConnectionError> {
        let outcome = self
            .state
            .synchronise_usecase
            .execute(self.id, request.board, request.thread)
            .await?;
        self.phase = Phase::Synced(outcome.feed);
        let reply = SyncResponse {
            counter: outcome.counter,
            synced: outcome.synced,
        };
        Ok(encode(typ, &reply)?)
    }

    async fn write(&self, sender: &mut WsSender, message: Message) -> Result<(), ConnectionError> {
        match timeout(self.state.config.write_timeout, sender.send(message)).await {
            Ok(result) => result.map_err(ConnectionError::Transport),
            Err(_) => Err(ConnectionError::TransportTimeout),
        }
    }

    async fn teardown(mut self, mut sender: WsSender, result: Result<(), ConnectionError>) {
        self.state.synchronise_usecase.leave(&self.id).await;
        if let Err(e) = self.composer.close().await {
            tracing::error!("Failed to close open post of '{}': {}", self.id, e);
        }

        let (notice, frame) = match &result {
            Ok(()) => (
                None,
                CloseFrame {
                    code: close_code::NORMAL,
                    reason: "".into(),
                },
            ),
            Err(e) => {
                tracing::warn!("Closing connection of '{}': {}", self.id, e);
                let notice = if e.notifies_client() {
                    match encode(MessageType::Invalid, &e.to_string()) {
                        Ok(notice) => Some(notice),
                        Err(e) => {
                            tracing::error!("Failed to encode close notice: {}", e);
                            None
                        }
                    }
                } else {
                    None
                };
                (
                    notice,
                    CloseFrame {
                        code: e.close_code(),
                        reason: e.close_reason().into(),
                    },
                )
            }
        };

        let handshake = async {
            if let Some(notice) = notice {
                sender.send(Message::Text(notice.into())).await?;
            }
            sender.send(Message::Close(Some(frame))).await
        };
        match timeout(self.state.config.close_timeout, handshake).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("Close handshake with '{}' failed: {}", self.id, e),
            Err(_) => tracing::debug!("Close handshake with '{}' timed out", self.id),
        }

        self.state.registry.remove(&self.id).await;
        tracing::info!("Client '{}' disconnected", self.id);
    }
}

/// Spawns the task that reads the socket. Pings and pongs count as activity
/// but are not forwarded.
fn receive_loop(
    mut receiver: SplitStream<WebSocket>,
    tx: mpsc::UnboundedSender<Inbound>,
    read_timeout: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let inbound = match timeout(read_timeout, receiver.next()).await {
                Err(_) => Inbound::TimedOut,
                Ok(None) => Inbound::Closed,
                Ok(Some(Err(e))) => Inbound::Failed(e),
                Ok(Some(Ok(Message::Text(text)))) => Inbound::Frame(text.as_str().to_string()),
                Ok(Some(Ok(Message::Binary(_)))) => Inbound::Unsupported("binary"),
                Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
                Ok(Some(Ok(Message::Close(_)))) => Inbound::Closed,
            };
            let terminal = !matches!(inbound, Inbound::Frame(_));
            if tx.send(inbound).is_err() || terminal {
                break;
            }
        }
    })
}
