//! WebSocket client session management.
//!
//! One session is one connection: sync, fill the gap from the backlog, then
//! print live events and forward input until the connection ends.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use kakiko_server::infrastructure::dto::{
    codec::{decode, encode, parse_payload},
    websocket::{MessageType, SyncRequest, SyncResponse},
};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol::Message},
};

use crate::{
    backlog::BacklogClient,
    domain::{ComposeState, CounterTracker},
    error::ClientError,
    formatter::EventFormatter,
    runner::ClientConfig,
};

use super::ui::redisplay_prompt;

/// Mutable state carried across sessions
pub struct SessionState<'a> {
    pub tracker: &'a mut CounterTracker,
    pub compose: &'a mut ComposeState,
    pub input: &'a mut mpsc::UnboundedReceiver<String>,
}

/// Run the WebSocket client session. Returns `Ok` when the user ends input.
pub async fn run_client_session(
    config: &ClientConfig,
    backlog: &BacklogClient,
    state: SessionState<'_>,
) -> Result<(), ClientError> {
    let prompt = config.prompt();

    // A first session starts from the thread snapshot, a reconnect from the
    // last event seen
    let (start, sync_type) = match state.tracker.last() {
        Some(last) => (last, MessageType::Resynchronise),
        None => {
            let thread = backlog.fetch_thread(config.thread).await?;
            print!("{}", EventFormatter::format_thread(&thread));
            (thread.counter, MessageType::Synchronise)
        }
    };

    let (ws_stream, _) = connect_async(config.url.as_str())
        .await
        .map_err(|e| match e {
            tungstenite::Error::Http(response) => ClientError::Rejected(response.status().as_u16()),
            e => ClientError::ConnectionError(e.to_string()),
        })?;
    tracing::info!("Connected to {}", config.url);
    let (mut write, mut read) = ws_stream.split();

    let request = SyncRequest {
        board: config.board.clone(),
        thread: config.thread.value(),
    };
    send(&mut write, encode(sync_type, &request)?).await?;

    // Nothing is delivered live before the sync reply
    let counter = loop {
        let text = match next_text(&mut read).await? {
            Some(text) => text,
            None => continue,
        };
        let (tag, payload) = decode(&text)?;
        if MessageType::try_from(tag).is_ok_and(MessageType::is_sync) {
            let reply: SyncResponse = parse_payload(tag, payload)?;
            print!("{}", EventFormatter::format_frame(&text));
            break reply.counter;
        }
        print!("{}", EventFormatter::format_frame(&text));
    };

    for frame in backlog.fetch(config.thread, start, counter).await? {
        print!("{}", EventFormatter::format_frame(&frame));
    }
    state.tracker.on_sync(counter);
    redisplay_prompt(&prompt);

    loop {
        tokio::select! {
            text = next_text(&mut read) => {
                let Some(text) = text? else { continue };
                if let Ok((tag, _)) = decode(&text) {
                    state.tracker.on_frame(tag);
                }
                print!("{}", EventFormatter::format_frame(&text));
                redisplay_prompt(&prompt);
            }
            line = state.input.recv() => {
                let Some(line) = line else {
                    tracing::info!("Input closed");
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                };
                for frame in state.compose.frames_for_line(&line, config.thread, &config.board)? {
                    send(&mut write, frame).await?;
                }
            }
        }
    }
}

async fn send<S>(write: &mut S, frame: String) -> Result<(), ClientError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    write
        .send(Message::Text(frame.into()))
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))
}

/// Next text frame. `Ok(None)` for frames that carry no event.
async fn next_text<S>(read: &mut S) -> Result<Option<String>, ClientError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    match read.next().await {
        Some(Ok(Message::Text(text))) => Ok(Some(text.as_str().to_string())),
        Some(Ok(Message::Close(frame))) => {
            let (code, reason) = frame
                .map(|f| (u16::from(f.code), f.reason.as_str().to_string()))
                .unwrap_or((1005, String::new()));
            Err(ClientError::Closed { code, reason })
        }
        Some(Ok(_)) => Ok(None),
        Some(Err(e)) => Err(ClientError::ConnectionError(e.to_string())),
        None => Err(ClientError::ConnectionError("connection ended".to_string())),
    }
}
