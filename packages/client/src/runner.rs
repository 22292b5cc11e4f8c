//! Client execution logic with reconnection support.

use std::time::Duration;

use kakiko_server::domain::{BoardId, ThreadId};
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use crate::{
    backlog::BacklogClient,
    domain::{ComposeState, CounterTracker, http_base, should_attempt_reconnect},
};

use super::session::{SessionState, run_client_session};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL_SECS: u64 = 5;

/// What the watcher connects to
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint, e.g. `ws://127.0.0.1:8080/ws`
    pub url: String,
    pub board: BoardId,
    pub thread: ThreadId,
}

impl ClientConfig {
    pub fn prompt(&self) -> String {
        format!("/{}/ #{}> ", self.board, self.thread)
    }
}

/// Run the watcher with reconnection logic
pub async fn run_client(config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let backlog = BacklogClient::new(http_base(&config.url)?);
    let mut input = spawn_readline(config.prompt());
    let mut tracker = CounterTracker::default();
    let mut compose = ComposeState::default();
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Attempting to connect to {} (attempt {}/{})",
            config.url,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS + 1
        );

        let state = SessionState {
            tracker: &mut tracker,
            compose: &mut compose,
            input: &mut input,
        };
        match run_client_session(&config, &backlog, state).await {
            Ok(()) => {
                tracing::info!("Client session ended normally");
                break;
            }
            Err(e) => {
                tracing::warn!("Connection lost: {}", e);
                // The server closes the open post with the connection
                compose.reset();

                if !should_attempt_reconnect(&e, reconnect_count, MAX_RECONNECT_ATTEMPTS) {
                    tracing::error!("Giving up after {} reconnect attempts", reconnect_count);
                    return Err(Box::new(e));
                }
                reconnect_count += 1;

                tracing::info!(
                    "Reconnecting in {} seconds... (attempt {}/{})",
                    RECONNECT_INTERVAL_SECS,
                    reconnect_count,
                    MAX_RECONNECT_ATTEMPTS
                );
                tokio::time::sleep(Duration::from_secs(RECONNECT_INTERVAL_SECS)).await;
            }
        }
    }

    Ok(())
}

/// Read lines on a blocking thread. The channel closes on Ctrl+C or Ctrl+D.
fn spawn_readline(prompt: String) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim_end();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    input_rx
}
