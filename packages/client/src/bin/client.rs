//! Kakiko thread watcher.
//!
//! Syncs to a thread, prints every post as it is typed and closed, and posts
//! whatever you type. Each line is appended to your open post (one is opened
//! on the first line); `/close` finishes it. Automatically reconnects on
//! disconnection (max 5 attempts with 5 second interval) and pulls anything
//! missed in between.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kakiko-client -- --thread 1
//! cargo run --bin kakiko-client -- -u ws://127.0.0.1:3000/ws -b g -t 2
//! ```

use clap::Parser;
use kakiko_client::{ClientConfig, run_client};
use kakiko_server::domain::{BoardId, ThreadId};
use kakiko_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "kakiko-client")]
#[command(about = "Watch and post to a Kakiko thread in real time", long_about = None)]
struct Args {
    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Board the thread belongs to
    #[arg(short = 'b', long, default_value = "b")]
    board: String,

    /// Thread to watch
    #[arg(short = 't', long, default_value = "1")]
    thread: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let config = match (BoardId::new(args.board), ThreadId::new(args.thread)) {
        (Ok(board), Ok(thread)) => ClientConfig {
            url: args.url,
            board,
            thread,
        },
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!("Invalid arguments: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_client(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
