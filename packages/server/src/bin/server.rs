//! Kakiko thread synchronisation server.
//!
//! Serves the WebSocket sync endpoint and the HTTP backlog API. One empty
//! thread is seeded per board so clients have something to sync to.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kakiko-server
//! cargo run --bin kakiko-server -- --host 0.0.0.0 --port 3000 --boards a,b,g
//! ```

use std::sync::Arc;

use clap::Parser;
use kakiko_server::{
    config::{MAX_BODY_LEN, ServerConfig},
    domain::{BoardId, PostStore, Timestamp},
    infrastructure::{
        feed::InMemoryUpdateFeed, registry::ChannelClientRegistry, repository::InMemoryPostStore,
    },
    ui::{AppState, Server},
};
use kakiko_shared::{
    logger::setup_logger,
    time::{SystemClock, get_unix_timestamp},
};

#[derive(Parser, Debug)]
#[command(name = "kakiko-server")]
#[command(about = "Real-time thread synchronisation server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Host (and port) the Origin header must name. Empty accepts any origin.
    #[arg(long, default_value = "")]
    allowed_origin: String,

    /// Boards to seed with one thread each
    #[arg(long, value_delimiter = ',', default_value = "b")]
    boards: Vec<String>,

    /// Take client IPs from X-Forwarded-For
    #[arg(long)]
    trust_proxy: bool,

    /// Maximum post body length in characters
    #[arg(long, default_value_t = MAX_BODY_LEN)]
    max_body_len: usize,

    /// Entries kept per feed for backlog pulls. Unlimited when omitted.
    #[arg(long)]
    backlog_retention: Option<usize>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    let config = ServerConfig {
        allowed_origin: args.allowed_origin,
        trust_proxy: args.trust_proxy,
        max_body_len: args.max_body_len,
        backlog_retention: args.backlog_retention,
        ..ServerConfig::default()
    };

    // Initialize dependencies in order:
    // 1. Store
    // 2. Registry
    // 3. UpdateFeed
    // 4. AppState
    // 5. Server

    // 1. Create the canonical store and seed one thread per board
    let store = Arc::new(InMemoryPostStore::new());
    for board in args.boards {
        let board = match BoardId::new(board.clone()) {
            Ok(board) => board,
            Err(e) => {
                tracing::error!("Invalid board '{}': {}", board, e);
                std::process::exit(1);
            }
        };
        let subject = format!("/{}/ general", board);
        match store
            .create_thread(board.clone(), subject, Timestamp::new(get_unix_timestamp()))
            .await
        {
            Ok(thread) => tracing::info!("Thread {} created on /{}/", thread, board),
            Err(e) => {
                tracing::error!("Failed to seed board '{}': {}", board, e);
                std::process::exit(1);
            }
        }
    }

    // 2. Create the client registry
    let registry = Arc::new(ChannelClientRegistry::new());

    // 3. Create the update feed, broadcasting through the registry
    let feed = Arc::new(InMemoryUpdateFeed::new(
        registry.clone(),
        config.backlog_retention,
    ));

    // 4. Wire use cases into the shared state
    let state = AppState::new(config, store, feed, registry, Arc::new(SystemClock));

    // 5. Create and run the server
    let server = Server::new(Arc::new(state));
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
