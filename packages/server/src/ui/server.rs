//! Server execution logic.

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::{
    handler::{
        get_backlog, get_board_backlog, get_board_counter, get_post, get_thread,
        get_thread_counter, health_check, websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Thread synchronisation server
///
/// # Example
///
/// ```ignore
/// let state = AppState::new(config, store, feed, registry, Arc::new(SystemClock));
/// let server = Server::new(Arc::new(state));
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/threads/{thread}", get(get_thread))
            .route("/api/posts/{post}", get(get_post))
            .route("/api/feeds/thread/{thread}/counter", get(get_thread_counter))
            .route("/api/feeds/board/{board}/counter", get(get_board_counter))
            .route("/api/backlog/{thread}/{start}/{end}", get(get_backlog))
            .route("/api/backlog/board/{board}/{start}/{end}", get(get_board_backlog))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server until Ctrl+C or SIGTERM
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Kakiko server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    /// Every connected client is told to close on shutdown.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let registry = self.state.registry.clone();

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Closing {} connections", registry.len().await);
            registry.close_all().await;
        })
        .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
