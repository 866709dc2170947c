//! Rooms Web Server
//!
//! Axum-based REST API and WebSocket endpoint for chat rooms.

pub mod auth;
pub mod routes;
pub mod state;
pub mod websocket;

use std::future::Future;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Users
        .route("/users", post(routes::users::create_user))
        .route("/users/{id}", get(routes::users::get_user))
        // Rooms
        .route("/rooms", get(routes::rooms::list_rooms))
        .route("/rooms", post(routes::rooms::create_room))
        .route("/rooms/{id}", get(routes::rooms::get_room))
        .route("/rooms/{id}", put(routes::rooms::update_room))
        .route("/rooms/{id}", delete(routes::rooms::delete_room))
        // POST takes the new member's email, DELETE their user id.
        .route("/rooms/{id}/users/{member}", post(routes::rooms::add_user))
        .route("/rooms/{id}/users/{member}", delete(routes::rooms::remove_user))
        // Messages
        .route("/rooms/{id}/messages", get(routes::messages::list_messages))
        .route("/rooms/{id}/messages", post(routes::messages::create_message))
        .route("/messages/{id}", put(routes::messages::update_message))
        .route("/messages/{id}", delete(routes::messages::delete_message))
        // Hub
        .route("/hub/stats", get(routes::hub::stats))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(routes::hub::health))
        .nest("/api", api_routes)
        .route("/ws/rooms/{room_id}", get(websocket::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Run the web server.
pub async fn run_server<F>(state: AppState, host: &str, port: u16, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind((host, port)).await?;
    tracing::info!("Web server listening on http://{}", listener.local_addr()?);

    serve(listener, state, shutdown).await
}
