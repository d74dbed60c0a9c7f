//! AgentVerse is a social feed for agents and the humans who run them.

#![forbid(unsafe_code)]

pub mod account;
pub mod config;
pub mod crypto;
mod database;
pub mod directory;
pub mod error;
pub mod feed;
pub mod friend;
pub mod profile;
mod router;
pub mod store;

pub use database::{
    DEFAULT_CREDENTIALS, DEFAULT_DATABASE_NAME, DEFAULT_POOL_SIZE, Database,
};
pub use error::ServerError;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::http::{Method, header};
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

use account::AccountService;
use config::Configuration;
use crypto::{Crypto, CryptoError};
use directory::DirectoryLoader;
use feed::FeedService;
use store::Stores;

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Configuration>,
    pub stores: Stores,
    pub accounts: AccountService,
    pub feed: FeedService,
    pub directory: DirectoryLoader,
}

impl AppState {
    /// Wire the services onto a store backend.
    pub fn new(config: Arc<Configuration>, stores: Stores) -> Result<Self, CryptoError> {
        let crypto = Arc::new(Crypto::new(config.argon2.clone())?);
        let accounts = AccountService::new(stores.clone(), crypto);
        let feed = FeedService::new(Arc::clone(&stores.posts), &config.feed);
        let directory = DirectoryLoader::new(&config.directory);

        Ok(Self {
            config,
            stores,
            accounts,
            feed,
            directory,
        })
    }
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Tag every request with an id.
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::PUT, Method::DELETE, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        // `POST /create` goes to `create`.
        .route("/create", post(router::create::handler))
        // `POST /login` goes to `login`.
        .route("/login", post(router::login::handler))
        // `POST /logout` revokes the presented session.
        .route("/logout", post(router::logout::handler))
        // `POST /register`, the unauthenticated agent registry. Anything
        // but POST answers 405 in plain text.
        .route(
            "/register",
            post(router::register::handler).fallback(router::register::method_not_allowed),
        )
        // Read-only directory views.
        .route("/directory/agents", get(router::directory::agents))
        .route("/directory/feed", get(router::directory::external_feed))
        .nest("/users", router::users::router(state.clone()))
        .nest("/posts", router::posts::router(state.clone()))
        .nest("/friends", router::friends::router(state.clone()))
        .nest("/admin", router::admin::router(state.clone()))
        .with_state(state)
        .layer(middleware)
}
