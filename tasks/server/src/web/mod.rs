pub mod api;

use axum::Router;
use axum::extract::MatchedPath;
use axum::http::{
    Method, Request, StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use migration::MigratorTrait;
use sea_orm::Database;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::Span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::api::v1::AuthState;
use crate::auth::{JwtTokenIssuer, TokenIssuer};
use crate::cache::RedisTodoCache;
use crate::config::Config;
use crate::todo::TodoService;
use crate::todo::api::v1::TodoState;
use crate::todo::repository::SeaOrmTodoRepository;

/// Connects every dependency, then serves the API until SIGINT or SIGTERM.
///
/// Fails before binding the port if the database, its migrations or the cache are unavailable.
#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let db = Database::connect(&config.db_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let cache = RedisTodoCache::from_url(&config.redis_url())?;
    cache.ping().await?;
    tracing::info!("Connected to cache at {}", config.redis_addr);

    let issuer: Arc<dyn TokenIssuer> = Arc::new(JwtTokenIssuer::new(config.jwt_secret.clone()));
    let service = TodoService::new(
        Arc::new(SeaOrmTodoRepository::new(Arc::new(db))),
        Arc::new(cache),
        issuer.clone(),
    );
    let app = create_app(service, issuer, config.request_timeout());

    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .into_future();

    let grace = config.shutdown_grace();
    tokio::select! {
        result = server => result?,
        _ = async {
            // Only returns once the drain has outlasted the grace period.
            if shutdown_rx.wait_for(|started| *started).await.is_err() {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!("Open connections did not drain within {:?}, forcing shutdown", grace);
        }
    }

    tracing::info!("Web server stopped");
    Ok(())
}

/// Builds the application router with all routes and middleware.
pub fn create_app(
    service: TodoService,
    issuer: Arc<dyn TokenIssuer>,
    request_timeout: Duration,
) -> Router {
    let todo_state = Arc::new(TodoState::new(service));
    let auth_state = Arc::new(AuthState::new(issuer));

    Router::new()
        .route("/health", axum::routing::get(health_check_handler))
        .merge(api::create_api_router(auth_state, todo_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetSensitiveRequestHeadersLayer::new([AUTHORIZATION]))
                .layer(TraceLayer::new_for_http().make_span_with(RequestSpan))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    request_timeout,
                ))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                        .allow_headers([AUTHORIZATION, CONTENT_TYPE]),
                ),
        )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining connections");
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

/// Span maker that records the request line only. Headers, including the
/// bearer token, are never attached to the span.
#[derive(Clone, Debug)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let matched_path = request
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str);

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            matched_path,
        )
    }
}
