//! JSON API over the team matching workflow.

pub mod auth;
pub mod error;
pub mod routes;
pub mod telemetry;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use hackmatch_config::Config;
use hackmatch_database::{run_migrations, PgStore};
use hackmatch_workflow::{Context, MemoryStore, Services, Settings, Store, SystemClock};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, warn};

use crate::error::{panic_response, route_not_found, AppError};

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

/// An empty `cors_origins` list allows every origin.
fn cors(cors_origins: &[String]) -> CorsLayer {
    if cors_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(origin) => Some(origin),
            Err(_) => {
                warn!(%origin, "ignoring malformed cors origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

fn layers(app: Router<AppState>, state: AppState, cors_origins: &[String]) -> Router {
    // layers are in reverse order
    let app: Router = app.with_state(state);
    let app = app.layer(
        ServiceBuilder::new()
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::default().include_headers(true))
                    .on_response(DefaultOnResponse::default().include_headers(true)),
            )
            .layer(CatchPanicLayer::custom(panic_response)),
    );
    let app = app.layer(cors(cors_origins));
    let app = app.layer(PropagateRequestIdLayer::x_request_id());
    app.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

pub fn app(services: Services, cors_origins: &[String]) -> Router {
    let app = Router::new()
        .nest("/api", routes::api())
        .fallback(route_not_found);
    layers(app, AppState { services }, cors_origins)
}

/// PostgreSQL when a database url is configured, otherwise an in-memory
/// store that is lost on restart.
pub async fn open_store(config: &Config) -> Result<Arc<dyn Store>, AppError> {
    let store: Arc<dyn Store> = if let Some(database_url) = &config.database_url {
        run_migrations(database_url).await?;
        let store = PgStore::connect(database_url)?;
        info!("connected to postgres");
        Arc::new(store)
    } else {
        warn!("no database_url configured, data is kept in memory only");
        Arc::new(MemoryStore::new())
    };
    Ok(store)
}

pub async fn run_server(config: Config) -> Result<(), AppError> {
    let store = open_store(&config).await?;
    let context = Context::new(
        store,
        Arc::new(SystemClock),
        Settings {
            default_max_members: config.teams.default_max_members,
        },
    );
    let app = app(Services::new(&context), &config.cors_origins);

    let listener = TcpListener::bind(config.listen).await?;
    info!(listen = %config.listen, "started up server...");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

#[allow(clippy::redundant_pub_crate)]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                error!(%error, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    warn!("shutting down");
}
