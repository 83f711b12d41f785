//! HTTP endpoints of the account gateway.
//!
//! This module is organized into submodules:
//! - `account` - Registration, login and token introspection (/api/account/*)
//! - `auth` - Bearer token extractor
//! - `health` - Health check endpoint (/healthz)
//! - `openapi` - OpenAPI/Utoipa configuration

pub mod account;
pub mod auth;
pub mod health;
pub mod openapi;

pub use account::ACCOUNT_TAG;
pub use health::MISC_TAG;

use crate::AppResources;
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

fn api_routes() -> OpenApiRouter {
    OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .nest("/api/account", account::router())
        .routes(routes!(health::health))
}

/// The OpenAPI document served at `/api-docs`.
pub fn openapi_document() -> utoipa::openapi::OpenApi {
    api_routes().into_openapi()
}

/// Builds the full application router, including the Redoc UI at `/api-docs`.
pub fn app_router(app_resources: AppResources) -> Router {
    let (router, api) = api_routes()
        .layer(axum::Extension(app_resources))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .split_for_parts();

    router.merge(Redoc::with_url("/api-docs", api))
}

/// Starts the web server with all configured routes.
#[tracing::instrument(skip(app_resources))]
pub async fn start_webserver(app_resources: AppResources) -> color_eyre::Result<()> {
    let addr = app_resources.config.listen_addr.clone();
    let router = app_router(app_resources);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server running");
    axum::serve(listener, router)
        .await
        .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
