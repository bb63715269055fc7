//! # HTTP Server
//!
//! Axum server wiring the ledger routes, health check and CORS together.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::ServiceConfig;
use crate::ledger::LedgerService;
use crate::observability::Logger;
use crate::scope::{SchoolDirectory, TokenVerifier};

use super::routes::{ledger_routes, ApiState};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_handler() -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    (StatusCode::OK, Json(response))
}

/// HTTP server for the ledger API
pub struct LedgerServer {
    config: ServiceConfig,
    router: Router,
}

impl LedgerServer {
    /// Build a server from configuration and a school directory.
    pub fn new<D: SchoolDirectory + 'static>(config: ServiceConfig, directory: Arc<D>) -> Self {
        let service = LedgerService::new(directory, config.ledger_settings());
        let verifier = TokenVerifier::new(config.token.clone());
        let state = Arc::new(ApiState { service, verifier });

        let router = Router::new()
            .route("/health", get(health_handler))
            .merge(ledger_routes(state))
            .layer(Self::cors_layer(&config));

        Self { config, router }
    }

    fn cors_layer(config: &ServiceConfig) -> CorsLayer {
        if config.cors_origins.is_empty() {
            // Permissive for development.
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until the process exits.
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid socket address: {}", e),
            )
        })?;

        Logger::info(
            "SERVER_STARTED",
            &[("addr", &addr.to_string()), ("endpoint", "/budgets")],
        );

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::StaticDirectory;

    fn create_test_server() -> LedgerServer {
        LedgerServer::new(ServiceConfig::default(), Arc::new(StaticDirectory::new()))
    }

    #[test]
    fn test_server_builds_router() {
        let server = create_test_server();
        assert_eq!(server.socket_addr(), "0.0.0.0:8750");
        let _router = server.router();
    }

    #[test]
    fn test_configured_origins_build() {
        let config = ServiceConfig {
            cors_origins: vec!["http://localhost:5173".to_string()],
            ..Default::default()
        };
        let server = LedgerServer::new(config, Arc::new(StaticDirectory::new()));
        let _router = server.router();
    }

    #[test]
    fn test_health_response_shape() {
        let response = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "ok");
    }
}
