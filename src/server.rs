//! HTTP API over the extraction pipeline.
//!
//! - `GET /healthz`
//! - `GET /api/erdiagram?username=..&dbname=..[&password=..]`: tables and foreign keys as JSON
//! - `GET /api/erdiagram/dot?...`: the same database as a Graphviz document

use crate::extract::{self, Credentials, ExtractError, ExtractOptions};
use crate::graph::{to_dot, Layout};
use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

/// Settings shared by every request
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub host: String,
    pub port: u16,
    pub ssl_mode: String,
    pub options: ExtractOptions,
    pub layout: Layout,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            host: extract::DEFAULT_HOST.to_string(),
            port: extract::DEFAULT_PORT,
            ssl_mode: "disable".to_string(),
            options: ExtractOptions::default(),
            layout: Layout::default(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
}

/// Query string of the diagram endpoints
#[derive(Debug, Default, Deserialize)]
pub struct DiagramQuery {
    pub username: Option<String>,
    pub dbname: Option<String>,
    pub password: Option<String>,
}

impl DiagramQuery {
    fn credentials(&self, config: &ServerConfig) -> Option<Credentials> {
        let username = self.username.as_deref().filter(|v| !v.is_empty())?;
        let dbname = self.dbname.as_deref().filter(|v| !v.is_empty())?;

        let mut creds = Credentials::new(username, dbname)
            .with_host(config.host.clone(), config.port)
            .with_ssl_mode(config.ssl_mode.clone());
        if let Some(password) = self.password.as_deref().filter(|v| !v.is_empty()) {
            creds = creds.with_password(password);
        }
        Some(creds)
    }
}

pub fn router(config: ServerConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
    };

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/erdiagram", get(er_diagram))
        .route("/api/erdiagram/dot", get(er_diagram_dot))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr;
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("pg-erd listening on {}", bind_addr);
    axum::serve(listener, router(config)).await?;
    Ok(())
}

pub async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

pub async fn er_diagram(
    State(state): State<AppState>,
    Query(query): Query<DiagramQuery>,
) -> Response {
    let Some(creds) = query.credentials(&state.config) else {
        return missing_params();
    };

    match extract::extract_schema(&creds, &state.config.options).await {
        Ok(schema) => (StatusCode::OK, Json(schema)).into_response(),
        Err(err) => extraction_failed(&creds, err),
    }
}

pub async fn er_diagram_dot(
    State(state): State<AppState>,
    Query(query): Query<DiagramQuery>,
) -> Response {
    let Some(creds) = query.credentials(&state.config) else {
        return missing_params();
    };

    match extract::extract_graph(&creds, &state.config.options).await {
        Ok(graph) => {
            let mut response = (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/vnd.graphviz; charset=utf-8")],
                to_dot(&graph, state.config.layout),
            )
                .into_response();
            response.headers_mut().insert(
                "x-unresolved-edges",
                HeaderValue::from(graph.warnings().len()),
            );
            response
        }
        Err(err) => extraction_failed(&creds, err),
    }
}

fn missing_params() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "username and dbname are required" })),
    )
        .into_response()
}

fn extraction_failed(creds: &Credentials, err: ExtractError) -> Response {
    error!(target_db = %creds, error = %err, "extraction failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn state(port: u16) -> AppState {
        AppState {
            config: Arc::new(ServerConfig {
                host: "127.0.0.1".to_string(),
                port,
                options: ExtractOptions {
                    timeout: Some(Duration::from_secs(5)),
                    ..Default::default()
                },
                ..Default::default()
            }),
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_params_is_bad_request() {
        let query = DiagramQuery {
            username: Some("alice".to_string()),
            ..Default::default()
        };
        let response = er_diagram(State(state(5432)), Query(query)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "username and dbname are required");
    }

    #[tokio::test]
    async fn test_dot_endpoint_checks_params_too() {
        let query = DiagramQuery {
            username: Some(String::new()),
            dbname: Some("shop".to_string()),
            password: None,
        };
        let response = er_diagram_dot(State(state(5432)), Query(query)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unreachable_database_is_server_error() {
        // Nothing listens on port 1
        let query = DiagramQuery {
            username: Some("alice".to_string()),
            dbname: Some("shop".to_string()),
            password: Some("secret".to_string()),
        };
        let response = er_diagram(State(state(1)), Query(query)).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        let message = body["error"].as_str().unwrap();
        assert!(!message.contains("secret"));
    }

    #[test]
    fn test_query_credentials_use_server_defaults() {
        let config = ServerConfig {
            host: "db.internal".to_string(),
            port: 6543,
            ..Default::default()
        };
        let query = DiagramQuery {
            username: Some("alice".to_string()),
            dbname: Some("shop".to_string()),
            password: Some(String::new()),
        };

        let creds = query.credentials(&config).unwrap();
        assert_eq!(creds.to_string(), "alice@db.internal:6543/shop");
        assert_eq!(creds.password, None);
    }

    #[tokio::test]
    async fn test_healthz() {
        let response = healthz().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["ok"], true);
    }
}
