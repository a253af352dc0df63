//! CPF registry proxy
//!
//! Browsers cannot call the tax registry directly, so `checadoc serve` runs
//! this small relay in front of it:
//!
//! - `GET /health` - liveness probe
//! - `GET /cpf/{cpf}` - primary registry, then a fallback registry when the
//!   primary cannot be reached or answers something unparseable

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use reqwest::{Client, Url};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::ProxyConfig;
use crate::cpf::{clean_cpf, mask_cpf, CPF_LEN};
use crate::error::Result;

/// Relay server for CPF lookups
pub struct ProxyServer {
    config: ProxyConfig,
    client: Client,
}

#[derive(Clone)]
struct ProxyState {
    client: Client,
    primary_url: String,
    fallback_url: String,
    timeout: Duration,
}

type Reply = (StatusCode, Json<Value>);

impl ProxyServer {
    pub fn new(config: ProxyConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Bind the configured address and serve until the process stops
    pub async fn start(self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.bind).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        info!("CPF proxy listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    pub fn router(&self) -> Router {
        let state = Arc::new(ProxyState {
            client: self.client.clone(),
            primary_url: self.config.primary_url.clone(),
            fallback_url: self.config.fallback_url.clone(),
            timeout: self.config.upstream_timeout,
        });

        Router::new()
            .route("/health", get(health_check))
            .route("/cpf/{cpf}", get(lookup_cpf))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn lookup_cpf(State(state): State<Arc<ProxyState>>, Path(cpf): Path<String>) -> Reply {
    let digits = clean_cpf(&cpf);
    if digits.len() != CPF_LEN {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "CPF must have 11 digits" })),
        );
    }

    info!(cpf = %mask_cpf(&digits), "Querying primary registry");
    let primary_error = match fetch_json(&state, &state.primary_url, &digits).await {
        Ok((status, body)) if status.is_success() => {
            info!(cpf = %mask_cpf(&digits), status = status.as_u16(), "Primary registry answered");
            return (StatusCode::OK, Json(body));
        }
        Ok((status, body)) => {
            warn!(status = status.as_u16(), "Primary registry refused the lookup");
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "Primary registry unavailable",
                    "status": status.as_u16(),
                    "detail": error_detail(&body),
                })),
            );
        }
        Err(e) => e,
    };

    warn!("Primary registry failed ({}), trying fallback", primary_error);
    match fetch_json(&state, &state.fallback_url, &digits).await {
        Ok((status, body)) if status.is_success() => match body.get("name").and_then(Value::as_str) {
            Some(name) => (
                StatusCode::OK,
                Json(json!({
                    "situacao": "Regular",
                    "nome": name,
                    "cpf": digits,
                    "source": source_label(&state.fallback_url),
                })),
            ),
            None => both_failed(&primary_error, "answer carried no name"),
        },
        Ok((status, body)) => {
            let reason = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            both_failed(&primary_error, &reason)
        }
        Err(fallback_error) => both_failed(&primary_error, &fallback_error),
    }
}

fn both_failed(primary: &str, fallback: &str) -> Reply {
    warn!("Both registries failed");
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({
            "error": format!("Both registries failed. Primary: {primary}. Fallback: {fallback}"),
        })),
    )
}

/// GET `{base}/{digits}` within the upstream bound. Any transport, timeout
/// or JSON failure is an `Err` with a readable reason.
async fn fetch_json(
    state: &ProxyState,
    base: &str,
    digits: &str,
) -> std::result::Result<(StatusCode, Value), String> {
    let url = format!("{}/{}", base.trim_end_matches('/'), digits);
    let request = async {
        let response = state
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;
        let status = StatusCode::from_u16(response.status().as_u16())
            .map_err(|e| format!("invalid status: {e}"))?;
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| format!("unparseable body: {e}"))?;
        Ok((status, body))
    };

    tokio::time::timeout(state.timeout, request)
        .await
        .unwrap_or_else(|_| Err(format!("no answer within {}s", state.timeout.as_secs())))
}

/// Best human-readable reason in an upstream error body
fn error_detail(body: &Value) -> String {
    ["message", "type"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

fn source_label(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| "fallback".to_string())
}
