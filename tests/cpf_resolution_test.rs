//! CPF resolution against mock registry sources over real HTTP

mod common;

use axum::{http::StatusCode, routing::get, Json, Router};
use checadoc::cpf::{
    CpfResolver, CpfSource, HttpCpfSource, VerdictBasis, SITUATION_INVALID, SITUATION_UNVERIFIED,
};
use common::{closed_url, spawn_server, Hits, VALID_CPF, VALID_CPF_DIGITS};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn source(name: &str, base_url: &str, timeout: Duration) -> Arc<dyn CpfSource> {
    Arc::new(HttpCpfSource::new(
        name,
        base_url,
        timeout,
        reqwest::Client::new(),
    ))
}

async fn registry(status: StatusCode, body: serde_json::Value, hits: Hits) -> String {
    let router = Router::new().route(
        "/cpf/{cpf}",
        get(move || {
            let body = body.clone();
            let hits = hits.clone();
            async move {
                hits.bump();
                (status, Json(body))
            }
        }),
    );
    spawn_server(router).await
}

#[tokio::test]
async fn test_primary_answer_short_circuits() {
    let primary_hits = Hits::default();
    let secondary_hits = Hits::default();
    let primary = registry(
        StatusCode::OK,
        json!({ "situacao": "Regular", "nome": "MARIA SILVA SANTOS" }),
        primary_hits.clone(),
    )
    .await;
    let secondary = registry(
        StatusCode::OK,
        json!({ "situation": "Regular" }),
        secondary_hits.clone(),
    )
    .await;

    let resolver = CpfResolver::new(vec![
        source("primary", &primary, Duration::from_secs(5)),
        source("secondary", &secondary, Duration::from_secs(5)),
    ]);
    let verdict = resolver.resolve(VALID_CPF).await;

    assert!(verdict.valid);
    assert_eq!(verdict.cpf, VALID_CPF);
    assert_eq!(verdict.name.as_deref(), Some("MARIA SILVA SANTOS"));
    assert_eq!(
        verdict.basis,
        VerdictBasis::Registry {
            source: "primary".to_string()
        }
    );
    assert_eq!(primary_hits.count(), 1);
    assert_eq!(secondary_hits.count(), 0);
}

#[tokio::test]
async fn test_server_error_falls_through_to_secondary() {
    let primary = registry(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "message": "upstream exploded" }),
        Hits::default(),
    )
    .await;
    let secondary = registry(
        StatusCode::OK,
        json!({ "situation": "Suspensa", "name": "JOSE" }),
        Hits::default(),
    )
    .await;

    let resolver = CpfResolver::new(vec![
        source("primary", &primary, Duration::from_secs(5)),
        source("secondary", &secondary, Duration::from_secs(5)),
    ]);
    let verdict = resolver.resolve(VALID_CPF_DIGITS).await;

    assert!(!verdict.valid);
    assert_eq!(verdict.situation, "Suspensa");
    assert_eq!(
        verdict.basis,
        VerdictBasis::Registry {
            source: "secondary".to_string()
        }
    );
    assert!(verdict
        .trace
        .iter()
        .any(|entry| entry.message.contains("HTTP 500") && entry.message.contains("upstream exploded")));
}

#[tokio::test]
async fn test_every_source_failing_degrades_to_checksum() {
    let slow = Router::new().route(
        "/cpf/{cpf}",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "situation": "Regular" }))
        }),
    );
    let slow = spawn_server(slow).await;
    let garbage = Router::new().route("/cpf/{cpf}", get(|| async { "<html>maintenance</html>" }));
    let garbage = spawn_server(garbage).await;
    let unreachable = closed_url().await;

    let resolver = CpfResolver::new(vec![
        source("slow", &slow, Duration::from_millis(200)),
        source("garbage", &garbage, Duration::from_secs(5)),
        source("unreachable", &unreachable, Duration::from_secs(5)),
    ]);
    let verdict = resolver.resolve(VALID_CPF).await;

    assert!(verdict.valid);
    assert!(verdict.is_degraded());
    assert_eq!(verdict.situation, SITUATION_UNVERIFIED);
    let messages: Vec<&str> = verdict.trace.iter().map(|e| e.message.as_str()).collect();
    assert!(messages.iter().any(|m| m.contains("slow timed out")));
    assert!(messages.iter().any(|m| m.contains("garbage answered HTTP 200")));
    assert!(messages.iter().any(|m| m.contains("unreachable request failed")));
}

#[tokio::test]
async fn test_invalid_checksum_never_reaches_the_network() {
    let hits = Hits::default();
    let primary = registry(StatusCode::OK, json!({ "situation": "Regular" }), hits.clone()).await;

    let resolver = CpfResolver::new(vec![source("primary", &primary, Duration::from_secs(5))]);
    let verdict = resolver.resolve("529.982.247-26").await;

    assert!(!verdict.valid);
    assert_eq!(verdict.situation, SITUATION_INVALID);
    assert_eq!(verdict.basis, VerdictBasis::Checksum);
    assert_eq!(hits.count(), 0);
}
