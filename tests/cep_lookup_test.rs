//! CEP resolution against a mock postal registry

mod common;

use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
use checadoc::cep::{CepError, CepResolver};
use checadoc::config::CepConfig;
use common::{closed_url, spawn_server, Hits};
use serde_json::json;
use std::time::Duration;

async fn viacep(hits: Hits) -> String {
    let router = Router::new().route(
        "/ws/{cep}/json/",
        get(move |Path(cep): Path<String>| {
            let hits = hits.clone();
            async move {
                hits.bump();
                match cep.as_str() {
                    "01001000" => (
                        StatusCode::OK,
                        Json(json!({
                            "cep": "01001-000",
                            "logradouro": "Praça da Sé",
                            "bairro": "Sé",
                            "localidade": "São Paulo",
                            "uf": "SP"
                        })),
                    ),
                    "50000000" => (StatusCode::SERVICE_UNAVAILABLE, Json(json!({}))),
                    _ => (StatusCode::OK, Json(json!({ "erro": "true" }))),
                }
            }
        }),
    );
    spawn_server(router).await
}

fn resolver(base: &str) -> CepResolver {
    let config = CepConfig {
        url_template: format!("{base}/ws/{{cep}}/json/"),
        timeout: Duration::from_secs(5),
    };
    CepResolver::from_config(&config, &reqwest::Client::new())
}

#[tokio::test]
async fn test_known_cep_resolves_to_address() {
    let base = viacep(Hits::default()).await;
    let address = resolver(&base).resolve("01001-000").await.unwrap();

    assert_eq!(address.cep, "01001-000");
    assert_eq!(address.street, "Praça da Sé");
    assert_eq!(address.city, "São Paulo");
    assert_eq!(address.state, "SP");
}

#[tokio::test]
async fn test_not_found_is_distinct_from_unavailable() {
    let base = viacep(Hits::default()).await;
    let resolver = resolver(&base);

    assert_eq!(resolver.resolve("99999-999").await, Err(CepError::NotFound));

    let unavailable = resolver.resolve("50000-000").await.unwrap_err();
    assert!(matches!(unavailable, CepError::ServiceUnavailable(_)));
    assert!(unavailable.is_retryable());
}

#[tokio::test]
async fn test_unreachable_registry_is_unavailable() {
    let base = closed_url().await;
    let error = resolver(&base).resolve("01001000").await.unwrap_err();
    assert!(matches!(error, CepError::ServiceUnavailable(_)));
}

#[tokio::test]
async fn test_wrong_length_skips_the_request() {
    let hits = Hits::default();
    let base = viacep(hits.clone()).await;

    assert_eq!(
        resolver(&base).resolve("0100-100").await,
        Err(CepError::WrongLength(7))
    );
    assert_eq!(hits.count(), 0);
}
