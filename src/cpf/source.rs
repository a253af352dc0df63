//! Remote CPF lookup sources
//!
//! A source answers `GET {base_url}/cpf/{digits}`. Every way a lookup can go
//! wrong is an [`AttemptOutcome`] value rather than an error, so the resolver
//! can walk its fallback chain as ordinary control flow.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// What a registry told us about a CPF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryRecord {
    pub situation: String,
    pub name: Option<String>,
}

/// Result of one lookup attempt against one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// 2xx with a usable situation field
    Found { status: u16, record: RegistryRecord },
    /// Non-2xx answer, with the body's message field when there was one
    HttpStatus { status: u16, message: Option<String> },
    /// 2xx whose body could not be parsed or carried no situation
    Unrecognized { status: u16, detail: String },
    /// The attempt exceeded its time budget and was cancelled
    Timeout(Duration),
    /// Connection, TLS or body-read failure
    Transport(String),
}

impl AttemptOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, AttemptOutcome::Found { .. })
    }
}

/// A registry proxy (or the registry itself) that can look up a CPF
#[async_trait]
pub trait CpfSource: Send + Sync {
    /// Human-readable name used in traces and verdicts
    fn name(&self) -> &str;

    /// Upper bound for one attempt; the resolver enforces it
    fn timeout(&self) -> Duration;

    /// Look up 11 bare digits
    async fn lookup(&self, digits: &str) -> AttemptOutcome;
}

/// Registry body as returned by the proxies. Portuguese keys come from
/// ReceitaWS-shaped payloads that the proxies pass through untouched.
#[derive(Debug, Default, Deserialize)]
struct RegistryBody {
    #[serde(default, alias = "situacao")]
    situation: Option<String>,
    #[serde(default, alias = "nome")]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl RegistryBody {
    fn describe_error(&self) -> Option<String> {
        self.message.clone().or_else(|| match &self.error {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
    }
}

/// Interpret a raw HTTP answer. Kept free of I/O so every branch is testable.
pub(crate) fn interpret_response(status: u16, body: &str) -> AttemptOutcome {
    let parsed = serde_json::from_str::<RegistryBody>(body);

    if !(200..300).contains(&status) {
        let message = parsed.ok().and_then(|b| b.describe_error());
        return AttemptOutcome::HttpStatus { status, message };
    }

    let body = match parsed {
        Ok(body) => body,
        Err(e) => {
            return AttemptOutcome::Unrecognized {
                status,
                detail: format!("body is not valid registry JSON ({e})"),
            }
        }
    };

    match body.situation.as_deref().map(str::trim) {
        Some(situation) if !situation.is_empty() => AttemptOutcome::Found {
            status,
            record: RegistryRecord {
                situation: situation.to_string(),
                name: body.name.filter(|n| !n.trim().is_empty()),
            },
        },
        _ => AttemptOutcome::Unrecognized {
            status,
            detail: body
                .describe_error()
                .unwrap_or_else(|| "response has no situation field".to_string()),
        },
    }
}

/// HTTP-backed source using a shared, injected `reqwest::Client`
pub struct HttpCpfSource {
    name: String,
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl HttpCpfSource {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        client: Client,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        }
    }

    fn url_for(&self, digits: &str) -> String {
        format!("{}/cpf/{}", self.base_url, digits)
    }
}

#[async_trait]
impl CpfSource for HttpCpfSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn lookup(&self, digits: &str) -> AttemptOutcome {
        let response = match self
            .client
            .get(self.url_for(digits))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return AttemptOutcome::Transport(e.to_string()),
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => interpret_response(status, &body),
            Err(e) => AttemptOutcome::Transport(format!("failed to read body: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_with_english_keys() {
        let outcome = interpret_response(200, r#"{"situation":"Regular","name":"MARIA"}"#);
        assert_eq!(
            outcome,
            AttemptOutcome::Found {
                status: 200,
                record: RegistryRecord {
                    situation: "Regular".to_string(),
                    name: Some("MARIA".to_string()),
                },
            }
        );
    }

    #[test]
    fn test_found_with_portuguese_keys() {
        let outcome = interpret_response(200, r#"{"situacao":"Suspensa","nome":""}"#);
        match outcome {
            AttemptOutcome::Found { record, .. } => {
                assert_eq!(record.situation, "Suspensa");
                assert_eq!(record.name, None);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_non_json_success_is_unrecognized() {
        let outcome = interpret_response(200, "<html>rate limited</html>");
        assert!(matches!(
            outcome,
            AttemptOutcome::Unrecognized { status: 200, .. }
        ));
    }

    #[test]
    fn test_success_without_situation_is_unrecognized() {
        let outcome = interpret_response(200, r#"{"message":"Too many requests"}"#);
        assert_eq!(
            outcome,
            AttemptOutcome::Unrecognized {
                status: 200,
                detail: "Too many requests".to_string(),
            }
        );
    }

    #[test]
    fn test_error_status_keeps_message() {
        let outcome = interpret_response(502, r#"{"error":"ReceitaWS unavailable"}"#);
        assert_eq!(
            outcome,
            AttemptOutcome::HttpStatus {
                status: 502,
                message: Some("ReceitaWS unavailable".to_string()),
            }
        );

        let outcome = interpret_response(500, "Internal Server Error");
        assert_eq!(
            outcome,
            AttemptOutcome::HttpStatus {
                status: 500,
                message: None,
            }
        );
    }

    #[test]
    fn test_url_trims_trailing_slash() {
        let source = HttpCpfSource::new(
            "primary",
            "http://localhost:3000/",
            Duration::from_secs(1),
            Client::new(),
        );
        assert_eq!(
            source.url_for("52998224725"),
            "http://localhost:3000/cpf/52998224725"
        );
    }
}
