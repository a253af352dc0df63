//! Postal registry client
//!
//! The registry is the single source of truth for CEPs, so there is no
//! fallback chain here: one request, one typed answer.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{Address, CepError};

/// Placeholder replaced by the 8-digit code in URL templates
pub const CEP_PLACEHOLDER: &str = "{cep}";

/// Something that can resolve an 8-digit CEP to an address
#[async_trait]
pub trait PostalRegistry: Send + Sync {
    /// `cep` is always exactly 8 digits
    async fn lookup(&self, cep: &str) -> Result<Address, CepError>;
}

/// Registry body. English keys follow the generic registry contract; the
/// Portuguese aliases are what ViaCEP actually sends.
#[derive(Debug, Deserialize)]
struct RegistryAddress {
    #[serde(default)]
    cep: Option<String>,
    #[serde(default, alias = "logradouro")]
    street: String,
    #[serde(default, alias = "bairro")]
    district: String,
    #[serde(default, alias = "localidade")]
    city: String,
    #[serde(default, alias = "uf")]
    state: String,
}

/// `{"erro": true}` from ViaCEP, `{"error": true}` from the generic contract.
/// ViaCEP has been seen sending the flag as the string `"true"`.
fn flags_not_found(body: &serde_json::Value) -> bool {
    ["erro", "error"].iter().any(|key| match body.get(key) {
        Some(serde_json::Value::Bool(flag)) => *flag,
        Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

/// Interpret a raw registry answer
pub(crate) fn interpret_response(cep: &str, status: u16, body: &str) -> Result<Address, CepError> {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            return Err(CepError::ServiceUnavailable(if (200..300).contains(&status) {
                format!("unparseable registry response ({e})")
            } else {
                format!("registry returned HTTP {status}")
            }))
        }
    };

    if flags_not_found(&value) {
        return Err(CepError::NotFound);
    }

    if !(200..300).contains(&status) {
        return Err(CepError::ServiceUnavailable(format!(
            "registry returned HTTP {status}"
        )));
    }

    let address: RegistryAddress = serde_json::from_value(value).map_err(|e| {
        CepError::ServiceUnavailable(format!("unexpected registry payload ({e})"))
    })?;

    Ok(Address {
        cep: address.cep.unwrap_or_else(|| cep.to_string()),
        street: address.street,
        district: address.district,
        city: address.city,
        state: address.state,
    })
}

/// HTTP registry addressed through a URL template such as
/// `https://viacep.com.br/ws/{cep}/json/`
pub struct HttpPostalRegistry {
    url_template: String,
    client: Client,
}

impl HttpPostalRegistry {
    pub fn new(url_template: impl Into<String>, client: Client) -> Self {
        Self {
            url_template: url_template.into(),
            client,
        }
    }

    fn url_for(&self, cep: &str) -> String {
        if self.url_template.contains(CEP_PLACEHOLDER) {
            self.url_template.replace(CEP_PLACEHOLDER, cep)
        } else {
            format!("{}/{}", self.url_template.trim_end_matches('/'), cep)
        }
    }
}

#[async_trait]
impl PostalRegistry for HttpPostalRegistry {
    async fn lookup(&self, cep: &str) -> Result<Address, CepError> {
        let response = self
            .client
            .get(self.url_for(cep))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| CepError::ServiceUnavailable(format!("request failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| CepError::ServiceUnavailable(format!("failed to read body: {e}")))?;

        interpret_response(cep, status, &body)
    }
}
