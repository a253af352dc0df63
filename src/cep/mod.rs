//! CEP (postal code) resolution

pub mod registry;

pub use registry::{HttpPostalRegistry, PostalRegistry, CEP_PLACEHOLDER};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::CepConfig;

/// Number of digits in a CEP
pub const CEP_LEN: usize = 8;

/// Structured address as returned by the postal registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub cep: String,
    pub street: String,
    pub district: String,
    pub city: String,
    pub state: String,
}

impl Address {
    /// `"{street}, {district} - {city}/{state}"`, the form used to fill in addresses
    pub fn one_line(&self) -> String {
        format!(
            "{}, {} - {}/{}",
            self.street, self.district, self.city, self.state
        )
    }
}

/// Why a CEP could not be resolved
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CepError {
    /// Input did not reduce to exactly 8 digits; no request was made
    #[error("CEP must have 8 digits, got {0}")]
    WrongLength(usize),

    /// The registry answered and the CEP does not exist
    #[error("CEP not found in the postal registry")]
    NotFound,

    /// Transport, timeout or parse failure
    #[error("Postal registry unavailable: {0}")]
    ServiceUnavailable(String),
}

impl CepError {
    /// Only unavailability is worth retrying later
    pub fn is_retryable(&self) -> bool {
        matches!(self, CepError::ServiceUnavailable(_))
    }
}

/// Reduce input to digits: `"01001-000"` -> `"01001000"`
pub fn clean_cep(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Resolves CEPs against a single registry with a bounded wait
#[derive(Clone)]
pub struct CepResolver {
    registry: Arc<dyn PostalRegistry>,
    timeout: Duration,
}

impl CepResolver {
    pub fn new(registry: Arc<dyn PostalRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn from_config(config: &CepConfig, client: &Client) -> Self {
        Self::new(
            Arc::new(HttpPostalRegistry::new(
                config.url_template.clone(),
                client.clone(),
            )),
            config.timeout,
        )
    }

    pub async fn resolve(&self, input: &str) -> Result<Address, CepError> {
        let cep = clean_cep(input);
        if cep.len() != CEP_LEN {
            return Err(CepError::WrongLength(cep.len()));
        }

        debug!(cep = %cep, "Looking up CEP");
        let result = match tokio::time::timeout(self.timeout, self.registry.lookup(&cep)).await {
            Ok(result) => result,
            Err(_) => Err(CepError::ServiceUnavailable(format!(
                "no answer within {:?}",
                self.timeout
            ))),
        };

        match &result {
            Ok(address) => debug!(cep = %cep, city = %address.city, "CEP resolved"),
            Err(CepError::NotFound) => debug!(cep = %cep, "CEP not found"),
            Err(e) => warn!(cep = %cep, "CEP lookup failed: {}", e),
        }
        result
    }
}

/// CEP check result as embedded in a verification record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CepCheck {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CepError>,
}

impl From<Result<Address, CepError>> for CepCheck {
    fn from(result: Result<Address, CepError>) -> Self {
        match result {
            Ok(address) => Self {
                valid: true,
                address: Some(address),
                error: None,
            },
            Err(error) => Self {
                valid: false,
                address: None,
                error: Some(error),
            },
        }
    }
}
