//! Cascading CPF resolution
//!
//! Checksum first, then each configured source strictly in order. The first
//! source to report a usable situation decides the verdict. When every source
//! fails the verdict degrades to the checksum result, which already passed,
//! so a well-formed CPF is never rejected because the registries are down.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::config::CpfConfig;

use super::checksum::{clean_cpf, format_cpf, is_valid_cpf, mask_cpf, FiscalRegion};
use super::source::{AttemptOutcome, CpfSource, HttpCpfSource, RegistryRecord};
use super::trace::{ResolutionTrace, TraceEntry};

/// Situation reported when the check digits do not add up
pub const SITUATION_INVALID: &str = "Invalid";

/// Situation reported when no registry could be reached
pub const SITUATION_UNVERIFIED: &str = "Valid (unverified online)";

/// Registry value meaning the taxpayer is in good standing
pub const SITUATION_REGULAR: &str = "Regular";

/// What the verdict was ultimately based on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerdictBasis {
    /// Rejected by the check-digit algorithm; no lookups were made
    Checksum,
    /// Decided by the named registry source
    Registry { source: String },
    /// Every source failed; the checksum result stands
    LocalFallback,
}

/// Final CPF decision plus the metadata an operator needs to review it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpfVerdict {
    pub valid: bool,
    pub cpf: String,
    pub situation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub message: String,
    pub region: FiscalRegion,
    pub basis: VerdictBasis,
    pub consulted_at: DateTime<Utc>,
    #[serde(default)]
    pub trace: Vec<TraceEntry>,
}

impl CpfVerdict {
    /// True when no registry confirmed the result
    pub fn is_degraded(&self) -> bool {
        self.basis == VerdictBasis::LocalFallback
    }
}

/// Resolves CPFs against an ordered list of sources
#[derive(Clone)]
pub struct CpfResolver {
    sources: Vec<Arc<dyn CpfSource>>,
}

impl CpfResolver {
    /// Sources are consulted in the order given
    pub fn new(sources: Vec<Arc<dyn CpfSource>>) -> Self {
        Self { sources }
    }

    /// Build HTTP sources from the enabled configuration entries, all sharing one client
    pub fn from_config(config: &CpfConfig, client: &Client) -> Self {
        let sources = config
            .sources
            .iter()
            .filter(|source| source.enabled)
            .map(|source| {
                Arc::new(HttpCpfSource::new(
                    source.name.clone(),
                    source.base_url.clone(),
                    source.timeout,
                    client.clone(),
                )) as Arc<dyn CpfSource>
            })
            .collect();
        Self::new(sources)
    }

    /// Resolve a CPF. Never fails: every failure mode is folded into the verdict.
    pub async fn resolve(&self, input: &str) -> CpfVerdict {
        let digits = clean_cpf(input);
        let cpf = format_cpf(&digits);
        let region = FiscalRegion::of(&digits);
        let consulted_at = Utc::now();
        let mut trace = ResolutionTrace::new();

        trace.info(format!("Resolving CPF {}", mask_cpf(&digits)));

        if !is_valid_cpf(&digits) {
            trace.error("Check digits are invalid; no registry lookup attempted");
            return CpfVerdict {
                valid: false,
                cpf,
                situation: SITUATION_INVALID.to_string(),
                name: None,
                message: "CPF check digits are invalid; it fails the Receita Federal checksum."
                    .to_string(),
                region,
                basis: VerdictBasis::Checksum,
                consulted_at,
                trace: trace.into_entries(),
            };
        }
        trace.ok(format!("Check digits valid (fiscal region: {region})"));

        for source in &self.sources {
            if let Some((name, record)) = attempt(source.as_ref(), &digits, &mut trace).await {
                return registry_verdict(cpf, region, consulted_at, name, record, trace);
            }
        }

        trace.warn(format!(
            "All {} registry source(s) failed; falling back to local validation",
            self.sources.len()
        ));
        CpfVerdict {
            valid: true,
            cpf,
            situation: SITUATION_UNVERIFIED.to_string(),
            name: None,
            message: format!(
                "CPF is algorithmically valid. Fiscal region: {region}. The online registry \
                 lookup is unavailable right now, so only the check digits were verified."
            ),
            region,
            basis: VerdictBasis::LocalFallback,
            consulted_at,
            trace: trace.into_entries(),
        }
    }
}

/// Run one source under its time budget. Returns the record only on a usable answer.
async fn attempt(
    source: &dyn CpfSource,
    digits: &str,
    trace: &mut ResolutionTrace,
) -> Option<(String, RegistryRecord)> {
    let name = source.name().to_string();
    let budget = source.timeout();
    trace.info(format!(
        "Querying {name} (timeout {:.0}s)",
        budget.as_secs_f64()
    ));

    let started = Instant::now();
    let outcome = match tokio::time::timeout(budget, source.lookup(digits)).await {
        Ok(outcome) => outcome,
        Err(_) => AttemptOutcome::Timeout(budget),
    };
    let elapsed_ms = started.elapsed().as_millis() as u64;
    debug!(source = %name, elapsed_ms, ?outcome, "CPF lookup attempt finished");

    match outcome {
        AttemptOutcome::Found { status, record } => {
            trace.ok(format!(
                "{name} answered HTTP {status} in {elapsed_ms} ms: situation \"{}\"",
                record.situation
            ));
            Some((name, record))
        }
        AttemptOutcome::HttpStatus { status, message } => {
            trace.warn(format!(
                "{name} returned HTTP {status} after {elapsed_ms} ms: {}",
                message.as_deref().unwrap_or("no detail")
            ));
            None
        }
        AttemptOutcome::Unrecognized { status, detail } => {
            trace.warn(format!(
                "{name} answered HTTP {status} in {elapsed_ms} ms without a usable situation: {detail}"
            ));
            None
        }
        AttemptOutcome::Timeout(limit) => {
            trace.error(format!(
                "{name} timed out after {:.0}s",
                limit.as_secs_f64()
            ));
            None
        }
        AttemptOutcome::Transport(reason) => {
            trace.error(format!(
                "{name} request failed after {elapsed_ms} ms: {reason}"
            ));
            None
        }
    }
}

fn registry_verdict(
    cpf: String,
    region: FiscalRegion,
    consulted_at: DateTime<Utc>,
    source: String,
    record: RegistryRecord,
    trace: ResolutionTrace,
) -> CpfVerdict {
    let valid = record.situation.eq_ignore_ascii_case(SITUATION_REGULAR);
    let message = if valid {
        format!(
            "CPF confirmed by {source}. Taxpayer: {}",
            record.name.as_deref().unwrap_or("N/A")
        )
    } else {
        format!(
            "CPF has situation \"{}\" according to {source}.",
            record.situation
        )
    };

    CpfVerdict {
        valid,
        cpf,
        situation: record.situation,
        name: record.name,
        message,
        region,
        basis: VerdictBasis::Registry { source },
        consulted_at,
        trace: trace.into_entries(),
    }
}
