//! Command implementations and the output helpers they share

pub mod check;
pub mod records;
pub mod serve;

pub use check::{run_cep_command, run_cpf_command, run_match_command, run_verify_command};
pub use records::{
    run_check_storage_command, run_clear_command, run_delete_command, run_list_command,
    run_set_status_command, run_show_command, run_stats_command,
};
pub use serve::run_serve_command;

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;

use crate::config::CheckConfig;
use crate::cpf::{CpfVerdict, VerdictBasis};
use crate::storage::StorageFactory;
use crate::verification::{VerificationRecord, VerificationStore};

/// What every command gets from the router
pub struct CommandContext {
    pub config: CheckConfig,
    pub json: bool,
}

impl CommandContext {
    /// Open the configured backend and load the persisted records
    pub async fn open_store(&self) -> Result<VerificationStore> {
        let kv = StorageFactory::from_config(&self.config.storage)
            .await
            .context("Failed to open storage backend")?;
        let store = VerificationStore::new(kv);
        store.load().await;
        Ok(store)
    }

    pub fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            print!("{}", text());
        }
        Ok(())
    }
}

/// Wait for queued writes and report any persistence warnings on stderr
pub async fn finish(store: &VerificationStore) {
    store.flush().await;
    for warning in store.take_warnings().await {
        eprintln!("warning: {warning}");
    }
}

pub fn render_verdict(verdict: &CpfVerdict) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "CPF:        {}", verdict.cpf);
    let _ = writeln!(out, "Valid:      {}", if verdict.valid { "yes" } else { "no" });
    let _ = writeln!(out, "Situation:  {}", verdict.situation);
    if let Some(name) = &verdict.name {
        let _ = writeln!(out, "Name:       {name}");
    }
    let _ = writeln!(out, "Region:     {}", verdict.region);
    let basis = match &verdict.basis {
        VerdictBasis::Checksum => "check digits".to_string(),
        VerdictBasis::Registry { source } => format!("registry ({source})"),
        VerdictBasis::LocalFallback => "check digits only (registries unavailable)".to_string(),
    };
    let _ = writeln!(out, "Basis:      {basis}");
    let _ = writeln!(out, "Consulted:  {}", verdict.consulted_at.to_rfc3339());
    let _ = writeln!(out, "{}", verdict.message);
    if !verdict.trace.is_empty() {
        let _ = writeln!(out, "\nTrace:");
        for entry in &verdict.trace {
            let _ = writeln!(out, "  {entry}");
        }
    }
    out
}

/// One line per record for listings
pub fn render_record_line(record: &VerificationRecord) -> String {
    format!(
        "{:<16} {:<10} {:<10} {:<28} {}\n",
        record.id,
        record.status,
        record.created_at.format("%Y-%m-%d"),
        truncate(&record.form.name, 28),
        record.form.institution
    )
}

pub fn render_record(record: &VerificationRecord) -> String {
    let mut out = String::new();
    let form = &record.form;
    let _ = writeln!(out, "{} [{}]", record.id, record.status);
    let _ = writeln!(out, "Created:      {}", record.created_at.to_rfc3339());
    let _ = writeln!(out, "Name:         {}", form.name);
    let _ = writeln!(out, "CPF:          {}", form.cpf);
    let _ = writeln!(out, "Email:        {}", form.email);
    let _ = writeln!(out, "Phone:        {}", form.phone);
    let _ = writeln!(out, "Institution:  {}", form.institution);
    let _ = writeln!(out, "Course:       {}", form.course);
    let _ = writeln!(out, "CEP:          {}", form.cep);
    let _ = writeln!(out, "Address:      {}", form.address);

    let _ = writeln!(out, "\nChecks:");
    match &record.cpf_check {
        Some(cpf) => {
            let _ = writeln!(out, "  CPF          {} ({})", pass(cpf.valid), cpf.situation);
        }
        None => {
            let _ = writeln!(out, "  CPF          not run");
        }
    }
    match &record.cep_check {
        Some(check) => {
            let detail = match (&check.address, &check.error) {
                (Some(address), _) => address.one_line(),
                (None, Some(error)) => error.to_string(),
                (None, None) => String::new(),
            };
            let _ = writeln!(out, "  CEP          {} ({})", pass(check.valid), detail);
        }
        None => {
            let _ = writeln!(out, "  CEP          not run");
        }
    }
    match &record.institution_check {
        Some(check) => {
            let detail = match (&check.error_detail, &check.found) {
                (Some(error), _) => format!("OCR error: {error}"),
                (None, Some(found)) => format!("found {found}, confidence {:.0}", check.confidence),
                (None, None) => "nothing found".to_string(),
            };
            let _ = writeln!(out, "  Institution  {} ({})", pass(check.matched), detail);
        }
        None => {
            let _ = writeln!(out, "  Institution  not run");
        }
    }
    out
}

fn pass(ok: bool) -> &'static str {
    if ok {
        "PASS"
    } else {
        "FAIL"
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(max.saturating_sub(1)).collect();
        short.push('…');
        short
    }
}
