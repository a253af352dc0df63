//! Verification records and their lifecycle
//!
//! - `aggregate` - status at creation time and operator transitions
//! - `verifier` - runs the three checks for a submitted form
//! - `store` - in-memory record set persisted through a background writer

pub mod aggregate;
pub mod store;
pub mod verifier;

pub use aggregate::{fill_address, initial_status, new_record_id};
pub use store::{
    PersistOperation, PersistenceWarning, RecordFilter, StoreStats, VerificationStore, KEY_PREFIX,
    PROBE_KEY,
};
pub use verifier::Verifier;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::cep::CepCheck;
use crate::cpf::CpfVerdict;
use crate::ocr::InstitutionCheck;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Pending,
    /// Manual workflow only; never set automatically
    InReview,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub const ALL: [VerificationStatus; 4] = [
        Self::Pending,
        Self::InReview,
        Self::Approved,
        Self::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InReview => "in_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for VerificationStatus {
    type Err = String;

    /// Accepts the Portuguese labels used by older exports as well
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "pending" | "pendente" => Ok(Self::Pending),
            "in_review" | "em_analise" => Ok(Self::InReview),
            "approved" | "aprovado" => Ok(Self::Approved),
            "rejected" | "reprovado" => Ok(Self::Rejected),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// What the applicant typed into the form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormData {
    #[serde(alias = "nome")]
    pub name: String,
    pub cpf: String,
    pub email: String,
    #[serde(alias = "telefone")]
    pub phone: String,
    #[serde(alias = "instituicao")]
    pub institution: String,
    #[serde(alias = "curso")]
    pub course: String,
    pub cep: String,
    #[serde(alias = "endereco")]
    pub address: String,
}

/// The unit of persistence. Check results are owned values, never shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub status: VerificationStatus,
    pub form: FormData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_check: Option<InstitutionCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cep_check: Option<CepCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf_check: Option<CpfVerdict>,
}

impl VerificationRecord {
    /// Build a record, filling in the address from the CEP and computing
    /// the initial status from whichever checks ran.
    pub fn new(
        mut form: FormData,
        institution_check: Option<InstitutionCheck>,
        cep_check: Option<CepCheck>,
        cpf_check: Option<CpfVerdict>,
    ) -> Self {
        fill_address(&mut form, cep_check.as_ref());
        let status = initial_status(
            institution_check.as_ref().map(|c| c.matched),
            cep_check.as_ref().map(|c| c.valid),
            cpf_check.as_ref().map(|c| c.valid),
        );
        Self {
            id: new_record_id(),
            created_at: Utc::now(),
            status,
            form,
            institution_check,
            cep_check,
            cpf_check,
        }
    }

    /// Key under which the record is persisted
    pub fn storage_key(&self) -> String {
        store::record_key(&self.id)
    }

    pub fn checks_complete(&self) -> bool {
        self.institution_check.is_some() && self.cep_check.is_some() && self.cpf_check.is_some()
    }
}
