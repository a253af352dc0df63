//! CPF validation and registry resolution
//!
//! - `checksum` - pure check-digit validation, formatting and fiscal region
//! - `source` - remote lookup sources and their typed soft-failure outcomes
//! - `resolver` - ordered fallback across sources with a local floor
//! - `trace` - audit trail produced during resolution

pub mod checksum;
pub mod resolver;
pub mod source;
pub mod trace;

pub use checksum::{clean_cpf, format_cpf, is_valid_cpf, mask_cpf, FiscalRegion, CPF_LEN};
pub use resolver::{
    CpfResolver, CpfVerdict, VerdictBasis, SITUATION_INVALID, SITUATION_REGULAR,
    SITUATION_UNVERIFIED,
};
pub use source::{AttemptOutcome, CpfSource, HttpCpfSource, RegistryRecord};
pub use trace::{ResolutionTrace, TraceEntry, TraceLevel};
