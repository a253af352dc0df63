//! Status aggregation
//!
//! `pending` is the only initial state unless all three checks already ran,
//! in which case the record starts `approved` when every check passed and
//! `rejected` otherwise. Operators may then force any status; nothing here
//! recomputes a status after creation.

use uuid::Uuid;

use super::{FormData, VerificationStatus};
use crate::cep::CepCheck;

/// Length of the random part of a record id
const ID_SUFFIX_LEN: usize = 12;

/// Status of a freshly created record.
///
/// Each argument is `None` when that check did not run, otherwise whether
/// it passed.
pub fn initial_status(
    institution_matched: Option<bool>,
    cep_valid: Option<bool>,
    cpf_valid: Option<bool>,
) -> VerificationStatus {
    match (institution_matched, cep_valid, cpf_valid) {
        (Some(institution), Some(cep), Some(cpf)) => {
            if institution && cep && cpf {
                VerificationStatus::Approved
            } else {
                VerificationStatus::Rejected
            }
        }
        _ => VerificationStatus::Pending,
    }
}

/// Fill an empty address from a successful CEP lookup
pub fn fill_address(form: &mut FormData, cep_check: Option<&CepCheck>) {
    if !form.address.trim().is_empty() {
        return;
    }
    if let Some(address) = cep_check
        .filter(|check| check.valid)
        .and_then(|check| check.address.as_ref())
    {
        form.address = address.one_line();
    }
}

/// `VER-` followed by 12 upper-case hex digits
pub fn new_record_id() -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(ID_SUFFIX_LEN)
        .collect();
    format!("VER-{}", suffix.to_uppercase())
}
