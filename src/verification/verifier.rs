//! Runs the checks for one submitted form
//!
//! The CPF, CEP and institution checks are independent, so they run
//! concurrently. A check whose input is missing is skipped, which leaves the
//! record pending.

use std::sync::Arc;
use tracing::info;

use super::{FormData, VerificationRecord};
use crate::cep::{CepCheck, CepResolver};
use crate::config::CheckConfig;
use crate::cpf::CpfResolver;
use crate::error::Result;
use crate::ocr::{check_document, Document, OcrEngine, PageRasterizer, PlainTextOcr};

#[derive(Clone)]
pub struct Verifier {
    cpf: CpfResolver,
    cep: CepResolver,
    ocr: Arc<dyn OcrEngine>,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
}

impl Verifier {
    pub fn new(cpf: CpfResolver, cep: CepResolver, ocr: Arc<dyn OcrEngine>) -> Self {
        Self {
            cpf,
            cep,
            ocr,
            rasterizer: None,
        }
    }

    /// Needed before PDF documents can be checked
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    /// HTTP resolvers sharing one client, with the plain-text OCR engine
    pub fn from_config(config: &CheckConfig) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self::new(
            CpfResolver::from_config(&config.cpf, &client),
            CepResolver::from_config(&config.cep, &client),
            Arc::new(PlainTextOcr),
        ))
    }

    /// Run every check the form allows and build the record
    pub async fn verify(&self, form: FormData, document: Option<&Document>) -> VerificationRecord {
        let cpf_check = async {
            if form.cpf.trim().is_empty() {
                None
            } else {
                Some(self.cpf.resolve(&form.cpf).await)
            }
        };
        let cep_check = async {
            if form.cep.trim().is_empty() {
                None
            } else {
                Some(CepCheck::from(self.cep.resolve(&form.cep).await))
            }
        };
        let institution_check = async {
            match document {
                Some(document) => Some(
                    check_document(
                        self.ocr.as_ref(),
                        self.rasterizer.as_deref(),
                        document,
                        &form.institution,
                    )
                    .await,
                ),
                None => None,
            }
        };

        let (institution_check, cep_check, cpf_check) =
            tokio::join!(institution_check, cep_check, cpf_check);

        let record = VerificationRecord::new(form, institution_check, cep_check, cpf_check);
        info!(id = %record.id, status = %record.status, "Verification created");
        record
    }
}
