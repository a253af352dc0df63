//! # checadoc
//!
//! Cross-checks the claims on a student enrollment form: the CPF against
//! its check digits and the federal registry, the CEP against the postal
//! registry, and the declared institution against the text of an uploaded
//! proof-of-enrollment document. Each run produces a verification record
//! that an operator can approve or reject later.
//!
//! ## Modules
//!
//! - `cpf` - check digits, fiscal region and the cascading registry resolver
//! - `cep` - postal code lookup
//! - `institution` - fuzzy matching of institution names against document text
//! - `ocr` - text extraction boundary for uploaded documents
//! - `verification` - record aggregation and the persisted record store
//! - `storage` - key-value backends (file, memory)
//! - `proxy` - HTTP proxy in front of the CPF registries
//! - `config` - TOML configuration with environment overrides
//! - `cli` - command-line interface

pub mod cep;
pub mod cli;
pub mod config;
pub mod cpf;
pub mod error;
pub mod institution;
pub mod ocr;
pub mod proxy;
pub mod storage;
pub mod verification;

pub use error::{Error, Result};
