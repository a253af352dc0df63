//! CLI argument structures

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::verification::{FormData, VerificationStatus};

/// Cross-check enrollment claims: CPF, CEP and institution proof
#[derive(Parser, Debug)]
#[command(name = "checadoc")]
#[command(about = "checadoc - verify CPF, CEP and institution documents", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a CPF and consult the registry sources
    Cpf {
        /// CPF, with or without punctuation
        cpf: String,
    },

    /// Resolve a CEP to an address
    Cep {
        /// CEP, with or without punctuation
        cep: String,
    },

    /// Match a declared institution against extracted document text
    #[command(name = "match")]
    Match {
        /// Institution name as declared on the form
        #[arg(long)]
        declared: String,

        /// File containing the extracted text
        #[arg(long)]
        text: PathBuf,
    },

    /// Run all checks for a form and store the resulting record
    Verify {
        #[command(flatten)]
        form: FormArgs,

        /// Proof-of-enrollment document (text, image or PDF)
        #[arg(long)]
        document: Option<PathBuf>,
    },

    /// List stored verifications, newest first
    List {
        /// Only records with this status
        #[arg(long)]
        status: Option<VerificationStatus>,

        /// Case-insensitive search over name, CPF, institution and id
        #[arg(long)]
        search: Option<String>,
    },

    /// Show one verification
    Show { id: String },

    /// Approve a verification regardless of its checks
    Approve { id: String },

    /// Reject a verification regardless of its checks
    Reject { id: String },

    /// Set any status, including in_review
    #[command(name = "set-status")]
    SetStatus {
        id: String,
        /// pending, in_review, approved or rejected
        status: VerificationStatus,
    },

    /// Delete one verification
    Delete { id: String },

    /// Delete every stored verification
    Clear {
        /// Confirm the bulk delete
        #[arg(long)]
        yes: bool,
    },

    /// Count verifications per status
    Stats,

    /// Probe the configured storage backend
    #[command(name = "check-storage")]
    CheckStorage,

    /// Run the CPF registry proxy
    Serve {
        /// Address to bind (overrides proxy.bind)
        #[arg(long)]
        bind: Option<String>,
    },
}

/// Form fields accepted by `verify`
#[derive(Args, Debug, Clone, Default)]
pub struct FormArgs {
    #[arg(long, default_value = "")]
    pub name: String,

    #[arg(long, default_value = "")]
    pub cpf: String,

    #[arg(long, default_value = "")]
    pub email: String,

    #[arg(long, default_value = "")]
    pub phone: String,

    #[arg(long, default_value = "")]
    pub institution: String,

    #[arg(long, default_value = "")]
    pub course: String,

    #[arg(long, default_value = "")]
    pub cep: String,

    /// Left empty to fill it from the CEP
    #[arg(long, default_value = "")]
    pub address: String,
}

impl From<FormArgs> for FormData {
    fn from(args: FormArgs) -> Self {
        Self {
            name: args.name,
            cpf: args.cpf,
            email: args.email,
            phone: args.phone,
            institution: args.institution,
            course: args.course,
            cep: args.cep,
            address: args.address,
        }
    }
}
