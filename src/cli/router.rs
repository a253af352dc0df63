//! Command routing and execution
//!
//! This module handles routing CLI commands to their respective implementations.

use anyhow::Result;

use crate::cli::args::Commands;
use crate::cli::commands::*;
use crate::verification::VerificationStatus;

/// Execute a CLI command based on the parsed arguments
pub async fn execute_command(command: Commands, ctx: &CommandContext) -> Result<()> {
    match command {
        Commands::Cpf { cpf } => run_cpf_command(ctx, cpf).await,
        Commands::Cep { cep } => run_cep_command(ctx, cep).await,
        Commands::Match { declared, text } => run_match_command(ctx, declared, text).await,
        Commands::Verify { form, document } => run_verify_command(ctx, form, document).await,
        Commands::List { status, search } => run_list_command(ctx, status, search).await,
        Commands::Show { id } => run_show_command(ctx, id).await,
        Commands::Approve { id } => {
            run_set_status_command(ctx, id, VerificationStatus::Approved).await
        }
        Commands::Reject { id } => {
            run_set_status_command(ctx, id, VerificationStatus::Rejected).await
        }
        Commands::SetStatus { id, status } => run_set_status_command(ctx, id, status).await,
        Commands::Delete { id } => run_delete_command(ctx, id).await,
        Commands::Clear { yes } => run_clear_command(ctx, yes).await,
        Commands::Stats => run_stats_command(ctx).await,
        Commands::CheckStorage => run_check_storage_command(ctx).await,
        Commands::Serve { bind } => run_serve_command(ctx, bind).await,
    }
}
