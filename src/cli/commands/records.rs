//! Record management commands

use anyhow::{anyhow, bail, Context, Result};
use serde_json::json;

use super::{finish, render_record, render_record_line, CommandContext};
use crate::verification::{RecordFilter, VerificationStatus};

pub async fn run_list_command(
    ctx: &CommandContext,
    status: Option<VerificationStatus>,
    search: Option<String>,
) -> Result<()> {
    let store = ctx.open_store().await?;
    let records = store.list(&RecordFilter { status, search }).await;
    finish(&store).await;

    ctx.emit(&records, || {
        if records.is_empty() {
            return "No verifications found\n".to_string();
        }
        records.iter().map(render_record_line).collect()
    })
}

pub async fn run_show_command(ctx: &CommandContext, id: String) -> Result<()> {
    let store = ctx.open_store().await?;
    let record = store.get(&id).await;
    finish(&store).await;
    let record = record.ok_or_else(|| anyhow!("Verification {} not found", id))?;
    ctx.emit(&record, || render_record(&record))
}

/// Backs `approve`, `reject` and `set-status`
pub async fn run_set_status_command(
    ctx: &CommandContext,
    id: String,
    status: VerificationStatus,
) -> Result<()> {
    let store = ctx.open_store().await?;
    let record = store.set_status(&id, status).await?;
    finish(&store).await;
    ctx.emit(&record, || format!("{} is now {}\n", record.id, record.status))
}

pub async fn run_delete_command(ctx: &CommandContext, id: String) -> Result<()> {
    let store = ctx.open_store().await?;
    store.delete(&id).await?;
    finish(&store).await;
    ctx.emit(&json!({ "deleted": id }), || format!("Deleted {id}\n"))
}

pub async fn run_clear_command(ctx: &CommandContext, yes: bool) -> Result<()> {
    if !yes {
        bail!("Refusing to delete every verification without --yes");
    }
    let store = ctx.open_store().await?;
    let removed = store.clear_all().await;
    finish(&store).await;
    ctx.emit(&json!({ "deleted": removed }), || {
        format!("Deleted {removed} verifications\n")
    })
}

pub async fn run_stats_command(ctx: &CommandContext) -> Result<()> {
    let store = ctx.open_store().await?;
    let stats = store.stats().await;
    finish(&store).await;
    ctx.emit(&stats, || {
        format!(
            "Total:      {}\nPending:    {}\nIn review:  {}\nApproved:   {}\nRejected:   {}\n",
            stats.total, stats.pending, stats.in_review, stats.approved, stats.rejected
        )
    })
}

pub async fn run_check_storage_command(ctx: &CommandContext) -> Result<()> {
    let store = ctx.open_store().await?;
    let connection = store.check_connection().await;
    finish(&store).await;
    let elapsed = connection.with_context(|| {
        format!("Storage backend '{}' failed the probe", store.backend_type())
    })?;
    let backend = store.backend_type();
    ctx.emit(
        &json!({ "backend": backend, "ok": true, "elapsed_ms": elapsed.as_millis() as u64 }),
        || format!("Storage OK ({backend}, {} ms)\n", elapsed.as_millis()),
    )
}
