//! `cpf`, `cep`, `match` and `verify`

use anyhow::{Context, Result};
use std::path::PathBuf;

use super::{finish, render_record, render_verdict, CommandContext};
use crate::cep::{CepCheck, CepResolver};
use crate::cli::args::FormArgs;
use crate::cpf::CpfResolver;
use crate::institution::match_institution;
use crate::ocr::Document;
use crate::verification::Verifier;

pub async fn run_cpf_command(ctx: &CommandContext, cpf: String) -> Result<()> {
    let client = ctx.config.http_client()?;
    let resolver = CpfResolver::from_config(&ctx.config.cpf, &client);
    let verdict = resolver.resolve(&cpf).await;
    ctx.emit(&verdict, || render_verdict(&verdict))
}

pub async fn run_cep_command(ctx: &CommandContext, cep: String) -> Result<()> {
    let client = ctx.config.http_client()?;
    let resolver = CepResolver::from_config(&ctx.config.cep, &client);
    let check = CepCheck::from(resolver.resolve(&cep).await);
    ctx.emit(&check, || match (&check.address, &check.error) {
        (Some(address), _) => format!("{}\n{}\n", address.cep, address.one_line()),
        (None, Some(error)) => format!("{error}\n"),
        (None, None) => String::new(),
    })
}

pub async fn run_match_command(ctx: &CommandContext, declared: String, text: PathBuf) -> Result<()> {
    let content = tokio::fs::read_to_string(&text)
        .await
        .with_context(|| format!("Failed to read {}", text.display()))?;
    let result = match_institution(&content, &declared);
    ctx.emit(&result, || {
        format!(
            "Matched:  {}\nFound:    {}\nRule:     {:?}\n",
            if result.matched { "yes" } else { "no" },
            result.found.as_deref().unwrap_or("-"),
            result.rule
        )
    })
}

pub async fn run_verify_command(
    ctx: &CommandContext,
    form: FormArgs,
    document: Option<PathBuf>,
) -> Result<()> {
    let document = document
        .map(|path| {
            Document::from_path(&path).with_context(|| format!("Failed to read {}", path.display()))
        })
        .transpose()?;

    let verifier = Verifier::from_config(&ctx.config)?;
    let record = verifier.verify(form.into(), document.as_ref()).await;

    let store = ctx.open_store().await?;
    let record = store.create(record).await;
    finish(&store).await;

    ctx.emit(&record, || render_record(&record))
}
