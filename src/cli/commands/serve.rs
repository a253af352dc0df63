//! `serve`: run the CPF registry proxy

use anyhow::Result;

use super::CommandContext;
use crate::proxy::ProxyServer;

pub async fn run_serve_command(ctx: &CommandContext, bind: Option<String>) -> Result<()> {
    let mut proxy = ctx.config.proxy.clone();
    if let Some(bind) = bind {
        proxy.bind = bind;
    }
    let client = ctx.config.http_client()?;
    ProxyServer::new(proxy, client).start().await?;
    Ok(())
}
