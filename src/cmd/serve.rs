use std::net::TcpListener;

use crate::cmd::async_runtime;
use crate::config::{self, app_env};
use crate::context::AppContext;
use crate::startup;

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Overrides `DATAROMA_SCREENER_APPLICATION__PORT` for this invocation.
    #[arg(long, env = "DATAROMA_SCREENER_PORT")]
    port: Option<u16>,
}

/// Runs the screener HTTP service until it receives a shutdown signal.
pub fn run(args: Args) -> anyhow::Result<()> {
    if let Some(port) = args.port {
        std::env::set_var("DATAROMA_SCREENER_APPLICATION__PORT", port.to_string());
    }

    tracing::info!(env = app_env().as_str(), "starting dataroma-screener");

    let settings = config::settings();
    let listener = TcpListener::bind(settings.application.address())?;
    let ctx = AppContext::new(
        settings.storage.clone(),
        settings.provider.default_provider.clone(),
        settings.provider.eodhd_api_token.clone(),
    );

    let runtime = async_runtime()?;
    runtime.block_on(startup::run(listener, ctx))
}
