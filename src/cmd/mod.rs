pub mod serve;

#[derive(clap::Parser, Debug)]
#[command(name = "dataroma-screener", about = "Dataroma screener pipeline service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Runs the HTTP service.
    Serve(serve::Args),
}

pub fn async_runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Runtime::new()?)
}
