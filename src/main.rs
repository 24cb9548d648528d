use clap::Parser;
use dataroma_screener::cmd::{Cli, Command};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => dataroma_screener::cmd::serve::run(args),
    }
}
