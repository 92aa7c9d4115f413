// fallwatch CLI - watch realtime fall-detection alerts from a terminal

use anyhow::Result;
use clap::Parser;
use fallwatch_cli::{watch, Cli};
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fallwatch_core=info".parse()?)
                .add_directive("fallwatch_cli=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = cli.into_options()?;

    if let Err(e) = watch(options).await {
        error!("{}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    Ok(())
}
