use clap::Parser;
use formlogic_cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let default_filter = if cli.verbose {
        "formlogic_core=debug,formlogic_cli=debug"
    } else {
        "formlogic_core=info,formlogic_cli=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = formlogic_cli::run(cli).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
