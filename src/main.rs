use clap::Parser;
use guarddial::cli::{load_policy, Cli, Commands};
use guarddial::output;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "guarddial=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let policy = load_policy(cli.policy.as_deref())?;

    let ok = match &cli.command {
        Commands::Check(cmd) => cmd.execute(&policy, cli.output).await?,
        Commands::Connect(cmd) => cmd.execute(&policy, cli.output).await?,
        Commands::Policy(cmd) => {
            cmd.execute(&policy)?;
            true
        }
    };

    Ok(ok)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::from(2)
        }
    }
}
