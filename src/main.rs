use clap::Parser;
use hunter::cli::{commands, Cli, Commands, WalletArgs};
use hunter::config::Settings;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut settings = match Settings::load(&cli.config) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("failed to load config: {err}");
            std::process::exit(1);
        }
    };
    settings.dry_run = settings.dry_run || cli.dry_run;
    settings.init_logging();

    let result = match cli.command {
        Commands::Run => commands::run(settings).await,
        Commands::Check => commands::check(settings).await,
        Commands::Stats(args) => commands::stats(settings, args).await,
        Commands::Wallet(WalletArgs { command }) => commands::wallet(settings, command).await,
    };

    if let Err(err) = result {
        error!(error = %err, "fatal error");
        std::process::exit(1);
    }
}
