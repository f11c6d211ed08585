//! One function per subcommand; `main` just dispatches into these.

use super::{StatsArgs, WalletCommands};
use crate::app::App;
use crate::config::Settings;
use crate::error::Result;
use crate::exchange::polymarket::PolymarketClient;
use crate::exchange::Client;
use crate::sink::sqlite::{create_pool, SqliteSink};
use tracing::info;

pub async fn run(settings: Settings) -> Result<()> {
    let app = App::new(settings);
    let (tx, rx) = tokio::sync::watch::channel(false);
    tokio::select! {
        result = app.run(rx) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            let _ = tx.send(true);
            Ok(())
        }
    }
}

/// Validates config and exchange connectivity without starting the pipeline.
pub async fn check(settings: Settings) -> Result<()> {
    let exchange = PolymarketClient::new(
        settings.network.clob_url.clone(),
        settings.network.gamma_url.clone(),
        settings.wallet.address.clone().unwrap_or_default(),
    );
    let address = exchange.wallet_address().await?;
    println!("network:     {}", settings.network.ws_url);
    println!("wallet:      {address}");
    println!("dry_run:     {}", settings.dry_run);
    println!("strategies:  {}", settings.strategies.strategies.len());
    Ok(())
}

pub async fn stats(settings: Settings, args: StatsArgs) -> Result<()> {
    let pool = create_pool(&settings.database)?;
    let sink = SqliteSink::new(pool);
    sink.run_migrations()?;
    let cutoff = chrono::Utc::now().timestamp() as f64 - (args.hours * 3600) as f64;
    let (count, matched) = sink.recent_activity(cutoff)?;
    println!("trades in last {}h: {count}", args.hours);
    println!("matched size:       {matched}");
    Ok(())
}

pub async fn wallet(settings: Settings, command: WalletCommands) -> Result<()> {
    let exchange = PolymarketClient::new(
        settings.network.clob_url.clone(),
        settings.network.gamma_url.clone(),
        settings.wallet.address.clone().unwrap_or_default(),
    );
    match command {
        WalletCommands::Address => println!("{}", exchange.wallet_address().await?),
        WalletCommands::Balance => println!("{}", exchange.wallet_balance().await?),
    }
    Ok(())
}
