use chrono::Duration;
use clap::{Parser, Subcommand};
use serde_json::json;

use crate::app::{build_state, serve};
use crate::config::{AppConfig, StoreBackend};
use crate::store::DatabaseManager;

#[derive(Parser)]
#[command(name = "postcraft-api")]
#[command(about = "Postcraft API server and operator commands")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Report command results as JSON")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Apply pending SQL migrations")]
    Migrate,

    #[command(about = "Delete pending signups older than the given age")]
    PrunePending {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        older_than_minutes: u32,
    },
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(build_state(config).await?).await,
        Commands::Migrate => {
            if config.store != StoreBackend::Postgres {
                anyhow::bail!("migrate requires STORE_BACKEND=postgres");
            }
            let pool = DatabaseManager::connect(&config.database).await?;
            DatabaseManager::migrate(&pool).await?;
            report(cli.json, "migrations applied", json!({ "status": "migrated" }));
            Ok(())
        }
        Commands::PrunePending { older_than_minutes } => {
            let state = build_state(config).await?;
            let removed = state
                .signup()
                .prune_pending(Duration::minutes(i64::from(older_than_minutes)))
                .await?;
            report(
                cli.json,
                &format!("removed {} pending signup(s)", removed),
                json!({ "status": "pruned", "removed": removed }),
            );
            Ok(())
        }
    }
}

fn report(as_json: bool, text: &str, value: serde_json::Value) {
    if as_json {
        println!("{}", value);
    } else {
        println!("{}", text);
    }
}
