//! Riskwatch CLI
//!
//! Logs in to a security appliance and aggregates risk event counts.

mod cli;
mod commands;
mod store;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use riskwatch_client::{ClientConfig, HttpTransport};

use crate::cli::{Cli, Command};
use crate::store::{default_store_path, FileSessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = ClientConfig::from_env()?;
    let transport = HttpTransport::new(config)?;

    let store_path = match cli.store {
        Some(path) => path,
        None => default_store_path().context("no config directory; pass --store")?,
    };
    let store = Arc::new(FileSessionStore::new(store_path));

    match cli.command {
        Command::Login {
            base_url,
            username,
            password,
            login_type,
            captcha_out,
        } => {
            commands::login(
                transport,
                store,
                &base_url,
                &username,
                password,
                login_type,
                &captcha_out,
            )
            .await
        }
        Command::Query { start, end } => commands::query(transport, store, start, end).await,
        Command::Token => commands::token(store).await,
    }
}
