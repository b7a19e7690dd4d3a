// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use anyhow::Result;
use clap::{Parser, Subcommand};
use qualia::config::AppConfig;
use qualia::http::{build_router, AppState};
use qualia::store;
use std::net::SocketAddr;
use tracing::{info, warn};

#[derive(Parser, Debug, Clone)]
#[command(name = "qualia-server", about = "REST service for the qualia survey")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Run the HTTP server (the default).
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.cmd.unwrap_or(Command::Serve) {
        Command::Serve => run_server().await,
    }
}

async fn run_server() -> Result<()> {
    let config = AppConfig::load()?;
    let store = store::open(&config.database);
    let app = build_router(AppState::new(store));

    let addr: SocketAddr = config.listen.parse()?;
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            warn!(error = %e, %addr, "bind failed, falling back to an ephemeral port");
            tokio::net::TcpListener::bind("127.0.0.1:0").await?
        }
    };
    info!(address = %listener.local_addr()?, "survey api listening");

    tokio::select! {
        _ = axum::serve(listener, app) => {},
        _ = tokio::signal::ctrl_c() => {},
    }
    info!("qualia-server shutting down");
    Ok(())
}
