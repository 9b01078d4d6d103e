// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use clap::Parser;
use inventory_demo_rs::server::{self, AppState};
use inventory_demo_rs::{Config, Store, seed};
use std::fs::File;
use std::io::BufReader;
use std::process;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() {
    let config = Config::parse();
    init_tracing(&config.log_filter);

    let store = Store::new();

    if let Some(path) = &config.seed_articles {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                error!("error opening seed file '{}': {}", path.display(), e);
                process::exit(1);
            }
        };
        if let Err(e) = seed::import_articles(&store, BufReader::new(file)) {
            error!("error reading seed file '{}': {}", path.display(), e);
            process::exit(1);
        }
    }

    let listener = match TcpListener::bind(config.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("error binding {}: {}", config.bind, e);
            process::exit(1);
        }
    };
    info!(address = %config.bind, "inventory API listening");

    if let Err(e) = server::serve(listener, AppState::new(store), shutdown_signal()).await {
        error!("server error: {e}");
        process::exit(1);
    }
}
