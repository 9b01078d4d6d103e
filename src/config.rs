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

//! Command-line and environment configuration.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Inventory API - clients, articles, placements and purchases over HTTP
///
/// Every flag can also be set through its environment variable.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "inventory-demo-rs")]
#[command(about = "An inventory and sales tracking REST API", long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "INVENTORY_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// CSV file of articles to load at startup
    ///
    /// Expected columns: barcode,description,manufacturer
    #[arg(long, env = "INVENTORY_SEED_ARTICLES", value_name = "FILE")]
    pub seed_articles: Option<PathBuf>,

    /// Log filter directive, e.g. `info` or `inventory_demo_rs=debug`
    ///
    /// `RUST_LOG` takes precedence when set.
    #[arg(long, env = "INVENTORY_LOG", default_value = "info")]
    pub log_filter: String,
}
