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

//! # Inventory Demo
//!
//! This library provides an inventory and sales tracking service: users,
//! clients, articles, placements (an article priced at a location) and
//! purchases, exposed as a token-authenticated REST API.
//!
//! ## Core Components
//!
//! - [`Store`]: In-memory tables with validation, uniqueness and referential checks
//! - [`Purchase`]: Purchase records and the accumulation rule
//! - [`Validator`]: Field-level rules producing [`ValidationErrors`]
//! - [`Page`]: Fixed-size pagination with per-entity filters
//! - [`server::router`]: The axum HTTP surface
//! - [`InventoryError`]: Error types shared by the store and the API
//!
//! ## Example
//!
//! ```
//! use inventory_demo_rs::{NewArticle, Store};
//!
//! let store = Store::new();
//!
//! let article = NewArticle {
//!     barcode: Some("123".into()),
//!     description: Some("Android phone".into()),
//!     manufacturer: Some("Sony".into()),
//! };
//! store.create_article(&article).unwrap();
//!
//! // Barcodes are unique.
//! let error = store.create_article(&article).unwrap_err();
//! assert!(error.validation().unwrap().contains("barcode"));
//! ```
//!
//! ## Thread Safety
//!
//! Reads go straight to concurrent maps. Mutations are serialized by a single
//! writer lock, which makes the purchase lookup-then-merge atomic: concurrent
//! purchases for the same client, article and placement converge on one row.

pub mod article;
pub mod auth;
mod base;
pub mod client;
pub mod config;
pub mod error;
mod password;
pub mod placement;
pub mod purchase;
pub mod query;
pub mod resource;
pub mod seed;
pub mod server;
pub mod store;
pub mod user;
pub mod validation;

pub use article::{Article, ArticleChanges, NewArticle};
pub use auth::{Credentials, Sessions};
pub use base::{
    ArticleId, BloodType, ClientId, ClientType, Clock, EntityId, MAX_PRICE, MAX_QUANTITY, PlacementId,
    PurchaseId, SystemClock, UnknownVariant, UserId, format_money, line_total, money,
};
pub use client::{Client, ClientChanges, NewClient};
pub use config::Config;
pub use error::InventoryError;
pub use placement::{NewPlacement, Placement, PlacementChanges};
pub use purchase::{NewPurchase, Purchase, PurchaseChanges, PurchaseOutcome, Triple};
pub use query::{ArticleFilter, Page, PER_PAGE, PlacementFilter, PurchaseFilter};
pub use store::Store;
pub use user::{NewUser, Signup, User, UserChanges};
pub use validation::{Catalog, Input, Presence, ValidationErrors, Validator};
