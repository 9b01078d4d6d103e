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

//! Purchases and the accumulation rule.
//!
//! A purchase records a client buying a quantity of an article at a
//! placement. Its `total_price` is derived and always equals
//! `quantity × unit_price`.
//!
//! Two paths change quantity or price, and they are kept apart on purpose:
//!
//! ```text
//!  create (triple seen before) ──► accumulate(): quantity += incoming
//!                                  unit_price unchanged, incoming price dropped
//!                                  recompute_total()
//!
//!  update (explicit)           ──► apply(): overwrite supplied fields
//!                                  recompute_total() if quantity or unit_price supplied,
//!                                  using the current value of whichever was not
//! ```
//!
//! # Example
//!
//! ```
//! use inventory_demo_rs::{NewArticle, NewClient, NewPlacement, NewPurchase, PurchaseOutcome, Store};
//! use rust_decimal::Decimal;
//! use rust_decimal_macros::dec;
//!
//! let store = Store::new();
//! let client = store.create_client(&NewClient {
//!     name: Some("Ana".into()),
//!     phone_number: Some("555".into()),
//!     client_type: Some("regular".into()),
//! }).unwrap();
//! let article = store.create_article(&NewArticle {
//!     barcode: Some("123".into()),
//!     description: Some("Phone".into()),
//!     manufacturer: Some("Sony".into()),
//! }).unwrap();
//! let placement = store.create_placement(&NewPlacement {
//!     article_id: Some(article.id.into()),
//!     name: Some("Front".into()),
//!     price: Some(dec!(100).into()),
//!     location: Some("Aisle 1".into()),
//! }).unwrap();
//!
//! let request = |quantity: Decimal, unit_price: Decimal| NewPurchase {
//!     client_id: Some(client.id.into()),
//!     article_id: Some(article.id.into()),
//!     placement_id: Some(placement.id.into()),
//!     quantity: Some(quantity.into()),
//!     unit_price: Some(unit_price.into()),
//! };
//!
//! let (first, outcome) = store.create_purchase(&request(dec!(3), dec!(100))).unwrap();
//! assert_eq!(outcome, PurchaseOutcome::Created);
//! assert_eq!(first.total_price(), dec!(300));
//!
//! let (merged, outcome) = store.create_purchase(&request(dec!(2), dec!(999))).unwrap();
//! assert_eq!(outcome, PurchaseOutcome::Accumulated);
//! assert_eq!(merged.id, first.id);
//! assert_eq!(merged.quantity(), 5);
//! assert_eq!(merged.unit_price(), dec!(100));
//! assert_eq!(merged.total_price(), dec!(500));
//! ```

use crate::base::{
    ArticleId, ClientId, MAX_PRICE, MAX_QUANTITY, PlacementId, PurchaseId, line_total, money,
};
use crate::error::InventoryError;
use crate::validation::{Catalog, Input, Presence, ValidationErrors, Validator};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

/// The `(client, article, placement)` key that accumulation merges on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Triple {
    pub client_id: ClientId,
    pub article_id: ArticleId,
    pub placement_id: PlacementId,
}

/// Which path a purchase creation took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// No purchase existed for the triple; a new row was stored.
    Created,
    /// The quantity was added to the existing row for the triple.
    Accumulated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub id: PurchaseId,
    pub client_id: ClientId,
    pub article_id: ArticleId,
    pub placement_id: PlacementId,
    quantity: u64,
    unit_price: Decimal,
    total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPurchase {
    pub client_id: Option<Input<ClientId>>,
    pub article_id: Option<Input<ArticleId>>,
    pub placement_id: Option<Input<PlacementId>>,
    pub quantity: Option<Input<Decimal>>,
    pub unit_price: Option<Input<Decimal>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseChanges {
    pub client_id: Option<Input<ClientId>>,
    pub article_id: Option<Input<ArticleId>>,
    pub placement_id: Option<Input<PlacementId>>,
    pub quantity: Option<Input<Decimal>>,
    pub unit_price: Option<Input<Decimal>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseDraft {
    pub triple: Triple,
    pub quantity: u64,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurchasePatch {
    pub client_id: Option<ClientId>,
    pub article_id: Option<ArticleId>,
    pub placement_id: Option<PlacementId>,
    pub quantity: Option<u64>,
    pub unit_price: Option<Decimal>,
}

impl NewPurchase {
    pub fn validate(&self, catalog: &impl Catalog) -> Result<PurchaseDraft, ValidationErrors> {
        let mut v = Validator::new(Presence::Required);
        let client_id = v.reference("client_id", self.client_id.as_ref(), |id| {
            catalog.client_exists(id)
        });
        let article_id = v.reference("article_id", self.article_id.as_ref(), |id| {
            catalog.article_exists(id)
        });
        let placement_id = v.reference("placement_id", self.placement_id.as_ref(), |id| {
            catalog.placement_exists(id)
        });
        let quantity = v.integer_between("quantity", self.quantity.as_ref(), 1, MAX_QUANTITY);
        let unit_price = v.decimal_between(
            "unit_price",
            self.unit_price.as_ref(),
            Decimal::ZERO,
            MAX_PRICE,
        );

        let (Some(client_id), Some(article_id), Some(placement_id), Some(quantity), Some(unit_price), true) =
            (client_id, article_id, placement_id, quantity, unit_price, v.passes())
        else {
            return Err(v.into_errors());
        };
        Ok(PurchaseDraft {
            triple: Triple {
                client_id,
                article_id,
                placement_id,
            },
            quantity,
            unit_price: money(unit_price),
        })
    }
}

impl PurchaseChanges {
    pub fn validate(&self, catalog: &impl Catalog) -> Result<PurchasePatch, ValidationErrors> {
        let mut v = Validator::new(Presence::Sometimes);
        let patch = PurchasePatch {
            client_id: v.reference("client_id", self.client_id.as_ref(), |id| {
                catalog.client_exists(id)
            }),
            article_id: v.reference("article_id", self.article_id.as_ref(), |id| {
                catalog.article_exists(id)
            }),
            placement_id: v.reference("placement_id", self.placement_id.as_ref(), |id| {
                catalog.placement_exists(id)
            }),
            quantity: v.integer_between("quantity", self.quantity.as_ref(), 1, MAX_QUANTITY),
            unit_price: v
                .decimal_between(
                    "unit_price",
                    self.unit_price.as_ref(),
                    Decimal::ZERO,
                    MAX_PRICE,
                )
                .map(money),
        };
        v.finish().map(|()| patch)
    }
}

impl Purchase {
    pub(crate) fn new(id: PurchaseId, draft: PurchaseDraft, now: DateTime<Utc>) -> Self {
        let mut purchase = Self {
            id,
            client_id: draft.triple.client_id,
            article_id: draft.triple.article_id,
            placement_id: draft.triple.placement_id,
            quantity: draft.quantity,
            unit_price: draft.unit_price,
            total_price: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        purchase.recompute_total();
        purchase
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn total_price(&self) -> Decimal {
        self.total_price
    }

    pub fn triple(&self) -> Triple {
        Triple {
            client_id: self.client_id,
            article_id: self.article_id,
            placement_id: self.placement_id,
        }
    }

    fn recompute_total(&mut self) {
        self.total_price = line_total(self.quantity, self.unit_price);
        debug_assert_eq!(
            self.total_price,
            money(Decimal::from(self.quantity) * self.unit_price),
            "Invariant violated: total_price drifted from quantity × unit_price"
        );
    }

    /// Creation-time merge: adds `quantity`, keeps the stored unit price.
    pub(crate) fn accumulate(
        &mut self,
        quantity: u64,
        now: DateTime<Utc>,
    ) -> Result<(), InventoryError> {
        self.quantity = self.quantity.checked_add(quantity).ok_or_else(|| {
            InventoryError::Integrity(format!("purchase {} quantity overflow", self.id))
        })?;
        self.recompute_total();
        self.updated_at = now;
        Ok(())
    }

    /// Explicit update: overwrites supplied fields, re-derives the total from
    /// the post-update quantity and unit price.
    pub(crate) fn apply(&mut self, patch: PurchasePatch, now: DateTime<Utc>) {
        if let Some(client_id) = patch.client_id {
            self.client_id = client_id;
        }
        if let Some(article_id) = patch.article_id {
            self.article_id = article_id;
        }
        if let Some(placement_id) = patch.placement_id {
            self.placement_id = placement_id;
        }
        let repriced = patch.quantity.is_some() || patch.unit_price.is_some();
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(unit_price) = patch.unit_price {
            self.unit_price = unit_price;
        }
        if repriced {
            self.recompute_total();
        }
        self.updated_at = now;
    }
}
