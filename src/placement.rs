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

//! Placements: an article offered at a location for a price.
//!
//! A placement belongs to exactly one article and is removed with it. The
//! pair `(article_id, location)` is unique.

use crate::base::{ArticleId, MAX_PRICE, PlacementId, money};
use crate::validation::{Catalog, Input, Presence, ValidationErrors, Validator};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

const NAME_MAX: usize = 255;
const LOCATION_MAX: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub id: PlacementId,
    pub article_id: ArticleId,
    pub name: String,
    pub price: Decimal,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPlacement {
    pub article_id: Option<Input<ArticleId>>,
    pub name: Option<String>,
    pub price: Option<Input<Decimal>>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlacementChanges {
    pub article_id: Option<Input<ArticleId>>,
    pub name: Option<String>,
    pub price: Option<Input<Decimal>>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementDraft {
    pub article_id: ArticleId,
    pub name: String,
    pub price: Decimal,
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementPatch {
    pub article_id: Option<ArticleId>,
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub location: Option<String>,
}

impl NewPlacement {
    pub fn validate(&self, catalog: &impl Catalog) -> Result<PlacementDraft, ValidationErrors> {
        let mut v = Validator::new(Presence::Required);
        let article_id = v.reference("article_id", self.article_id.as_ref(), |id| {
            catalog.article_exists(id)
        });
        let name = v.text("name", self.name.as_deref(), NAME_MAX);
        let price = v.decimal_between("price", self.price.as_ref(), Decimal::ZERO, MAX_PRICE);
        let location = v.text("location", self.location.as_deref(), LOCATION_MAX);
        if let (Some(article_id), Some(location)) = (article_id, &location) {
            v.unique("location", catalog.location_taken(article_id, location, None));
        }

        let (Some(article_id), Some(name), Some(price), Some(location), true) =
            (article_id, name, price, location, v.passes())
        else {
            return Err(v.into_errors());
        };
        Ok(PlacementDraft {
            article_id,
            name,
            price: money(price),
            location,
        })
    }
}

impl PlacementChanges {
    /// Validates against the placement being updated; the uniqueness check
    /// runs on the merged `(article_id, location)` pair.
    pub fn validate(
        &self,
        catalog: &impl Catalog,
        current: &Placement,
    ) -> Result<PlacementPatch, ValidationErrors> {
        let mut v = Validator::new(Presence::Sometimes);
        let article_id = v.reference("article_id", self.article_id.as_ref(), |id| {
            catalog.article_exists(id)
        });
        let name = v.text("name", self.name.as_deref(), NAME_MAX);
        let price = v.decimal_between("price", self.price.as_ref(), Decimal::ZERO, MAX_PRICE);
        let location = v.text("location", self.location.as_deref(), LOCATION_MAX);

        if (article_id.is_some() || location.is_some()) && v.passes() {
            let merged_article = article_id.unwrap_or(current.article_id);
            let merged_location = location.as_deref().unwrap_or(&current.location);
            v.unique(
                "location",
                catalog.location_taken(merged_article, merged_location, Some(current.id)),
            );
        }

        v.finish()?;
        Ok(PlacementPatch {
            article_id,
            name,
            price: price.map(money),
            location,
        })
    }
}

impl Placement {
    pub(crate) fn new(id: PlacementId, draft: PlacementDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            article_id: draft.article_id,
            name: draft.name,
            price: draft.price,
            location: draft.location,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn apply(&mut self, patch: PlacementPatch, now: DateTime<Utc>) {
        if let Some(article_id) = patch.article_id {
            self.article_id = article_id;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        self.updated_at = now;
    }
}
