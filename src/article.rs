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

//! Articles: products identified by a unique barcode.

use crate::base::ArticleId;
use crate::validation::{Catalog, Presence, ValidationErrors, Validator};
use chrono::{DateTime, Utc};
use serde::Deserialize;

const BARCODE_MAX: usize = 255;
const DESCRIPTION_MAX: usize = 500;
const MANUFACTURER_MAX: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: ArticleId,
    pub barcode: String,
    pub description: String,
    pub manufacturer: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating an article.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewArticle {
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub manufacturer: Option<String>,
}

/// Fields accepted when updating an article; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleChanges {
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub manufacturer: Option<String>,
}

/// A validated [`NewArticle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDraft {
    pub barcode: String,
    pub description: String,
    pub manufacturer: String,
}

/// A validated [`ArticleChanges`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticlePatch {
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub manufacturer: Option<String>,
}

impl NewArticle {
    pub fn validate(&self, catalog: &impl Catalog) -> Result<ArticleDraft, ValidationErrors> {
        let mut v = Validator::new(Presence::Required);
        let barcode = v.text("barcode", self.barcode.as_deref(), BARCODE_MAX);
        if let Some(barcode) = &barcode {
            v.unique("barcode", catalog.barcode_taken(barcode, None));
        }
        let description = v.text("description", self.description.as_deref(), DESCRIPTION_MAX);
        let manufacturer = v.text("manufacturer", self.manufacturer.as_deref(), MANUFACTURER_MAX);

        let (Some(barcode), Some(description), Some(manufacturer), true) =
            (barcode, description, manufacturer, v.passes())
        else {
            return Err(v.into_errors());
        };
        Ok(ArticleDraft {
            barcode,
            description,
            manufacturer,
        })
    }
}

impl ArticleChanges {
    pub fn validate(
        &self,
        catalog: &impl Catalog,
        id: ArticleId,
    ) -> Result<ArticlePatch, ValidationErrors> {
        let mut v = Validator::new(Presence::Sometimes);
        let barcode = v.text("barcode", self.barcode.as_deref(), BARCODE_MAX);
        if let Some(barcode) = &barcode {
            v.unique("barcode", catalog.barcode_taken(barcode, Some(id)));
        }
        let patch = ArticlePatch {
            barcode,
            description: v.text("description", self.description.as_deref(), DESCRIPTION_MAX),
            manufacturer: v.text(
                "manufacturer",
                self.manufacturer.as_deref(),
                MANUFACTURER_MAX,
            ),
        };
        v.finish().map(|()| patch)
    }
}

impl Article {
    pub(crate) fn new(id: ArticleId, draft: ArticleDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            barcode: draft.barcode,
            description: draft.description,
            manufacturer: draft.manufacturer,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn apply(&mut self, patch: ArticlePatch, now: DateTime<Utc>) {
        if let Some(barcode) = patch.barcode {
            self.barcode = barcode;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(manufacturer) = patch.manufacturer {
            self.manufacturer = manufacturer;
        }
        self.updated_at = now;
    }
}
