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

//! Listing filters and fixed-size pagination.
//!
//! Filters are deserialized straight from query strings. Every field is
//! optional, an empty value counts as absent, and all present fields must
//! match (logical AND). Substring filters ignore case; exact filters do not.

use crate::article::Article;
use crate::base::{ArticleId, ClientId, PlacementId};
use crate::placement::Placement;
use crate::purchase::Purchase;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Records per page for every listing.
pub const PER_PAGE: usize = 15;

/// A predicate over stored records.
pub trait Filter<T> {
    fn matches(&self, record: &T) -> bool;
}

/// Matches every record; used by listings without filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unfiltered;

impl<T> Filter<T> for Unfiltered {
    fn matches(&self, _record: &T) -> bool {
        true
    }
}

/// Deserializes an optional query value, treating blanks as absent.
fn filled<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ArticleFilter {
    #[serde(default, deserialize_with = "filled")]
    pub manufacturer: Option<String>,
    #[serde(default, deserialize_with = "filled")]
    pub description: Option<String>,
}

impl Filter<Article> for ArticleFilter {
    fn matches(&self, article: &Article) -> bool {
        self.manufacturer
            .as_ref()
            .is_none_or(|m| article.manufacturer == *m)
            && self
                .description
                .as_deref()
                .is_none_or(|d| contains_ignore_case(&article.description, d))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlacementFilter {
    #[serde(default, deserialize_with = "filled")]
    pub article_id: Option<ArticleId>,
    #[serde(default, deserialize_with = "filled")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "filled")]
    pub price_min: Option<Decimal>,
    #[serde(default, deserialize_with = "filled")]
    pub price_max: Option<Decimal>,
    #[serde(default, deserialize_with = "filled")]
    pub name: Option<String>,
}

impl Filter<Placement> for PlacementFilter {
    fn matches(&self, placement: &Placement) -> bool {
        self.article_id.is_none_or(|id| placement.article_id == id)
            && self
                .location
                .as_deref()
                .is_none_or(|l| contains_ignore_case(&placement.location, l))
            && self.price_min.is_none_or(|min| placement.price >= min)
            && self.price_max.is_none_or(|max| placement.price <= max)
            && self
                .name
                .as_deref()
                .is_none_or(|n| contains_ignore_case(&placement.name, n))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PurchaseFilter {
    #[serde(default, deserialize_with = "filled")]
    pub client_id: Option<ClientId>,
    #[serde(default, deserialize_with = "filled")]
    pub article_id: Option<ArticleId>,
    #[serde(default, deserialize_with = "filled")]
    pub placement_id: Option<PlacementId>,
    /// Inclusive, compared against the creation date (UTC calendar day).
    #[serde(default, deserialize_with = "filled")]
    pub date_from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "filled")]
    pub date_to: Option<NaiveDate>,
    #[serde(default, deserialize_with = "filled")]
    pub quantity_min: Option<u64>,
}

impl Filter<Purchase> for PurchaseFilter {
    fn matches(&self, purchase: &Purchase) -> bool {
        let day = purchase.created_at.date_naive();
        self.client_id.is_none_or(|id| purchase.client_id == id)
            && self.article_id.is_none_or(|id| purchase.article_id == id)
            && self.placement_id.is_none_or(|id| purchase.placement_id == id)
            && self.date_from.is_none_or(|from| day >= from)
            && self.date_to.is_none_or(|to| day <= to)
            && self.quantity_min.is_none_or(|min| purchase.quantity() >= min)
    }
}

/// The `?page=N` parameter. Anything that is not a positive integer means 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    page: Option<String>,
}

impl ListParams {
    pub fn new(page: usize) -> Self {
        Self {
            page: Some(page.to_string()),
        }
    }

    pub fn page(&self) -> usize {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<usize>().ok())
            .filter(|&p| p > 0)
            .unwrap_or(1)
    }
}

/// One page of an ordered listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: usize,
    pub per_page: usize,
    pub total: usize,
}

impl<T> Page<T> {
    /// Slices page `page` (1-based) out of the full, already ordered result.
    pub fn paginate(records: Vec<T>, page: usize) -> Self {
        let current_page = page.max(1);
        let total = records.len();
        let items = records
            .into_iter()
            .skip((current_page - 1).saturating_mul(PER_PAGE))
            .take(PER_PAGE)
            .collect();
        Self {
            items,
            current_page,
            per_page: PER_PAGE,
            total,
        }
    }

    pub fn last_page(&self) -> usize {
        self.total.div_ceil(self.per_page).max(1)
    }

    /// 1-based position of the first item on this page.
    pub fn from(&self) -> Option<usize> {
        (!self.items.is_empty()).then(|| (self.current_page - 1) * self.per_page + 1)
    }

    /// 1-based position of the last item on this page.
    pub fn to(&self) -> Option<usize> {
        self.from().map(|from| from + self.items.len() - 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            current_page: self.current_page,
            per_page: self.per_page,
            total: self.total,
        }
    }
}
