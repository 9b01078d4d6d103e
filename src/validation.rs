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

//! Field-level validation.
//!
//! A [`Validator`] evaluates every rule attached to a request and collects the
//! failures into [`ValidationErrors`], keyed by field name. Rules never
//! short-circuit across fields: a request with three bad fields reports all
//! three. Within one field, the first failing rule wins, so a missing field
//! reports only that it is required.
//!
//! Rules that need to look at stored records (uniqueness, foreign keys) go
//! through the read-only [`Catalog`] trait.
//!
//! # Example
//!
//! ```
//! use inventory_demo_rs::validation::{Presence, Validator};
//!
//! let mut v = Validator::new(Presence::Required);
//! let name = v.text("name", Some("  Sony  "), 255);
//! let phone = v.text("phone_number", None, 20);
//!
//! assert_eq!(name.as_deref(), Some("Sony"));
//! assert!(phone.is_none());
//!
//! let errors = v.finish().unwrap_err();
//! assert_eq!(
//!     errors.get("phone_number").unwrap(),
//!     ["The phone number field is required."]
//! );
//! ```

use crate::base::{ArticleId, ClientId, PlacementId, UserId};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use validator::{ValidateEmail, ValidateLength, ValidateRange};

/// A submitted number or id, as it arrived.
///
/// Values of the expected type deserialize into [`Input::Typed`]; anything
/// else is kept as raw JSON so the field's own rule can report on it instead
/// of the whole body being rejected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Input<T> {
    Typed(T),
    Raw(Value),
}

impl<T> From<T> for Input<T> {
    fn from(value: T) -> Self {
        Input::Typed(value)
    }
}

impl<T: Clone + FromStr> Input<T> {
    /// The typed value, accepting numeric strings.
    fn coerce(&self) -> Option<T> {
        match self {
            Input::Typed(value) => Some(value.clone()),
            Input::Raw(Value::String(raw)) => raw.trim().parse().ok(),
            Input::Raw(Value::Number(raw)) => raw.to_string().parse().ok(),
            Input::Raw(_) => None,
        }
    }
}

/// Validation failures keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// Builds an error set holding a single message.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of fields with at least one failure.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First message of the first failing field.
    pub fn first_message(&self) -> Option<&str> {
        self.0
            .values()
            .next()
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }
}

/// Whether absent fields are errors (create) or skipped (update).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Sometimes,
}

/// Read-only lookups needed by uniqueness and existence rules.
pub trait Catalog {
    fn client_exists(&self, id: ClientId) -> bool;
    fn article_exists(&self, id: ArticleId) -> bool;
    fn placement_exists(&self, id: PlacementId) -> bool;
    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool;
    fn cedula_taken(&self, cedula: &str, except: Option<UserId>) -> bool;
    fn barcode_taken(&self, barcode: &str, except: Option<ArticleId>) -> bool;
    fn location_taken(
        &self,
        article_id: ArticleId,
        location: &str,
        except: Option<PlacementId>,
    ) -> bool;
}

/// Human-readable attribute name: `phone_number` -> `phone number`.
fn attribute(field: &str) -> String {
    field.replace('_', " ")
}

/// Accumulates rule failures for one request.
#[derive(Debug)]
pub struct Validator {
    presence: Presence,
    errors: ValidationErrors,
}

impl Validator {
    pub fn new(presence: Presence) -> Self {
        Self {
            presence,
            errors: ValidationErrors::default(),
        }
    }

    pub fn presence(&self) -> Presence {
        self.presence
    }

    /// True while no rule has failed.
    pub fn passes(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    pub fn into_errors(self) -> ValidationErrors {
        self.errors
    }

    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn required(&mut self, field: &str) {
        self.add(field, format!("The {} field is required.", attribute(field)));
    }

    /// Applies the presence rule; returns the value only if it should be
    /// checked further.
    fn present<T: Copy>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() && self.presence == Presence::Required {
            self.required(field);
        }
        value
    }

    fn at_least<N: fmt::Display>(&mut self, field: &str, min: N) {
        self.add(
            field,
            format!("The {} must be at least {}.", attribute(field), min),
        );
    }

    fn at_most<N: fmt::Display>(&mut self, field: &str, max: N) {
        self.add(
            field,
            format!("The {} may not be greater than {}.", attribute(field), max),
        );
    }

    fn max_chars(&mut self, field: &str, value: &str, max: usize) -> bool {
        if !value.validate_length(None, Some(max as u64), None) {
            self.add(
                field,
                format!(
                    "The {} may not be greater than {} characters.",
                    attribute(field),
                    max
                ),
            );
            return false;
        }
        true
    }

    /// Required string, trimmed, at most `max` characters.
    ///
    /// A present but blank value fails the required rule even on update.
    pub fn text(&mut self, field: &str, value: Option<&str>, max: usize) -> Option<String> {
        let value = self.present(field, value)?.trim();
        if value.is_empty() {
            self.required(field);
            return None;
        }
        self.max_chars(field, value, max).then(|| value.to_string())
    }

    /// Nullable string: absent or blank is never an error.
    pub fn nullable_text(
        &mut self,
        field: &str,
        value: Option<&str>,
        max: usize,
    ) -> Option<String> {
        let value = value.map(str::trim).filter(|v| !v.is_empty())?;
        self.max_chars(field, value, max).then(|| value.to_string())
    }

    /// Required email address, at most `max` characters.
    pub fn email(&mut self, field: &str, value: Option<&str>, max: usize) -> Option<String> {
        let value = self.text(field, value, max)?;
        if !value.validate_email() {
            self.add(
                field,
                format!("The {} must be a valid email address.", attribute(field)),
            );
            return None;
        }
        Some(value)
    }

    /// Password of at least `min` characters that must match its
    /// `<field>_confirmation` companion. Passwords are not trimmed.
    pub fn password(
        &mut self,
        field: &str,
        value: Option<&str>,
        confirmation: Option<&str>,
        min: usize,
    ) -> Option<String> {
        let value = self.present(field, value)?;
        if value.is_empty() {
            self.required(field);
            return None;
        }
        if !value.validate_length(Some(min as u64), None, None) {
            self.add(
                field,
                format!(
                    "The {} must be at least {} characters.",
                    attribute(field),
                    min
                ),
            );
            return None;
        }
        if confirmation != Some(value) {
            self.add(
                field,
                format!("The {} confirmation does not match.", attribute(field)),
            );
            return None;
        }
        Some(value.to_string())
    }

    /// Required value from an enumerated set.
    pub fn choice<T: FromStr>(&mut self, field: &str, value: Option<&str>) -> Option<T> {
        let value = self.present(field, value)?.trim();
        if value.is_empty() {
            self.required(field);
            return None;
        }
        self.parse_choice(field, value)
    }

    /// Nullable value from an enumerated set.
    pub fn nullable_choice<T: FromStr>(&mut self, field: &str, value: Option<&str>) -> Option<T> {
        let value = value.map(str::trim).filter(|v| !v.is_empty())?;
        self.parse_choice(field, value)
    }

    fn parse_choice<T: FromStr>(&mut self, field: &str, value: &str) -> Option<T> {
        match value.parse() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                self.add(field, format!("The selected {} is invalid.", attribute(field)));
                None
            }
        }
    }

    /// Required number within `min..=max`.
    pub fn decimal_between(
        &mut self,
        field: &str,
        value: Option<&Input<Decimal>>,
        min: Decimal,
        max: Decimal,
    ) -> Option<Decimal> {
        let value = self.present(field, value)?;
        let Some(value) = value.coerce() else {
            self.add(field, format!("The {} must be a number.", attribute(field)));
            return None;
        };
        // validator's range rules only cover primitive numbers.
        if value < min {
            self.at_least(field, min);
            return None;
        }
        if value > max {
            self.at_most(field, max);
            return None;
        }
        Some(value)
    }

    /// Required whole number within `min..=max`.
    pub fn integer_between(
        &mut self,
        field: &str,
        value: Option<&Input<Decimal>>,
        min: u64,
        max: u64,
    ) -> Option<u64> {
        let value = self.present(field, value)?;
        let Some(value) = value.coerce().filter(|n| n.fract().is_zero()) else {
            self.add(field, format!("The {} must be an integer.", attribute(field)));
            return None;
        };
        let Some(whole) = value.to_u64() else {
            if value.is_sign_negative() {
                self.at_least(field, min);
            } else {
                self.at_most(field, max);
            }
            return None;
        };
        if !whole.validate_range(Some(min), None, None, None) {
            self.at_least(field, min);
            return None;
        }
        if !whole.validate_range(None, Some(max), None, None) {
            self.at_most(field, max);
            return None;
        }
        Some(whole)
    }

    /// Required foreign key that must point at an existing record. Numeric
    /// strings are accepted.
    pub fn reference<I: Copy + FromStr>(
        &mut self,
        field: &str,
        value: Option<&Input<I>>,
        exists: impl FnOnce(I) -> bool,
    ) -> Option<I> {
        let value = self.present(field, value)?;
        match value.coerce() {
            Some(id) if exists(id) => Some(id),
            _ => {
                self.add(field, format!("The selected {} is invalid.", attribute(field)));
                None
            }
        }
    }

    /// Uniqueness rule; `taken` is the outcome of the scoped lookup.
    pub fn unique(&mut self, field: &str, taken: bool) -> bool {
        if taken {
            self.add(
                field,
                format!("The {} has already been taken.", attribute(field)),
            );
        }
        !taken
    }
}
