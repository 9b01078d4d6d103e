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

//! Error types for store and authentication operations.

use crate::validation::ValidationErrors;
use std::fmt;
use thiserror::Error;

/// Store and authentication errors.
///
/// Every error is request-local: an operation that returns one of these has
/// not mutated the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// One or more fields failed validation
    #[error("the given data was invalid ({} field(s))", .0.len())]
    Validation(ValidationErrors),

    /// Referenced record does not exist
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    /// Missing, unknown or revoked bearer token
    #[error("unauthenticated")]
    Unauthenticated,

    /// Authenticated, but not allowed to perform the action
    #[error("this action is unauthorized")]
    Unauthorized,

    /// A relational constraint would be broken by the operation
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// Failure outside the caller's control, e.g. password hashing
    #[error("internal error: {0}")]
    Internal(String),
}

impl InventoryError {
    pub fn not_found(resource: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn validation(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for InventoryError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}
