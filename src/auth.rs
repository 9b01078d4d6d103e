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

//! Bearer-token sessions.
//!
//! Tokens are random and handed out once. [`Sessions`] only keeps their
//! SHA-256 digest, mapped to the owning user.

use crate::base::UserId;
use crate::error::InventoryError;
use crate::password::token_digest;
use crate::store::Store;
use crate::user::{NewUser, Signup, User};
use crate::validation::{Presence, ValidationErrors, Validator};
use dashmap::DashMap;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

const EMAIL_MAX: usize = 255;
const BAD_CREDENTIALS: &str = "These credentials do not match our records.";

/// A user together with a freshly issued plain-text token.
#[derive(Debug, Clone)]
pub struct Issued {
    pub user: User,
    pub token: String,
}

/// Live tokens, keyed by digest.
#[derive(Debug, Default)]
pub struct Sessions {
    tokens: DashMap<String, UserId>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new token for `user`.
    pub fn issue(&self, user: UserId) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token_digest(&token), user);
        token
    }

    /// Resolves a token to its user. Tokens of deleted users are rejected.
    pub fn authenticate(&self, store: &Store, token: &str) -> Result<User, InventoryError> {
        let user_id = self
            .tokens
            .get(&token_digest(token))
            .map(|entry| *entry.value())
            .ok_or(InventoryError::Unauthenticated)?;
        store
            .user(user_id)
            .map_err(|_| InventoryError::Unauthenticated)
    }

    /// Revokes one token; returns whether it was live.
    pub fn revoke(&self, token: &str) -> bool {
        self.tokens.remove(&token_digest(token)).is_some()
    }

    /// Revokes every token owned by `user`.
    pub fn revoke_user(&self, user: UserId) {
        self.tokens.retain(|_, owner| *owner != user);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    fn validate(&self) -> Result<(String, String), ValidationErrors> {
        let mut v = Validator::new(Presence::Required);
        let email = v.email("email", self.email.as_deref(), EMAIL_MAX);
        let password = match self.password.as_deref() {
            Some(password) if !password.is_empty() => Some(password.to_string()),
            _ => {
                v.add("password", "The password field is required.");
                None
            }
        };
        let (Some(email), Some(password), true) = (email, password, v.passes()) else {
            return Err(v.into_errors());
        };
        Ok((email, password))
    }
}

/// Self-registration: creates the user and signs them in.
pub fn register(store: &Store, sessions: &Sessions, input: &NewUser) -> Result<Issued, InventoryError> {
    let user = store.create_user(input, Signup::Registration)?;
    let token = sessions.issue(user.id);
    info!(user_id = %user.id, "user registered");
    Ok(Issued { user, token })
}

/// Exchanges credentials for a new token.
pub fn login(
    store: &Store,
    sessions: &Sessions,
    credentials: &Credentials,
) -> Result<Issued, InventoryError> {
    let (email, password) = credentials.validate()?;
    let Some(user) = store.verify_credentials(&email, &password) else {
        warn!(%email, "rejected login");
        return Err(ValidationErrors::single("email", BAD_CREDENTIALS).into());
    };
    let token = sessions.issue(user.id);
    info!(user_id = %user.id, "user logged in");
    Ok(Issued { user, token })
}
