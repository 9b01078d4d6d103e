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

//! Users: the operators who authenticate against the API.
//!
//! Email and cedula (national id) are unique across users. Stored users only
//! hold an Argon2 hash of their password; validation hands the plain password
//! back so the store can hash it outside its writer lock.

use crate::base::{BloodType, UserId};
use crate::validation::{Catalog, Presence, ValidationErrors, Validator};
use chrono::{DateTime, Utc};
use serde::Deserialize;

const NAME_MAX: usize = 255;
const EMAIL_MAX: usize = 255;
const PASSWORD_MIN: usize = 8;
const CEDULA_MAX: usize = 20;
const PHONE_MAX: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub cedula: String,
    pub phone_number: Option<String>,
    pub blood_type: Option<BloodType>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How strictly a new user is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signup {
    /// Created by an authenticated operator; phone and blood type optional.
    Admin,
    /// Self-registration; every field is required.
    Registration,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    pub cedula: Option<String>,
    pub phone_number: Option<String>,
    pub blood_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    pub cedula: Option<String>,
    pub phone_number: Option<String>,
    pub blood_type: Option<String>,
}

/// A validated [`NewUser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    /// Plain text; never stored.
    pub password: String,
    pub cedula: String,
    pub phone_number: Option<String>,
    pub blood_type: Option<BloodType>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Plain text; never stored.
    pub password: Option<String>,
    pub cedula: Option<String>,
    pub phone_number: Option<String>,
    pub blood_type: Option<BloodType>,
}

impl NewUser {
    pub fn validate(
        &self,
        catalog: &impl Catalog,
        signup: Signup,
    ) -> Result<UserDraft, ValidationErrors> {
        let mut v = Validator::new(Presence::Required);
        let name = v.text("name", self.name.as_deref(), NAME_MAX);
        let email = v.email("email", self.email.as_deref(), EMAIL_MAX);
        if let Some(email) = &email {
            v.unique("email", catalog.email_taken(email, None));
        }
        let password = v.password(
            "password",
            self.password.as_deref(),
            self.password_confirmation.as_deref(),
            PASSWORD_MIN,
        );
        let cedula = v.text("cedula", self.cedula.as_deref(), CEDULA_MAX);
        if let Some(cedula) = &cedula {
            v.unique("cedula", catalog.cedula_taken(cedula, None));
        }
        let (phone_number, blood_type) = match signup {
            Signup::Registration => (
                v.text("phone_number", self.phone_number.as_deref(), PHONE_MAX),
                v.choice("blood_type", self.blood_type.as_deref()),
            ),
            Signup::Admin => (
                v.nullable_text("phone_number", self.phone_number.as_deref(), PHONE_MAX),
                v.nullable_choice("blood_type", self.blood_type.as_deref()),
            ),
        };

        let (Some(name), Some(email), Some(password), Some(cedula), true) =
            (name, email, password, cedula, v.passes())
        else {
            return Err(v.into_errors());
        };
        Ok(UserDraft {
            name,
            email,
            password,
            cedula,
            phone_number,
            blood_type,
        })
    }
}

impl UserChanges {
    pub fn validate(&self, catalog: &impl Catalog, id: UserId) -> Result<UserPatch, ValidationErrors> {
        let mut v = Validator::new(Presence::Sometimes);
        let name = v.text("name", self.name.as_deref(), NAME_MAX);
        let email = v.email("email", self.email.as_deref(), EMAIL_MAX);
        if let Some(email) = &email {
            v.unique("email", catalog.email_taken(email, Some(id)));
        }
        // Blank password on update means "keep the current one".
        let password = match self.password.as_deref() {
            Some("") | None => None,
            Some(password) => v.password(
                "password",
                Some(password),
                self.password_confirmation.as_deref(),
                PASSWORD_MIN,
            ),
        };
        let cedula = v.text("cedula", self.cedula.as_deref(), CEDULA_MAX);
        if let Some(cedula) = &cedula {
            v.unique("cedula", catalog.cedula_taken(cedula, Some(id)));
        }
        let phone_number = v.nullable_text("phone_number", self.phone_number.as_deref(), PHONE_MAX);
        let blood_type = v.nullable_choice("blood_type", self.blood_type.as_deref());

        v.finish()?;
        Ok(UserPatch {
            name,
            email,
            password,
            cedula,
            phone_number,
            blood_type,
        })
    }
}

impl User {
    /// `password_hash` must be the hash of `draft.password`.
    pub(crate) fn new(
        id: UserId,
        draft: UserDraft,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: draft.name,
            email: draft.email,
            password_hash,
            cedula: draft.cedula,
            phone_number: draft.phone_number,
            blood_type: draft.blood_type,
            created_at: now,
            updated_at: now,
        }
    }

    /// `password_hash` must be the hash of `patch.password` when one was given.
    pub(crate) fn apply(
        &mut self,
        patch: UserPatch,
        password_hash: Option<String>,
        now: DateTime<Utc>,
    ) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(password_hash) = password_hash {
            self.password_hash = password_hash;
        }
        if let Some(cedula) = patch.cedula {
            self.cedula = cedula;
        }
        if patch.phone_number.is_some() {
            self.phone_number = patch.phone_number;
        }
        if patch.blood_type.is_some() {
            self.blood_type = patch.blood_type;
        }
        self.updated_at = now;
    }
}
