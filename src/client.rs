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

//! Clients: the buyers that purchases are recorded against.

use crate::base::{ClientId, ClientType};
use crate::validation::{Presence, ValidationErrors, Validator};
use chrono::{DateTime, Utc};
use serde::Deserialize;

const NAME_MAX: usize = 255;
const PHONE_MAX: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub phone_number: String,
    pub client_type: ClientType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewClient {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub client_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientChanges {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub client_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDraft {
    pub name: String,
    pub phone_number: String,
    pub client_type: ClientType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub client_type: Option<ClientType>,
}

impl NewClient {
    pub fn validate(&self) -> Result<ClientDraft, ValidationErrors> {
        let mut v = Validator::new(Presence::Required);
        let name = v.text("name", self.name.as_deref(), NAME_MAX);
        let phone_number = v.text("phone_number", self.phone_number.as_deref(), PHONE_MAX);
        let client_type = v.choice("client_type", self.client_type.as_deref());

        let (Some(name), Some(phone_number), Some(client_type), true) =
            (name, phone_number, client_type, v.passes())
        else {
            return Err(v.into_errors());
        };
        Ok(ClientDraft {
            name,
            phone_number,
            client_type,
        })
    }
}

impl ClientChanges {
    pub fn validate(&self) -> Result<ClientPatch, ValidationErrors> {
        let mut v = Validator::new(Presence::Sometimes);
        let patch = ClientPatch {
            name: v.text("name", self.name.as_deref(), NAME_MAX),
            phone_number: v.nullable_text("phone_number", self.phone_number.as_deref(), PHONE_MAX),
            client_type: v.choice("client_type", self.client_type.as_deref()),
        };
        v.finish().map(|()| patch)
    }
}

impl Client {
    pub(crate) fn new(id: ClientId, draft: ClientDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            phone_number: draft.phone_number,
            client_type: draft.client_type,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn apply(&mut self, patch: ClientPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(phone_number) = patch.phone_number {
            self.phone_number = phone_number;
        }
        if let Some(client_type) = patch.client_type {
            self.client_type = client_type;
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_client_is_typed() {
        let draft = NewClient {
            name: Some("Ana".into()),
            phone_number: Some("809-555-0100".into()),
            client_type: Some("premium".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(draft.client_type, ClientType::Premium);
    }

    #[test]
    fn empty_request_reports_every_field() {
        let errors = NewClient::default().validate().unwrap_err();
        let fields: Vec<_> = errors.fields().collect();
        assert_eq!(fields, ["client_type", "name", "phone_number"]);
    }

    #[test]
    fn client_type_must_be_regular_or_premium() {
        let errors = NewClient {
            name: Some("Ana".into()),
            phone_number: Some("1".into()),
            client_type: Some("gold".into()),
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            errors.get("client_type").unwrap(),
            ["The selected client type is invalid."]
        );
    }

    #[test]
    fn phone_number_limit_is_20_characters() {
        let errors = NewClient {
            name: Some("Ana".into()),
            phone_number: Some("1".repeat(21)),
            client_type: Some("regular".into()),
        }
        .validate()
        .unwrap_err();
        assert!(errors.contains("phone_number"));
    }

    #[test]
    fn partial_update_validates_present_fields_only() {
        let patch = ClientChanges {
            name: Some("Updated Client Name".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(patch.name.as_deref(), Some("Updated Client Name"));
        assert_eq!(patch.client_type, None);

        let errors = ClientChanges {
            client_type: Some("vip".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(errors.contains("client_type"));
    }
}
