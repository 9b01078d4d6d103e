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

//! Wire representations of stored records.
//!
//! Each record type has one explicit resource struct listing exactly the
//! fields that leave the process. Money is rendered with two decimals and
//! timestamps as `YYYY-MM-DD HH:MM:SS` (UTC). Password hashes never appear.

use crate::article::Article;
use crate::base::{
    ArticleId, BloodType, ClientId, ClientType, PlacementId, PurchaseId, UserId, format_money,
};
use crate::client::Client;
use crate::placement::Placement;
use crate::purchase::Purchase;
use crate::store::Store;
use crate::user::User;
use chrono::{DateTime, Utc};
use serde::Serialize;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserResource {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub cedula: String,
    pub phone_number: Option<String>,
    pub blood_type: Option<BloodType>,
    pub email_verified_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&User> for UserResource {
    fn from(user: &User) -> Self {
        UserResource {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            cedula: user.cedula.clone(),
            phone_number: user.phone_number.clone(),
            blood_type: user.blood_type,
            email_verified_at: None,
            created_at: timestamp(&user.created_at),
            updated_at: timestamp(&user.updated_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientResource {
    pub id: ClientId,
    pub name: String,
    pub phone_number: String,
    pub client_type: ClientType,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Client> for ClientResource {
    fn from(client: &Client) -> Self {
        ClientResource {
            id: client.id,
            name: client.name.clone(),
            phone_number: client.phone_number.clone(),
            client_type: client.client_type,
            created_at: timestamp(&client.created_at),
            updated_at: timestamp(&client.updated_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleResource {
    pub id: ArticleId,
    pub barcode: String,
    pub description: String,
    pub manufacturer: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Article> for ArticleResource {
    fn from(article: &Article) -> Self {
        ArticleResource {
            id: article.id,
            barcode: article.barcode.clone(),
            description: article.description.clone(),
            manufacturer: article.manufacturer.clone(),
            created_at: timestamp(&article.created_at),
            updated_at: timestamp(&article.updated_at),
        }
    }
}

/// A placement; `article` is omitted when nested inside a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacementResource {
    pub id: PlacementId,
    pub article_id: ArticleId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article: Option<ArticleResource>,
    pub name: String,
    pub price: String,
    pub location: String,
    pub created_at: String,
    pub updated_at: String,
}

impl PlacementResource {
    /// The placement with its article loaded from `store`.
    pub fn load(store: &Store, placement: &Placement) -> Self {
        let article = store.article(placement.article_id).ok();
        Self::new(placement, article.as_ref())
    }

    pub fn new(placement: &Placement, article: Option<&Article>) -> Self {
        PlacementResource {
            id: placement.id,
            article_id: placement.article_id,
            article: article.map(ArticleResource::from),
            name: placement.name.clone(),
            price: format_money(placement.price),
            location: placement.location.clone(),
            created_at: timestamp(&placement.created_at),
            updated_at: timestamp(&placement.updated_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseResource {
    pub id: PurchaseId,
    pub client_id: ClientId,
    pub client: Option<ClientResource>,
    pub article_id: ArticleId,
    pub article: Option<ArticleResource>,
    pub placement_id: PlacementId,
    pub placement: Option<PlacementResource>,
    pub quantity: u64,
    pub unit_price: String,
    pub total_price: String,
    pub purchase_date: String,
    pub created_at: String,
    pub updated_at: String,
}

impl PurchaseResource {
    /// The purchase with its client, article and placement loaded from `store`.
    pub fn load(store: &Store, purchase: &Purchase) -> Self {
        let client = store.client(purchase.client_id).ok();
        let article = store.article(purchase.article_id).ok();
        let placement = store.placement(purchase.placement_id).ok();
        PurchaseResource {
            id: purchase.id,
            client_id: purchase.client_id,
            client: client.as_ref().map(ClientResource::from),
            article_id: purchase.article_id,
            article: article.as_ref().map(ArticleResource::from),
            placement_id: purchase.placement_id,
            placement: placement.as_ref().map(|p| PlacementResource::new(p, None)),
            quantity: purchase.quantity(),
            unit_price: format_money(purchase.unit_price()),
            total_price: format_money(purchase.total_price()),
            purchase_date: purchase.created_at.format(DATE_FORMAT).to_string(),
            created_at: timestamp(&purchase.created_at),
            updated_at: timestamp(&purchase.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn user_resource_hides_password_hash() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let user = User {
            id: UserId(1),
            name: "Juan".into(),
            email: "juan@example.com".into(),
            password_hash: "sha256$salt$digest".into(),
            cedula: "001".into(),
            phone_number: None,
            blood_type: Some(BloodType::AbNegative),
            created_at: at,
            updated_at: at,
        };
        let value = serde_json::to_value(UserResource::from(&user)).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 1,
                "name": "Juan",
                "email": "juan@example.com",
                "cedula": "001",
                "phone_number": null,
                "blood_type": "AB-",
                "email_verified_at": null,
                "created_at": "2025-01-02 03:04:05",
                "updated_at": "2025-01-02 03:04:05",
            })
        );
    }

    #[test]
    fn placement_resource_renders_two_decimal_price() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let placement = Placement {
            id: PlacementId(4),
            article_id: ArticleId(2),
            name: "Front".into(),
            price: dec!(150),
            location: "Aisle 1".into(),
            created_at: at,
            updated_at: at,
        };
        let value = serde_json::to_value(PlacementResource::new(&placement, None)).unwrap();
        assert_eq!(value["price"], "150.00");
        assert!(value.get("article").is_none());
    }
}
