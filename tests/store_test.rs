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

//! Store public API integration tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use inventory_demo_rs::{
    ArticleChanges, ArticleFilter, ArticleId, ClientChanges, ClientId, Clock, InventoryError,
    NewArticle, NewClient, NewPlacement, NewPurchase, NewUser, PER_PAGE, PlacementChanges,
    PlacementFilter, PlacementId, PurchaseFilter, Signup, Store, UserChanges, UserId,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

/// Clock that tests can move by hand.
struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn at(y: i32, m: u32, d: u32) -> Arc<Self> {
        Arc::new(ManualClock(Mutex::new(
            Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
        )))
    }

    fn set(&self, y: i32, m: u32, d: u32) {
        *self.0.lock() = Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

fn make_client(store: &Store, name: &str) -> ClientId {
    store
        .create_client(&NewClient {
            name: Some(name.into()),
            phone_number: Some("809-555-0100".into()),
            client_type: Some("regular".into()),
        })
        .unwrap()
        .id
}

fn make_article(store: &Store, barcode: &str, description: &str, manufacturer: &str) -> ArticleId {
    store
        .create_article(&NewArticle {
            barcode: Some(barcode.into()),
            description: Some(description.into()),
            manufacturer: Some(manufacturer.into()),
        })
        .unwrap()
        .id
}

fn make_placement(store: &Store, article: ArticleId, location: &str, price: Decimal) -> PlacementId {
    store
        .create_placement(&NewPlacement {
            article_id: Some(article.into()),
            name: Some(format!("Shelf {location}")),
            price: Some(price.into()),
            location: Some(location.into()),
        })
        .unwrap()
        .id
}

fn purchase(client: ClientId, article: ArticleId, placement: PlacementId, quantity: u64) -> NewPurchase {
    NewPurchase {
        client_id: Some(client.into()),
        article_id: Some(article.into()),
        placement_id: Some(placement.into()),
        quantity: Some(Decimal::from(quantity).into()),
        unit_price: Some(dec!(10).into()),
    }
}

fn juan() -> NewUser {
    NewUser {
        name: Some("Juan Pérez".into()),
        email: Some("juan@example.com".into()),
        password: Some("password123".into()),
        password_confirmation: Some("password123".into()),
        cedula: Some("001-1234567-8".into()),
        phone_number: None,
        blood_type: None,
    }
}

// === Users ===

#[test]
fn user_lifecycle() {
    let store = Store::new();
    let user = store.create_user(&juan(), Signup::Admin).unwrap();
    assert_eq!(user.id, UserId(1));
    assert!(store.verify_credentials("JUAN@example.com", "password123").is_some());
    assert!(store.verify_credentials("juan@example.com", "nope").is_none());

    let updated = store
        .update_user(
            user.id,
            &UserChanges {
                name: Some("Juan Updated".into()),
                blood_type: Some("B-".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.name, "Juan Updated");
    assert_eq!(updated.email, "juan@example.com");

    store.delete_user(user.id).unwrap();
    assert_eq!(
        store.user(user.id),
        Err(InventoryError::not_found("user", user.id))
    );
}

#[test]
fn passwords_are_stored_as_argon2_hashes() {
    let store = Store::new();
    let user = store.create_user(&juan(), Signup::Admin).unwrap();
    assert!(user.password_hash.starts_with("$argon2id$"));
    assert!(!user.password_hash.contains("password123"));

    store
        .update_user(
            user.id,
            &UserChanges {
                password: Some("new-secret".into()),
                password_confirmation: Some("new-secret".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(store.verify_credentials("juan@example.com", "password123").is_none());
    assert!(store.verify_credentials("juan@example.com", "new-secret").is_some());
}

#[test]
fn password_change_on_missing_user_is_not_found() {
    let store = Store::new();
    let result = store.update_user(
        UserId(7),
        &UserChanges {
            password: Some("new-secret".into()),
            password_confirmation: Some("new-secret".into()),
            ..Default::default()
        },
    );
    assert_eq!(result, Err(InventoryError::not_found("user", UserId(7))));
}

#[test]
fn malformed_emails_are_never_stored() {
    let store = Store::new();
    for email in [
        "juan@exa..mple.com",
        "juan@-example.com",
        "ju,an@example.com",
        "juan@example.c\0m",
    ] {
        let mut user = juan();
        user.email = Some(email.into());
        let error = store.create_user(&user, Signup::Admin).unwrap_err();
        assert_eq!(
            error.validation().and_then(|e| e.get("email")),
            Some(["The email must be a valid email address.".to_string()].as_slice()),
            "{email:?}"
        );
    }
    assert_eq!(store.list_users(1).total, 0);
}

#[test]
fn user_email_and_cedula_are_unique() {
    let store = Store::new();
    store.create_user(&juan(), Signup::Admin).unwrap();
    let error = store.create_user(&juan(), Signup::Admin).unwrap_err();
    let errors = error.validation().unwrap();
    assert!(errors.contains("email"));
    assert!(errors.contains("cedula"));
    assert_eq!(store.list_users(1).total, 1);
}

// === Clients ===

#[test]
fn client_partial_update_keeps_other_fields() {
    let store = Store::new();
    let id = make_client(&store, "Ana");
    let client = store
        .update_client(
            id,
            &ClientChanges {
                client_type: Some("premium".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(client.name, "Ana");
    assert_eq!(client.client_type.as_str(), "premium");
}

#[test]
fn client_with_purchases_cannot_be_deleted() {
    let store = Store::new();
    let client = make_client(&store, "Ana");
    let article = make_article(&store, "1", "Phone", "Sony");
    let placement = make_placement(&store, article, "A1", dec!(10));
    store
        .create_purchase(&purchase(client, article, placement, 1))
        .unwrap();

    assert!(matches!(
        store.delete_client(client),
        Err(InventoryError::Integrity(_))
    ));
    assert!(store.client(client).is_ok());
}

// === Articles ===

#[test]
fn duplicate_barcode_is_rejected() {
    let store = Store::new();
    make_article(&store, "123", "Phone", "Sony");
    let error = store
        .create_article(&NewArticle {
            barcode: Some("123".into()),
            description: Some("Other".into()),
            manufacturer: Some("LG".into()),
        })
        .unwrap_err();
    assert_eq!(
        error.validation().and_then(|e| e.get("barcode")),
        Some(["The barcode has already been taken.".to_string()].as_slice())
    );
}

#[test]
fn article_update_may_keep_its_own_barcode() {
    let store = Store::new();
    let id = make_article(&store, "123", "Phone", "Sony");
    make_article(&store, "456", "Tablet", "Sony");

    let article = store
        .update_article(
            id,
            &ArticleChanges {
                barcode: Some("123".into()),
                description: Some("Smartphone".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(article.description, "Smartphone");

    let error = store
        .update_article(
            id,
            &ArticleChanges {
                barcode: Some("456".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(error.validation().unwrap().contains("barcode"));
}

#[test]
fn deleting_article_cascades_to_placements() {
    let store = Store::new();
    let phone = make_article(&store, "1", "Phone", "Sony");
    let tv = make_article(&store, "2", "TV", "Sony");
    let a = make_placement(&store, phone, "A1", dec!(10));
    let b = make_placement(&store, phone, "A2", dec!(12));
    let c = make_placement(&store, tv, "A1", dec!(500));

    store.delete_article(phone).unwrap();

    assert!(store.article(phone).is_err());
    assert!(store.placement(a).is_err());
    assert!(store.placement(b).is_err());
    assert!(store.placement(c).is_ok());
}

#[test]
fn article_filters_combine() {
    let store = Store::new();
    make_article(&store, "1", "Android phone", "Sony");
    make_article(&store, "2", "Android tablet", "Samsung");
    make_article(&store, "3", "Bravia TV", "Sony");

    let page = store.list_articles(
        &ArticleFilter {
            manufacturer: Some("Sony".into()),
            description: Some("Android".into()),
        },
        1,
    );
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].barcode, "1");

    let none = store.list_articles(
        &ArticleFilter {
            manufacturer: Some("Apple".into()),
            ..Default::default()
        },
        1,
    );
    assert!(none.items.is_empty());
    assert_eq!(none.total, 0);
}

#[test]
fn listings_paginate_fifteen_per_page_in_id_order() {
    let store = Store::new();
    for n in 0..20 {
        make_article(&store, &format!("bc-{n}"), "Item", "Acme");
    }

    let first = store.list_articles(&ArticleFilter::default(), 1);
    assert_eq!(first.items.len(), PER_PAGE);
    assert_eq!(first.total, 20);
    assert_eq!(first.last_page(), 2);
    let ids: Vec<u64> = first.items.iter().map(|a| a.id.0).collect();
    assert_eq!(ids, (1..=15).collect::<Vec<_>>());

    let second = store.list_articles(&ArticleFilter::default(), 2);
    assert_eq!(second.items.len(), 5);
    assert_eq!(second.from(), Some(16));
    assert_eq!(second.to(), Some(20));
}

// === Placements ===

#[test]
fn placement_location_unique_per_article() {
    let store = Store::new();
    let phone = make_article(&store, "1", "Phone", "Sony");
    let tv = make_article(&store, "2", "TV", "Sony");
    make_placement(&store, phone, "Warehouse A", dec!(10));

    let duplicate = NewPlacement {
        article_id: Some(phone.into()),
        name: Some("Again".into()),
        price: Some(dec!(11).into()),
        location: Some("Warehouse A".into()),
    };
    let error = store.create_placement(&duplicate).unwrap_err();
    assert!(error.validation().unwrap().contains("location"));

    // Another article may use the same location.
    make_placement(&store, tv, "Warehouse A", dec!(300));
}

#[test]
fn placement_update_checks_merged_pair() {
    let store = Store::new();
    let phone = make_article(&store, "1", "Phone", "Sony");
    let tv = make_article(&store, "2", "TV", "Sony");
    make_placement(&store, phone, "A1", dec!(10));
    let moving = make_placement(&store, tv, "A1", dec!(300));

    let error = store
        .update_placement(
            moving,
            &PlacementChanges {
                article_id: Some(phone.into()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(error.validation().unwrap().contains("location"));

    let placement = store
        .update_placement(
            moving,
            &PlacementChanges {
                price: Some(dec!(299.999).into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(placement.price, dec!(300.00));
}

#[test]
fn placement_filters() {
    let store = Store::new();
    let phone = make_article(&store, "1", "Phone", "Sony");
    let tv = make_article(&store, "2", "TV", "Sony");
    make_placement(&store, phone, "Warehouse A", dec!(50));
    make_placement(&store, phone, "Store front", dec!(150));
    make_placement(&store, tv, "Warehouse B", dec!(100));

    let in_range = store.list_placements(
        &PlacementFilter {
            price_min: Some(dec!(50)),
            price_max: Some(dec!(100)),
            ..Default::default()
        },
        1,
    );
    assert_eq!(in_range.total, 2);

    let warehouse_phone = store.list_placements(
        &PlacementFilter {
            article_id: Some(phone),
            location: Some("warehouse".into()),
            ..Default::default()
        },
        1,
    );
    assert_eq!(warehouse_phone.total, 1);
    assert_eq!(warehouse_phone.items[0].location, "Warehouse A");
}

#[test]
fn referenced_placement_cannot_be_deleted() {
    let store = Store::new();
    let client = make_client(&store, "Ana");
    let article = make_article(&store, "1", "Phone", "Sony");
    let placement = make_placement(&store, article, "A1", dec!(10));
    let (p, _) = store
        .create_purchase(&purchase(client, article, placement, 1))
        .unwrap();

    assert!(matches!(
        store.delete_placement(placement),
        Err(InventoryError::Integrity(_))
    ));

    store.delete_purchase(p.id).unwrap();
    store.delete_placement(placement).unwrap();
}

// === Purchases ===

#[test]
fn purchase_filters_by_date_and_quantity() {
    let clock = ManualClock::at(2025, 1, 10);
    let store = Store::with_clock(clock.clone());
    let ana = make_client(&store, "Ana");
    let luis = make_client(&store, "Luis");
    let article = make_article(&store, "1", "Phone", "Sony");
    let placement = make_placement(&store, article, "A1", dec!(10));

    store.create_purchase(&purchase(ana, article, placement, 2)).unwrap();
    clock.set(2025, 2, 1);
    store.create_purchase(&purchase(luis, article, placement, 8)).unwrap();

    let january = store.list_purchases(
        &PurchaseFilter {
            date_from: NaiveDate::from_ymd_opt(2025, 1, 1),
            date_to: NaiveDate::from_ymd_opt(2025, 1, 31),
            ..Default::default()
        },
        1,
    );
    assert_eq!(january.total, 1);
    assert_eq!(january.items[0].client_id, ana);

    let bulk = store.list_purchases(
        &PurchaseFilter {
            quantity_min: Some(5),
            ..Default::default()
        },
        1,
    );
    assert_eq!(bulk.total, 1);
    assert_eq!(bulk.items[0].client_id, luis);

    let by_client = store.list_purchases(
        &PurchaseFilter {
            client_id: Some(ana),
            article_id: Some(article),
            ..Default::default()
        },
        1,
    );
    assert_eq!(by_client.total, 1);
}

#[test]
fn purchase_references_must_exist() {
    let store = Store::new();
    let error = store
        .create_purchase(&purchase(ClientId(1), ArticleId(2), PlacementId(3), 1))
        .unwrap_err();
    let errors = error.validation().unwrap();
    assert!(errors.contains("client_id"));
    assert!(errors.contains("article_id"));
    assert!(errors.contains("placement_id"));
    assert_eq!(store.list_purchases(&PurchaseFilter::default(), 1).total, 0);
}

#[test]
fn missing_records_are_not_found() {
    let store = Store::new();
    assert_eq!(
        store.article(ArticleId(1)),
        Err(InventoryError::not_found("article", 1u64))
    );
    assert!(matches!(
        store.delete_placement(PlacementId(4)),
        Err(InventoryError::NotFound { .. })
    ));
    assert!(matches!(
        store.update_article(ArticleId(5), &ArticleChanges::default()),
        Err(InventoryError::NotFound { .. })
    ));
}
