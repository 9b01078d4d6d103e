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

//! Concurrency tests for the store, run under parking_lot's deadlock detector.
//!
//! These tests verify that concurrent mutations serialize correctly:
//! identical purchases converge on a single row, uniqueness holds under
//! races, and mixed read/write traffic never deadlocks.

use inventory_demo_rs::{
    ArticleFilter, ArticleId, ClientId, NewArticle, NewClient, NewPlacement, NewPurchase,
    PlacementFilter, PlacementId, PurchaseChanges, PurchaseFilter, Store, line_total,
};
use parking_lot::deadlock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

// === Deadlock Detection Infrastructure ===

/// Starts a background thread that checks for deadlocks.
/// Returns a handle to stop the detector.
fn start_deadlock_detector() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected! See output above for details.");
            }
        }
    });

    running
}

/// Stops the deadlock detector.
fn stop_deadlock_detector(running: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(150));
}

// === Fixtures ===

fn seed(store: &Store, clients: usize, articles: usize) -> (Vec<ClientId>, Vec<(ArticleId, PlacementId)>) {
    let client_ids = (0..clients)
        .map(|n| {
            store
                .create_client(&NewClient {
                    name: Some(format!("Client {n}")),
                    phone_number: Some("809-555-0100".into()),
                    client_type: Some("regular".into()),
                })
                .unwrap()
                .id
        })
        .collect();
    let stock = (0..articles)
        .map(|n| {
            let article = store
                .create_article(&NewArticle {
                    barcode: Some(format!("bc-{n}")),
                    description: Some("Item".into()),
                    manufacturer: Some("Acme".into()),
                })
                .unwrap()
                .id;
            let placement = store
                .create_placement(&NewPlacement {
                    article_id: Some(article.into()),
                    name: Some("Shelf".into()),
                    price: Some(dec!(2.50).into()),
                    location: Some("Aisle 1".into()),
                })
                .unwrap()
                .id;
            (article, placement)
        })
        .collect();
    (client_ids, stock)
}

fn request(client: ClientId, article: ArticleId, placement: PlacementId, unit_price: Decimal) -> NewPurchase {
    NewPurchase {
        client_id: Some(client.into()),
        article_id: Some(article.into()),
        placement_id: Some(placement.into()),
        quantity: Some(dec!(1).into()),
        unit_price: Some(unit_price.into()),
    }
}

// === Tests ===

/// Many threads buying the same triple must end with exactly one row.
#[test]
fn identical_purchases_converge_on_one_row() {
    let detector = start_deadlock_detector();
    let store = Arc::new(Store::new());
    let (clients, stock) = seed(&store, 1, 1);
    let (client, (article, placement)) = (clients[0], stock[0]);

    const NUM_THREADS: usize = 32;
    const OPS_PER_THREAD: usize = 25;

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for _ in 0..OPS_PER_THREAD {
                    // Every thread offers a different price; only the first one sticks.
                    let price = Decimal::from(t as u64 + 1);
                    store
                        .create_purchase(&request(client, article, placement, price))
                        .expect("purchase should validate");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    let page = store.list_purchases(&PurchaseFilter::default(), 1);
    assert_eq!(page.total, 1, "triple must converge on a single row");
    let purchase = &page.items[0];
    assert_eq!(purchase.quantity(), (NUM_THREADS * OPS_PER_THREAD) as u64);
    assert_eq!(
        purchase.total_price(),
        line_total(purchase.quantity(), purchase.unit_price())
    );
}

/// Racing creations of the same barcode: exactly one wins.
#[test]
fn barcode_uniqueness_holds_under_races() {
    let store = Arc::new(Store::new());
    let wins = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = store.clone();
            let wins = wins.clone();
            thread::spawn(move || {
                let created = store.create_article(&NewArticle {
                    barcode: Some("123".into()),
                    description: Some("Phone".into()),
                    manufacturer: Some("Sony".into()),
                });
                if created.is_ok() {
                    wins.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert_eq!(wins.load(Ordering::SeqCst), 1);
    assert_eq!(store.list_articles(&ArticleFilter::default(), 1).total, 1);
}

/// Purchases, updates, listings and cascading deletes interleaved.
#[test]
fn no_deadlock_mixed_workload() {
    let detector = start_deadlock_detector();
    let store = Arc::new(Store::new());
    let (clients, stock) = seed(&store, 4, 4);
    let clients = Arc::new(clients);
    let stock = Arc::new(stock);

    const NUM_THREADS: usize = 24;
    const OPS_PER_THREAD: usize = 60;

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|t| {
            let store = store.clone();
            let clients = clients.clone();
            let stock = stock.clone();
            thread::spawn(move || {
                for i in 0..OPS_PER_THREAD {
                    let client = clients[(t + i) % clients.len()];
                    let (article, placement) = stock[i % stock.len()];
                    match i % 4 {
                        0 | 1 => {
                            store
                                .create_purchase(&request(client, article, placement, dec!(2.50)))
                                .expect("purchase should validate");
                        }
                        2 => {
                            let page = store.list_purchases(&PurchaseFilter::default(), 1);
                            if let Some(purchase) = page.items.first() {
                                let _ = store.update_purchase(
                                    purchase.id,
                                    &PurchaseChanges {
                                        unit_price: Some(dec!(2.50).into()),
                                        ..Default::default()
                                    },
                                );
                            }
                        }
                        _ => {
                            // Short-lived article with placements, created and
                            // cascaded away while purchases are in flight.
                            let temp = store
                                .create_article(&NewArticle {
                                    barcode: Some(format!("tmp-{t}-{i}")),
                                    description: Some("Temp".into()),
                                    manufacturer: Some("Acme".into()),
                                })
                                .unwrap()
                                .id;
                            store
                                .create_placement(&NewPlacement {
                                    article_id: Some(temp.into()),
                                    name: Some("Temp".into()),
                                    price: Some(dec!(1).into()),
                                    location: Some("Bin".into()),
                                })
                                .unwrap();
                            let _ = store.list_placements(&PlacementFilter::default(), 1);
                            store.delete_article(temp).unwrap();
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    // One row per distinct triple, and every total is consistent.
    let purchases = store.list_purchases(&PurchaseFilter::default(), 1);
    assert!(purchases.total <= clients.len() * stock.len());
    let expected: u64 = (NUM_THREADS * OPS_PER_THREAD / 2) as u64;
    let mut recorded = 0;
    for page in 1..=purchases.last_page() {
        for purchase in store.list_purchases(&PurchaseFilter::default(), page).items {
            assert_eq!(
                purchase.total_price(),
                line_total(purchase.quantity(), purchase.unit_price())
            );
            recorded += purchase.quantity();
        }
    }
    assert_eq!(recorded, expected);
    assert_eq!(
        store.list_placements(&PlacementFilter::default(), 1).total,
        stock.len()
    );
}
