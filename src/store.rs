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

//! In-memory entity store.
//!
//! The [`Store`] keeps one [`DashMap`] table per entity, so lookups and
//! listings run concurrently. Every mutation takes the single writer lock for
//! its whole unit of work: validation, uniqueness and foreign-key checks, the
//! purchase accumulation lookup, cascades and the write itself. That makes
//! each mutation atomic with respect to every other one, and a failed
//! mutation leaves the tables untouched.
//!
//! # Thread Safety
//!
//! Table entries are cloned out before any other table (or the same table)
//! is written. No shard guard is ever held across a second map operation.

use crate::article::{Article, ArticleChanges, NewArticle};
use crate::base::{
    ArticleId, Clock, ClientId, PlacementId, PurchaseId, SystemClock, UserId,
};
use crate::client::{Client, ClientChanges, NewClient};
use crate::error::InventoryError;
use crate::password::{hash_password, verify_password};
use crate::placement::{NewPlacement, Placement, PlacementChanges};
use crate::purchase::{NewPurchase, Purchase, PurchaseChanges, PurchaseOutcome, Triple};
use crate::query::{ArticleFilter, Filter, Page, PlacementFilter, PurchaseFilter, Unfiltered};
use crate::user::{NewUser, Signup, User, UserChanges};
use crate::validation::Catalog;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, info};

/// Next identifier per table. Only touched under the writer lock.
#[derive(Debug, Default)]
struct Sequences {
    users: u64,
    clients: u64,
    articles: u64,
    placements: u64,
    purchases: u64,
}

fn next(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

fn fetch<K, V>(table: &DashMap<K, V>, id: K, resource: &'static str) -> Result<V, InventoryError>
where
    K: Eq + Hash + Copy + Display,
    V: Clone,
{
    table
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| InventoryError::not_found(resource, id))
}

fn ensure_exists<K, V>(table: &DashMap<K, V>, id: K, resource: &'static str) -> Result<(), InventoryError>
where
    K: Eq + Hash + Copy + Display,
{
    if table.contains_key(&id) {
        Ok(())
    } else {
        Err(InventoryError::not_found(resource, id))
    }
}

/// Filters, orders by id and paginates one table.
fn listing<K, V>(table: &DashMap<K, V>, filter: &impl Filter<V>, page: usize) -> Page<V>
where
    K: Eq + Hash + Ord + Copy,
    V: Clone,
{
    let mut rows: Vec<(K, V)> = table
        .iter()
        .filter(|entry| filter.matches(entry.value()))
        .map(|entry| (*entry.key(), entry.value().clone()))
        .collect();
    rows.sort_unstable_by_key(|(id, _)| *id);
    Page::paginate(rows.into_iter().map(|(_, row)| row).collect(), page)
}

pub struct Store {
    users: DashMap<UserId, User>,
    clients: DashMap<ClientId, Client>,
    articles: DashMap<ArticleId, Article>,
    placements: DashMap<PlacementId, Placement>,
    purchases: DashMap<PurchaseId, Purchase>,
    writer: Mutex<Sequences>,
    clock: Arc<dyn Clock>,
}

impl Store {
    /// Creates an empty store stamped by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Store {
            users: DashMap::new(),
            clients: DashMap::new(),
            articles: DashMap::new(),
            placements: DashMap::new(),
            purchases: DashMap::new(),
            writer: Mutex::new(Sequences::default()),
            clock,
        }
    }

    // Users

    /// The password is hashed before the writer lock is taken. Validation
    /// runs again under the lock, and only that pass decides.
    pub fn create_user(&self, input: &NewUser, signup: Signup) -> Result<User, InventoryError> {
        let password_hash = hash_password(&input.validate(self, signup)?.password)?;

        let mut seq = self.writer.lock();
        let draft = input.validate(self, signup)?;
        let user = User::new(
            UserId(next(&mut seq.users)),
            draft,
            password_hash,
            self.clock.now(),
        );
        self.users.insert(user.id, user.clone());
        debug!(user_id = %user.id, "user created");
        Ok(user)
    }

    pub fn user(&self, id: UserId) -> Result<User, InventoryError> {
        fetch(&self.users, id, "user")
    }

    /// Like [`Store::create_user`], a new password is hashed outside the
    /// writer lock.
    pub fn update_user(&self, id: UserId, changes: &UserChanges) -> Result<User, InventoryError> {
        ensure_exists(&self.users, id, "user")?;
        let password_hash = changes
            .validate(self, id)?
            .password
            .as_deref()
            .map(hash_password)
            .transpose()?;

        let _writer = self.writer.lock();
        ensure_exists(&self.users, id, "user")?;
        let patch = changes.validate(self, id)?;
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| InventoryError::not_found("user", id))?;
        user.apply(patch, password_hash, self.clock.now());
        debug!(user_id = %id, "user updated");
        Ok(user.clone())
    }

    pub fn delete_user(&self, id: UserId) -> Result<User, InventoryError> {
        let _writer = self.writer.lock();
        let (_, user) = self
            .users
            .remove(&id)
            .ok_or_else(|| InventoryError::not_found("user", id))?;
        debug!(user_id = %id, "user deleted");
        Ok(user)
    }

    pub fn list_users(&self, page: usize) -> Page<User> {
        listing(&self.users, &Unfiltered, page)
    }

    /// Returns the user owning `email` if `password` matches its hash.
    pub fn verify_credentials(&self, email: &str, password: &str) -> Option<User> {
        let email = email.trim();
        self.users
            .iter()
            .find(|entry| entry.email.eq_ignore_ascii_case(email))
            .map(|entry| entry.value().clone())
            .filter(|user| verify_password(password, &user.password_hash))
    }

    // Clients

    pub fn create_client(&self, input: &NewClient) -> Result<Client, InventoryError> {
        let mut seq = self.writer.lock();
        let draft = input.validate()?;
        let client = Client::new(ClientId(next(&mut seq.clients)), draft, self.clock.now());
        self.clients.insert(client.id, client.clone());
        debug!(client_id = %client.id, "client created");
        Ok(client)
    }

    pub fn client(&self, id: ClientId) -> Result<Client, InventoryError> {
        fetch(&self.clients, id, "client")
    }

    pub fn update_client(
        &self,
        id: ClientId,
        changes: &ClientChanges,
    ) -> Result<Client, InventoryError> {
        let _writer = self.writer.lock();
        ensure_exists(&self.clients, id, "client")?;
        let patch = changes.validate()?;
        let mut client = self
            .clients
            .get_mut(&id)
            .ok_or_else(|| InventoryError::not_found("client", id))?;
        client.apply(patch, self.clock.now());
        debug!(client_id = %id, "client updated");
        Ok(client.clone())
    }

    /// Fails with [`InventoryError::Integrity`] while purchases reference the client.
    pub fn delete_client(&self, id: ClientId) -> Result<Client, InventoryError> {
        let _writer = self.writer.lock();
        ensure_exists(&self.clients, id, "client")?;
        if self.purchases.iter().any(|p| p.client_id == id) {
            return Err(InventoryError::Integrity(format!(
                "client {id} is referenced by purchases"
            )));
        }
        let (_, client) = self
            .clients
            .remove(&id)
            .ok_or_else(|| InventoryError::not_found("client", id))?;
        debug!(client_id = %id, "client deleted");
        Ok(client)
    }

    pub fn list_clients(&self, page: usize) -> Page<Client> {
        listing(&self.clients, &Unfiltered, page)
    }

    // Articles

    pub fn create_article(&self, input: &NewArticle) -> Result<Article, InventoryError> {
        let mut seq = self.writer.lock();
        let draft = input.validate(self)?;
        let article = Article::new(ArticleId(next(&mut seq.articles)), draft, self.clock.now());
        self.articles.insert(article.id, article.clone());
        debug!(article_id = %article.id, barcode = %article.barcode, "article created");
        Ok(article)
    }

    pub fn article(&self, id: ArticleId) -> Result<Article, InventoryError> {
        fetch(&self.articles, id, "article")
    }

    pub fn update_article(
        &self,
        id: ArticleId,
        changes: &ArticleChanges,
    ) -> Result<Article, InventoryError> {
        let _writer = self.writer.lock();
        ensure_exists(&self.articles, id, "article")?;
        let patch = changes.validate(self, id)?;
        let mut article = self
            .articles
            .get_mut(&id)
            .ok_or_else(|| InventoryError::not_found("article", id))?;
        article.apply(patch, self.clock.now());
        debug!(article_id = %id, "article updated");
        Ok(article.clone())
    }

    /// Deletes an article together with its placements.
    ///
    /// Fails with [`InventoryError::Integrity`] if a purchase references the
    /// article or any placement that would be removed with it.
    pub fn delete_article(&self, id: ArticleId) -> Result<Article, InventoryError> {
        let _writer = self.writer.lock();
        ensure_exists(&self.articles, id, "article")?;
        let owned: Vec<PlacementId> = self
            .placements
            .iter()
            .filter(|p| p.article_id == id)
            .map(|p| p.id)
            .collect();
        if self
            .purchases
            .iter()
            .any(|p| p.article_id == id || owned.contains(&p.placement_id))
        {
            return Err(InventoryError::Integrity(format!(
                "article {id} is referenced by purchases"
            )));
        }
        for placement_id in &owned {
            self.placements.remove(placement_id);
        }
        let (_, article) = self
            .articles
            .remove(&id)
            .ok_or_else(|| InventoryError::not_found("article", id))?;
        debug!(article_id = %id, placements = owned.len(), "article deleted");
        Ok(article)
    }

    pub fn list_articles(&self, filter: &ArticleFilter, page: usize) -> Page<Article> {
        listing(&self.articles, filter, page)
    }

    // Placements

    pub fn create_placement(&self, input: &NewPlacement) -> Result<Placement, InventoryError> {
        let mut seq = self.writer.lock();
        let draft = input.validate(self)?;
        let placement =
            Placement::new(PlacementId(next(&mut seq.placements)), draft, self.clock.now());
        self.placements.insert(placement.id, placement.clone());
        debug!(placement_id = %placement.id, article_id = %placement.article_id, "placement created");
        Ok(placement)
    }

    pub fn placement(&self, id: PlacementId) -> Result<Placement, InventoryError> {
        fetch(&self.placements, id, "placement")
    }

    pub fn update_placement(
        &self,
        id: PlacementId,
        changes: &PlacementChanges,
    ) -> Result<Placement, InventoryError> {
        let _writer = self.writer.lock();
        let current = self.placement(id)?;
        let patch = changes.validate(self, &current)?;
        let mut placement = self
            .placements
            .get_mut(&id)
            .ok_or_else(|| InventoryError::not_found("placement", id))?;
        placement.apply(patch, self.clock.now());
        debug!(placement_id = %id, "placement updated");
        Ok(placement.clone())
    }

    /// Fails with [`InventoryError::Integrity`] while purchases reference the placement.
    pub fn delete_placement(&self, id: PlacementId) -> Result<Placement, InventoryError> {
        let _writer = self.writer.lock();
        ensure_exists(&self.placements, id, "placement")?;
        if self.purchases.iter().any(|p| p.placement_id == id) {
            return Err(InventoryError::Integrity(format!(
                "placement {id} is referenced by purchases"
            )));
        }
        let (_, placement) = self
            .placements
            .remove(&id)
            .ok_or_else(|| InventoryError::not_found("placement", id))?;
        debug!(placement_id = %id, "placement deleted");
        Ok(placement)
    }

    pub fn list_placements(&self, filter: &PlacementFilter, page: usize) -> Page<Placement> {
        listing(&self.placements, filter, page)
    }

    // Purchases

    /// Records a purchase, merging it into the existing row for the same
    /// triple if there is one.
    ///
    /// On a merge the incoming quantity is added and the incoming unit price
    /// is discarded. The lookup and the write happen under the writer lock,
    /// so concurrent requests for a new triple converge on a single row.
    pub fn create_purchase(
        &self,
        input: &NewPurchase,
    ) -> Result<(Purchase, PurchaseOutcome), InventoryError> {
        let mut seq = self.writer.lock();
        let draft = input.validate(self)?;
        let now = self.clock.now();

        if let Some(id) = self.accumulation_target(draft.triple) {
            let mut purchase = self
                .purchases
                .get_mut(&id)
                .ok_or_else(|| InventoryError::not_found("purchase", id))?;
            purchase.accumulate(draft.quantity, now)?;
            info!(
                purchase_id = %id,
                added = draft.quantity,
                quantity = purchase.quantity(),
                total_price = %purchase.total_price(),
                "purchase accumulated"
            );
            return Ok((purchase.clone(), PurchaseOutcome::Accumulated));
        }

        let purchase = Purchase::new(PurchaseId(next(&mut seq.purchases)), draft, now);
        self.purchases.insert(purchase.id, purchase.clone());
        debug!(purchase_id = %purchase.id, total_price = %purchase.total_price(), "purchase created");
        Ok((purchase, PurchaseOutcome::Created))
    }

    /// Lowest-id purchase recorded for `triple`.
    fn accumulation_target(&self, triple: Triple) -> Option<PurchaseId> {
        self.purchases
            .iter()
            .filter(|entry| entry.triple() == triple)
            .map(|entry| *entry.key())
            .min()
    }

    pub fn purchase(&self, id: PurchaseId) -> Result<Purchase, InventoryError> {
        fetch(&self.purchases, id, "purchase")
    }

    /// Explicit update; never merges rows, even if the new triple collides.
    pub fn update_purchase(
        &self,
        id: PurchaseId,
        changes: &PurchaseChanges,
    ) -> Result<Purchase, InventoryError> {
        let _writer = self.writer.lock();
        ensure_exists(&self.purchases, id, "purchase")?;
        let patch = changes.validate(self)?;
        let mut purchase = self
            .purchases
            .get_mut(&id)
            .ok_or_else(|| InventoryError::not_found("purchase", id))?;
        purchase.apply(patch, self.clock.now());
        debug!(purchase_id = %id, total_price = %purchase.total_price(), "purchase updated");
        Ok(purchase.clone())
    }

    pub fn delete_purchase(&self, id: PurchaseId) -> Result<Purchase, InventoryError> {
        let _writer = self.writer.lock();
        let (_, purchase) = self
            .purchases
            .remove(&id)
            .ok_or_else(|| InventoryError::not_found("purchase", id))?;
        debug!(purchase_id = %id, "purchase deleted");
        Ok(purchase)
    }

    pub fn list_purchases(&self, filter: &PurchaseFilter, page: usize) -> Page<Purchase> {
        listing(&self.purchases, filter, page)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog for Store {
    fn client_exists(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    fn article_exists(&self, id: ArticleId) -> bool {
        self.articles.contains_key(&id)
    }

    fn placement_exists(&self, id: PlacementId) -> bool {
        self.placements.contains_key(&id)
    }

    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .iter()
            .any(|u| Some(u.id) != except && u.email.eq_ignore_ascii_case(email))
    }

    fn cedula_taken(&self, cedula: &str, except: Option<UserId>) -> bool {
        self.users
            .iter()
            .any(|u| Some(u.id) != except && u.cedula == cedula)
    }

    fn barcode_taken(&self, barcode: &str, except: Option<ArticleId>) -> bool {
        self.articles
            .iter()
            .any(|a| Some(a.id) != except && a.barcode == barcode)
    }

    fn location_taken(
        &self,
        article_id: ArticleId,
        location: &str,
        except: Option<PlacementId>,
    ) -> bool {
        self.placements.iter().any(|p| {
            Some(p.id) != except && p.article_id == article_id && p.location == location
        })
    }
}
