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

//! HTTP API.
//!
//! ```bash
//! # Register and keep the token
//! curl -X POST http://localhost:3000/register \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Juan", "email": "juan@example.com", "password": "password123",
//!        "password_confirmation": "password123", "cedula": "001-1234567-8",
//!        "phone_number": "809-123-4567", "blood_type": "O+"}'
//!
//! # Record a purchase
//! curl -X POST http://localhost:3000/purchases \
//!   -H "Authorization: Bearer $TOKEN" -H "Content-Type: application/json" \
//!   -d '{"client_id": 1, "article_id": 1, "placement_id": 1, "quantity": 3, "unit_price": 100}'
//!
//! # Filter articles
//! curl -H "Authorization: Bearer $TOKEN" \
//!   "http://localhost:3000/articles?manufacturer=Sony&description=Android"
//! ```

use crate::article::{ArticleChanges, NewArticle};
use crate::auth::{self, Credentials, Sessions};
use crate::base::{ArticleId, ClientId, EntityId, PlacementId, PurchaseId, UserId};
use crate::client::{ClientChanges, NewClient};
use crate::error::InventoryError;
use crate::placement::{NewPlacement, PlacementChanges};
use crate::purchase::{NewPurchase, PurchaseChanges};
use crate::query::{ArticleFilter, ListParams, Page, PlacementFilter, PurchaseFilter};
use crate::resource::{
    ArticleResource, ClientResource, PlacementResource, PurchaseResource, UserResource,
};
use crate::store::Store;
use crate::user::{NewUser, Signup, User, UserChanges};
use crate::validation::ValidationErrors;
use axum::{
    Extension, Json, Router,
    extract::{
        FromRequestParts, Path, Query, Request, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode, header, request::Parts},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

// === Response envelopes ===

/// Single-record envelope: `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub message: &'static str,
    pub errors: ValidationErrors,
}

#[derive(Debug, Serialize)]
pub struct Links {
    pub first: String,
    pub last: String,
    pub prev: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Meta {
    pub current_page: usize,
    pub from: Option<usize>,
    pub last_page: usize,
    pub path: &'static str,
    pub per_page: usize,
    pub to: Option<usize>,
    pub total: usize,
}

/// Paginated envelope: `{"data": [...], "links": {...}, "meta": {...}}`.
#[derive(Debug, Serialize)]
pub struct Listing<T> {
    pub data: Vec<T>,
    pub links: Links,
    pub meta: Meta,
}

impl<T> Listing<T> {
    fn new(path: &'static str, page: Page<T>) -> Self {
        let link = |n: usize| format!("{path}?page={n}");
        let last_page = page.last_page();
        let current = page.current_page;
        Listing {
            links: Links {
                first: link(1),
                last: link(last_page),
                prev: (current > 1).then(|| link(current - 1)),
                next: (current < last_page).then(|| link(current + 1)),
            },
            meta: Meta {
                current_page: current,
                from: page.from(),
                last_page,
                path,
                per_page: page.per_page,
                to: page.to(),
                total: page.total,
            },
            data: page.items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: UserResource,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<&'static str>,
}

// === Application State ===

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub sessions: Arc<Sessions>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        AppState {
            store: Arc::new(store),
            sessions: Arc::new(Sessions::new()),
        }
    }
}

/// The authenticated caller, inserted by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

// === Error Handling ===

/// Wrapper for converting [`InventoryError`] into HTTP responses.
pub struct AppError(InventoryError);

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        AppError(err)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError(InventoryError::Validation(errors))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        ValidationErrors::single("body", rejection.body_text()).into()
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        ValidationErrors::single("query", rejection.body_text()).into()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            InventoryError::Validation(errors) => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(ValidationResponse {
                        message: "The given data was invalid.",
                        errors: errors.clone(),
                    }),
                )
                    .into_response();
            }
            InventoryError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            InventoryError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            InventoryError::Unauthorized => (StatusCode::FORBIDDEN, "UNAUTHORIZED"),
            InventoryError::Integrity(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INTEGRITY_VIOLATION")
            }
            InventoryError::Internal(detail) => {
                error!(%detail, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let message = match &self.0 {
            InventoryError::Unauthenticated => "Unauthenticated.".to_string(),
            InventoryError::Internal(_) => "Server Error".to_string(),
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { message, code })).into_response()
    }
}

/// Record id taken from the `{id}` path segment.
///
/// A segment that does not parse as an id is a 404 in the usual envelope.
struct Id<I>(I);

impl<S, I> FromRequestParts<S> for Id<I>
where
    S: Send + Sync,
    I: EntityId + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let raw = Path::<String>::from_request_parts(parts, state)
            .await
            .map(|Path(raw)| raw)
            .unwrap_or_default();
        raw.parse()
            .map(Id)
            .map_err(|_| InventoryError::not_found(I::ENTITY, &raw).into())
    }
}

type Created<T> = (StatusCode, Json<Data<T>>);

fn created<T>(data: T) -> Created<T> {
    (StatusCode::CREATED, Json(Data { data }))
}

fn deleted(entity: &str) -> Json<Message> {
    Json(Message {
        message: format!("{entity} deleted successfully"),
    })
}

// === Authentication ===

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Rejects requests without a live bearer token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or(InventoryError::Unauthenticated)?;
    let user = state.sessions.authenticate(&state.store, &token)?;
    request
        .extensions_mut()
        .insert(CurrentUser { user, token });
    Ok(next.run(request).await)
}

/// POST /register
async fn register(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let Json(input) = payload?;
    let issued = auth::register(&state.store, &state.sessions, &input)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            user: UserResource::from(&issued.user),
            token: issued.token,
            token_type: None,
        }),
    ))
}

/// POST /login
async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(credentials) = payload?;
    let issued = auth::login(&state.store, &state.sessions, &credentials)?;
    Ok(Json(AuthResponse {
        message: "Login successful",
        user: UserResource::from(&issued.user),
        token: issued.token,
        token_type: Some("Bearer"),
    }))
}

/// POST /logout
async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Json<Message> {
    state.sessions.revoke(&current.token);
    info!(user_id = %current.user.id, "user logged out");
    Json(Message {
        message: "Logged out successfully".to_string(),
    })
}

/// GET /me
async fn me(Extension(current): Extension<CurrentUser>) -> Json<Data<UserResource>> {
    Json(Data {
        data: UserResource::from(&current.user),
    })
}

// === Users ===

async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Listing<UserResource>> {
    let page = state.store.list_users(params.page());
    Json(Listing::new("/users", page.map(|u| UserResource::from(&u))))
}

async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<Created<UserResource>, AppError> {
    let Json(input) = payload?;
    let user = state.store.create_user(&input, Signup::Admin)?;
    Ok(created(UserResource::from(&user)))
}

async fn show_user(
    State(state): State<AppState>,
    Id(id): Id<UserId>,
) -> Result<Json<Data<UserResource>>, AppError> {
    let user = state.store.user(id)?;
    Ok(Json(Data {
        data: UserResource::from(&user),
    }))
}

async fn update_user(
    State(state): State<AppState>,
    Id(id): Id<UserId>,
    payload: Result<Json<UserChanges>, JsonRejection>,
) -> Result<Json<Data<UserResource>>, AppError> {
    let Json(changes) = payload?;
    let user = state.store.update_user(id, &changes)?;
    Ok(Json(Data {
        data: UserResource::from(&user),
    }))
}

async fn delete_user(
    State(state): State<AppState>,
    Id(id): Id<UserId>,
) -> Result<Json<Message>, AppError> {
    state.store.delete_user(id)?;
    state.sessions.revoke_user(id);
    Ok(deleted("User"))
}

// === Clients ===

async fn list_clients(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Listing<ClientResource>> {
    let page = state.store.list_clients(params.page());
    Json(Listing::new("/clients", page.map(|c| ClientResource::from(&c))))
}

async fn create_client(
    State(state): State<AppState>,
    payload: Result<Json<NewClient>, JsonRejection>,
) -> Result<Created<ClientResource>, AppError> {
    let Json(input) = payload?;
    let client = state.store.create_client(&input)?;
    Ok(created(ClientResource::from(&client)))
}

async fn show_client(
    State(state): State<AppState>,
    Id(id): Id<ClientId>,
) -> Result<Json<Data<ClientResource>>, AppError> {
    let client = state.store.client(id)?;
    Ok(Json(Data {
        data: ClientResource::from(&client),
    }))
}

async fn update_client(
    State(state): State<AppState>,
    Id(id): Id<ClientId>,
    payload: Result<Json<ClientChanges>, JsonRejection>,
) -> Result<Json<Data<ClientResource>>, AppError> {
    let Json(changes) = payload?;
    let client = state.store.update_client(id, &changes)?;
    Ok(Json(Data {
        data: ClientResource::from(&client),
    }))
}

async fn delete_client(
    State(state): State<AppState>,
    Id(id): Id<ClientId>,
) -> Result<Json<Message>, AppError> {
    state.store.delete_client(id)?;
    Ok(deleted("Client"))
}

// === Articles ===

async fn list_articles(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    filter: Result<Query<ArticleFilter>, QueryRejection>,
) -> Result<Json<Listing<ArticleResource>>, AppError> {
    let Query(filter) = filter?;
    let page = state.store.list_articles(&filter, params.page());
    Ok(Json(Listing::new(
        "/articles",
        page.map(|a| ArticleResource::from(&a)),
    )))
}

async fn create_article(
    State(state): State<AppState>,
    payload: Result<Json<NewArticle>, JsonRejection>,
) -> Result<Created<ArticleResource>, AppError> {
    let Json(input) = payload?;
    let article = state.store.create_article(&input)?;
    Ok(created(ArticleResource::from(&article)))
}

async fn show_article(
    State(state): State<AppState>,
    Id(id): Id<ArticleId>,
) -> Result<Json<Data<ArticleResource>>, AppError> {
    let article = state.store.article(id)?;
    Ok(Json(Data {
        data: ArticleResource::from(&article),
    }))
}

async fn update_article(
    State(state): State<AppState>,
    Id(id): Id<ArticleId>,
    payload: Result<Json<ArticleChanges>, JsonRejection>,
) -> Result<Json<Data<ArticleResource>>, AppError> {
    let Json(changes) = payload?;
    let article = state.store.update_article(id, &changes)?;
    Ok(Json(Data {
        data: ArticleResource::from(&article),
    }))
}

async fn delete_article(
    State(state): State<AppState>,
    Id(id): Id<ArticleId>,
) -> Result<Json<Message>, AppError> {
    state.store.delete_article(id)?;
    Ok(deleted("Article"))
}

// === Placements ===

async fn list_placements(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    filter: Result<Query<PlacementFilter>, QueryRejection>,
) -> Result<Json<Listing<PlacementResource>>, AppError> {
    let Query(filter) = filter?;
    let store = &state.store;
    let page = store.list_placements(&filter, params.page());
    Ok(Json(Listing::new(
        "/placements",
        page.map(|p| PlacementResource::load(store, &p)),
    )))
}

async fn create_placement(
    State(state): State<AppState>,
    payload: Result<Json<NewPlacement>, JsonRejection>,
) -> Result<Created<PlacementResource>, AppError> {
    let Json(input) = payload?;
    let placement = state.store.create_placement(&input)?;
    Ok(created(PlacementResource::load(&state.store, &placement)))
}

async fn show_placement(
    State(state): State<AppState>,
    Id(id): Id<PlacementId>,
) -> Result<Json<Data<PlacementResource>>, AppError> {
    let placement = state.store.placement(id)?;
    Ok(Json(Data {
        data: PlacementResource::load(&state.store, &placement),
    }))
}

async fn update_placement(
    State(state): State<AppState>,
    Id(id): Id<PlacementId>,
    payload: Result<Json<PlacementChanges>, JsonRejection>,
) -> Result<Json<Data<PlacementResource>>, AppError> {
    let Json(changes) = payload?;
    let placement = state.store.update_placement(id, &changes)?;
    Ok(Json(Data {
        data: PlacementResource::load(&state.store, &placement),
    }))
}

async fn delete_placement(
    State(state): State<AppState>,
    Id(id): Id<PlacementId>,
) -> Result<Json<Message>, AppError> {
    state.store.delete_placement(id)?;
    Ok(deleted("Placement"))
}

// === Purchases ===

async fn list_purchases(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    filter: Result<Query<PurchaseFilter>, QueryRejection>,
) -> Result<Json<Listing<PurchaseResource>>, AppError> {
    let Query(filter) = filter?;
    let store = &state.store;
    let page = store.list_purchases(&filter, params.page());
    Ok(Json(Listing::new(
        "/purchases",
        page.map(|p| PurchaseResource::load(store, &p)),
    )))
}

/// POST /purchases - Records a purchase, accumulating onto an existing
/// row for the same client, article and placement. 201 either way.
async fn create_purchase(
    State(state): State<AppState>,
    payload: Result<Json<NewPurchase>, JsonRejection>,
) -> Result<Created<PurchaseResource>, AppError> {
    let Json(input) = payload?;
    let (purchase, _outcome) = state.store.create_purchase(&input)?;
    Ok(created(PurchaseResource::load(&state.store, &purchase)))
}

async fn show_purchase(
    State(state): State<AppState>,
    Id(id): Id<PurchaseId>,
) -> Result<Json<Data<PurchaseResource>>, AppError> {
    let purchase = state.store.purchase(id)?;
    Ok(Json(Data {
        data: PurchaseResource::load(&state.store, &purchase),
    }))
}

async fn update_purchase(
    State(state): State<AppState>,
    Id(id): Id<PurchaseId>,
    payload: Result<Json<PurchaseChanges>, JsonRejection>,
) -> Result<Json<Data<PurchaseResource>>, AppError> {
    let Json(changes) = payload?;
    let purchase = state.store.update_purchase(id, &changes)?;
    Ok(Json(Data {
        data: PurchaseResource::load(&state.store, &purchase),
    }))
}

async fn delete_purchase(
    State(state): State<AppState>,
    Id(id): Id<PurchaseId>,
) -> Result<Json<Message>, AppError> {
    state.store.delete_purchase(id)?;
    Ok(deleted("Purchase"))
}

// === Router ===

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(show_user)
                .put(update_user)
                .patch(update_user)
                .delete(delete_user),
        )
        .route("/clients", get(list_clients).post(create_client))
        .route(
            "/clients/{id}",
            get(show_client)
                .put(update_client)
                .patch(update_client)
                .delete(delete_client),
        )
        .route("/articles", get(list_articles).post(create_article))
        .route(
            "/articles/{id}",
            get(show_article)
                .put(update_article)
                .patch(update_article)
                .delete(delete_article),
        )
        .route("/placements", get(list_placements).post(create_placement))
        .route(
            "/placements/{id}",
            get(show_placement)
                .put(update_placement)
                .patch(update_placement)
                .delete(delete_placement),
        )
        .route("/purchases", get(list_purchases).post(create_purchase))
        .route(
            "/purchases/{id}",
            get(show_purchase)
                .put(update_purchase)
                .patch(update_purchase)
                .delete(delete_purchase),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
        .with_state(state)
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
