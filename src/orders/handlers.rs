use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::{
    dto::{OrderDetails, OrderRequest, OrderSummary, ProductRequest, UserDetails, UserRef, UserRequest},
    repo::OrderRepo,
    repo_types::Order,
};
use crate::{error::AppError, state::AppState};

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/:id",
            get(get_user).put(update_user).patch(update_user).delete(delete_user),
        )
        .route("/api/orders", get(list_orders).post(create_order))
        .route(
            "/api/orders/:id",
            get(get_order).put(update_order).patch(update_order).delete(delete_order),
        )
        .route("/api/products", get(list_products).post(create_product))
        .route(
            "/api/products/:id",
            get(get_product)
                .put(update_product)
                .patch(update_product)
                .delete(delete_product),
        )
        .route("/api/products/:id/orders", get(product_orders))
}

fn required_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::MissingField("name"));
    }
    Ok(name)
}

/// Checks the user and every product exist. Returns product ids with
/// duplicates dropped, first occurrence kept.
async fn resolve_order_refs(repo: &dyn OrderRepo, body: &OrderRequest) -> Result<Vec<i64>, AppError> {
    repo.get_user(body.user_id)
        .await?
        .ok_or(AppError::UnknownReference { kind: "user", id: body.user_id })?;

    let mut product_ids: Vec<i64> = Vec::with_capacity(body.products.len());
    for p in &body.products {
        if product_ids.contains(&p.id) {
            continue;
        }
        repo.get_product(p.id)
            .await?
            .ok_or(AppError::UnknownReference { kind: "product", id: p.id })?;
        product_ids.push(p.id);
    }
    Ok(product_ids)
}

async fn order_details(repo: &dyn OrderRepo, order: Order) -> Result<OrderDetails, AppError> {
    let user = repo
        .get_user(order.user_id)
        .await?
        .ok_or(AppError::DanglingReference { kind: "user", id: order.user_id })?;
    let products = repo.order_products(order.id).await?;
    Ok(OrderDetails {
        id: order.id,
        total: order.total,
        user: UserRef { id: user.id, name: user.name },
        products,
    })
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let repo = state.orders.as_ref();
    let mut users = Vec::new();
    for user in repo.list_users().await? {
        let orders = repo.user_orders(user.id).await?;
        users.push(UserDetails::new(user, orders));
    }
    Ok(Json(json!({ "users": users })))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let repo = state.orders.as_ref();
    let user = repo
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))?;
    let orders = repo.user_orders(id).await?;
    Ok(Json(json!({ "user": UserDetails::new(user, orders) })))
}

#[instrument(skip(state, body))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<UserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = required_name(&body.name)?;
    let user = state
        .orders
        .insert_user(name, OffsetDateTime::now_utc())
        .await?;
    info!(user_id = user.id, "user created");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/users/{}", user.id))],
        Json(json!({ "user": UserDetails::new(user, Vec::new()) })),
    ))
}

#[instrument(skip(state, body))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let repo = state.orders.as_ref();
    let name = required_name(&body.name)?;
    let user = repo
        .update_user(id, name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))?;
    info!(user_id = id, "user renamed");
    let orders = repo.user_orders(id).await?;
    Ok(Json(json!({ "user": UserDetails::new(user, orders) })))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !state.orders.delete_user(id).await? {
        return Err(AppError::NotFound(format!("user {id} not found")));
    }
    info!(user_id = id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_orders(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let orders: Vec<OrderSummary> = state
        .orders
        .list_orders()
        .await?
        .into_iter()
        .map(OrderSummary::from)
        .collect();
    Ok(Json(json!({ "orders": orders })))
}

#[instrument(skip(state))]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let repo = state.orders.as_ref();
    let order = repo
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    Ok(Json(json!({ "order": order_details(repo, order).await? })))
}

#[instrument(skip(state, body))]
pub async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<OrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let repo = state.orders.as_ref();
    let product_ids = resolve_order_refs(repo, &body).await?;

    let order = repo.insert_order(body.user_id, body.total, &product_ids).await?;
    info!(order_id = order.id, user_id = order.user_id, products = product_ids.len(), "order created");
    let location = format!("/api/orders/{}", order.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(json!({ "order": order_details(repo, order).await? })),
    ))
}

#[instrument(skip(state, body))]
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<OrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let repo = state.orders.as_ref();
    repo.get_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    let product_ids = resolve_order_refs(repo, &body).await?;

    let order = repo
        .update_order(id, body.user_id, body.total, &product_ids)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    info!(order_id = id, products = product_ids.len(), "order updated");
    Ok(Json(json!({ "order": order_details(repo, order).await? })))
}

#[instrument(skip(state))]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !state.orders.delete_order(id).await? {
        return Err(AppError::NotFound(format!("order {id} not found")));
    }
    info!(order_id = id, "order deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_products(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let products = state.orders.list_products().await?;
    Ok(Json(json!({ "products": products })))
}

#[instrument(skip(state, body))]
pub async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<ProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = required_name(&body.name)?;
    let product = state.orders.insert_product(name).await?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/products/{}", product.id))],
        Json(json!({ "product": product })),
    ))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let product = state
        .orders
        .get_product(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id} not found")))?;
    Ok(Json(json!({ "product": product })))
}

#[instrument(skip(state, body))]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = required_name(&body.name)?;
    let product = state
        .orders
        .update_product(id, name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id} not found")))?;
    Ok(Json(json!({ "product": product })))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !state.orders.delete_product(id).await? {
        return Err(AppError::NotFound(format!("product {id} not found")));
    }
    info!(product_id = id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn product_orders(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let repo = state.orders.as_ref();
    repo.get_product(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id} not found")))?;
    let orders: Vec<OrderSummary> = repo
        .product_orders(id)
        .await?
        .into_iter()
        .map(OrderSummary::from)
        .collect();
    Ok(Json(json!({ "orders": orders })))
}
