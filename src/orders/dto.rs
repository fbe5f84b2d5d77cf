use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{Order, Product, User};

/// Body for creating or renaming a user.
#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ProductRef {
    pub id: i64,
}

/// Body for creating an order, or for replacing one on PUT/PATCH.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub user_id: i64,
    pub total: i64,
    #[serde(default)]
    pub products: Vec<ProductRef>,
}

#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub id: i64,
    pub total: i64,
}

impl From<Order> for OrderSummary {
    fn from(o: Order) -> Self {
        Self { id: o.id, total: o.total }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDetails {
    pub id: i64,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
    pub orders: Vec<OrderSummary>,
}

impl UserDetails {
    pub fn new(user: User, orders: Vec<Order>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            date_joined: user.date_joined,
            orders: orders.into_iter().map(OrderSummary::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct OrderDetails {
    pub id: i64,
    pub total: i64,
    pub user: UserRef,
    pub products: Vec<Product>,
}
