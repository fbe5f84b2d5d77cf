use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Customer. One user has many orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub total: i64,
    pub user_id: i64, // owning user
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
}

/// One row of the order/product association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderProduct {
    pub order_id: i64,
    pub product_id: i64,
}
