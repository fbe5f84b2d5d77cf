use async_trait::async_trait;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use time::OffsetDateTime;

use super::repo_types::{Order, OrderProduct, Product, User};
use crate::{db::PgStore, error::AppError};

#[async_trait]
pub trait OrderRepo: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn insert_user(&self, name: &str, date_joined: OffsetDateTime) -> Result<User, AppError>;
    /// Renames a user. `None` when the id does not exist.
    async fn update_user(&self, id: i64, name: &str) -> Result<Option<User>, AppError>;
    /// Fails with `AppError::Integrity` while orders still reference the user.
    async fn delete_user(&self, id: i64) -> Result<bool, AppError>;
    async fn user_orders(&self, user_id: i64) -> Result<Vec<Order>, AppError>;

    async fn list_orders(&self) -> Result<Vec<Order>, AppError>;
    async fn get_order(&self, id: i64) -> Result<Option<Order>, AppError>;
    /// Inserts the order and its product links in one transaction.
    /// `product_ids` must already be de-duplicated.
    async fn insert_order(
        &self,
        user_id: i64,
        total: i64,
        product_ids: &[i64],
    ) -> Result<Order, AppError>;
    /// Rewrites the order row and replaces its product links wholesale, in one
    /// transaction. `None` when the id does not exist.
    async fn update_order(
        &self,
        id: i64,
        user_id: i64,
        total: i64,
        product_ids: &[i64],
    ) -> Result<Option<Order>, AppError>;
    /// Removes the order together with its product links.
    async fn delete_order(&self, id: i64) -> Result<bool, AppError>;

    async fn list_products(&self) -> Result<Vec<Product>, AppError>;
    async fn get_product(&self, id: i64) -> Result<Option<Product>, AppError>;
    async fn insert_product(&self, name: &str) -> Result<Product, AppError>;
    async fn update_product(&self, id: i64, name: &str) -> Result<Option<Product>, AppError>;
    /// Removes the product and unlinks it from every order.
    async fn delete_product(&self, id: i64) -> Result<bool, AppError>;

    /// Products of an order, in the order they were linked.
    async fn order_products(&self, order_id: i64) -> Result<Vec<Product>, AppError>;
    async fn product_orders(&self, product_id: i64) -> Result<Vec<Order>, AppError>;
}

async fn insert_order_products(
    conn: &mut PgConnection,
    order_id: i64,
    product_ids: &[i64],
) -> Result<(), AppError> {
    if product_ids.is_empty() {
        return Ok(());
    }
    let links: Vec<OrderProduct> = product_ids
        .iter()
        .map(|&product_id| OrderProduct { order_id, product_id })
        .collect();
    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO order_product (order_id, product_id, position) ");
    qb.push_values(links.iter().enumerate(), |mut b, (pos, link)| {
        b.push_bind(link.order_id)
            .push_bind(link.product_id)
            .push_bind(pos as i32);
    });
    qb.build()
        .execute(conn)
        .await
        .map_err(AppError::from_db)?;
    Ok(())
}

#[async_trait]
impl OrderRepo for PgStore {
    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query_as::<_, User>(r#"SELECT id, name, date_joined FROM "user" ORDER BY id"#)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let row =
            sqlx::query_as::<_, User>(r#"SELECT id, name, date_joined FROM "user" WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    async fn insert_user(&self, name: &str, date_joined: OffsetDateTime) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO "user" (name, date_joined)
            VALUES ($1, $2)
            RETURNING id, name, date_joined
            "#,
        )
        .bind(name)
        .bind(date_joined)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from_db)?;
        Ok(user)
    }

    async fn update_user(&self, id: i64, name: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, User>(
            r#"UPDATE "user" SET name = $2 WHERE id = $1 RETURNING id, name, date_joined"#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from_db)?;
        Ok(row)
    }

    async fn delete_user(&self, id: i64) -> Result<bool, AppError> {
        let res = sqlx::query(r#"DELETE FROM "user" WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from_db)?;
        Ok(res.rows_affected() > 0)
    }

    async fn user_orders(&self, user_id: i64) -> Result<Vec<Order>, AppError> {
        let rows = sqlx::query_as::<_, Order>(
            r#"SELECT id, total, user_id FROM "order" WHERE user_id = $1 ORDER BY id"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_orders(&self) -> Result<Vec<Order>, AppError> {
        let rows = sqlx::query_as::<_, Order>(r#"SELECT id, total, user_id FROM "order" ORDER BY id"#)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_order(&self, id: i64) -> Result<Option<Order>, AppError> {
        let row =
            sqlx::query_as::<_, Order>(r#"SELECT id, total, user_id FROM "order" WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    async fn insert_order(
        &self,
        user_id: i64,
        total: i64,
        product_ids: &[i64],
    ) -> Result<Order, AppError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO "order" (total, user_id)
            VALUES ($1, $2)
            RETURNING id, total, user_id
            "#,
        )
        .bind(total)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from_db)?;

        insert_order_products(&mut tx, order.id, product_ids).await?;

        tx.commit().await?;
        Ok(order)
    }

    async fn update_order(
        &self,
        id: i64,
        user_id: i64,
        total: i64,
        product_ids: &[i64],
    ) -> Result<Option<Order>, AppError> {
        let mut tx = self.pool.begin().await?;

        let Some(order) = sqlx::query_as::<_, Order>(
            r#"
            UPDATE "order"
               SET total = $2, user_id = $3
             WHERE id = $1
            RETURNING id, total, user_id
            "#,
        )
        .bind(id)
        .bind(total)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from_db)?
        else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM order_product WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_order_products(&mut tx, id, product_ids).await?;

        tx.commit().await?;
        Ok(Some(order))
    }

    async fn delete_order(&self, id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM order_product WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let res = sqlx::query(r#"DELETE FROM "order" WHERE id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let rows = sqlx::query_as::<_, Product>("SELECT id, name FROM product ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>, AppError> {
        let row = sqlx::query_as::<_, Product>("SELECT id, name FROM product WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_product(&self, name: &str) -> Result<Product, AppError> {
        let row = sqlx::query_as::<_, Product>(
            "INSERT INTO product (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from_db)?;
        Ok(row)
    }

    async fn update_product(&self, id: i64, name: &str) -> Result<Option<Product>, AppError> {
        let row = sqlx::query_as::<_, Product>(
            "UPDATE product SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from_db)?;
        Ok(row)
    }

    async fn delete_product(&self, id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM order_product WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let res = sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    async fn order_products(&self, order_id: i64) -> Result<Vec<Product>, AppError> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT p.id, p.name
              FROM order_product op
              JOIN product p ON p.id = op.product_id
             WHERE op.order_id = $1
             ORDER BY op.position ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn product_orders(&self, product_id: i64) -> Result<Vec<Order>, AppError> {
        let rows = sqlx::query_as::<_, Order>(
            r#"
            SELECT o.id, o.total, o.user_id
              FROM order_product op
              JOIN "order" o ON o.id = op.order_id
             WHERE op.product_id = $1
             ORDER BY o.id ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
