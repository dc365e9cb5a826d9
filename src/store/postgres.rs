use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use crate::api::catalog::BookCatalog;
use crate::app_error::CartError;
use crate::db::DbPool;
use crate::models::{
    CartEntity, CartItemEntity, CreateCartEntity, CreateCartItemEntity, CreateOrderEntity,
    CreateOrderItemEntity, OrderEntity, OrderItemEntity,
};
use crate::schema::{cart_items, carts, order_items, orders};

/// Relational store backed by Postgres.
///
/// Per-user serialization is a row-level lock: every mutating operation
/// upserts the user's cart row (the unique index on `user_id` backs
/// find-or-create) and then selects it `FOR UPDATE` for the duration of the
/// transaction. Serialization failures surface as `ConcurrencyConflict` and
/// are retried by the service layer.
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Insert the cart row if missing, then take the per-user lock on it.
async fn lock_or_create_cart(
    conn: &mut diesel_async::AsyncPgConnection,
    user_id: Uuid,
) -> Result<CartEntity, CartError> {
    diesel::insert_into(carts::table)
        .values(CreateCartEntity { user_id })
        .on_conflict(carts::user_id)
        .do_nothing()
        .execute(conn)
        .await?;

    let cart: CartEntity = carts::table
        .filter(carts::user_id.eq(user_id))
        .for_update()
        .get_result(conn)
        .await?;

    Ok(cart)
}

/// Take the per-user lock on an existing cart row.
async fn lock_cart(
    conn: &mut diesel_async::AsyncPgConnection,
    user_id: Uuid,
) -> Result<CartEntity, CartError> {
    carts::table
        .filter(carts::user_id.eq(user_id))
        .for_update()
        .get_result(conn)
        .await
        .optional()?
        .ok_or(CartError::CartNotFound)
}

#[async_trait]
impl super::CartStore for PgStore {
    async fn add_item(
        &self,
        user_id: Uuid,
        book_id: i32,
        qty: i32,
        catalog: Arc<dyn BookCatalog>,
    ) -> Result<i64, CartError> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        conn.transaction(move |conn| {
            Box::pin(async move {
                let cart = lock_or_create_cart(conn, user_id).await?;

                let existing: Option<CartItemEntity> = cart_items::table
                    .find((cart.id, book_id))
                    .get_result(conn)
                    .await
                    .optional()?;

                match existing {
                    Some(_) => {
                        // Repeated add: the unit price captured on first add
                        // is deliberately not refreshed.
                        diesel::update(cart_items::table.find((cart.id, book_id)))
                            .set((
                                cart_items::quantity.eq(cart_items::quantity + qty),
                                cart_items::updated_at.eq(diesel::dsl::now),
                            ))
                            .execute(conn)
                            .await?;
                    }
                    None => {
                        let unit_price = catalog
                            .unit_price(book_id)
                            .await?
                            .ok_or(CartError::BookNotFound(book_id))?;

                        diesel::insert_into(cart_items::table)
                            .values(CreateCartItemEntity {
                                cart_id: cart.id,
                                book_id,
                                quantity: qty,
                                unit_price,
                            })
                            .execute(conn)
                            .await?;
                    }
                }

                diesel::update(carts::table.find(cart.id))
                    .set(carts::updated_at.eq(diesel::dsl::now))
                    .execute(conn)
                    .await?;

                let count: i64 = cart_items::table
                    .filter(cart_items::cart_id.eq(cart.id))
                    .count()
                    .get_result(conn)
                    .await?;

                Ok::<i64, CartError>(count)
            })
        })
        .await
    }

    async fn remove_item(&self, user_id: Uuid, book_id: i32) -> Result<(), CartError> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        conn.transaction(move |conn| {
            Box::pin(async move {
                let cart = lock_cart(conn, user_id).await?;

                let line: CartItemEntity = cart_items::table
                    .find((cart.id, book_id))
                    .get_result(conn)
                    .await
                    .optional()?
                    .ok_or(CartError::LineNotFound(book_id))?;

                if line.quantity <= 1 {
                    diesel::delete(cart_items::table.find((cart.id, book_id)))
                        .execute(conn)
                        .await?;
                } else {
                    diesel::update(cart_items::table.find((cart.id, book_id)))
                        .set((
                            cart_items::quantity.eq(cart_items::quantity - 1),
                            cart_items::updated_at.eq(diesel::dsl::now),
                        ))
                        .execute(conn)
                        .await?;
                }

                diesel::update(carts::table.find(cart.id))
                    .set(carts::updated_at.eq(diesel::dsl::now))
                    .execute(conn)
                    .await?;

                Ok::<(), CartError>(())
            })
        })
        .await
    }

    async fn cart_with_lines(
        &self,
        user_id: Uuid,
    ) -> Result<Option<(CartEntity, Vec<CartItemEntity>)>, CartError> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let cart: Option<CartEntity> = carts::table
            .filter(carts::user_id.eq(user_id))
            .get_result(conn)
            .await
            .optional()?;

        let Some(cart) = cart else {
            return Ok(None);
        };

        let lines: Vec<CartItemEntity> = cart_items::table
            .filter(cart_items::cart_id.eq(cart.id))
            .order_by(cart_items::book_id.asc())
            .get_results(conn)
            .await?;

        Ok(Some((cart, lines)))
    }

    async fn item_count(&self, user_id: Uuid) -> Result<i64, CartError> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let count: i64 = cart_items::table
            .inner_join(carts::table)
            .filter(carts::user_id.eq(user_id))
            .count()
            .get_result(conn)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl super::OrderStore for PgStore {
    async fn checkout_cart(&self, user_id: Uuid) -> Result<OrderEntity, CartError> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        conn.transaction(move |conn| {
            Box::pin(async move {
                let cart = lock_cart(conn, user_id).await?;

                // Re-read the lines inside the transaction; a snapshot taken
                // before the lock could be stale.
                let lines: Vec<CartItemEntity> = cart_items::table
                    .filter(cart_items::cart_id.eq(cart.id))
                    .order_by(cart_items::book_id.asc())
                    .get_results(conn)
                    .await?;

                if lines.is_empty() {
                    return Err(CartError::EmptyCart);
                }

                let order: OrderEntity = diesel::insert_into(orders::table)
                    .values(CreateOrderEntity {
                        user_id,
                        status: "PENDING".into(),
                    })
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await?;

                let order_lines: Vec<CreateOrderItemEntity> = lines
                    .iter()
                    .map(|line| CreateOrderItemEntity {
                        order_id: order.id,
                        book_id: line.book_id,
                        quantity: line.quantity,
                        unit_price: line.unit_price,
                    })
                    .collect();

                diesel::insert_into(order_items::table)
                    .values(order_lines)
                    .execute(conn)
                    .await?;

                diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id)))
                    .execute(conn)
                    .await?;

                diesel::update(carts::table.find(cart.id))
                    .set(carts::updated_at.eq(diesel::dsl::now))
                    .execute(conn)
                    .await?;

                Ok::<OrderEntity, CartError>(order)
            })
        })
        .await
    }

    async fn orders_with_lines(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(OrderEntity, Vec<OrderItemEntity>)>, CartError> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let user_orders: Vec<OrderEntity> = orders::table
            .filter(orders::user_id.eq(user_id))
            .filter(orders::is_deleted.eq(false))
            .order_by(orders::created_at.desc())
            .get_results(conn)
            .await?;

        let order_ids: Vec<i32> = user_orders.iter().map(|order| order.id).collect();

        let lines: Vec<OrderItemEntity> = order_items::table
            .filter(order_items::order_id.eq_any(&order_ids))
            .get_results(conn)
            .await?;

        let mut group: HashMap<i32, Vec<OrderItemEntity>> = HashMap::new();
        for line in lines {
            group.entry(line.order_id).or_default().push(line);
        }

        Ok(user_orders
            .into_iter()
            .map(|order| {
                let lines = group.remove(&order.id).unwrap_or_default();
                (order, lines)
            })
            .collect())
    }
}
