use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::catalog::BookCatalog;
use crate::app_error::CartError;
use crate::models::OrderEntity;
use crate::store::OrderStore;

use super::MAX_CONFLICT_ATTEMPTS;

#[derive(Serialize, Debug, ToSchema)]
pub struct OrderLineView {
    pub book_id: i32,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub line_total: Decimal,
    pub title: String,
    pub author: String,
    pub image_url: Option<String>,
    pub genre: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct OrderView {
    pub order: OrderEntity,
    pub lines: Vec<OrderLineView>,
    #[schema(value_type = String)]
    pub total_price: Decimal,
}

/// The checkout state transition and the order history projection.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    catalog: Arc<dyn BookCatalog>,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, catalog: Arc<dyn BookCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Snapshot the user's cart into a new order and empty the cart, as one
    /// atomic unit of work. Any storage failure inside the transaction is
    /// rolled back in full and reported as `CheckoutFailed`.
    ///
    /// Checkout is not idempotent: a second call with no intervening add
    /// yields `EmptyCart`. There is no idempotency token, so a client retry
    /// after a commit whose response was lost observes `EmptyCart` with no
    /// way to recover the order id — a known gap inherited from the system
    /// this replaces.
    pub async fn checkout(&self, user_id: Uuid) -> Result<OrderEntity, CartError> {
        if user_id.is_nil() {
            return Err(CartError::Unauthenticated);
        }

        let mut attempt = 1;
        loop {
            match self.store.checkout_cart(user_id).await {
                Err(CartError::ConcurrencyConflict) if attempt < MAX_CONFLICT_ATTEMPTS => {
                    tracing::warn!(%user_id, attempt, "Conflicting checkout, retrying");
                    attempt += 1;
                }
                Err(CartError::Storage(err)) => {
                    tracing::error!(%user_id, error = %err, "Checkout rolled back");
                    return Err(CartError::CheckoutFailed);
                }
                Ok(order) => {
                    tracing::info!(%user_id, order_id = order.id, "Checked out cart");
                    return Ok(order);
                }
                result => return result,
            }
        }
    }

    /// The user's completed orders with line details and catalog display
    /// attributes, most recent first.
    pub async fn my_orders(&self, user_id: Uuid) -> Result<Vec<OrderView>, CartError> {
        if user_id.is_nil() {
            return Err(CartError::Unauthenticated);
        }

        let orders = self.store.orders_with_lines(user_id).await?;

        let book_ids: Vec<i32> = orders
            .iter()
            .flat_map(|(_, lines)| lines.iter().map(|line| line.book_id))
            .collect();
        let books = self.catalog.display_infos(book_ids).await?;

        Ok(orders
            .into_iter()
            .map(|(order, lines)| {
                let mut total_price = Decimal::ZERO;
                let lines = lines
                    .into_iter()
                    .map(|line| {
                        let line_total = line.unit_price * Decimal::from(line.quantity);
                        total_price += line_total;
                        let book = books.get(&line.book_id);
                        OrderLineView {
                            book_id: line.book_id,
                            quantity: line.quantity,
                            unit_price: line.unit_price,
                            line_total,
                            title: book.map(|b| b.title.clone()).unwrap_or_default(),
                            author: book.map(|b| b.author.clone()).unwrap_or_default(),
                            image_url: book.and_then(|b| b.image_url.clone()),
                            genre: book.map(|b| b.genre.clone()).unwrap_or_default(),
                        }
                    })
                    .collect();
                OrderView {
                    order,
                    lines,
                    total_price,
                }
            })
            .collect())
    }
}
