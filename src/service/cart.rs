use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::catalog::BookCatalog;
use crate::app_error::CartError;
use crate::models::CartEntity;
use crate::store::CartStore;

use super::MAX_CONFLICT_ATTEMPTS;

#[derive(Serialize, Debug, ToSchema)]
pub struct CartLineView {
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

/// Full cart projection for the cart page. `cart` is `None` when the user
/// has never added anything.
#[derive(Serialize, Debug, ToSchema)]
pub struct CartView {
    pub cart: Option<CartEntity>,
    pub lines: Vec<CartLineView>,
    #[schema(value_type = String)]
    pub total_price: Decimal,
}

/// Mutation API over a user's cart. Owns validation and the bounded retry on
/// conflicting writes; per-user serialization itself lives in the store.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CartStore>,
    catalog: Arc<dyn BookCatalog>,
}

impl CartService {
    pub fn new(store: Arc<dyn CartStore>, catalog: Arc<dyn BookCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Add `qty` units of a book to the user's cart, creating the cart on
    /// first use. A repeated add increments the existing line and does not
    /// refresh its captured unit price. Returns the distinct-line count.
    pub async fn add_item(
        &self,
        user_id: Uuid,
        book_id: i32,
        qty: i32,
    ) -> Result<i64, CartError> {
        if user_id.is_nil() {
            return Err(CartError::Unauthenticated);
        }
        if qty < 1 {
            return Err(CartError::InvalidQuantity(qty));
        }

        let mut attempt = 1;
        loop {
            match self
                .store
                .add_item(user_id, book_id, qty, self.catalog.clone())
                .await
            {
                Err(CartError::ConcurrencyConflict) if attempt < MAX_CONFLICT_ATTEMPTS => {
                    tracing::warn!(%user_id, book_id, attempt, "Conflicting cart update, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Remove one unit of a book from the user's cart. The line is deleted
    /// when its quantity reaches 0; a zero-quantity row is never kept.
    pub async fn remove_item(&self, user_id: Uuid, book_id: i32) -> Result<(), CartError> {
        if user_id.is_nil() {
            return Err(CartError::Unauthenticated);
        }

        let mut attempt = 1;
        loop {
            match self.store.remove_item(user_id, book_id).await {
                Err(CartError::ConcurrencyConflict) if attempt < MAX_CONFLICT_ATTEMPTS => {
                    tracing::warn!(%user_id, book_id, attempt, "Conflicting cart update, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// The user's cart joined with catalog display attributes.
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartView, CartError> {
        if user_id.is_nil() {
            return Err(CartError::Unauthenticated);
        }

        let Some((cart, lines)) = self.store.cart_with_lines(user_id).await? else {
            return Ok(CartView {
                cart: None,
                lines: Vec::new(),
                total_price: Decimal::ZERO,
            });
        };

        let book_ids = lines.iter().map(|line| line.book_id).collect();
        let books = self.catalog.display_infos(book_ids).await?;

        let mut total_price = Decimal::ZERO;
        let lines = lines
            .into_iter()
            .map(|line| {
                let line_total = line.unit_price * Decimal::from(line.quantity);
                total_price += line_total;
                let book = books.get(&line.book_id);
                CartLineView {
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

        Ok(CartView {
            cart: Some(cart),
            lines,
            total_price,
        })
    }

    /// Distinct-line count for the badge poll. Never touches the catalog.
    pub async fn item_count(&self, user_id: Uuid) -> Result<i64, CartError> {
        if user_id.is_nil() {
            return Err(CartError::Unauthenticated);
        }
        self.store.item_count(user_id).await
    }
}
