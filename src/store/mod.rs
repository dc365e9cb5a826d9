//! Storage backends for carts and orders.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::api::catalog::BookCatalog;
use crate::app_error::CartError;
use crate::models::{CartEntity, CartItemEntity, OrderEntity, OrderItemEntity};

pub mod memory;
pub mod postgres;

/// Storage for the single active cart each user owns.
///
/// Implementations must serialize mutations per user: two concurrent
/// `add_item` calls for the same user must both be reflected in the final
/// quantity. Operations for different users must not contend.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Upsert a line into the user's cart, creating the cart if it does not
    /// exist yet. An existing line has its quantity incremented; a new line
    /// captures the unit price from `catalog` at this moment. The whole
    /// operation is atomic. Returns the distinct-line count of the cart.
    async fn add_item(
        &self,
        user_id: Uuid,
        book_id: i32,
        qty: i32,
        catalog: Arc<dyn BookCatalog>,
    ) -> Result<i64, CartError>;

    /// Remove one unit of a book from the user's cart. A line at quantity 1
    /// is deleted outright; a quantity never drops to 0.
    async fn remove_item(&self, user_id: Uuid, book_id: i32) -> Result<(), CartError>;

    /// The user's cart and its lines, or `None` if no cart exists.
    async fn cart_with_lines(
        &self,
        user_id: Uuid,
    ) -> Result<Option<(CartEntity, Vec<CartItemEntity>)>, CartError>;

    /// Distinct-line count of the user's cart, 0 if no cart exists.
    async fn item_count(&self, user_id: Uuid) -> Result<i64, CartError>;
}

/// Append-only storage of completed orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Atomically snapshot the user's cart into a new order and empty the
    /// cart. Either the order with all its lines becomes durable and the
    /// cart is left empty, or nothing changes at all.
    async fn checkout_cart(&self, user_id: Uuid) -> Result<OrderEntity, CartError>;

    /// The user's order history with line items, most recent first.
    /// Soft-deleted orders are excluded.
    async fn orders_with_lines(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(OrderEntity, Vec<OrderItemEntity>)>, CartError>;
}
