//! In-memory store used by the test suite and local development.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::api::catalog::BookCatalog;
use crate::app_error::CartError;
use crate::models::{CartEntity, CartItemEntity, OrderEntity, OrderItemEntity};

struct CartState {
    entity: CartEntity,
    lines: Vec<CartItemEntity>,
}

#[derive(Default)]
struct UserState {
    cart: Option<CartState>,
    orders: Vec<(OrderEntity, Vec<OrderItemEntity>)>,
}

/// Mirrors the relational store's contract: one async mutex per user
/// serializes that user's mutations while leaving other users untouched.
/// The injection switches simulate storage faults that the real backend can
/// produce, so the service-level failure paths are exercisable without a
/// database.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, Arc<Mutex<UserState>>>>,
    next_cart_id: AtomicI32,
    next_order_id: AtomicI32,
    fail_next_checkout: AtomicBool,
    conflicts_to_inject: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next checkout fail after the order row would have been
    /// created, as an injected storage fault. Nothing is left behind.
    pub fn set_fail_next_checkout(&self, fail: bool) {
        self.fail_next_checkout.store(fail, Ordering::SeqCst);
    }

    /// Make the next `n` mutating calls report a serialization conflict.
    pub fn inject_conflicts(&self, n: usize) {
        self.conflicts_to_inject.store(n, Ordering::SeqCst);
    }

    fn take_injected_conflict(&self) -> bool {
        self.conflicts_to_inject
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn user_state(&self, user_id: Uuid) -> Arc<Mutex<UserState>> {
        if let Some(state) = self.users.read().await.get(&user_id) {
            return state.clone();
        }
        self.users
            .write()
            .await
            .entry(user_id)
            .or_default()
            .clone()
    }
}

#[async_trait]
impl super::CartStore for MemoryStore {
    async fn add_item(
        &self,
        user_id: Uuid,
        book_id: i32,
        qty: i32,
        catalog: Arc<dyn BookCatalog>,
    ) -> Result<i64, CartError> {
        if self.take_injected_conflict() {
            return Err(CartError::ConcurrencyConflict);
        }

        let state = self.user_state(user_id).await;
        let mut state = state.lock().await;

        let line_exists = state
            .cart
            .as_ref()
            .is_some_and(|cart| cart.lines.iter().any(|line| line.book_id == book_id));

        // Resolve the price before mutating anything, so a missing book
        // leaves no half-created cart behind.
        let unit_price = if line_exists {
            None
        } else {
            Some(
                catalog
                    .unit_price(book_id)
                    .await?
                    .ok_or(CartError::BookNotFound(book_id))?,
            )
        };

        let now = Utc::now();
        let cart = state.cart.get_or_insert_with(|| CartState {
            entity: CartEntity {
                id: self.next_cart_id.fetch_add(1, Ordering::SeqCst) + 1,
                user_id,
                created_at: now,
                updated_at: now,
            },
            lines: Vec::new(),
        });

        match cart.lines.iter_mut().find(|line| line.book_id == book_id) {
            Some(line) => {
                line.quantity += qty;
                line.updated_at = now;
            }
            None => cart.lines.push(CartItemEntity {
                cart_id: cart.entity.id,
                book_id,
                quantity: qty,
                unit_price: unit_price.expect("price resolved for new line"),
                created_at: now,
                updated_at: now,
            }),
        }
        cart.entity.updated_at = now;

        Ok(cart.lines.len() as i64)
    }

    async fn remove_item(&self, user_id: Uuid, book_id: i32) -> Result<(), CartError> {
        if self.take_injected_conflict() {
            return Err(CartError::ConcurrencyConflict);
        }

        let state = self.user_state(user_id).await;
        let mut state = state.lock().await;

        let cart = state.cart.as_mut().ok_or(CartError::CartNotFound)?;
        let index = cart
            .lines
            .iter()
            .position(|line| line.book_id == book_id)
            .ok_or(CartError::LineNotFound(book_id))?;

        let now = Utc::now();
        if cart.lines[index].quantity <= 1 {
            cart.lines.remove(index);
        } else {
            cart.lines[index].quantity -= 1;
            cart.lines[index].updated_at = now;
        }
        cart.entity.updated_at = now;

        Ok(())
    }

    async fn cart_with_lines(
        &self,
        user_id: Uuid,
    ) -> Result<Option<(CartEntity, Vec<CartItemEntity>)>, CartError> {
        let state = self.user_state(user_id).await;
        let state = state.lock().await;

        Ok(state.cart.as_ref().map(|cart| {
            let mut lines = cart.lines.clone();
            lines.sort_by_key(|line| line.book_id);
            (cart.entity.clone(), lines)
        }))
    }

    async fn item_count(&self, user_id: Uuid) -> Result<i64, CartError> {
        let state = self.user_state(user_id).await;
        let state = state.lock().await;

        Ok(state
            .cart
            .as_ref()
            .map_or(0, |cart| cart.lines.len() as i64))
    }
}

#[async_trait]
impl super::OrderStore for MemoryStore {
    async fn checkout_cart(&self, user_id: Uuid) -> Result<OrderEntity, CartError> {
        if self.take_injected_conflict() {
            return Err(CartError::ConcurrencyConflict);
        }

        let state = self.user_state(user_id).await;
        let mut state = state.lock().await;

        let cart = state.cart.as_ref().ok_or(CartError::CartNotFound)?;
        if cart.lines.is_empty() {
            return Err(CartError::EmptyCart);
        }

        let now = Utc::now();
        let order = OrderEntity {
            id: self.next_order_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id,
            status: "PENDING".into(),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };

        if self.fail_next_checkout.swap(false, Ordering::SeqCst) {
            // The order row would exist at this point in the real backend;
            // returning an error here stands in for the rollback.
            return Err(CartError::Storage(anyhow!(
                "injected storage failure after order insert"
            )));
        }

        let mut lines: Vec<OrderItemEntity> = cart
            .lines
            .iter()
            .map(|line| OrderItemEntity {
                order_id: order.id,
                book_id: line.book_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect();
        lines.sort_by_key(|line| line.book_id);

        let cart = state.cart.as_mut().expect("cart checked above");
        cart.lines.clear();
        cart.entity.updated_at = now;
        state.orders.push((order.clone(), lines));

        Ok(order)
    }

    async fn orders_with_lines(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(OrderEntity, Vec<OrderItemEntity>)>, CartError> {
        let state = self.user_state(user_id).await;
        let state = state.lock().await;

        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|(order, _)| !order.is_deleted)
            .cloned()
            .collect())
    }
}
