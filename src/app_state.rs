use std::sync::Arc;

use crate::api::catalog::BookCatalog;
use crate::service::{cart::CartService, orders::OrderService};
use crate::store::{CartStore, OrderStore};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub carts: CartService,
    pub orders: OrderService,
}

impl AppState {
    pub fn new(
        cart_store: Arc<dyn CartStore>,
        order_store: Arc<dyn OrderStore>,
        catalog: Arc<dyn BookCatalog>,
    ) -> Self {
        Self {
            carts: CartService::new(cart_store, catalog.clone()),
            orders: OrderService::new(order_store, catalog),
        }
    }
}
