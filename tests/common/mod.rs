#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use bookstore_cartservice::api::catalog::{Book, BookCatalog};
use bookstore_cartservice::app_error::CartError;
use bookstore_cartservice::service::{cart::CartService, orders::OrderService};
use bookstore_cartservice::store::memory::MemoryStore;

/// Catalog stub with adjustable prices and a lookup counter, so tests can
/// assert when the price is (and is not) consulted.
pub struct MockCatalog {
    books: RwLock<HashMap<i32, Book>>,
    price_lookups: AtomicUsize,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
            price_lookups: AtomicUsize::new(0),
        }
    }

    pub async fn put_book(&self, id: i32, title: &str, unit_price: Decimal) {
        self.books.write().await.insert(
            id,
            Book {
                id,
                title: title.into(),
                author: format!("Author of {title}"),
                image_url: None,
                genre: "Fiction".into(),
                unit_price,
            },
        );
    }

    pub async fn set_price(&self, id: i32, unit_price: Decimal) {
        if let Some(book) = self.books.write().await.get_mut(&id) {
            book.unit_price = unit_price;
        }
    }

    pub fn price_lookups(&self) -> usize {
        self.price_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BookCatalog for MockCatalog {
    async fn unit_price(&self, book_id: i32) -> Result<Option<Decimal>, CartError> {
        self.price_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.books.read().await.get(&book_id).map(|b| b.unit_price))
    }

    async fn display_infos(&self, book_ids: Vec<i32>) -> Result<HashMap<i32, Book>, CartError> {
        let books = self.books.read().await;
        Ok(book_ids
            .into_iter()
            .filter_map(|id| books.get(&id).cloned().map(|book| (id, book)))
            .collect())
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub catalog: Arc<MockCatalog>,
    pub carts: CartService,
    pub orders: OrderService,
}

pub fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let catalog = Arc::new(MockCatalog::new());
    TestApp {
        carts: CartService::new(store.clone(), catalog.clone()),
        orders: OrderService::new(store.clone(), catalog.clone()),
        store,
        catalog,
    }
}

pub fn price(value: &str) -> Decimal {
    value.parse().expect("valid decimal literal")
}
