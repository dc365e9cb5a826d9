use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::ApiUrls;
use crate::app_error::CartError;

/// Display and pricing attributes of a catalog book.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub image_url: Option<String>,
    pub genre: String,
    pub unit_price: Decimal,
}

/// The catalog collaborator. The cart core consults it for the unit price of
/// a book on first add and for display attributes when projecting a cart or
/// an order.
#[async_trait]
pub trait BookCatalog: Send + Sync {
    /// Current unit price of a book, or `None` if the book does not exist.
    async fn unit_price(&self, book_id: i32) -> Result<Option<Decimal>, CartError>;

    /// Display attributes for a batch of books, keyed by book id. Unknown
    /// ids are simply absent from the map.
    async fn display_infos(&self, book_ids: Vec<i32>) -> Result<HashMap<i32, Book>, CartError>;
}

/// HTTP implementation against the catalog service.
pub struct HttpBookCatalog {
    client: Client,
    base_url: String,
}

impl HttpBookCatalog {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: ApiUrls::get_catalog_service_url(),
        }
    }
}

#[async_trait]
impl BookCatalog for HttpBookCatalog {
    async fn unit_price(&self, book_id: i32) -> Result<Option<Decimal>, CartError> {
        let response = self
            .client
            .get(format!("{}/books/{}", self.base_url, book_id))
            .send()
            .await
            .map_err(|_| CartError::CatalogUnreachable("CatalogService".into()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let book: Book = response
            .json()
            .await
            .context("Failed to parse catalog JSON")?;

        Ok(Some(book.unit_price))
    }

    async fn display_infos(&self, book_ids: Vec<i32>) -> Result<HashMap<i32, Book>, CartError> {
        let ids_query = book_ids
            .into_iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let books: Vec<Book> = self
            .client
            .get(format!("{}/books", self.base_url))
            .query(&[("ids", ids_query)])
            .send()
            .await
            .map_err(|_| CartError::CatalogUnreachable("CatalogService".into()))?
            .json()
            .await
            .context("Failed to parse catalog JSON")?;

        Ok(books.into_iter().map(|book| (book.id, book)).collect())
    }
}
