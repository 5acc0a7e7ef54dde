//! Book catalog service

use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List the catalog
    pub async fn list(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Create a book
    pub async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        if data.title.trim().is_empty() {
            return Err(AppError::Validation("Title cannot be empty".to_string()));
        }
        if data.author.trim().is_empty() {
            return Err(AppError::Validation("Author cannot be empty".to_string()));
        }
        if data.inventory < 0 {
            return Err(AppError::Validation(
                "Inventory cannot be negative".to_string(),
            ));
        }
        if data.daily_fee < Decimal::ZERO {
            return Err(AppError::Validation(
                "Daily fee cannot be negative".to_string(),
            ));
        }
        self.repository.books.create(data).await
    }

    /// Update a book (partial)
    pub async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        if let Some(ref title) = data.title {
            if title.trim().is_empty() {
                return Err(AppError::Validation("Title cannot be empty".to_string()));
            }
        }
        if let Some(ref author) = data.author {
            if author.trim().is_empty() {
                return Err(AppError::Validation("Author cannot be empty".to_string()));
            }
        }
        if let Some(inventory) = data.inventory {
            if inventory < 0 {
                return Err(AppError::Validation(
                    "Inventory cannot be negative".to_string(),
                ));
            }
        }
        if let Some(daily_fee) = data.daily_fee {
            if daily_fee < Decimal::ZERO {
                return Err(AppError::Validation(
                    "Daily fee cannot be negative".to_string(),
                ));
            }
        }

        self.repository.books.update(id, data).await
    }

    /// Delete a book
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await
    }
}
