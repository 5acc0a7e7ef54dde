//! Borrowings repository: the storage half of the lifecycle state machine.
//!
//! Inventory movement and borrowing row changes always travel in one
//! transaction. The single-active-per-user rule is ultimately enforced by
//! the `borrowings_one_active_per_user` partial unique index; in-code
//! checks only surface it earlier.

use chrono::NaiveDate;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use super::is_unique_violation;
use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        borrowing::{Borrowing, BorrowingDetails},
    },
};

const DETAILS_COLUMNS: &str = r#"
    b.id, b.user_id, b.book_id, b.borrow_date, b.expected_return_date,
    b.actual_return_date,
    bk.title, bk.author, bk.cover, bk.inventory, bk.daily_fee
"#;

fn details_from_row(row: &PgRow) -> BorrowingDetails {
    BorrowingDetails {
        id: row.get("id"),
        user_id: row.get("user_id"),
        book: Book {
            id: row.get("book_id"),
            title: row.get("title"),
            author: row.get("author"),
            cover: row.get("cover"),
            inventory: row.get("inventory"),
            daily_fee: row.get("daily_fee"),
        },
        borrow_date: row.get("borrow_date"),
        expected_return_date: row.get("expected_return_date"),
        actual_return_date: row.get("actual_return_date"),
    }
}

#[derive(Clone)]
pub struct BorrowingsRepository {
    pool: Pool<Postgres>,
}

impl BorrowingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get borrowing by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Borrowing> {
        sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))
    }

    /// Get borrowing with its book embedded
    pub async fn get_details(&self, id: i32) -> AppResult<BorrowingDetails> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM borrowings b
            JOIN books bk ON b.book_id = bk.id
            WHERE b.id = $1
            "#,
            DETAILS_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))?;

        Ok(details_from_row(&row))
    }

    /// List borrowings, optionally filtered by owner and activity
    pub async fn list(
        &self,
        user_id: Option<i32>,
        is_active: Option<bool>,
    ) -> AppResult<Vec<BorrowingDetails>> {
        let mut conditions = Vec::new();
        if user_id.is_some() {
            conditions.push("b.user_id = $1".to_string());
        }
        if let Some(active) = is_active {
            conditions.push(
                if active {
                    "b.actual_return_date IS NULL"
                } else {
                    "b.actual_return_date IS NOT NULL"
                }
                .to_string(),
            );
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            r#"
            SELECT {}
            FROM borrowings b
            JOIN books bk ON b.book_id = bk.id
            {}
            ORDER BY b.id
            "#,
            DETAILS_COLUMNS, where_clause
        );

        let mut builder = sqlx::query(&query);
        if let Some(uid) = user_id {
            builder = builder.bind(uid);
        }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(details_from_row).collect())
    }

    /// Whether the user currently holds an active borrowing
    pub async fn has_active(&self, user_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM borrowings WHERE user_id = $1 AND actual_return_date IS NULL)",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create an active borrowing, taking one copy off the shelf.
    ///
    /// The guarded decrement refuses to run inventory below zero under
    /// concurrent borrows of the last copy, and the partial unique index
    /// turns a double-submitted create into a `Conflict`.
    pub async fn create_active(
        &self,
        user_id: i32,
        book_id: i32,
        borrow_date: NaiveDate,
        expected_return_date: NaiveDate,
    ) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;

        let decremented =
            sqlx::query("UPDATE books SET inventory = inventory - 1 WHERE id = $1 AND inventory > 0")
                .bind(book_id)
                .execute(&mut *tx)
                .await?;

        if decremented.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
                    .bind(book_id)
                    .fetch_one(&mut *tx)
                    .await?;
            return Err(if exists {
                AppError::OutOfStock(format!("Book {} has no copies available", book_id))
            } else {
                AppError::NotFound(format!("Book with id {} not found", book_id))
            });
        }

        let inserted = sqlx::query_as::<_, Borrowing>(
            r#"
            INSERT INTO borrowings (user_id, book_id, borrow_date, expected_return_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(borrow_date)
        .bind(expected_return_date)
        .fetch_one(&mut *tx)
        .await;

        let borrowing = match inserted {
            Ok(b) => b,
            Err(e) if is_unique_violation(&e, "borrowings_one_active_per_user") => {
                return Err(AppError::Conflict(
                    "User already has an active borrowing".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;
        Ok(borrowing)
    }

    /// Remove a borrowing that never got its payment session, putting the
    /// copy back on the shelf. Missing rows are fine; the compensation may
    /// race a concurrent delete.
    pub async fn delete_with_restock(&self, borrowing_id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let book_id: Option<i32> =
            sqlx::query_scalar("DELETE FROM borrowings WHERE id = $1 RETURNING book_id")
                .bind(borrowing_id)
                .fetch_optional(&mut *tx)
                .await?;

        if let Some(book_id) = book_id {
            sqlx::query("UPDATE books SET inventory = inventory + 1 WHERE id = $1")
                .bind(book_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Close an active borrowing and put the copy back on the shelf.
    ///
    /// The row lock makes a doubled return request lose cleanly: the second
    /// caller sees `actual_return_date` set and gets a `Conflict`, so
    /// inventory is restocked exactly once.
    pub async fn close_and_restock(
        &self,
        borrowing_id: i32,
        returned_on: NaiveDate,
    ) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Borrowing>(
            "SELECT * FROM borrowings WHERE id = $1 FOR UPDATE",
        )
        .bind(borrowing_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", borrowing_id)))?;

        if current.actual_return_date.is_some() {
            return Err(AppError::Conflict(format!(
                "Borrowing {} has already been returned",
                borrowing_id
            )));
        }

        let borrowing = sqlx::query_as::<_, Borrowing>(
            "UPDATE borrowings SET actual_return_date = $1 WHERE id = $2 RETURNING *",
        )
        .bind(returned_on)
        .bind(borrowing_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE books SET inventory = inventory + 1 WHERE id = $1")
            .bind(borrowing.book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(borrowing)
    }

    /// Unreturned borrowings due before `cutoff` (the scanner passes
    /// tomorrow's date, so anything due today or earlier is included)
    pub async fn list_overdue(&self, cutoff: NaiveDate) -> AppResult<Vec<BorrowingDetails>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM borrowings b
            JOIN books bk ON b.book_id = bk.id
            WHERE b.expected_return_date < $1 AND b.actual_return_date IS NULL
            ORDER BY b.expected_return_date, b.id
            "#,
            DETAILS_COLUMNS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(details_from_row).collect())
    }
}
