//! Borrowing lifecycle service.
//!
//! A borrowing is Active from creation until `return_book` closes it, and
//! every transition moves exactly one inventory copy. Creation couples to
//! the payment gateway: no checkout session, no borrowing (full
//! compensation); the return keeps its ground even when fine billing fails.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        actor::ActorClaims,
        borrowing::{BorrowingDetails, CreateBorrowing},
        payment::{Payment, PaymentKind},
    },
    repository::Repository,
    services::{
        fees,
        notifier::{notify_detached, Notifier},
        payments::PaymentsService,
    },
};

#[derive(Clone)]
pub struct BorrowingsService {
    repository: Repository,
    payments: PaymentsService,
    notifier: Arc<dyn Notifier>,
    fine_per_day: Decimal,
}

impl BorrowingsService {
    pub fn new(
        repository: Repository,
        payments: PaymentsService,
        notifier: Arc<dyn Notifier>,
        fine_per_day: Decimal,
    ) -> Self {
        Self {
            repository,
            payments,
            notifier,
            fine_per_day,
        }
    }

    /// Borrowings visible to the actor. Staff may scope by user and
    /// activity; everyone else always gets their own active borrowings.
    pub async fn list(
        &self,
        actor: &ActorClaims,
        user_id: Option<i32>,
        is_active: Option<bool>,
    ) -> AppResult<Vec<BorrowingDetails>> {
        if actor.is_staff() {
            self.repository.borrowings.list(user_id, is_active).await
        } else {
            self.repository
                .borrowings
                .list(Some(actor.user_id), Some(true))
                .await
        }
    }

    /// Get borrowing by ID (owner or staff; hidden rows read as absent)
    pub async fn get(&self, actor: &ActorClaims, id: i32) -> AppResult<BorrowingDetails> {
        let details = self.repository.borrowings.get_details(id).await?;
        if !actor.can_access(details.user_id) {
            return Err(AppError::NotFound(format!(
                "Borrowing with id {} not found",
                id
            )));
        }
        Ok(details)
    }

    /// Borrow a book.
    ///
    /// Checks run in a fixed order (active borrowing, stock, dates) so
    /// clients get stable errors, then the repository re-enforces the first
    /// two under the transaction; the in-service checks alone would race.
    /// A refused checkout session undoes the whole thing: the caller must
    /// not be able to observe a borrowing that has no payment attached.
    pub async fn create(
        &self,
        actor: &ActorClaims,
        data: CreateBorrowing,
    ) -> AppResult<(BorrowingDetails, Payment)> {
        let today = Utc::now().date_naive();

        if self.repository.borrowings.has_active(actor.user_id).await? {
            return Err(AppError::Conflict(
                "User already has an active borrowing".to_string(),
            ));
        }

        let book = self.repository.books.get_by_id(data.book_id).await?;
        if book.inventory <= 0 {
            return Err(AppError::OutOfStock(format!(
                "Book {} has no copies available",
                book.id
            )));
        }

        if data.expected_return_date < today {
            return Err(AppError::Validation(
                "Expected return date cannot be before the borrow date".to_string(),
            ));
        }

        let borrowing = self
            .repository
            .borrowings
            .create_active(actor.user_id, data.book_id, today, data.expected_return_date)
            .await?;

        let amount = fees::rental_fee(
            borrowing.borrow_date,
            borrowing.expected_return_date,
            book.daily_fee,
        );

        let payment = match self
            .payments
            .open_session(&borrowing, PaymentKind::Payment, amount)
            .await
        {
            Ok(payment) => payment,
            Err(e) => {
                tracing::warn!(
                    "Undoing borrowing {} after failed checkout session: {}",
                    borrowing.id,
                    e
                );
                if let Err(undo) = self
                    .repository
                    .borrowings
                    .delete_with_restock(borrowing.id)
                    .await
                {
                    tracing::error!("Compensation for borrowing {} failed: {}", borrowing.id, undo);
                }
                return Err(e);
            }
        };

        notify_detached(
            self.notifier.clone(),
            format!(
                "New borrowing created:\nUser: {}\nBook: {}",
                borrowing.user_id, book.title
            ),
        );

        let details = self.repository.borrowings.get_details(borrowing.id).await?;
        Ok((details, payment))
    }

    /// Return a borrowed book.
    ///
    /// Closing the borrowing and restocking commit first; an overdue fine
    /// is then billed through a FINE checkout session. A gateway failure at
    /// that point is logged and reported in the response, never rolled back:
    /// the book is already on the shelf.
    pub async fn return_book(
        &self,
        actor: &ActorClaims,
        borrowing_id: i32,
    ) -> AppResult<(BorrowingDetails, Option<Payment>)> {
        let borrowing = self.repository.borrowings.get_by_id(borrowing_id).await?;
        if !actor.can_access(borrowing.user_id) {
            return Err(AppError::NotFound(format!(
                "Borrowing with id {} not found",
                borrowing_id
            )));
        }

        let today = Utc::now().date_naive();
        let closed = self
            .repository
            .borrowings
            .close_and_restock(borrowing_id, today)
            .await?;

        let fine = fees::overdue_fine(Some(closed.expected_return_date), today, self.fine_per_day);

        let mut fine_payment = None;
        if fine > Decimal::ZERO {
            match self
                .payments
                .open_session(&closed, PaymentKind::Fine, fine)
                .await
            {
                Ok(payment) => fine_payment = Some(payment),
                Err(e) => {
                    tracing::error!(
                        "Failed to bill fine of {} for borrowing {}: {}",
                        fine,
                        closed.id,
                        e
                    );
                }
            }
        }

        let details = self.repository.borrowings.get_details(closed.id).await?;

        if fine > Decimal::ZERO {
            notify_detached(
                self.notifier.clone(),
                format!(
                    "Book '{}' has been returned by user {}. A fine of ${} has been issued for overdue.",
                    details.book.title, closed.user_id, fine
                ),
            );
        }

        Ok((details, fine_payment))
    }
}
