//! Overdue borrowing scanner.
//!
//! Periodic task walking every unreturned borrowing due before tomorrow and
//! reporting each through the notification channel. The scanner only
//! reports; fines are assessed at return time, not here.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::{
    error::AppResult, models::borrowing::BorrowingDetails, repository::Repository,
    services::notifier::Notifier,
};

#[derive(Clone)]
pub struct OverdueScanner {
    repository: Repository,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
}

impl OverdueScanner {
    pub fn new(repository: Repository, notifier: Arc<dyn Notifier>, interval_secs: u64) -> Self {
        Self {
            repository,
            notifier,
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// Run forever, scanning once per interval. Spawned at startup.
    pub async fn run(self) {
        tracing::info!("Overdue scanner started, interval {:?}", self.interval);
        loop {
            if let Err(e) = self.scan_once().await {
                tracing::error!("Overdue scan failed: {}", e);
            }
            sleep(self.interval).await;
        }
    }

    /// One scan pass over everything due before tomorrow and still out.
    /// Per-item delivery failures are logged and the walk continues.
    pub async fn scan_once(&self) -> AppResult<usize> {
        let tomorrow = Utc::now().date_naive() + chrono::Duration::days(1);
        let overdue = self.repository.borrowings.list_overdue(tomorrow).await?;

        if overdue.is_empty() {
            if let Err(e) = self.notifier.send("No borrowings overdue today!").await {
                tracing::warn!("Failed to send overdue summary: {}", e);
            }
            return Ok(0);
        }

        let count = overdue.len();
        for borrowing in overdue {
            if let Err(e) = self.notifier.send(&overdue_message(&borrowing)).await {
                tracing::warn!(
                    "Failed to send message for borrowing {}: {}",
                    borrowing.id,
                    e
                );
            }
        }
        Ok(count)
    }
}

fn overdue_message(borrowing: &BorrowingDetails) -> String {
    format!(
        "Borrowing overdue:\nBook: {}\nUser: {}\nExpected Return Date: {}",
        borrowing.book.title, borrowing.user_id, borrowing.expected_return_date
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::book::{Book, CoverType};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_overdue_message_format() {
        let details = BorrowingDetails {
            id: 7,
            user_id: 42,
            book: Book {
                id: 1,
                title: "Dune".to_string(),
                author: "Frank Herbert".to_string(),
                cover: CoverType::Hard,
                inventory: 3,
                daily_fee: dec!(1.50),
            },
            borrow_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            expected_return_date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            actual_return_date: None,
        };

        assert_eq!(
            overdue_message(&details),
            "Borrowing overdue:\nBook: Dune\nUser: 42\nExpected Return Date: 2024-01-08"
        );
    }
}
