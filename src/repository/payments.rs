//! Payments repository for settlement records

use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use super::is_unique_violation;
use crate::{
    error::{AppError, AppResult},
    models::payment::{Payment, PaymentKind, PaymentStatus},
};

#[derive(Clone)]
pub struct PaymentsRepository {
    pool: Pool<Postgres>,
}

impl PaymentsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Record a freshly minted checkout session as a pending payment
    pub async fn create(
        &self,
        borrowing_id: i32,
        kind: PaymentKind,
        session_id: &str,
        session_url: &str,
        money_to_pay: Decimal,
    ) -> AppResult<Payment> {
        let inserted = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (borrowing_id, status, kind, session_url, session_id, money_to_pay)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(borrowing_id)
        .bind(PaymentStatus::Pending)
        .bind(kind)
        .bind(session_url)
        .bind(session_id)
        .bind(money_to_pay)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(payment) => Ok(payment),
            Err(e) if is_unique_violation(&e, "payments_session_id_key") => Err(
                AppError::Conflict(format!("Session {} is already recorded", session_id)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    /// Get payment by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Payment> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment with id {} not found", id)))
    }

    /// Find the payment holding a gateway session
    pub async fn get_by_session(&self, session_id: &str) -> AppResult<Payment> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Payment with session {} not found", session_id))
            })
    }

    /// All payments (staff view)
    pub async fn list_all(&self) -> AppResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>("SELECT * FROM payments ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(payments)
    }

    /// A user's outstanding payments
    pub async fn list_pending_for_user(&self, user_id: i32) -> AppResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT p.*
            FROM payments p
            JOIN borrowings b ON p.borrowing_id = b.id
            WHERE b.user_id = $1 AND p.status = $2
            ORDER BY p.id
            "#,
        )
        .bind(user_id)
        .bind(PaymentStatus::Pending)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    /// Settle the payment holding a session. The unconditional write keeps
    /// duplicate gateway deliveries no-ops.
    pub async fn mark_paid_by_session(&self, session_id: &str) -> AppResult<Payment> {
        sqlx::query_as::<_, Payment>(
            "UPDATE payments SET status = $1 WHERE session_id = $2 RETURNING *",
        )
        .bind(PaymentStatus::Paid)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment with session {} not found", session_id)))
    }

    /// Cancel flow: put the session's payment back to PENDING. Last write
    /// wins when this races a settlement delivery.
    pub async fn reassert_pending_by_session(&self, session_id: &str) -> AppResult<Payment> {
        sqlx::query_as::<_, Payment>(
            "UPDATE payments SET status = $1 WHERE session_id = $2 RETURNING *",
        )
        .bind(PaymentStatus::Pending)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment with session {} not found", session_id)))
    }
}
