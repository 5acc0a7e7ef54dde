//! Payment session reconciliation service.
//!
//! Opens checkout sessions with the gateway, records them as PENDING
//! payments, and settles them when the gateway's signed webhook reports a
//! completed session. The session identifier is the only correlation key.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::{
    config::StripeConfig,
    error::{AppError, AppResult},
    models::{
        actor::ActorClaims,
        borrowing::Borrowing,
        payment::{CreatePaymentSession, Payment, PaymentKind},
    },
    repository::Repository,
    services::fees,
    stripe::{webhook, PaymentGateway},
};

#[derive(Clone)]
pub struct PaymentsService {
    repository: Repository,
    gateway: Arc<dyn PaymentGateway>,
    stripe: StripeConfig,
    fine_per_day: Decimal,
}

impl PaymentsService {
    pub fn new(
        repository: Repository,
        gateway: Arc<dyn PaymentGateway>,
        stripe: StripeConfig,
        fine_per_day: Decimal,
    ) -> Self {
        Self {
            repository,
            gateway,
            stripe,
            fine_per_day,
        }
    }

    /// Open a checkout session for a borrowing and record it as a PENDING
    /// payment. The gateway call comes first: no session, no row.
    pub async fn open_session(
        &self,
        borrowing: &Borrowing,
        kind: PaymentKind,
        amount: Decimal,
    ) -> AppResult<Payment> {
        let session = self
            .gateway
            .create_checkout_session(&kind.description_for(borrowing.id), amount)
            .await?;

        self.repository
            .payments
            .create(borrowing.id, kind, &session.id, &session.url, amount)
            .await
    }

    /// Request a checkout session for an existing borrowing (the client-side
    /// retry path when the original session expired unpaid)
    pub async fn request_session(
        &self,
        actor: &ActorClaims,
        data: CreatePaymentSession,
    ) -> AppResult<Payment> {
        let borrowing = self
            .repository
            .borrowings
            .get_by_id(data.borrowing_id)
            .await?;
        if !actor.can_access(borrowing.user_id) {
            return Err(AppError::NotFound(format!(
                "Borrowing with id {} not found",
                data.borrowing_id
            )));
        }

        let book = self.repository.books.get_by_id(borrowing.book_id).await?;
        let kind = data.kind.unwrap_or(PaymentKind::Payment);

        let amount = match kind {
            PaymentKind::Payment => fees::rental_fee(
                borrowing.borrow_date,
                borrowing.expected_return_date,
                book.daily_fee,
            ),
            PaymentKind::Fine => {
                let fine = fees::overdue_fine(
                    Some(borrowing.expected_return_date),
                    Utc::now().date_naive(),
                    self.fine_per_day,
                );
                if fine <= Decimal::ZERO {
                    return Err(AppError::Validation(format!(
                        "No fine is owed for borrowing {}",
                        borrowing.id
                    )));
                }
                fine
            }
        };

        self.open_session(&borrowing, kind, amount).await
    }

    /// Payments visible to the actor: staff see everything, everyone else
    /// sees their own outstanding payments
    pub async fn list(&self, actor: &ActorClaims) -> AppResult<Vec<Payment>> {
        if actor.is_staff() {
            self.repository.payments.list_all().await
        } else {
            self.repository
                .payments
                .list_pending_for_user(actor.user_id)
                .await
        }
    }

    /// Get payment by ID (owner or staff; hidden rows read as absent)
    pub async fn get(&self, actor: &ActorClaims, id: i32) -> AppResult<Payment> {
        let payment = self.repository.payments.get_by_id(id).await?;
        let borrowing = self
            .repository
            .borrowings
            .get_by_id(payment.borrowing_id)
            .await?;
        if !actor.can_access(borrowing.user_id) {
            return Err(AppError::NotFound(format!(
                "Payment with id {} not found",
                id
            )));
        }
        Ok(payment)
    }

    /// Read-only status lookup for the success redirect page
    pub async fn session_status(&self, session_id: &str) -> AppResult<Payment> {
        self.repository.payments.get_by_session(session_id).await
    }

    /// Cancel redirect: the session's payment stays PENDING and can be paid
    /// later while the gateway keeps the session alive
    pub async fn cancel(&self, session_id: &str) -> AppResult<Payment> {
        self.repository
            .payments
            .reassert_pending_by_session(session_id)
            .await
    }

    /// Handle a signed settlement delivery from the gateway.
    ///
    /// Verification runs on the raw bytes; only a `checkout.session.completed`
    /// event touches the database, and re-deliveries land on an already-PAID
    /// row without erroring.
    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> AppResult<()> {
        let event = webhook::construct_event(
            payload,
            signature,
            &self.stripe.webhook_secret,
            self.stripe.webhook_tolerance_secs,
            Utc::now().timestamp(),
        )?;

        if !event.is_session_completed() {
            tracing::debug!("Ignoring gateway event type {}", event.event_type);
            return Ok(());
        }

        let payment = self
            .repository
            .payments
            .mark_paid_by_session(event.session_id())
            .await?;
        tracing::info!(
            "Payment {} settled via session {}",
            payment.id,
            payment.session_id
        );
        Ok(())
    }
}
