//! Payment endpoints and the gateway webhook

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::payment::{CreatePaymentSession, Payment},
};

use super::AuthenticatedUser;

/// Session lookup query used by the gateway success redirect
#[derive(Debug, Deserialize, IntoParams)]
pub struct SessionQuery {
    /// Gateway checkout session identifier
    pub session_id: String,
}

/// Cancel request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelPayment {
    /// Gateway checkout session identifier
    pub session_id: String,
}

/// Cancel response: the session stays payable
#[derive(Serialize, ToSchema)]
pub struct CancelResponse {
    pub message: String,
    pub payment: Payment,
}

/// List payments visible to the caller
#[utoipa::path(
    get,
    path = "/payments",
    tag = "payments",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All payments for staff, own pending payments otherwise", body = Vec<Payment>)
    )
)]
pub async fn list_payments(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Payment>>> {
    let payments = state.services.payments.list(&claims).await?;
    Ok(Json(payments))
}

/// Get payment by ID
#[utoipa::path(
    get,
    path = "/payments/{id}",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Payment ID")
    ),
    responses(
        (status = 200, description = "The payment", body = Payment),
        (status = 404, description = "Payment not found or not visible")
    )
)]
pub async fn get_payment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Payment>> {
    let payment = state.services.payments.get(&claims, id).await?;
    Ok(Json(payment))
}

/// Request a new checkout session for an existing borrowing
#[utoipa::path(
    post,
    path = "/payments",
    tag = "payments",
    security(("bearer_auth" = [])),
    request_body = CreatePaymentSession,
    responses(
        (status = 201, description = "Checkout session created", body = Payment),
        (status = 400, description = "No fine is owed"),
        (status = 404, description = "Borrowing not found or not visible"),
        (status = 502, description = "Payment gateway refused the checkout session")
    )
)]
pub async fn create_payment_session(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreatePaymentSession>,
) -> AppResult<(StatusCode, Json<Payment>)> {
    let payment = state
        .services
        .payments
        .request_session(&claims, request)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// Gateway success redirect: show the settlement state of the session.
/// Token-free, because the gateway sends a bare browser redirect here.
#[utoipa::path(
    get,
    path = "/payments/stripe/success",
    tag = "payments",
    params(SessionQuery),
    responses(
        (status = 200, description = "The payment for the session", body = Payment),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn payment_success(
    State(state): State<crate::AppState>,
    Query(query): Query<SessionQuery>,
) -> AppResult<Json<Payment>> {
    let payment = state
        .services
        .payments
        .session_status(&query.session_id)
        .await?;
    Ok(Json(payment))
}

/// Cancel a checkout: the payment stays PENDING and the session remains
/// payable for 24 hours
#[utoipa::path(
    post,
    path = "/payments/cancel",
    tag = "payments",
    request_body = CancelPayment,
    responses(
        (status = 200, description = "Payment left pending", body = CancelResponse),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn payment_cancel(
    State(state): State<crate::AppState>,
    Json(request): Json<CancelPayment>,
) -> AppResult<Json<CancelResponse>> {
    let payment = state.services.payments.cancel(&request.session_id).await?;

    Ok(Json(CancelResponse {
        message: "Payment can be made later. The session is available for 24 hours.".to_string(),
        payment,
    }))
}

/// Signed settlement callback from the payment gateway.
///
/// Answers with bare status codes: 200 applied or ignored, 400 bad
/// signature or payload, 404 unknown session. The gateway retries on
/// anything but 200.
#[utoipa::path(
    post,
    path = "/webhooks/stripe",
    tag = "payments",
    responses(
        (status = 200, description = "Event applied or ignored"),
        (status = 400, description = "Invalid signature or payload"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn stripe_webhook(
    State(state): State<crate::AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let Some(signature) = headers.get("Stripe-Signature").and_then(|v| v.to_str().ok()) else {
        return StatusCode::BAD_REQUEST;
    };

    match state.services.payments.handle_webhook(&body, signature).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!("Webhook delivery rejected: {}", e);
            e.status()
        }
    }
}
