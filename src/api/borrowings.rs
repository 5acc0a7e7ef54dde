//! Borrowing lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{
        borrowing::{BorrowingDetails, CreateBorrowing},
        payment::Payment,
    },
};

use super::AuthenticatedUser;

/// Borrowing list filters. Non-staff actors always get their own active
/// borrowings regardless of these.
#[derive(Debug, Deserialize, IntoParams)]
pub struct BorrowingQuery {
    /// Filter by owning user (staff only)
    pub user_id: Option<i32>,
    /// true = still out, false = returned (staff only)
    pub is_active: Option<bool>,
}

/// Borrow response carrying the checkout session for the rental fee
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    pub borrowing: BorrowingDetails,
    pub payment: Payment,
}

/// Return response; `fine_payment` is present when the book came back late
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    pub borrowing: BorrowingDetails,
    pub fine_payment: Option<Payment>,
}

/// List borrowings visible to the caller
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(BorrowingQuery),
    responses(
        (status = 200, description = "Borrowings with book details", body = Vec<BorrowingDetails>)
    )
)]
pub async fn list_borrowings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<Vec<BorrowingDetails>>> {
    let borrowings = state
        .services
        .borrowings
        .list(&claims, query.user_id, query.is_active)
        .await?;
    Ok(Json(borrowings))
}

/// Get borrowing by ID
#[utoipa::path(
    get,
    path = "/borrowings/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "The borrowing", body = BorrowingDetails),
        (status = 404, description = "Borrowing not found or not visible")
    )
)]
pub async fn get_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingDetails>> {
    let borrowing = state.services.borrowings.get(&claims, id).await?;
    Ok(Json(borrowing))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowing,
    responses(
        (status = 201, description = "Borrowing created with its rental-fee checkout session", body = BorrowResponse),
        (status = 400, description = "Active borrowing exists, book out of stock, or return date in the past"),
        (status = 404, description = "Book not found"),
        (status = 502, description = "Payment gateway refused the checkout session; borrowing rolled back")
    )
)]
pub async fn create_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBorrowing>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    let (borrowing, payment) = state.services.borrowings.create(&claims, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse { borrowing, payment }),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrowings/{id}/return_book",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Book returned; fine session included when overdue", body = ReturnResponse),
        (status = 400, description = "Already returned"),
        (status = 404, description = "Borrowing not found or not visible")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    let (borrowing, fine_payment) = state.services.borrowings.return_book(&claims, id).await?;

    Ok(Json(ReturnResponse {
        borrowing,
        fine_payment,
    }))
}
