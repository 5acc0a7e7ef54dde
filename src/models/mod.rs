//! Data models for LibRent

pub mod actor;
pub mod book;
pub mod borrowing;
pub mod payment;

// Re-export commonly used types
pub use actor::ActorClaims;
pub use book::{Book, CoverType};
pub use borrowing::{Borrowing, BorrowingDetails};
pub use payment::{Payment, PaymentKind, PaymentStatus};
