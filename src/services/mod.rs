//! Business logic services

pub mod borrowings;
pub mod catalog;
pub mod fees;
pub mod notifier;
pub mod overdue;
pub mod payments;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Repository, stripe::PaymentGateway};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub catalog: catalog::CatalogService,
    pub borrowings: borrowings::BorrowingsService,
    pub payments: payments::PaymentsService,
}

impl Services {
    /// Create all services with the given repository and collaborators
    pub fn new(
        repository: Repository,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn notifier::Notifier>,
        config: &AppConfig,
    ) -> Self {
        let payments = payments::PaymentsService::new(
            repository.clone(),
            gateway,
            config.stripe.clone(),
            config.borrowing.fine_per_day,
        );

        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            borrowings: borrowings::BorrowingsService::new(
                repository.clone(),
                payments.clone(),
                notifier,
                config.borrowing.fine_per_day,
            ),
            payments,
            repository,
        }
    }
}
