//! LibRent Server - Library Rental Management System
//!
//! REST API server for book rentals with gateway-settled payments.

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use librent_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::{
        notifier::{Notifier, TelegramNotifier},
        overdue::OverdueScanner,
        Services,
    },
    stripe::{PaymentGateway, StripeGateway},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("librent_server={},tower_http=debug", config.logging.level).into()
    });

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting LibRent Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;
    let scanner_interval = config.scanner.interval_secs;

    // External collaborators: payment gateway and notification channel
    let gateway: Arc<dyn PaymentGateway> =
        Arc::new(StripeGateway::new(config.stripe.clone()).expect("Failed to build payment gateway"));
    let notifier: Arc<dyn Notifier> =
        Arc::new(TelegramNotifier::new(config.telegram.clone()).expect("Failed to build notifier"));

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(repository.clone(), gateway, notifier.clone(), &config);

    // Overdue scanner runs as an independent periodic task
    let scanner = OverdueScanner::new(repository, notifier, scanner_interval);
    tokio::spawn(scanner.run());

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Books (catalog)
        .route("/books", get(api::books::list_books))
        .route("/books", post(api::books::create_book))
        .route("/books/:id", get(api::books::get_book))
        .route("/books/:id", put(api::books::update_book))
        .route("/books/:id", patch(api::books::update_book))
        .route("/books/:id", delete(api::books::delete_book))
        // Borrowings (lifecycle)
        .route("/borrowings", get(api::borrowings::list_borrowings))
        .route("/borrowings", post(api::borrowings::create_borrowing))
        .route("/borrowings/:id", get(api::borrowings::get_borrowing))
        .route(
            "/borrowings/:id/return_book",
            post(api::borrowings::return_book),
        )
        // Payments and settlement
        .route("/payments", get(api::payments::list_payments))
        .route("/payments", post(api::payments::create_payment_session))
        .route("/payments/:id", get(api::payments::get_payment))
        .route(
            "/payments/stripe/success",
            get(api::payments::payment_success),
        )
        .route("/payments/cancel", post(api::payments::payment_cancel))
        // Gateway callback
        .route("/webhooks/stripe", post(api::payments::stripe_webhook))
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
