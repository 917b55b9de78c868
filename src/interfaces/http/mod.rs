//! HTTP surface: the STK push API, the provider callback, a health probe
//! and the USSD gateway endpoint.

mod error;
pub mod handlers;

use crate::application::callback::CallbackCorrelator;
use crate::application::payment::PaymentOrchestrator;
use crate::application::records::ParkingRecords;
use crate::application::ussd::SessionInterpreter;
use crate::domain::ports::SharedClock;
use axum::Router;
use axum::routing::{get, post};
use chrono::FixedOffset;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub payments: Arc<PaymentOrchestrator>,
    pub callbacks: CallbackCorrelator,
    pub ussd: Arc<SessionInterpreter>,
    pub records: ParkingRecords,
    pub clock: SharedClock,
    pub local_offset: FixedOffset,
    pub environment: Arc<str>,
    pub trust_proxy: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/mpesa/stkpush", post(handlers::stk_push))
        .route("/api/mpesa/callback", post(handlers::payment_callback))
        .route("/api/mpesa/health", get(handlers::health))
        .route("/ussd", post(handlers::ussd))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serves `router` on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "ParkMe listening");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("shutting down gracefully");
    })
    .await
}
