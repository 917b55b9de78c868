use clap::Parser;
use miette::{IntoDiagnostic, Result};
use parkme::application::callback::CallbackCorrelator;
use parkme::application::payment::PaymentOrchestrator;
use parkme::application::rate_limiter::RateLimiter;
use parkme::application::records::ParkingRecords;
use parkme::application::token_cache::AccessTokenCache;
use parkme::application::ussd::SessionInterpreter;
use parkme::config::AppConfig;
use parkme::domain::ports::{SharedClock, SharedRecordStore};
use parkme::infrastructure::clock::SystemClock;
use parkme::infrastructure::daraja::DarajaClient;
use parkme::infrastructure::in_memory::InMemoryRecordStore;
use parkme::infrastructure::rest_store::RestRecordStore;
use parkme::interfaces::http::{self, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_LOG_FILTER: &str = "parkme=info,tower_http=warn";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long)]
    config: PathBuf,

    /// Override the listen address from the configuration
    #[arg(long)]
    listen: Option<String>,

    /// Validate the configuration, print a redacted summary and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = AppConfig::load(&cli.config).into_diagnostic()?;
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }
    config.validate().into_diagnostic()?;

    if cli.check {
        println!("configuration OK");
        println!("{}", config.redacted_summary());
        return Ok(());
    }

    let local_offset = config.local_offset().into_diagnostic()?;
    let clock: SharedClock = Arc::new(SystemClock);

    let store: SharedRecordStore = match config.store_settings() {
        Some(settings) => Arc::new(RestRecordStore::new(settings).into_diagnostic()?),
        None => {
            tracing::warn!("no record store configured, falling back to in-memory storage");
            Arc::new(InMemoryRecordStore::new())
        }
    };
    let records = ParkingRecords::new(store);

    let daraja = Arc::new(DarajaClient::new(config.daraja_settings()).into_diagnostic()?);
    let tokens = Arc::new(AccessTokenCache::new(daraja.clone(), clock.clone()));
    let limiter = Arc::new(RateLimiter::new(config.rate_limit_config()));
    let payments = PaymentOrchestrator::new(
        tokens,
        limiter,
        daraja,
        clock.clone(),
        config.merchant_profile(),
        local_offset,
    );
    let ussd = SessionInterpreter::new(
        records.clone(),
        clock.clone(),
        local_offset,
        config.ussd_settings(),
    );

    let state = AppState {
        payments: Arc::new(payments),
        callbacks: CallbackCorrelator::new(),
        ussd: Arc::new(ussd),
        records,
        clock,
        local_offset,
        environment: config.environment.as_str().into(),
        trust_proxy: config.trust_proxy,
    };

    let listener = tokio::net::TcpListener::bind(config.listen_addr().into_diagnostic()?)
        .await
        .into_diagnostic()?;
    http::serve(listener, http::router(state))
        .await
        .into_diagnostic()?;

    Ok(())
}
