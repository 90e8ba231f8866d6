use std::sync::Arc;

use handoff_browser::{SessionFactory, WebDriverClient};
use handoff_bus::{Bus, RedisBus};
use handoff_core::config::WorkerConfig;
use handoff_core::crypto::PayloadCipher;
use handoff_db::store::{PgRecordStore, RecordStore};
use handoff_worker::bridge::HumanActionBridge;
use handoff_worker::detect::ChallengeDetector;
use handoff_worker::evidence::EvidenceStore;
use handoff_worker::intake::IntakeConsumer;
use handoff_worker::rendezvous::RendezvousTable;
use handoff_worker::session::SessionEngine;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "handoff_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env()?;
    let cipher = Arc::new(PayloadCipher::new(
        &config.payload_key,
        &config.payload_nonce,
    )?);

    let pool = handoff_db::connect(&config.database_url).await?;
    handoff_db::run_migrations(&pool).await?;

    let store: Arc<dyn RecordStore> = Arc::new(PgRecordStore::new(pool));
    let bus: Arc<dyn Bus> = Arc::new(RedisBus::connect(&config.redis_url)?);
    let browser: Arc<dyn SessionFactory> =
        Arc::new(WebDriverClient::new(config.webdriver_url.clone()));
    let evidence = Arc::new(EvidenceStore::new(&config.evidence_dir)?);
    let rendezvous = Arc::new(RendezvousTable::new());

    let engine = Arc::new(SessionEngine::new(
        store,
        browser,
        Arc::clone(&bus),
        cipher,
        evidence,
        Arc::clone(&rendezvous),
        ChallengeDetector::default(),
    ));

    let cancel = CancellationToken::new();
    let bridge = tokio::spawn(HumanActionBridge::run(
        Arc::clone(&bus),
        rendezvous,
        cancel.child_token(),
    ));
    let intake = tokio::spawn(IntakeConsumer::run(bus, engine, cancel.child_token()));

    tracing::info!("Automation worker started");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, cancelling in-flight waits");
    cancel.cancel();

    let _ = bridge.await;
    let _ = intake.await;
    Ok(())
}
