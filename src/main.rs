use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use vpn_billing::adapters::http::{app_router, AppState};
use vpn_billing::adapters::notifier::{HttpNotifier, HttpNotifierConfig, LogNotifier};
use vpn_billing::adapters::postgres::{
    PostgresBroadcastStore, PostgresCustomerRepository, PostgresPromoCodeRepository,
    PostgresPromoTariffCodeRepository, PostgresPurchaseRepository,
};
use vpn_billing::adapters::{
    CardProcessorAdapter, CardProcessorConfig, CryptoProcessorAdapter, CryptoProcessorConfig,
    PanelApiAdapter, PanelApiConfig, ReconcileScheduler,
};
use vpn_billing::application::handlers::BroadcastSupervisor;
use vpn_billing::application::{BillingContext, BillingSettings, ReconcileSettings};
use vpn_billing::config::{AppConfig, LogFormat};
use vpn_billing::domain::webhook::SignatureVerifier;
use vpn_billing::ports::{MessageSender, Notifier, SystemClock};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.server.log_filter.as_str()));
    let subscriber = fmt().with_env_filter(filter);
    match config.server.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;

    if config.database.migrate_on_start {
        sqlx::migrate!().run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let (notifier, sender): (Arc<dyn Notifier>, Arc<dyn MessageSender>) =
        match &config.notifier.url {
            Some(url) => {
                let mut notifier_config = HttpNotifierConfig::new(url.clone());
                if let Some(token) = &config.notifier.token {
                    notifier_config = notifier_config.with_token(token.clone());
                }
                let notifier = Arc::new(HttpNotifier::new(notifier_config)?);
                (notifier.clone(), notifier)
            }
            None => {
                tracing::warn!("notifier.url is not set; notifications are only logged");
                (Arc::new(LogNotifier), Arc::new(LogNotifier))
            }
        };

    let context = BillingContext {
        customers: Arc::new(PostgresCustomerRepository::new(pool.clone())),
        purchases: Arc::new(PostgresPurchaseRepository::new(pool.clone())),
        promo_codes: Arc::new(PostgresPromoCodeRepository::new(pool.clone())),
        tariff_codes: Arc::new(PostgresPromoTariffCodeRepository::new(pool.clone())),
        panel: Arc::new(PanelApiAdapter::new(PanelApiConfig::from(&config.panel))?),
        card: Arc::new(CardProcessorAdapter::new(CardProcessorConfig::from(
            &config.payment,
        ))?),
        crypto: Arc::new(CryptoProcessorAdapter::new(CryptoProcessorConfig::from(
            &config.payment,
        ))?),
        notifier,
        clock: Arc::new(SystemClock),
        settings: Arc::new(BillingSettings::from_config(&config)),
        reconcile: ReconcileSettings::from_config(&config.payment),
    };

    let panel_verifier = SignatureVerifier::new(config.webhooks.panel_secret());
    let subscription_verifier = SignatureVerifier::new(config.webhooks.subscription_secret());
    for (source, verifier) in [
        ("panel", &panel_verifier),
        ("subscription", &subscription_verifier),
    ] {
        if verifier.is_insecure() {
            tracing::warn!(source, "No webhook secret configured; signatures will not be checked");
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut loops = Vec::new();

    if config.payment.is_card_enabled() {
        let scheduler = ReconcileScheduler::new(
            Arc::new(context.reconcile_card_handler()),
            config.billing.card_reconcile_interval(),
        );
        let rx = shutdown_rx.clone();
        loops.push(tokio::spawn(async move { scheduler.run(rx).await }));
    } else {
        tracing::warn!("Card processor is not configured; card reconciliation disabled");
    }

    if config.payment.is_crypto_enabled() {
        let scheduler = ReconcileScheduler::new(
            Arc::new(context.reconcile_crypto_handler()),
            config.billing.crypto_reconcile_interval(),
        );
        let rx = shutdown_rx.clone();
        loops.push(tokio::spawn(async move { scheduler.run(rx).await }));
    } else {
        tracing::warn!("Crypto processor is not configured; crypto reconciliation disabled");
    }

    let state = AppState {
        broadcasts: BroadcastSupervisor::new(
            Arc::new(PostgresBroadcastStore::new(pool.clone())),
            sender,
            config.notifier.broadcast_delay(),
        ),
        context,
        panel_verifier,
        subscription_verifier,
    };
    let app = app_router(state, config.server.webhook_timeout());

    let addr = config.server.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening for incoming connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    for handle in loops {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Reconciliation loop ended abnormally");
        }
    }
    pool.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
