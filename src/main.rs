//! Mist Storefront - order placement service

use std::sync::Arc;

use anyhow::Result;
use mist_storefront::api::{self, AdminGuard, AppState};
use mist_storefront::notify::{LogNotifier, NatsNotifier, Notifier};
use mist_storefront::order_link::OrderLinkSigner;
use mist_storefront::{Checkout, Config, InMemoryStore, OrderStore, PgStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    let store: Arc<dyn OrderStore> = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.database_max_connections).await?;
            store.migrate().await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, orders are kept in memory and lost on restart");
            Arc::new(InMemoryStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.nats_url {
        Some(url) => match NatsNotifier::connect(url, config.mail_subject.clone()).await {
            Ok(n) => Arc::new(n),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, order mail will only be logged");
                Arc::new(LogNotifier)
            }
        },
        None => Arc::new(LogNotifier),
    };

    let links = OrderLinkSigner::new(config.order_token_secret.clone(), config.app_url.clone());
    let state = AppState {
        checkout: Checkout::new(store, notifier, links),
        admin: AdminGuard::new(config.admin_api_token.as_deref()),
    };

    let app = api::router(state);
    tracing::info!("🚀 Mist Storefront listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}
