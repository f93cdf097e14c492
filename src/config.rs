//! Process configuration, read from the environment (and `.env` via dotenvy).

use anyhow::{bail, Context, Result};

use crate::notify::NatsNotifier;

const DEV_TOKEN_SECRET: &str = "mist-dev-order-token-secret";

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub nats_url: Option<String>,
    pub mail_subject: String,
    pub app_url: String,
    pub order_token_secret: String,
    pub admin_api_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port: u16 = match var("PORT") {
            Some(p) => p.parse().with_context(|| format!("PORT must be a port number, got {p:?}"))?,
            None => 8083,
        };
        let database_max_connections: u32 = match var("DATABASE_MAX_CONNECTIONS") {
            Some(n) => n.parse().with_context(|| format!("DATABASE_MAX_CONNECTIONS must be a number, got {n:?}"))?,
            None => 10,
        };
        let database_url = var("DATABASE_URL");
        let order_token_secret = match (var("ORDER_TOKEN_SECRET"), &database_url) {
            (Some(secret), _) => secret,
            (None, Some(_)) => bail!("ORDER_TOKEN_SECRET is required when DATABASE_URL is set"),
            (None, None) => {
                tracing::warn!("ORDER_TOKEN_SECRET not set, using the development secret");
                DEV_TOKEN_SECRET.to_string()
            }
        };

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            nats_url: var("NATS_URL"),
            mail_subject: var("MAIL_SUBJECT").unwrap_or_else(|| NatsNotifier::DEFAULT_SUBJECT.to_string()),
            app_url: var("APP_URL").unwrap_or_else(|| "http://localhost:3000".to_string()),
            order_token_secret,
            admin_api_token: var("ADMIN_API_TOKEN"),
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("database", &self.database_url.as_ref().map(|_| "<configured>"))
            .field("database_max_connections", &self.database_max_connections)
            .field("nats_url", &self.nats_url)
            .field("mail_subject", &self.mail_subject)
            .field("app_url", &self.app_url)
            .field("admin_api_token", &self.admin_api_token.as_ref().map(|_| "<configured>"))
            .finish_non_exhaustive()
    }
}
