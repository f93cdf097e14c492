//! Customer notifications sent after an order commits.
//!
//! Delivery is best effort. [`dispatch`] runs the send on its own task and only
//! logs failures; nothing here can change the outcome of a checkout.

mod nats;

pub use nats::NatsNotifier;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::domain::{round_money, Order, CURRENCY};
use crate::order_link::OrderLinkSigner;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to encode mail: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("mail transport failed: {0}")]
    Transport(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MailKind { OrderConfirmation }

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMail {
    pub message_id: Uuid,
    #[serde(rename = "type")]
    pub kind: MailKind,
    pub to: String,
    pub payload: OrderConfirmation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub name: String,
    pub order_number: String,
    pub order_date: String,
    pub total_amount: Decimal,
    pub total_formatted: String,
    pub items: Vec<ConfirmationItem>,
    pub shipping_address: String,
    pub order_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationItem { pub name: String, pub quantity: u32, pub price: Decimal }

impl OutgoingMail {
    pub fn order_confirmation(order: &Order, signer: &OrderLinkSigner) -> Self {
        let payload = OrderConfirmation {
            name: order.customer_name.clone(),
            order_number: order.order_number.to_string(),
            order_date: format_order_date(order.created_at),
            total_amount: order.total_amount,
            total_formatted: format_price(order.total_amount),
            items: order.items.iter().map(|item| ConfirmationItem {
                name: item.product_name.clone(),
                quantity: item.quantity.value(),
                price: item.unit_price,
            }).collect(),
            shipping_address: order.shipping_address.to_postal_lines(),
            order_url: signer.order_url(order.id, &order.order_number),
        };
        Self { message_id: Uuid::now_v7(), kind: MailKind::OrderConfirmation, to: order.customer_email.clone(), payload }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), NotifyError>;
}

/// Used when no mail transport is configured: the mail is only logged.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), NotifyError> {
        let body = serde_json::to_string(mail)?;
        tracing::info!(to = %mail.to, order_number = %mail.payload.order_number, %body, "mail transport not configured, logging mail");
        Ok(())
    }
}

/// Sends `mail` on a detached task. Failures are logged and swallowed.
pub fn dispatch(notifier: Arc<dyn Notifier>, mail: OutgoingMail) -> JoinHandle<()> {
    tokio::spawn(async move {
        match notifier.send(&mail).await {
            Ok(()) => tracing::info!(to = %mail.to, order_number = %mail.payload.order_number, "order confirmation sent"),
            Err(e) => tracing::error!(error = %e, to = %mail.to, order_number = %mail.payload.order_number, "failed to send order confirmation"),
        }
    })
}

/// `$1234.50 MXN`
pub fn format_price(amount: Decimal) -> String {
    format!("${} {}", round_money(amount), CURRENCY)
}

const MONTHS_ES: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio",
    "julio", "agosto", "septiembre", "octubre", "noviembre", "diciembre",
];

/// Store-local (UTC-6) long date, e.g. `19 de octubre de 2026, 08:30`.
pub fn format_order_date(at: DateTime<Utc>) -> String {
    let local = FixedOffset::west_opt(6 * 3600).map(|tz| at.with_timezone(&tz).naive_local()).unwrap_or(at.naive_utc());
    format!(
        "{} de {} de {}, {:02}:{:02}",
        local.day(),
        MONTHS_ES[local.month0() as usize],
        local.year(),
        local.hour(),
        local.minute()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(Decimal::new(482, 0)), "$482.00 MXN");
        assert_eq!(format_price(Decimal::new(19999, 3)), "$20.00 MXN");
    }

    #[test]
    fn test_format_order_date_uses_store_offset() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 14, 30, 0).unwrap();
        assert_eq!(format_order_date(at), "19 de octubre de 2026, 08:30");
        let just_after_midnight_utc = Utc.with_ymd_and_hms(2026, 1, 1, 3, 5, 0).unwrap();
        assert_eq!(format_order_date(just_after_midnight_utc), "31 de diciembre de 2025, 21:05");
    }
}
