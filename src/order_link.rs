//! Signed order-detail links sent to customers.
//!
//! The token is an HMAC-SHA256 over the order id and the order number, keyed
//! with the server secret, so a link only opens the order it was issued for.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

use crate::domain::OrderNumber;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct OrderLinkSigner {
    key: HmacSha256,
    base_url: String,
}

impl OrderLinkSigner {
    pub fn new(secret: impl AsRef<[u8]>, base_url: impl Into<String>) -> Self {
        let key = HmacSha256::new_from_slice(secret.as_ref()).expect("HMAC accepts keys of any length");
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { key, base_url }
    }

    fn mac(&self, order_id: i64, order_number: &OrderNumber) -> HmacSha256 {
        let mut mac = self.key.clone();
        mac.update(&order_id.to_be_bytes());
        mac.update(&[0u8]);
        mac.update(order_number.as_str().as_bytes());
        mac
    }

    pub fn token(&self, order_id: i64, order_number: &OrderNumber) -> String {
        hex::encode(self.mac(order_id, order_number).finalize().into_bytes())
    }

    /// Constant-time check of a presented token.
    pub fn verify(&self, order_id: i64, order_number: &OrderNumber, token: &str) -> bool {
        let Ok(presented) = hex::decode(token) else { return false };
        self.mac(order_id, order_number).verify_slice(&presented).is_ok()
    }

    pub fn order_url(&self, order_id: i64, order_number: &OrderNumber) -> String {
        format!("{}/orders/{}?token={}", self.base_url, order_id, self.token(order_id, order_number))
    }
}

impl fmt::Debug for OrderLinkSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderLinkSigner").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn number(suffix: u16) -> OrderNumber {
        OrderNumber::from_parts(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(), suffix)
    }

    #[test]
    fn test_token_binds_order_id_and_number() {
        let signer = OrderLinkSigner::new("s3cret", "https://shop.example/");
        let token = signer.token(7, &number(1234));
        assert_eq!(token.len(), 64);
        assert!(signer.verify(7, &number(1234), &token));
        assert!(!signer.verify(8, &number(1234), &token));
        assert!(!signer.verify(7, &number(4321), &token));
        assert!(!signer.verify(7, &number(1234), &token[..10]));
        assert!(!signer.verify(7, &number(1234), "not hex"));
        let mut tampered = token.clone();
        let last = if tampered.pop() == Some('0') { '1' } else { '0' };
        tampered.push(last);
        assert!(!signer.verify(7, &number(1234), &tampered));
        assert!(!OrderLinkSigner::new("other", "https://shop.example").verify(7, &number(1234), &token));
    }

    #[test]
    fn test_token_is_hmac_sha256() {
        let signer = OrderLinkSigner::new("Jefe", "https://shop.example");
        let mut reference = HmacSha256::new_from_slice(b"Jefe").unwrap();
        reference.update(&[0, 0, 0, 0, 0, 0, 0, 0, 0]);
        reference.update(number(1000).as_str().as_bytes());
        assert_eq!(signer.token(0, &number(1000)), hex::encode(reference.finalize().into_bytes()));
        assert!(signer.verify(0, &number(1000), &signer.token(0, &number(1000)).to_uppercase()));
    }

    #[test]
    fn test_order_url_shape() {
        let signer = OrderLinkSigner::new("s3cret", "https://shop.example/");
        let url = signer.order_url(7, &number(1234));
        assert!(url.starts_with("https://shop.example/orders/7?token="));
        assert!(!format!("{signer:?}").contains("s3cret"));
    }
}
