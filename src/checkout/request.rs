use serde::{Deserialize, Deserializer};
use serde_json::Value;
use validator::{Validate, ValidationErrors};

use crate::domain::{Address, Customer, DEFAULT_COUNTRY};

use super::CheckoutError;

/// Checkout payload as posted by the storefront.
///
/// `items` stays untyped: cart lines are normalized leniently rather than
/// rejected by the deserializer. Text fields are trimmed on the way in, and
/// optional ones that are blank or hold no text read as absent.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceOrderRequest {
    pub items: Value,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "customerName is required"))]
    pub customer_name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "customerEmail must be a valid email address"))]
    pub customer_email: String,
    #[serde(deserialize_with = "optional_text")]
    pub customer_phone: Option<String>,
    pub shipping_address: Option<AddressInput>,
    pub billing_address: Option<AddressInput>,
    #[serde(deserialize_with = "optional_text")]
    pub shipping_method: Option<String>,
    #[serde(deserialize_with = "optional_text")]
    pub payment_method: Option<String>,
    #[serde(deserialize_with = "optional_text")]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "street is required"))]
    pub street: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "state is required"))]
    pub state: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "zip is required"))]
    pub zip: String,
    #[serde(deserialize_with = "optional_text")]
    pub country: Option<String>,
}

/// Any JSON value; strings are trimmed, numbers are written out, anything else reads as empty.
fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(optional_text(deserializer)?.unwrap_or_default())
}

fn optional_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

impl AddressInput {
    fn into_address(self, default_country: &str) -> Address {
        let country = self.country.unwrap_or_else(|| default_country.to_string());
        Address { street: self.street, city: self.city, state: self.state, zip: self.zip, country }
    }
}

impl PlaceOrderRequest {
    /// Cart lines as submitted. Anything other than a JSON array counts as no lines.
    pub fn raw_items(&self) -> &[Value] {
        self.items.as_array().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Checks customer and address details, reporting every problem at once.
    pub fn validate_details(&self) -> Result<(), CheckoutError> {
        let mut problems = Vec::new();
        if let Err(errors) = self.validate() {
            problems.extend(messages(&errors, ""));
        }
        match self.shipping_address.as_ref().map(Validate::validate) {
            None => problems.push("shippingAddress is required".to_string()),
            Some(Err(errors)) => problems.extend(messages(&errors, "shippingAddress.")),
            Some(Ok(())) => {}
        }
        if let Some(Err(errors)) = self.billing_address.as_ref().map(Validate::validate) {
            problems.extend(messages(&errors, "billingAddress."));
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(CheckoutError::Validation(format!("Invalid order details: {}", problems.join("; "))))
        }
    }

    /// Splits the validated request into the pieces an order is built from.
    pub(crate) fn into_parts(self) -> OrderDetails {
        OrderDetails {
            customer: Customer { name: self.customer_name, email: self.customer_email, phone: self.customer_phone },
            shipping_address: self.shipping_address.unwrap_or_default().into_address(DEFAULT_COUNTRY),
            billing_address: self.billing_address.map(|a| a.into_address("")),
            payment_method: self.payment_method,
            notes: self.notes,
        }
    }
}

pub(crate) struct OrderDetails {
    pub customer: Customer,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

fn messages(errors: &ValidationErrors, prefix: &str) -> Vec<String> {
    let mut out: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => format!("{prefix}{message}"),
                None => format!("{prefix}{field} is invalid"),
            })
        })
        .collect();
    out.sort();
    out
}
