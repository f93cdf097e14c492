//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::aggregates::cart::NormalizedLine;
use crate::domain::aggregates::product::ProductSummary;
use crate::domain::value_objects::{round_money, OrderNumber, ProductId, Quantity, ShippingMethod};

/// Value-added tax applied to the subtotal (16% IVA).
pub const TAX_RATE: Decimal = Decimal::from_parts(16, 0, 0, false, 2);

/// Country recorded when the shipping address omits one.
pub const DEFAULT_COUNTRY: &str = "México";

/// Largest amount a `NUMERIC(12, 2)` column holds: 9999999999.99.
pub const MAX_ORDER_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub total_amount: Decimal,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub shipping_method: ShippingMethod,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub product_name: String,
    pub product: Option<ProductSummary>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address { pub street: String, pub city: String, pub state: String, pub zip: String, pub country: String }

impl Address {
    /// Multi-line postal rendering used in customer mail.
    pub fn to_postal_lines(&self) -> String {
        let locality = format!("{}, {} {}", self.city, self.state, self.zip);
        [self.street.as_str(), locality.trim(), self.country.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Confirmed, Processing, Shipped, Delivered, Cancelled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus { #[default] Pending, Paid, Failed, Refunded }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending", Self::Confirmed => "confirmed", Self::Processing => "processing",
            Self::Shipped => "shipped", Self::Delivered => "delivered", Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending), "confirmed" => Ok(Self::Confirmed), "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped), "delivered" => Ok(Self::Delivered), "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Paid => "paid", Self::Failed => "failed", Self::Refunded => "refunded" }
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending), "paid" => Ok(Self::Paid), "failed" => Ok(Self::Failed), "refunded" => Ok(Self::Refunded),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub struct UnknownStatus(pub String);
impl std::error::Error for UnknownStatus {}
impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown status: {}", self.0) }
}

/// Authoritative amounts for an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub total_amount: Decimal,
}

impl OrderTotals {
    /// Prices the submitted lines as given, duplicates included.
    ///
    /// Every amount is bounded by the order total, so a total within
    /// [`MAX_ORDER_AMOUNT`] means every line and item fits as well.
    pub fn quote(lines: &[NormalizedLine], shipping: ShippingMethod) -> Result<Self, AmountTooLarge> {
        let subtotal = lines
            .iter()
            .try_fold(Decimal::ZERO, |acc, line| line.line_total().and_then(|total| acc.checked_add(total)))
            .map(round_money)
            .ok_or(AmountTooLarge)?;
        let shipping_cost = round_money(shipping.cost());
        let tax = subtotal.checked_mul(TAX_RATE).map(round_money).ok_or(AmountTooLarge)?;
        let total_amount = subtotal
            .checked_add(shipping_cost)
            .and_then(|t| t.checked_add(tax))
            .filter(|t| *t <= MAX_ORDER_AMOUNT)
            .ok_or(AmountTooLarge)?;
        Ok(Self { subtotal, shipping_cost, tax, total_amount })
    }
}

/// The order total does not fit in a stored amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)] pub struct AmountTooLarge;
impl std::error::Error for AmountTooLarge {}
impl fmt::Display for AmountTooLarge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Order total exceeds the maximum of {MAX_ORDER_AMOUNT}")
    }
}

/// Customer contact captured at checkout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Customer { pub name: String, pub email: String, pub phone: Option<String> }

/// An order ready to be written by the store, before ids are assigned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub customer: Customer,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub shipping_method: ShippingMethod,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub totals: OrderTotals,
    pub items: Vec<NewOrderItem>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub product_name: String,
}

impl NewOrderItem {
    /// `resolved_name` is the catalog name; the submitted name is the fallback.
    pub fn from_line(line: &NormalizedLine, resolved_name: Option<&str>) -> Result<Self, AmountTooLarge> {
        let product_name = resolved_name.filter(|n| !n.is_empty()).unwrap_or(line.product_name.as_str()).to_string();
        let total_price = line.line_total().map(round_money).filter(|t| *t <= MAX_ORDER_AMOUNT).ok_or(AmountTooLarge)?;
        Ok(Self {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            total_price,
            product_name,
        })
    }
}

impl NewOrder {
    /// Materializes the order once the store has assigned ids.
    pub fn into_order(
        self,
        id: i64,
        created_at: DateTime<Utc>,
        mut item_ids: impl Iterator<Item = i64>,
        mut summary: impl FnMut(ProductId) -> Option<ProductSummary>,
    ) -> Order {
        let items = self.items.into_iter().map(|item| OrderItem {
            id: item_ids.next().unwrap_or_default(),
            order_id: id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
            product_name: item.product_name,
            product: summary(item.product_id),
        }).collect();
        Order {
            id,
            order_number: self.order_number,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            subtotal: self.totals.subtotal,
            shipping_cost: self.totals.shipping_cost,
            tax: self.totals.tax,
            total_amount: self.totals.total_amount,
            customer_name: self.customer.name,
            customer_email: self.customer.email,
            customer_phone: self.customer.phone,
            shipping_address: self.shipping_address,
            billing_address: self.billing_address,
            shipping_method: self.shipping_method,
            payment_method: self.payment_method,
            notes: self.notes,
            created_at,
            updated_at: created_at,
            items,
        }
    }
}
