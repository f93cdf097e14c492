use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

use super::{OrderPage, OrderQuery, OrderStore, StoreError};
use crate::domain::{
    Address, AggregatedDemand, NewOrder, Order, OrderItem, OrderNumber, OrderStatus, PaymentStatus, ProductId, ProductSnapshot,
    ProductSummary, Quantity, ShippingMethod,
};

/// Postgres-backed store. Reservations run in one transaction using
/// conditional `UPDATE`s, so concurrent checkouts can never drive stock below zero.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow { id: i64, name: String, stock: i32, is_active: bool }

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64, order_number: String, status: String, payment_status: String,
    subtotal: Decimal, shipping_cost: Decimal, tax: Decimal, total_amount: Decimal,
    customer_name: String, customer_email: String, customer_phone: Option<String>,
    shipping_street: String, shipping_city: String, shipping_state: String, shipping_zip: String, shipping_country: String,
    billing_street: Option<String>, billing_city: Option<String>, billing_state: Option<String>, billing_zip: Option<String>, billing_country: Option<String>,
    shipping_method: String, payment_method: Option<String>, notes: Option<String>,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i64, order_id: i64, product_id: i64, quantity: i32,
    unit_price: Decimal, total_price: Decimal, product_name: String,
    catalog_name: Option<String>, image_url: Option<String>,
}

const ORDER_ITEMS_SQL: &str = "SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, oi.unit_price, oi.total_price, oi.product_name, \
     p.name AS catalog_name, p.image_url \
     FROM order_items oi LEFT JOIN products p ON p.id = oi.product_id \
     WHERE oi.order_id = ANY($1) ORDER BY oi.id";

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {e}")))
    }

    async fn decrement_stock(tx: &mut Transaction<'_, Postgres>, product_id: ProductId, requested: u64) -> Result<(), StoreError> {
        let requested = i64::try_from(requested).unwrap_or(i64::MAX);
        let updated = sqlx::query(
            "UPDATE products SET stock = stock - $2::bigint, updated_at = NOW() \
             WHERE id = $1 AND is_active = TRUE AND stock >= $2::bigint",
        )
        .bind(product_id.get())
        .bind(requested)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tracing::warn!(product_id = %product_id, requested, "conditional stock decrement matched no row");
            return Err(StoreError::StockConflict(product_id));
        }
        Ok(())
    }

    async fn insert_order(tx: &mut Transaction<'_, Postgres>, order: &NewOrder) -> Result<OrderRow, StoreError> {
        let billing = order.billing_address.as_ref();
        sqlx::query_as::<_, OrderRow>(
            "INSERT INTO orders (order_number, status, payment_status, subtotal, shipping_cost, tax, total_amount, \
             customer_name, customer_email, customer_phone, \
             shipping_street, shipping_city, shipping_state, shipping_zip, shipping_country, \
             billing_street, billing_city, billing_state, billing_zip, billing_country, \
             shipping_method, payment_method, notes) \
             VALUES ($1, 'pending', 'pending', $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21) \
             RETURNING *",
        )
        .bind(order.order_number.as_str())
        .bind(order.totals.subtotal).bind(order.totals.shipping_cost).bind(order.totals.tax).bind(order.totals.total_amount)
        .bind(&order.customer.name).bind(&order.customer.email).bind(&order.customer.phone)
        .bind(&order.shipping_address.street).bind(&order.shipping_address.city).bind(&order.shipping_address.state)
        .bind(&order.shipping_address.zip).bind(&order.shipping_address.country)
        .bind(billing.map(|a| a.street.as_str())).bind(billing.map(|a| a.city.as_str())).bind(billing.map(|a| a.state.as_str()))
        .bind(billing.map(|a| a.zip.as_str())).bind(billing.map(|a| a.country.as_str()))
        .bind(order.shipping_method.as_str()).bind(&order.payment_method).bind(&order.notes)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() && db.constraint() == Some("orders_order_number_key") => {
                StoreError::DuplicateOrderNumber(order.order_number.clone())
            }
            _ => StoreError::Database(e),
        })
    }

    async fn items_for<'e, E>(executor: E, order_ids: &[i64]) -> Result<HashMap<i64, Vec<OrderItem>>, StoreError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, OrderItemRow>(ORDER_ITEMS_SQL).bind(order_ids).fetch_all(executor).await?;
        let mut grouped: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            grouped.entry(row.order_id).or_default().push(row.into_item()?);
        }
        Ok(grouped)
    }
}

impl OrderItemRow {
    fn into_item(self) -> Result<OrderItem, StoreError> {
        let product_id = ProductId::new(self.product_id).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let quantity = u32::try_from(self.quantity).ok().and_then(Quantity::new)
            .ok_or_else(|| StoreError::Corrupt(format!("order item {} has quantity {}", self.id, self.quantity)))?;
        let product = self.catalog_name.map(|name| ProductSummary { id: product_id, name, image_url: self.image_url });
        Ok(OrderItem {
            id: self.id, order_id: self.order_id, product_id, quantity,
            unit_price: self.unit_price, total_price: self.total_price, product_name: self.product_name, product,
        })
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, StoreError> {
        let corrupt = |e: &dyn std::fmt::Display| StoreError::Corrupt(format!("order {}: {e}", self.id));
        let billing_address = match self.billing_street {
            Some(street) => Some(Address {
                street,
                city: self.billing_city.unwrap_or_default(),
                state: self.billing_state.unwrap_or_default(),
                zip: self.billing_zip.unwrap_or_default(),
                country: self.billing_country.unwrap_or_default(),
            }),
            None => None,
        };
        Ok(Order {
            id: self.id,
            order_number: OrderNumber::parse(self.order_number).map_err(|e| corrupt(&e))?,
            status: self.status.parse::<OrderStatus>().map_err(|e| corrupt(&e))?,
            payment_status: self.payment_status.parse::<PaymentStatus>().map_err(|e| corrupt(&e))?,
            subtotal: self.subtotal,
            shipping_cost: self.shipping_cost,
            tax: self.tax,
            total_amount: self.total_amount,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            shipping_address: Address {
                street: self.shipping_street,
                city: self.shipping_city,
                state: self.shipping_state,
                zip: self.shipping_zip,
                country: self.shipping_country,
            },
            billing_address,
            shipping_method: self.shipping_method.parse::<ShippingMethod>().map_err(|e| corrupt(&e))?,
            payment_method: self.payment_method,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        })
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn product_snapshots(&self, ids: &[ProductId]) -> Result<Vec<ProductSnapshot>, StoreError> {
        let ids: Vec<i64> = ids.iter().map(ProductId::get).collect();
        let rows = sqlx::query_as::<_, ProductRow>("SELECT id, name, stock, is_active FROM products WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|r| {
                let id = ProductId::new(r.id).map_err(|e| StoreError::Corrupt(e.to_string()))?;
                Ok(ProductSnapshot { id, name: r.name, stock: i64::from(r.stock), is_active: r.is_active })
            })
            .collect()
    }

    async fn reserve_and_create(&self, demand: &AggregatedDemand, order: &NewOrder) -> Result<Order, StoreError> {
        // Dropping `tx` on any early return rolls everything back.
        let mut tx = self.pool.begin().await?;

        for (product_id, requested) in demand.iter() {
            Self::decrement_stock(&mut tx, product_id, requested).await?;
        }

        let row = Self::insert_order(&mut tx, order).await?;
        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity, unit_price, total_price, product_name) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(row.id)
            .bind(item.product_id.get())
            .bind(item.quantity.value() as i32)
            .bind(item.unit_price)
            .bind(item.total_price)
            .bind(&item.product_name)
            .execute(&mut *tx)
            .await?;
        }

        let mut items = Self::items_for(&mut *tx, &[row.id]).await?;
        tx.commit().await?;

        let items = items.remove(&row.id).unwrap_or_default();
        row.into_order(items)
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<OrderPage, StoreError> {
        let status = query.status.map(|s| s.as_str());
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::text IS NULL OR status = $1)")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders WHERE ($1::text IS NULL OR status = $1) ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(status)
        .bind(i64::from(query.page_size))
        .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut items = Self::items_for(&self.pool, &ids).await?;
        let orders = rows
            .into_iter()
            .map(|r| {
                let order_items = items.remove(&r.id).unwrap_or_default();
                r.into_order(order_items)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(OrderPage { orders, total: u64::try_from(total).unwrap_or_default() })
    }

    async fn find_order(&self, id: i64) -> Result<Option<Order>, StoreError> {
        let Some(row) = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        let mut items = Self::items_for(&self.pool, &[id]).await?;
        row.into_order(items.remove(&id).unwrap_or_default()).map(Some)
    }
}
