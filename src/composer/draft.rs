use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    dto::orders::{OrderItemPayload, OrderPayload, OrderWithItems},
    models::{self, OrderStatus, Product},
};

/// One product line of a draft.
///
/// `product_name` and `product_category` are display copies taken from the
/// catalog when the line was added; they never reach the payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLineItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub product_category: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderLineItem {
    pub(super) fn from_product(product: &Product, quantity: i32) -> Self {
        Self {
            product_id: product.id,
            product_name: product.name.clone(),
            product_category: product.category_display.clone(),
            quantity,
            unit_price: product.price_per_unit,
        }
    }

    pub fn subtotal(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

/// The in-memory order being created or edited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDraft {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub event_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub return_date: NaiveDate,
    pub status: OrderStatus,
    pub observations: String,
    pub(super) items: Vec<OrderLineItem>,
}

impl OrderDraft {
    /// Empty pending draft: event and delivery today, return the day after.
    pub fn fresh(today: NaiveDate) -> Self {
        Self {
            customer_name: String::new(),
            customer_phone: String::new(),
            customer_address: String::new(),
            event_date: today,
            delivery_date: today,
            return_date: today.checked_add_days(Days::new(1)).unwrap_or(today),
            status: OrderStatus::Pending,
            observations: String::new(),
            items: Vec::new(),
        }
    }

    /// Rebuilds a draft from a fetched order, prices and labels as fetched.
    pub fn from_order(order: &OrderWithItems) -> Self {
        let header = &order.order;
        Self {
            customer_name: header.customer_name.clone(),
            customer_phone: header.customer_phone.clone(),
            customer_address: header.customer_address.clone(),
            event_date: header.event_date,
            delivery_date: header.delivery_date,
            return_date: header.return_date,
            status: header.status,
            observations: header.observations.clone(),
            items: order
                .items
                .iter()
                .map(|item| OrderLineItem {
                    product_id: item.product_id,
                    product_name: item.product_name.clone(),
                    product_category: item.product_category.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
        }
    }

    pub fn items(&self) -> &[OrderLineItem] {
        &self.items
    }

    pub fn is_locked(&self) -> bool {
        self.status.is_cancelled()
    }

    pub fn total(&self) -> Decimal {
        models::order_total(self.items.iter().map(|item| (item.quantity, item.unit_price)))
    }

    /// Units across every line, as shown next to the total.
    pub fn units(&self) -> i64 {
        models::items_count(self.items.iter().map(|item| item.quantity))
    }

    pub(super) fn position_of(&self, product_id: Uuid) -> Option<usize> {
        self.items.iter().position(|item| item.product_id == product_id)
    }

    pub(super) fn to_payload(&self, include_status: bool) -> OrderPayload {
        OrderPayload {
            customer_name: self.customer_name.clone(),
            customer_phone: self.customer_phone.clone(),
            customer_address: self.customer_address.clone(),
            event_date: self.event_date,
            delivery_date: self.delivery_date,
            return_date: self.return_date,
            status: include_status.then_some(self.status),
            observations: self.observations.clone(),
            items: self
                .items
                .iter()
                .map(|item| OrderItemPayload {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price: Some(item.unit_price),
                })
                .collect(),
        }
    }
}
