use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Tableware,
    Chairs,
    Tables,
    Tablecloths,
    Cutlery,
    Glassware,
    Decoration,
    #[default]
    Other,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 8] = [
        ProductCategory::Tableware,
        ProductCategory::Chairs,
        ProductCategory::Tables,
        ProductCategory::Tablecloths,
        ProductCategory::Cutlery,
        ProductCategory::Glassware,
        ProductCategory::Decoration,
        ProductCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Tableware => "tableware",
            ProductCategory::Chairs => "chairs",
            ProductCategory::Tables => "tables",
            ProductCategory::Tablecloths => "tablecloths",
            ProductCategory::Cutlery => "cutlery",
            ProductCategory::Glassware => "glassware",
            ProductCategory::Decoration => "decoration",
            ProductCategory::Other => "other",
        }
    }

    /// Label shown next to products and on order lines.
    pub fn label(&self) -> &'static str {
        match self {
            ProductCategory::Tableware => "Tableware",
            ProductCategory::Chairs => "Chairs",
            ProductCategory::Tables => "Tables",
            ProductCategory::Tablecloths => "Tablecloths",
            ProductCategory::Cutlery => "Cutlery",
            ProductCategory::Glassware => "Glassware",
            ProductCategory::Decoration => "Decoration",
            ProductCategory::Other => "Other",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ProductCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| format!("unknown product category '{value}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(OrderStatus::Pending),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: ProductCategory,
    pub category_display: String,
    pub price_per_unit: Decimal,
    pub stock: i32,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub event_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub return_date: NaiveDate,
    pub status: OrderStatus,
    pub status_display: String,
    pub observations: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_category: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Sum of `quantity * unit_price` over the given lines.
pub fn order_total<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (i32, Decimal)>,
{
    lines
        .into_iter()
        .map(|(quantity, unit_price)| Decimal::from(quantity) * unit_price)
        .sum()
}

/// Number of rented units across the given quantities.
pub fn items_count<I>(quantities: I) -> i64
where
    I: IntoIterator<Item = i32>,
{
    quantities.into_iter().map(i64::from).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_total_multiplies_and_sums_lines() {
        let total = order_total([(2, Decimal::new(5000, 2)), (1, Decimal::new(3000, 2))]);
        assert_eq!(total, Decimal::new(13000, 2));
    }

    #[test]
    fn order_total_of_no_lines_is_zero() {
        assert_eq!(order_total(std::iter::empty()), Decimal::ZERO);
    }

    #[test]
    fn status_parses_its_own_wire_name() {
        for status in [OrderStatus::Pending, OrderStatus::Delivered, OrderStatus::Cancelled] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn category_labels_are_distinct() {
        let mut labels: Vec<_> = ProductCategory::ALL.iter().map(|c| c.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), ProductCategory::ALL.len());
        assert_eq!("glassware".parse::<ProductCategory>(), Ok(ProductCategory::Glassware));
    }
}
