//! In-memory order composer.
//!
//! One [`OrderComposer`] owns one [`OrderDraft`] for the lifetime of a create
//! or edit screen. Every mutation goes through a method that either applies
//! fully or returns a [`ComposerError`] and leaves the draft untouched. A
//! cancelled draft refuses all of them.

mod draft;
mod error;
mod gateway;

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

pub use draft::{OrderDraft, OrderLineItem};
pub use error::ComposerError;
pub use gateway::{ConfirmPrompt, GatewayError, OrderGateway, ProductCatalog, ProductFilter};

use crate::{
    dto::orders::{OrderPayload, OrderWithItems},
    models::{OrderStatus, Product},
};

pub const CONFIRM_DOWNLOAD_MESSAGE: &str = "Order created. Download the PDF now?";

const CREATE_FAILED: &str = "Failed to create order";
const UPDATE_FAILED: &str = "Failed to update order";
const LOAD_FAILED: &str = "Failed to load the order";
const CATALOG_FAILED: &str = "Failed to load products";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ComposerMode {
    Create,
    Edit {
        order_id: Uuid,
        loaded_status: OrderStatus,
    },
}

/// Pending product and quantity of the add-item controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemSelection {
    pub product_id: Option<Uuid>,
    pub quantity: i32,
}

impl Default for ItemSelection {
    fn default() -> Self {
        Self {
            product_id: None,
            quantity: 1,
        }
    }
}

/// Read-only view handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposerSnapshot {
    pub mode: ComposerMode,
    pub draft: OrderDraft,
    pub total: Decimal,
    pub line_count: usize,
    pub units: i64,
    pub locked: bool,
    pub saving: bool,
    pub error: Option<String>,
    pub selection: ItemSelection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// `download_document` is the host's answer to the post-create prompt.
    Created {
        order: OrderWithItems,
        download_document: bool,
    },
    Updated {
        order: OrderWithItems,
    },
}

impl SubmitOutcome {
    pub fn order(&self) -> &OrderWithItems {
        match self {
            SubmitOutcome::Created { order, .. } | SubmitOutcome::Updated { order } => order,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderComposer {
    mode: ComposerMode,
    draft: OrderDraft,
    catalog: Vec<Product>,
    selection: ItemSelection,
    saving: bool,
    error: Option<String>,
}

impl OrderComposer {
    /// Fresh draft dated from the local calendar.
    pub fn new(catalog: Vec<Product>) -> Self {
        Self::starting_on(catalog, Local::now().date_naive())
    }

    pub fn starting_on(catalog: Vec<Product>, today: NaiveDate) -> Self {
        Self {
            mode: ComposerMode::Create,
            draft: OrderDraft::fresh(today),
            catalog,
            selection: ItemSelection::default(),
            saving: false,
            error: None,
        }
    }

    /// Hydrates a draft for editing `order`.
    pub fn for_order(order: &OrderWithItems, catalog: Vec<Product>) -> Self {
        Self {
            mode: ComposerMode::Edit {
                order_id: order.order.id,
                loaded_status: order.order.status,
            },
            draft: OrderDraft::from_order(order),
            catalog,
            selection: ItemSelection::default(),
            saving: false,
            error: None,
        }
    }

    /// Loads the active catalog and opens a fresh draft.
    pub async fn load_new<C>(catalog: &C) -> Result<Self, ComposerError>
    where
        C: ProductCatalog,
    {
        let products = load_catalog(catalog).await?;
        Ok(Self::new(products))
    }

    /// Loads the active catalog and the order `order_id` concurrently, then hydrates.
    pub async fn load_existing<C, G>(
        catalog: &C,
        gateway: &G,
        order_id: Uuid,
    ) -> Result<Self, ComposerError>
    where
        C: ProductCatalog,
        G: OrderGateway,
    {
        let order = async {
            gateway.get_order(order_id).await.map_err(|err| {
                tracing::warn!(%order_id, error = %err, "failed to load order for editing");
                ComposerError::LoadFailed(
                    err.detail().map(str::to_owned).unwrap_or_else(|| LOAD_FAILED.to_string()),
                )
            })
        };
        let (products, order) = tokio::try_join!(load_catalog(catalog), order)?;
        Ok(Self::for_order(&order, products))
    }

    pub fn mode(&self) -> ComposerMode {
        self.mode
    }

    pub fn draft(&self) -> &OrderDraft {
        &self.draft
    }

    pub fn catalog(&self) -> &[Product] {
        &self.catalog
    }

    /// Products the add-item selector offers.
    pub fn available_products(&self) -> impl Iterator<Item = &Product> {
        self.catalog.iter().filter(|product| product.is_active)
    }

    pub fn selection(&self) -> &ItemSelection {
        &self.selection
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn is_locked(&self) -> bool {
        self.draft.is_locked()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn snapshot(&self) -> ComposerSnapshot {
        ComposerSnapshot {
            mode: self.mode,
            draft: self.draft.clone(),
            total: self.compute_total(),
            line_count: self.draft.items.len(),
            units: self.draft.units(),
            locked: self.is_locked(),
            saving: self.saving,
            error: self.error.clone(),
            selection: self.selection.clone(),
        }
    }

    pub fn compute_total(&self) -> Decimal {
        self.draft.total()
    }

    /// Adds `quantity` of a catalog product.
    ///
    /// A product already on the draft keeps its line and its frozen unit
    /// price; only the quantity grows.
    pub fn add_item(&mut self, product_id: Uuid, quantity: i32) -> Result<(), ComposerError> {
        self.ensure_unlocked()?;
        if quantity < 1 {
            return Err(rejected(ComposerError::InvalidQuantity(quantity)));
        }
        let product = self
            .catalog
            .iter()
            .find(|product| product.id == product_id)
            .ok_or_else(|| rejected(ComposerError::UnknownProduct(product_id)))?;
        if !product.is_active {
            return Err(rejected(ComposerError::InactiveProduct(product_id)));
        }

        match self.draft.position_of(product_id) {
            Some(index) => {
                let line = &mut self.draft.items[index];
                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| rejected(ComposerError::InvalidQuantity(quantity)))?;
            }
            None => {
                let line = OrderLineItem::from_product(product, quantity);
                self.draft.items.push(line);
            }
        }
        self.selection = ItemSelection::default();
        Ok(())
    }

    pub fn remove_item(&mut self, index: usize) -> Result<OrderLineItem, ComposerError> {
        self.ensure_unlocked()?;
        self.ensure_index(index)?;
        Ok(self.draft.items.remove(index))
    }

    pub fn update_item_quantity(&mut self, index: usize, quantity: i32) -> Result<(), ComposerError> {
        self.ensure_unlocked()?;
        self.ensure_index(index)?;
        if quantity < 1 {
            return Err(rejected(ComposerError::InvalidQuantity(quantity)));
        }
        self.draft.items[index].quantity = quantity;
        Ok(())
    }

    pub fn select_product(&mut self, product_id: Option<Uuid>) -> Result<(), ComposerError> {
        self.ensure_unlocked()?;
        self.selection.product_id = product_id;
        Ok(())
    }

    /// Stores the raw quantity input; it is checked when the item is added.
    pub fn set_selected_quantity(&mut self, quantity: i32) -> Result<(), ComposerError> {
        self.ensure_unlocked()?;
        self.selection.quantity = quantity;
        Ok(())
    }

    pub fn add_selected_item(&mut self) -> Result<(), ComposerError> {
        self.ensure_unlocked()?;
        let product_id = self
            .selection
            .product_id
            .ok_or_else(|| rejected(ComposerError::NoProductSelected))?;
        self.add_item(product_id, self.selection.quantity)
    }

    pub fn set_customer_name(&mut self, value: impl Into<String>) -> Result<(), ComposerError> {
        let value = value.into();
        self.edit(|draft| draft.customer_name = value)
    }

    pub fn set_customer_phone(&mut self, value: impl Into<String>) -> Result<(), ComposerError> {
        let value = value.into();
        self.edit(|draft| draft.customer_phone = value)
    }

    pub fn set_customer_address(&mut self, value: impl Into<String>) -> Result<(), ComposerError> {
        let value = value.into();
        self.edit(|draft| draft.customer_address = value)
    }

    pub fn set_event_date(&mut self, date: NaiveDate) -> Result<(), ComposerError> {
        self.edit(|draft| draft.event_date = date)
    }

    pub fn set_delivery_date(&mut self, date: NaiveDate) -> Result<(), ComposerError> {
        self.edit(|draft| draft.delivery_date = date)
    }

    pub fn set_return_date(&mut self, date: NaiveDate) -> Result<(), ComposerError> {
        self.edit(|draft| draft.return_date = date)
    }

    pub fn set_observations(&mut self, value: impl Into<String>) -> Result<(), ComposerError> {
        let value = value.into();
        self.edit(|draft| draft.observations = value)
    }

    /// Only available while editing. Choosing `cancelled` locks the draft.
    pub fn set_status(&mut self, status: OrderStatus) -> Result<(), ComposerError> {
        if self.mode == ComposerMode::Create {
            return Err(rejected(ComposerError::StatusFixedOnCreate));
        }
        self.edit(|draft| draft.status = status)
    }

    /// Wire body for the current mode; status travels only on update.
    pub fn build_submission_payload(&self) -> OrderPayload {
        let include_status = matches!(self.mode, ComposerMode::Edit { .. });
        self.draft.to_payload(include_status)
    }

    /// Checks the draft and enters the saving window.
    ///
    /// Validation failures are stored as the visible error message. Every
    /// successful call must be paired with [`OrderComposer::finish_submit`].
    pub fn begin_submit(&mut self) -> Result<OrderPayload, ComposerError> {
        if self.saving {
            return Err(rejected(ComposerError::SubmitInProgress));
        }
        if self.draft.is_locked() {
            return Err(self.fail(ComposerError::Locked));
        }
        if self.draft.items.is_empty() {
            return Err(self.fail(ComposerError::EmptyOrder));
        }

        self.error = None;
        self.saving = true;
        Ok(self.build_submission_payload())
    }

    /// Leaves the saving window with the backend's answer.
    pub fn finish_submit(
        &mut self,
        result: Result<OrderWithItems, GatewayError>,
    ) -> Result<OrderWithItems, ComposerError> {
        self.saving = false;
        match result {
            Ok(order) => {
                tracing::info!(order_id = %order.order.id, total = %order.total, "order saved");
                Ok(order)
            }
            Err(err) => {
                let fallback = match self.mode {
                    ComposerMode::Create => CREATE_FAILED,
                    ComposerMode::Edit { .. } => UPDATE_FAILED,
                };
                tracing::warn!(error = %err, "order submission failed");
                let message = err.detail().unwrap_or(fallback).to_string();
                Err(self.fail(ComposerError::Rejected(message)))
            }
        }
    }

    /// Validates, sends the draft through `gateway`, and on a fresh create
    /// asks `prompt` whether to fetch the order document.
    pub async fn submit<G, P>(
        &mut self,
        gateway: &G,
        prompt: &P,
    ) -> Result<SubmitOutcome, ComposerError>
    where
        G: OrderGateway,
        P: ConfirmPrompt + ?Sized,
    {
        let payload = self.begin_submit()?;
        match self.mode {
            ComposerMode::Create => {
                let result = gateway.create_order(&payload).await;
                let order = self.finish_submit(result)?;
                let download_document = prompt.confirm(CONFIRM_DOWNLOAD_MESSAGE);
                Ok(SubmitOutcome::Created {
                    order,
                    download_document,
                })
            }
            ComposerMode::Edit { order_id, .. } => {
                let result = gateway.update_order(order_id, &payload).await;
                let order = self.finish_submit(result)?;
                Ok(SubmitOutcome::Updated { order })
            }
        }
    }

    fn edit(&mut self, apply: impl FnOnce(&mut OrderDraft)) -> Result<(), ComposerError> {
        self.ensure_unlocked()?;
        apply(&mut self.draft);
        Ok(())
    }

    fn ensure_unlocked(&self) -> Result<(), ComposerError> {
        if self.draft.is_locked() {
            return Err(rejected(ComposerError::Locked));
        }
        Ok(())
    }

    fn ensure_index(&self, index: usize) -> Result<(), ComposerError> {
        let len = self.draft.items.len();
        if index >= len {
            return Err(rejected(ComposerError::IndexOutOfRange { index, len }));
        }
        Ok(())
    }

    fn fail(&mut self, err: ComposerError) -> ComposerError {
        self.error = Some(err.to_string());
        err
    }
}

async fn load_catalog<C: ProductCatalog>(catalog: &C) -> Result<Vec<Product>, ComposerError> {
    catalog
        .list_products(&ProductFilter::active())
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "failed to load product catalog");
            ComposerError::LoadFailed(
                err.detail().map(str::to_owned).unwrap_or_else(|| CATALOG_FAILED.to_string()),
            )
        })
}

fn rejected(err: ComposerError) -> ComposerError {
    tracing::debug!(reason = %err, "composer rejected change");
    err
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use chrono::Utc;

    use super::*;
    use crate::models::{Order, OrderItem, ProductCategory};

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn product(name: &str, price: Decimal) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.into(),
            category: ProductCategory::Tableware,
            category_display: ProductCategory::Tableware.label().into(),
            price_per_unit: price,
            stock: 100,
            description: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn stored_order(status: OrderStatus, lines: &[(i32, Decimal)]) -> OrderWithItems {
        let items: Vec<OrderItem> = lines
            .iter()
            .enumerate()
            .map(|(i, (quantity, unit_price))| OrderItem {
                id: Uuid::new_v4(),
                product_id: Uuid::new_v4(),
                product_name: format!("Item {i}"),
                product_category: "Chairs".into(),
                quantity: *quantity,
                unit_price: *unit_price,
                subtotal: Decimal::from(*quantity) * *unit_price,
            })
            .collect();
        OrderWithItems {
            order: Order {
                id: Uuid::new_v4(),
                customer_name: "Lucía".into(),
                customer_phone: "555-0101".into(),
                customer_address: "Calle 1".into(),
                event_date: ymd(2026, 11, 7),
                delivery_date: ymd(2026, 11, 6),
                return_date: ymd(2026, 11, 8),
                status,
                status_display: status.label().into(),
                observations: String::new(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            items_count: lines.iter().map(|(q, _)| i64::from(*q)).sum(),
            total: lines.iter().map(|(q, p)| Decimal::from(*q) * *p).sum(),
            items,
        }
    }

    fn composer_with(products: &[Product]) -> OrderComposer {
        OrderComposer::starting_on(products.to_vec(), ymd(2026, 10, 19))
    }

    #[test]
    fn fresh_draft_defaults() {
        let composer = composer_with(&[]);
        let draft = composer.draft();
        assert_eq!(draft.event_date, ymd(2026, 10, 19));
        assert_eq!(draft.delivery_date, ymd(2026, 10, 19));
        assert_eq!(draft.return_date, ymd(2026, 10, 20));
        assert_eq!(draft.status, OrderStatus::Pending);
        assert!(draft.items().is_empty());
        assert_eq!(composer.mode(), ComposerMode::Create);
        assert_eq!(composer.compute_total(), Decimal::ZERO);
    }

    #[test]
    fn duplicate_add_merges_into_one_line() {
        let plate = product("Plate", Decimal::from(100));
        let mut composer = composer_with(&[plate.clone()]);

        composer.add_item(plate.id, 2).unwrap();
        composer.add_item(plate.id, 3).unwrap();

        assert_eq!(composer.draft().items().len(), 1);
        assert_eq!(composer.draft().items()[0].quantity, 5);
        assert_eq!(composer.compute_total(), Decimal::from(500));
    }

    #[test]
    fn distinct_products_get_one_line_each_in_insertion_order() {
        let products: Vec<Product> = (0..4)
            .map(|i| product(&format!("P{i}"), Decimal::new(150 + i, 2)))
            .collect();
        let mut composer = composer_with(&products);

        for p in &products {
            composer.add_item(p.id, 1).unwrap();
        }
        composer.add_item(products[1].id, 4).unwrap();

        let ids: Vec<Uuid> = composer.draft().items().iter().map(|l| l.product_id).collect();
        let expected: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        assert_eq!(ids, expected);
        assert_eq!(composer.draft().items()[1].quantity, 5);
    }

    #[test]
    fn merge_keeps_the_price_captured_at_first_add() {
        let mut glass = product("Glass", Decimal::new(250, 2));
        let mut composer = composer_with(&[glass.clone()]);
        composer.add_item(glass.id, 1).unwrap();

        glass.price_per_unit = Decimal::new(900, 2);
        composer.catalog = vec![glass.clone()];
        composer.add_item(glass.id, 1).unwrap();

        let line = &composer.draft().items()[0];
        assert_eq!(line.unit_price, Decimal::new(250, 2));
        assert_eq!(line.quantity, 2);
        assert_eq!(composer.compute_total(), Decimal::new(500, 2));
    }

    #[test]
    fn add_rejects_bad_quantity_unknown_and_inactive_products() {
        let mut retired = product("Old tablecloth", Decimal::ONE);
        retired.is_active = false;
        let chair = product("Chair", Decimal::from(3));
        let mut composer = composer_with(&[chair.clone(), retired.clone()]);
        let before = composer.draft().clone();

        assert_eq!(
            composer.add_item(chair.id, 0),
            Err(ComposerError::InvalidQuantity(0))
        );
        assert_eq!(
            composer.add_item(chair.id, -2),
            Err(ComposerError::InvalidQuantity(-2))
        );
        let ghost = Uuid::new_v4();
        assert_eq!(
            composer.add_item(ghost, 1),
            Err(ComposerError::UnknownProduct(ghost))
        );
        assert_eq!(
            composer.add_item(retired.id, 1),
            Err(ComposerError::InactiveProduct(retired.id))
        );
        assert_eq!(composer.draft(), &before);
        assert_eq!(composer.available_products().count(), 1);
    }

    #[test]
    fn merge_overflow_is_rejected() {
        let plate = product("Plate", Decimal::ONE);
        let mut composer = composer_with(&[plate.clone()]);
        composer.add_item(plate.id, i32::MAX).unwrap();

        assert!(composer.add_item(plate.id, 1).is_err());
        assert_eq!(composer.draft().items()[0].quantity, i32::MAX);
    }

    #[test]
    fn update_quantity_below_one_keeps_the_old_value() {
        let plate = product("Plate", Decimal::from(2));
        let mut composer = composer_with(&[plate.clone()]);
        composer.add_item(plate.id, 3).unwrap();

        assert_eq!(
            composer.update_item_quantity(0, 0),
            Err(ComposerError::InvalidQuantity(0))
        );
        assert_eq!(composer.draft().items()[0].quantity, 3);

        composer.update_item_quantity(0, 7).unwrap();
        assert_eq!(composer.draft().items()[0].quantity, 7);
        assert_eq!(
            composer.update_item_quantity(1, 2),
            Err(ComposerError::IndexOutOfRange { index: 1, len: 1 })
        );
    }

    #[test]
    fn remove_drops_one_line_and_keeps_the_rest_in_order() {
        let products: Vec<Product> = ["Plate", "Fork", "Knife"]
            .iter()
            .map(|name| product(name, Decimal::ONE))
            .collect();
        let mut composer = composer_with(&products);
        for p in &products {
            composer.add_item(p.id, 1).unwrap();
        }

        let removed = composer.remove_item(1).unwrap();
        assert_eq!(removed.product_name, "Fork");
        let names: Vec<&str> = composer
            .draft()
            .items()
            .iter()
            .map(|l| l.product_name.as_str())
            .collect();
        assert_eq!(names, ["Plate", "Knife"]);
        assert!(matches!(
            composer.remove_item(2),
            Err(ComposerError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn total_is_stable_across_reads() {
        let a = product("Tablecloth", Decimal::new(1275, 2));
        let b = product("Cup", Decimal::new(35, 2));
        let mut composer = composer_with(&[a.clone(), b.clone()]);
        composer.add_item(a.id, 3).unwrap();
        composer.add_item(b.id, 40).unwrap();

        let first = composer.compute_total();
        assert_eq!(first, Decimal::new(5225, 2));
        assert_eq!(composer.compute_total(), first);
        assert_eq!(composer.snapshot().total, first);
    }

    #[test]
    fn hydrated_order_totals_its_items() {
        let order = stored_order(
            OrderStatus::Pending,
            &[(2, Decimal::from(50)), (1, Decimal::from(30))],
        );
        let composer = OrderComposer::for_order(&order, Vec::new());

        assert_eq!(composer.compute_total(), Decimal::from(130));
        assert_eq!(composer.draft().items()[0].product_name, "Item 0");
        assert_eq!(composer.draft().customer_name, "Lucía");
        assert_eq!(
            composer.mode(),
            ComposerMode::Edit {
                order_id: order.order.id,
                loaded_status: OrderStatus::Pending
            }
        );
    }

    #[test]
    fn add_clears_the_selection() {
        let plate = product("Plate", Decimal::ONE);
        let mut composer = composer_with(&[plate.clone()]);
        composer.select_product(Some(plate.id)).unwrap();
        composer.set_selected_quantity(6).unwrap();

        composer.add_selected_item().unwrap();

        assert_eq!(composer.selection(), &ItemSelection::default());
        assert_eq!(composer.draft().items()[0].quantity, 6);
    }

    #[test]
    fn rejected_selection_is_kept_for_correction() {
        let plate = product("Plate", Decimal::ONE);
        let mut composer = composer_with(&[plate.clone()]);
        assert_eq!(
            composer.add_selected_item(),
            Err(ComposerError::NoProductSelected)
        );

        composer.select_product(Some(plate.id)).unwrap();
        composer.set_selected_quantity(0).unwrap();
        assert!(composer.add_selected_item().is_err());
        assert_eq!(composer.selection().product_id, Some(plate.id));
        assert!(composer.draft().items().is_empty());
    }

    #[test]
    fn cancelled_draft_refuses_every_mutation() {
        let order = stored_order(OrderStatus::Cancelled, &[(2, Decimal::from(10))]);
        let spare = product("Chair", Decimal::ONE);
        let mut composer = OrderComposer::for_order(&order, vec![spare.clone()]);
        let before = composer.snapshot();

        assert_eq!(composer.add_item(spare.id, 1), Err(ComposerError::Locked));
        assert_eq!(composer.remove_item(0), Err(ComposerError::Locked));
        assert_eq!(composer.update_item_quantity(0, 9), Err(ComposerError::Locked));
        assert_eq!(composer.set_customer_name("Other"), Err(ComposerError::Locked));
        assert_eq!(composer.set_customer_phone("1"), Err(ComposerError::Locked));
        assert_eq!(composer.set_customer_address("x"), Err(ComposerError::Locked));
        assert_eq!(composer.set_event_date(ymd(2027, 1, 1)), Err(ComposerError::Locked));
        assert_eq!(composer.set_delivery_date(ymd(2027, 1, 1)), Err(ComposerError::Locked));
        assert_eq!(composer.set_return_date(ymd(2027, 1, 1)), Err(ComposerError::Locked));
        assert_eq!(composer.set_observations("x"), Err(ComposerError::Locked));
        assert_eq!(composer.set_status(OrderStatus::Pending), Err(ComposerError::Locked));
        assert_eq!(composer.select_product(Some(spare.id)), Err(ComposerError::Locked));
        assert_eq!(composer.set_selected_quantity(3), Err(ComposerError::Locked));
        assert_eq!(composer.add_selected_item(), Err(ComposerError::Locked));

        assert_eq!(composer.snapshot(), before);
    }

    #[test]
    fn choosing_cancelled_locks_the_draft_and_blocks_submission() {
        let order = stored_order(OrderStatus::Pending, &[(1, Decimal::from(10))]);
        let mut composer = OrderComposer::for_order(&order, Vec::new());

        composer.set_status(OrderStatus::Cancelled).unwrap();
        assert!(composer.is_locked());
        assert_eq!(composer.set_observations("late"), Err(ComposerError::Locked));

        assert_eq!(composer.begin_submit(), Err(ComposerError::Locked));
        assert!(!composer.is_saving());
        assert_eq!(composer.error(), Some("This order is cancelled and cannot be modified"));
    }

    #[test]
    fn status_is_fixed_on_create() {
        let mut composer = composer_with(&[]);
        assert_eq!(
            composer.set_status(OrderStatus::Delivered),
            Err(ComposerError::StatusFixedOnCreate)
        );
        assert_eq!(composer.draft().status, OrderStatus::Pending);
    }

    #[test]
    fn payload_drops_display_fields() {
        let plate = product("Plate", Decimal::new(1999, 2));
        let mut composer = composer_with(&[plate.clone()]);
        composer.set_customer_name("Ana").unwrap();
        composer.add_item(plate.id, 2).unwrap();

        let payload = composer.build_submission_payload();
        assert_eq!(payload.status, None);
        assert_eq!(payload.items[0].unit_price, Some(Decimal::new(1999, 2)));

        let json = serde_json::to_value(&payload).unwrap();
        let item = json["items"][0].as_object().unwrap();
        let mut keys: Vec<&str> = item.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["product_id", "quantity", "unit_price"]);
        assert!(json.get("status").is_none());
        assert!(!json.to_string().contains("product_name"));
        assert!(!json.to_string().contains("product_category"));
    }

    #[test]
    fn update_payload_carries_status() {
        let order = stored_order(OrderStatus::Pending, &[(1, Decimal::ONE)]);
        let mut composer = OrderComposer::for_order(&order, Vec::new());
        composer.set_status(OrderStatus::Delivered).unwrap();

        let payload = composer.build_submission_payload();
        assert_eq!(payload.status, Some(OrderStatus::Delivered));
        assert_eq!(payload.items[0].product_id, order.items[0].product_id);
    }

    #[test]
    fn empty_draft_cannot_begin_submission() {
        let mut composer = composer_with(&[]);

        let err = composer.begin_submit().unwrap_err();
        assert_eq!(err, ComposerError::EmptyOrder);
        assert_eq!(composer.error(), Some("You must add at least one product"));
        assert!(!composer.is_saving());
    }

    #[test]
    fn second_submission_is_refused_while_saving() {
        let plate = product("Plate", Decimal::ONE);
        let mut composer = composer_with(&[plate.clone()]);
        composer.add_item(plate.id, 1).unwrap();

        composer.begin_submit().unwrap();
        assert!(composer.is_saving());
        assert_eq!(
            composer.begin_submit(),
            Err(ComposerError::SubmitInProgress)
        );
    }

    #[test]
    fn failure_prefers_backend_detail_and_keeps_the_draft() {
        let plate = product("Plate", Decimal::ONE);
        let mut composer = composer_with(&[plate.clone()]);
        composer.add_item(plate.id, 1).unwrap();
        let before = composer.draft().clone();

        composer.begin_submit().unwrap();
        let err = composer
            .finish_submit(Err(GatewayError::Api {
                status: 400,
                detail: Some("Customer name is required".into()),
            }))
            .unwrap_err();
        assert_eq!(err, ComposerError::Rejected("Customer name is required".into()));
        assert_eq!(composer.error(), Some("Customer name is required"));
        assert!(!composer.is_saving());
        assert_eq!(composer.draft(), &before);

        composer.begin_submit().unwrap();
        assert_eq!(composer.error(), None);
        let err = composer
            .finish_submit(Err(GatewayError::Transport("connection refused".into())))
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to create order");
    }

    #[test]
    fn edit_failure_falls_back_to_update_message() {
        let order = stored_order(OrderStatus::Delivered, &[(1, Decimal::ONE)]);
        let mut composer = OrderComposer::for_order(&order, Vec::new());

        composer.begin_submit().unwrap();
        let err = composer
            .finish_submit(Err(GatewayError::Api {
                status: 500,
                detail: None,
            }))
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to update order");
    }

    #[test]
    fn order_cancelled_at_load_cannot_be_submitted() {
        let order = stored_order(OrderStatus::Cancelled, &[(1, Decimal::ONE)]);
        let mut composer = OrderComposer::for_order(&order, Vec::new());

        assert_eq!(composer.begin_submit(), Err(ComposerError::Locked));
        assert!(!composer.is_saving());
    }

    #[test]
    fn closures_act_as_confirm_prompts() {
        let asked = Cell::new(0);
        let prompt = |message: &str| {
            asked.set(asked.get() + 1);
            message == CONFIRM_DOWNLOAD_MESSAGE
        };
        assert!(prompt.confirm(CONFIRM_DOWNLOAD_MESSAGE));
        assert_eq!(asked.get(), 1);
    }
}
