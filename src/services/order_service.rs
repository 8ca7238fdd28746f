use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::LockType;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::orders::{OrderItemPayload, OrderList, OrderPayload, OrderSummary, OrderWithItems},
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{self, Order, OrderItem, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, OrderSortBy, SortOrder},
    state::AppState,
};

pub async fn list_orders(
    state: &AppState,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }
    if let Some(start) = query.start_date {
        condition = condition.add(OrderCol::EventDate.gte(start));
    }
    if let Some(end) = query.end_date {
        condition = condition.add(OrderCol::EventDate.lte(end));
    }
    if let Some(search) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        condition = condition.add(
            Condition::any()
                .add(Expr::col(OrderCol::CustomerName).ilike(pattern.clone()))
                .add(Expr::col(OrderCol::CustomerPhone).ilike(pattern)),
        );
    }

    let sort_col = match query.sort_by.unwrap_or(OrderSortBy::CreatedAt) {
        OrderSortBy::CreatedAt => OrderCol::CreatedAt,
        OrderSortBy::EventDate => OrderCol::EventDate,
        OrderSortBy::DeliveryDate => OrderCol::DeliveryDate,
        OrderSortBy::Status => OrderCol::Status,
    };
    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = summarize_orders(&state.orm, orders).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

/// Every order in the given status, newest first.
pub async fn list_by_status(
    state: &AppState,
    status: OrderStatus,
) -> AppResult<ApiResponse<OrderList>> {
    let orders = Orders::find()
        .filter(OrderCol::Status.eq(status.as_str()))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;
    let items = summarize_orders(&state.orm, orders).await?;
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn get_order(state: &AppState, id: Uuid) -> AppResult<ApiResponse<OrderWithItems>> {
    let data = find_order(state, id).await?;
    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

/// The order with its items, or `NotFound`.
pub async fn find_order(state: &AppState, id: Uuid) -> AppResult<OrderWithItems> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    load_order_detail(&state.orm, order).await
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: OrderPayload,
) -> AppResult<ApiResponse<OrderWithItems>> {
    validate_order_payload(&payload)?;

    let txn = state.orm.begin().await?;
    let prices = product_prices(&txn, &payload.items).await?;

    let now = Utc::now();
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_name: Set(payload.customer_name.trim().to_string()),
        customer_phone: Set(payload.customer_phone.trim().to_string()),
        customer_address: Set(payload.customer_address.trim().to_string()),
        event_date: Set(payload.event_date),
        delivery_date: Set(payload.delivery_date),
        return_date: Set(payload.return_date),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        observations: Set(payload.observations),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    insert_items(&txn, order.id, &payload.items, &prices).await?;
    let data = load_order_detail(&txn, order).await?;
    txn.commit().await?;

    tracing::info!(order_id = %data.order.id, total = %data.total, "order created");
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::OrderCreate,
        serde_json::json!({ "order_id": data.order.id }),
    )
    .await;

    Ok(ApiResponse::success("Order created", data, Some(Meta::empty())))
}

/// Replaces the order's fields and its whole item list.
pub async fn update_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: OrderPayload,
) -> AppResult<ApiResponse<OrderWithItems>> {
    validate_order_payload(&payload)?;

    let txn = state.orm.begin().await?;
    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let current_status = parse_status(&existing.status);
    let status = match payload.status {
        Some(next) => {
            ensure_status_change_allowed(current_status, next)?;
            next
        }
        None => current_status,
    };

    let prices = product_prices(&txn, &payload.items).await?;

    let mut active: OrderActive = existing.into();
    active.customer_name = Set(payload.customer_name.trim().to_string());
    active.customer_phone = Set(payload.customer_phone.trim().to_string());
    active.customer_address = Set(payload.customer_address.trim().to_string());
    active.event_date = Set(payload.event_date);
    active.delivery_date = Set(payload.delivery_date);
    active.return_date = Set(payload.return_date);
    active.status = Set(status.as_str().to_string());
    active.observations = Set(payload.observations);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    OrderItems::delete_many()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .exec(&txn)
        .await?;
    insert_items(&txn, order.id, &payload.items, &prices).await?;

    let data = load_order_detail(&txn, order).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::OrderUpdate,
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Order updated", data, Some(Meta::empty())))
}

pub async fn change_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    status: OrderStatus,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let existing = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let current = parse_status(&existing.status);
    if current.is_cancelled() {
        return Err(AppError::bad_request(
            "Cannot change the status of a cancelled order",
        ));
    }

    let order = set_status(&state.orm, existing, status).await?;
    let data = load_order_detail(&state.orm, order).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::OrderStatusChange,
        serde_json::json!({ "order_id": id, "from": current, "to": status }),
    )
    .await;

    Ok(ApiResponse::success("Status updated", data, Some(Meta::empty())))
}

/// Orders are never deleted; cancelling keeps them for history.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let existing = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if parse_status(&existing.status).is_cancelled() {
        return Err(AppError::bad_request("Order is already cancelled"));
    }

    let order = set_status(&state.orm, existing, OrderStatus::Cancelled).await?;
    let data = load_order_detail(&state.orm, order).await?;

    tracing::info!(order_id = %id, "order cancelled");
    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::OrderCancel,
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Order cancelled", data, Some(Meta::empty())))
}

async fn set_status<C: ConnectionTrait>(
    conn: &C,
    existing: OrderModel,
    status: OrderStatus,
) -> AppResult<OrderModel> {
    let mut active: OrderActive = existing.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(conn).await?)
}

/// Current catalog price of every product referenced by the payload.
async fn product_prices<C: ConnectionTrait>(
    conn: &C,
    items: &[OrderItemPayload],
) -> AppResult<HashMap<Uuid, Decimal>> {
    let ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
    let prices: HashMap<Uuid, Decimal> = Products::find()
        .filter(ProdCol::Id.is_in(ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|product| (product.id, product.price_per_unit))
        .collect();

    if let Some(missing) = items.iter().find(|item| !prices.contains_key(&item.product_id)) {
        return Err(AppError::bad_request(format!(
            "Product {} does not exist",
            missing.product_id
        )));
    }
    Ok(prices)
}

async fn insert_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    items: &[OrderItemPayload],
    prices: &HashMap<Uuid, Decimal>,
) -> AppResult<()> {
    let now = Utc::now();
    for (position, item) in items.iter().enumerate() {
        let catalog_price = prices
            .get(&item.product_id)
            .copied()
            .ok_or_else(|| AppError::bad_request("Unknown product in order"))?;
        let position =
            i32::try_from(position).map_err(|_| AppError::bad_request(TOO_MANY_LINES))?;
        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            unit_price: Set(resolve_unit_price(item.unit_price, catalog_price)),
            position: Set(position),
            created_at: Set(now.into()),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

async fn load_order_detail<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
) -> AppResult<OrderWithItems> {
    let rows = order
        .find_related(OrderItems)
        .order_by_asc(OrderItemCol::Position)
        .find_also_related(Products)
        .all(conn)
        .await?;
    Ok(build_order_detail(order, rows))
}

pub(crate) async fn summarize_orders<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<OrderModel>,
) -> AppResult<Vec<OrderSummary>> {
    let ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
    let mut lines: HashMap<Uuid, Vec<(i32, Decimal)>> = HashMap::new();
    if !ids.is_empty() {
        for item in OrderItems::find()
            .filter(OrderItemCol::OrderId.is_in(ids))
            .all(conn)
            .await?
        {
            lines
                .entry(item.order_id)
                .or_default()
                .push((item.quantity, item.unit_price));
        }
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let order_lines = lines.remove(&order.id).unwrap_or_default();
            summary_from_entity(order, &order_lines)
        })
        .collect())
}

pub(crate) fn build_order_detail(
    order: OrderModel,
    rows: Vec<(OrderItemModel, Option<ProductModel>)>,
) -> OrderWithItems {
    let items: Vec<OrderItem> = rows
        .into_iter()
        .map(|(item, product)| order_item_from_entity(item, product))
        .collect();
    let total = models::order_total(items.iter().map(|item| (item.quantity, item.unit_price)));
    let items_count = models::items_count(items.iter().map(|item| item.quantity));
    OrderWithItems {
        order: order_from_entity(order),
        items,
        items_count,
        total,
    }
}

pub(crate) fn summary_from_entity(order: OrderModel, lines: &[(i32, Decimal)]) -> OrderSummary {
    let status = parse_status(&order.status);
    OrderSummary {
        id: order.id,
        customer_name: order.customer_name,
        event_date: order.event_date,
        delivery_date: order.delivery_date,
        status,
        status_display: status.label().to_string(),
        items_count: models::items_count(lines.iter().map(|(quantity, _)| *quantity)),
        total: models::order_total(lines.iter().copied()),
        created_at: order.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn order_from_entity(model: OrderModel) -> Order {
    let status = parse_status(&model.status);
    Order {
        id: model.id,
        customer_name: model.customer_name,
        customer_phone: model.customer_phone,
        customer_address: model.customer_address,
        event_date: model.event_date,
        delivery_date: model.delivery_date,
        return_date: model.return_date,
        status,
        status_display: status.label().to_string(),
        observations: model.observations,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn order_item_from_entity(model: OrderItemModel, product: Option<ProductModel>) -> OrderItem {
    let (product_name, product_category) = match product {
        Some(product) => {
            let category = product
                .category
                .parse::<models::ProductCategory>()
                .unwrap_or_default();
            (product.name, category.label().to_string())
        }
        None => (String::new(), String::new()),
    };
    OrderItem {
        id: model.id,
        product_id: model.product_id,
        product_name,
        product_category,
        quantity: model.quantity,
        unit_price: model.unit_price,
        subtotal: Decimal::from(model.quantity) * model.unit_price,
    }
}

pub(crate) fn parse_status(raw: &str) -> OrderStatus {
    raw.parse().unwrap_or_else(|_| {
        tracing::warn!(status = raw, "unknown order status in database");
        OrderStatus::Pending
    })
}

/// Checks that hold for both create and update bodies.
/// Upper bound on lines in a single order.
pub const MAX_ORDER_LINES: usize = 500;

const TOO_MANY_LINES: &str = "An order cannot have more than 500 lines";

pub fn validate_order_payload(payload: &OrderPayload) -> AppResult<()> {
    if payload.customer_name.trim().is_empty() {
        return Err(AppError::bad_request("Customer name is required"));
    }
    if payload.items.is_empty() {
        return Err(AppError::bad_request(
            "The order must contain at least one product",
        ));
    }
    if payload.items.len() > MAX_ORDER_LINES {
        return Err(AppError::bad_request(TOO_MANY_LINES));
    }
    if payload.items.iter().any(|item| item.quantity <= 0) {
        return Err(AppError::bad_request("Quantity must be greater than 0"));
    }
    if payload
        .items
        .iter()
        .any(|item| item.unit_price.is_some_and(|price| price < Decimal::ZERO))
    {
        return Err(AppError::bad_request("Unit price cannot be negative"));
    }
    if payload.delivery_date > payload.event_date {
        return Err(AppError::bad_request(
            "Delivery date cannot be after the event date",
        ));
    }
    if payload.return_date < payload.event_date {
        return Err(AppError::bad_request(
            "Return date cannot be before the event date",
        ));
    }
    Ok(())
}

/// A cancelled order stays cancelled.
pub fn ensure_status_change_allowed(current: OrderStatus, next: OrderStatus) -> AppResult<()> {
    if current.is_cancelled() && !next.is_cancelled() {
        return Err(AppError::bad_request(
            "Cannot change the status of a cancelled order",
        ));
    }
    Ok(())
}

/// Missing or zero prices fall back to the catalog price.
pub fn resolve_unit_price(requested: Option<Decimal>, catalog_price: Decimal) -> Decimal {
    requested
        .filter(|price| !price.is_zero())
        .unwrap_or(catalog_price)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn payload() -> OrderPayload {
        OrderPayload {
            customer_name: "Lucia Gomez".into(),
            customer_phone: "555-0101".into(),
            customer_address: String::new(),
            event_date: date(14),
            delivery_date: date(13),
            return_date: date(15),
            status: None,
            observations: String::new(),
            items: vec![OrderItemPayload {
                product_id: Uuid::new_v4(),
                quantity: 2,
                unit_price: Some(Decimal::new(5000, 2)),
            }],
        }
    }

    fn order_model(status: &str) -> OrderModel {
        let now = Utc::now();
        OrderModel {
            id: Uuid::new_v4(),
            customer_name: "Lucia Gomez".into(),
            customer_phone: String::new(),
            customer_address: String::new(),
            event_date: date(14),
            delivery_date: date(13),
            return_date: date(15),
            status: status.into(),
            observations: String::new(),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[test]
    fn accepts_a_well_formed_payload() {
        assert!(validate_order_payload(&payload()).is_ok());
    }

    #[test]
    fn rejects_orders_without_items() {
        let mut body = payload();
        body.items.clear();
        let err = validate_order_payload(&body).unwrap_err();
        assert_eq!(err.to_string(), "The order must contain at least one product");
    }

    #[test]
    fn rejects_orders_with_too_many_lines() {
        let mut body = payload();
        let line = body.items[0].clone();
        body.items = vec![line; MAX_ORDER_LINES];
        assert!(validate_order_payload(&body).is_ok());

        body.items.push(body.items[0].clone());
        let err = validate_order_payload(&body).unwrap_err();
        assert_eq!(err.to_string(), TOO_MANY_LINES);
    }

    #[test]
    fn rejects_non_positive_quantities() {
        let mut body = payload();
        body.items[0].quantity = 0;
        assert!(validate_order_payload(&body).is_err());
    }

    #[test]
    fn rejects_delivery_after_event_and_return_before_event() {
        let mut body = payload();
        body.delivery_date = date(20);
        assert!(validate_order_payload(&body).is_err());

        let mut body = payload();
        body.return_date = date(10);
        assert!(validate_order_payload(&body).is_err());
    }

    #[test]
    fn same_day_delivery_event_and_return_is_allowed() {
        let mut body = payload();
        body.delivery_date = date(14);
        body.return_date = date(14);
        assert!(validate_order_payload(&body).is_ok());
    }

    #[test]
    fn cancelled_orders_cannot_be_reopened() {
        assert!(ensure_status_change_allowed(OrderStatus::Cancelled, OrderStatus::Pending).is_err());
        assert!(ensure_status_change_allowed(OrderStatus::Cancelled, OrderStatus::Cancelled).is_ok());
        assert!(ensure_status_change_allowed(OrderStatus::Pending, OrderStatus::Delivered).is_ok());
    }

    #[test]
    fn unit_price_falls_back_to_catalog() {
        let catalog = Decimal::new(1200, 2);
        assert_eq!(resolve_unit_price(None, catalog), catalog);
        assert_eq!(resolve_unit_price(Some(Decimal::ZERO), catalog), catalog);
        assert_eq!(
            resolve_unit_price(Some(Decimal::new(900, 2)), catalog),
            Decimal::new(900, 2)
        );
    }

    #[test]
    fn detail_total_is_computed_from_items() {
        let now = Utc::now();
        let order = order_model("delivered");
        let item = |quantity: i32, cents: i64| OrderItemModel {
            id: Uuid::new_v4(),
            order_id: order.id,
            product_id: Uuid::new_v4(),
            quantity,
            unit_price: Decimal::new(cents, 2),
            position: 0,
            created_at: now.into(),
        };
        let detail = build_order_detail(order.clone(), vec![(item(2, 5000), None), (item(1, 3000), None)]);

        assert_eq!(detail.total, Decimal::new(13000, 2));
        assert_eq!(detail.items_count, 3);
        assert_eq!(detail.items[0].subtotal, Decimal::new(10000, 2));
        assert_eq!(detail.order.status, OrderStatus::Delivered);
        assert_eq!(detail.order.status_display, "Delivered");
    }

    #[test]
    fn unknown_status_reads_as_pending() {
        let summary = summary_from_entity(order_model("shipped"), &[]);
        assert_eq!(summary.status, OrderStatus::Pending);
        assert_eq!(summary.total, Decimal::ZERO);
    }
}
