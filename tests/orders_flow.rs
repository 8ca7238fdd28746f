use chrono::NaiveDate;
use rental_manager::{
    composer::{ComposerError, OrderComposer},
    config::BusinessInfo,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        orders::{OrderItemPayload, OrderPayload},
        products::{CreateProductRequest, UpdateProductRequest},
    },
    entity::users::ActiveModel as UserActive,
    error::AppError,
    middleware::auth::AuthUser,
    models::{OrderStatus, ProductCategory},
    services::{document_service, order_service, product_service, report_service},
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use uuid::Uuid;

// Staff creates an order, edits it through the composer, delivers it, sees it
// in the revenue report, then cancels a second order.
#[tokio::test]
async fn order_lifecycle_and_revenue_flow() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;
    let staff = AuthUser {
        user_id: create_staff(&state, "staff@example.com").await?,
        role: "staff".into(),
    };

    let plate = product_service::create_product(
        &state,
        &staff,
        product_request("Dinner plate", ProductCategory::Tableware, Decimal::new(150, 2)),
    )
    .await?
    .data
    .expect("plate");
    let chair = product_service::create_product(
        &state,
        &staff,
        product_request("Folding chair", ProductCategory::Chairs, Decimal::new(900, 2)),
    )
    .await?
    .data
    .expect("chair");

    // Create: the chair line omits its price and picks up the catalog price.
    let created = order_service::create_order(
        &state,
        &staff,
        payload(vec![
            OrderItemPayload {
                product_id: plate.id,
                quantity: 100,
                unit_price: Some(Decimal::new(120, 2)),
            },
            OrderItemPayload {
                product_id: chair.id,
                quantity: 10,
                unit_price: None,
            },
        ]),
    )
    .await?
    .data
    .expect("created order");
    assert_eq!(created.order.status, OrderStatus::Pending);
    assert_eq!(created.total, Decimal::new(21000, 2));
    assert_eq!(created.items_count, 110);
    assert_eq!(created.items[0].product_name, "Dinner plate");

    // A later catalog price change does not touch the stored order.
    product_service::update_product(
        &state,
        &staff,
        plate.id,
        UpdateProductRequest {
            price_per_unit: Some(Decimal::new(200, 2)),
            ..UpdateProductRequest::default()
        },
    )
    .await?;

    // Edit through the composer, exactly as the UI would.
    let catalog = product_service::list_products(&state, Default::default())
        .await?
        .data
        .expect("catalog")
        .items;
    let mut composer = OrderComposer::for_order(&created, catalog);
    assert_eq!(composer.compute_total(), created.total);
    composer.add_item(plate.id, 20)?;
    composer.remove_item(1)?;
    composer.set_status(OrderStatus::Delivered)?;
    let updated = order_service::update_order(
        &state,
        &staff,
        created.order.id,
        composer.build_submission_payload(),
    )
    .await?
    .data
    .expect("updated order");
    assert_eq!(updated.items.len(), 1);
    assert_eq!(updated.items[0].quantity, 120);
    assert_eq!(updated.items[0].unit_price, Decimal::new(120, 2));
    assert_eq!(updated.total, Decimal::new(14400, 2));
    assert_eq!(updated.order.status, OrderStatus::Delivered);

    let document = document_service::order_document(&state, created.order.id).await?;
    assert_eq!(document.filename, format!("order_{}.pdf", created.order.id));
    assert!(document.bytes.starts_with(b"%PDF"));
    assert!(matches!(
        document_service::order_document(&state, Uuid::new_v4()).await,
        Err(AppError::NotFound)
    ));

    // Revenue counts the delivered order only.
    let second = order_service::create_order(
        &state,
        &staff,
        payload(vec![OrderItemPayload {
            product_id: chair.id,
            quantity: 5,
            unit_price: None,
        }]),
    )
    .await?
    .data
    .expect("second order");
    let report = report_service::custom_report(&state, Some("2031-03-01"), Some("2031-03-31"))
        .await?
        .data
        .expect("report");
    assert_eq!(report.orders_count, 1);
    assert_eq!(report.total_revenue, Decimal::new(14400, 2));

    // Cancelling keeps the order but freezes it.
    let cancelled = order_service::cancel_order(&state, &staff, second.order.id)
        .await?
        .data
        .expect("cancelled order");
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert!(matches!(
        order_service::cancel_order(&state, &staff, second.order.id).await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        order_service::change_status(&state, &staff, second.order.id, OrderStatus::Pending).await,
        Err(AppError::BadRequest(_))
    ));

    let mut locked = OrderComposer::for_order(&cancelled, Vec::new());
    assert_eq!(locked.begin_submit(), Err(ComposerError::Locked));

    // Products that appear on orders cannot be deleted.
    assert!(matches!(
        product_service::delete_product(&state, &staff, chair.id).await,
        Err(AppError::BadRequest(_))
    ));

    Ok(())
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn payload(items: Vec<OrderItemPayload>) -> OrderPayload {
    OrderPayload {
        customer_name: "Beatriz Molina".into(),
        customer_phone: "555-0199".into(),
        customer_address: "Av. Central 12".into(),
        event_date: ymd(2031, 3, 15),
        delivery_date: ymd(2031, 3, 14),
        return_date: ymd(2031, 3, 16),
        status: None,
        observations: "Deliver before noon".into(),
        items,
    }
}

fn product_request(name: &str, category: ProductCategory, price: Decimal) -> CreateProductRequest {
    CreateProductRequest {
        name: name.into(),
        category,
        price_per_unit: price,
        stock: 500,
        description: None,
        is_active: true,
    }
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, audit_logs, products, users CASCADE",
    ))
    .await?;

    let pool = create_pool(database_url).await?;
    Ok(AppState {
        pool,
        orm,
        jwt_secret: "test-secret".into(),
        business: BusinessInfo::default().into(),
    })
}

async fn create_staff(state: &AppState, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("not-a-real-hash".into()),
        role: Set("staff".into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}
