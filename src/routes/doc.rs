use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{CurrentUser, LoginRequest, LoginResponse},
        orders::{ChangeStatusRequest, OrderItemPayload, OrderList, OrderPayload, OrderSummary, OrderWithItems},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        reports::{DashboardSummary, PeriodSummary, ReportOrder, RevenueReport},
    },
    models::{Order, OrderItem, OrderStatus, Product, ProductCategory, User},
    response::{ApiResponse, Meta},
    routes::{auth, health, orders, params, products, reports},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::logout,
        auth::me,
        products::list_products,
        products::create_product,
        products::get_product,
        products::update_product,
        products::delete_product,
        orders::list_orders,
        orders::list_pending,
        orders::list_delivered,
        orders::get_order,
        orders::create_order,
        orders::update_order,
        orders::change_status,
        orders::cancel_order,
        orders::order_document,
        reports::daily,
        reports::weekly,
        reports::monthly,
        reports::custom,
        reports::summary
    ),
    components(
        schemas(
            User,
            Product,
            ProductCategory,
            Order,
            OrderItem,
            OrderStatus,
            OrderPayload,
            OrderItemPayload,
            ChangeStatusRequest,
            OrderWithItems,
            OrderSummary,
            OrderList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            LoginRequest,
            LoginResponse,
            CurrentUser,
            RevenueReport,
            ReportOrder,
            PeriodSummary,
            DashboardSummary,
            params::Pagination,
            params::SortOrder,
            params::ProductSortBy,
            params::OrderSortBy,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<RevenueReport>,
            ApiResponse<DashboardSummary>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Rental inventory"),
        (name = "Orders", description = "Rental orders"),
        (name = "Reports", description = "Revenue reports"),
        (name = "Auth", description = "Staff authentication"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
