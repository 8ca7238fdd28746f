use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::reports::{DashboardSummary, RevenueReport},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::{DateQuery, MonthQuery, RangeQuery},
    services::report_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/daily", get(daily))
        .route("/weekly", get(weekly))
        .route("/monthly", get(monthly))
        .route("/custom", get(custom))
        .route("/summary", get(summary))
}

#[utoipa::path(
    get,
    path = "/api/reports/daily",
    params(DateQuery),
    responses(
        (status = 200, description = "Revenue for one day", body = ApiResponse<RevenueReport>)
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn daily(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<DateQuery>,
) -> AppResult<Json<ApiResponse<RevenueReport>>> {
    let resp = report_service::daily_report(&state, query.date).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reports/weekly",
    params(DateQuery),
    responses(
        (status = 200, description = "Revenue for the week containing the date", body = ApiResponse<RevenueReport>)
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn weekly(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<DateQuery>,
) -> AppResult<Json<ApiResponse<RevenueReport>>> {
    let resp = report_service::weekly_report(&state, query.date).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reports/monthly",
    params(MonthQuery),
    responses(
        (status = 200, description = "Revenue for a month", body = ApiResponse<RevenueReport>),
        (status = 400, description = "Invalid year or month")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn monthly(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<ApiResponse<RevenueReport>>> {
    let resp = report_service::monthly_report(&state, query.year, query.month).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reports/custom",
    params(RangeQuery),
    responses(
        (status = 200, description = "Revenue for a date range", body = ApiResponse<RevenueReport>),
        (status = 400, description = "Missing or invalid dates")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn custom(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<ApiResponse<RevenueReport>>> {
    let resp = report_service::custom_report(
        &state,
        query.start_date.as_deref(),
        query.end_date.as_deref(),
    )
    .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reports/summary",
    responses(
        (status = 200, description = "Today, week and month totals", body = ApiResponse<DashboardSummary>)
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn summary(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<ApiResponse<DashboardSummary>>> {
    let resp = report_service::summary_report(&state).await?;
    Ok(Json(resp))
}
