//! Revenue reports.
//!
//! Revenue counts delivered orders only, bucketed by event date, with every
//! range inclusive on both ends. Totals are recomputed from order items on
//! each request.

use chrono::{Datelike, Days, Local, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

use crate::{
    dto::{
        orders::OrderSummary,
        reports::{DashboardSummary, PeriodSummary, ReportOrder, RevenueReport},
    },
    entity::orders::{Column as OrderCol, Entity as Orders},
    error::{AppError, AppResult},
    models::OrderStatus,
    response::{ApiResponse, Meta},
    services::order_service::summarize_orders,
    state::AppState,
};

pub async fn revenue_report(
    state: &AppState,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<RevenueReport> {
    let orders = delivered_between(state, start, end).await?;
    Ok(build_revenue_report(start, end, orders))
}

pub async fn daily_report(
    state: &AppState,
    date: Option<NaiveDate>,
) -> AppResult<ApiResponse<RevenueReport>> {
    let day = date.unwrap_or_else(today);
    let report = revenue_report(state, day, day).await?;
    Ok(ApiResponse::success("Daily report", report, Some(Meta::empty())))
}

pub async fn weekly_report(
    state: &AppState,
    date: Option<NaiveDate>,
) -> AppResult<ApiResponse<RevenueReport>> {
    let day = date.unwrap_or_else(today);
    let (start, end) = week_bounds(day)?;
    let mut report = revenue_report(state, start, end).await?;
    report.week_number = Some(day.iso_week().week());
    Ok(ApiResponse::success("Weekly report", report, Some(Meta::empty())))
}

pub async fn monthly_report(
    state: &AppState,
    year: Option<i32>,
    month: Option<u32>,
) -> AppResult<ApiResponse<RevenueReport>> {
    let now = today();
    let year = year.unwrap_or(now.year());
    let month = month.unwrap_or(now.month());
    let (start, end) = month_bounds(year, month)?;
    let mut report = revenue_report(state, start, end).await?;
    report.year = Some(year);
    report.month = Some(month);
    Ok(ApiResponse::success("Monthly report", report, Some(Meta::empty())))
}

pub async fn custom_report(
    state: &AppState,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> AppResult<ApiResponse<RevenueReport>> {
    let (start, end) = parse_range(start_date, end_date)?;
    let report = revenue_report(state, start, end).await?;
    Ok(ApiResponse::success("Custom report", report, Some(Meta::empty())))
}

pub async fn summary_report(state: &AppState) -> AppResult<ApiResponse<DashboardSummary>> {
    let now = today();
    let (week_start, week_end) = week_bounds(now)?;
    let (month_start, month_end) = month_bounds(now.year(), now.month())?;

    let today_report = revenue_report(state, now, now).await?;
    let week_report = revenue_report(state, week_start, week_end).await?;
    let month_report = revenue_report(state, month_start, month_end).await?;

    let pending_orders = Orders::find()
        .filter(OrderCol::Status.eq(OrderStatus::Pending.as_str()))
        .count(&state.orm)
        .await?;

    let summary = DashboardSummary {
        today: period_of(&today_report),
        week: period_of(&week_report),
        month: period_of(&month_report),
        pending_orders,
    };
    Ok(ApiResponse::success("Summary", summary, Some(Meta::empty())))
}

async fn delivered_between(
    state: &AppState,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<Vec<OrderSummary>> {
    let orders = Orders::find()
        .filter(OrderCol::Status.eq(OrderStatus::Delivered.as_str()))
        .filter(OrderCol::EventDate.gte(start))
        .filter(OrderCol::EventDate.lte(end))
        .order_by_desc(OrderCol::EventDate)
        .all(&state.orm)
        .await?;
    summarize_orders(&state.orm, orders).await
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn build_revenue_report(
    start: NaiveDate,
    end: NaiveDate,
    orders: Vec<OrderSummary>,
) -> RevenueReport {
    let orders: Vec<ReportOrder> = orders
        .into_iter()
        .filter(|order| order.status == OrderStatus::Delivered)
        .filter(|order| order.event_date >= start && order.event_date <= end)
        .map(|order| ReportOrder {
            id: order.id,
            customer_name: order.customer_name,
            event_date: order.event_date,
            items_count: order.items_count,
            total: order.total,
        })
        .collect();
    let total_revenue: Decimal = orders.iter().map(|order| order.total).sum();

    RevenueReport {
        start_date: start,
        end_date: end,
        total_revenue,
        orders_count: orders.len(),
        orders,
        week_number: None,
        year: None,
        month: None,
    }
}

fn period_of(report: &RevenueReport) -> PeriodSummary {
    PeriodSummary {
        start_date: report.start_date,
        end_date: report.end_date,
        total: report.total_revenue,
        orders_count: report.orders_count,
    }
}

/// Monday through Sunday of the week containing `day`.
pub fn week_bounds(day: NaiveDate) -> AppResult<(NaiveDate, NaiveDate)> {
    let offset = u64::from(day.weekday().num_days_from_monday());
    let start = day
        .checked_sub_days(Days::new(offset))
        .ok_or_else(|| AppError::bad_request("Date out of range"))?;
    let end = start
        .checked_add_days(Days::new(6))
        .ok_or_else(|| AppError::bad_request("Date out of range"))?;
    Ok((start, end))
}

/// First and last day of the given month.
pub fn month_bounds(year: i32, month: u32) -> AppResult<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::bad_request("Invalid year or month"))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let end = next
        .and_then(|first| first.pred_opt())
        .ok_or_else(|| AppError::bad_request("Invalid year or month"))?;
    Ok((start, end))
}

pub fn parse_range(
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> AppResult<(NaiveDate, NaiveDate)> {
    let (Some(start), Some(end)) = (
        start_date.filter(|s| !s.is_empty()),
        end_date.filter(|s| !s.is_empty()),
    ) else {
        return Err(AppError::bad_request("start_date and end_date are required"));
    };

    let parse = |raw: &str| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| AppError::bad_request("Invalid date format. Use YYYY-MM-DD"))
    };
    let start = parse(start)?;
    let end = parse(end)?;

    if start > end {
        return Err(AppError::bad_request("start_date must be before end_date"));
    }
    Ok((start, end))
}
